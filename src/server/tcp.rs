// SPDX-License-Identifier: MIT
//
// Raw TCP transport.
//
// Accepted sockets are switched back to blocking mode and shared three
// ways: the terminal writes to one handle, the input reader reads another,
// and the accept loop keeps a third so it can cut the connection when the
// grace period runs out.

use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};

use tp_term::event_loop::SizeSource;

use super::{POLL_INTERVAL, ServerOptions, deadline_passed, grace_deadline, run_canvas};

/// Accept connections on `listener` until `shutdown` is set, then give open
/// sessions `opts.shutdown_timeout` to finish.
pub fn serve(listener: &TcpListener, opts: &ServerOptions, shutdown: &Arc<AtomicBool>) -> Result<()> {
    listener
        .set_nonblocking(true)
        .context("failed to make listener non-blocking")?;
    log::info!(
        "listening for raw terminals on {}",
        listener.local_addr().context("listener has no address")?
    );

    let mut sessions: Vec<Connection> = Vec::new();

    while !shutdown.load(Ordering::Acquire) {
        match listener.accept() {
            Ok((stream, peer)) => match Connection::open(stream, peer, opts, shutdown) {
                Ok(conn) => sessions.push(conn),
                Err(e) => log::warn!("could not start session for {peer}: {e}"),
            },
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                reap(&mut sessions);
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                log::warn!("accept failed: {e}");
                thread::sleep(POLL_INTERVAL);
            }
        }
    }

    drain(sessions, opts.shutdown_timeout);
    Ok(())
}

/// Join sessions that have ended on their own.
fn reap(sessions: &mut Vec<Connection>) {
    let (done, live): (Vec<_>, Vec<_>) = sessions.drain(..).partition(Connection::is_finished);
    *sessions = live;
    for conn in done {
        conn.join();
    }
}

/// Wait up to `timeout` for every session to end, then force the rest shut.
fn drain(mut sessions: Vec<Connection>, timeout: Duration) {
    log::info!("shutting down, {} session(s) open", sessions.len());
    let deadline = grace_deadline(timeout);

    loop {
        reap(&mut sessions);
        if sessions.is_empty() {
            log::info!("all sessions closed");
            return;
        }
        if deadline_passed(deadline) {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    for conn in &sessions {
        log::warn!("session {} did not finish in time, closing its socket", conn.peer);
        if let Err(e) = conn.control.shutdown(Shutdown::Both) {
            log::warn!("could not close {}: {e}", conn.peer);
        }
    }
}

/// A running session thread and a handle on its socket.
struct Connection {
    peer: SocketAddr,
    control: TcpStream,
    thread: JoinHandle<()>,
}

impl Connection {
    fn open(
        stream: TcpStream,
        peer: SocketAddr,
        opts: &ServerOptions,
        shutdown: &Arc<AtomicBool>,
    ) -> io::Result<Self> {
        // Accepted sockets inherit non-blocking mode on some platforms.
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;
        let control = stream.try_clone()?;
        let input = stream.try_clone()?;
        let closer = stream.try_clone()?;

        let opts = opts.clone();
        let stop = Arc::clone(shutdown);
        let thread = thread::Builder::new()
            .name(format!("session-{peer}"))
            .spawn(move || {
                let sizes = SizeSource::Probe {
                    interval: opts.size_probe_interval,
                };
                run_canvas(peer, stream, input, sizes, &opts, stop);
                if let Err(e) = closer.shutdown(Shutdown::Both) {
                    log::debug!("socket for {peer} already closed: {e}");
                }
            })?;

        Ok(Self {
            peer,
            control,
            thread,
        })
    }

    fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    fn join(self) {
        if self.thread.join().is_err() {
            log::warn!("session thread for {} panicked", self.peer);
        }
    }
}
