// SPDX-License-Identifier: MIT
//
// Remote mode: one isolated canvas per connection.
//
// Two transports share everything but the socket handling:
//
//   ssh  the default. Clients connect with `ssh -p 23234 HOST`; the server
//        authenticates itself with a host key and learns the window size
//        from the PTY request and every window change.
//   tcp  a plain byte stream from a terminal already in raw mode, e.g.
//        `socat -,raw,echo=0 tcp:HOST:23234`. The size is probed with
//        cursor position reports.
//
// Every canvas runs its own thread, `Session` and event loop; nothing is
// shared between sessions except the shutdown flag.
//
// Shutdown:
//
//   SIGINT / SIGTERM ─→ flag set ─→ accept loop exits
//                                   sessions see the flag, leave the
//                                   alternate screen and close
//                     grace period ─→ connections still open are cut
//
// A second SIGINT or SIGTERM during the grace period exits immediately.

mod ssh;
mod tcp;

use std::io::Write;
use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::{SigId, flag};

use tp_canvas::export::Exporter;
use tp_canvas::session::{Session, WINDOW_TITLE};
use tp_term::ansi::MouseMode;
use tp_term::event_loop::{EventLoop, LoopConfig, SizeSource};
use tp_term::reader::ByteSource;
use tp_term::terminal::Terminal;

use crate::config::{Config, Transport};

/// How often the accept loops and the drain loops look at their flags.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

// ─── Options ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    pub transport: Transport,
    pub address: String,
    pub host_key_path: PathBuf,
    pub shutdown_timeout: Duration,
    pub size_probe_interval: Duration,
    pub tick_interval: Duration,
    pub export_dir: PathBuf,
}

impl ServerOptions {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            transport: config.server.transport,
            address: config.server.address(),
            host_key_path: config.server.host_key_path.clone(),
            shutdown_timeout: config.server.shutdown_timeout(),
            size_probe_interval: config.server.size_probe_interval(),
            tick_interval: config.terminal.tick_interval(),
            export_dir: config.export.directory.clone(),
        }
    }

    const fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            tick_interval: self.tick_interval,
            mouse: MouseMode::Drag,
        }
    }
}

// ─── Entry Point ────────────────────────────────────────────────────────────

/// Bind, serve until SIGINT or SIGTERM, then drain.
pub fn run(opts: &ServerOptions) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let signals = watch_signals(&shutdown)?;

    let result = TcpListener::bind(&opts.address)
        .with_context(|| format!("failed to bind {}", opts.address))
        .and_then(|listener| match opts.transport {
            Transport::Ssh => ssh::serve(listener, opts, &shutdown),
            Transport::Tcp => tcp::serve(&listener, opts, &shutdown),
        });

    for id in signals {
        signal_hook::low_level::unregister(id);
    }
    result
}

/// Register SIGINT and SIGTERM. The first one raises `shutdown`; a second
/// one while `shutdown` is already set exits the process.
fn watch_signals(shutdown: &Arc<AtomicBool>) -> Result<Vec<SigId>> {
    let mut ids = Vec::with_capacity(4);
    for signal in [SIGINT, SIGTERM] {
        ids.push(
            flag::register_conditional_shutdown(signal, 1, Arc::clone(shutdown))
                .context("failed to register signal handler")?,
        );
        ids.push(flag::register(signal, Arc::clone(shutdown)).context("failed to register signal handler")?);
    }
    Ok(ids)
}

// ─── Shared Pieces ──────────────────────────────────────────────────────────

/// Run one canvas until the user quits, the peer goes away or `stop` is
/// raised. Called on the session's own thread.
fn run_canvas<W: Write, S: ByteSource>(
    peer: SocketAddr,
    out: W,
    input: S,
    sizes: SizeSource,
    opts: &ServerOptions,
    stop: Arc<AtomicBool>,
) {
    log::info!("session opened: {peer}");
    let mut session = Session::new(Exporter::new(&opts.export_dir));
    let terminal = Terminal::remote(out).with_title(WINDOW_TITLE);

    let result = EventLoop::new(terminal, opts.loop_config())
        .with_stop_flag(stop)
        .run(&mut session, input, sizes);
    match result {
        Ok(()) => log::info!("session closed: {peer}"),
        Err(e) => log::warn!("session {peer} ended with error: {e}"),
    }
}

/// End of the shutdown grace period. `None` when `timeout` reaches past
/// what `Instant` can represent, which means waiting as long as it takes.
fn grace_deadline(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

fn deadline_passed(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|at| Instant::now() >= at)
}
