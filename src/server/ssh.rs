// SPDX-License-Identifier: MIT
//
// SSH transport.
//
// The protocol runs on a tokio runtime owned by this module; the canvases
// stay on plain threads running the same event loop as every other
// session. Each connection bridges the two worlds with three channels:
//
//   channel data      ─→ input channel ─→ ChannelSource ─→ event loop
//   pty / window-change ─→ size channel ─→ SizeSource::Pushed
//   event loop frames ─→ ChannelWriter ─→ output task ─→ channel data
//
// When the event loop ends the writer is dropped, and the output task sends
// the exit status and closes the channel. A client that disconnects first
// drops the handler and with it the input sender, which ends the loop.
//
// Clients are not authenticated: every connection gets a fresh, private
// canvas. The host key only lets clients recognize the server.

use std::io::{self, Write};
use std::net::{SocketAddr, TcpListener};
use std::path::Path;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;
use std::{fs, mem};

use anyhow::{Context, Result, bail};
use russh::server::{Auth, Config, Handle, Msg, Session};
use russh::{Channel, ChannelId, Pty};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;

use tp_term::event_loop::SizeSource;
use tp_term::reader::ChannelSource;
use tp_term::terminal::Size;

use super::{POLL_INTERVAL, ServerOptions, deadline_passed, grace_deadline, run_canvas};

const NO_PTY_MESSAGE: &[u8] = b"termpaint needs an interactive terminal, try `ssh -t`\r\n";

// ─── Accept Loop ────────────────────────────────────────────────────────────

/// Serve SSH on `listener` until `shutdown` is set, then give open
/// connections `opts.shutdown_timeout` to finish.
pub fn serve(listener: TcpListener, opts: &ServerOptions, shutdown: &Arc<AtomicBool>) -> Result<()> {
    let key = russh::keys::load_secret_key(ensure_host_key(&opts.host_key_path)?, None)
        .with_context(|| format!("failed to load host key {}", opts.host_key_path.display()))?;
    let config = Arc::new(Config {
        keys: vec![key],
        auth_rejection_time: Duration::from_secs(1),
        auth_rejection_time_initial: Some(Duration::ZERO),
        ..Default::default()
    });

    listener
        .set_nonblocking(true)
        .context("failed to make listener non-blocking")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("ssh-io")
        .build()
        .context("failed to start the ssh runtime")?;

    runtime.block_on(accept_loop(listener, config, opts, shutdown))
}

async fn accept_loop(
    listener: TcpListener,
    config: Arc<Config>,
    opts: &ServerOptions,
    shutdown: &Arc<AtomicBool>,
) -> Result<()> {
    let listener = tokio::net::TcpListener::from_std(listener).context("failed to register listener")?;
    log::info!(
        "listening for ssh on {}",
        listener.local_addr().context("listener has no address")?
    );

    let mut connections: Vec<Connection> = Vec::new();

    while !shutdown.load(Ordering::Acquire) {
        match tokio::time::timeout(POLL_INTERVAL, listener.accept()).await {
            Ok(Ok((stream, peer))) => {
                if let Err(e) = stream.set_nodelay(true) {
                    log::debug!("could not disable nagle for {peer}: {e}");
                }
                let handler = CanvasHandler::new(peer, opts, shutdown);
                let config = Arc::clone(&config);
                let task = tokio::spawn(async move {
                    match russh::server::run_stream(config, stream, handler).await {
                        Ok(running) => {
                            if let Err(e) = running.await {
                                log::debug!("ssh connection {peer} ended: {e}");
                            }
                        }
                        Err(e) => log::warn!("ssh handshake with {peer} failed: {e}"),
                    }
                    log::debug!("ssh connection closed: {peer}");
                });
                connections.push(Connection { peer, task });
            }
            Ok(Err(e)) => {
                log::warn!("accept failed: {e}");
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            Err(_) => connections.retain(|conn| !conn.task.is_finished()),
        }
    }

    drain(connections, opts.shutdown_timeout).await;
    Ok(())
}

/// Wait up to `timeout` for every connection to end, then drop the rest.
async fn drain(mut connections: Vec<Connection>, timeout: Duration) {
    log::info!("shutting down, {} ssh connection(s) open", connections.len());
    let deadline = grace_deadline(timeout);

    loop {
        connections.retain(|conn| !conn.task.is_finished());
        if connections.is_empty() {
            log::info!("all sessions closed");
            return;
        }
        if deadline_passed(deadline) {
            break;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    for conn in connections {
        log::warn!("ssh connection {} did not finish in time, dropping it", conn.peer);
        conn.task.abort();
    }
}

/// The protocol task of one accepted connection.
struct Connection {
    peer: SocketAddr,
    task: JoinHandle<()>,
}

// ─── Host Key ───────────────────────────────────────────────────────────────

/// Make sure an ed25519 host key exists at `path`, generating one with
/// `ssh-keygen` if not. Returns `path`.
fn ensure_host_key(path: &Path) -> Result<&Path> {
    if path.exists() {
        return Ok(path);
    }

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    log::info!("generating ssh host key at {}", path.display());
    let status = Command::new("ssh-keygen")
        .args(["-q", "-t", "ed25519", "-N", "", "-C", "termpaint", "-f"])
        .arg(path)
        .status()
        .context("failed to run ssh-keygen to create a host key")?;
    if !status.success() {
        bail!("ssh-keygen could not create {} ({status})", path.display());
    }
    Ok(path)
}

// ─── Connection Handler ─────────────────────────────────────────────────────

/// Protocol state of one SSH connection, and the ends of the channels that
/// feed its canvas once the shell starts.
struct CanvasHandler {
    peer: SocketAddr,
    opts: ServerOptions,
    shutdown: Arc<AtomicBool>,
    channel: Option<ChannelId>,
    pty: Option<Size>,
    input: Option<mpsc::Sender<Vec<u8>>>,
    sizes: Option<mpsc::Sender<Size>>,
}

impl CanvasHandler {
    fn new(peer: SocketAddr, opts: &ServerOptions, shutdown: &Arc<AtomicBool>) -> Self {
        Self {
            peer,
            opts: opts.clone(),
            shutdown: Arc::clone(shutdown),
            channel: None,
            pty: None,
            input: None,
            sizes: None,
        }
    }

    /// Record a new window size and pass it on to a running canvas.
    fn set_size(&mut self, size: Size) {
        self.pty = Some(size);
        if let Some(sizes) = &self.sizes {
            if sizes.send(size).is_err() {
                log::trace!("canvas for {} already ended", self.peer);
            }
        }
    }

    /// Start the canvas thread and the task carrying its output.
    fn start_canvas(&mut self, channel: ChannelId, size: Size, handle: Handle) -> io::Result<()> {
        let (input_tx, input_rx) = mpsc::channel();
        let (size_tx, size_rx) = mpsc::channel();
        let (out_tx, out_rx) = unbounded_channel();
        if size_tx.send(size).is_err() {
            return Err(io::Error::other("size channel closed"));
        }

        let peer = self.peer;
        let opts = self.opts.clone();
        let stop = Arc::clone(&self.shutdown);
        thread::Builder::new()
            .name(format!("ssh-session-{peer}"))
            .spawn(move || {
                let out = ChannelWriter::new(out_tx);
                let input = ChannelSource::new(input_rx);
                run_canvas(peer, out, input, SizeSource::Pushed(size_rx), &opts, stop);
            })?;

        tokio::spawn(forward_output(handle, channel, out_rx, peer));
        self.input = Some(input_tx);
        self.sizes = Some(size_tx);
        Ok(())
    }
}

impl russh::server::Handler for CanvasHandler {
    type Error = russh::Error;

    async fn auth_none(&mut self, user: &str) -> Result<Auth, Self::Error> {
        log::debug!("{} connected as {user:?}", self.peer);
        Ok(Auth::Accept)
    }

    async fn auth_password(&mut self, user: &str, _password: &str) -> Result<Auth, Self::Error> {
        log::debug!("{} connected as {user:?}", self.peer);
        Ok(Auth::Accept)
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        if self.channel.is_some() {
            log::debug!("{} asked for a second session channel", self.peer);
            return Ok(false);
        }
        self.channel = Some(channel.id());
        Ok(true)
    }

    async fn pty_request(
        &mut self,
        channel: ChannelId,
        term: &str,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let size = pty_size(col_width, row_height);
        log::debug!("{} pty {term} {}x{}", self.peer, size.cols, size.rows);
        self.set_size(size);
        session.channel_success(channel)?;
        Ok(())
    }

    async fn window_change_request(
        &mut self,
        _channel: ChannelId,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.set_size(pty_size(col_width, row_height));
        Ok(())
    }

    async fn shell_request(&mut self, channel: ChannelId, session: &mut Session) -> Result<(), Self::Error> {
        if self.input.is_some() {
            session.channel_failure(channel)?;
            return Ok(());
        }

        let Some(size) = self.pty else {
            log::info!("{} has no pty, turning it away", self.peer);
            session.channel_success(channel)?;
            session.data(channel, NO_PTY_MESSAGE.to_vec().into())?;
            session.exit_status_request(channel, 1)?;
            session.close(channel)?;
            return Ok(());
        };

        if let Err(e) = self.start_canvas(channel, size, session.handle()) {
            log::warn!("could not start session for {}: {e}", self.peer);
            session.channel_failure(channel)?;
            return Ok(());
        }
        session.channel_success(channel)?;
        Ok(())
    }

    async fn data(&mut self, _channel: ChannelId, data: &[u8], _session: &mut Session) -> Result<(), Self::Error> {
        if let Some(input) = &self.input {
            if input.send(data.to_vec()).is_err() {
                log::trace!("canvas for {} already ended", self.peer);
            }
        }
        Ok(())
    }

    async fn channel_eof(&mut self, _channel: ChannelId, _session: &mut Session) -> Result<(), Self::Error> {
        self.input = None;
        Ok(())
    }
}

/// Clamp a PTY size from the protocol's `u32` to the terminal's `u16`.
fn pty_size(cols: u32, rows: u32) -> Size {
    Size::new(
        u16::try_from(cols).unwrap_or(u16::MAX),
        u16::try_from(rows).unwrap_or(u16::MAX),
    )
}

// ─── Output ─────────────────────────────────────────────────────────────────

/// Terminal output of one canvas. Bytes collect until `flush` and go to the
/// output task as one message.
struct ChannelWriter {
    buf: Vec<u8>,
    tx: UnboundedSender<Vec<u8>>,
}

impl ChannelWriter {
    const fn new(tx: UnboundedSender<Vec<u8>>) -> Self {
        Self { buf: Vec::new(), tx }
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        self.tx
            .send(mem::take(&mut self.buf))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "ssh channel closed"))
    }
}

/// Copy frames onto the SSH channel until the canvas drops its writer, then
/// report a clean exit and close the channel.
async fn forward_output(
    handle: Handle,
    channel: ChannelId,
    mut frames: UnboundedReceiver<Vec<u8>>,
    peer: SocketAddr,
) {
    while let Some(bytes) = frames.recv().await {
        if handle.data(channel, bytes.into()).await.is_err() {
            log::debug!("ssh channel for {peer} is gone");
            return;
        }
    }

    if handle.exit_status_request(channel, 0).await.is_err()
        || handle.eof(channel).await.is_err()
        || handle.close(channel).await.is_err()
    {
        log::debug!("ssh channel for {peer} closed before the session ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Transport;
    use crate::server::tests::options;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use std::time::Instant;

    #[test]
    fn pty_size_saturates() {
        assert_eq!(pty_size(140, 24), Size::new(140, 24));
        assert_eq!(pty_size(100_000, 7), Size::new(u16::MAX, 7));
    }

    #[test]
    fn writer_sends_one_message_per_flush() {
        let (tx, mut rx) = unbounded_channel();
        let mut out = ChannelWriter::new(tx);
        out.write_all(b"\x1b[?1049h").unwrap();
        out.write_all(b"abc").unwrap();
        assert!(rx.try_recv().is_err());

        out.flush().unwrap();
        out.flush().unwrap();
        assert_eq!(rx.try_recv().unwrap(), b"\x1b[?1049habc".to_vec());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn writer_reports_a_closed_channel() {
        let (tx, rx) = unbounded_channel();
        drop(rx);
        let mut out = ChannelWriter::new(tx);
        out.write_all(b"x").unwrap();
        assert_eq!(out.flush().unwrap_err().kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn existing_host_key_is_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("key");
        fs::write(&path, "not a key").unwrap();

        assert_eq!(ensure_host_key(&path).unwrap(), path.as_path());
        assert_eq!(fs::read_to_string(&path).unwrap(), "not a key");
    }

    #[test]
    fn unreadable_host_key_fails_to_serve() {
        let tmp = tempfile::tempdir().unwrap();
        let opts = options(Transport::Ssh, tmp.path().to_path_buf());
        fs::write(&opts.host_key_path, "not a key").unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let shutdown = Arc::new(AtomicBool::new(true));
        let err = serve(listener, &opts, &shutdown).unwrap_err();
        assert!(err.to_string().contains("host key"), "{err:#}");
    }

    #[test]
    fn empty_drain_returns_with_unbounded_grace_period() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(drain(Vec::new(), Duration::from_secs(u64::MAX)));
    }

    /// A writer whose bytes the test can read while the canvas runs.
    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn canvas_follows_pushed_window_sizes() {
        let tmp = tempfile::tempdir().unwrap();
        let opts = options(Transport::Ssh, tmp.path().to_path_buf());
        let (input_tx, input_rx) = mpsc::channel();
        let (size_tx, size_rx) = mpsc::channel();
        size_tx.send(pty_size(140, 24)).unwrap();

        let out = Shared::default();
        let screen = out.clone();
        let canvas = thread::spawn(move || {
            let stop = Arc::new(AtomicBool::new(false));
            let peer: SocketAddr = "127.0.0.1:2222".parse().unwrap();
            run_canvas(peer, out, ChannelSource::new(input_rx), SizeSource::Pushed(size_rx), &opts, stop);
        });

        // Paint at (5,5), then save: with offset (0,0) the button starts at 126.
        input_tx.send(b"\x1b[<0;6;6M\x1b[<0;6;6m".to_vec()).unwrap();
        thread::sleep(Duration::from_millis(100));
        input_tx.send(b"\x1b[<0;128;24M\x1b[<0;128;24m".to_vec()).unwrap();
        thread::sleep(Duration::from_millis(100));

        // A narrower window moves the strip but keeps the drawing.
        size_tx.send(pty_size(100, 30)).unwrap();
        input_tx.send(b"x".to_vec()).unwrap();
        thread::sleep(Duration::from_millis(100));
        input_tx.send(b"q".to_vec()).unwrap();

        let started = Instant::now();
        canvas.join().unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));

        let output = String::from_utf8_lossy(&screen.0.lock().unwrap()).into_owned();
        assert!(output.starts_with("\x1b[?1049h"));
        assert!(output.contains("\x1b]2;Paint\x07"));
        assert!(!output.contains("\x1b[6n"));
        assert!(output.contains("\x1b[30;1H"));
        assert!(output.ends_with("\x1b[?1049l"));

        let saved = fs::read_to_string(tmp.path().join("1.txt")).unwrap();
        assert_eq!(saved.lines().count(), 21);
        assert!(saved.contains('░'));
    }
}
