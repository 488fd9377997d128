// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Background input reader.
//
// A dedicated thread pulls raw bytes from a terminal and hands them to the
// event loop over a channel, so the loop can block on `recv_timeout()` and
// still tick for escape timeouts, resize checks and size probes.
//
// The byte source is abstract: local sessions read stdin, raw TCP sessions
// read the socket, and SSH sessions read a channel fed by the transport.
// Every source reads with a short timeout so the thread notices its stop
// flag between reads instead of blocking forever.

use std::io::{self, Read};
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const READ_BUF_SIZE: usize = 4096;

/// How long one read waits before the thread re-checks its stop flag.
const POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Something raw terminal input can be read from.
pub trait ByteSource: Send + 'static {
    /// Read available bytes, waiting at most `timeout`.
    ///
    /// `Ok(None)` means nothing arrived in time. `Ok(Some(0))` is end of
    /// input.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error; the reader thread exits on it.
    fn read_chunk(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>>;
}

/// The process's standard input.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stdin;

#[cfg(unix)]
impl ByteSource for Stdin {
    fn read_chunk(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);

        let ready = unsafe {
            let mut pfd = libc::pollfd {
                fd: libc::STDIN_FILENO,
                events: libc::POLLIN,
                revents: 0,
            };
            libc::poll(&raw mut pfd, 1, timeout_ms)
        };
        if ready < 0 {
            let err = io::Error::last_os_error();
            return if err.kind() == io::ErrorKind::Interrupted {
                Ok(None)
            } else {
                Err(err)
            };
        }
        if ready == 0 {
            return Ok(None);
        }

        let n = unsafe { libc::read(libc::STDIN_FILENO, buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            let err = io::Error::last_os_error();
            return if err.kind() == io::ErrorKind::Interrupted {
                Ok(None)
            } else {
                Err(err)
            };
        }
        #[allow(clippy::cast_sign_loss)]
        Ok(Some(n as usize))
    }
}

#[cfg(not(unix))]
impl ByteSource for Stdin {
    fn read_chunk(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<Option<usize>> {
        io::stdin().read(buf).map(Some)
    }
}

impl ByteSource for TcpStream {
    fn read_chunk(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        self.set_read_timeout(Some(timeout))?;
        match self.read(buf) {
            Ok(n) => Ok(Some(n)),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Input handed over by another thread. The sender hanging up is end of
/// input.
#[derive(Debug)]
pub struct ChannelSource {
    rx: Receiver<Vec<u8>>,
    leftover: Vec<u8>,
}

impl ChannelSource {
    #[must_use]
    pub const fn new(rx: Receiver<Vec<u8>>) -> Self {
        Self {
            rx,
            leftover: Vec::new(),
        }
    }
}

impl ByteSource for ChannelSource {
    fn read_chunk(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        if self.leftover.is_empty() {
            match self.rx.recv_timeout(timeout) {
                Ok(bytes) if bytes.is_empty() => return Ok(None),
                Ok(bytes) => self.leftover = bytes,
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => return Ok(Some(0)),
            }
        }

        let n = self.leftover.len().min(buf.len());
        buf[..n].copy_from_slice(&self.leftover[..n]);
        self.leftover.drain(..n);
        Ok(Some(n))
    }
}

/// Background reader thread feeding byte chunks into a channel.
///
/// The channel closes when the source hits end of input, fails, or the
/// reader is stopped. Dropping the reader stops it.
///
/// ```no_run
/// use tp_term::reader::{Reader, Stdin};
///
/// let (reader, rx) = Reader::spawn("stdin-reader", Stdin)?;
/// while let Ok(bytes) = rx.recv() {
///     println!("got {} bytes", bytes.len());
/// }
/// drop(reader);
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct Reader {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl Reader {
    /// Spawn a named reader thread over `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn<S: ByteSource>(name: &str, source: S) -> io::Result<(Self, Receiver<Vec<u8>>)> {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || read_loop(source, &tx, &stop_flag))?;

        Ok((
            Self {
                handle: Some(handle),
                stop,
            },
            rx,
        ))
    }

    /// Signal the thread to stop and wait for it. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_loop<S: ByteSource>(mut source: S, tx: &Sender<Vec<u8>>, stop: &AtomicBool) {
    let mut buf = [0u8; READ_BUF_SIZE];

    while !stop.load(Ordering::Relaxed) {
        match source.read_chunk(&mut buf, POLL_TIMEOUT) {
            Ok(None) => {}
            Ok(Some(0)) => {
                log::debug!("input reached end of stream");
                break;
            }
            Ok(Some(n)) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(e) => {
                log::debug!("input read failed: {e}");
                break;
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
