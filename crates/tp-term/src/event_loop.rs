// SPDX-License-Identifier: MIT
//
// Event loop: wires reader, parser, application and renderer together.
//
// Bytes arrive from the background reader over a channel. The loop blocks
// on `recv_timeout` with a short tick, so it reacts to input immediately,
// sleeps when idle, and still gets regular chances to:
//
//   - flush a lone pending ESC into an Escape key,
//   - notice a terminal resize,
//   - re-probe the size of a remote terminal,
//   - notice an external stop request (server shutdown).
//
// A frame is painted and diffed only when something changed.
//
// # Terminal size
//
// A local terminal reports resizes through SIGWINCH, registered with
// `signal-hook` as a flag, followed by an `ioctl(TIOCGWINSZ)` query. An SSH
// client sends its PTY size and every window change, which the transport
// pushes through a channel. A bare byte stream has neither, so the loop asks
// it for a cursor position report after parking the cursor in the far
// corner. Only the first reply after each request counts: a key such as
// Shift+F3 arrives as the same `CSI 1;2 R` shape. Until a size is known
// nothing is painted; if no reply comes within one probe interval the loop
// assumes 80x24.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::ansi::{self, MouseMode};
use crate::buffer::FrameBuffer;
use crate::diff::DiffRenderer;
use crate::input::{Event, Parser};
use crate::reader::{ByteSource, Reader};
use crate::terminal::{self, DEFAULT_SIZE, Size, Terminal};

// ─── App Trait ───────────────────────────────────────────────────────────────

/// What the application wants after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    Quit,
}

/// An application driven by [`EventLoop`].
///
/// Per iteration the loop calls [`on_event`](App::on_event) for each
/// parsed event, [`on_resize`](App::on_resize) when the size changed, then
/// [`paint`](App::paint) if anything happened.
pub trait App {
    /// Handle one input event. Return [`Action::Quit`] to end the loop.
    fn on_event(&mut self, _event: &Event) -> Action {
        Action::Continue
    }

    /// The terminal size changed. The frame buffer is already resized.
    fn on_resize(&mut self, _size: Size) {}

    /// Paint the whole frame. The buffer is cleared before each call.
    fn paint(&mut self, buf: &mut FrameBuffer);
}

// ─── Configuration ───────────────────────────────────────────────────────────

/// Loop timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// `recv_timeout` per iteration. Also bounds how long a lone ESC waits.
    pub tick_interval: Duration,
    /// Mouse reporting granularity requested from the terminal.
    pub mouse: MouseMode,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(8),
            mouse: MouseMode::Drag,
        }
    }
}

/// How the loop learns the terminal size.
#[derive(Debug)]
pub enum SizeSource {
    /// The process's own tty: SIGWINCH plus `ioctl`.
    Tty,
    /// A remote terminal: cursor position probes every `interval`.
    Probe { interval: Duration },
    /// Sizes reported by the transport, newest last.
    Pushed(Receiver<Size>),
}

// ─── EventLoop ───────────────────────────────────────────────────────────────

/// The terminal event loop for one session.
///
/// ```no_run
/// use tp_term::buffer::FrameBuffer;
/// use tp_term::event_loop::{Action, App, EventLoop, LoopConfig, SizeSource};
/// use tp_term::input::{Event, KeyCode};
/// use tp_term::reader::Stdin;
/// use tp_term::terminal::Terminal;
///
/// struct Quitter;
///
/// impl App for Quitter {
///     fn on_event(&mut self, event: &Event) -> Action {
///         match event {
///             Event::Key(key) if key.code == KeyCode::Char('q') => Action::Quit,
///             _ => Action::Continue,
///         }
///     }
///
///     fn paint(&mut self, _buf: &mut FrameBuffer) {}
/// }
///
/// let mut event_loop = EventLoop::new(Terminal::local(), LoopConfig::default());
/// event_loop.run(&mut Quitter, Stdin, SizeSource::Tty)?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct EventLoop<W: Write> {
    terminal: Terminal<W>,
    parser: Parser,
    renderer: DiffRenderer,
    config: LoopConfig,
    stop: Option<Arc<AtomicBool>>,
}

impl<W: Write> EventLoop<W> {
    #[must_use]
    pub fn new(terminal: Terminal<W>, config: LoopConfig) -> Self {
        Self {
            terminal,
            parser: Parser::new(),
            renderer: DiffRenderer::new(),
            config,
            stop: None,
        }
    }

    /// End the loop as soon as `flag` becomes true.
    #[must_use]
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    /// Run until the application quits, input ends, or the stop flag is
    /// raised. The terminal is restored on every exit path.
    ///
    /// # Errors
    ///
    /// Returns an error if entering the terminal, spawning the reader, or
    /// writing a frame fails.
    pub fn run<S: ByteSource>(
        &mut self,
        app: &mut impl App,
        source: S,
        sizes: SizeSource,
    ) -> io::Result<()> {
        self.terminal.enter(self.config.mouse)?;

        let result = Reader::spawn("input-reader", source).and_then(|(mut reader, rx)| {
            let result = self.run_inner(app, &rx, sizes);
            reader.stop();
            result
        });

        let left = self.terminal.leave();
        result.and(left)
    }

    fn should_stop(&self) -> bool {
        self.stop.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn run_inner(
        &mut self,
        app: &mut impl App,
        rx: &Receiver<Vec<u8>>,
        sizes: SizeSource,
    ) -> io::Result<()> {
        let mut tracker = SizeTracker::start(sizes, self.terminal.writer())?;
        let mut frame = FrameBuffer::new(0, 0);
        let mut dirty = true;

        if let Some(size) = tracker.current {
            frame.resize(size.cols, size.rows);
            app.on_resize(size);
        }

        loop {
            if self.should_stop() {
                log::debug!("event loop stopped externally");
                return Ok(());
            }

            let events = match rx.recv_timeout(self.config.tick_interval) {
                Ok(bytes) => self.parser.advance(&bytes),
                Err(RecvTimeoutError::Timeout) => {
                    if self.parser.has_pending() {
                        self.parser.flush()
                    } else {
                        Vec::new()
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
            };

            for event in &events {
                if let Event::CursorPosition { row, col } = *event {
                    if !tracker.report(Size::new(col, row)) {
                        log::trace!("ignoring unrequested cursor report {row};{col}");
                    }
                    continue;
                }
                dirty = true;
                if app.on_event(event) == Action::Quit {
                    return Ok(());
                }
            }

            if let Some(size) = tracker.poll(self.terminal.writer())? {
                frame.resize(size.cols, size.rows);
                self.renderer.force_redraw();
                app.on_resize(size);
                dirty = true;
            }

            if dirty && tracker.current.is_some() {
                frame.clear();
                app.paint(&mut frame);
                let stats = self.renderer.render(&frame);
                log::trace!(
                    "frame: {} cells drawn, {} skipped, {} bytes",
                    stats.cells_rendered,
                    stats.cells_skipped,
                    stats.bytes_written
                );
                self.renderer.flush_to(self.terminal.writer())?;
                dirty = false;
            }
        }
    }
}

// ─── Size Tracking ───────────────────────────────────────────────────────────

/// The session's view of the terminal size, and when it last changed.
struct SizeTracker {
    source: SizeSource,
    current: Option<Size>,
    pending: Option<Size>,
    winch: Arc<AtomicBool>,
    last_probe: Instant,
    /// A cursor position request is out and unanswered.
    awaiting_report: bool,
}

impl SizeTracker {
    fn start(source: SizeSource, out: &mut impl Write) -> io::Result<Self> {
        let winch = Arc::new(AtomicBool::new(false));
        let mut awaiting_report = false;
        let current = match &source {
            SizeSource::Tty => {
                #[cfg(unix)]
                signal_hook::flag::register(signal_hook::consts::SIGWINCH, Arc::clone(&winch))?;
                Some(terminal::get_size().unwrap_or(DEFAULT_SIZE))
            }
            SizeSource::Probe { .. } => {
                ansi::request_size(out)?;
                out.flush()?;
                awaiting_report = true;
                None
            }
            SizeSource::Pushed(sizes) => sizes.try_iter().last(),
        };

        Ok(Self {
            source,
            current,
            pending: None,
            winch,
            last_probe: Instant::now(),
            awaiting_report,
        })
    }

    /// Record a size reported by the terminal. Returns `false` and ignores
    /// it when no request is outstanding.
    const fn report(&mut self, size: Size) -> bool {
        if !self.awaiting_report {
            return false;
        }
        self.awaiting_report = false;
        self.pending = Some(size);
        true
    }

    /// The new size, if it changed since the last call.
    fn poll(&mut self, out: &mut impl Write) -> io::Result<Option<Size>> {
        let observed = match &self.source {
            SizeSource::Tty => self
                .winch
                .swap(false, Ordering::Relaxed)
                .then(terminal::get_size)
                .flatten(),
            SizeSource::Probe { interval } => {
                if self.last_probe.elapsed() >= *interval {
                    if self.current.is_none() && self.pending.is_none() {
                        log::debug!("no size report from remote terminal, assuming {DEFAULT_SIZE:?}");
                        self.pending = Some(DEFAULT_SIZE);
                    }
                    ansi::request_size(out)?;
                    out.flush()?;
                    self.last_probe = Instant::now();
                    self.awaiting_report = true;
                }
                self.pending.take()
            }
            SizeSource::Pushed(sizes) => sizes.try_iter().last(),
        };

        match observed {
            Some(size) if self.current != Some(size) => {
                self.current = Some(size);
                Ok(Some(size))
            }
            _ => Ok(None),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
