// SPDX-License-Identifier: MIT
//
// Terminal control: raw mode, session framing and RAII cleanup.
//
// Safety: termios (tcgetattr, tcsetattr), ioctl (TIOCGWINSZ), isatty and a
// raw fd write in the panic hook are POSIX calls with no safe wrapper in
// std. Each unsafe block is minimal.
#![allow(unsafe_code)]
//
// A `Terminal` owns the output side of one painting session. For the local
// terminal it also switches stdin into raw mode and installs a panic hook
// that restores the screen with one unbuffered write to fd 1. For a remote
// session the "terminal" is just the socket: raw mode is the client's
// business, so entering only sends the framing sequences.

use std::io::{self, Write};
use std::sync::{Mutex, Once};

use crate::ansi::{self, MouseMode};

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub cols: u16,
    pub rows: u16,
}

impl Size {
    #[inline]
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    #[inline]
    #[must_use]
    pub const fn area(self) -> u32 {
        self.cols as u32 * self.rows as u32
    }
}

/// Fallback when the real size is unknown.
pub const DEFAULT_SIZE: Size = Size::new(80, 24);

// ─── Queries ────────────────────────────────────────────────────────────────

/// The local terminal size via `ioctl(TIOCGWINSZ)`, or `None` when stdout
/// is not a terminal.
#[cfg(unix)]
#[must_use]
pub fn get_size() -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &raw mut ws) };

    (result == 0 && ws.ws_col > 0 && ws.ws_row > 0).then(|| Size::new(ws.ws_col, ws.ws_row))
}

#[cfg(not(unix))]
#[must_use]
pub fn get_size() -> Option<Size> {
    None
}

/// Whether stdin is a terminal.
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

// ─── Panic-Safe Restore ─────────────────────────────────────────────────────

/// Original termios, kept where the panic hook can reach it.
#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

#[cfg(unix)]
fn restore_termios_from_backup() {
    if let Ok(guard) = TERMIOS_BACKUP.lock() {
        if let Some(ref original) = *guard {
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, original);
            }
        }
    }
}

/// Everything `leave_session` sends, pre-built for the panic path. The
/// alternate screen is exited last.
#[rustfmt::skip]
const EMERGENCY_RESTORE: &[u8] = b"\
    \x1b[?2026l\
    \x1b[?1006l\x1b[?1003l\x1b[?1002l\x1b[?1000l\
    \x1b[0m\
    \x1b[?25h\
    \x1b[?1049l";

static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Restore the local terminal before the default panic message prints.
fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();
            #[cfg(unix)]
            restore_termios_from_backup();
            original(info);
        }));
    });
}

/// Write straight to fd 1, so a panic raised while the stdout lock was held
/// cannot deadlock here.
fn emergency_restore() {
    #[cfg(unix)]
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }

    #[cfg(not(unix))]
    {
        let _ = io::stdout().write_all(EMERGENCY_RESTORE);
        let _ = io::stdout().flush();
    }
}

// ─── Raw Mode ───────────────────────────────────────────────────────────────

#[cfg(unix)]
fn enable_raw_mode() -> io::Result<()> {
    if !is_tty() {
        return Ok(());
    }
    let fd = libc::STDIN_FILENO;

    unsafe {
        let mut termios: libc::termios = std::mem::zeroed();
        if libc::tcgetattr(fd, &raw mut termios) != 0 {
            return Err(io::Error::last_os_error());
        }
        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            *guard = Some(termios);
        }

        termios.c_iflag &= !(libc::IGNBRK
            | libc::BRKINT
            | libc::PARMRK
            | libc::ISTRIP
            | libc::INLCR
            | libc::IGNCR
            | libc::ICRNL
            | libc::IXON);
        termios.c_oflag &= !libc::OPOST;
        termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
        termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
        termios.c_cflag |= libc::CS8;
        termios.c_cc[libc::VMIN] = 1;
        termios.c_cc[libc::VTIME] = 0;

        if libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const termios) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(unix)]
fn disable_raw_mode() -> io::Result<()> {
    let Ok(mut guard) = TERMIOS_BACKUP.lock() else {
        return Ok(());
    };
    if let Some(original) = guard.take() {
        unsafe {
            if libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &raw const original) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn enable_raw_mode() -> io::Result<()> {
    Ok(())
}

#[cfg(not(unix))]
fn disable_raw_mode() -> io::Result<()> {
    Ok(())
}

// ─── Terminal ───────────────────────────────────────────────────────────────

/// The output side of a session, restored on drop.
///
/// ```no_run
/// use tp_term::ansi::MouseMode;
/// use tp_term::terminal::Terminal;
///
/// let mut term = Terminal::local();
/// term.enter(MouseMode::Drag)?;
/// // ... render frames into term.writer() ...
/// term.leave()?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct Terminal<W: Write> {
    out: W,
    /// Whether this terminal is the process's own tty.
    local: bool,
    active: bool,
    title: Option<String>,
}

impl Terminal<io::Stdout> {
    /// The process's own terminal.
    #[must_use]
    pub fn local() -> Self {
        Self {
            out: io::stdout(),
            local: true,
            active: false,
            title: None,
        }
    }
}

impl<W: Write> Terminal<W> {
    /// A terminal on the far side of a byte stream.
    pub const fn remote(out: W) -> Self {
        Self {
            out,
            local: false,
            active: false,
            title: None,
        }
    }

    /// Window title to set on [`enter`](Self::enter).
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Where frames are written.
    pub const fn writer(&mut self) -> &mut W {
        &mut self.out
    }

    /// Switch to painting mode: raw input (local only), alternate screen,
    /// hidden cursor, mouse reporting and the window title. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if raw mode or the framing write fails.
    pub fn enter(&mut self, mouse: MouseMode) -> io::Result<()> {
        if self.active {
            return Ok(());
        }
        if self.local {
            install_panic_hook();
            enable_raw_mode()?;
        }

        ansi::enter_session(&mut self.out, mouse)?;
        if let Some(title) = &self.title {
            ansi::set_title(&mut self.out, title)?;
        }
        self.out.flush()?;
        self.active = true;
        Ok(())
    }

    /// Undo [`enter`](Self::enter). Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the framing write or the termios restore fails.
    pub fn leave(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        let written = ansi::leave_session(&mut self.out).and_then(|()| self.out.flush());
        if self.local {
            disable_raw_mode()?;
        }
        written
    }
}

impl<W: Write> Drop for Terminal<W> {
    fn drop(&mut self) {
        if self.active {
            let _ = self.leave();
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_area() {
        assert_eq!(Size::new(80, 24).area(), 1920);
        assert_eq!(Size::new(0, 24).area(), 0);
        assert_eq!(Size::new(u16::MAX, u16::MAX).area(), 65535 * 65535);
    }

    #[test]
    fn queries_do_not_panic() {
        let _ = get_size();
        let _ = is_tty();
    }

    #[test]
    fn emergency_restore_mirrors_leave_session() {
        let mut expected = Vec::new();
        ansi::leave_session(&mut expected).unwrap();
        assert_eq!(EMERGENCY_RESTORE, expected.as_slice());
    }

    #[test]
    fn remote_enter_writes_framing() {
        let mut term = Terminal::remote(Vec::new());
        term.enter(MouseMode::Drag).unwrap();
        assert!(term.is_active());
        let out = String::from_utf8(term.writer().clone()).unwrap();
        assert!(out.starts_with("\x1b[?1049h"));
        assert!(out.contains("\x1b[?1002h"));
    }

    #[test]
    fn enter_sets_title_inside_alt_screen() {
        let mut term = Terminal::remote(Vec::new()).with_title("Paint");
        term.enter(MouseMode::Drag).unwrap();
        let out = String::from_utf8(term.writer().clone()).unwrap();
        assert!(out.starts_with("\x1b[?1049h"));
        assert!(out.ends_with("\x1b]2;Paint\x07"));
    }

    #[test]
    fn remote_enter_and_leave_are_idempotent() {
        let mut term = Terminal::remote(Vec::new());
        term.enter(MouseMode::Drag).unwrap();
        let after_enter = term.writer().len();
        term.enter(MouseMode::Drag).unwrap();
        assert_eq!(term.writer().len(), after_enter);

        term.leave().unwrap();
        let after_leave = term.writer().len();
        term.leave().unwrap();
        assert_eq!(term.writer().len(), after_leave);
        assert!(!term.is_active());
        assert!(String::from_utf8_lossy(term.writer()).ends_with("\x1b[?1049l"));
    }

    #[test]
    fn leave_without_enter_writes_nothing() {
        let mut term = Terminal::remote(Vec::new());
        term.leave().unwrap();
        assert!(term.writer().is_empty());
    }
}
