// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions writing escape sequences to any `impl Write`. No state and
// no decisions about when to emit; the `CellWriter` owns that. Positions
// are 0-indexed in this API and converted to the 1-indexed form terminals
// expect.

use std::io::{self, Write};

use crate::cell::Attr;
use crate::color::CellColor;

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to `(x, y)` (CUP).
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1)
}

#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

/// Ask the terminal where the cursor is after parking it at the far
/// bottom-right corner.
///
/// The terminal clamps the move to its real size, so the reply
/// (`CSI row ; col R`) is the screen size. This is how a session learns
/// the dimensions of a terminal it only reaches through a byte stream.
#[inline]
pub fn request_size(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b7\x1b[999;999H\x1b[6n\x1b8")
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Clear the entire screen (ED 2).
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Reset all SGR attributes (SGR 0).
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

#[inline]
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

#[inline]
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

/// Set the window title (OSC 2). Control characters in `title` are dropped
/// so they cannot end the sequence early.
pub fn set_title(w: &mut impl Write, title: &str) -> io::Result<()> {
    let clean: String = title.chars().filter(|c| !c.is_control()).collect();
    write!(w, "\x1b]2;{clean}\x07")
}

// ─── Colors ──────────────────────────────────────────────────────────────────

/// Set the foreground color.
///
/// Compact codes for the 16 ANSI colors (30-37, 90-97), `38;5;N` for the
/// rest of the 256-color table.
pub fn fg(w: &mut impl Write, color: CellColor) -> io::Result<()> {
    match color {
        CellColor::Default => w.write_all(b"\x1b[39m"),
        CellColor::Ansi256(idx) if idx < 8 => write!(w, "\x1b[{}m", 30 + u16::from(idx)),
        CellColor::Ansi256(idx) if idx < 16 => write!(w, "\x1b[{}m", 82 + u16::from(idx)),
        CellColor::Ansi256(idx) => write!(w, "\x1b[38;5;{idx}m"),
    }
}

/// Set the background color (40-47, 100-107, `48;5;N`).
pub fn bg(w: &mut impl Write, color: CellColor) -> io::Result<()> {
    match color {
        CellColor::Default => w.write_all(b"\x1b[49m"),
        CellColor::Ansi256(idx) if idx < 8 => write!(w, "\x1b[{}m", 40 + u16::from(idx)),
        CellColor::Ansi256(idx) if idx < 16 => write!(w, "\x1b[{}m", 92 + u16::from(idx)),
        CellColor::Ansi256(idx) => write!(w, "\x1b[48;5;{idx}m"),
    }
}

// ─── Attributes ──────────────────────────────────────────────────────────────

/// Emit all set attributes as one CSI sequence, e.g. `\x1b[1;4m`.
/// Writes nothing when `attr` is empty.
pub fn attrs(w: &mut impl Write, attr: Attr) -> io::Result<()> {
    const CODES: [(Attr, &[u8]); 5] = [
        (Attr::BOLD, b"1"),
        (Attr::DIM, b"2"),
        (Attr::ITALIC, b"3"),
        (Attr::UNDERLINE, b"4"),
        (Attr::INVERSE, b"7"),
    ];

    if attr.is_empty() {
        return Ok(());
    }

    w.write_all(b"\x1b[")?;
    let mut first = true;
    for (flag, code) in CODES {
        if attr.contains(flag) {
            if !first {
                w.write_all(b";")?;
            }
            w.write_all(code)?;
            first = false;
        }
    }
    w.write_all(b"m")
}

/// Full style for a standalone styled run: attributes, then colors that
/// differ from the default. Used where no `CellWriter` state exists.
pub fn style(w: &mut impl Write, fg_color: CellColor, bg_color: CellColor, attr: Attr) -> io::Result<()> {
    attrs(w, attr)?;
    if !fg_color.is_default() {
        fg(w, fg_color)?;
    }
    if !bg_color.is_default() {
        bg(w, bg_color)?;
    }
    Ok(())
}

// ─── Synchronized Output ─────────────────────────────────────────────────────

/// Begin synchronized output (DEC 2026): the terminal holds the frame
/// until [`end_sync`].
#[inline]
pub fn begin_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026h")
}

#[inline]
pub fn end_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026l")
}

// ─── Mouse ───────────────────────────────────────────────────────────────────

/// Mouse tracking granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseMode {
    /// Button press and release only (DEC 1000).
    Click,
    /// Press, release and motion while a button is held (DEC 1002).
    #[default]
    Drag,
    /// Every motion event (DEC 1003).
    Motion,
}

/// Enable SGR-encoded mouse reports (DEC 1006) at the given granularity.
pub fn enable_mouse(w: &mut impl Write, mode: MouseMode) -> io::Result<()> {
    w.write_all(b"\x1b[?1000h")?;
    if matches!(mode, MouseMode::Drag | MouseMode::Motion) {
        w.write_all(b"\x1b[?1002h")?;
    }
    if mode == MouseMode::Motion {
        w.write_all(b"\x1b[?1003h")?;
    }
    w.write_all(b"\x1b[?1006h")
}

pub fn disable_mouse(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1006l\x1b[?1003l\x1b[?1002l\x1b[?1000l")
}

// ─── Session framing ─────────────────────────────────────────────────────────

/// Everything a painting session switches on: alternate screen, hidden
/// cursor, a clean screen, and mouse reporting.
pub fn enter_session(w: &mut impl Write, mouse: MouseMode) -> io::Result<()> {
    enter_alt_screen(w)?;
    cursor_hide(w)?;
    clear_screen(w)?;
    enable_mouse(w, mouse)
}

/// The reverse of [`enter_session`], leaving the alternate screen last so
/// the shell's content comes back without artifacts.
pub fn leave_session(w: &mut impl Write) -> io::Result<()> {
    end_sync(w)?;
    disable_mouse(w)?;
    reset(w)?;
    cursor_show(w)?;
    exit_alt_screen(w)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn emit(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn cursor_to_is_one_based() {
        assert_eq!(emit(|w| cursor_to(w, 0, 0)), "\x1b[1;1H");
        assert_eq!(emit(|w| cursor_to(w, 9, 4)), "\x1b[5;10H");
    }

    #[test]
    fn cursor_to_does_not_overflow_at_max() {
        assert_eq!(emit(|w| cursor_to(w, u16::MAX, u16::MAX)), "\x1b[65536;65536H");
    }

    #[test]
    fn title_is_osc_2_without_controls() {
        assert_eq!(emit(|w| set_title(w, "Paint")), "\x1b]2;Paint\x07");
        assert_eq!(emit(|w| set_title(w, "a\x07b\x1bc")), "\x1b]2;abc\x07");
    }

    #[test]
    fn fg_compact_codes() {
        assert_eq!(emit(|w| fg(w, CellColor::Ansi256(1))), "\x1b[31m");
        assert_eq!(emit(|w| fg(w, CellColor::Ansi256(9))), "\x1b[91m");
        assert_eq!(emit(|w| fg(w, CellColor::Ansi256(200))), "\x1b[38;5;200m");
        assert_eq!(emit(|w| fg(w, CellColor::Default)), "\x1b[39m");
    }

    #[test]
    fn bg_compact_codes() {
        assert_eq!(emit(|w| bg(w, CellColor::Ansi256(0))), "\x1b[40m");
        assert_eq!(emit(|w| bg(w, CellColor::Ansi256(14))), "\x1b[106m");
        assert_eq!(emit(|w| bg(w, CellColor::Ansi256(100))), "\x1b[48;5;100m");
        assert_eq!(emit(|w| bg(w, CellColor::Default)), "\x1b[49m");
    }

    #[test]
    fn attrs_are_joined() {
        assert_eq!(emit(|w| attrs(w, Attr::BOLD | Attr::UNDERLINE)), "\x1b[1;4m");
        assert_eq!(emit(|w| attrs(w, Attr::empty())), "");
    }

    #[test]
    fn style_skips_default_colors() {
        assert_eq!(
            emit(|w| style(w, CellColor::Default, CellColor::Ansi256(3), Attr::empty())),
            "\x1b[43m"
        );
        assert_eq!(
            emit(|w| style(w, CellColor::Default, CellColor::Default, Attr::empty())),
            ""
        );
    }

    #[test]
    fn drag_mouse_enables_1002_not_1003() {
        let s = emit(|w| enable_mouse(w, MouseMode::Drag));
        assert!(s.contains("\x1b[?1002h"));
        assert!(!s.contains("\x1b[?1003h"));
        assert!(s.ends_with("\x1b[?1006h"));
    }

    #[test]
    fn leave_session_exits_alt_screen_last() {
        let s = emit(|w| leave_session(w));
        assert!(s.ends_with("\x1b[?1049l"));
        assert!(s.contains("\x1b[?25h"));
    }

    #[test]
    fn size_request_saves_and_restores_cursor() {
        let s = emit(|w| request_size(w));
        assert!(s.starts_with("\x1b7"));
        assert!(s.contains("\x1b[6n"));
        assert!(s.ends_with("\x1b8"));
    }
}
