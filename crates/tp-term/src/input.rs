// SPDX-License-Identifier: MIT
//
// Terminal input parser.
//
// Turns raw bytes from a terminal (local stdin or a remote socket) into
// structured events:
//
// - printable ASCII and UTF-8 characters
// - control characters (Ctrl+letter, Enter, Tab, Backspace)
// - legacy CSI / SS3 navigation keys, with xterm modifier parameters
// - SGR mouse reports (press / release / drag / move / wheel)
// - cursor position reports (`CSI row ; col R`), used to learn the size of
//   a terminal that is only reachable through a byte stream
//
// Escape sequences can be split across reads, so the parser keeps a small
// byte buffer. Feed bytes with [`Parser::advance`]; after a quiet period
// call [`Parser::flush`] to turn a lone pending ESC into an Escape key.
// A CSI sequence longer than `MAX_SEQUENCE_LEN` is discarded, so a peer
// that never sends a final byte cannot grow the buffer.

use bitflags::bitflags;

// ─── Event Types ────────────────────────────────────────────────────────────

/// A parsed terminal input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A key press.
    Key(KeyEvent),
    /// A mouse button, motion or wheel report.
    Mouse(MouseEvent),
    /// Reply to a cursor position request. 1-indexed, as the terminal sent it.
    CursorPosition { row: u16, col: u16 },
}

/// A key press with its modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    #[inline]
    #[must_use]
    pub const fn new(code: KeyCode, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }

    /// A plain key press with no modifiers.
    #[inline]
    #[must_use]
    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, Modifiers::empty())
    }
}

/// Identity of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Char(char),
    Enter,
    Tab,
    BackTab,
    Backspace,
    Escape,
    Insert,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
}

bitflags! {
    /// Keyboard modifiers, in xterm's bit order (`param = 1 + bits`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b001;
        const ALT   = 0b010;
        const CTRL  = 0b100;
    }
}

/// A mouse report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    /// 0-indexed column.
    pub x: u16,
    /// 0-indexed row.
    pub y: u16,
    pub modifiers: Modifiers,
}

/// What the mouse did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    Press(MouseButton),
    Release(MouseButton),
    /// Motion with a button held.
    Drag(MouseButton),
    /// Motion with no button held (only reported in all-motion mode).
    Move,
    ScrollUp,
    ScrollDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

// ─── Parser ─────────────────────────────────────────────────────────────────

/// Incremental terminal input parser.
///
/// Incomplete sequences stay buffered until more bytes arrive. A bare ESC
/// is ambiguous (Escape key, or the start of a sequence), so it is held
/// until [`flush`](Parser::flush) resolves it.
pub struct Parser {
    buf: Vec<u8>,
}

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(64),
        }
    }

    /// Feed bytes and return every event that is now complete.
    pub fn advance(&mut self, data: &[u8]) -> Vec<Event> {
        self.buf.extend_from_slice(data);
        let mut events = Vec::new();
        let mut pos = 0;

        while pos < self.buf.len() {
            match parse_one(&self.buf[pos..]) {
                Parsed::Event(event, consumed) => {
                    events.push(event);
                    pos += consumed;
                }
                Parsed::Skip(n) => pos += n,
                Parsed::Incomplete => break,
            }
        }

        self.buf.drain(..pos);
        events
    }

    /// Whether bytes are waiting for the rest of a sequence.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Resolve pending bytes after a quiet period.
    ///
    /// A lone ESC becomes the Escape key. Anything else left over is a
    /// truncated sequence and is dropped.
    pub fn flush(&mut self) -> Vec<Event> {
        let events = if self.buf == [0x1B] {
            vec![Event::Key(KeyEvent::plain(KeyCode::Escape))]
        } else {
            if !self.buf.is_empty() {
                log::trace!("dropping {} bytes of truncated input", self.buf.len());
            }
            Vec::new()
        };
        self.buf.clear();
        events
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Stateless Parsing ──────────────────────────────────────────────────────

/// Longest CSI sequence kept while waiting for its final byte.
const MAX_SEQUENCE_LEN: usize = 64;

enum Parsed {
    /// An event, and how many bytes it consumed.
    Event(Event, usize),
    /// Need more bytes.
    Incomplete,
    /// Unrecognized bytes to discard.
    Skip(usize),
}

fn parse_one(buf: &[u8]) -> Parsed {
    match buf[0] {
        0x1B => parse_escape(buf),
        0x00 => key(KeyCode::Char(' '), Modifiers::CTRL, 1),
        0x09 => key(KeyCode::Tab, Modifiers::empty(), 1),
        0x0A | 0x0D => key(KeyCode::Enter, Modifiers::empty(), 1),
        0x08 | 0x7F => key(KeyCode::Backspace, Modifiers::empty(), 1),
        b @ 0x01..=0x1A => key(KeyCode::Char(char::from(b - 1 + b'a')), Modifiers::CTRL, 1),
        b @ 0x20..=0x7E => key(KeyCode::Char(char::from(b)), Modifiers::empty(), 1),
        0xC0..=0xF7 => parse_utf8(buf),
        _ => Parsed::Skip(1),
    }
}

const fn key(code: KeyCode, modifiers: Modifiers, consumed: usize) -> Parsed {
    Parsed::Event(Event::Key(KeyEvent { code, modifiers }), consumed)
}

fn parse_escape(buf: &[u8]) -> Parsed {
    let Some(&next) = buf.get(1) else {
        return Parsed::Incomplete;
    };

    match next {
        b'[' => parse_csi(buf),
        b'O' => parse_ss3(buf),
        0x1B => key(KeyCode::Escape, Modifiers::ALT, 2),
        b @ 0x20..=0x7E => key(KeyCode::Char(char::from(b)), Modifiers::ALT, 2),
        _ => key(KeyCode::Escape, Modifiers::empty(), 1),
    }
}

fn parse_csi(buf: &[u8]) -> Parsed {
    if buf.len() < 3 {
        return Parsed::Incomplete;
    }
    if buf[2] == b'<' {
        return parse_sgr_mouse(buf);
    }

    // Parameter and intermediate bytes run until a final byte in 0x40..=0x7E.
    let mut end = 2;
    loop {
        if end >= MAX_SEQUENCE_LEN {
            return Parsed::Skip(end);
        }
        let Some(&b) = buf.get(end) else {
            return Parsed::Incomplete;
        };
        if (0x40..=0x7E).contains(&b) {
            break;
        }
        if !(0x20..=0x3F).contains(&b) {
            return Parsed::Skip(end);
        }
        end += 1;
    }

    let params = parse_params(&buf[2..end]);
    let consumed = end + 1;
    let modifiers = params.get(1).copied().map_or(Modifiers::empty(), decode_modifiers);

    let code = match buf[end] {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        b'Z' => KeyCode::BackTab,
        b'R' if params.len() == 2 => {
            return Parsed::Event(
                Event::CursorPosition {
                    row: params[0],
                    col: params[1],
                },
                consumed,
            );
        }
        b'~' => match params.first() {
            Some(1 | 7) => KeyCode::Home,
            Some(2) => KeyCode::Insert,
            Some(3) => KeyCode::Delete,
            Some(4 | 8) => KeyCode::End,
            Some(5) => KeyCode::PageUp,
            Some(6) => KeyCode::PageDown,
            _ => return Parsed::Skip(consumed),
        },
        _ => return Parsed::Skip(consumed),
    };

    key(code, modifiers, consumed)
}

fn parse_ss3(buf: &[u8]) -> Parsed {
    let Some(&b) = buf.get(2) else {
        return Parsed::Incomplete;
    };
    let code = match b {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        _ => return Parsed::Skip(3),
    };
    key(code, Modifiers::empty(), 3)
}

/// `ESC [ < Cb ; Cx ; Cy M` (press / motion) or `... m` (release).
fn parse_sgr_mouse(buf: &[u8]) -> Parsed {
    let mut end = 3;
    loop {
        if end >= MAX_SEQUENCE_LEN {
            return Parsed::Skip(end);
        }
        let Some(&b) = buf.get(end) else {
            return Parsed::Incomplete;
        };
        if b == b'M' || b == b'm' {
            break;
        }
        if !b.is_ascii_digit() && b != b';' {
            return Parsed::Skip(end + 1);
        }
        end += 1;
    }

    let params = parse_params(&buf[3..end]);
    let &[cb, raw_x, raw_y] = params.as_slice() else {
        return Parsed::Skip(end + 1);
    };
    let is_release = buf[end] == b'm';

    let mut modifiers = Modifiers::empty();
    if cb & 4 != 0 {
        modifiers |= Modifiers::SHIFT;
    }
    if cb & 8 != 0 {
        modifiers |= Modifiers::ALT;
    }
    if cb & 16 != 0 {
        modifiers |= Modifiers::CTRL;
    }

    let base = cb & 3;
    let kind = if cb & 64 != 0 {
        if base == 0 {
            MouseEventKind::ScrollUp
        } else {
            MouseEventKind::ScrollDown
        }
    } else if cb & 32 != 0 {
        match base {
            3 => MouseEventKind::Move,
            b => MouseEventKind::Drag(decode_button(b)),
        }
    } else if is_release {
        MouseEventKind::Release(decode_button(base))
    } else {
        MouseEventKind::Press(decode_button(base))
    };

    Parsed::Event(
        Event::Mouse(MouseEvent {
            kind,
            x: raw_x.saturating_sub(1),
            y: raw_y.saturating_sub(1),
            modifiers,
        }),
        end + 1,
    )
}

fn parse_utf8(buf: &[u8]) -> Parsed {
    let len = match buf[0] {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    };
    if buf.len() < len {
        return Parsed::Incomplete;
    }
    std::str::from_utf8(&buf[..len])
        .ok()
        .and_then(|s| s.chars().next())
        .map_or(Parsed::Skip(1), |ch| key(KeyCode::Char(ch), Modifiers::empty(), len))
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Semicolon-separated decimal parameters. Empty fields read as 0,
/// colon sub-parameters are ignored, values saturate at `u16::MAX`.
fn parse_params(raw: &[u8]) -> Vec<u16> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(|&b| b == b';')
        .map(|field| {
            field
                .iter()
                .take_while(|b| b.is_ascii_digit())
                .fold(0u16, |acc, &b| acc.saturating_mul(10).saturating_add(u16::from(b - b'0')))
        })
        .collect()
}

/// xterm modifier parameter: `1 + bitmask`.
#[allow(clippy::cast_possible_truncation)]
const fn decode_modifiers(param: u16) -> Modifiers {
    Modifiers::from_bits_truncate(param.saturating_sub(1) as u8)
}

const fn decode_button(base: u16) -> MouseButton {
    match base {
        0 => MouseButton::Left,
        1 => MouseButton::Middle,
        _ => MouseButton::Right,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
