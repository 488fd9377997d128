// SPDX-License-Identifier: MIT
//
// Output buffering and stateful cell rendering.
//
// OutputBuffer collects a whole frame of escape sequences in memory so it
// reaches the terminal (or the socket of a remote session) in one write.
//
// CellWriter remembers the cursor position, colors and attributes it last
// emitted, and skips sequences that would not change anything. A run of
// cells in the same style costs one SGR sequence plus the characters.

use std::io::{self, Write};

use crate::ansi;
use crate::cell::{Attr, Cell};
use crate::color::CellColor;

// ─── OutputBuffer ────────────────────────────────────────────────────────────

/// A growable byte buffer flushed to the destination once per frame.
pub struct OutputBuffer {
    buf: Vec<u8>,
}

const DEFAULT_CAPACITY: usize = 16_384;

impl OutputBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append a codepoint as UTF-8. Invalid codepoints and the continuation
    /// marker are written as `?`.
    pub fn write_codepoint(&mut self, cp: u32) {
        match char::from_u32(cp).filter(|&ch| ch != '\0') {
            Some(ch) => {
                let mut enc = [0u8; 4];
                self.buf.extend_from_slice(ch.encode_utf8(&mut enc).as_bytes());
            }
            None => self.buf.push(b'?'),
        }
    }

    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Write everything to `w`, flush it, and empty the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails. The buffer keeps its
    /// content in that case.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if !self.buf.is_empty() {
            w.write_all(&self.buf)?;
            w.flush()?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── CellWriter ──────────────────────────────────────────────────────────────

/// Renders cells while tracking terminal state.
///
/// - Cursor moves are skipped when the next cell directly follows the last.
/// - An attribute change resets (SGR 0) and re-emits, which also invalidates
///   the tracked colors.
/// - Colors are emitted only when they differ from the tracked ones.
/// - A continuation cell right after its wide character produces no output.
#[allow(clippy::struct_field_names)]
pub struct CellWriter {
    last_x: i32,
    last_y: i32,
    last_fg: Option<CellColor>,
    last_bg: Option<CellColor>,
    last_attrs: Attr,
}

impl CellWriter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_x: -1,
            last_y: -1,
            last_fg: None,
            last_bg: None,
            last_attrs: Attr::empty(),
        }
    }

    /// Forget tracked state. Call after anything that resets the terminal.
    #[allow(clippy::missing_const_for_fn)]
    pub fn reset_state(&mut self) {
        *self = Self::new();
    }

    /// Render one cell at `(x, y)`.
    pub fn render_cell(&mut self, out: &mut OutputBuffer, x: u16, y: u16, cell: &Cell) {
        let xi = i32::from(x);
        let yi = i32::from(y);

        if cell.is_continuation() && yi == self.last_y && xi == self.last_x + 1 {
            self.last_x = xi;
            return;
        }

        if yi != self.last_y || xi != self.last_x + 1 {
            ansi::cursor_to(out, x, y).ok();
        }

        self.apply_style(out, cell);
        if cell.is_continuation() {
            out.buf.push(b' ');
        } else {
            out.write_codepoint(cell.ch);
        }

        self.last_x = xi;
        self.last_y = yi;
    }

    fn apply_style(&mut self, out: &mut OutputBuffer, cell: &Cell) {
        if cell.attrs != self.last_attrs {
            if !self.last_attrs.is_empty() {
                ansi::reset(out).ok();
                self.last_fg = None;
                self.last_bg = None;
            }
            self.last_attrs = cell.attrs;
            ansi::attrs(out, cell.attrs).ok();
        }

        if self.last_fg != Some(cell.fg) {
            ansi::fg(out, cell.fg).ok();
            self.last_fg = Some(cell.fg);
        }

        if self.last_bg != Some(cell.bg) {
            ansi::bg(out, cell.bg).ok();
            self.last_bg = Some(cell.bg);
        }
    }
}

impl Default for CellWriter {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
