// SPDX-License-Identifier: MIT
//
// FrameBuffer: the 2D cell grid a frame is painted into.
//
// Every character position on screen is a cell in this buffer. The canvas
// border, the visible part of the drawing plane and the options strip are
// all painted here, then the diff renderer compares the frame against the
// previous one and emits escape sequences for what changed.
//
// Layout is a flat `Vec<Cell>` in row-major order, so a row is a contiguous
// slice and the renderer's left-to-right scan is linear.
//
// Wide characters occupy two columns: the codepoint in the first cell and a
// continuation cell after it. `paint_text` creates continuations and
// `set` breaks any wide character it lands on.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::cell::{Attr, Cell};
use crate::color::CellColor;

/// A 2D buffer of terminal cells.
///
/// # Examples
///
/// ```
/// use tp_term::buffer::FrameBuffer;
/// use tp_term::cell::Cell;
///
/// let mut buf = FrameBuffer::new(80, 24);
/// buf.set(5, 3, Cell::new('X'));
/// assert_eq!(buf.get(5, 3).and_then(|c| c.character()), Some('X'));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    /// A buffer filled with empty cells.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::EMPTY; usize::from(width) * usize::from(height)],
        }
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    #[inline]
    #[must_use]
    pub const fn in_bounds(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    #[inline]
    const fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// The cell at `(x, y)`, or `None` outside the buffer.
    #[inline]
    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        if self.in_bounds(x, y) {
            Some(&self.cells[self.index(x, y)])
        } else {
            None
        }
    }

    /// All cells, row-major.
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// One row as a slice, or `None` if `y` is past the bottom.
    #[inline]
    #[must_use]
    pub fn row(&self, y: u16) -> Option<&[Cell]> {
        if y < self.height {
            let start = self.index(0, y);
            Some(&self.cells[start..start + usize::from(self.width)])
        } else {
            None
        }
    }

    /// Reset every cell to [`Cell::EMPTY`].
    pub fn clear(&mut self) {
        self.cells.fill(Cell::EMPTY);
    }

    /// Change dimensions. Content is discarded.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.cells.clear();
        self.cells
            .resize(usize::from(width) * usize::from(height), Cell::EMPTY);
    }

    /// Copy another buffer's content into this one, reusing the allocation.
    ///
    /// Dimensions must match; a mismatched source is cloned instead.
    pub fn copy_from(&mut self, other: &Self) {
        if self.width == other.width && self.height == other.height {
            self.cells.copy_from_slice(&other.cells);
        } else {
            self.clone_from(other);
        }
    }

    /// Write one cell. Returns `false` outside the buffer.
    ///
    /// A wide character touching `(x, y)` is broken so that no orphaned
    /// half remains on screen.
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        self.break_wide_char_at(x, y);
        let idx = self.index(x, y);
        self.cells[idx] = cell;
        true
    }

    fn break_wide_char_at(&mut self, x: u16, y: u16) {
        let idx = self.index(x, y);
        if self.cells[idx].is_continuation() && x > 0 {
            let owner = self.index(x - 1, y);
            self.cells[owner].ch = u32::from(b' ');
        }
        if x + 1 < self.width {
            let next = self.index(x + 1, y);
            if self.cells[next].is_continuation() {
                self.cells[next] = Cell::EMPTY;
            }
        }
    }

    /// Paint a string starting at `(x, y)` with one style.
    ///
    /// Wide characters take two columns; one that would straddle the right
    /// edge is replaced by a space. Zero-width characters are skipped.
    /// Returns the number of columns consumed.
    pub fn paint_text(
        &mut self,
        x: u16,
        y: u16,
        text: &str,
        fg: CellColor,
        bg: CellColor,
        attrs: Attr,
    ) -> u16 {
        if y >= self.height {
            return 0;
        }

        let mut col = x;
        for ch in text.chars() {
            if col >= self.width {
                break;
            }
            let w = char_width(ch);
            if w == 0 {
                continue;
            }
            if w == 2 && col + 1 >= self.width {
                self.set(col, y, Cell::styled(' ', fg, bg, attrs));
                col += 1;
                break;
            }

            self.set(col, y, Cell::styled(ch, fg, bg, attrs));
            if w == 2 {
                self.set(col + 1, y, Cell::continuation(fg, bg, attrs));
            }
            #[allow(clippy::cast_possible_truncation)]
            let step = w as u16;
            col = col.saturating_add(step);
        }

        col.saturating_sub(x)
    }

    /// Fill `width` cells of row `y` starting at `x` with `cell`.
    pub fn fill_row(&mut self, x: u16, y: u16, width: u16, cell: Cell) {
        for col in x..x.saturating_add(width).min(self.width) {
            self.set(col, y, cell);
        }
    }

    /// The buffer's characters, one string per row, with trailing spaces
    /// trimmed. Styling is dropped; continuation cells emit nothing.
    #[must_use]
    pub fn to_lines(&self) -> Vec<String> {
        (0..self.height)
            .filter_map(|y| self.row(y))
            .map(|row| {
                let line: String = row.iter().filter_map(|c| c.character()).collect();
                line.trim_end().to_owned()
            })
            .collect()
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FrameBuffer({}x{})", self.width, self.height)
    }
}

// ─── Text Width ─────────────────────────────────────────────────────────────

/// Display width of a character in terminal columns (0, 1 or 2).
///
/// ```
/// use tp_term::buffer::char_width;
///
/// assert_eq!(char_width('a'), 1);
/// assert_eq!(char_width('中'), 2);
/// assert_eq!(char_width('\n'), 0);
/// ```
#[inline]
#[must_use]
pub fn char_width(ch: char) -> usize {
    ch.width().unwrap_or(0)
}

/// Display width of a string in terminal columns.
#[must_use]
pub fn string_width(s: &str) -> usize {
    s.width()
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_buffer_is_empty() {
        let buf = FrameBuffer::new(10, 4);
        assert_eq!(buf.cells().len(), 40);
        assert!(buf.cells().iter().all(|c| c.is_empty()));
    }

    #[test]
    fn zero_size_buffer() {
        let buf = FrameBuffer::new(0, 0);
        assert!(buf.cells().is_empty());
        assert!(buf.get(0, 0).is_none());
        assert!(buf.row(0).is_none());
    }

    #[test]
    fn set_and_get() {
        let mut buf = FrameBuffer::new(5, 5);
        assert!(buf.set(4, 4, Cell::new('z')));
        assert!(!buf.set(5, 0, Cell::new('z')));
        assert_eq!(buf.get(4, 4).and_then(|c| c.character()), Some('z'));
    }

    #[test]
    fn row_slice() {
        let mut buf = FrameBuffer::new(3, 2);
        buf.set(1, 1, Cell::new('m'));
        let row = buf.row(1).unwrap();
        assert_eq!(row.len(), 3);
        assert_eq!(row[1].character(), Some('m'));
    }

    #[test]
    fn resize_discards_content() {
        let mut buf = FrameBuffer::new(4, 4);
        buf.set(0, 0, Cell::new('a'));
        buf.resize(6, 2);
        assert_eq!((buf.width(), buf.height()), (6, 2));
        assert!(buf.cells().iter().all(|c| c.is_empty()));
    }

    #[test]
    fn copy_from_matching_and_mismatched() {
        let mut src = FrameBuffer::new(3, 3);
        src.set(2, 2, Cell::new('q'));

        let mut same = FrameBuffer::new(3, 3);
        same.copy_from(&src);
        assert_eq!(same, src);

        let mut other = FrameBuffer::new(1, 1);
        other.copy_from(&src);
        assert_eq!(other, src);
    }

    #[test]
    fn paint_text_ascii() {
        let mut buf = FrameBuffer::new(10, 1);
        let used = buf.paint_text(2, 0, "hey", CellColor::Ansi256(1), CellColor::Default, Attr::BOLD);
        assert_eq!(used, 3);
        let cell = buf.get(3, 0).unwrap();
        assert_eq!(cell.character(), Some('e'));
        assert_eq!(cell.fg, CellColor::Ansi256(1));
        assert_eq!(cell.attrs, Attr::BOLD);
    }

    #[test]
    fn paint_text_wide_char() {
        let mut buf = FrameBuffer::new(10, 1);
        let used = buf.paint_text(0, 0, "a中b", CellColor::Default, CellColor::Default, Attr::empty());
        assert_eq!(used, 4);
        assert!(buf.get(2, 0).unwrap().is_continuation());
        assert_eq!(buf.get(3, 0).unwrap().character(), Some('b'));
    }

    #[test]
    fn paint_text_wide_char_at_edge_becomes_space() {
        let mut buf = FrameBuffer::new(3, 1);
        let used = buf.paint_text(2, 0, "中", CellColor::Default, CellColor::Default, Attr::empty());
        assert_eq!(used, 1);
        assert_eq!(buf.get(2, 0).unwrap().character(), Some(' '));
    }

    #[test]
    fn paint_text_clips_at_width() {
        let mut buf = FrameBuffer::new(4, 1);
        let used = buf.paint_text(1, 0, "abcdef", CellColor::Default, CellColor::Default, Attr::empty());
        assert_eq!(used, 3);
        assert_eq!(buf.to_lines(), vec![" abc".to_owned()]);
    }

    #[test]
    fn set_over_continuation_breaks_wide_char() {
        let mut buf = FrameBuffer::new(4, 1);
        buf.paint_text(0, 0, "中", CellColor::Default, CellColor::Default, Attr::empty());
        buf.set(1, 0, Cell::new('x'));
        assert_eq!(buf.get(0, 0).unwrap().character(), Some(' '));
        assert_eq!(buf.get(1, 0).unwrap().character(), Some('x'));
    }

    #[test]
    fn fill_row_clips() {
        let mut buf = FrameBuffer::new(5, 1);
        buf.fill_row(3, 0, 10, Cell::new('-'));
        assert_eq!(buf.to_lines(), vec!["   --".to_owned()]);
    }

    #[test]
    fn widths() {
        assert_eq!(char_width('⬤'), string_width("⬤"));
        assert_eq!(string_width("⟬ colors: "), 10);
        assert_eq!(string_width("a中b"), 4);
    }
}
