// SPDX-License-Identifier: MIT
//
// Cell: one character position on the terminal screen.
//
// A cell holds a Unicode codepoint, foreground and background colors, and
// a small set of SGR attributes. The frame buffer is a grid of these; the
// diff renderer compares them and emits escape sequences for the ones that
// changed.
//
// Wide characters occupy two columns. The first cell holds the codepoint;
// the second is a continuation cell (ch = 0) that carries the colors so the
// background still fills, but produces no character output.

use crate::color::CellColor;

// ─── Text Attributes ─────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// SGR text attributes as a compact bitfield.
    ///
    /// ```
    /// use tp_term::cell::Attr;
    ///
    /// let active = Attr::BOLD | Attr::UNDERLINE;
    /// assert!(active.contains(Attr::UNDERLINE));
    /// assert!(!active.contains(Attr::DIM));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u8 {
        /// SGR 1: increased intensity.
        const BOLD      = 1 << 0;
        /// SGR 2: decreased intensity.
        const DIM       = 1 << 1;
        /// SGR 3: italic.
        const ITALIC    = 1 << 2;
        /// SGR 4: single straight underline.
        const UNDERLINE = 1 << 3;
        /// SGR 7: swap foreground and background.
        const INVERSE   = 1 << 4;
    }
}

// ─── Cell ────────────────────────────────────────────────────────────────────

/// A single terminal cell.
///
/// `ch` is a raw codepoint so that the continuation marker (`0`) fits in
/// the same field as real characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    /// Codepoint to display. `0` marks a continuation cell.
    pub ch: u32,
    /// Foreground (glyph) color.
    pub fg: CellColor,
    /// Background color.
    pub bg: CellColor,
    /// Text attributes.
    pub attrs: Attr,
}

const CONTINUATION: u32 = 0;
const SPACE: u32 = b' ' as u32;

impl Cell {
    /// Space, default colors, no attributes.
    pub const EMPTY: Self = Self {
        ch: SPACE,
        fg: CellColor::Default,
        bg: CellColor::Default,
        attrs: Attr::empty(),
    };

    /// A cell showing `ch` with default styling.
    #[inline]
    #[must_use]
    pub const fn new(ch: char) -> Self {
        Self {
            ch: ch as u32,
            fg: CellColor::Default,
            bg: CellColor::Default,
            attrs: Attr::empty(),
        }
    }

    /// A fully styled cell.
    #[inline]
    #[must_use]
    pub const fn styled(ch: char, fg: CellColor, bg: CellColor, attrs: Attr) -> Self {
        Self {
            ch: ch as u32,
            fg,
            bg,
            attrs,
        }
    }

    /// The second column of a wide character.
    #[inline]
    #[must_use]
    pub const fn continuation(fg: CellColor, bg: CellColor, attrs: Attr) -> Self {
        Self {
            ch: CONTINUATION,
            fg,
            bg,
            attrs,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_continuation(self) -> bool {
        self.ch == CONTINUATION
    }

    /// Whether this cell looks exactly like an untouched screen position.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.ch == SPACE
            && self.fg.is_default()
            && self.bg.is_default()
            && self.attrs.is_empty()
    }

    /// The codepoint as a `char`; `None` for continuation cells.
    #[inline]
    #[must_use]
    pub const fn character(self) -> Option<char> {
        if self.ch == CONTINUATION {
            return None;
        }
        char::from_u32(self.ch)
    }

    #[inline]
    #[must_use]
    pub const fn with_fg(self, fg: CellColor) -> Self {
        Self { fg, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_bg(self, bg: CellColor) -> Self {
        Self { bg, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_attrs(self, attrs: Attr) -> Self {
        Self { attrs, ..self }
    }
}

impl Default for Cell {
    #[inline]
    fn default() -> Self {
        Self::EMPTY
    }
}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_continuation() {
            return write!(f, "Cell(continuation)");
        }
        let ch = char::from_u32(self.ch).unwrap_or('?');
        write!(f, "Cell({ch:?}")?;
        if !self.fg.is_default() {
            write!(f, ", fg={:?}", self.fg)?;
        }
        if !self.bg.is_default() {
            write!(f, ", bg={:?}", self.bg)?;
        }
        if !self.attrs.is_empty() {
            write!(f, ", {:?}", self.attrs)?;
        }
        write!(f, ")")
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_fits_in_16_bytes() {
        assert!(std::mem::size_of::<Cell>() <= 16);
    }

    #[test]
    fn default_cell_is_empty() {
        let cell = Cell::default();
        assert!(cell.is_empty());
        assert_eq!(cell, Cell::EMPTY);
    }

    #[test]
    fn colored_space_is_not_empty() {
        let cell = Cell::EMPTY.with_bg(CellColor::Ansi256(3));
        assert!(!cell.is_empty());
    }

    #[test]
    fn glyph_without_style_is_not_empty() {
        let cell = Cell::new('░');
        assert!(!cell.is_empty());
        assert!(cell.fg.is_default() && cell.bg.is_default());
        assert_eq!(cell.character(), Some('░'));
    }

    #[test]
    fn continuation_has_no_character() {
        let cell = Cell::continuation(CellColor::Default, CellColor::Ansi256(1), Attr::empty());
        assert!(cell.is_continuation());
        assert_eq!(cell.character(), None);
        assert_eq!(cell.bg, CellColor::Ansi256(1));
    }

    #[test]
    fn builder_chain() {
        let cell = Cell::new('x')
            .with_fg(CellColor::Ansi256(2))
            .with_bg(CellColor::Ansi256(5))
            .with_attrs(Attr::BOLD | Attr::UNDERLINE);
        assert_eq!(
            cell,
            Cell::styled(
                'x',
                CellColor::Ansi256(2),
                CellColor::Ansi256(5),
                Attr::BOLD | Attr::UNDERLINE
            )
        );
    }

    #[test]
    fn debug_lists_only_set_fields() {
        let dbg = format!("{:?}", Cell::new('A').with_bg(CellColor::Ansi256(4)));
        assert_eq!(dbg, "Cell('A', bg=Ansi256(4))");
        assert_eq!(
            format!("{:?}", Cell::continuation(CellColor::Default, CellColor::Default, Attr::empty())),
            "Cell(continuation)"
        );
    }
}
