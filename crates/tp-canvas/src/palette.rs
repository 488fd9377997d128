//! The paintable colors.
//!
//! A canvas color is an index into the terminal's own palette, so the user's
//! theme decides what "color 3" looks like. Only the first 15 entries are
//! offered by the color ramp.

use std::fmt;

use tp_term::color::CellColor;

/// An index into the paintable palette, always in `0..=14`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaletteIndex(u8);

impl PaletteIndex {
    /// Number of paintable colors.
    pub const COUNT: u8 = 15;

    /// The color selected when a session starts.
    pub const DEFAULT: Self = Self(1);

    /// `None` when `index` is outside the palette.
    #[inline]
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Every paintable color in ramp order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..Self::COUNT).map(Self)
    }

    /// The terminal color this index renders as.
    #[inline]
    #[must_use]
    pub const fn cell_color(self) -> CellColor {
        CellColor::Ansi256(self.0)
    }
}

impl Default for PaletteIndex {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<PaletteIndex> for CellColor {
    #[inline]
    fn from(index: PaletteIndex) -> Self {
        index.cell_color()
    }
}

impl fmt::Debug for PaletteIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Color({})", self.0)
    }
}

impl fmt::Display for PaletteIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
