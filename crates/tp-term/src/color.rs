// SPDX-License-Identifier: MIT
//
// Terminal colors as they land in a cell.
//
// A painting canvas addresses the terminal's own palette: the user picks
// "color 3", and whatever the user's terminal theme calls color 3 is what
// they see. So the color model is the terminal's, not a perceptual one:
// the default color or an index into the 256-color table.

use std::fmt;

/// A fully resolved color for one side (fg or bg) of a terminal cell.
///
/// Two bytes, `Copy`, cheap to compare in the diff loop.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellColor {
    /// Terminal default color (inherits the user's theme).
    #[default]
    Default,

    /// Index into the terminal's 256-color palette.
    ///
    /// Indices 0-15 are the user-themable ANSI colors.
    Ansi256(u8),
}

impl CellColor {
    /// Whether this is the terminal's default color.
    #[inline]
    #[must_use]
    pub const fn is_default(self) -> bool {
        matches!(self, Self::Default)
    }

    /// The palette index, if this color is an indexed one.
    #[inline]
    #[must_use]
    pub const fn index(self) -> Option<u8> {
        match self {
            Self::Ansi256(idx) => Some(idx),
            _ => None,
        }
    }
}

impl From<u8> for CellColor {
    #[inline]
    fn from(idx: u8) -> Self {
        Self::Ansi256(idx)
    }
}

impl fmt::Debug for CellColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Ansi256(idx) => write!(f, "Ansi256({idx})"),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
