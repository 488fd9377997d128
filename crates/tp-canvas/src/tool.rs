//! Brushes and the tool mode.
//!
//! | Mode  | Pointer drag inside the canvas         |
//! |-------|----------------------------------------|
//! | Paint | stamps the selected tip in the color   |
//! | Erase | removes whatever is under the pointer  |
//! | Pan   | drags the plane along with the pointer |
//!
//! Erase and pan are modes of one enum, so they cannot both be active.

use std::fmt;

use crate::palette::PaletteIndex;

// ---------------------------------------------------------------------------
// Tip catalog
// ---------------------------------------------------------------------------

/// A brush shape and the strip column of its button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tip {
    /// `None` is the solid tip, which paints color blocks.
    pub glyph: Option<char>,
    /// Screen column of the tip's button on the options strip.
    pub column: u16,
}

impl Tip {
    #[inline]
    #[must_use]
    pub const fn is_solid(&self) -> bool {
        self.glyph.is_none()
    }
}

const fn tip(glyph: char, column: u16) -> Tip {
    Tip {
        glyph: Some(glyph),
        column,
    }
}

/// Every tip, in strip order.
pub const TIPS: [Tip; 8] = [
    tip('░', 51),
    tip('▒', 54),
    tip('▓', 57),
    tip('■', 60),
    tip('⬤', 63),
    Tip {
        glyph: None,
        column: 66,
    },
    tip('.', 69),
    tip('◌', 72),
];

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    #[default]
    Paint,
    Erase,
    Pan,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Paint => "paint",
            Self::Erase => "erase",
            Self::Pan => "move",
        })
    }
}

// ---------------------------------------------------------------------------
// ToolState
// ---------------------------------------------------------------------------

/// The selected tip, color and mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolState {
    tip: usize,
    color: PaletteIndex,
    mode: Mode,
}

impl ToolState {
    /// First tip, color 1, painting.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tip: 0,
            color: PaletteIndex::DEFAULT,
            mode: Mode::Paint,
        }
    }

    #[inline]
    #[must_use]
    pub const fn tip_index(&self) -> usize {
        self.tip
    }

    #[inline]
    #[must_use]
    pub const fn tip(&self) -> Tip {
        TIPS[self.tip]
    }

    #[inline]
    #[must_use]
    pub const fn color(&self) -> PaletteIndex {
        self.color
    }

    #[inline]
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Pick a color and go back to painting.
    pub const fn select_color(&mut self, color: PaletteIndex) {
        self.color = color;
        self.mode = Mode::Paint;
    }

    /// Pick a tip from [`TIPS`] and go back to painting. Out-of-range
    /// indices are ignored.
    pub fn select_tip(&mut self, index: usize) {
        if index < TIPS.len() {
            self.tip = index;
            self.mode = Mode::Paint;
        }
    }

    /// Erase on, or back to painting if it already was.
    pub const fn toggle_erase(&mut self) {
        self.mode = match self.mode {
            Mode::Erase => Mode::Paint,
            Mode::Paint | Mode::Pan => Mode::Erase,
        };
    }

    /// Pan on, or back to painting if it already was.
    pub const fn toggle_pan(&mut self) {
        self.mode = match self.mode {
            Mode::Pan => Mode::Paint,
            Mode::Paint | Mode::Erase => Mode::Pan,
        };
    }

    pub const fn paint_mode(&mut self) {
        self.mode = Mode::Paint;
    }
}

impl Default for ToolState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_columns() {
        let columns: Vec<u16> = TIPS.iter().map(|t| t.column).collect();
        assert_eq!(columns, vec![51, 54, 57, 60, 63, 66, 69, 72]);
        assert_eq!(TIPS.iter().filter(|t| t.is_solid()).count(), 1);
        assert!(TIPS[5].is_solid());
    }

    #[test]
    fn initial_state() {
        let tools = ToolState::new();
        assert_eq!(tools.tip_index(), 0);
        assert_eq!(tools.tip().glyph, Some('░'));
        assert_eq!(tools.color().get(), 1);
        assert_eq!(tools.mode(), Mode::Paint);
    }

    #[test]
    fn erase_toggles() {
        let mut tools = ToolState::new();
        tools.toggle_erase();
        assert_eq!(tools.mode(), Mode::Erase);
        tools.toggle_erase();
        assert_eq!(tools.mode(), Mode::Paint);
    }

    #[test]
    fn erase_and_pan_exclude_each_other() {
        let mut tools = ToolState::new();
        tools.toggle_pan();
        tools.toggle_erase();
        assert_eq!(tools.mode(), Mode::Erase);
        tools.toggle_pan();
        assert_eq!(tools.mode(), Mode::Pan);
    }

    #[test]
    fn selections_return_to_paint() {
        let mut tools = ToolState::new();
        tools.toggle_erase();
        tools.select_color(PaletteIndex::new(7).unwrap());
        assert_eq!(tools.mode(), Mode::Paint);
        assert_eq!(tools.color().get(), 7);

        tools.toggle_pan();
        tools.select_tip(5);
        assert_eq!(tools.mode(), Mode::Paint);
        assert!(tools.tip().is_solid());
    }

    #[test]
    fn bad_tip_index_is_ignored() {
        let mut tools = ToolState::new();
        tools.toggle_pan();
        tools.select_tip(99);
        assert_eq!(tools.tip_index(), 0);
        assert_eq!(tools.mode(), Mode::Pan);
    }

    #[test]
    fn mode_labels() {
        assert_eq!(Mode::Pan.to_string(), "move");
        assert_eq!(Mode::Erase.to_string(), "erase");
    }
}
