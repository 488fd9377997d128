//! What a stroke does to the cell it lands on.
//!
//! Color and glyph are layered, not flattened. A user can lay down a field
//! of color blocks and then stamp glyphs of a different color on top of it
//! without picking the field's color again:
//!
//! | Tip   | Existing cell has a fill | Result                               |
//! |-------|--------------------------|--------------------------------------|
//! | solid | yes or no                | fresh block in the selected color    |
//! | glyph | yes                      | glyph in the color, over the fill    |
//! | glyph | no                       | fresh glyph in the color             |
//!
//! A glyph-only cell has no fill, so stamping on it replaces it.

use crate::palette::PaletteIndex;
use crate::plane::{Cell, Plane, Point};
use crate::tool::{Mode, Tip, ToolState};

/// What a stroke did to the plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stroke {
    Painted(Cell),
    Erased,
    /// Pan mode: the plane is left alone and the viewport moves instead.
    Untouched,
}

/// The cell that results from stamping `tip` in `color` over `existing`.
#[must_use]
pub fn composite(existing: Cell, tip: Tip, color: PaletteIndex) -> Cell {
    match tip.glyph {
        None => Cell::block(color),
        Some(glyph) if existing.has_fill() => Cell {
            glyph: Some(glyph),
            fg: Some(color),
            bg: existing.bg,
        },
        Some(glyph) => Cell::stamp(glyph, color),
    }
}

/// Apply one stroke of the current tool at plane point `at`.
pub fn stroke(plane: &mut Plane, tools: &ToolState, at: Point) -> Stroke {
    match tools.mode() {
        Mode::Erase => {
            plane.erase(at);
            Stroke::Erased
        }
        Mode::Pan => Stroke::Untouched,
        Mode::Paint => {
            let cell = composite(plane.get(at), tools.tip(), tools.color());
            plane.set(at, cell);
            Stroke::Painted(cell)
        }
    }
}
