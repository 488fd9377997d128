//! The drawing surface.
//!
//! The plane has no edges: any `i32` coordinate pair can hold a cell, and
//! panning never has to grow or shift a backing array. Only painted cells
//! are stored, in a hash map keyed by [`Point`]. An absent key reads as
//! [`Cell::EMPTY`], and writing the empty cell removes the key, so the map
//! never holds entries that look like nothing.

use std::collections::HashMap;
use std::fmt;

use crate::palette::PaletteIndex;

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

/// A coordinate on the plane.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// What a plane coordinate holds: an optional glyph over optional colors.
///
/// `glyph: None` is a blank. A blank with a `bg` is a solid color block; a
/// glyph with `fg` is a stamped shape, and with `bg` as well it is a shape
/// overlaid on a block. This is the semantic value only; turning it into
/// terminal styling happens at render time.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cell {
    pub glyph: Option<char>,
    pub fg: Option<PaletteIndex>,
    pub bg: Option<PaletteIndex>,
}

impl Cell {
    /// No glyph, no color. Never stored.
    pub const EMPTY: Self = Self {
        glyph: None,
        fg: None,
        bg: None,
    };

    /// A solid block of `color`.
    #[inline]
    #[must_use]
    pub const fn block(color: PaletteIndex) -> Self {
        Self {
            glyph: None,
            fg: None,
            bg: Some(color),
        }
    }

    /// `glyph` drawn in `color` on the terminal's default background.
    #[inline]
    #[must_use]
    pub const fn stamp(glyph: char, color: PaletteIndex) -> Self {
        Self {
            glyph: Some(glyph),
            fg: Some(color),
            bg: None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.glyph.is_none() && self.fg.is_none() && self.bg.is_none()
    }

    /// Whether the cell carries a background fill.
    #[inline]
    #[must_use]
    pub const fn has_fill(self) -> bool {
        self.bg.is_some()
    }

    /// The character shown for this cell; blanks show a space.
    #[inline]
    #[must_use]
    pub fn display_char(self) -> char {
        self.glyph.unwrap_or(' ')
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("Cell(empty)");
        }
        write!(f, "Cell({:?}", self.display_char())?;
        if let Some(fg) = self.fg {
            write!(f, ", fg={fg}")?;
        }
        if let Some(bg) = self.bg {
            write!(f, ", bg={bg}")?;
        }
        f.write_str(")")
    }
}

// ---------------------------------------------------------------------------
// Plane
// ---------------------------------------------------------------------------

/// The sparse, unbounded store of painted cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plane {
    cells: HashMap<Point, Cell>,
}

impl Plane {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cell at `p`; [`Cell::EMPTY`] if nothing was painted there.
    #[inline]
    #[must_use]
    pub fn get(&self, p: Point) -> Cell {
        self.cells.get(&p).copied().unwrap_or(Cell::EMPTY)
    }

    /// Store `cell` at `p`, replacing whatever was there. Storing the empty
    /// cell is the same as [`erase`](Self::erase).
    pub fn set(&mut self, p: Point, cell: Cell) {
        if cell.is_empty() {
            self.cells.remove(&p);
        } else {
            self.cells.insert(p, cell);
        }
    }

    pub fn erase(&mut self, p: Point) {
        self.cells.remove(&p);
    }

    /// Drop every painted cell.
    pub fn clear(&mut self) {
        self.cells = HashMap::new();
    }

    /// Number of painted cells.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Painted cells inside the `width` x `height` rectangle whose top-left
    /// corner is `origin`, in no particular order.
    ///
    /// Walks whichever is smaller: the stored cells or the rectangle.
    pub fn region(&self, origin: Point, width: u16, height: u16) -> Vec<(Point, Cell)> {
        let right = i64::from(origin.x) + i64::from(width);
        let bottom = i64::from(origin.y) + i64::from(height);
        let inside = |p: &Point| {
            p.x >= origin.x && i64::from(p.x) < right && p.y >= origin.y && i64::from(p.y) < bottom
        };

        let area = usize::from(width) * usize::from(height);
        if self.cells.len() <= area {
            return self
                .cells
                .iter()
                .filter(|(p, _)| inside(p))
                .map(|(&p, &c)| (p, c))
                .collect();
        }

        let mut found = Vec::new();
        for dy in 0..i32::from(height) {
            for dx in 0..i32::from(width) {
                let p = Point::new(origin.x.wrapping_add(dx), origin.y.wrapping_add(dy));
                if let Some(&cell) = self.cells.get(&p) {
                    if inside(&p) {
                        found.push((p, cell));
                    }
                }
            }
        }
        found
    }
}
