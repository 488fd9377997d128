//! The window of the plane that is on screen.
//!
//! Screen coordinates are 0-indexed terminal columns and rows. The canvas
//! border takes screen row 0 and column 0, so the first interior cell is at
//! screen `(1, 1)` and shows plane point `offset`:
//!
//! ```text
//! plane = (sx + offset.x - 1, sy + offset.y - 1)
//! ```
//!
//! Both painting and rendering go through [`Viewport::screen_to_plane`] /
//! [`Viewport::plane_to_screen`], so the border correction lives in exactly
//! one place.
//!
//! Panning is relative. Each pointer move shifts the offset by the distance
//! travelled since the previous move and then re-anchors, so the final
//! offset depends only on where the drag started and ended.

use crate::plane::Point;

/// Canvas interior size, pan offset and pan anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    width: u16,
    height: u16,
    offset: Point,
    anchor: (i32, i32),
}

impl Viewport {
    /// A viewport of `width` x `height` interior cells at the origin.
    #[must_use]
    pub const fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            offset: Point::ORIGIN,
            anchor: (0, 0),
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

    /// The plane point shown at the first interior cell.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> Point {
        self.offset
    }

    /// Whether a screen position is inside the canvas interior.
    #[inline]
    #[must_use]
    pub const fn contains(&self, sx: u16, sy: u16) -> bool {
        sx > 0 && sy > 0 && sx <= self.width && sy <= self.height
    }

    /// The plane point under a screen position. Defined for every screen
    /// position, inside the canvas or not.
    #[inline]
    #[must_use]
    pub const fn screen_to_plane(&self, sx: u16, sy: u16) -> Point {
        Point::new(
            (sx as i32).wrapping_add(self.offset.x).wrapping_sub(1),
            (sy as i32).wrapping_add(self.offset.y).wrapping_sub(1),
        )
    }

    /// The screen position showing plane point `p`, or `None` when `p` is
    /// outside the visible window.
    #[must_use]
    pub fn plane_to_screen(&self, p: Point) -> Option<(u16, u16)> {
        let sx = i64::from(p.x) - i64::from(self.offset.x) + 1;
        let sy = i64::from(p.y) - i64::from(self.offset.y) + 1;
        let sx = u16::try_from(sx).ok()?;
        let sy = u16::try_from(sy).ok()?;
        self.contains(sx, sy).then_some((sx, sy))
    }

    /// Start a pan drag at screen position `(sx, sy)`.
    pub const fn pan_begin(&mut self, sx: u16, sy: u16) {
        self.anchor = (sx as i32, sy as i32);
    }

    /// Continue a pan drag: the plane follows the pointer.
    pub const fn pan_continue(&mut self, sx: u16, sy: u16) {
        let (sx, sy) = (sx as i32, sy as i32);
        let dx = sx - self.anchor.0;
        let dy = sy - self.anchor.1;
        self.offset = Point::new(
            self.offset.x.saturating_sub(dx),
            self.offset.y.saturating_sub(dy),
        );
        self.anchor = (sx, sy);
    }

    /// Change the interior size. The offset is kept.
    pub const fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }

    /// Move back to the origin.
    pub const fn reset(&mut self) {
        self.offset = Point::ORIGIN;
        self.anchor = (0, 0);
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn border_correction() {
        let vp = Viewport::new(20, 10);
        assert_eq!(vp.screen_to_plane(1, 1), Point::ORIGIN);
        assert_eq!(vp.screen_to_plane(5, 5), Point::new(4, 4));
        assert_eq!(vp.screen_to_plane(0, 0), Point::new(-1, -1));
    }

    #[test]
    fn contains_excludes_border() {
        let vp = Viewport::new(20, 10);
        assert!(vp.contains(1, 1));
        assert!(vp.contains(20, 10));
        assert!(!vp.contains(0, 5));
        assert!(!vp.contains(5, 0));
        assert!(!vp.contains(21, 5));
        assert!(!vp.contains(5, 11));
    }

    #[test]
    fn plane_to_screen_inverts() {
        let mut vp = Viewport::new(20, 10);
        vp.pan_begin(10, 5);
        vp.pan_continue(7, 3);
        for (sx, sy) in [(1, 1), (20, 10), (9, 4)] {
            let p = vp.screen_to_plane(sx, sy);
            assert_eq!(vp.plane_to_screen(p), Some((sx, sy)));
        }
        assert_eq!(vp.plane_to_screen(vp.screen_to_plane(0, 3)), None);
        assert_eq!(vp.plane_to_screen(Point::new(i32::MIN, 0)), None);
    }

    #[test]
    fn pan_moves_offset_against_pointer() {
        let mut vp = Viewport::new(20, 10);
        vp.pan_begin(5, 5);
        vp.pan_continue(7, 5);
        assert_eq!(vp.offset(), Point::new(-2, 0));
        vp.pan_continue(7, 2);
        assert_eq!(vp.offset(), Point::new(-2, 3));
    }

    #[test]
    fn pan_is_additive_over_steps() {
        let mut stepped = Viewport::new(20, 10);
        stepped.pan_begin(10, 10);
        stepped.pan_continue(12, 9);
        stepped.pan_continue(15, 4);

        let mut single = Viewport::new(20, 10);
        single.pan_begin(10, 10);
        single.pan_continue(15, 4);

        assert_eq!(stepped.offset(), single.offset());
    }

    #[test]
    fn pan_begin_does_not_move() {
        let mut vp = Viewport::new(20, 10);
        vp.pan_begin(3, 3);
        vp.pan_continue(3, 3);
        assert_eq!(vp.offset(), Point::ORIGIN);
    }

    #[test]
    fn resize_is_idempotent_and_keeps_offset() {
        let mut vp = Viewport::new(20, 10);
        vp.pan_begin(5, 5);
        vp.pan_continue(4, 4);
        vp.resize(40, 12);
        let once = vp;
        vp.resize(40, 12);
        assert_eq!(vp, once);
        assert_eq!(vp.offset(), Point::new(1, 1));
        assert_eq!((vp.width(), vp.height()), (40, 12));
    }

    #[test]
    fn reset_returns_to_origin() {
        let mut vp = Viewport::new(20, 10);
        vp.pan_begin(0, 0);
        vp.pan_continue(9, 9);
        vp.reset();
        assert_eq!(vp.offset(), Point::ORIGIN);
    }
}
