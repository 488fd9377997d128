//! Painting a session into a frame buffer.
//!
//! ```text
//! row 0          ╭──────────────╮
//! rows 1..=h     │   canvas     │   h = rows - 3 interior rows
//! row rows - 2   ╰──────────────╯
//! row rows - 1   options strip
//! ```
//!
//! Plane cells become terminal cells here and nowhere else: the glyph (or a
//! space), with palette indices as ANSI 256 colors.

use tp_term::buffer::FrameBuffer;
use tp_term::cell::{Attr, Cell as TermCell};
use tp_term::color::CellColor;

use crate::plane::{Cell, Plane};
use crate::strip::Span;
use crate::viewport::Viewport;

/// The terminal cell a plane cell is shown as.
#[must_use]
pub fn term_cell(cell: Cell) -> TermCell {
    TermCell::styled(
        cell.display_char(),
        cell.fg.map_or(CellColor::Default, Into::into),
        cell.bg.map_or(CellColor::Default, Into::into),
        Attr::empty(),
    )
}

/// Border, canvas interior and strip for a frame of the buffer's size.
pub fn frame(buf: &mut FrameBuffer, plane: &Plane, viewport: &Viewport, strip: &[Span]) {
    border(buf);
    canvas(buf, plane, viewport);
    if let Some(row) = buf.height().checked_sub(1) {
        spans(buf, row, strip);
    }
}

/// Rounded box around rows `0..=height - 2`. Needs at least 2x2 cells of
/// box; smaller buffers get no border.
pub fn border(buf: &mut FrameBuffer) {
    let width = buf.width();
    let Some(bottom) = buf.height().checked_sub(2) else {
        return;
    };
    if width < 2 || bottom == 0 {
        return;
    }
    let right = width - 1;

    let line = TermCell::new('─');
    buf.fill_row(1, 0, right - 1, line);
    buf.fill_row(1, bottom, right - 1, line);
    buf.set(0, 0, TermCell::new('╭'));
    buf.set(right, 0, TermCell::new('╮'));
    buf.set(0, bottom, TermCell::new('╰'));
    buf.set(right, bottom, TermCell::new('╯'));

    for y in 1..bottom {
        buf.set(0, y, TermCell::new('│'));
        buf.set(right, y, TermCell::new('│'));
    }
}

/// The painted cells visible through `viewport`.
pub fn canvas(buf: &mut FrameBuffer, plane: &Plane, viewport: &Viewport) {
    let origin = viewport.screen_to_plane(1, 1);
    for (p, cell) in plane.region(origin, viewport.width(), viewport.height()) {
        if let Some((sx, sy)) = viewport.plane_to_screen(p) {
            buf.set(sx, sy, term_cell(cell));
        }
    }
}

/// Strip spans laid left to right on `row`, clipped at the buffer edge.
pub fn spans(buf: &mut FrameBuffer, row: u16, strip: &[Span]) {
    let mut col: u16 = 0;
    for span in strip {
        if col >= buf.width() {
            break;
        }
        col = col.saturating_add(buf.paint_text(col, row, &span.text, span.fg, span.bg, span.attrs));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::PaletteIndex;
    use crate::plane::Point;
    use crate::strip;
    use crate::tool::ToolState;
    use pretty_assertions::assert_eq;

    fn color(i: u8) -> PaletteIndex {
        PaletteIndex::new(i).unwrap()
    }

    #[test]
    fn border_frames_the_canvas() {
        let mut buf = FrameBuffer::new(6, 5);
        border(&mut buf);
        assert_eq!(
            buf.to_lines(),
            vec!["╭────╮", "│    │", "│    │", "╰────╯", ""]
        );
    }

    #[test]
    fn tiny_buffers_skip_border() {
        for (w, h) in [(0, 0), (1, 5), (5, 2)] {
            let mut buf = FrameBuffer::new(w, h);
            border(&mut buf);
            assert!(buf.cells().iter().all(|c| c.is_empty()));
        }
    }

    #[test]
    fn term_cell_maps_colors() {
        let overlay = Cell {
            glyph: Some('▒'),
            fg: Some(color(2)),
            bg: Some(color(5)),
        };
        let t = term_cell(overlay);
        assert_eq!(t.character(), Some('▒'));
        assert_eq!(t.fg, CellColor::Ansi256(2));
        assert_eq!(t.bg, CellColor::Ansi256(5));

        let block = term_cell(Cell::block(color(3)));
        assert_eq!(block.character(), Some(' '));
        assert_eq!(block.fg, CellColor::Default);
    }

    #[test]
    fn canvas_places_cells_through_viewport() {
        let mut plane = Plane::new();
        plane.set(Point::new(4, 4), Cell::block(color(3)));
        plane.set(Point::new(100, 100), Cell::block(color(3)));
        let mut vp = Viewport::new(20, 10);

        let mut buf = FrameBuffer::new(22, 13);
        canvas(&mut buf, &plane, &vp);
        assert_eq!(buf.get(5, 5).unwrap().bg, CellColor::Ansi256(3));

        vp.pan_begin(5, 5);
        vp.pan_continue(7, 5);
        let mut buf = FrameBuffer::new(22, 13);
        canvas(&mut buf, &plane, &vp);
        assert_eq!(buf.get(7, 5).unwrap().bg, CellColor::Ansi256(3));
        assert!(buf.get(5, 5).unwrap().is_empty());
        assert_eq!(buf.cells().iter().filter(|c| !c.is_empty()).count(), 1);
    }

    #[test]
    fn strip_lands_on_last_row() {
        let mut buf = FrameBuffer::new(140, 6);
        frame(
            &mut buf,
            &Plane::new(),
            &Viewport::new(138, 3),
            &strip::spans(&ToolState::new(), Point::ORIGIN, None),
        );
        let last = buf.to_lines().pop().unwrap();
        assert!(last.starts_with("⟬ colors:"));
        assert!(last.ends_with("⟬ save ⟭"));
        assert_eq!(buf.get(95, 5).and_then(|c| c.character()), Some('c'));
        assert_eq!(buf.get(126, 5).and_then(|c| c.character()), Some('s'));
    }

    #[test]
    fn strip_clips_on_narrow_screens() {
        let mut buf = FrameBuffer::new(12, 1);
        spans(&mut buf, 0, &strip::spans(&ToolState::new(), Point::ORIGIN, None));
        assert_eq!(buf.to_lines(), vec!["⟬ colors:"]);
        assert_eq!(buf.get(10, 0).unwrap().bg, CellColor::Ansi256(0));
    }
}
