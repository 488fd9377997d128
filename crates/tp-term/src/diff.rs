// SPDX-License-Identifier: MIT
//
// Differential renderer.
//
// Compares the current FrameBuffer against the previous frame and emits
// escape sequences only for cells that changed. A stroke of paint touches a
// handful of cells per mouse report, so most frames are a few bytes.
//
// Per frame:
//
//   1. The session paints border, canvas and strip into a FrameBuffer.
//   2. `render()` diffs it against the stored previous frame.
//   3. Changed cells go through the CellWriter into the OutputBuffer.
//   4. `flush_to()` writes the frame to the terminal in one call.
//
// Unchanged rows are skipped with a single slice comparison, the frame is
// wrapped in synchronized output (DEC 2026), and the previous frame is
// updated in place via `copy_from()`.

use std::io::{self, Write};

use crate::ansi;
use crate::buffer::FrameBuffer;
use crate::output::{CellWriter, OutputBuffer};

/// Counters from one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    pub cells_rendered: usize,
    pub cells_skipped: usize,
    pub bytes_written: usize,
}

/// Emits ANSI output for the cells that changed since the last frame.
///
/// ```
/// use tp_term::buffer::FrameBuffer;
/// use tp_term::diff::DiffRenderer;
///
/// let mut renderer = DiffRenderer::new();
/// let frame = FrameBuffer::new(20, 5);
/// let stats = renderer.render(&frame);
/// assert_eq!(stats.cells_rendered, 100);
///
/// let mut sink = Vec::new();
/// renderer.flush_to(&mut sink).unwrap();
/// assert!(!sink.is_empty());
/// ```
pub struct DiffRenderer {
    output: OutputBuffer,
    writer: CellWriter,
    previous: Option<FrameBuffer>,
}

impl DiffRenderer {
    /// A renderer with no previous frame; the first render draws everything.
    #[must_use]
    pub fn new() -> Self {
        Self {
            output: OutputBuffer::new(),
            writer: CellWriter::new(),
            previous: None,
        }
    }

    /// Diff `current` against the previous frame and queue the output.
    pub fn render(&mut self, current: &FrameBuffer) -> RenderStats {
        self.output.clear();
        self.writer.reset_state();

        let width = current.width();
        let height = current.height();
        let mut stats = RenderStats::default();

        if width == 0 || height == 0 {
            self.store_frame(current);
            return stats;
        }

        ansi::begin_sync(&mut self.output).ok();

        let previous = self
            .previous
            .as_ref()
            .filter(|prev| prev.width() == width && prev.height() == height);

        if previous.is_none() {
            ansi::reset(&mut self.output).ok();
            ansi::clear_screen(&mut self.output).ok();
        }

        for y in 0..height {
            let Some(row) = current.row(y) else { break };
            let prev_row = previous.and_then(|prev| prev.row(y));

            if prev_row == Some(row) {
                stats.cells_skipped += row.len();
                continue;
            }

            for (x, cell) in (0..width).zip(row) {
                let changed = prev_row.is_none_or(|prev| prev[usize::from(x)] != *cell);
                if changed {
                    self.writer.render_cell(&mut self.output, x, y, cell);
                    stats.cells_rendered += 1;
                } else {
                    stats.cells_skipped += 1;
                }
            }
        }

        ansi::reset(&mut self.output).ok();
        ansi::end_sync(&mut self.output).ok();
        stats.bytes_written = self.output.len();

        self.store_frame(current);
        stats
    }

    /// Write queued output to `w` and clear it.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        self.output.flush_to(w)
    }

    /// Forget the previous frame so the next render repaints everything.
    pub fn force_redraw(&mut self) {
        self.previous = None;
    }

    fn store_frame(&mut self, current: &FrameBuffer) {
        match &mut self.previous {
            Some(prev) => prev.copy_from(current),
            None => self.previous = Some(current.clone()),
        }
    }
}

impl Default for DiffRenderer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use crate::color::CellColor;

    fn render(renderer: &mut DiffRenderer, frame: &FrameBuffer) -> (RenderStats, String) {
        let stats = renderer.render(frame);
        let mut out = Vec::new();
        renderer.flush_to(&mut out).unwrap();
        (stats, String::from_utf8(out).unwrap())
    }

    #[test]
    fn first_render_draws_everything() {
        let mut r = DiffRenderer::new();
        let (stats, out) = render(&mut r, &FrameBuffer::new(10, 5));
        assert_eq!(stats.cells_rendered, 50);
        assert_eq!(stats.cells_skipped, 0);
        assert!(out.contains("\x1b[2J"));
        assert!(out.starts_with("\x1b[?2026h"));
        assert!(out.ends_with("\x1b[0m\x1b[?2026l"));
    }

    #[test]
    fn identical_frame_renders_nothing() {
        let mut r = DiffRenderer::new();
        let frame = FrameBuffer::new(10, 5);
        r.render(&frame);
        let (stats, out) = render(&mut r, &frame);
        assert_eq!(stats.cells_rendered, 0);
        assert_eq!(stats.cells_skipped, 50);
        assert!(!out.contains("\x1b[2J"));
    }

    #[test]
    fn single_change_renders_one_cell() {
        let mut r = DiffRenderer::new();
        let mut frame = FrameBuffer::new(10, 5);
        r.render(&frame);

        frame.set(3, 2, Cell::new('▒').with_fg(CellColor::Ansi256(2)));
        let (stats, out) = render(&mut r, &frame);
        assert_eq!(stats.cells_rendered, 1);
        assert!(out.contains("\x1b[3;4H"));
        assert!(out.contains('▒'));
    }

    #[test]
    fn resize_forces_full_redraw() {
        let mut r = DiffRenderer::new();
        r.render(&FrameBuffer::new(10, 5));
        let (stats, out) = render(&mut r, &FrameBuffer::new(12, 5));
        assert_eq!(stats.cells_rendered, 60);
        assert!(out.contains("\x1b[2J"));
    }

    #[test]
    fn force_redraw_repaints() {
        let mut r = DiffRenderer::new();
        let frame = FrameBuffer::new(4, 2);
        r.render(&frame);
        r.force_redraw();
        let (stats, _) = render(&mut r, &frame);
        assert_eq!(stats.cells_rendered, 8);
    }

    #[test]
    fn zero_size_frame_is_silent() {
        let mut r = DiffRenderer::new();
        let (stats, out) = render(&mut r, &FrameBuffer::new(0, 3));
        assert_eq!(stats, RenderStats::default());
        assert!(out.is_empty());
    }

    #[test]
    fn flush_to_drains_output() {
        let mut r = DiffRenderer::new();
        r.render(&FrameBuffer::new(2, 2));
        let mut sink = Vec::new();
        r.flush_to(&mut sink).unwrap();
        assert!(!sink.is_empty());

        let mut again = Vec::new();
        r.flush_to(&mut again).unwrap();
        assert!(again.is_empty());
    }
}
