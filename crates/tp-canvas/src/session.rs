//! One user's canvas and the routing of input events through it.
//!
//! A [`Session`] owns everything a connected user can change: the plane,
//! the viewport, the tool state, the pointer-down flag and the last export
//! status. Events are handled one at a time by `&mut self`; sessions never
//! share state, so a server can run any number of them side by side.
//!
//! | Event                              | Effect                                   |
//! |------------------------------------|------------------------------------------|
//! | press inside the canvas            | start drawing, one stroke or pan anchor  |
//! | press on the strip row             | tool transition from the strip hit boxes |
//! | drag / move while drawing          | one stroke or pan step, no bounds check  |
//! | release                            | stop drawing                             |
//! | `q`, `Esc`, `Ctrl+C`               | quit                                     |
//! | wheel, other keys, press on border | nothing                                  |

use std::path::PathBuf;

use tp_term::buffer::FrameBuffer;
use tp_term::event_loop::{Action, App};
use tp_term::input::{Event, KeyCode, KeyEvent, Modifiers, MouseEvent, MouseEventKind};
use tp_term::terminal::Size;

use crate::compositor::{self, Stroke};
use crate::export::{ExportError, Exporter};
use crate::plane::Plane;
use crate::render;
use crate::strip::{self, StripAction};
use crate::tool::{Mode, ToolState};
use crate::viewport::Viewport;

/// Window title set while a canvas is on screen.
pub const WINDOW_TITLE: &str = "Paint";

#[derive(Debug)]
pub struct Session {
    plane: Plane,
    viewport: Viewport,
    tools: ToolState,
    drawing: bool,
    size: Size,
    exporter: Exporter,
    status: Option<String>,
}

impl Session {
    /// An empty canvas with a zero-sized screen. Nothing is hit or drawn
    /// until the first [`resize`](Self::resize).
    #[must_use]
    pub fn new(exporter: Exporter) -> Self {
        Self {
            plane: Plane::new(),
            viewport: Viewport::default(),
            tools: ToolState::new(),
            drawing: false,
            size: Size::new(0, 0),
            exporter,
            status: None,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[must_use]
    pub const fn plane(&self) -> &Plane {
        &self.plane
    }

    #[must_use]
    pub const fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[must_use]
    pub const fn tools(&self) -> &ToolState {
        &self.tools
    }

    /// True between a press inside the canvas and the next release.
    #[must_use]
    pub const fn is_drawing(&self) -> bool {
        self.drawing
    }

    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Outcome of the last export, shown at the end of the strip.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    #[must_use]
    pub const fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    // -----------------------------------------------------------------------
    // Event routing
    // -----------------------------------------------------------------------

    /// Route one input event.
    pub fn handle(&mut self, event: &Event) -> Action {
        match *event {
            Event::Key(key) if is_quit(key) => Action::Quit,
            Event::Mouse(mouse) => {
                self.mouse(mouse);
                Action::Continue
            }
            Event::Key(_) | Event::CursorPosition { .. } => Action::Continue,
        }
    }

    fn mouse(&mut self, ev: MouseEvent) {
        match ev.kind {
            MouseEventKind::Press(_) => self.press(ev.x, ev.y),
            MouseEventKind::Drag(_) | MouseEventKind::Move if self.drawing => {
                self.step(ev.x, ev.y, false);
            }
            MouseEventKind::Release(_) => self.drawing = false,
            MouseEventKind::Drag(_)
            | MouseEventKind::Move
            | MouseEventKind::ScrollUp
            | MouseEventKind::ScrollDown => {}
        }
    }

    fn press(&mut self, x: u16, y: u16) {
        if self.strip_row() == Some(y) {
            self.strip_click(x);
        } else if self.viewport.contains(x, y) {
            self.drawing = true;
            self.step(x, y, true);
        }
    }

    /// One stroke, or one pan step, at screen `(x, y)`.
    fn step(&mut self, x: u16, y: u16, begin: bool) {
        if self.tools.mode() == Mode::Pan {
            if begin {
                self.viewport.pan_begin(x, y);
            } else {
                self.viewport.pan_continue(x, y);
            }
            return;
        }

        let at = self.viewport.screen_to_plane(x, y);
        if let Stroke::Painted(cell) = compositor::stroke(&mut self.plane, &self.tools, at) {
            log::trace!("painted {cell:?} at {at:?}");
        }
    }

    fn strip_row(&self) -> Option<u16> {
        self.size.rows.checked_sub(1)
    }

    fn strip_click(&mut self, x: u16) {
        let spans = strip::spans(&self.tools, self.viewport.offset(), self.status());
        let Some(action) = strip::hit_test(&spans, x) else {
            return;
        };
        log::debug!("strip: {action:?}");

        if action != StripAction::Save {
            self.status = None;
        }
        match action {
            StripAction::SelectColor(color) => self.tools.select_color(color),
            StripAction::SelectTip(index) => self.tools.select_tip(index),
            StripAction::Clear => self.clear(),
            StripAction::ToggleErase => self.tools.toggle_erase(),
            StripAction::TogglePan => self.tools.toggle_pan(),
            StripAction::Save => match self.save() {
                Ok(path) => log::info!("exported canvas to {}", path.display()),
                Err(e) => log::error!("export failed: {e}"),
            },
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Empty the plane, recenter the viewport and go back to painting.
    pub fn clear(&mut self) {
        self.plane.clear();
        self.viewport.reset();
        self.tools.paint_mode();
    }

    /// Store the new screen size. The canvas interior is what is left after
    /// the border and the strip.
    pub const fn resize(&mut self, size: Size) {
        self.size = size;
        self.viewport
            .resize(size.cols.saturating_sub(2), size.rows.saturating_sub(3));
    }

    /// Export the visible canvas and record the outcome in the status line.
    ///
    /// # Errors
    ///
    /// Whatever [`Exporter::export`] fails with.
    pub fn save(&mut self) -> Result<PathBuf, ExportError> {
        let result = self.exporter.export(&self.plane, &self.viewport);
        self.status = Some(match &result {
            Ok(path) => format!("saved {}", path.display()),
            Err(_) => "export failed".to_owned(),
        });
        result
    }
}

fn is_quit(key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Escape => true,
        KeyCode::Char('q') => !key.modifiers.intersects(Modifiers::CTRL | Modifiers::ALT),
        KeyCode::Char('c') => key.modifiers.contains(Modifiers::CTRL),
        _ => false,
    }
}

impl App for Session {
    fn on_event(&mut self, event: &Event) -> Action {
        self.handle(event)
    }

    fn on_resize(&mut self, size: Size) {
        self.resize(size);
    }

    fn paint(&mut self, buf: &mut FrameBuffer) {
        let spans = strip::spans(&self.tools, self.viewport.offset(), self.status());
        render::frame(buf, &self.plane, &self.viewport, &spans);
    }
}
