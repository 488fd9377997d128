//! Saving the visible canvas as a text file.
//!
//! The export is the canvas interior exactly as the terminal shows it:
//! every styled cell wrapped in its SGR sequence and a reset, rows joined by
//! `\n`. `cat images/3.txt` in a color terminal reproduces the drawing.
//!
//! Files are numbered: the next name is one more than the number of entries
//! already in the directory, bumped further if that name is taken. The file
//! is opened with `create_new` and removed again if the write fails, so a
//! failed export leaves nothing behind.

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tp_term::ansi;

use crate::plane::Plane;
use crate::render::term_cell;
use crate::viewport::Viewport;

/// Default export directory, relative to the working directory.
pub const DEFAULT_DIR: &str = "images";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("cannot create export directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("cannot list export directory {path}: {source}")]
    ReadDir { path: PathBuf, source: io::Error },

    #[error("cannot create {path}: {source}")]
    Create { path: PathBuf, source: io::Error },

    #[error("cannot write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Write the canvas interior as terminal text. No trailing newline.
///
/// # Errors
///
/// Whatever `out` returns.
pub fn write_text(out: &mut impl Write, plane: &Plane, viewport: &Viewport) -> io::Result<()> {
    for row in 0..viewport.height() {
        if row > 0 {
            out.write_all(b"\n")?;
        }
        for col in 0..viewport.width() {
            let cell = plane.get(viewport.screen_to_plane(col + 1, row + 1));
            if cell.is_empty() {
                out.write_all(b" ")?;
                continue;
            }
            let styled = term_cell(cell);
            ansi::style(out, styled.fg, styled.bg, styled.attrs)?;
            let mut enc = [0u8; 4];
            out.write_all(cell.display_char().encode_utf8(&mut enc).as_bytes())?;
            ansi::reset(out)?;
        }
    }
    Ok(())
}

/// Writes numbered export files into one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exporter {
    dir: PathBuf,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Render the visible canvas into the next numbered file, creating the
    /// directory on first use. Returns the path written.
    ///
    /// # Errors
    ///
    /// Any failure to create the directory, list it, create the file or
    /// write it. Nothing is retried and no partial file is left.
    pub fn export(&self, plane: &Plane, viewport: &Viewport) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(&self.dir).map_err(|source| ExportError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let existing = fs::read_dir(&self.dir)
            .map_err(|source| ExportError::ReadDir {
                path: self.dir.clone(),
                source,
            })?
            .count();

        let (path, file) = self.create_next(existing + 1)?;

        let written = {
            let mut out = BufWriter::new(&file);
            write_text(&mut out, plane, viewport).and_then(|()| out.flush())
        };
        if let Err(source) = written.and_then(|()| file.sync_all()) {
            drop(file);
            if let Err(e) = fs::remove_file(&path) {
                log::warn!("could not remove partial export {}: {e}", path.display());
            }
            return Err(ExportError::Write { path, source });
        }

        Ok(path)
    }

    /// Create `<n>.txt` for the first free `n` starting at `first`.
    fn create_next(&self, first: usize) -> Result<(PathBuf, fs::File), ExportError> {
        let mut n = first;
        loop {
            let path = self.dir.join(format!("{n}.txt"));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
                Err(source) => return Err(ExportError::Create { path, source }),
            }
        }
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(DEFAULT_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::PaletteIndex;
    use crate::plane::{Cell, Point};
    use pretty_assertions::assert_eq;

    fn color(i: u8) -> PaletteIndex {
        PaletteIndex::new(i).unwrap()
    }

    fn render_text(plane: &Plane, viewport: &Viewport) -> String {
        let mut out = Vec::new();
        write_text(&mut out, plane, viewport).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn dot_at(x: i32) -> Plane {
        let mut plane = Plane::new();
        plane.set(Point::new(x, 0), Cell::stamp('.', color(7)));
        plane
    }

    #[test]
    fn empty_canvas_is_spaces() {
        let text = render_text(&Plane::new(), &Viewport::new(3, 2));
        assert_eq!(text, "   \n   ");
    }

    #[test]
    fn styled_cells_are_wrapped() {
        let mut plane = Plane::new();
        plane.set(Point::new(1, 0), Cell::block(color(3)));
        plane.set(
            Point::new(2, 0),
            Cell {
                glyph: Some('░'),
                fg: Some(color(2)),
                bg: Some(color(4)),
            },
        );
        let text = render_text(&plane, &Viewport::new(3, 1));
        assert_eq!(text, " \x1b[43m \x1b[0m\x1b[32m\x1b[44m░\x1b[0m");
    }

    #[test]
    fn follows_the_viewport() {
        let mut plane = Plane::new();
        plane.set(Point::new(-1, 0), Cell::stamp('.', color(7)));
        let mut vp = Viewport::new(2, 1);
        assert_eq!(render_text(&plane, &vp), "  ");
        vp.pan_begin(1, 1);
        vp.pan_continue(2, 1);
        assert_eq!(render_text(&plane, &vp), "\x1b[37m.\x1b[0m ");
    }

    #[test]
    fn zero_sized_viewport_is_empty() {
        assert_eq!(render_text(&Plane::new(), &Viewport::new(0, 0)), "");
    }

    #[test]
    fn exports_are_numbered_sequentially() {
        let tmp = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(tmp.path().join("images"));
        let vp = Viewport::new(2, 1);

        let first = exporter.export(&dot_at(5), &vp).unwrap();
        let second = exporter.export(&dot_at(1), &vp).unwrap();
        assert_eq!(first.file_name().unwrap(), "1.txt");
        assert_eq!(second.file_name().unwrap(), "2.txt");
        assert_eq!(fs::read_to_string(second).unwrap(), " \x1b[37m.\x1b[0m");
    }

    #[test]
    fn export_skips_taken_names() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("2.txt"), "old").unwrap();
        let exporter = Exporter::new(tmp.path());

        let path = exporter.export(&Plane::new(), &Viewport::new(1, 1)).unwrap();
        assert_eq!(path.file_name().unwrap(), "3.txt");
        assert_eq!(fs::read_to_string(tmp.path().join("2.txt")).unwrap(), "old");
    }

    #[test]
    fn export_fails_when_directory_is_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("images");
        fs::write(&blocker, "not a dir").unwrap();

        let err = Exporter::new(&blocker)
            .export(&Plane::new(), &Viewport::new(1, 1))
            .unwrap_err();
        assert!(matches!(err, ExportError::CreateDir { .. }), "{err}");
    }

    #[test]
    fn painted_export_differs_from_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(tmp.path());
        let vp = Viewport::new(10, 4);

        let blank = exporter.export(&Plane::new(), &vp).unwrap();
        let mut plane = Plane::new();
        plane.set(Point::new(2, 2), Cell::stamp('▓', color(1)));
        let painted = exporter.export(&plane, &vp).unwrap();

        let blank = fs::read_to_string(blank).unwrap();
        let painted = fs::read_to_string(painted).unwrap();
        assert!(blank.trim().is_empty());
        assert!(painted.contains('▓'));
    }
}
