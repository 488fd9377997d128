// SPDX-License-Identifier: MIT
//
// Local mode: one canvas on the process's own terminal.

use anyhow::{Context, Result, bail};

use tp_canvas::export::Exporter;
use tp_canvas::session::{Session, WINDOW_TITLE};
use tp_term::ansi::MouseMode;
use tp_term::event_loop::{EventLoop, LoopConfig, SizeSource};
use tp_term::reader::Stdin;
use tp_term::terminal::{self, Terminal};

use crate::config::Config;

/// Run a canvas on stdin/stdout until the user quits.
pub fn run(config: &Config) -> Result<()> {
    if !terminal::is_tty() {
        bail!("stdin is not a terminal; use `termpaint serve` and connect over ssh");
    }

    let exporter = Exporter::new(&config.export.directory);
    log::info!("local session, exporting to {}", exporter.dir().display());

    let mut session = Session::new(exporter);
    let loop_config = LoopConfig {
        tick_interval: config.terminal.tick_interval(),
        mouse: MouseMode::Drag,
    };

    EventLoop::new(Terminal::local().with_title(WINDOW_TITLE), loop_config)
        .run(&mut session, Stdin, SizeSource::Tty)
        .context("terminal session failed")?;

    log::info!("local session closed");
    Ok(())
}
