// SPDX-License-Identifier: MIT
//
// termpaint: a character-grid paint canvas for the terminal.
//
// This binary wires the crates together:
//
//   tp-term   → raw mode, input parsing, frame diffing, event loop
//   tp-canvas → plane, viewport, tools, strip, export, Session
//
// Two ways to run it:
//
//   termpaint            one canvas on this terminal
//   termpaint serve      one canvas per SSH (or raw TCP) connection
//
// Each input event flows through:
//
//   bytes → parser → Session::handle → tools / compositor / viewport
//   paint → border + canvas + strip → frame buffer → diff renderer → terminal

mod config;
mod local;
mod server;

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::{Builder, Env, Target};

use config::{Config, Transport};
use server::ServerOptions;

// ─── Command Line ───────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "termpaint")]
#[command(version, about = "Paint with the mouse in your terminal, locally or over TCP")]
struct Cli {
    /// Config file (default: <config dir>/termpaint/config.toml)
    #[arg(long, short = 'c', value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Directory for saved canvases
    #[arg(long, value_name = "DIR", global = true)]
    export_dir: Option<PathBuf>,

    /// Write logs to this file
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Serve a separate canvas to every terminal that connects
    Serve {
        /// ssh (default) or tcp for a raw byte stream
        #[arg(long, value_enum, value_name = "KIND")]
        transport: Option<Transport>,

        /// Address to listen on
        #[arg(long, value_name = "HOST")]
        host: Option<String>,

        /// Port to listen on
        #[arg(long, short = 'p', value_name = "PORT")]
        port: Option<u16>,

        /// SSH host key, generated if missing
        #[arg(long, value_name = "PATH")]
        host_key: Option<PathBuf>,

        /// Seconds open sessions get to close after SIGINT or SIGTERM
        #[arg(long, value_name = "SECS")]
        shutdown_timeout: Option<u64>,
    },
}

impl Cli {
    /// Command-line values win over the config file.
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.export_dir {
            config.export.directory.clone_from(dir);
        }
        if let Some(Command::Serve {
            transport,
            host,
            port,
            host_key,
            shutdown_timeout,
        }) = &self.command
        {
            if let Some(transport) = *transport {
                config.server.transport = transport;
            }
            if let Some(path) = host_key {
                config.server.host_key_path.clone_from(path);
            }
            if let Some(host) = host {
                config.server.host.clone_from(host);
            }
            if let Some(port) = *port {
                config.server.port = port;
            }
            if let Some(secs) = *shutdown_timeout {
                config.server.shutdown_timeout_secs = secs;
            }
        }
    }

    const fn is_serve(&self) -> bool {
        matches!(self.command, Some(Command::Serve { .. }))
    }
}

// ─── Logging ────────────────────────────────────────────────────────────────

/// The server logs to stderr at `info` by default. A local canvas owns the
/// terminal, so it only logs when given a file. `RUST_LOG` sets the filter
/// either way.
fn init_logging(cli: &Cli) -> Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));

    match &cli.log_file {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder.target(Target::Pipe(Box::new(file)));
        }
        None if cli.is_serve() => {}
        None => return Ok(()),
    }

    builder.try_init().context("failed to initialize logging")
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply(&mut config);

    if cli.is_serve() {
        let opts = ServerOptions::from_config(&config);
        if let Err(e) = server::run(&opts) {
            log::error!("server failed: {e:#}");
            return Err(e);
        }
        log::info!("server stopped");
        Ok(())
    } else {
        local::run(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("termpaint").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bare_invocation_is_local() {
        let cli = parse(&[]);
        assert!(!cli.is_serve());
        assert_eq!(cli.command, None);
    }

    #[test]
    fn serve_flags_override_config() {
        let cli = parse(&["serve", "--host", "0.0.0.0", "-p", "2323", "--shutdown-timeout", "5"]);
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.server.address(), "0.0.0.0:2323");
        assert_eq!(config.server.shutdown_timeout_secs, 5);
    }

    #[test]
    fn transport_and_host_key_flags() {
        let cli = parse(&["serve", "--transport", "tcp", "--host-key", "keys/host"]);
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.server.transport, Transport::Tcp);
        assert_eq!(config.server.host_key_path, PathBuf::from("keys/host"));

        assert!(Cli::try_parse_from(["termpaint", "serve", "--transport", "telnet"]).is_err());
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = parse(&["serve", "--export-dir", "/tmp/art", "--log-file", "/tmp/tp.log"]);
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.export.directory, PathBuf::from("/tmp/art"));
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/tp.log")));
        assert_eq!(config.server.port, 23234);
    }

    #[test]
    fn unset_flags_keep_config_values() {
        let cli = parse(&["--config", "custom.toml"]);
        let mut config = Config::default();
        config.export.directory = PathBuf::from("drawings");
        cli.apply(&mut config);
        assert_eq!(config.export.directory, PathBuf::from("drawings"));
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn bad_port_is_rejected() {
        let args = ["termpaint", "serve", "--port", "70000"];
        assert!(Cli::try_parse_from(args).is_err());
    }
}
