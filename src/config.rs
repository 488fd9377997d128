// SPDX-License-Identifier: MIT
//
// Configuration file.
//
// Read from `<config dir>/termpaint/config.toml` unless a path is given on
// the command line. A missing file means defaults; every section and key is
// optional. Values outside their working range are clamped with a warning
// rather than rejected, so a typo never keeps the canvas from starting.
//
//   [export]
//   directory = "images"
//
//   [server]
//   transport = "ssh"            # or "tcp" for a raw byte stream
//   host = "localhost"
//   port = 23234
//   host_key_path = ".ssh/id_ed25519"
//   shutdown_timeout_secs = 30
//   size_probe_interval_ms = 1000  # tcp only
//
//   [terminal]
//   tick_interval_ms = 8

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

const TICK_RANGE_MS: std::ops::RangeInclusive<u64> = 1..=100;
const MIN_PROBE_INTERVAL_MS: u64 = 100;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

// ─── Sections ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub export: ExportConfig,
    pub server: ServerConfig,
    pub terminal: TerminalConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Where saved canvases go. Relative paths are taken from the working
    /// directory.
    pub directory: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(tp_canvas::export::DEFAULT_DIR),
        }
    }
}

/// How remote terminals reach the server.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// SSH with a PTY. The client's window size and changes are used directly.
    #[default]
    Ssh,
    /// A raw byte stream from a terminal already in raw mode. Sizes are
    /// learned with cursor position probes.
    Tcp,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub transport: Transport,
    pub host: String,
    pub port: u16,
    /// SSH host key. Generated with `ssh-keygen` on first start if missing.
    pub host_key_path: PathBuf,
    /// Grace period for open sessions after SIGINT or SIGTERM.
    pub shutdown_timeout_secs: u64,
    /// How often a raw TCP terminal is asked for its size.
    pub size_probe_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Ssh,
            host: "localhost".to_owned(),
            port: 23234,
            host_key_path: PathBuf::from(".ssh/id_ed25519"),
            shutdown_timeout_secs: 30,
            size_probe_interval_ms: 1000,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    #[must_use]
    pub const fn size_probe_interval(&self) -> Duration {
        Duration::from_millis(self.size_probe_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TerminalConfig {
    /// Event loop tick. Bounds input latency and how long a lone ESC waits.
    pub tick_interval_ms: u64,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self { tick_interval_ms: 8 }
    }
}

impl TerminalConfig {
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

// ─── Loading ────────────────────────────────────────────────────────────────

impl Config {
    /// `<config dir>/termpaint/config.toml`, if the platform has a config
    /// directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("termpaint").join("config.toml"))
    }

    /// Load `path`, or the default location when `None`. A missing file
    /// yields the defaults.
    ///
    /// # Errors
    ///
    /// The file exists but cannot be read, or is not valid TOML for this
    /// schema.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            log::debug!("no config directory, using defaults");
            return Ok(Self::default());
        };

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        let mut config = Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        config.clamp();
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse TOML text without clamping.
    ///
    /// # Errors
    ///
    /// Invalid TOML, unknown keys, or values of the wrong type.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Pull out-of-range values back into range, warning about each.
    pub fn clamp(&mut self) {
        let tick = self.terminal.tick_interval_ms;
        if !TICK_RANGE_MS.contains(&tick) {
            let clamped = tick.clamp(*TICK_RANGE_MS.start(), *TICK_RANGE_MS.end());
            log::warn!("tick_interval_ms {tick} out of range, using {clamped}");
            self.terminal.tick_interval_ms = clamped;
        }

        let probe = self.server.size_probe_interval_ms;
        if probe < MIN_PROBE_INTERVAL_MS {
            log::warn!("size_probe_interval_ms {probe} too small, using {MIN_PROBE_INTERVAL_MS}");
            self.server.size_probe_interval_ms = MIN_PROBE_INTERVAL_MS;
        }
    }
}
