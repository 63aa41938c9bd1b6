//! Logging setup for the `schema-toolkit` binary
//!
//! Library diagnostics go through `tracing`; this installs a
//! `tracing-subscriber` formatter writing to stderr so stdout stays free for
//! command output.
//!
//! # Log Levels
//!
//! - `warn`: values that failed to parse, targets missing from the table
//! - `info`: stage summaries
//! - `debug`: per-column decisions, including every default classification
//! - `trace`: everything else

use std::io;

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable multi-field format
    #[default]
    Pretty,
    /// Single-line format
    Compact,
    /// JSON lines for machine parsing
    Json,
}

/// Configuration for logging behavior
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    /// Let `RUST_LOG` replace the level when it is set
    pub use_env_filter: bool,
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::default(),
            use_env_filter: true,
            with_ansi: true,
        }
    }
}

impl LogConfig {
    /// Create a `LogConfig` from the `-v` count
    ///
    /// - 0: info, `RUST_LOG` honoured
    /// - 1 (`-v`): debug
    /// - 2+ (`-vv`): trace
    #[must_use]
    pub fn from_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            level,
            use_env_filter: verbosity == 0,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_ansi(mut self, enable: bool) -> Self {
        self.with_ansi = enable;
        self
    }
}

/// Install the global subscriber; call once at startup
pub fn init_logging(config: &LogConfig) {
    let filter = build_env_filter(config);

    match config.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_target(false);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_writer(io::stderr)
                .with_ansi(config.with_ansi)
                .with_target(false)
                .without_time();
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(config.with_ansi)
                .with_target(false)
                .without_time();
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    }
}

/// Our crate at the configured level, dependencies at warn
fn build_env_filter(config: &LogConfig) -> EnvFilter {
    let level = config.level.as_str().to_lowercase();
    let default = || EnvFilter::new(format!("warn,schema_toolkit={level}"));

    if config.use_env_filter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default())
    } else {
        default()
    }
}
