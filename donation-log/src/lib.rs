//! Log output for the donation platform.
//!
//! The payment crates emit `tracing` events with structured fields
//! (`reference`, `user_id`, `event`). This crate decides where they go: it
//! turns a [`LogConfig`] into a `tracing-subscriber` registry and installs it
//! once per process.
//!
//! ```rust
//! use donation_log::{Format, Level, LogConfig};
//!
//! let config = LogConfig::new(Level::Debug, Format::Compact)
//!     .with_directive("donation_gateway=trace");
//! donation_log::init(&config);
//!
//! tracing::info!(reference = "pin_123", "pay-in initialised");
//! ```
//!
//! Environment:
//!
//! - `DONATION_LOG_LEVEL` (`trace`, `debug`, `info`, `warn`, `error`, `off`)
//! - `DONATION_LOG_FORMAT` (`json`, `compact`, `pretty`)
//! - `DONATION_LOG_COLOR` (`1`/`0`)
//! - `RUST_LOG` replaces the whole filter when it parses

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::{Directive, LevelFilter};

/// HTTP plumbing underneath the gateway client; chatty below `warn`.
const QUIET_TARGETS: &[&str] = &["hyper=warn", "hyper_util=warn", "reqwest=warn", "rustls=warn"];

/// A level or format name that is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log {kind} '{value}'")]
pub struct ParseError {
    kind: &'static str,
    value: String,
}

/// Minimum severity written out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Off => "off",
        }
    }
}

impl FromStr for Level {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "info" => Self::Info,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            "off" | "none" => Self::Off,
            _ => {
                return Err(ParseError {
                    kind: "level",
                    value: s.to_string(),
                });
            }
        };
        Ok(level)
    }
}

impl From<Level> for LevelFilter {
    fn from(level: Level) -> Self {
        match level {
            Level::Trace => LevelFilter::TRACE,
            Level::Debug => LevelFilter::DEBUG,
            Level::Info => LevelFilter::INFO,
            Level::Warn => LevelFilter::WARN,
            Level::Error => LevelFilter::ERROR,
            Level::Off => LevelFilter::OFF,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// One JSON object per line
    #[default]
    Json,
    Compact,
    /// Multi-line, for local development
    Pretty,
}

impl FromStr for Format {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            _ => Err(ParseError {
                kind: "format",
                value: s.to_string(),
            }),
        }
    }
}

/// Where and how much the platform logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: Level,
    pub format: Format,
    /// ANSI colors; never applied to JSON
    pub color: bool,
    /// Include the module path of each event
    pub target: bool,
    /// Extra `target=level` directives layered over `level`
    #[serde(default)]
    pub directives: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new(Level::default(), Format::default())
    }
}

impl LogConfig {
    pub fn new(level: Level, format: Format) -> Self {
        Self {
            level,
            format,
            color: false,
            target: true,
            directives: QUIET_TARGETS.iter().map(|d| d.to_string()).collect(),
        }
    }

    /// Read `DONATION_LOG_*`; unset or unparseable values keep their defaults.
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok();

        let mut config = Self::new(
            var("DONATION_LOG_LEVEL")
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            var("DONATION_LOG_FORMAT")
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        );
        config.color = match var("DONATION_LOG_COLOR") {
            Some(v) => v == "1" || v.eq_ignore_ascii_case("true"),
            None => var("NO_COLOR").is_none() && var("TERM").is_some(),
        };
        config
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Add a `target=level` directive, e.g. `donation_gateway=trace`.
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// `RUST_LOG` when it parses, otherwise `level` plus the directives.
    /// Directives that fail to parse are skipped.
    pub fn filter(&self) -> EnvFilter {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return filter;
        }

        self.directives
            .iter()
            .filter_map(|d| d.parse::<Directive>().ok())
            .fold(EnvFilter::new(self.level.as_str()), EnvFilter::add_directive)
    }
}

/// Install the global subscriber for `config`.
///
/// Returns `false` if one was already installed; it is left in place.
pub fn init(config: &LogConfig) -> bool {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let registry = tracing_subscriber::registry().with(config.filter());
    let layer = fmt::layer().with_target(config.target);

    match config.format {
        Format::Json => registry.with(layer.json()).try_init(),
        Format::Compact => registry
            .with(layer.compact().with_ansi(config.color))
            .try_init(),
        Format::Pretty => registry
            .with(layer.pretty().with_ansi(config.color))
            .try_init(),
    }
    .is_ok()
}

pub fn init_from_env() -> bool {
    init(&LogConfig::from_env())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!("DEBUG".parse::<Level>(), Ok(Level::Debug));
        assert_eq!(" warning ".parse::<Level>(), Ok(Level::Warn));
        assert_eq!("none".parse::<Level>(), Ok(Level::Off));

        let err = "verbose".parse::<Level>().unwrap_err();
        assert_eq!(err.to_string(), "unknown log level 'verbose'");
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("Compact".parse::<Format>(), Ok(Format::Compact));
        assert_eq!("json".parse::<Format>(), Ok(Format::Json));
        assert!("xml".parse::<Format>().is_err());
    }

    #[test]
    fn test_level_filter() {
        assert_eq!(LevelFilter::from(Level::Warn), LevelFilter::WARN);
        assert_eq!(LevelFilter::from(Level::Off), LevelFilter::OFF);
        assert!(Level::Debug < Level::Error);
    }

    #[test]
    fn test_defaults_quiet_http_stack() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::Info);
        assert_eq!(config.format, Format::Json);
        assert!(!config.color);
        assert!(config.directives.iter().any(|d| d == "reqwest=warn"));
    }

    #[test]
    fn test_filter_includes_directives() {
        let config = LogConfig::new(Level::Error, Format::Compact)
            .with_directive("donation_payments=debug")
            .with_directive("not a directive ===");
        let rendered = config.filter().to_string();

        // RUST_LOG may be set by the test runner
        if std::env::var("RUST_LOG").is_err() {
            assert!(rendered.contains("donation_payments=debug"));
            assert!(rendered.contains("error"));
        }
    }

    #[test]
    fn test_init_installs_once() {
        let config = LogConfig::new(Level::Debug, Format::Compact);
        let first = init(&config);
        let second = init(&config);
        assert!(!second || !first);
    }
}
