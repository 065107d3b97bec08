//! Tracing subscriber setup for hosts that do not install their own.
//!
//! The crate itself only emits `tracing` events. `RUST_LOG` directives are
//! honoured on top of the configured level.

use std::str::FromStr;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Minimum level captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Everything, including per-request details.
    Trace,
    /// Request construction and skipped items.
    Debug,
    /// Completed mutations and token refreshes.
    Info,
    /// Swallowed remote failures.
    Warn,
    /// Errors only.
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(LoggingError::InvalidSetting(format!("log level {:?}", other))),
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, with colours.
    Pretty,
    /// One JSON object per event.
    Json,
    /// Single-line.
    Compact,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            other => Err(LoggingError::InvalidSetting(format!("log format {:?}", other))),
        }
    }
}

/// Logging setup failures.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// An environment setting could not be parsed.
    #[error("Invalid logging setting: {0}")]
    InvalidSetting(String),

    /// A global subscriber is already installed.
    #[error("Failed to install subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level.
    pub level: LogLevel,
    /// Output format.
    pub format: LogFormat,
    /// Include the event target.
    pub include_target: bool,
    /// Include source file and line.
    pub include_file_line: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
            include_target: true,
            include_file_line: false,
        }
    }
}

impl LoggingConfig {
    /// Default configuration: `info`, pretty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `GOOGLE_DRIVE_LOG_LEVEL` and `GOOGLE_DRIVE_LOG_FORMAT`.
    pub fn from_env() -> Result<Self, LoggingError> {
        let mut config = Self::default();
        if let Ok(level) = std::env::var("GOOGLE_DRIVE_LOG_LEVEL") {
            config.level = level.parse()?;
        }
        if let Ok(format) = std::env::var("GOOGLE_DRIVE_LOG_FORMAT") {
            config.format = format.parse()?;
        }
        Ok(config)
    }

    /// Sets the level.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets whether targets are printed.
    pub fn with_target(mut self, include: bool) -> Self {
        self.include_target = include;
        self
    }

    /// Sets whether file and line are printed.
    pub fn with_file_line(mut self, include: bool) -> Self {
        self.include_file_line = include;
        self
    }

    /// Filter with the configured level as default, overridable by `RUST_LOG`.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::from(self.level).into())
            .from_env_lossy()
    }

    /// Installs the global subscriber. Fails if one is already installed.
    pub fn init(self) -> Result<(), LoggingError> {
        let filter = self.env_filter();

        match self.format {
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(self.include_target)
                        .with_file(self.include_file_line)
                        .with_line_number(self.include_file_line),
                )
                .try_init()?,
            LogFormat::Json => tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_target(self.include_target))
                .try_init()?,
            LogFormat::Compact => tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_target(self.include_target))
                .try_init()?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoggingConfig::new();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.include_target);
        assert!(!config.include_file_line);
    }

    #[test]
    fn test_builder() {
        let config = LoggingConfig::new()
            .with_level(LogLevel::Debug)
            .with_format(LogFormat::Json)
            .with_file_line(true);
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.include_file_line);
    }

    #[test]
    fn test_parse_settings() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("loud".parse::<LogLevel>().is_err());
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_level_filter() {
        assert_eq!(LevelFilter::from(LogLevel::Warn), LevelFilter::WARN);
    }

    #[test]
    fn test_env_filter_uses_configured_level() {
        let filter = LoggingConfig::new().with_level(LogLevel::Debug).env_filter();
        if std::env::var_os("RUST_LOG").is_none() {
            assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
        }
    }

    #[test]
    fn test_init_installs_once() {
        let config = LoggingConfig::new().with_format(LogFormat::Compact);
        assert!(config.clone().init().is_ok());
        assert!(config.init().is_err());
    }
}
