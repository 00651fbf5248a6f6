//! Structured logging setup.
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and a JSON or
//! pretty formatter, optionally writing through a `tracing-appender`
//! non-blocking worker so log I/O never stalls a dispatch.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `OPSR_LOG_LEVEL` | `info` | base level when `RUST_LOG` is unset |
//! | `OPSR_LOG_FORMAT` | `json` | `json` or `pretty` |
//! | `OPSR_LOG_ASYNC` | `true` | buffer output on a background thread |
//! | `OPSR_LOG_TARGET_FILTER` | none | extra comma-separated directives |
//! | `OPSR_LOG_INCLUDE_LOCATION` | `false` | add file and line |

use anyhow::{Context, Result};
use std::env;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    pub async_logging: bool,
    /// Comma-separated `target=level` directives.
    pub target_filter: Option<String>,
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            async_logging: true,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Read the `OPSR_LOG_*` variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparsable values keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            log_level: lookup("OPSR_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: lookup("OPSR_LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or(defaults.format),
            async_logging: lookup("OPSR_LOG_ASYNC")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.async_logging),
            target_filter: lookup("OPSR_LOG_TARGET_FILTER").filter(|s| !s.trim().is_empty()),
            include_location: lookup("OPSR_LOG_INCLUDE_LOCATION")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.include_location),
        }
    }

    /// Synchronous pretty output at debug level.
    #[must_use]
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            async_logging: false,
            target_filter: None,
            include_location: true,
        }
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    let level = parse_level(&config.log_level);
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    if let Some(targets) = &config.target_filter {
        for directive in targets.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(_) => eprintln!("Warning: Invalid log filter directive: {directive}"),
            }
        }
    }
    filter
}

/// Install the global subscriber.
///
/// With async logging the returned guard owns the writer thread; keep it
/// alive for the life of the process or buffered lines are lost.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let (writer, guard) = if config.async_logging {
        let (nb, guard) = tracing_appender::non_blocking(std::io::stdout());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(nb), Some(guard))
    } else {
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout), None)
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(build_filter(config))
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("invalid"), LogFormat::Json);
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("OPSR_LOG_LEVEL", "warn"),
            ("OPSR_LOG_FORMAT", "pretty"),
            ("OPSR_LOG_ASYNC", "false"),
            ("OPSR_LOG_TARGET_FILTER", "opsrouter::router=trace"),
            ("OPSR_LOG_INCLUDE_LOCATION", "nope"),
        ]);
        let config = LogConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_string()));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(!config.async_logging);
        assert_eq!(config.target_filter.as_deref(), Some("opsrouter::router=trace"));
        assert!(!config.include_location);
    }

    #[test]
    fn test_unset_keeps_defaults() {
        assert_eq!(LogConfig::from_lookup(|_| None), LogConfig::default());
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("bogus"), Level::INFO);
    }
}
