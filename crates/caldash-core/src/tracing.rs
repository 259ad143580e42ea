//! Log output for the caldash binary.
//!
//! `RUST_LOG` always wins. Without it, the caldash crates and the HTTP trace
//! layer log at the configured level and every other target stays quiet.
//!
//! ```ignore
//! use caldash_core::tracing::{init_tracing, TracingConfig, TracingOutputFormat};
//!
//! init_tracing(TracingConfig::default().with_format(TracingOutputFormat::Json))?;
//! ```

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Targets that follow the configured level.
const APP_TARGETS: [&str; 5] = [
    "caldash",
    "caldash_core",
    "caldash_providers",
    "caldash_server",
    "tower_http",
];

/// Errors raised while installing the log subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("could not install log subscriber: {0}")]
    Install(#[from] TryInitError),
}

/// How log lines are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Multi-line, for a terminal.
    #[default]
    Pretty,
    /// One line per event.
    Compact,
    /// JSON lines, for log collectors.
    Json,
}

impl TracingOutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for TracingOutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Pretty, Self::Compact, Self::Json]
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown log format '{s}', expected pretty, compact or json"))
    }
}

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for caldash targets when `RUST_LOG` is unset.
    pub level: Level,
    pub format: TracingOutputFormat,
    /// Colored output (ignored for JSON).
    pub ansi: bool,
    /// Add file and line to each event.
    pub source_location: bool,
    /// Explicit filter directive, used instead of `RUST_LOG` and `level`.
    pub filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingOutputFormat::Pretty,
            ansi: true,
            source_location: false,
            filter: None,
        }
    }
}

impl TracingConfig {
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    #[must_use]
    pub fn with_source_location(mut self, enabled: bool) -> Self {
        self.source_location = enabled;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, directive: impl Into<String>) -> Self {
        self.filter = Some(directive.into());
        self
    }

    /// Directive applied when neither `filter` nor `RUST_LOG` is set.
    pub fn default_directive(&self) -> String {
        APP_TARGETS
            .iter()
            .map(|target| format!("{target}={}", self.level))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn env_filter(&self) -> Result<EnvFilter, TracingError> {
        match self.filter {
            Some(ref directive) => Ok(EnvFilter::try_new(directive)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.default_directive()))),
        }
    }

    fn fmt_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let layer = fmt::layer()
            .with_ansi(self.ansi && self.format != TracingOutputFormat::Json)
            .with_file(self.source_location)
            .with_line_number(self.source_location);

        match self.format {
            TracingOutputFormat::Pretty => layer.pretty().boxed(),
            TracingOutputFormat::Compact => layer.compact().boxed(),
            TracingOutputFormat::Json => layer.json().with_current_span(true).boxed(),
        }
    }
}

/// Installs the global subscriber. Call once, at startup.
///
/// # Errors
///
/// Fails on an invalid filter directive or when a subscriber is already set.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let filter = config.env_filter()?;
    tracing_subscriber::registry()
        .with(config.fmt_layer().with_filter(filter))
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TracingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.format, TracingOutputFormat::Pretty);
        assert!(config.ansi);
        assert!(!config.source_location);
    }

    #[test]
    fn directive_follows_level() {
        let directive = TracingConfig::default()
            .with_level(Level::DEBUG)
            .default_directive();
        assert_eq!(
            directive,
            "caldash=DEBUG,caldash_core=DEBUG,caldash_providers=DEBUG,caldash_server=DEBUG,tower_http=DEBUG"
        );
        assert!(EnvFilter::try_new(&directive).is_ok());
    }

    #[test]
    fn explicit_filter_is_validated() {
        let config = TracingConfig::default().with_filter("caldash=verbose");
        assert!(matches!(config.env_filter(), Err(TracingError::Filter(_))));

        let config = TracingConfig::default().with_filter("caldash_server=trace");
        assert!(config.env_filter().is_ok());
    }

    #[test]
    fn output_format_parsing() {
        assert_eq!("json".parse::<TracingOutputFormat>(), Ok(TracingOutputFormat::Json));
        assert_eq!("Compact".parse::<TracingOutputFormat>(), Ok(TracingOutputFormat::Compact));
        let err = "xml".parse::<TracingOutputFormat>().unwrap_err();
        assert!(err.contains("expected pretty, compact or json"));
    }
}
