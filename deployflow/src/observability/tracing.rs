//! Tracing subscriber setup and timing helpers.

use crate::errors::DeployflowError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as subscriber_fmt, EnvFilter};

/// Log filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = DeployflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(DeployflowError::Configuration(format!(
                "unknown log format '{other}' (expected 'text' or 'json')"
            ))),
        }
    }
}

/// Installs the global tracing subscriber.
///
/// The filter comes from `RUST_LOG`, falling back to [`DEFAULT_LOG_FILTER`].
///
/// # Errors
///
/// Returns [`DeployflowError::Configuration`] if a global subscriber is already
/// installed.
pub fn init_tracing(format: LogFormat) -> Result<(), DeployflowError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Text => registry.with(subscriber_fmt::layer().with_target(false)).try_init(),
        LogFormat::Json => registry
            .with(subscriber_fmt::layer().json().flatten_event(true))
            .try_init(),
    };

    result.map_err(|e| DeployflowError::Configuration(format!("failed to install tracing subscriber: {e}")))
}

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the span and returns the duration.
    #[must_use]
    pub fn finish(self) -> f64 {
        let elapsed = self.elapsed_ms();
        ::tracing::trace!(span = %self.name, duration_ms = elapsed, "Span finished");
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" text ".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::default().to_string(), "text");
    }

    #[test]
    fn test_span_timer() {
        let timer = SpanTimer::start("deploy.stage");
        assert_eq!(timer.name(), "deploy.stage");
        assert!(timer.finish() >= 0.0);
    }

    #[test]
    fn test_init_tracing_twice_fails() {
        let first = init_tracing(LogFormat::Text);
        let second = init_tracing(LogFormat::Json);

        // Another test may have installed a subscriber first.
        assert!(first.is_err() || second.is_err());
        if let Err(err) = second {
            assert!(err.to_string().contains("tracing subscriber"));
        }
    }
}
