//! Process-wide log output.
//!
//! Library code emits through both `tracing` and `log`; `init` installs one
//! `tracing_subscriber` registry for the former and bridges the latter into
//! it with `tracing_log::LogTracer`.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {source}")]
    InvalidFilter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("A global logger is already installed: {0}")]
    AlreadyInstalled(String),
}

/// Installs the global subscriber, writing to stderr. `RUST_LOG` takes
/// precedence over the configured level. Fails if a subscriber or logger is
/// already installed.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => parse_filter(&directives)?,
        _ => parse_filter(&config.level)?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Pretty => {
            tracing::subscriber::set_global_default(
                registry.with(fmt::layer().with_target(false).with_writer(std::io::stderr)),
            )
        }
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            ),
        ),
    };
    installed.map_err(|e| LoggingError::AlreadyInstalled(e.to_string()))?;

    tracing_log::LogTracer::init().map_err(|e| LoggingError::AlreadyInstalled(e.to_string()))?;
    Ok(())
}

pub fn parse_filter(directives: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directives).map_err(|source| LoggingError::InvalidFilter {
        filter: directives.to_string(),
        source,
    })
}
