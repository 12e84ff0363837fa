//! Tracing subscriber setup.
//!
//! Filter directives come from `HYVEKIT_LOG` (same syntax as `RUST_LOG`),
//! falling back to [`LoggingOptions::default_filter`]. Events always go to
//! stderr; with a log directory they are also written to a daily rolling
//! file through a non-blocking writer.

use hyvekit_shared::errors::{HyvekitError, HyvekitResult};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const LOG_ENV_VAR: &str = "HYVEKIT_LOG";
pub const LOG_FILE_PREFIX: &str = "hyvekit.log";

#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Also write logs to `<dir>/hyvekit.log.<date>`.
    pub log_dir: Option<PathBuf>,
    /// Directives used when `HYVEKIT_LOG` is unset.
    pub default_filter: String,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            log_dir: None,
            default_filter: "info".to_string(),
        }
    }
}

fn build_filter(options: &LoggingOptions) -> HyvekitResult<EnvFilter> {
    match std::env::var(LOG_ENV_VAR) {
        Ok(directives) => EnvFilter::try_new(&directives)
            .map_err(|e| HyvekitError::Config(format!("invalid {}: {}", LOG_ENV_VAR, e))),
        Err(_) => EnvFilter::try_new(&options.default_filter).map_err(|e| {
            HyvekitError::Config(format!(
                "invalid default log filter '{}': {}",
                options.default_filter, e
            ))
        }),
    }
}

/// Install the global subscriber.
///
/// Returns the file writer's guard when a log directory is configured; keep
/// it alive until exit or buffered lines are lost. If a subscriber is
/// already installed this leaves it in place.
pub fn init_logging(options: &LoggingOptions) -> HyvekitResult<Option<WorkerGuard>> {
    let filter = build_filter(options)?;

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal());

    let (file_layer, guard) = match &options.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if !installed {
        tracing::debug!("Tracing subscriber already installed");
    }
    Ok(guard)
}
