//! Tracing subscriber setup for hosts embedding the engine.

use std::path::PathBuf;

use nearby_core::config::LoggingSettings;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::paths::NearbyPaths;

const LOG_FILE_PREFIX: &str = "nearby.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptions {
    /// Filter used when `RUST_LOG` is unset, e.g. `info` or `nearby=debug`.
    pub level: String,
    /// Directory for daily-rolling log files. `None` logs to stderr only.
    pub log_dir: Option<PathBuf>,
}

impl LoggingOptions {
    pub fn from_settings(settings: &LoggingSettings, paths: &NearbyPaths) -> Self {
        Self {
            level: settings.level.clone(),
            log_dir: if settings.file {
                paths.logs_dir().ok()
            } else {
                None
            },
        }
    }
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
        }
    }
}

/// Installs the global subscriber.
///
/// Returns the file writer guard, which must be kept alive for buffered
/// lines to be flushed. Returns `None` when no file layer was set up or a
/// global subscriber already exists.
pub fn init_logging(options: &LoggingOptions) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&options.level));

    let (file_layer, guard) = match options.log_dir.as_ref() {
        Some(dir) => match std::fs::create_dir_all(dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                (
                    Some(fmt::layer().with_writer(writer).with_ansi(false)),
                    Some(guard),
                )
            }
            Err(e) => {
                eprintln!("Failed to create log directory {:?}: {}", dir, e);
                (None, None)
            }
        },
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .try_init();

    match installed {
        Ok(()) => guard,
        Err(_) => None,
    }
}
