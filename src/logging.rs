//! Subscriber setup for the `ostash` binary.

use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Install the global subscriber: stderr always, plus a log file when configured.
///
/// `RUST_LOG` wins over the configured level. The returned guard flushes the
/// file writer on drop and must be held until the program exits.
pub fn init(config: &LoggingConfig, debug: bool) -> Result<Option<WorkerGuard>> {
  let directive = default_directive(config, debug);
  let make_filter = || match EnvFilter::try_from_default_env() {
    Ok(filter) => Ok(filter),
    Err(_) => EnvFilter::try_new(&directive)
      .map_err(|e| Error::Config(format!("Invalid log level '{}': {}", directive, e))),
  };

  let stderr_layer = tracing_subscriber::fmt::layer()
    .with_writer(io::stderr)
    .with_target(false)
    .with_filter(make_filter()?);

  let (file_layer, guard) = match &config.file {
    Some(path) => {
      let file_name = path
        .file_name()
        .ok_or_else(|| Error::Config(format!("Invalid log file path: {}", path.display())))?;
      let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
      if let Some(dir) = dir {
        std::fs::create_dir_all(dir)?;
      }

      let appender = rolling::never(dir.unwrap_or_else(|| Path::new(".")), file_name);
      let (writer, guard) = tracing_appender::non_blocking(appender);
      let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_filter(make_filter()?);
      (Some(layer), Some(guard))
    }
    None => (None, None),
  };

  tracing_subscriber::registry()
    .with(stderr_layer)
    .with(file_layer)
    .try_init()
    .map_err(|e| Error::Config(format!("Failed to install logger: {}", e)))?;

  Ok(guard)
}

/// The filter used when `RUST_LOG` is unset.
pub fn default_directive(config: &LoggingConfig, debug: bool) -> String {
  match (&config.level, debug) {
    (_, true) => "debug".to_string(),
    (Some(level), false) => level.clone(),
    (None, false) => "info".to_string(),
  }
}
