//! Tracing subscriber setup

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding an `EnvFilter` directive
pub const LOG_ENV: &str = "DEPWATCH_LOG";

/// Initialize logging to stderr, plus JSON lines to `log_file` when given.
///
/// `DEPWATCH_LOG` takes precedence over `level`. The returned guard must be
/// held for as long as file logging should keep flushing.
pub fn init_logging(level: &str, log_file: Option<&Path>) -> Result<Option<WorkerGuard>, InitError> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("depwatch.log");

            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(file_name)
                .build(directory)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);

            (
                Some(fmt::layer().json().with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .with(filter)
        .try_init();

    Ok(guard)
}
