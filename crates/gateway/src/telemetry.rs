//! Tracing subscriber setup

use caseforge_common::config::ObservabilityConfig;
use std::path::Path;
use tracing_appender::{
    non_blocking::{NonBlocking, WorkerGuard},
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// Console output is JSON or pretty per config. When `log_file` is set, the
/// same events are also appended to that file through a non-blocking writer;
/// the returned guard must outlive the server.
pub fn init_tracing(config: &ObservabilityConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;

    let (file_layer, guard) = match config.log_file.as_deref() {
        Some(path) => {
            let (writer, guard) = file_writer(Path::new(path))?;
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    if config.json_logging {
        registry.with(fmt::layer().json().with_target(true)).try_init()?;
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()?;
    }

    Ok(guard)
}

/// Non-blocking writer appending to `path`, created along with its directory
fn file_writer(path: &Path) -> anyhow::Result<(NonBlocking, WorkerGuard)> {
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "app.log".to_string());

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)?;

    Ok(tracing_appender::non_blocking(appender))
}
