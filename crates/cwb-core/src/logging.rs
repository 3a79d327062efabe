use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{errors::Error, Result};

/// Keeps the file writer alive; dropping it flushes pending log lines.
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Initialize logging/tracing for the bot.
///
/// Console output always; when `log_dir` is set, also a daily-rotated
/// `<service_name>.log` file there.
pub fn init(service_name: &str, log_dir: Option<&Path>) -> Result<LoggingGuard> {
    // Default: info for our crates, warn for everything else.
    // Can be overridden with `RUST_LOG`.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,cwb=info,cwb_core=info,cwb_telegram=info,cwb_vision=info,{}=info",
            service_name.replace('-', "_")
        ))
    });

    let console = fmt::layer().with_target(false).with_ansi(true);

    let (file_layer, file_guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                Error::Config(format!(
                    "failed to create log directory {}: {e}",
                    dir.display()
                ))
            })?;
            let appender = tracing_appender::rolling::daily(dir, format!("{service_name}.log"));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialized: {e}")))?;

    Ok(LoggingGuard { _file: file_guard })
}
