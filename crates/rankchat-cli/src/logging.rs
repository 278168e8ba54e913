//! File-based logging setup.
//!
//! The TUI owns the terminal, so logs go to a file under the RankChat home
//! directory instead of stderr. Filtering is controlled with `RANKCHAT_LOG`
//! (standard `EnvFilter` syntax, default `info`).

use std::fs::OpenOptions;

use rankchat_core::config::paths;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Keep this guard alive for the duration of the program; dropping it
/// flushes buffered log lines.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initializes file logging. Logging failures never abort the CLI.
pub fn init() -> Option<LoggingGuard> {
    let log_dir = paths::logs_dir();
    std::fs::create_dir_all(&log_dir).ok()?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("rankchat.log"))
        .ok()?;

    let (writer, file_guard) = tracing_appender::non_blocking(file);

    let env_filter = EnvFilter::try_from_env("RANKCHAT_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    Some(LoggingGuard {
        _file_guard: file_guard,
    })
}
