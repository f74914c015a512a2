//! Logging initialization for embedding binaries.
//!
//! Env-filtered stdout layer plus an optional daily-rotated file layer.
//! Call once at startup.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing with stdout output only.
pub fn init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,rentops_scheduler=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize tracing with stdout plus a daily-rotated log file.
///
/// The returned guard must be held for the lifetime of the process or the
/// file layer stops flushing.
pub fn init_with_file(logs_dir: &str) -> WorkerGuard {
    std::fs::create_dir_all(logs_dir).ok();

    let file_appender = RollingFileAppender::new(Rotation::DAILY, logs_dir, "scheduler.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,rentops_scheduler=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    guard
}
