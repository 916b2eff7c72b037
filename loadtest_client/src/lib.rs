pub mod response;
pub mod scenario;
pub mod session;
pub mod stats;
pub mod swarm;

use loadtest_env::LoggingConfig;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// --- 로거 설정 ---
pub fn setup_logger(logging: &LoggingConfig) -> WorkerGuard {
    let file_appender = RollingFileAppender::new(
        Rotation::NEVER,
        &logging.directory,
        &logging.filename,
    );
    let (non_blocking_file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

    let console_layer = fmt::layer()
        .with_writer(io::stdout)
        .with_ansi(true)
        .with_thread_ids(true)
        .with_target(false)
        .compact();

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file_writer)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_target(false);

    // try_init: tests may install a subscriber more than once
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    info!(
        "Logger initialized. Log file: {}/{}",
        logging.directory, logging.filename
    );
    guard
}

/// Errors crossing a task boundary.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Request could not be sent or the response could not be read.
    #[error("transport error: {0}")]
    Transport(String),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    /// The startup fixture check itself failed (permission denied and the like).
    #[error("fixture check failed for {}: {source}", path.display())]
    Startup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for TaskError {
    fn from(e: reqwest::Error) -> Self {
        TaskError::Transport(e.to_string())
    }
}
