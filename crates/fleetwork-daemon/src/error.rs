//! Daemon error types

use thiserror::Error;

/// Errors raised while starting or running the daemon
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("seed error: {0}")]
    Seed(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error(transparent)]
    Controller(#[from] fleetwork_execution::ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type DaemonResult<T> = Result<T, DaemonError>;
