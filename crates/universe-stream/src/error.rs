//! Error types for the streaming coordinator.

use thiserror::Error;

/// Result type for streaming operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running the stream node.
#[derive(Debug, Error)]
pub enum Error {
    /// Simulation engine error
    #[error("Engine error: {0}")]
    Engine(#[from] universe_engine::EngineError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Background task failed
    #[error("Task error: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Task(e.to_string())
    }
}
