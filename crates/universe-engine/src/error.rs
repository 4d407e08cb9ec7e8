//! Error types for the simulation binding.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while driving a simulation engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Requested resolution cannot be handed to the engine
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Engine could not set up its internal state
    #[error("engine initialization failed: {0}")]
    InitFailed(String),

    /// Engine was stepped before `initialize()` or after `release()`
    #[error("engine is not initialized")]
    NotInitialized,

    /// Engine produced no frame data for a step
    #[error("engine returned an empty frame")]
    EmptyFrame,

    /// Frame encoding failed
    #[error("frame encoding failed: {0}")]
    Encode(String),

    /// The process-wide native engine is already in use
    #[error("native engine already claimed by this process")]
    AlreadyClaimed,
}

impl From<image::ImageError> for EngineError {
    fn from(e: image::ImageError) -> Self {
        EngineError::Encode(e.to_string())
    }
}
