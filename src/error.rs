//! Error types for the spherical PINN solver.

use thiserror::Error;

/// Result type for solver operations.
pub type PinnResult<T> = Result<T, PinnError>;

/// Errors that can occur while building or training a spherical solver.
#[derive(Debug, Error)]
pub enum PinnError {
    /// Tensor operation failed
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    /// Shape mismatch
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Requested gradient is not part of the computation graph
    #[error("No gradient recorded for `{0}` - the tensor is not a tracked leaf of the loss graph")]
    MissingGradient(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl PinnError {
    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a missing gradient error
    pub fn missing_gradient(name: impl Into<String>) -> Self {
        Self::MissingGradient(name.into())
    }
}
