//! Error types shared across the touch tracking crates

use thiserror::Error;

/// Core error type for the touch tracking system
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid frame size: width={width}, height={height} (both must be positive)")]
    InvalidFrameSize { width: f64, height: f64 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    pub fn invalid_frame_size(width: f64, height: f64) -> Self {
        Self::InvalidFrameSize { width, height }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
