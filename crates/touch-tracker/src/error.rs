//! Error types for the tracking engine

use thiserror::Error;
use touch_core::CoreError;

/// Errors that can occur while configuring the tracking engine.
///
/// Per-frame processing never fails; degenerate input is normalized instead.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl TrackerError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;
