use thiserror::Error;

/// Vital monitor error types
#[derive(Error, Debug)]
pub enum VitalError {
    #[error("Measurement incomplete: no rate windows were collected")]
    MeasurementIncomplete,

    #[error("Invalid phase state: {0}")]
    InvalidState(String),

    #[error("Frame source failed: {0}")]
    FrameSource(String),

    #[error("Frame index {0} out of range")]
    FrameIndexOutOfRange(usize),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for vital sign operations
pub type VitalResult<T> = Result<T, VitalError>;
