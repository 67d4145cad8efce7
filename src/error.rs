//! Typed failures surfaced to the user.
//!
//! Extraction misses are deliberately absent: an undetected field resolves to
//! a sentinel value, never an error.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("camera unavailable: {0}")]
    Unavailable(String),

    #[error("no camera stream attached")]
    NotStarted,
}

#[derive(Debug, Clone, Error)]
#[error("recognition failed: {message}")]
pub struct RecognitionError {
    pub message: String,
}

impl RecognitionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("frame has zero width or height")]
    EmptyFrame,

    #[error("pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("failed to encode normalized image: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("drug name is required")]
    MissingDrugName,

    #[error("reminder text is required")]
    MissingReminderText,

    #[error("invalid reminder time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("day {0} is outside 1..=31")]
    InvalidDay(u32),
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Recognition(#[from] RecognitionError),

    #[error("recognition did not finish within {0:?}")]
    Timeout(Duration),

    #[error("scan cancelled")]
    Cancelled,

    #[error("image worker failed: {0}")]
    Worker(String),
}
