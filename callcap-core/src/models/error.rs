use thiserror::Error;

/// Errors that can occur during capture, storage, and configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("device not available")]
    DeviceNotAvailable,

    #[error("device error: {0}")]
    Device(String),

    #[error("stream stop failed: {0}")]
    StreamStop(String),

    #[error("nothing to save")]
    EmptyCapture,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}
