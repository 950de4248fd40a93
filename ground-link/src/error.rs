use thiserror::Error;

/// Errors produced by the ground link.
#[derive(Error, Debug)]
pub enum LinkError {
    /// Inbound text was not a well-formed client message.
    #[error("malformed client message: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Well-formed request that named something that does not exist.
    #[error("{command} rejected: {reason}")]
    Rejected { command: String, reason: String },

    #[error("unknown camera: {0:?}")]
    InvalidCamera(String),

    /// Raw frame length does not match its stated dimensions.
    #[error("frame is {actual} bytes, expected {expected}")]
    FrameSize { expected: usize, actual: usize },

    #[error("JPEG encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("failed to serialize outbound message: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The control loop thread has exited.
    #[error("control loop stopped")]
    LoopStopped,
}
