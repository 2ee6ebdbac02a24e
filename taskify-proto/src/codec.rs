//! JSON encoding for live-feed frames.

use crate::feed::FeedEvent;

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// The frame exceeded the allowed size.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge {
        /// Encoded size.
        size: usize,
        /// Configured limit.
        max: usize,
    },
}

/// Maximum size of a single text frame a client is expected to accept (1 MiB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Encodes a [`FeedEvent`] as a JSON text frame.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the event cannot be serialized, or
/// `CodecError::FrameTooLarge` if the result exceeds [`MAX_FRAME_SIZE`].
pub fn encode(event: &FeedEvent) -> Result<String, CodecError> {
    let text = serde_json::to_string(event).map_err(|e| CodecError::Serialization(e.to_string()))?;
    if text.len() > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            size: text.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(text)
}

/// Decodes a [`FeedEvent`] from a JSON text frame.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the text is not a valid frame.
pub fn decode(text: &str) -> Result<FeedEvent, CodecError> {
    serde_json::from_str(text).map_err(|e| CodecError::Serialization(e.to_string()))
}
