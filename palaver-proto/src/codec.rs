//! Serialization and deserialization for the Palaver wire protocol.
//!
//! Frames are JSON text with a `type` discriminant. Decoding distinguishes
//! malformed frames from well-formed frames with an unrecognized tag so the
//! caller can log them differently; both are dropped without terminating
//! the connection.

use crate::event::{ClientEvent, ServerEvent};

/// Inbound tags this client understands. Anything else decodes to
/// [`DecodeError::UnknownType`].
const RECOGNIZED_TAGS: [&str; 4] = [
    "MESSAGE",
    "UPDATE_READERS",
    "USER_ENTER_CHAT",
    "USER_EXIT_CHAT",
];

/// Error type for encoding outbound events.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// Serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Error type for decoding inbound frames.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The frame is not valid JSON or its payload does not match the tag.
    #[error("malformed frame: {0}")]
    Malformed(String),
    /// The frame is a JSON object without a string `type` field.
    #[error("frame has no \"type\" field")]
    MissingType,
    /// The `type` tag is well-formed but not one this client recognizes.
    #[error("unrecognized event type {0:?}")]
    UnknownType(String),
}

/// Encodes a [`ClientEvent`] into a JSON text frame.
///
/// # Errors
///
/// Returns [`EncodeError::Serialization`] if the event cannot be serialized
/// (does not happen for any constructible `ClientEvent`).
pub fn encode(event: &ClientEvent) -> Result<String, EncodeError> {
    serde_json::to_string(event).map_err(|e| EncodeError::Serialization(e.to_string()))
}

/// Decodes a JSON text frame into a [`ServerEvent`].
///
/// # Errors
///
/// Returns [`DecodeError::Malformed`] for invalid JSON or a payload that
/// does not match its tag, [`DecodeError::MissingType`] when the `type`
/// field is absent or not a string, and [`DecodeError::UnknownType`] for a
/// tag outside the recognized set.
pub fn decode(text: &str) -> Result<ServerEvent, DecodeError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let tag = value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or(DecodeError::MissingType)?;
    if !RECOGNIZED_TAGS.contains(&tag) {
        return Err(DecodeError::UnknownType(tag.to_string()));
    }
    serde_json::from_value(value).map_err(|e| DecodeError::Malformed(e.to_string()))
}
