// JSON text codec for protocol frames.
//
// Each WebSocket text frame carries exactly one JSON object. Encoding is a
// plain `serde_json::to_string`. Decoding is two-stage so the caller can tell
// apart the two failure modes the protocol treats differently:
//
// - a well-formed object with a `type` this build does not know is
//   `Decoded::Unknown`. Newer peers may send frame types we have never heard
//   of; the receiver logs and skips them.
// - anything else that fails (not JSON, not an object, no string `type`,
//   missing or mistyped fields for a known type) is a `CodecError`. The
//   receiver logs it and drops that single frame.
//
// Neither case is a reason to close the channel.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::message::{ClientMessage, ServerMessage};

/// `type` tags understood by `ClientMessage`.
pub const CLIENT_FRAME_TYPES: &[&str] = &["update", "waterBalloon"];

/// `type` tags understood by `ServerMessage`.
pub const SERVER_FRAME_TYPES: &[&str] = &[
    "init",
    "playerJoined",
    "playerUpdate",
    "playerLeft",
    "waterBalloon",
    "error",
];

/// A frame that could not be decoded (or encoded).
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("frame has no string `type` field")]
    MissingType,
    #[error("malformed `{kind}` frame: {source}")]
    Payload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result of decoding one frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Decoded<M> {
    Message(M),
    /// Well-formed frame with an unrecognized `type`.
    Unknown(String),
}

/// Serialize a message to its JSON text frame.
pub fn encode<M: Serialize>(msg: &M) -> Result<String, CodecError> {
    Ok(serde_json::to_string(msg)?)
}

/// Decode a frame sent by a client.
pub fn decode_client(text: &str) -> Result<Decoded<ClientMessage>, CodecError> {
    decode_tagged(text, CLIENT_FRAME_TYPES)
}

/// Decode a frame sent by the relay.
pub fn decode_server(text: &str) -> Result<Decoded<ServerMessage>, CodecError> {
    decode_tagged(text, SERVER_FRAME_TYPES)
}

fn decode_tagged<M: DeserializeOwned>(
    text: &str,
    known: &[&str],
) -> Result<Decoded<M>, CodecError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Object(ref fields) = value else {
        return Err(CodecError::NotAnObject);
    };
    let kind = match fields.get("type") {
        Some(Value::String(kind)) => kind.clone(),
        _ => return Err(CodecError::MissingType),
    };
    if !known.contains(&kind.as_str()) {
        return Ok(Decoded::Unknown(kind));
    }
    serde_json::from_value(value)
        .map(Decoded::Message)
        .map_err(|source| CodecError::Payload { kind, source })
}
