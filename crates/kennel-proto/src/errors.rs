//! Protocol error types.

use thiserror::Error;

use crate::EventKind;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding wire frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame is not a JSON object.
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Frame has no string `type` field.
    #[error("frame has no `type` discriminator")]
    MissingType,

    /// Frame carries a `type` this client does not understand.
    #[error("unknown event type: {0:?}")]
    UnknownEvent(String),

    /// Frame tag is known but the payload does not match its shape.
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        /// Tag of the offending frame.
        kind: EventKind,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },

    /// Outbound intent could not be serialized.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// API base URL could not be parsed or extended.
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),

    /// API base URL uses a scheme with no websocket counterpart.
    #[error("unsupported endpoint scheme: {0}")]
    UnsupportedScheme(String),
}
