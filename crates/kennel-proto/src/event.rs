//! Inbound realtime events.
//!
//! Every text frame from the server is a JSON object whose `type` field picks
//! the payload shape. Decoding is two-phase: the tag is read first so that an
//! unknown tag and a malformed payload for a known tag produce different
//! errors, then the whole object is decoded into the matching variant.
//!
//! # Invariants
//!
//! - Each [`ServerEvent`] variant maps to exactly one [`EventKind`] (enforced
//!   by match exhaustiveness in [`ServerEvent::kind`]).
//! - Unknown fields are ignored; missing required fields are a decode error.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ChatMessage, ThreadId, UserId, errors::ProtocolError};

/// Discriminator of a [`ServerEvent`].
///
/// Listener registration is keyed by this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// Server accepted the socket.
    Connected,
    /// Counterpart sent a message.
    NewMessage,
    /// Server persisted a message we sent.
    MessageSent,
    /// Counterpart started or stopped typing.
    Typing,
    /// Counterpart read the thread.
    MessagesRead,
    /// Server reported an error.
    Error,
}

impl EventKind {
    /// All tags, in wire order.
    pub const ALL: [EventKind; 6] = [
        Self::Connected,
        Self::NewMessage,
        Self::MessageSent,
        Self::Typing,
        Self::MessagesRead,
        Self::Error,
    ];

    /// Wire name of the tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::NewMessage => "new_message",
            Self::MessageSent => "message_sent",
            Self::Typing => "typing",
            Self::MessagesRead => "messages_read",
            Self::Error => "error",
        }
    }

    /// Tag for a wire name. `None` for names this client does not know.
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event pushed by the realtime endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Socket accepted and authenticated.
    Connected {
        /// Authenticated user, if the server reports it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<UserId>,
    },

    /// A message addressed to us.
    NewMessage {
        /// The persisted message.
        message: ChatMessage,
    },

    /// Confirmation of one of our sends.
    MessageSent {
        /// The persisted message.
        message: ChatMessage,
        /// Correlation id copied from the send intent, when the server echoes
        /// it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_ref: Option<u64>,
    },

    /// Typing indicator from the counterpart.
    Typing {
        /// Thread the indicator applies to.
        thread_id: ThreadId,
        /// Who is typing.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender_id: Option<UserId>,
        /// Typing started (`true`) or stopped (`false`).
        #[serde(default)]
        is_typing: bool,
    },

    /// Counterpart read messages in a thread.
    MessagesRead {
        /// Thread that was read.
        thread_id: ThreadId,
        /// Reader.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<UserId>,
    },

    /// Server-side failure report.
    Error {
        /// Human readable description.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        /// Longer description some backends send instead of `message`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

impl ServerEvent {
    /// Tag of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Connected { .. } => EventKind::Connected,
            Self::NewMessage { .. } => EventKind::NewMessage,
            Self::MessageSent { .. } => EventKind::MessageSent,
            Self::Typing { .. } => EventKind::Typing,
            Self::MessagesRead { .. } => EventKind::MessagesRead,
            Self::Error { .. } => EventKind::Error,
        }
    }

    /// Text of an `error` event: `message`, else `detail`.
    pub fn error_text(&self) -> Option<&str> {
        match self {
            Self::Error { message, detail } => message.as_deref().or(detail.as_deref()),
            _ => None,
        }
    }

    /// Thread this event concerns, if any.
    pub fn thread_id(&self) -> Option<&ThreadId> {
        match self {
            Self::NewMessage { message } | Self::MessageSent { message, .. } => {
                Some(&message.thread_id)
            },
            Self::Typing { thread_id, .. } | Self::MessagesRead { thread_id, .. } => {
                Some(thread_id)
            },
            Self::Connected { .. } | Self::Error { .. } => None,
        }
    }

    /// Decode a text frame.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::Malformed`] if the frame is not a JSON object
    /// - [`ProtocolError::MissingType`] if `type` is absent or not a string
    /// - [`ProtocolError::UnknownEvent`] for tags this client does not know
    /// - [`ProtocolError::InvalidPayload`] if the payload does not match the
    ///   tag
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(ProtocolError::Malformed)?;

        let tag = value.get("type").and_then(serde_json::Value::as_str).ok_or(
            if value.is_object() {
                ProtocolError::MissingType
            } else {
                ProtocolError::Malformed(serde::de::Error::custom("frame is not an object"))
            },
        )?;

        let kind =
            EventKind::from_wire(tag).ok_or_else(|| ProtocolError::UnknownEvent(tag.to_owned()))?;

        serde_json::from_value(value).map_err(|source| ProtocolError::InvalidPayload { kind, source })
    }

    /// Encode as a text frame. Used by test servers and fixtures.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}
