//! Outbound realtime intents.

use serde::{Deserialize, Serialize};

use crate::{ThreadId, UserId, errors::ProtocolError};

/// Intent sent from the client to the realtime endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientIntent {
    /// Persist and deliver a message.
    SendMessage {
        /// Target thread.
        thread_id: ThreadId,
        /// Recipient.
        receiver_id: UserId,
        /// Message text.
        body: String,
        /// Client-generated correlation id, echoed in `message_sent` by
        /// servers that support it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_ref: Option<u64>,
    },

    /// Typing indicator for the counterpart.
    Typing {
        /// Thread being typed in.
        thread_id: ThreadId,
        /// Counterpart to notify.
        receiver_id: UserId,
        /// Typing started (`true`) or stopped (`false`).
        is_typing: bool,
    },

    /// Mark every message in a thread as read.
    MarkRead {
        /// Thread to mark.
        thread_id: ThreadId,
    },
}

impl ClientIntent {
    /// Thread this intent targets.
    pub fn thread_id(&self) -> &ThreadId {
        match self {
            Self::SendMessage { thread_id, .. }
            | Self::Typing { thread_id, .. }
            | Self::MarkRead { thread_id } => thread_id,
        }
    }

    /// Encode as a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    /// Decode a text frame. Used by test servers.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Malformed`] if the frame is not a valid intent.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Malformed)
    }
}
