//! Message and thread projections.
//!
//! These are the client-visible shapes of rows the backend owns. The same
//! structs are used for realtime payloads and REST responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MessageId, ThreadId, UserId, timestamp};

/// A chat message as seen by a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Server id, or a provisional id for unconfirmed local sends.
    pub id: MessageId,
    /// Conversation this message belongs to.
    pub thread_id: ThreadId,
    /// Author.
    pub sender_id: UserId,
    /// Recipient.
    pub receiver_id: UserId,
    /// Message text.
    pub body: String,
    /// Creation time. Visible lists are ordered by this field.
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    /// Recipient has read the message.
    #[serde(default)]
    pub read: bool,
    /// When the recipient read the message.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "timestamp::deserialize_opt"
    )]
    pub read_at: Option<DateTime<Utc>>,
}

impl ChatMessage {
    /// True if the message has not been confirmed by the server yet.
    pub fn is_provisional(&self) -> bool {
        self.id.is_provisional()
    }
}

/// Minimal public profile of a conversation counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// User id.
    pub id: UserId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

/// One entry of the conversation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSummary {
    /// Conversation id.
    pub thread_id: ThreadId,
    /// The other participant.
    pub other_user: UserSummary,
    /// Most recent message in the thread.
    pub last_message: ChatMessage,
    /// Messages addressed to the current user that are still unread.
    #[serde(default)]
    pub unread_count: u32,
}
