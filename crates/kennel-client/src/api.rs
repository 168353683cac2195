//! REST messages API.
//!
//! The realtime link carries live traffic; history, thread lists, and
//! persisted read state go through these REST calls. [`MessagesApi`] is the
//! seam: the app layer depends on the trait, production plugs in
//! [`crate::rest::RestClient`], tests plug in fakes.

use std::future::Future;

use kennel_proto::{ChatMessage, MessageId, ThreadId, ThreadSummary, UserId, UserSummary};
use serde::Serialize;
use thiserror::Error;

/// REST call failures.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request never produced a response.
    #[error("request failed: {0}")]
    Transport(String),

    /// Server answered with a non-success status.
    #[error("{message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Server-provided message, or "{status} {reason}".
        message: String,
    },

    /// Response body did not match the expected shape.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// Endpoint URL could not be built.
    #[error("invalid endpoint: {0}")]
    Url(String),
}

/// Body of `POST /messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewMessage {
    /// Conversation.
    pub thread_id: ThreadId,
    /// Author.
    pub sender_id: UserId,
    /// Counterpart.
    pub receiver_id: UserId,
    /// Message text.
    pub body: String,
}

/// REST operations used by the messaging layer.
pub trait MessagesApi: Send + Sync + 'static {
    /// `GET /messages?thread_id=` ordered history for one thread.
    fn list_messages(
        &self,
        thread_id: &ThreadId,
    ) -> impl Future<Output = Result<Vec<ChatMessage>, ApiError>> + Send;

    /// `GET /messages/threads` every thread of the caller with unread counts.
    fn list_threads(&self) -> impl Future<Output = Result<Vec<ThreadSummary>, ApiError>> + Send;

    /// `PATCH /messages/thread/{id}/read-all`. Returns the number of messages
    /// newly marked read.
    fn mark_thread_read(
        &self,
        thread_id: &ThreadId,
    ) -> impl Future<Output = Result<u32, ApiError>> + Send;

    /// `POST /messages` persist a message without the realtime link.
    fn create_message(
        &self,
        message: &NewMessage,
    ) -> impl Future<Output = Result<ChatMessage, ApiError>> + Send;

    /// `PATCH /messages/{id}/read`.
    fn mark_message_read(
        &self,
        message_id: &MessageId,
    ) -> impl Future<Output = Result<ChatMessage, ApiError>> + Send;

    /// `GET /auth/me` the authenticated user.
    fn me(&self) -> impl Future<Output = Result<UserSummary, ApiError>> + Send;
}

/// Human-readable message for a failed response.
///
/// Uses the first string among the body's `detail`, `message`, and `error`
/// fields; otherwise `"{status} {reason}"`.
pub fn error_message(status: u16, reason: &str, body: &str) -> String {
    let from_body = serde_json::from_str::<serde_json::Value>(body).ok().and_then(|value| {
        ["detail", "message", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(serde_json::Value::as_str).map(str::to_owned))
    });

    from_body.unwrap_or_else(|| format!("{status} {reason}").trim_end().to_owned())
}
