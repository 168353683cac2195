//! Error types for the realtime link.
//!
//! Link errors stay inside the messaging layer: callers see them as `Result`
//! values and decide whether to retry, fall back to REST, or ignore.

use kennel_proto::ProtocolError;
use thiserror::Error;

/// Errors produced by [`crate::Connection`] operations.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The link is not open, so the intent was not transmitted.
    ///
    /// Nothing is queued. The caller decides whether to retry.
    #[error("not connected")]
    NotConnected,

    /// Inbound frame could not be decoded, or outbound intent could not be
    /// encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Underlying transport failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// Automatic reconnection stopped after the configured number of attempts.
    #[error("gave up after {attempts} reconnect attempts")]
    GaveUp {
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// The link was closed by an explicit disconnect.
    #[error("connection closed")]
    Closed,
}

impl ConnectionError {
    /// Returns true if the same operation may succeed later without
    /// intervention.
    ///
    /// `NotConnected` and transport failures clear once the link reopens.
    /// Protocol errors, exhausted reconnects and explicit closes do not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NotConnected | Self::Transport(_))
    }
}
