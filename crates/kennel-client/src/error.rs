//! Client error types.

use kennel_core::ConnectionError;
use kennel_proto::ProtocolError;
use thiserror::Error;

/// Errors returned by [`crate::ChatClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Link-level failure: sends while not connected, a transport that
    /// failed to open, or a closed or exhausted link.
    #[error(transparent)]
    Link(#[from] ConnectionError),

    /// Realtime endpoint could not be derived from the configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] ProtocolError),

    /// Background link task is gone.
    #[error("link task stopped")]
    Stopped,
}

impl ClientError {
    /// True if this is a send attempted while the link was down.
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::Link(ConnectionError::NotConnected))
    }

    /// True if retrying the same call later may succeed.
    ///
    /// Configuration errors and a stopped link task are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Link(e) => e.is_transient(),
            Self::Config(_) | Self::Stopped => false,
        }
    }
}
