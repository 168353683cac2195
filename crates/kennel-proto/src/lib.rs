//! Protocol
//!
//! Wire types for the Kennel realtime chat endpoint and its REST companion.
//!
//! Frames are JSON text objects with a string `type` discriminator. Inbound
//! frames decode into the closed [`ServerEvent`] union; outbound frames are
//! built from [`ClientIntent`]. Nothing in this crate performs I/O.
//!
//! # Components
//!
//! - [`ServerEvent`] / [`EventKind`]: inbound events and their tags
//! - [`ClientIntent`]: outbound intents (send, typing, mark read)
//! - [`ChatMessage`], [`ThreadSummary`]: message and thread projections
//! - [`realtime_url`]: derive the socket URL from the API base and token

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod endpoint;
pub mod errors;
mod event;
mod ids;
mod intent;
mod message;
mod timestamp;

pub use endpoint::realtime_url;
pub use errors::{ProtocolError, Result};
pub use event::{EventKind, ServerEvent};
pub use ids::{AuthToken, MessageId, ThreadId, UserId};
pub use intent::ClientIntent;
pub use message::{ChatMessage, ThreadSummary, UserSummary};
