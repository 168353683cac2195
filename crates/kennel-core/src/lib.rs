//! Core
//!
//! Pure state machines for the Kennel realtime messaging client.
//!
//! # Architecture
//!
//! Nothing here performs I/O. [`Connection`] takes transport notifications
//! (opened, failed, closed, frame received) and application requests
//! (connect, send, disconnect) and returns [`ConnectionAction`]s for a driver
//! to execute. Time enters only as the delays the machine asks the driver to
//! wait, so reconnect behaviour is fully testable without sockets or clocks.
//!
//! # Components
//!
//! - [`Connection`]: link lifecycle with bounded linear reconnect backoff
//! - [`ListenerRegistry`]: per-event-kind callback registry
//! - [`Environment`]: clock and sleep abstraction for drivers

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod connection;
pub mod dispatch;
pub mod env;
pub mod error;

pub use connection::{
    Connection, ConnectionAction, ConnectionConfig, DEFAULT_BACKOFF_STEP,
    DEFAULT_MAX_RECONNECT_ATTEMPTS, LinkState,
};
pub use dispatch::{Listener, ListenerId, ListenerRegistry};
pub use env::Environment;
pub use error::ConnectionError;
