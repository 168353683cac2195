//! Client
//!
//! Async realtime messaging client for Kennel. Wraps the Sans-IO
//! [`kennel_core::Connection`] in a tokio task that owns the socket, drives
//! reconnect backoff, and dispatches decoded events to registered listeners.
//!
//! # Architecture
//!
//! [`ChatClient`] is a cheap handle. All link state lives in one background
//! task; the handle talks to it through a command channel and observes its
//! [`LinkState`] through a watch channel. Listeners live in a shared registry
//! so `on`/`off` never wait on the task.
//!
//! # Components
//!
//! - [`ChatClient`]: connect, subscribe, send intents, disconnect
//! - [`Transport`] / [`Socket`]: pluggable text-frame transport
//! - [`MessagesApi`]: REST operations the messaging layer depends on
//! - [`SystemEnv`]: production [`kennel_core::Environment`]
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::WsTransport`]: WebSocket transport over tokio-tungstenite
//! - [`rest::RestClient`]: reqwest implementation of [`MessagesApi`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod api;
mod client;
mod env;
mod error;
pub mod transport;

#[cfg(feature = "transport")]
pub mod rest;

pub use api::{ApiError, MessagesApi, NewMessage, error_message};
pub use client::{ChatClient, ClientConfig};
pub use env::SystemEnv;
pub use error::ClientError;
pub use kennel_core::{LinkState, Listener, ListenerId};
pub use kennel_proto::EventKind;
pub use transport::{OpenFuture, Socket, Transport, TransportError};
