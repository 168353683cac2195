//! Application layer for Kennel messaging
//!
//! Pure thread view state machine and a generic runtime that wires it to the
//! realtime client, the REST API, and a platform driver. The view runs the
//! same code in tests and in the terminal binary.
//!
//! # Components
//!
//! - [`ThreadView`]: conversation state (messages, provisional sends, typing,
//!   thread list)
//! - [`Bridge`]: translates view actions into client calls and client events
//!   into view events
//! - [`Driver`]: trait for platform-specific input and rendering
//! - [`Runtime`]: orchestration loop (REST calls, timers, realtime events)

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod bridge;
mod driver;
mod event;
mod input;
mod runtime;
mod state;
mod view;

pub use action::{DEFAULT_GREETING, RECONCILE_AFTER, TYPING_IDLE_AFTER, Timer, ViewAction};
pub use bridge::Bridge;
pub use driver::Driver;
pub use event::ViewEvent;
pub use input::UserInput;
pub use runtime::Runtime;
pub use state::OpenThread;
pub use view::ThreadView;
