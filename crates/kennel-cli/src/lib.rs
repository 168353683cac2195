//! Line-based terminal client for Kennel messaging
//!
//! A thin shell over [`kennel_app::Driver`] that reads commands and drafts
//! from standard input and prints the conversation as plain lines. All
//! orchestration logic lives in the generic [`kennel_app::Runtime`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod terminal;
pub mod ui;

pub use kennel_app::{Bridge, Driver, Runtime, ThreadView, UserInput};
pub use terminal::{LineDriver, TerminalError, parse_line};
pub use ui::Screen;
