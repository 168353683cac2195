//! Platform-agnostic user input.

use kennel_proto::{ThreadId, UserId};

/// User input reported by a [`crate::Driver`].
///
/// Decouples the runtime from terminal or UI libraries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// Draft text changed.
    Draft(String),
    /// Send the current draft.
    Submit,
    /// Switch to a thread.
    Open(ThreadId),
    /// Talk to a user, creating the thread if needed.
    StartThread {
        /// The other participant.
        with: UserId,
        /// First message if the thread has to be created.
        greeting: Option<String>,
    },
    /// Reload the thread list.
    RefreshThreads,
    /// Leave.
    Quit,
}
