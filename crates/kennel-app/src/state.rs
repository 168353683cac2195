//! Observable view state types.

use kennel_proto::{ThreadId, UserId};

/// The conversation currently on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenThread {
    /// Thread id.
    pub thread_id: ThreadId,
    /// The other participant; receiver of local sends.
    pub counterpart: UserId,
}
