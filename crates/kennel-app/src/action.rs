//! View side-effects.
//!
//! [`ViewAction`]s are instructions produced by the [`crate::ThreadView`]
//! state machine for the runtime to execute.

use std::time::Duration;

use kennel_client::NewMessage;
use kennel_proto::{ClientIntent, MessageId, ThreadId};

/// Idle time after the last keystroke before `typing=false` is sent.
pub const TYPING_IDLE_AFTER: Duration = Duration::from_secs(1);

/// Time a provisional message may wait for confirmation before the thread
/// history is re-fetched.
pub const RECONCILE_AFTER: Duration = Duration::from_secs(5);

/// First message of a thread started without one.
pub const DEFAULT_GREETING: &str = "Hi, I'm interested in your service";

/// Timers owned by the view. Arming a timer that is already armed restarts
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {
    /// Local typing indicator expiry.
    TypingIdle,
    /// Confirmation deadline for the send with this correlation id.
    Reconcile {
        /// Correlation id of the send.
        client_ref: u64,
    },
}

/// Actions produced by the view state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewAction {
    /// Redraw.
    Render,

    /// Stop the runtime.
    Quit,

    /// Load the thread list over REST.
    FetchThreads,

    /// Load one thread's history over REST.
    FetchHistory {
        /// Thread to load.
        thread_id: ThreadId,
    },

    /// Persist "all read" for a thread over REST.
    MarkThreadRead {
        /// Thread to mark.
        thread_id: ThreadId,
    },

    /// Persist "read" for one received message over REST.
    MarkMessageRead {
        /// Message to mark.
        message_id: MessageId,
    },

    /// Open the thread `first` belongs to, creating it with `first` unless
    /// the server already has it.
    StartThread {
        /// Message that creates the thread.
        first: NewMessage,
    },

    /// Send an intent over the realtime link.
    Transmit(ClientIntent),

    /// Start (or restart) a timer.
    ArmTimer {
        /// Which timer.
        timer: Timer,
        /// Time until it fires.
        delay: Duration,
    },

    /// Stop a timer if armed.
    CancelTimer(Timer),

    /// Stop every armed timer.
    CancelAllTimers,

    /// Close the realtime link.
    Disconnect,
}
