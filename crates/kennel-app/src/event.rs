//! View input events.
//!
//! Events originate from three sources:
//! - User interactions, converted from [`crate::UserInput`] by the runtime.
//! - Completed REST calls and fired timers.
//! - Realtime traffic and link state changes, translated by
//!   [`crate::Bridge`].

use chrono::{DateTime, Utc};
use kennel_core::LinkState;
use kennel_proto::{ChatMessage, ServerEvent, ThreadId, ThreadSummary, UserId};

use crate::Timer;

/// Events processed by the view state machine.
#[derive(Debug, Clone)]
pub enum ViewEvent {
    /// Reload the thread list.
    RefreshThreads,

    /// User selected a thread.
    OpenThread {
        /// Thread to open.
        thread_id: ThreadId,
    },

    /// User asked to talk to someone, creating the thread if needed.
    StartThread {
        /// The other participant.
        with: UserId,
        /// First message if the thread has to be created.
        greeting: Option<String>,
    },

    /// The thread exists on the server now, either found or created.
    ThreadStarted {
        /// Thread to open.
        thread_id: ThreadId,
    },

    /// Finding or creating a thread failed.
    ThreadStartFailed {
        /// Thread that was requested.
        thread_id: ThreadId,
        /// Error description.
        reason: String,
    },

    /// Thread history arrived.
    HistoryLoaded {
        /// Thread the history belongs to.
        thread_id: ThreadId,
        /// Messages as stored by the server.
        messages: Vec<ChatMessage>,
    },

    /// Thread history request failed.
    HistoryFailed {
        /// Thread that was requested.
        thread_id: ThreadId,
        /// Error description.
        reason: String,
    },

    /// Thread list arrived.
    ThreadsLoaded {
        /// Every thread of the user.
        threads: Vec<ThreadSummary>,
    },

    /// Thread list request failed.
    ThreadsFailed {
        /// Error description.
        reason: String,
    },

    /// "Mark thread read" completed.
    ThreadMarkedRead {
        /// Thread that was marked.
        thread_id: ThreadId,
        /// Messages newly marked read.
        updated: u32,
    },

    /// A single message was marked read on the server.
    MessageMarkedRead {
        /// The message as stored after the update.
        message: ChatMessage,
    },

    /// Draft text changed (one keystroke).
    DraftEdited {
        /// Full draft after the edit.
        draft: String,
    },

    /// User submitted the draft.
    Submit {
        /// Submission time, used as the provisional timestamp.
        now: DateTime<Utc>,
    },

    /// An armed timer fired.
    TimerFired(Timer),

    /// Realtime event from the server.
    Server(ServerEvent),

    /// Realtime link changed state.
    LinkChanged(LinkState),

    /// Realtime connect failed.
    ConnectFailed {
        /// Error description.
        reason: String,
        /// A later connect may succeed.
        transient: bool,
    },

    /// An intent could not be transmitted.
    TransmitFailed {
        /// Error description.
        reason: String,
    },

    /// View is being torn down.
    Close,
}
