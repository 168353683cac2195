//! Realtime link state machine.
//!
//! Manages the lifecycle of the single transport owned by a chat client:
//! opening, bounded reconnection with linear backoff, and deliberate
//! teardown. Uses the action pattern: methods take notifications from the
//! driver and return actions for the driver to execute. No I/O, no clock.
//!
//! # State Machine
//!
//! ```text
//!            connect            opened
//!  ┌──────┐ ─────────> ┌────────────┐ ─────> ┌──────┐
//!  │ Idle │            │ Connecting │        │ Open │
//!  └──────┘ <───────── └────────────┘        └──────┘
//!     ^    user connect      ^   │ reconnect     │ unexpected close
//!     │    failed            │   │ failed        v
//!     │               due    │   └──────> ┌──────────────┐  attempts
//!     │ disconnect           └─────────── │ Reconnecting │ ──────────> GaveUp
//!     └────────────────────────────────── └──────────────┘  exhausted
//! ```
//!
//! # Invariants
//!
//! - At most one transport is requested at a time: `OpenTransport` is never
//!   emitted while a previous transport is pending or open.
//! - The reconnect counter increases by one per scheduled attempt, resets to
//!   zero when a transport opens, and never exceeds
//!   [`ConnectionConfig::max_reconnect_attempts`].
//! - The delay before attempt `n` is `n * backoff_step`.
//! - A close that follows [`Connection::disconnect`] never schedules a
//!   reconnect.

use std::time::Duration;

use kennel_proto::{ClientIntent, ServerEvent};

use crate::error::ConnectionError;

/// Reconnect attempts made after an unexpected close before giving up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Backoff unit. Attempt `n` waits `n` units.
pub const DEFAULT_BACKOFF_STEP: Duration = Duration::from_secs(1);

/// Actions returned by the connection state machine.
///
/// The driver executes these in order:
/// - `OpenTransport`: open a socket to the realtime URL and report back with
///   [`Connection::transport_opened`] or [`Connection::transport_failed`]
/// - `Transmit`: write the text frame to the open socket
/// - `CloseTransport`: close the socket; no notification is expected
/// - `ScheduleReconnect`: wait `delay`, then call
///   [`Connection::reconnect_due`] with `attempt`
/// - `Deliver`: hand the event to registered listeners
/// - `GaveUp`: surface permanent link loss to the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Open a new transport.
    OpenTransport,

    /// Send this text frame.
    Transmit(String),

    /// Close the current transport.
    CloseTransport,

    /// Wait, then retry.
    ScheduleReconnect {
        /// 1-based attempt number.
        attempt: u32,
        /// Time to wait before the attempt.
        delay: Duration,
    },

    /// Dispatch an inbound event.
    Deliver(ServerEvent),

    /// Reconnection stopped permanently.
    GaveUp {
        /// Attempts made.
        attempts: u32,
    },
}

/// Observable link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No transport and no pending retry.
    Idle,
    /// Transport requested, waiting for it to open.
    Connecting {
        /// Reconnect attempt this open belongs to. Zero for a user-initiated
        /// connect.
        attempt: u32,
    },
    /// Transport open; intents can be transmitted.
    Open,
    /// Transport lost; waiting out the backoff before `attempt`.
    Reconnecting {
        /// 1-based attempt number.
        attempt: u32,
    },
    /// Reconnect attempts exhausted. Only an explicit connect leaves this
    /// state.
    GaveUp,
}

/// Connection configuration
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Reconnect attempts after an unexpected close.
    pub max_reconnect_attempts: u32,
    /// Backoff unit; attempt `n` waits `n * backoff_step`.
    pub backoff_step: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            backoff_step: DEFAULT_BACKOFF_STEP,
        }
    }
}

impl ConnectionConfig {
    /// Delay before reconnect attempt `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_step.saturating_mul(attempt)
    }
}

/// Realtime link state machine.
///
/// Owns no transport; it tells the driver when to open and close one and
/// validates every request against the current state.
#[derive(Debug, Clone)]
pub struct Connection {
    state: LinkState,
    config: ConnectionConfig,
    /// Reconnect attempts since the last successful open.
    reconnect_attempts: u32,
    /// Set by `disconnect`, cleared by `connect`. Checked before scheduling
    /// a reconnect.
    close_requested: bool,
}

impl Default for Connection {
    fn default() -> Self {
        Self::new(ConnectionConfig::default())
    }
}

impl Connection {
    /// Create a connection in [`LinkState::Idle`].
    pub fn new(config: ConnectionConfig) -> Self {
        Self { state: LinkState::Idle, config, reconnect_attempts: 0, close_requested: false }
    }

    /// Current link state.
    #[must_use]
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// True while intents can be transmitted.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == LinkState::Open
    }

    /// Reconnect attempts since the last successful open.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Request an open link.
    ///
    /// - `Idle` or `GaveUp`: requests a transport.
    /// - `Reconnecting`: skips the remaining backoff and requests a transport
    ///   now; the pending timer is ignored when it fires.
    /// - `Connecting` or `Open`: no action. A second transport is never
    ///   requested; the caller joins the attempt in flight.
    pub fn connect(&mut self) -> Vec<ConnectionAction> {
        self.close_requested = false;
        match self.state {
            LinkState::Idle | LinkState::GaveUp => {
                self.state = LinkState::Connecting { attempt: 0 };
                vec![ConnectionAction::OpenTransport]
            },
            LinkState::Reconnecting { attempt } => {
                self.state = LinkState::Connecting { attempt };
                vec![ConnectionAction::OpenTransport]
            },
            LinkState::Connecting { .. } | LinkState::Open => vec![],
        }
    }

    /// The requested transport is open.
    ///
    /// Resets the reconnect counter. A transport that opens after the link
    /// was torn down is closed immediately.
    pub fn transport_opened(&mut self) -> Vec<ConnectionAction> {
        match self.state {
            LinkState::Connecting { .. } => {
                self.state = LinkState::Open;
                self.reconnect_attempts = 0;
                vec![]
            },
            LinkState::Idle
            | LinkState::Open
            | LinkState::Reconnecting { .. }
            | LinkState::GaveUp => vec![ConnectionAction::CloseTransport],
        }
    }

    /// The requested transport failed before opening.
    ///
    /// A user-initiated connect returns to `Idle` without retrying. A failed
    /// reconnect attempt schedules the next one.
    pub fn transport_failed(&mut self) -> Vec<ConnectionAction> {
        match self.state {
            LinkState::Connecting { attempt: 0 } => {
                self.state = LinkState::Idle;
                vec![]
            },
            LinkState::Connecting { .. } => self.schedule_reconnect(),
            LinkState::Idle
            | LinkState::Open
            | LinkState::Reconnecting { .. }
            | LinkState::GaveUp => vec![],
        }
    }

    /// The open transport closed.
    ///
    /// Schedules a reconnect unless the close was requested through
    /// [`Connection::disconnect`].
    pub fn transport_closed(&mut self) -> Vec<ConnectionAction> {
        if self.close_requested {
            self.state = LinkState::Idle;
            return vec![];
        }
        match self.state {
            LinkState::Open => self.schedule_reconnect(),
            LinkState::Connecting { .. } => self.transport_failed(),
            LinkState::Idle | LinkState::Reconnecting { .. } | LinkState::GaveUp => vec![],
        }
    }

    /// Backoff for `attempt` elapsed.
    ///
    /// Ignored unless the link is still waiting for that exact attempt, so a
    /// timer that outlives a disconnect or a manual connect is harmless.
    pub fn reconnect_due(&mut self, attempt: u32) -> Vec<ConnectionAction> {
        if self.state != (LinkState::Reconnecting { attempt }) {
            return vec![];
        }
        self.state = LinkState::Connecting { attempt };
        vec![ConnectionAction::OpenTransport]
    }

    /// Tear the link down deliberately. Idempotent.
    pub fn disconnect(&mut self) -> Vec<ConnectionAction> {
        self.close_requested = true;
        let had_transport = matches!(self.state, LinkState::Connecting { .. } | LinkState::Open);
        self.state = LinkState::Idle;
        if had_transport { vec![ConnectionAction::CloseTransport] } else { vec![] }
    }

    /// Encode an intent for transmission.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::NotConnected` unless the link is open. Nothing is
    ///   queued.
    /// - `ConnectionError::Protocol` if the intent cannot be encoded
    pub fn send(&mut self, intent: &ClientIntent) -> Result<Vec<ConnectionAction>, ConnectionError> {
        if !self.is_open() {
            return Err(ConnectionError::NotConnected);
        }
        Ok(vec![ConnectionAction::Transmit(intent.encode()?)])
    }

    /// Process an inbound text frame.
    ///
    /// Frames that arrive while the link is not open belong to a transport
    /// that is being discarded and are dropped.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::Protocol` if the frame does not decode. The frame
    ///   is discarded; the link stays open.
    pub fn handle_text(&mut self, text: &str) -> Result<Vec<ConnectionAction>, ConnectionError> {
        if !self.is_open() {
            return Ok(vec![]);
        }
        let event = ServerEvent::decode(text)?;
        Ok(vec![ConnectionAction::Deliver(event)])
    }

    fn schedule_reconnect(&mut self) -> Vec<ConnectionAction> {
        if self.reconnect_attempts >= self.config.max_reconnect_attempts {
            self.state = LinkState::GaveUp;
            tracing::warn!(attempts = self.reconnect_attempts, "reconnect attempts exhausted");
            return vec![ConnectionAction::GaveUp { attempts: self.reconnect_attempts }];
        }

        self.reconnect_attempts += 1;
        let attempt = self.reconnect_attempts;
        self.state = LinkState::Reconnecting { attempt };
        let delay = self.config.backoff_delay(attempt);
        tracing::debug!(attempt, ?delay, "scheduling reconnect");
        vec![ConnectionAction::ScheduleReconnect { attempt, delay }]
    }
}

#[cfg(test)]
mod tests {
    use kennel_proto::{ThreadId, UserId};

    use super::*;

    fn open_connection() -> Connection {
        let mut conn = Connection::default();
        assert_eq!(conn.connect(), vec![ConnectionAction::OpenTransport]);
        assert_eq!(conn.transport_opened(), vec![]);
        conn
    }

    fn typing() -> ClientIntent {
        ClientIntent::Typing {
            thread_id: ThreadId::new("a_b"),
            receiver_id: UserId::new("b"),
            is_typing: true,
        }
    }

    #[test]
    fn connection_lifecycle() {
        let mut conn = Connection::default();
        assert_eq!(conn.state(), LinkState::Idle);

        let actions = conn.connect();
        assert_eq!(actions, vec![ConnectionAction::OpenTransport]);
        assert_eq!(conn.state(), LinkState::Connecting { attempt: 0 });

        conn.transport_opened();
        assert!(conn.is_open());

        let actions = conn.disconnect();
        assert_eq!(actions, vec![ConnectionAction::CloseTransport]);
        assert_eq!(conn.state(), LinkState::Idle);
    }

    #[test]
    fn backoff_is_linear_and_bounded() {
        let mut conn = open_connection();

        let mut delays = Vec::new();
        let mut actions = conn.transport_closed();
        loop {
            match actions.as_slice() {
                [ConnectionAction::ScheduleReconnect { attempt, delay }] => {
                    delays.push(*delay);
                    assert_eq!(conn.reconnect_due(*attempt), vec![ConnectionAction::OpenTransport]);
                    actions = conn.transport_failed();
                },
                [ConnectionAction::GaveUp { attempts }] => {
                    assert_eq!(*attempts, 5);
                    break;
                },
                other => panic!("unexpected actions: {other:?}"),
            }
        }

        assert_eq!(delays, (1..=5).map(|n| Duration::from_secs(n)).collect::<Vec<_>>());
        assert_eq!(conn.state(), LinkState::GaveUp);
        assert_eq!(conn.reconnect_due(6), vec![]);
    }

    #[test]
    fn successful_reconnect_resets_counter() {
        let mut conn = open_connection();
        conn.transport_closed();
        conn.reconnect_due(1);
        conn.transport_failed();
        assert_eq!(conn.reconnect_attempts(), 2);

        conn.reconnect_due(2);
        conn.transport_opened();
        assert_eq!(conn.reconnect_attempts(), 0);

        let actions = conn.transport_closed();
        assert_eq!(actions, vec![ConnectionAction::ScheduleReconnect {
            attempt: 1,
            delay: Duration::from_secs(1)
        }]);
    }

    #[test]
    fn user_connect_failure_does_not_retry() {
        let mut conn = Connection::default();
        conn.connect();

        assert_eq!(conn.transport_failed(), vec![]);
        assert_eq!(conn.state(), LinkState::Idle);
        assert_eq!(conn.reconnect_attempts(), 0);
    }

    #[test]
    fn close_after_disconnect_does_not_reconnect() {
        let mut conn = open_connection();
        conn.disconnect();

        assert_eq!(conn.transport_closed(), vec![]);
        assert_eq!(conn.state(), LinkState::Idle);
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut conn = open_connection();
        assert_eq!(conn.disconnect(), vec![ConnectionAction::CloseTransport]);
        assert_eq!(conn.disconnect(), vec![]);
        assert_eq!(conn.disconnect(), vec![]);
    }

    #[test]
    fn stale_reconnect_timer_is_ignored_after_disconnect() {
        let mut conn = open_connection();
        conn.transport_closed();
        conn.disconnect();

        assert_eq!(conn.reconnect_due(1), vec![]);
        assert_eq!(conn.state(), LinkState::Idle);
    }

    #[test]
    fn double_connect_requests_one_transport() {
        let mut conn = Connection::default();
        assert_eq!(conn.connect(), vec![ConnectionAction::OpenTransport]);
        assert_eq!(conn.connect(), vec![]);

        conn.transport_opened();
        assert_eq!(conn.connect(), vec![]);
        assert!(conn.is_open());
    }

    #[test]
    fn manual_connect_preempts_backoff() {
        let mut conn = open_connection();
        conn.transport_closed();
        assert_eq!(conn.state(), LinkState::Reconnecting { attempt: 1 });

        assert_eq!(conn.connect(), vec![ConnectionAction::OpenTransport]);
        assert_eq!(conn.reconnect_due(1), vec![]);
    }

    #[test]
    fn late_open_after_disconnect_is_closed() {
        let mut conn = Connection::default();
        conn.connect();
        conn.disconnect();

        assert_eq!(conn.transport_opened(), vec![ConnectionAction::CloseTransport]);
        assert!(!conn.is_open());
    }

    #[test]
    fn send_requires_open_link() {
        let mut conn = Connection::default();
        assert!(matches!(conn.send(&typing()), Err(ConnectionError::NotConnected)));

        let mut conn = open_connection();
        let actions = conn.send(&typing()).unwrap();
        assert!(matches!(actions.as_slice(), [ConnectionAction::Transmit(text)] if text.contains("\"typing\"")));
    }

    #[test]
    fn malformed_frame_is_an_error_and_link_stays_open() {
        let mut conn = open_connection();
        assert!(matches!(conn.handle_text("{oops"), Err(ConnectionError::Protocol(_))));
        assert!(conn.is_open());

        let actions = conn.handle_text(r#"{"type":"connected"}"#).unwrap();
        assert_eq!(actions, vec![ConnectionAction::Deliver(ServerEvent::Connected {
            user_id: None
        })]);
    }

    #[test]
    fn frames_while_not_open_are_dropped() {
        let mut conn = Connection::default();
        assert_eq!(conn.handle_text(r#"{"type":"connected"}"#).unwrap(), vec![]);
    }
}
