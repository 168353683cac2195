//! Fuzz target for the realtime link state machine
//!
//! # Strategy
//!
//! Drive a [`Connection`] with arbitrary interleavings of user commands,
//! transport outcomes, stale and current backoff expiries, and inbound
//! frames.
//!
//! # Invariants
//!
//! - Only an open link accepts sends
//! - A transport is never requested while one is open or pending
//! - Backoff delays grow linearly and never exceed the attempt budget
//! - After a deliberate disconnect no reconnect is ever scheduled until the
//!   next connect

#![no_main]

use arbitrary::Arbitrary;
use kennel_core::{Connection, ConnectionAction, ConnectionConfig, ConnectionError, LinkState};
use kennel_proto::{ClientIntent, ThreadId};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Connect,
    Disconnect,
    Opened,
    Failed,
    Closed,
    ReconnectDue { attempt: u8 },
    ScheduledDue,
    Send,
    Frame(String),
}

fuzz_target!(|ops: Vec<Op>| {
    let config = ConnectionConfig::default();
    let mut conn = Connection::new(config.clone());
    let mut scheduled: Option<u32> = None;
    let mut closed_deliberately = false;

    for op in ops {
        let before = conn.state();
        let actions = match op {
            Op::Connect => {
                closed_deliberately = false;
                conn.connect()
            },
            Op::Disconnect => {
                closed_deliberately = true;
                conn.disconnect()
            },
            Op::Opened => conn.transport_opened(),
            Op::Failed => conn.transport_failed(),
            Op::Closed => conn.transport_closed(),
            Op::ReconnectDue { attempt } => conn.reconnect_due(u32::from(attempt)),
            Op::ScheduledDue => match scheduled.take() {
                Some(attempt) => conn.reconnect_due(attempt),
                None => vec![],
            },
            Op::Send => {
                let intent = ClientIntent::MarkRead { thread_id: ThreadId::new("a_b") };
                match conn.send(&intent) {
                    Ok(actions) => {
                        assert_eq!(before, LinkState::Open);
                        actions
                    },
                    Err(ConnectionError::NotConnected) => {
                        assert_ne!(before, LinkState::Open);
                        vec![]
                    },
                    Err(e) => panic!("unexpected send error: {e}"),
                }
            },
            Op::Frame(text) => conn.handle_text(&text).unwrap_or_default(),
        };

        for action in actions {
            match action {
                ConnectionAction::OpenTransport => {
                    assert!(!matches!(before, LinkState::Open | LinkState::Connecting { .. }));
                },
                ConnectionAction::ScheduleReconnect { attempt, delay } => {
                    assert!(!closed_deliberately);
                    assert!(attempt >= 1 && attempt <= config.max_reconnect_attempts);
                    assert_eq!(delay, config.backoff_delay(attempt));
                    scheduled = Some(attempt);
                },
                ConnectionAction::GaveUp { attempts } => {
                    assert_eq!(attempts, config.max_reconnect_attempts);
                    assert_eq!(conn.state(), LinkState::GaveUp);
                },
                ConnectionAction::Transmit(_)
                | ConnectionAction::CloseTransport
                | ConnectionAction::Deliver(_) => {},
            }
        }

        if closed_deliberately {
            assert_eq!(conn.state(), LinkState::Idle);
        }
    }
});
