//! Property-based tests for the thread view.
//!
//! Arbitrary interleavings of deliveries, confirmations, local sends, timer
//! expiries, and history reloads must keep the visible list sorted and free
//! of duplicates.

use chrono::{DateTime, TimeZone, Utc};
use kennel_app::{ThreadView, Timer, ViewAction, ViewEvent};
use kennel_proto::{ChatMessage, MessageId, ServerEvent, ThreadId, UserId};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Deliver { id: u8, secs: i64 },
    DeliverElsewhere { id: u8, secs: i64 },
    Send { secs: i64 },
    Confirm { client_ref: Option<u64>, id: u8, secs: i64 },
    Reconcile { client_ref: u64 },
    Reload { ids: Vec<(u8, i64)> },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..8, 0i64..20).prop_map(|(id, secs)| Op::Deliver { id, secs }),
        1 => (0u8..8, 0i64..20).prop_map(|(id, secs)| Op::DeliverElsewhere { id, secs }),
        3 => (0i64..20).prop_map(|secs| Op::Send { secs }),
        3 => (prop::option::of(1u64..6), 0u8..8, 0i64..20)
            .prop_map(|(client_ref, id, secs)| Op::Confirm { client_ref, id, secs }),
        1 => (1u64..6).prop_map(|client_ref| Op::Reconcile { client_ref }),
        1 => prop::collection::vec((0u8..8, 0i64..20), 0..6).prop_map(|ids| Op::Reload { ids }),
    ]
}

fn owner() -> UserId {
    UserId::new("owner")
}

fn sitter() -> UserId {
    UserId::new("sitter")
}

fn thread() -> ThreadId {
    ThreadId::for_pair(&owner(), &sitter())
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_714_557_600 + secs, 0).unwrap()
}

fn message(thread_id: ThreadId, id: u8, secs: i64) -> ChatMessage {
    ChatMessage {
        id: MessageId::new(format!("m{id}")),
        thread_id,
        sender_id: sitter(),
        receiver_id: owner(),
        body: format!("body {id}"),
        created_at: at(secs),
        read: false,
        read_at: None,
    }
}

fn apply(view: &mut ThreadView, op: Op) -> Vec<ViewAction> {
    match op {
        Op::Deliver { id, secs } => {
            view.handle(ViewEvent::Server(ServerEvent::NewMessage { message: message(thread(), id, secs) }))
        },
        Op::DeliverElsewhere { id, secs } => view.handle(ViewEvent::Server(ServerEvent::NewMessage {
            message: message(ThreadId::new("owner_vet"), id, secs),
        })),
        Op::Send { secs } => {
            view.handle(ViewEvent::DraftEdited { draft: "hola".into() });
            view.handle(ViewEvent::Submit { now: at(secs) })
        },
        Op::Confirm { client_ref, id, secs } => {
            let mut confirmed = message(thread(), id, secs);
            confirmed.sender_id = owner();
            confirmed.receiver_id = sitter();
            view.handle(ViewEvent::Server(ServerEvent::MessageSent { message: confirmed, client_ref }))
        },
        Op::Reconcile { client_ref } => {
            view.handle(ViewEvent::TimerFired(Timer::Reconcile { client_ref }))
        },
        Op::Reload { ids } => view.handle(ViewEvent::HistoryLoaded {
            thread_id: thread(),
            messages: ids.into_iter().map(|(id, secs)| message(thread(), id, secs)).collect(),
        }),
    }
}

proptest! {
    #[test]
    fn prop_visible_list_sorted_and_unique(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let mut view = ThreadView::new(owner());
        view.handle(ViewEvent::OpenThread { thread_id: thread() });

        for op in ops {
            apply(&mut view, op);

            let messages = view.messages();
            prop_assert!(messages.windows(2).all(|w| w[0].created_at <= w[1].created_at));

            let mut ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
            let total = ids.len();
            ids.sort_unstable();
            ids.dedup();
            prop_assert_eq!(ids.len(), total, "duplicate ids in {:?}", messages);

            prop_assert!(messages.iter().all(|m| m.thread_id == thread()));
        }
    }

    #[test]
    fn prop_confirmed_send_shows_once(
        prefix in prop::collection::vec(op_strategy(), 0..20),
        secs in 0i64..20,
    ) {
        let mut view = ThreadView::new(owner());
        view.handle(ViewEvent::OpenThread { thread_id: thread() });
        for op in prefix {
            apply(&mut view, op);
        }

        let actions = apply(&mut view, Op::Send { secs });
        let client_ref = actions
            .iter()
            .find_map(|action| match action {
                ViewAction::ArmTimer { timer: Timer::Reconcile { client_ref }, .. } => Some(*client_ref),
                _ => None,
            })
            .unwrap();

        // Confirmation under an id the prefix never uses.
        let mut confirmed = message(thread(), 200, secs);
        confirmed.sender_id = owner();
        view.handle(ViewEvent::Server(ServerEvent::MessageSent {
            message: confirmed.clone(),
            client_ref: Some(client_ref),
        }));
        view.handle(ViewEvent::Server(ServerEvent::NewMessage { message: confirmed }));

        let provisional = MessageId::provisional(client_ref);
        prop_assert!(view.messages().iter().all(|m| m.id != provisional));
        prop_assert_eq!(view.messages().iter().filter(|m| m.id.as_str() == "m200").count(), 1);
        let late_timer_actions = view.handle(ViewEvent::TimerFired(Timer::Reconcile { client_ref }));
        prop_assert!(late_timer_actions.is_empty());
    }
}
