//! Thread view state machine.
//!
//! Holds one open conversation, the thread list, and the local typing and
//! provisional-send bookkeeping. This is a pure state machine: it consumes
//! [`crate::ViewEvent`] inputs and produces [`crate::ViewAction`]
//! instructions for the runtime to execute.
//!
//! # Invariants
//!
//! - `messages` is sorted by `created_at` ascending; equal timestamps keep
//!   insertion order.
//! - No two entries in `messages` share an id, so a provisional send appears
//!   at most once and a duplicated delivery is shown once.
//! - Every provisional entry has an armed reconcile timer, until the entry is
//!   confirmed, the history is replaced, or the thread is closed.
//! - After [`ViewEvent::Close`] every event is ignored.

use std::collections::HashSet;

use kennel_client::NewMessage;
use kennel_core::LinkState;
use kennel_proto::{ChatMessage, ClientIntent, MessageId, ServerEvent, ThreadId, ThreadSummary, UserId};

use crate::{
    DEFAULT_GREETING, OpenThread, RECONCILE_AFTER, TYPING_IDLE_AFTER, Timer, ViewAction, ViewEvent,
};

/// Conversation view state machine.
#[derive(Debug, Clone)]
pub struct ThreadView {
    /// Local user.
    me: UserId,
    /// Conversation on screen. `None` until a thread is opened.
    open: Option<OpenThread>,
    /// Visible messages of the open thread.
    messages: Vec<ChatMessage>,
    /// Every thread of the user, for unread badges.
    threads: Vec<ThreadSummary>,
    draft: String,
    /// `typing=true` was sent and not yet retracted.
    typing: bool,
    counterpart_typing: bool,
    /// Next correlation id. Starts at 1.
    next_client_ref: u64,
    link: LinkState,
    status: Option<String>,
    closed: bool,
}

impl ThreadView {
    /// Create a view for `me` with no thread open.
    pub fn new(me: UserId) -> Self {
        Self {
            me,
            open: None,
            messages: Vec::new(),
            threads: Vec::new(),
            draft: String::new(),
            typing: false,
            counterpart_typing: false,
            next_client_ref: 1,
            link: LinkState::Idle,
            status: None,
            closed: false,
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: ViewEvent) -> Vec<ViewAction> {
        if self.closed {
            return vec![];
        }

        match event {
            ViewEvent::RefreshThreads => vec![ViewAction::FetchThreads],
            ViewEvent::OpenThread { thread_id } => self.enter_thread(thread_id),
            ViewEvent::StartThread { with, greeting } => self.start_thread(with, greeting),
            ViewEvent::ThreadStarted { thread_id } => {
                let mut actions = self.enter_thread(thread_id);
                actions.push(ViewAction::FetchThreads);
                actions
            },
            ViewEvent::ThreadStartFailed { thread_id, reason } => {
                tracing::warn!(thread = %thread_id, %reason, "could not start conversation");
                self.status = Some(format!("could not start conversation: {reason}"));
                vec![ViewAction::Render]
            },
            ViewEvent::MessageMarkedRead { message } => {
                if let Some(entry) = self.messages.iter_mut().find(|m| m.id == message.id) {
                    *entry = message;
                }
                vec![]
            },
            ViewEvent::HistoryLoaded { thread_id, messages } => {
                if !self.is_open(&thread_id) {
                    return vec![];
                }
                let mut actions = self.cancel_reconcile_timers();
                self.messages = messages;
                sort_and_dedup(&mut self.messages);
                actions.push(ViewAction::Render);
                actions
            },
            ViewEvent::HistoryFailed { thread_id, reason } => {
                if !self.is_open(&thread_id) {
                    return vec![];
                }
                tracing::warn!(thread = %thread_id, %reason, "history load failed");
                self.status = Some(format!("could not load messages: {reason}"));
                vec![ViewAction::Render]
            },
            ViewEvent::ThreadsLoaded { threads } => {
                self.threads = threads;
                self.clear_open_unread();
                vec![ViewAction::Render]
            },
            ViewEvent::ThreadsFailed { reason } => {
                tracing::warn!(%reason, "thread list load failed");
                vec![]
            },
            ViewEvent::ThreadMarkedRead { thread_id, updated } => {
                tracing::debug!(thread = %thread_id, updated, "thread marked read");
                vec![ViewAction::FetchThreads]
            },
            ViewEvent::DraftEdited { draft } => self.draft_edited(draft),
            ViewEvent::Submit { now } => self.submit(now),
            ViewEvent::TimerFired(timer) => self.timer_fired(timer),
            ViewEvent::Server(event) => self.server_event(event),
            ViewEvent::LinkChanged(state) => {
                self.link = state;
                match state {
                    LinkState::GaveUp => {
                        self.status = Some("realtime link lost".into());
                    },
                    LinkState::Open => self.status = None,
                    LinkState::Idle | LinkState::Connecting { .. } | LinkState::Reconnecting { .. } => {},
                }
                vec![ViewAction::Render]
            },
            ViewEvent::ConnectFailed { reason, transient } => {
                self.status = Some(if transient {
                    format!("offline: {reason}")
                } else {
                    format!("realtime unavailable: {reason}")
                });
                vec![ViewAction::Render]
            },
            ViewEvent::TransmitFailed { reason } => {
                self.status = Some(format!("not sent live: {reason}"));
                vec![ViewAction::Render]
            },
            ViewEvent::Close => {
                self.closed = true;
                self.typing = false;
                vec![ViewAction::CancelAllTimers, ViewAction::Disconnect, ViewAction::Quit]
            },
        }
    }

    /// Local user.
    pub fn me(&self) -> &UserId {
        &self.me
    }

    /// Conversation on screen.
    pub fn open_thread(&self) -> Option<&OpenThread> {
        self.open.as_ref()
    }

    /// Visible messages, oldest first.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Thread list.
    pub fn threads(&self) -> &[ThreadSummary] {
        &self.threads
    }

    /// Current draft.
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// True while the counterpart is typing in the open thread.
    pub fn counterpart_typing(&self) -> bool {
        self.counterpart_typing
    }

    /// Last observed realtime link state.
    pub fn link(&self) -> LinkState {
        self.link
    }

    /// Transient status line.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// True once the view was torn down.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn is_open(&self, thread_id: &ThreadId) -> bool {
        self.open.as_ref().is_some_and(|open| &open.thread_id == thread_id)
    }

    fn enter_thread(&mut self, thread_id: ThreadId) -> Vec<ViewAction> {
        let counterpart = self
            .threads
            .iter()
            .find(|summary| summary.thread_id == thread_id)
            .map(|summary| summary.other_user.id.clone())
            .or_else(|| thread_id.counterpart(&self.me));
        let Some(counterpart) = counterpart else {
            self.status = Some(format!("unknown conversation {thread_id}"));
            return vec![ViewAction::Render];
        };

        let mut actions = self.leave_thread();
        self.open = Some(OpenThread { thread_id: thread_id.clone(), counterpart });
        self.status = None;
        self.clear_open_unread();
        actions.extend([
            ViewAction::FetchHistory { thread_id: thread_id.clone() },
            ViewAction::MarkThreadRead { thread_id },
            ViewAction::Render,
        ]);
        actions
    }

    /// Open the thread with `with`, or ask the runtime to find or create it.
    fn start_thread(&mut self, with: UserId, greeting: Option<String>) -> Vec<ViewAction> {
        if with == self.me {
            self.status = Some("cannot start a conversation with yourself".into());
            return vec![ViewAction::Render];
        }
        let thread_id = ThreadId::for_pair(&self.me, &with);
        if self.threads.iter().any(|summary| summary.thread_id == thread_id) {
            return self.enter_thread(thread_id);
        }

        let body = greeting
            .map(|g| g.trim().to_owned())
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| DEFAULT_GREETING.to_owned());
        vec![ViewAction::StartThread {
            first: NewMessage { thread_id, sender_id: self.me.clone(), receiver_id: with, body },
        }]
    }

    /// Retract typing and drop per-thread state of the current thread.
    fn leave_thread(&mut self) -> Vec<ViewAction> {
        let mut actions = self.cancel_reconcile_timers();
        if let Some(retract) = self.stop_typing() {
            actions.push(retract);
        }
        actions.push(ViewAction::CancelTimer(Timer::TypingIdle));
        self.messages.clear();
        self.draft.clear();
        self.counterpart_typing = false;
        actions
    }

    fn draft_edited(&mut self, draft: String) -> Vec<ViewAction> {
        self.draft = draft;
        let Some(open) = &self.open else {
            return vec![ViewAction::Render];
        };

        let mut actions = Vec::new();
        if !self.typing {
            self.typing = true;
            actions.push(ViewAction::Transmit(ClientIntent::Typing {
                thread_id: open.thread_id.clone(),
                receiver_id: open.counterpart.clone(),
                is_typing: true,
            }));
        }
        actions.push(ViewAction::ArmTimer { timer: Timer::TypingIdle, delay: TYPING_IDLE_AFTER });
        actions.push(ViewAction::Render);
        actions
    }

    fn submit(&mut self, now: chrono::DateTime<chrono::Utc>) -> Vec<ViewAction> {
        let body = self.draft.trim();
        let Some(open) = &self.open else {
            return vec![];
        };
        if body.is_empty() {
            return vec![];
        }

        let client_ref = self.next_client_ref;
        self.next_client_ref += 1;
        let provisional = ChatMessage {
            id: MessageId::provisional(client_ref),
            thread_id: open.thread_id.clone(),
            sender_id: self.me.clone(),
            receiver_id: open.counterpart.clone(),
            body: body.to_owned(),
            created_at: now,
            read: false,
            read_at: None,
        };
        let intent = ClientIntent::SendMessage {
            thread_id: open.thread_id.clone(),
            receiver_id: open.counterpart.clone(),
            body: provisional.body.clone(),
            client_ref: Some(client_ref),
        };
        insert_message(&mut self.messages, provisional);
        self.draft.clear();

        let mut actions = vec![ViewAction::Transmit(intent)];
        if let Some(retract) = self.stop_typing() {
            actions.push(retract);
        }
        actions.extend([
            ViewAction::CancelTimer(Timer::TypingIdle),
            ViewAction::ArmTimer { timer: Timer::Reconcile { client_ref }, delay: RECONCILE_AFTER },
            ViewAction::Render,
        ]);
        actions
    }

    fn timer_fired(&mut self, timer: Timer) -> Vec<ViewAction> {
        match timer {
            Timer::TypingIdle => self.stop_typing().into_iter().collect(),
            Timer::Reconcile { client_ref } => {
                let id = MessageId::provisional(client_ref);
                let Some(thread_id) =
                    self.messages.iter().find(|m| m.id == id).map(|m| m.thread_id.clone())
                else {
                    return vec![];
                };
                tracing::warn!(client_ref, thread = %thread_id, "send unconfirmed, reloading history");
                vec![ViewAction::FetchHistory { thread_id }]
            },
        }
    }

    fn server_event(&mut self, event: ServerEvent) -> Vec<ViewAction> {
        match event {
            ServerEvent::Connected { user_id } => {
                tracing::debug!(?user_id, "server acknowledged connection");
                vec![]
            },
            ServerEvent::NewMessage { message } => {
                let mut actions = Vec::new();
                if self.is_open(&message.thread_id) {
                    let unread = message.sender_id != self.me && !message.read;
                    let message_id = message.id.clone();
                    if insert_message(&mut self.messages, message) && unread {
                        actions.push(ViewAction::MarkMessageRead { message_id });
                    }
                }
                actions.extend([ViewAction::FetchThreads, ViewAction::Render]);
                actions
            },
            ServerEvent::MessageSent { message, client_ref } => {
                let mut actions = Vec::new();
                if self.is_open(&message.thread_id) {
                    match client_ref {
                        Some(client_ref) => {
                            let id = MessageId::provisional(client_ref);
                            self.messages.retain(|m| m.id != id);
                            actions.push(ViewAction::CancelTimer(Timer::Reconcile { client_ref }));
                        },
                        None => {
                            let thread_id = &message.thread_id;
                            let mut removed = Vec::new();
                            self.messages.retain(|m| {
                                let drop = m.is_provisional() && &m.thread_id == thread_id;
                                if drop {
                                    removed.push(m.id.clone());
                                }
                                !drop
                            });
                            actions.extend(removed.iter().filter_map(reconcile_timer).map(ViewAction::CancelTimer));
                        },
                    }
                    insert_message(&mut self.messages, message);
                }
                actions.extend([ViewAction::FetchThreads, ViewAction::Render]);
                actions
            },
            ServerEvent::Typing { thread_id, sender_id, is_typing } => {
                let from_me = sender_id.as_ref() == Some(&self.me);
                if !self.is_open(&thread_id) || from_me {
                    return vec![];
                }
                self.counterpart_typing = is_typing;
                vec![ViewAction::Render]
            },
            ServerEvent::MessagesRead { thread_id, user_id } => {
                let by_me = user_id.as_ref() == Some(&self.me);
                if !self.is_open(&thread_id) || by_me {
                    return vec![];
                }
                for message in self.messages.iter_mut().filter(|m| m.sender_id == self.me) {
                    message.read = true;
                }
                vec![ViewAction::Render]
            },
            ServerEvent::Error { .. } => {
                let text = event.error_text().unwrap_or("server error").to_owned();
                tracing::warn!(error = %text, "server reported an error");
                self.status = Some(text);
                vec![ViewAction::Render]
            },
        }
    }

    /// `typing=false` for the open thread if `typing=true` is outstanding.
    fn stop_typing(&mut self) -> Option<ViewAction> {
        if !std::mem::take(&mut self.typing) {
            return None;
        }
        let open = self.open.as_ref()?;
        Some(ViewAction::Transmit(ClientIntent::Typing {
            thread_id: open.thread_id.clone(),
            receiver_id: open.counterpart.clone(),
            is_typing: false,
        }))
    }

    fn cancel_reconcile_timers(&self) -> Vec<ViewAction> {
        self.messages
            .iter()
            .map(|m| &m.id)
            .filter_map(reconcile_timer)
            .map(ViewAction::CancelTimer)
            .collect()
    }

    fn clear_open_unread(&mut self) {
        let Some(open) = &self.open else {
            return;
        };
        for summary in self.threads.iter_mut().filter(|s| s.thread_id == open.thread_id) {
            summary.unread_count = 0;
        }
    }
}

/// Reconcile timer guarding a provisional id.
fn reconcile_timer(id: &MessageId) -> Option<Timer> {
    let client_ref = id.as_str().strip_prefix(MessageId::PROVISIONAL_PREFIX)?.parse().ok()?;
    Some(Timer::Reconcile { client_ref })
}

/// Insert unless the id is already present, keeping timestamp order.
/// Returns false for a duplicate.
fn insert_message(messages: &mut Vec<ChatMessage>, message: ChatMessage) -> bool {
    if messages.iter().any(|m| m.id == message.id) {
        return false;
    }
    // After every entry with an equal or earlier timestamp.
    let at = messages.partition_point(|m| m.created_at <= message.created_at);
    messages.insert(at, message);
    true
}

fn sort_and_dedup(messages: &mut Vec<ChatMessage>) {
    let mut seen = HashSet::new();
    messages.retain(|m| seen.insert(m.id.clone()));
    messages.sort_by_key(|m| m.created_at);
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use kennel_proto::UserSummary;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_714_557_600 + secs, 0).unwrap()
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

    fn message(id: &str, from: UserId, secs: i64) -> ChatMessage {
        let to = if from == owner() { sitter() } else { owner() };
        ChatMessage {
            id: MessageId::new(id),
            thread_id: thread(),
            sender_id: from,
            receiver_id: to,
            body: format!("body {id}"),
            created_at: at(secs),
            read: false,
            read_at: None,
        }
    }

    fn open_view() -> ThreadView {
        let mut view = ThreadView::new(owner());
        view.handle(ViewEvent::OpenThread { thread_id: thread() });
        view
    }

    fn ids(view: &ThreadView) -> Vec<&str> {
        view.messages().iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn opening_loads_history_and_marks_read() {
        let mut view = ThreadView::new(owner());
        let actions = view.handle(ViewEvent::OpenThread { thread_id: thread() });

        assert!(actions.contains(&ViewAction::FetchHistory { thread_id: thread() }));
        assert!(actions.contains(&ViewAction::MarkThreadRead { thread_id: thread() }));
        assert_eq!(view.open_thread().unwrap().counterpart, sitter());
    }

    #[test]
    fn counterpart_comes_from_thread_list_first() {
        let mut view = ThreadView::new(owner());
        view.handle(ViewEvent::ThreadsLoaded {
            threads: vec![ThreadSummary {
                thread_id: ThreadId::new("legacy-42"),
                other_user: UserSummary { id: UserId::new("vet"), name: "Vet".into(), photo: None },
                last_message: message("last", UserId::new("vet"), 0),
                unread_count: 3,
            }],
        });

        view.handle(ViewEvent::OpenThread { thread_id: ThreadId::new("legacy-42") });
        assert_eq!(view.open_thread().unwrap().counterpart, UserId::new("vet"));
        assert_eq!(view.threads()[0].unread_count, 0);
    }

    #[test]
    fn unknown_thread_is_not_opened() {
        let mut view = ThreadView::new(owner());
        let actions = view.handle(ViewEvent::OpenThread { thread_id: ThreadId::new("x_y") });
        assert_eq!(actions, vec![ViewAction::Render]);
        assert!(view.open_thread().is_none());
        assert!(view.status().is_some());
    }

    #[test]
    fn history_is_sorted_on_load() {
        let mut view = open_view();
        view.handle(ViewEvent::HistoryLoaded {
            thread_id: thread(),
            messages: vec![message("b", sitter(), 2), message("a", owner(), 1)],
        });
        assert_eq!(ids(&view), vec!["a", "b"]);
    }

    #[test]
    fn history_for_another_thread_is_ignored() {
        let mut view = open_view();
        let actions = view.handle(ViewEvent::HistoryLoaded {
            thread_id: ThreadId::new("other"),
            messages: vec![message("a", owner(), 1)],
        });
        assert!(actions.is_empty());
        assert!(view.messages().is_empty());
    }

    #[test]
    fn duplicate_new_message_shows_once() {
        let mut view = open_view();
        let event = ServerEvent::NewMessage { message: message("m1", sitter(), 1) };
        view.handle(ViewEvent::Server(event.clone()));
        let actions = view.handle(ViewEvent::Server(event));

        assert_eq!(ids(&view), vec!["m1"]);
        assert!(actions.contains(&ViewAction::FetchThreads));
    }

    #[test]
    fn late_message_is_inserted_in_order() {
        let mut view = open_view();
        view.handle(ViewEvent::Server(ServerEvent::NewMessage { message: message("c", sitter(), 3) }));
        view.handle(ViewEvent::Server(ServerEvent::NewMessage { message: message("a", sitter(), 1) }));
        view.handle(ViewEvent::Server(ServerEvent::NewMessage { message: message("b", sitter(), 3) }));

        assert_eq!(ids(&view), vec!["a", "c", "b"]);
    }

    #[test]
    fn submit_adds_provisional_and_transmits() {
        let mut view = open_view();
        view.handle(ViewEvent::DraftEdited { draft: "  hola  ".into() });
        let actions = view.handle(ViewEvent::Submit { now: at(5) });

        assert_eq!(ids(&view), vec!["temp-1"]);
        assert_eq!(view.messages()[0].body, "hola");
        assert_eq!(view.draft(), "");
        assert_eq!(
            actions[0],
            ViewAction::Transmit(ClientIntent::SendMessage {
                thread_id: thread(),
                receiver_id: sitter(),
                body: "hola".into(),
                client_ref: Some(1),
            })
        );
        assert!(actions.contains(&ViewAction::ArmTimer {
            timer: Timer::Reconcile { client_ref: 1 },
            delay: RECONCILE_AFTER,
        }));
    }

    #[test]
    fn blank_or_threadless_submit_does_nothing() {
        let mut view = open_view();
        view.handle(ViewEvent::DraftEdited { draft: "   ".into() });
        assert!(view.handle(ViewEvent::Submit { now: at(0) }).is_empty());

        let mut closed = ThreadView::new(owner());
        closed.handle(ViewEvent::DraftEdited { draft: "hi".into() });
        assert!(closed.handle(ViewEvent::Submit { now: at(0) }).is_empty());
    }

    #[test]
    fn confirmation_replaces_matching_provisional() {
        let mut view = open_view();
        for body in ["one", "two"] {
            view.handle(ViewEvent::DraftEdited { draft: body.into() });
            view.handle(ViewEvent::Submit { now: at(1) });
        }

        let actions = view.handle(ViewEvent::Server(ServerEvent::MessageSent {
            message: message("srv-1", owner(), 2),
            client_ref: Some(1),
        }));

        assert_eq!(ids(&view), vec!["temp-2", "srv-1"]);
        assert!(actions.contains(&ViewAction::CancelTimer(Timer::Reconcile { client_ref: 1 })));
    }

    #[test]
    fn uncorrelated_confirmation_clears_thread_provisionals() {
        let mut view = open_view();
        for body in ["one", "two"] {
            view.handle(ViewEvent::DraftEdited { draft: body.into() });
            view.handle(ViewEvent::Submit { now: at(1) });
        }

        let actions = view.handle(ViewEvent::Server(ServerEvent::MessageSent {
            message: message("srv-1", owner(), 2),
            client_ref: None,
        }));

        assert_eq!(ids(&view), vec!["srv-1"]);
        assert!(actions.contains(&ViewAction::CancelTimer(Timer::Reconcile { client_ref: 1 })));
        assert!(actions.contains(&ViewAction::CancelTimer(Timer::Reconcile { client_ref: 2 })));
    }

    #[test]
    fn reconcile_refetches_only_if_still_provisional() {
        let mut view = open_view();
        view.handle(ViewEvent::DraftEdited { draft: "hola".into() });
        view.handle(ViewEvent::Submit { now: at(1) });

        let actions = view.handle(ViewEvent::TimerFired(Timer::Reconcile { client_ref: 1 }));
        assert_eq!(actions, vec![ViewAction::FetchHistory { thread_id: thread() }]);

        view.handle(ViewEvent::Server(ServerEvent::MessageSent {
            message: message("srv-1", owner(), 2),
            client_ref: Some(1),
        }));
        assert!(view.handle(ViewEvent::TimerFired(Timer::Reconcile { client_ref: 1 })).is_empty());
    }

    #[test]
    fn typing_starts_once_and_stops_on_idle() {
        let mut view = open_view();
        let first = view.handle(ViewEvent::DraftEdited { draft: "h".into() });
        let second = view.handle(ViewEvent::DraftEdited { draft: "ho".into() });

        let typing = |is_typing| {
            ViewAction::Transmit(ClientIntent::Typing {
                thread_id: thread(),
                receiver_id: sitter(),
                is_typing,
            })
        };
        assert_eq!(first[0], typing(true));
        assert!(!second.contains(&typing(true)));
        assert!(second.contains(&ViewAction::ArmTimer { timer: Timer::TypingIdle, delay: TYPING_IDLE_AFTER }));

        assert_eq!(view.handle(ViewEvent::TimerFired(Timer::TypingIdle)), vec![typing(false)]);
        assert!(view.handle(ViewEvent::TimerFired(Timer::TypingIdle)).is_empty());
    }

    #[test]
    fn submit_retracts_typing() {
        let mut view = open_view();
        view.handle(ViewEvent::DraftEdited { draft: "hola".into() });
        let actions = view.handle(ViewEvent::Submit { now: at(1) });

        assert!(actions.contains(&ViewAction::Transmit(ClientIntent::Typing {
            thread_id: thread(),
            receiver_id: sitter(),
            is_typing: false,
        })));
        assert!(actions.contains(&ViewAction::CancelTimer(Timer::TypingIdle)));
    }

    #[test]
    fn counterpart_typing_only_for_open_thread() {
        let mut view = open_view();
        view.handle(ViewEvent::Server(ServerEvent::Typing {
            thread_id: ThreadId::new("elsewhere"),
            sender_id: None,
            is_typing: true,
        }));
        assert!(!view.counterpart_typing());

        view.handle(ViewEvent::Server(ServerEvent::Typing {
            thread_id: thread(),
            sender_id: Some(sitter()),
            is_typing: true,
        }));
        assert!(view.counterpart_typing());

        view.handle(ViewEvent::OpenThread { thread_id: ThreadId::for_pair(&owner(), &UserId::new("vet")) });
        assert!(!view.counterpart_typing());
    }

    #[test]
    fn read_receipt_marks_own_messages() {
        let mut view = open_view();
        view.handle(ViewEvent::HistoryLoaded {
            thread_id: thread(),
            messages: vec![message("mine", owner(), 1), message("theirs", sitter(), 2)],
        });

        view.handle(ViewEvent::Server(ServerEvent::MessagesRead {
            thread_id: thread(),
            user_id: Some(sitter()),
        }));

        assert!(view.messages()[0].read);
        assert!(!view.messages()[1].read);
    }

    #[test]
    fn marked_read_refreshes_threads() {
        let mut view = open_view();
        let actions = view.handle(ViewEvent::ThreadMarkedRead { thread_id: thread(), updated: 2 });
        assert_eq!(actions, vec![ViewAction::FetchThreads]);
    }

    #[test]
    fn switching_threads_cancels_timers_and_retracts_typing() {
        let mut view = open_view();
        view.handle(ViewEvent::DraftEdited { draft: "draft".into() });
        view.handle(ViewEvent::Submit { now: at(1) });
        view.handle(ViewEvent::DraftEdited { draft: "more".into() });

        let actions = view.handle(ViewEvent::OpenThread {
            thread_id: ThreadId::for_pair(&owner(), &UserId::new("vet")),
        });

        assert!(actions.contains(&ViewAction::CancelTimer(Timer::Reconcile { client_ref: 1 })));
        assert!(actions.contains(&ViewAction::Transmit(ClientIntent::Typing {
            thread_id: thread(),
            receiver_id: sitter(),
            is_typing: false,
        })));
        assert!(view.messages().is_empty());
        assert_eq!(view.draft(), "");
    }

    #[test]
    fn close_tears_down_and_ignores_later_events() {
        let mut view = open_view();
        let actions = view.handle(ViewEvent::Close);
        assert_eq!(actions, vec![ViewAction::CancelAllTimers, ViewAction::Disconnect, ViewAction::Quit]);

        let late = view.handle(ViewEvent::HistoryLoaded {
            thread_id: thread(),
            messages: vec![message("a", owner(), 1)],
        });
        assert!(late.is_empty());
        assert!(view.messages().is_empty());
        assert!(view.is_closed());
    }

    #[test]
    fn gave_up_is_surfaced() {
        let mut view = open_view();
        view.handle(ViewEvent::LinkChanged(LinkState::GaveUp));
        assert_eq!(view.link(), LinkState::GaveUp);
        assert_eq!(view.status(), Some("realtime link lost"));
    }

    #[test]
    fn server_error_sets_status() {
        let mut view = open_view();
        view.handle(ViewEvent::Server(ServerEvent::Error { message: None, detail: Some("slow down".into()) }));
        assert_eq!(view.status(), Some("slow down"));
    }

    #[test]
    fn live_message_from_counterpart_is_marked_read_once() {
        let mut view = open_view();
        let event = ServerEvent::NewMessage { message: message("m1", sitter(), 1) };

        let first = view.handle(ViewEvent::Server(event.clone()));
        assert_eq!(first[0], ViewAction::MarkMessageRead { message_id: MessageId::new("m1") });

        let again = view.handle(ViewEvent::Server(event));
        assert!(!again.iter().any(|a| matches!(a, ViewAction::MarkMessageRead { .. })));

        let own = message("m2", owner(), 2);
        let mine = view.handle(ViewEvent::Server(ServerEvent::NewMessage { message: own }));
        assert!(!mine.iter().any(|a| matches!(a, ViewAction::MarkMessageRead { .. })));
    }

    #[test]
    fn marked_read_replaces_the_entry() {
        let mut view = open_view();
        view.handle(ViewEvent::Server(ServerEvent::NewMessage { message: message("m1", sitter(), 1) }));

        let mut stored = message("m1", sitter(), 1);
        stored.read = true;
        view.handle(ViewEvent::MessageMarkedRead { message: stored });
        assert!(view.messages()[0].read);
    }

    #[test]
    fn starting_a_new_thread_asks_for_creation() {
        let mut view = ThreadView::new(owner());
        let actions = view.handle(ViewEvent::StartThread { with: UserId::new("vet"), greeting: None });

        assert_eq!(
            actions,
            vec![ViewAction::StartThread {
                first: NewMessage {
                    thread_id: ThreadId::new("owner_vet"),
                    sender_id: owner(),
                    receiver_id: UserId::new("vet"),
                    body: DEFAULT_GREETING.into(),
                },
            }]
        );
        assert!(view.open_thread().is_none());
    }

    #[test]
    fn starting_a_known_thread_opens_it() {
        let mut view = ThreadView::new(owner());
        view.handle(ViewEvent::ThreadsLoaded {
            threads: vec![ThreadSummary {
                thread_id: thread(),
                other_user: UserSummary { id: sitter(), name: "Sam".into(), photo: None },
                last_message: message("last", sitter(), 0),
                unread_count: 1,
            }],
        });

        let actions =
            view.handle(ViewEvent::StartThread { with: sitter(), greeting: Some("ignored".into()) });
        assert!(actions.contains(&ViewAction::FetchHistory { thread_id: thread() }));
        assert_eq!(view.open_thread().unwrap().thread_id, thread());
    }

    #[test]
    fn cannot_start_a_thread_with_yourself() {
        let mut view = ThreadView::new(owner());
        let actions = view.handle(ViewEvent::StartThread { with: owner(), greeting: None });
        assert_eq!(actions, vec![ViewAction::Render]);
        assert!(view.status().is_some());
    }

    #[test]
    fn started_thread_opens_and_refreshes_the_list() {
        let mut view = ThreadView::new(owner());
        let actions = view.handle(ViewEvent::ThreadStarted { thread_id: ThreadId::new("owner_vet") });

        assert_eq!(view.open_thread().unwrap().counterpart, UserId::new("vet"));
        assert_eq!(actions.last(), Some(&ViewAction::FetchThreads));
    }

    #[test]
    fn connect_failure_wording_follows_transience() {
        let mut view = ThreadView::new(owner());
        view.handle(ViewEvent::ConnectFailed { reason: "refused".into(), transient: true });
        assert_eq!(view.status(), Some("offline: refused"));

        view.handle(ViewEvent::ConnectFailed { reason: "link task stopped".into(), transient: false });
        assert_eq!(view.status(), Some("realtime unavailable: link task stopped"));
    }
}
