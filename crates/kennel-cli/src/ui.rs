//! Plain-text layout of the thread view.
//!
//! A [`Screen`] splits what the user sees into the transcript, which only
//! grows in the common case, and a few transient lines that are reprinted
//! when they change.

use kennel_core::LinkState;
use kennel_proto::{ChatMessage, ThreadId, UserId};

use crate::ThreadView;

/// Lines derived from one view snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Screen {
    /// Header followed by one line per message, or the thread list when no
    /// conversation is open.
    pub transcript: Vec<String>,
    /// Realtime link indicator.
    pub link: String,
    /// Counterpart typing indicator.
    pub typing: Option<String>,
    /// Last status or error notice.
    pub status: Option<String>,
}

impl Screen {
    /// Lay out `view`.
    pub fn of(view: &ThreadView) -> Self {
        let transcript = match view.open_thread() {
            Some(open) => {
                let name = display_name(view, &open.thread_id, &open.counterpart);
                let mut lines = Vec::with_capacity(view.messages().len() + 1);
                lines.push(format!("# {} with {name}", open.thread_id));
                lines.extend(view.messages().iter().map(|m| message_line(view.me(), &name, m)));
                lines
            },
            None => thread_list(view),
        };

        let typing = view.open_thread().filter(|_| view.counterpart_typing()).map(|open| {
            format!("{} is typing...", display_name(view, &open.thread_id, &open.counterpart))
        });

        Self {
            transcript,
            link: link_label(view.link()),
            typing,
            status: view.status().map(str::to_owned),
        }
    }
}

fn thread_list(view: &ThreadView) -> Vec<String> {
    let mut lines = vec!["# conversations".to_owned()];
    if view.threads().is_empty() {
        lines.push("(none)".to_owned());
    }
    for thread in view.threads() {
        let name = non_empty(&thread.other_user.name).unwrap_or(thread.other_user.id.as_str());
        let mut line = format!("{}  {name}: {}", thread.thread_id, thread.last_message.body);
        if thread.unread_count > 0 {
            line.push_str(&format!("  [{} unread]", thread.unread_count));
        }
        lines.push(line);
    }
    lines
}

fn message_line(me: &UserId, counterpart: &str, message: &ChatMessage) -> String {
    let who = if &message.sender_id == me { "you" } else { counterpart };
    let mut line = format!("[{}] {who}: {}", message.created_at.format("%H:%M"), message.body);
    if message.is_provisional() {
        line.push_str(" (sending)");
    } else if &message.sender_id == me && message.read {
        line.push_str(" (read)");
    }
    line
}

/// Counterpart name from the thread list, falling back to the user id.
fn display_name(view: &ThreadView, thread_id: &ThreadId, counterpart: &UserId) -> String {
    view.threads()
        .iter()
        .find(|t| &t.thread_id == thread_id)
        .and_then(|t| non_empty(&t.other_user.name))
        .unwrap_or(counterpart.as_str())
        .to_owned()
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

fn link_label(state: LinkState) -> String {
    match state {
        LinkState::Idle => "offline".to_owned(),
        LinkState::Connecting { attempt: 0 } => "connecting".to_owned(),
        LinkState::Connecting { attempt } | LinkState::Reconnecting { attempt } => {
            format!("reconnecting (attempt {attempt})")
        },
        LinkState::Open => "online".to_owned(),
        LinkState::GaveUp => "offline (gave up reconnecting)".to_owned(),
    }
}
