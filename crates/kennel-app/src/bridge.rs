//! Client-to-view translation layer.
//!
//! The [`Bridge`] wraps [`kennel_client::ChatClient`] and adapts it to the
//! view lifecycle.
//!
//! # Responsibilities
//!
//! - Subscribes to every realtime event kind and queues the events for the
//!   runtime, preserving arrival order.
//! - Executes link-level [`crate::ViewAction`]s (transmit, disconnect) and
//!   reports failures back as [`crate::ViewEvent`]s.
//! - Surfaces link state changes, including permanent loss.

use std::sync::Arc;

use kennel_client::{ChatClient, ListenerId};
use kennel_core::LinkState;
use kennel_proto::{EventKind, ServerEvent};
use tokio::sync::{mpsc, watch};

use crate::{ViewAction, ViewEvent};

/// Bridge between the view and the realtime client.
pub struct Bridge {
    client: ChatClient,
    events: mpsc::UnboundedReceiver<ServerEvent>,
    /// False once every listener (and its sender) was dropped.
    events_open: bool,
    link: watch::Receiver<LinkState>,
    listeners: Vec<(EventKind, ListenerId)>,
}

impl Bridge {
    /// Subscribe to every event kind of `client`.
    pub fn new(client: ChatClient) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let listeners = EventKind::ALL
            .iter()
            .map(|&kind| {
                let tx = tx.clone();
                let id = client.on(
                    kind,
                    Arc::new(move |event: &ServerEvent| {
                        let _ = tx.send(event.clone());
                    }),
                );
                (kind, id)
            })
            .collect();
        let link = client.watch_link();
        Self { client, events, events_open: true, link, listeners }
    }

    /// Open the realtime link.
    ///
    /// A failure leaves the view usable over REST; it is reported as
    /// [`ViewEvent::ConnectFailed`].
    pub async fn connect(&self) -> Vec<ViewEvent> {
        match self.client.connect().await {
            Ok(()) => vec![],
            Err(e) => {
                tracing::warn!(error = %e, "realtime connect failed");
                vec![ViewEvent::ConnectFailed { reason: e.to_string(), transient: e.is_transient() }]
            },
        }
    }

    /// Execute a link-level action. Other actions are ignored.
    pub fn process_view_action(&mut self, action: ViewAction) -> Vec<ViewEvent> {
        match action {
            ViewAction::Transmit(intent) => match self.client.send(intent) {
                Ok(()) => vec![],
                Err(e) => {
                    tracing::debug!(error = %e, "intent not transmitted");
                    vec![ViewEvent::TransmitFailed { reason: e.to_string() }]
                },
            },
            ViewAction::Disconnect => {
                for (kind, id) in self.listeners.drain(..) {
                    self.client.off(kind, id);
                }
                self.client.disconnect();
                vec![]
            },
            ViewAction::Render
            | ViewAction::Quit
            | ViewAction::FetchThreads
            | ViewAction::FetchHistory { .. }
            | ViewAction::MarkThreadRead { .. }
            | ViewAction::MarkMessageRead { .. }
            | ViewAction::StartThread { .. }
            | ViewAction::ArmTimer { .. }
            | ViewAction::CancelTimer(_)
            | ViewAction::CancelAllTimers => vec![],
        }
    }

    /// Next realtime event or link change.
    ///
    /// Cancel safe. Returns `None` once the client is gone and every queued
    /// event was delivered.
    pub async fn next_event(&mut self) -> Option<ViewEvent> {
        loop {
            tokio::select! {
                biased;
                event = self.events.recv(), if self.events_open => match event {
                    Some(event) => return Some(ViewEvent::Server(event)),
                    None => self.events_open = false,
                },
                changed = self.link.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                    let state = *self.link.borrow_and_update();
                    return Some(ViewEvent::LinkChanged(state));
                },
            }
        }
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("client", &self.client)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}
