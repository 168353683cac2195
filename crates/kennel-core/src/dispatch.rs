//! Listener registry for inbound events.
//!
//! Listeners are keyed by [`EventKind`]. Each kind holds an ordered list;
//! dispatch walks it in registration order. Registering the same `Arc` twice
//! for a kind is a no-op that returns the existing id.

use std::{collections::HashMap, fmt, sync::Arc};

use kennel_proto::{EventKind, ServerEvent};

/// Callback invoked with each matching event.
pub type Listener = Arc<dyn Fn(&ServerEvent) + Send + Sync>;

/// Handle returned by [`ListenerRegistry::on`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Per-kind callback registry.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: u64,
    by_kind: HashMap<EventKind, Vec<(ListenerId, Listener)>>,
}

impl ListenerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for events of `kind`.
    ///
    /// Returns the id of the existing registration if this exact listener is
    /// already registered for `kind`.
    pub fn on(&mut self, kind: EventKind, listener: Listener) -> ListenerId {
        let entries = self.by_kind.entry(kind).or_default();
        if let Some((id, _)) = entries.iter().find(|(_, existing)| Arc::ptr_eq(existing, &listener))
        {
            return *id;
        }

        let id = ListenerId(self.next_id);
        self.next_id += 1;
        entries.push((id, listener));
        id
    }

    /// Unregister a listener. Returns false if `id` was not registered for
    /// `kind`.
    pub fn off(&mut self, kind: EventKind, id: ListenerId) -> bool {
        let Some(entries) = self.by_kind.get_mut(&kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.by_kind.remove(&kind);
        }
        removed
    }

    /// Drop every registration.
    pub fn clear(&mut self) {
        self.by_kind.clear();
    }

    /// Number of listeners registered for `kind`.
    pub fn len(&self, kind: EventKind) -> usize {
        self.by_kind.get(&kind).map_or(0, Vec::len)
    }

    /// True if no listener is registered for any kind.
    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }

    /// Listeners for `kind` in registration order.
    ///
    /// Returns clones so the caller can release any lock around the registry
    /// before invoking them; listeners may then call `on`/`off` themselves.
    pub fn snapshot(&self, kind: EventKind) -> Vec<Listener> {
        self.by_kind
            .get(&kind)
            .map(|entries| entries.iter().map(|(_, listener)| Arc::clone(listener)).collect())
            .unwrap_or_default()
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: Vec<_> = self.by_kind.iter().map(|(kind, v)| (*kind, v.len())).collect();
        counts.sort();
        f.debug_struct("ListenerRegistry").field("listeners", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use kennel_proto::ThreadId;

    use super::*;

    fn typing_event(is_typing: bool) -> ServerEvent {
        ServerEvent::Typing { thread_id: ThreadId::new("a_b"), sender_id: None, is_typing }
    }

    /// Invoke the listeners for the event's kind the way the link task does.
    fn fire(registry: &ListenerRegistry, event: &ServerEvent) -> usize {
        let listeners = registry.snapshot(event.kind());
        for listener in &listeners {
            listener(event);
        }
        listeners.len()
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> Listener {
        let log = Arc::clone(log);
        Arc::new(move |event: &ServerEvent| {
            log.lock().unwrap().push(format!("{name}:{}", event.kind()));
        })
    }

    #[test]
    fn dispatch_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        registry.on(EventKind::Typing, recorder(&log, "first"));
        registry.on(EventKind::Typing, recorder(&log, "second"));
        registry.on(EventKind::NewMessage, recorder(&log, "other"));

        assert_eq!(fire(&registry, &typing_event(true)), 2);
        assert_eq!(*log.lock().unwrap(), vec!["first:typing", "second:typing"]);
    }

    #[test]
    fn same_listener_registers_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let listener = recorder(&log, "dup");
        let mut registry = ListenerRegistry::new();

        let a = registry.on(EventKind::Typing, Arc::clone(&listener));
        let b = registry.on(EventKind::Typing, Arc::clone(&listener));
        assert_eq!(a, b);
        assert_eq!(registry.len(EventKind::Typing), 1);

        // Same callback under another kind is a separate registration.
        let c = registry.on(EventKind::MessagesRead, listener);
        assert_ne!(a, c);
    }

    #[test]
    fn off_removes_only_that_listener() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        let first = registry.on(EventKind::Typing, recorder(&log, "first"));
        registry.on(EventKind::Typing, recorder(&log, "second"));

        assert!(registry.off(EventKind::Typing, first));
        assert!(!registry.off(EventKind::Typing, first));
        fire(&registry, &typing_event(false));

        assert_eq!(*log.lock().unwrap(), vec!["second:typing"]);
    }

    #[test]
    fn off_with_wrong_kind_is_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        let id = registry.on(EventKind::Typing, recorder(&log, "only"));

        assert!(!registry.off(EventKind::Error, id));
        assert_eq!(registry.len(EventKind::Typing), 1);
    }

    #[test]
    fn clear_drops_everything() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        registry.on(EventKind::Typing, recorder(&log, "a"));
        registry.on(EventKind::Error, recorder(&log, "b"));

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(fire(&registry, &typing_event(true)), 0);
        assert!(log.lock().unwrap().is_empty());
    }
}
