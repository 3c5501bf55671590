use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use crate::model::{MessageKind, StreamMessage};

/// Dispatch channel a handler listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Every application frame, regardless of kind
    Message,
    Output,
    StatusUpdate,
    /// Server `error` frames and transport failures
    Error,
    Connected,
    Disconnected,
}

impl Topic {
    /// Kind-specific topic for a decoded frame. Pings have none: they are
    /// answered by the keepalive responder and never routed.
    pub fn for_kind(kind: MessageKind) -> Option<Topic> {
        match kind {
            MessageKind::Output => Some(Topic::Output),
            MessageKind::StatusUpdate => Some(Topic::StatusUpdate),
            MessageKind::Error => Some(Topic::Error),
            MessageKind::Ping => None,
        }
    }
}

/// Payload delivered to handlers.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Message(StreamMessage),
    Connected,
    Disconnected,
    TransportError(String),
}

impl StreamEvent {
    pub fn as_message(&self) -> Option<&StreamMessage> {
        match self {
            StreamEvent::Message(msg) => Some(msg),
            _ => None,
        }
    }
}

pub type Handler = Arc<dyn Fn(&StreamEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: HashMap<Topic, Vec<(HandlerId, Handler)>>,
}

impl Registry {
    fn remove(&mut self, topic: Topic, id: HandlerId) -> bool {
        let Some(list) = self.handlers.get_mut(&topic) else {
            return false;
        };
        let before = list.len();
        list.retain(|(handler_id, _)| *handler_id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.handlers.remove(&topic);
        }
        removed
    }
}

/// Fan-out of decoded frames and connection lifecycle events to handlers.
///
/// Dispatch iterates over a snapshot of the handler list taken when the
/// event is emitted, so handlers may subscribe or unsubscribe (themselves
/// included) while being invoked.
#[derive(Clone, Default)]
pub struct MessageRouter {
    registry: Arc<Mutex<Registry>>,
}

impl fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.lock();
        let counts: HashMap<_, _> = registry
            .handlers
            .iter()
            .map(|(topic, list)| (*topic, list.len()))
            .collect();
        f.debug_struct("MessageRouter").field("handlers", &counts).finish()
    }
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` on `topic`. The handler stays registered until the
    /// returned [`Subscription`] is dropped or [`MessageRouter::off`] is called.
    pub fn on<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock();
        registry.next_id += 1;
        let id = HandlerId(registry.next_id);
        registry
            .handlers
            .entry(topic)
            .or_default()
            .push((id, Arc::new(handler)));

        Subscription {
            registry: Arc::downgrade(&self.registry),
            topic,
            id,
        }
    }

    /// Remove a handler. Idempotent; returns whether anything was removed.
    pub fn off(&self, topic: Topic, id: HandlerId) -> bool {
        self.registry.lock().remove(topic, id)
    }

    /// Drop every registered handler.
    pub fn clear(&self) {
        self.registry.lock().handlers.clear();
    }

    pub fn handler_count(&self, topic: Topic) -> usize {
        self.registry
            .lock()
            .handlers
            .get(&topic)
            .map_or(0, Vec::len)
    }

    /// Invoke every handler registered on `topic` exactly once.
    pub fn emit(&self, topic: Topic, event: &StreamEvent) {
        let snapshot: Vec<Handler> = {
            let registry = self.registry.lock();
            match registry.handlers.get(&topic) {
                Some(list) => list.iter().map(|(_, h)| Arc::clone(h)).collect(),
                None => return,
            }
        };

        for handler in snapshot {
            handler(event);
        }
    }

    /// Route one application frame: first on [`Topic::Message`], then on the
    /// frame's own kind.
    pub fn dispatch(&self, message: StreamMessage) {
        let Some(kind_topic) = Topic::for_kind(message.kind()) else {
            trace!(kind = message.kind().as_str(), "frame kind is not routable");
            return;
        };

        let event = StreamEvent::Message(message);
        self.emit(Topic::Message, &event);
        self.emit(kind_topic, &event);
    }
}

/// Registration handle returned by [`MessageRouter::on`].
/// Dropping it unsubscribes the handler.
#[must_use = "dropping a Subscription unsubscribes its handler"]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    topic: Topic,
    id: HandlerId,
}

impl Subscription {
    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Explicit form of dropping the handle.
    pub fn unsubscribe(self) {}
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("id", &self.id)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().remove(self.topic, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&StreamEvent) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move |_: &StreamEvent| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn dispatch_hits_wildcard_then_kind() {
        let router = MessageRouter::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = Arc::clone(&order);
        let _any = router.on(Topic::Message, move |_| o.lock().push("message"));
        let o = Arc::clone(&order);
        let _out = router.on(Topic::Output, move |_| o.lock().push("output"));

        router.dispatch(StreamMessage::output("t1", "x"));

        assert_eq!(*order.lock(), vec!["message", "output"]);
    }

    #[test]
    fn dispatch_skips_other_kinds() {
        let router = MessageRouter::new();
        let (count, handler) = counter();
        let _sub = router.on(Topic::StatusUpdate, handler);

        router.dispatch(StreamMessage::output("t1", "x"));

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn ping_is_never_routed() {
        let router = MessageRouter::new();
        let (count, handler) = counter();
        let _sub = router.on(Topic::Message, handler);

        router.dispatch(StreamMessage::ping());

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let router = MessageRouter::new();
        let (count, handler) = counter();
        let sub = router.on(Topic::Output, handler);
        assert_eq!(router.handler_count(Topic::Output), 1);

        drop(sub);
        router.dispatch(StreamMessage::output("t1", "x"));

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(router.handler_count(Topic::Output), 0);
    }

    #[test]
    fn off_is_idempotent() {
        let router = MessageRouter::new();
        let (_count, handler) = counter();
        let sub = router.on(Topic::Output, handler);
        let id = sub.id();

        assert!(router.off(Topic::Output, id));
        assert!(!router.off(Topic::Output, id));
        // Dropping the handle after `off` is a no-op too
        drop(sub);
    }

    #[test]
    fn subscription_outliving_router_is_harmless() {
        let router = MessageRouter::new();
        let (_count, handler) = counter();
        let sub = router.on(Topic::Connected, handler);
        drop(router);
        drop(sub);
    }

    #[test]
    fn clear_removes_all_topics() {
        let router = MessageRouter::new();
        let (count, handler) = counter();
        let _a = router.on(Topic::Connected, handler);
        router.clear();

        router.emit(Topic::Connected, &StreamEvent::Connected);

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
