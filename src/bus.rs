// Notification bus: synchronous pub/sub keyed by NotificationKind.
// Owned by the worker task; handlers run inline on that task and must not block.

use crate::models::{Notification, NotificationKind};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub type Handler = Box<dyn FnMut(&Notification) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Hands out subscription ids. Cloned into worker handles so ids can be
/// allocated off the worker task and registered later.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionIds(Arc<AtomicU64>);

impl SubscriptionIds {
    pub fn next(&self) -> SubscriptionId {
        SubscriptionId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Default)]
pub struct NotificationBus {
    ids: SubscriptionIds,
    subscribers: HashMap<NotificationKind, Vec<(SubscriptionId, Handler)>>,
    published_total: u64,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> SubscriptionIds {
        self.ids.clone()
    }

    pub fn subscribe<F>(&mut self, kind: NotificationKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&Notification) + Send + 'static,
    {
        let id = self.ids.next();
        self.insert(id, kind, Box::new(handler));
        id
    }

    /// Register a handler under an id allocated earlier from `ids()`.
    pub fn insert(&mut self, id: SubscriptionId, kind: NotificationKind, handler: Handler) {
        self.subscribers.entry(kind).or_default().push((id, handler));
        tracing::debug!(kind = %kind, subscription = id.0, "subscribed");
    }

    /// Returns false when the id was not registered (already removed, or never added).
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for handlers in self.subscribers.values_mut() {
            if let Some(pos) = handlers.iter().position(|(sid, _)| *sid == id) {
                drop(handlers.remove(pos));
                tracing::debug!(subscription = id.0, "unsubscribed");
                return true;
            }
        }
        false
    }

    /// Invokes every handler registered for the notification's kind, in
    /// subscription order. Returns the number of handlers invoked.
    pub fn publish(&mut self, notification: &Notification) -> usize {
        let kind = notification.kind();
        self.published_total += 1;
        let Some(handlers) = self.subscribers.get_mut(&kind) else {
            return 0;
        };
        for (_, handler) in handlers.iter_mut() {
            handler(notification);
        }
        handlers.len()
    }

    pub fn subscriber_count(&self, kind: NotificationKind) -> usize {
        self.subscribers.get(&kind).map_or(0, Vec::len)
    }

    pub fn total_subscribers(&self) -> usize {
        self.subscribers.values().map(Vec::len).sum()
    }

    pub fn published_total(&self) -> u64 {
        self.published_total
    }
}
