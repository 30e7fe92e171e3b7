use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use super::connection::{ConnectionHandle, SubscriptionId};

/// One subscriber waiting for the next publish.
#[derive(Debug)]
pub struct PendingSubscription {
    pub handle: ConnectionHandle,

    /// JSONP function name supplied by the client. `None` means no wrapping.
    pub callback: Option<String>,

    pub subscribed_at: DateTime<Utc>,
}

impl PendingSubscription {
    pub fn id(&self) -> SubscriptionId {
        self.handle.id()
    }
}

/// Pending subscriber connections, oldest first.
///
/// An entry is present exactly while its connection is held open and
/// unanswered. Entries leave only through `drain_all` or `remove`.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    pending: VecDeque<PendingSubscription>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a subscription to the tail. Handle ids are unique by
    /// construction, so no duplicate check is made.
    pub fn register(&mut self, handle: ConnectionHandle, callback: Option<String>) {
        self.pending.push_back(PendingSubscription {
            handle,
            callback,
            subscribed_at: Utc::now(),
        });
    }

    /// Take every pending subscription in insertion order, leaving the
    /// registry empty.
    pub fn drain_all(&mut self) -> Vec<PendingSubscription> {
        self.pending.drain(..).collect()
    }

    /// Remove the entry for `id`. Absent ids are ignored.
    pub fn remove(&mut self, id: SubscriptionId) -> Option<PendingSubscription> {
        let pos = self.pending.iter().position(|p| p.id() == id)?;
        self.pending.remove(pos)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: u64) -> ConnectionHandle {
        ConnectionHandle::new(SubscriptionId(id)).0
    }

    fn ids(subs: &[PendingSubscription]) -> Vec<u64> {
        subs.iter().map(|s| s.id().0).collect()
    }

    #[test]
    fn drain_returns_insertion_order_and_empties() {
        let mut reg = ConnectionRegistry::new();
        reg.register(handle(1), None);
        reg.register(handle(2), Some("cb".to_string()));
        reg.register(handle(3), None);

        let drained = reg.drain_all();
        assert_eq!(ids(&drained), vec![1, 2, 3]);
        assert_eq!(drained[1].callback.as_deref(), Some("cb"));
        assert!(reg.is_empty());
        assert!(reg.drain_all().is_empty());
    }

    #[test]
    fn remove_keeps_the_order_of_the_rest() {
        let mut reg = ConnectionRegistry::new();
        for id in 1..=4 {
            reg.register(handle(id), None);
        }

        let removed = reg.remove(SubscriptionId(2)).unwrap();
        assert_eq!(removed.id(), SubscriptionId(2));
        assert_eq!(reg.len(), 3);
        assert_eq!(ids(&reg.drain_all()), vec![1, 3, 4]);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut reg = ConnectionRegistry::new();
        reg.register(handle(1), None);
        reg.register(handle(2), None);

        assert!(reg.remove(SubscriptionId(1)).is_some());
        assert!(reg.remove(SubscriptionId(1)).is_none());
        assert!(reg.remove(SubscriptionId(99)).is_none());
        assert_eq!(ids(&reg.drain_all()), vec![2]);
    }

    #[test]
    fn removed_after_drain_is_a_no_op() {
        let mut reg = ConnectionRegistry::new();
        reg.register(handle(5), None);
        let _ = reg.drain_all();

        assert!(reg.remove(SubscriptionId(5)).is_none());
        assert!(reg.is_empty());
    }
}
