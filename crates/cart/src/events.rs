//! Change notifications published by [`crate::CartStore`].

use std::sync::Arc;

use souq_core::ProductId;

use crate::line_item::CartState;

/// What changed in the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// A product was added (new line or aggregated into an existing one).
    ItemAdded { id: ProductId, quantity: u32 },
    QuantityIncreased { id: ProductId, quantity: u32 },
    QuantityDecreased { id: ProductId, quantity: u32 },
    ItemRemoved { id: ProductId },
    /// The cart was emptied; `removed` lines were dropped.
    Cleared { removed: usize },
    /// State was reloaded from durable storage.
    Rehydrated { items: usize },
    /// The in-memory change stands but could not be persisted.
    PersistFailed { error: String },
}

/// Handle returned by [`crate::CartStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Subscriber callback: the event, and the cart state right after it.
pub type Subscriber = dyn Fn(&CartEvent, &CartState) + Send + Sync;

#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: u64,
    entries: Vec<(SubscriptionId, Arc<Subscriber>)>,
}

impl Subscribers {
    pub(crate) fn insert(&mut self, subscriber: Arc<Subscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, subscriber));
        id
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Copy of the current callbacks, so they can run without holding the lock.
    pub(crate) fn snapshot(&self) -> Vec<Arc<Subscriber>> {
        self.entries.iter().map(|(_, s)| Arc::clone(s)).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_removable() {
        let mut subs = Subscribers::default();
        let noop: Arc<Subscriber> = Arc::new(|_: &CartEvent, _: &CartState| {});
        let a = subs.insert(Arc::clone(&noop));
        let b = subs.insert(noop);

        assert_ne!(a, b);
        assert_eq!(subs.len(), 2);
        assert!(subs.remove(a));
        assert!(!subs.remove(a));
        assert_eq!(subs.snapshot().len(), 1);
    }
}
