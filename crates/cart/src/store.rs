//! The shared cart store.
//!
//! `CartStore` owns the [`CartState`] and is the only way to change it.
//! Construct one at startup and hand clones to every surface that shows or
//! edits the cart (navbar badge, cart page, checkout); clones share one
//! state, one storage backend, and one subscriber list.
//!
//! Every mutation that changes the cart is written to storage and then
//! published to subscribers. Operations on ids that are not in the cart, and
//! decrements at quantity 1, change nothing and publish nothing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use souq_core::{Product, ProductId};
use tracing::instrument;

use crate::config::CartConfig;
use crate::error::Result;
use crate::events::{CartEvent, Subscriber, Subscribers, SubscriptionId};
use crate::line_item::CartState;
use crate::storage::{FileStorage, Storage, decode_state, encode_state};
use crate::totals::{CartTotals, PricingConfig};

/// Shared handle to the cart.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    storage: Box<dyn Storage>,
    key: String,
    state: Mutex<CartState>,
    subscribers: Mutex<Subscribers>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("key", &self.inner.key)
            .field("state", &*self.lock_state())
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Open the cart persisted under `key`, or start empty.
    ///
    /// A blob that cannot be read or decoded is logged and ignored; the cart
    /// starts empty and the next mutation overwrites it.
    pub fn open(storage: impl Storage + 'static, key: impl Into<String>) -> Self {
        let key = key.into();
        let state = match load(&storage, &key) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding unreadable persisted cart");
                CartState::new()
            }
        };
        tracing::debug!(key = %key, items = state.distinct_count(), "Cart opened");

        Self {
            inner: Arc::new(CartStoreInner {
                storage: Box::new(storage),
                key,
                state: Mutex::new(state),
                subscribers: Mutex::new(Subscribers::default()),
            }),
        }
    }

    /// Open the file-backed cart described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the storage directory cannot be created.
    pub fn from_config(config: &CartConfig) -> Result<Self> {
        let storage = FileStorage::new(&config.storage_dir)?;
        Ok(Self::open(storage, config.storage_key.clone()))
    }

    /// Storage key this cart persists under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add one unit of `product`.
    ///
    /// If the product is already in the cart its quantity goes up by one and
    /// its snapshot is left alone; otherwise a new line is appended.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add_item(&self, product: Product) {
        self.mutate(|state| {
            let id = product.id.clone();
            let quantity = state.add(product);
            Some(CartEvent::ItemAdded { id, quantity })
        });
    }

    /// Add `count` units of `product` as one change.
    ///
    /// Equivalent to calling [`Self::add_item`] `count` times, but persists
    /// and publishes once. A count of zero does nothing.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add_items(&self, product: Product, count: u32) {
        if count == 0 {
            return;
        }
        self.mutate(|state| {
            let id = product.id.clone();
            let mut quantity = state.add(product);
            for _ in 1..count {
                quantity = state.increase(&id).unwrap_or(quantity);
            }
            Some(CartEvent::ItemAdded { id, quantity })
        });
    }

    /// Add a product given as raw JSON.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Product` if the record has no usable `id`; the cart
    /// is left untouched.
    pub fn add_json(&self, value: Value) -> Result<()> {
        let product = Product::from_json(value)?;
        self.add_item(product);
        Ok(())
    }

    /// Remove the line for `id`. Missing ids are ignored.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub fn remove_item(&self, id: &ProductId) {
        self.mutate(|state| {
            state
                .remove(id)
                .map(|item| CartEvent::ItemRemoved { id: item.id })
        });
    }

    /// Add one to the quantity of `id`. Missing ids are ignored.
    ///
    /// There is no stock check here; see [`crate::LineItem::is_at_stock_limit`].
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub fn increase_quantity(&self, id: &ProductId) {
        self.mutate(|state| {
            state
                .increase(id)
                .map(|quantity| CartEvent::QuantityIncreased {
                    id: id.clone(),
                    quantity,
                })
        });
    }

    /// Subtract one from the quantity of `id`, stopping at 1.
    ///
    /// A line at quantity 1 stays in the cart; use [`Self::remove_item`] to
    /// drop it.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub fn decrease_quantity(&self, id: &ProductId) {
        self.mutate(|state| {
            state
                .decrease(id)
                .map(|quantity| CartEvent::QuantityDecreased {
                    id: id.clone(),
                    quantity,
                })
        });
    }

    /// Empty the cart. Always persists and publishes, even when already empty.
    #[instrument(skip(self))]
    pub fn clear_cart(&self) {
        self.mutate(|state| {
            let removed = state.clear();
            Some(CartEvent::Cleared { removed })
        });
    }

    /// Replace the in-memory cart with what storage currently holds.
    ///
    /// Call this when another process or tab may have written the same key.
    /// A missing blob means an empty cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the blob cannot be read or decoded;
    /// the in-memory cart is then left as it was.
    #[instrument(skip(self))]
    pub fn rehydrate(&self) -> Result<()> {
        let fresh = load(self.inner.storage.as_ref(), &self.inner.key)?;
        let snapshot = {
            let mut state = self.lock_state();
            *state = fresh;
            state.clone()
        };
        tracing::debug!(items = snapshot.distinct_count(), "Cart rehydrated");
        self.publish(
            &CartEvent::Rehydrated {
                items: snapshot.distinct_count(),
            },
            &snapshot,
        );
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Copy of the current cart.
    #[must_use]
    pub fn snapshot(&self) -> CartState {
        self.lock_state().clone()
    }

    /// Run `f` against the current cart without copying it.
    pub fn with_state<R>(&self, f: impl FnOnce(&CartState) -> R) -> R {
        f(&*self.lock_state())
    }

    /// Total units in the cart (the navbar badge).
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.with_state(CartState::item_count)
    }

    /// Derived totals under `pricing`.
    #[must_use]
    pub fn totals(&self, pricing: &PricingConfig) -> CartTotals {
        self.with_state(|state| CartTotals::compute(state, pricing))
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Register a callback run after every change.
    ///
    /// Callbacks run on the mutating thread after the state lock is
    /// released, so they may read from or write to the store.
    pub fn subscribe<F>(&self, subscriber: F) -> SubscriptionId
    where
        F: Fn(&CartEvent, &CartState) + Send + Sync + 'static,
    {
        self.lock_subscribers().insert(Arc::new(subscriber))
    }

    /// Drop a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.lock_subscribers().remove(id)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock_subscribers().len()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lock_state(&self) -> MutexGuard<'_, CartState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Subscribers> {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `op`; if it reports a change, persist and publish.
    ///
    /// Persisting happens under the state lock so writes reach storage in
    /// mutation order.
    fn mutate<F>(&self, op: F)
    where
        F: FnOnce(&mut CartState) -> Option<CartEvent>,
    {
        let (event, snapshot, persist_error) = {
            let mut state = self.lock_state();
            let Some(event) = op(&mut *state) else {
                tracing::debug!("Cart unchanged");
                return;
            };
            let persist_error = self.persist(&state).err();
            (event, state.clone(), persist_error)
        };

        tracing::debug!(?event, items = snapshot.distinct_count(), "Cart updated");
        self.publish(&event, &snapshot);

        if let Some(error) = persist_error {
            self.publish(&CartEvent::PersistFailed { error }, &snapshot);
        }
    }

    fn persist(&self, state: &CartState) -> std::result::Result<(), String> {
        encode_state(state)
            .and_then(|blob| self.inner.storage.set_item(&self.inner.key, &blob))
            .map_err(|e| {
                tracing::error!(key = %self.inner.key, error = %e, "Failed to persist cart");
                e.to_string()
            })
    }

    fn publish(&self, event: &CartEvent, state: &CartState) {
        let subscribers: Vec<Arc<Subscriber>> = self.lock_subscribers().snapshot();
        for subscriber in subscribers {
            subscriber(event, state);
        }
    }
}

fn load(storage: &dyn Storage, key: &str) -> std::result::Result<CartState, crate::StorageError> {
    storage
        .get_item(key)?
        .map_or_else(|| Ok(CartState::new()), |blob| decode_state(&blob))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::{DEFAULT_STORAGE_KEY, MemoryStorage, StorageError};
    use crate::CartError;
    use serde_json::json;
    use souq_core::ProductError;

    /// Storage whose writes always fail, for exercising the failure channel.
    struct ReadOnlyStorage;

    impl Storage for ReadOnlyStorage {
        fn get_item(&self, _key: &str) -> std::result::Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn set_item(&self, _key: &str, _value: &str) -> std::result::Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("quota exceeded")))
        }

        fn remove_item(&self, _key: &str) -> std::result::Result<(), StorageError> {
            Ok(())
        }
    }

    fn recorder(store: &CartStore) -> Arc<Mutex<Vec<CartEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        store.subscribe(move |event, _| sink.lock().unwrap().push(event.clone()));
        events
    }

    fn hammer() -> Product {
        Product::new(1).with("name", "Hammer").with("price", 10)
    }

    #[test]
    fn test_clones_share_state() {
        let store = CartStore::open(MemoryStorage::new(), DEFAULT_STORAGE_KEY);
        let navbar = store.clone();
        store.add_item(hammer());
        assert_eq!(navbar.item_count(), 1);
    }

    #[test]
    fn test_mutations_publish_events() {
        let store = CartStore::open(MemoryStorage::new(), DEFAULT_STORAGE_KEY);
        let events = recorder(&store);
        let id = ProductId::Number(1);

        store.add_item(hammer());
        store.increase_quantity(&id);
        store.decrease_quantity(&id);
        store.remove_item(&id);
        store.clear_cart();

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                CartEvent::ItemAdded { id: id.clone(), quantity: 1 },
                CartEvent::QuantityIncreased { id: id.clone(), quantity: 2 },
                CartEvent::QuantityDecreased { id: id.clone(), quantity: 1 },
                CartEvent::ItemRemoved { id },
                CartEvent::Cleared { removed: 0 },
            ]
        );
    }

    #[test]
    fn test_noops_neither_publish_nor_persist() {
        let storage = MemoryStorage::new();
        let store = CartStore::open(storage.clone(), DEFAULT_STORAGE_KEY);
        let events = recorder(&store);
        let missing = ProductId::Number(42);

        store.remove_item(&missing);
        store.increase_quantity(&missing);
        store.decrease_quantity(&missing);
        store.add_items(hammer(), 0);

        assert!(events.lock().unwrap().is_empty());
        assert_eq!(storage.get_item(DEFAULT_STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn test_decrease_at_floor_publishes_nothing() {
        let store = CartStore::open(MemoryStorage::new(), DEFAULT_STORAGE_KEY);
        store.add_item(hammer());
        let events = recorder(&store);

        store.decrease_quantity(&ProductId::Number(1));
        assert!(events.lock().unwrap().is_empty());
        assert_eq!(store.item_count(), 1);
    }

    #[test]
    fn test_every_change_is_persisted() {
        let storage = MemoryStorage::new();
        let store = CartStore::open(storage.clone(), "guest-cart");
        store.add_item(hammer());
        store.increase_quantity(&ProductId::Number(1));

        let blob = storage.get_item("guest-cart").unwrap().unwrap();
        assert_eq!(decode_state(&blob).unwrap(), store.snapshot());
    }

    #[test]
    fn test_add_items_is_one_change() {
        let store = CartStore::open(MemoryStorage::new(), DEFAULT_STORAGE_KEY);
        let events = recorder(&store);

        store.add_items(hammer(), 3);
        store.add_items(hammer(), 2);

        assert_eq!(store.item_count(), 5);
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                CartEvent::ItemAdded { id: ProductId::Number(1), quantity: 3 },
                CartEvent::ItemAdded { id: ProductId::Number(1), quantity: 5 },
            ]
        );
    }

    #[test]
    fn test_add_json_rejects_missing_id() {
        let store = CartStore::open(MemoryStorage::new(), DEFAULT_STORAGE_KEY);

        let err = store.add_json(json!({"name": "Mystery", "price": 3})).unwrap_err();
        assert!(matches!(err, CartError::Product(ProductError::MissingId)));
        assert!(store.snapshot().is_empty());

        store.add_json(json!({"id": "saw", "price": 3})).unwrap();
        assert_eq!(store.item_count(), 1);
    }

    #[test]
    fn test_stray_id_field_survives_reopen() {
        let storage = MemoryStorage::new();
        let store = CartStore::open(storage.clone(), DEFAULT_STORAGE_KEY);
        store.add_item(Product::new(1).with("id", 2).with("name", "x"));
        let mut raw = Product::new(3);
        raw.attributes.insert("id".to_string(), json!(4));
        store.add_item(raw);

        let reopened = CartStore::open(storage, DEFAULT_STORAGE_KEY);
        assert_eq!(reopened.snapshot(), store.snapshot());
        assert_eq!(reopened.snapshot().distinct_count(), 2);
        assert_eq!(reopened.snapshot().items[0].id, ProductId::Number(1));
    }

    #[test]
    fn test_totals_of_huge_price_do_not_panic() {
        let store = CartStore::open(MemoryStorage::new(), DEFAULT_STORAGE_KEY);
        store
            .add_json(json!({"id": 1, "price": "50000000000000000000000000000"}))
            .unwrap();
        store.increase_quantity(&ProductId::Number(1));

        let totals = store.totals(&PricingConfig::default());
        assert_eq!(totals.subtotal.amount, rust_decimal::Decimal::MAX);
        assert_eq!(totals.grand_total.amount, rust_decimal::Decimal::MAX);
    }

    #[test]
    fn test_persist_failure_keeps_change_and_reports() {
        let store = CartStore::open(ReadOnlyStorage, DEFAULT_STORAGE_KEY);
        let events = recorder(&store);

        store.add_item(hammer());

        assert_eq!(store.item_count(), 1);
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[1], CartEvent::PersistFailed { error } if error.contains("quota")));
    }

    #[test]
    fn test_open_discards_corrupt_blob() {
        let storage = MemoryStorage::new();
        storage.set_item(DEFAULT_STORAGE_KEY, "{\"state\":").unwrap();

        let store = CartStore::open(storage, DEFAULT_STORAGE_KEY);
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_rehydrate_picks_up_other_writer() {
        let storage = MemoryStorage::new();
        let tab_a = CartStore::open(storage.clone(), DEFAULT_STORAGE_KEY);
        let tab_b = CartStore::open(storage, DEFAULT_STORAGE_KEY);
        let events = recorder(&tab_b);

        tab_a.add_item(hammer());
        assert_eq!(tab_b.item_count(), 0);

        tab_b.rehydrate().unwrap();
        assert_eq!(tab_b.snapshot(), tab_a.snapshot());
        assert_eq!(
            *events.lock().unwrap(),
            vec![CartEvent::Rehydrated { items: 1 }]
        );
    }

    #[test]
    fn test_rehydrate_error_keeps_state() {
        let storage = MemoryStorage::new();
        let store = CartStore::open(storage.clone(), DEFAULT_STORAGE_KEY);
        store.add_item(hammer());
        storage
            .set_item(DEFAULT_STORAGE_KEY, r#"{"state":{"items":[]},"version":9}"#)
            .unwrap();

        assert!(matches!(
            store.rehydrate(),
            Err(CartError::Storage(StorageError::UnsupportedVersion { .. }))
        ));
        assert_eq!(store.item_count(), 1);
    }

    #[test]
    fn test_subscriber_may_read_store() {
        let store = CartStore::open(MemoryStorage::new(), DEFAULT_STORAGE_KEY);
        let badge = Arc::new(Mutex::new(0u64));
        let (reader, sink) = (store.clone(), Arc::clone(&badge));
        store.subscribe(move |_, _| *sink.lock().unwrap() = reader.item_count());

        store.add_item(hammer());
        store.add_item(hammer());
        assert_eq!(*badge.lock().unwrap(), 2);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let store = CartStore::open(MemoryStorage::new(), DEFAULT_STORAGE_KEY);
        let events = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&events);
        let id = store.subscribe(move |_, _| *sink.lock().unwrap() += 1);

        store.add_item(hammer());
        assert!(store.unsubscribe(id));
        assert_eq!(store.subscriber_count(), 0);
        store.add_item(hammer());

        assert_eq!(*events.lock().unwrap(), 1);
    }

    #[test]
    fn test_totals_use_pricing() {
        let store = CartStore::open(MemoryStorage::new(), DEFAULT_STORAGE_KEY);
        store.add_item(hammer());
        let totals = store.totals(&PricingConfig::default());
        assert_eq!(totals.subtotal.display(), "KD 10.000");
    }
}
