//! Souq Cart - Persisted client-side shopping cart.
//!
//! The cart is a single shared [`CartStore`] created once at startup and
//! cloned into every surface that reads or edits it. It keeps one
//! [`LineItem`] per product, aggregates repeat adds into a quantity, writes
//! itself to durable [`Storage`] after each change, and tells subscribers
//! about every change.
//!
//! # Example
//!
//! ```
//! use souq_cart::{CartStore, MemoryStorage, PricingConfig, DEFAULT_STORAGE_KEY};
//! use souq_core::{Product, ProductId};
//!
//! let cart = CartStore::open(MemoryStorage::new(), DEFAULT_STORAGE_KEY);
//! let hammer = Product::new(1).with("name", "Hammer").with("price", 10);
//!
//! cart.add_item(hammer.clone());
//! cart.add_item(hammer);
//! cart.decrease_quantity(&ProductId::Number(1));
//! cart.decrease_quantity(&ProductId::Number(1)); // floors at 1
//!
//! assert_eq!(cart.item_count(), 1);
//! assert_eq!(cart.totals(&PricingConfig::default()).subtotal.display(), "KD 10.000");
//! ```
//!
//! # Modules
//!
//! - [`line_item`] - `LineItem` and `CartState` mutation rules
//! - [`store`] - The shared, persisted, observable `CartStore`
//! - [`storage`] - Key-value storage backends and the persisted envelope
//! - [`events`] - Change notifications
//! - [`totals`] - Subtotal, shipping, tax, and grand total
//! - [`config`] - Environment configuration

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod events;
pub mod line_item;
pub mod storage;
pub mod store;
pub mod totals;

pub use config::{CartConfig, ConfigError};
pub use error::CartError;
pub use events::{CartEvent, SubscriptionId};
pub use line_item::{CartState, LineItem};
pub use storage::{
    DEFAULT_STORAGE_KEY, FileStorage, MemoryStorage, STORAGE_VERSION, Storage, StorageError,
    decode_state, encode_state,
};
pub use store::CartStore;
pub use totals::{CartTotals, PricingConfig};
