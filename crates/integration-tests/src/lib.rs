//! Integration tests for the Souq cart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p souq-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_properties` - Cart invariants (aggregation, floor, removal, clear, persistence, subtotal)
//! - `cart_scenarios` - End-to-end sessions against file-backed storage, including reloads
//!
//! Shared fixtures live here so both test binaries build products the same way.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::Path;

use souq_cart::{CartStore, DEFAULT_STORAGE_KEY, FileStorage};
use souq_core::Product;

/// Open the file-backed cart in `dir`, as a fresh process would.
///
/// # Panics
///
/// Panics if the storage directory cannot be created.
#[must_use]
#[allow(clippy::expect_used)]
pub fn open_cart(dir: &Path) -> CartStore {
    let storage = FileStorage::new(dir).expect("create storage dir");
    CartStore::open(storage, DEFAULT_STORAGE_KEY)
}

/// Product with a name and price.
#[must_use]
pub fn product(id: i64, name: &str, price: f64) -> Product {
    Product::new(id).with("name", name).with("price", price)
}
