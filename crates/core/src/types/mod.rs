//! Core types for Souq.
//!
//! This module provides type-safe wrappers for catalog concepts that arrive
//! from the REST backend as loosely-typed JSON.

pub mod id;
pub mod price;
pub mod product;

pub use id::ProductId;
pub use price::{CurrencyCode, Price, is_truthy, lenient_amount};
pub use product::{
    ID_FIELD, PRICE_FIELD, Product, ProductError, QUANTITY_FIELD, SALE_PRICE_FIELD, STOCK_FIELD,
    is_reserved_field, price_of, stock_of,
};
