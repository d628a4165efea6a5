//! Error types for cart operations.
//!
//! Cart mutations themselves are total and never fail. Errors only surface
//! at the edges: reading an untyped product, explicit rehydration, and
//! opening a store from configuration.

use souq_core::ProductError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::storage::StorageError;

/// Cart-level error type.
#[derive(Debug, Error)]
pub enum CartError {
    /// The product record was rejected before reaching the cart.
    #[error("Invalid product: {0}")]
    Product(#[from] ProductError),

    /// Durable storage could not be read or written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;
