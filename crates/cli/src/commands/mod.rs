//! CLI command implementations.

pub mod cart;

use std::path::PathBuf;

use souq_cart::{CartConfig, CartError, CartStore};

/// Everything a command needs: the opened cart and its pricing rules.
pub struct Context {
    pub store: CartStore,
    pub config: CartConfig,
}

impl Context {
    /// Load configuration, apply command-line overrides, and open the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or the storage directory
    /// cannot be created.
    pub fn load(dir: Option<PathBuf>, key: Option<String>) -> Result<Self, CartError> {
        let mut config = CartConfig::from_env()?;
        if let Some(dir) = dir {
            config.storage_dir = dir;
        }
        if let Some(key) = key {
            config.storage_key = key;
        }

        tracing::debug!(dir = %config.storage_dir.display(), key = %config.storage_key, "Opening cart");
        let store = CartStore::from_config(&config)?;
        Ok(Self { store, config })
    }
}
