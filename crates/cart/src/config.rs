//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `SOUQ_CART_DIR` - Directory holding the persisted cart (default: .souq)
//! - `SOUQ_CART_KEY` - Storage key of the cart blob (default: cart-storage)
//! - `SOUQ_CURRENCY` - ISO 4217 code of snapshotted prices (default: KWD)
//! - `SOUQ_FREE_SHIPPING_THRESHOLD` - Subtotals above this ship free (default: 30)
//! - `SOUQ_SHIPPING_FEE` - Flat shipping fee (default: 4.62)
//! - `SOUQ_TAX_RATE` - Tax as a fraction of the subtotal (default: 0.05)

use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;
use souq_core::CurrencyCode;
use thiserror::Error;

use crate::storage::DEFAULT_STORAGE_KEY;
use crate::totals::PricingConfig;

const DEFAULT_CART_DIR: &str = ".souq";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartConfig {
    /// Directory for [`crate::FileStorage`]
    pub storage_dir: PathBuf,
    /// Key the cart blob is stored under
    pub storage_key: String,
    /// Shipping and tax rules for derived totals
    pub pricing: PricingConfig,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(DEFAULT_CART_DIR),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            pricing: PricingConfig::default(),
        }
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` for unparseable values and
    /// `ConfigError::MissingEnvVar` if `SOUQ_CART_KEY` is set but blank.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = PricingConfig::default();

        let storage_dir = lookup("SOUQ_CART_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_CART_DIR), PathBuf::from);

        let storage_key = match lookup("SOUQ_CART_KEY") {
            Some(key) if key.trim().is_empty() => {
                return Err(ConfigError::MissingEnvVar("SOUQ_CART_KEY".to_string()));
            }
            Some(key) => key.trim().to_string(),
            None => DEFAULT_STORAGE_KEY.to_string(),
        };

        let currency = parse_or(&lookup, "SOUQ_CURRENCY", defaults.currency, |s| {
            CurrencyCode::from_str(s)
        })?;
        let free_shipping_threshold = parse_or(
            &lookup,
            "SOUQ_FREE_SHIPPING_THRESHOLD",
            defaults.free_shipping_threshold,
            parse_decimal,
        )?;
        let shipping_fee = parse_or(
            &lookup,
            "SOUQ_SHIPPING_FEE",
            defaults.shipping_fee,
            parse_decimal,
        )?;
        let tax_rate = parse_or(&lookup, "SOUQ_TAX_RATE", defaults.tax_rate, parse_decimal)?;

        Ok(Self {
            storage_dir,
            storage_key,
            pricing: PricingConfig {
                currency,
                free_shipping_threshold,
                shipping_fee,
                tax_rate,
            },
        })
    }
}

fn parse_decimal(s: &str) -> Result<Decimal, String> {
    let value = Decimal::from_str(s).map_err(|e| e.to_string())?;
    if value.is_sign_negative() {
        return Err("must not be negative".to_string());
    }
    Ok(value)
}

fn parse_or<F, T, P, E>(lookup: &F, name: &str, default: T, parse: P) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Result<T, E>,
    E: ToString,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => parse(raw.trim())
            .map_err(|e| ConfigError::InvalidEnvVar(name.to_string(), e.to_string())),
        _ => Ok(default),
    }
}
