//! Derived cart totals: item count, subtotal, shipping, tax, grand total.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use souq_core::{CurrencyCode, Price};

use crate::line_item::CartState;

/// Pricing rules applied on top of the cart subtotal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Currency every snapshotted price is assumed to be in.
    pub currency: CurrencyCode,
    /// Subtotals strictly above this ship free.
    pub free_shipping_threshold: Decimal,
    /// Flat shipping fee charged at or below the threshold.
    pub shipping_fee: Decimal,
    /// Tax as a fraction of the subtotal (0.05 = 5%).
    pub tax_rate: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: CurrencyCode::KWD,
            free_shipping_threshold: Decimal::from(30),
            shipping_fee: Decimal::new(462, 2),
            tax_rate: Decimal::new(5, 2),
        }
    }
}

/// Totals computed from a cart snapshot. Nothing here is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    /// Sum of quantities.
    pub item_count: u64,
    /// Number of distinct line items.
    pub distinct_items: usize,
    pub subtotal: Price,
    pub shipping: Price,
    pub tax: Price,
    pub grand_total: Price,
}

impl CartTotals {
    /// Compute totals for `state` under `pricing`.
    ///
    /// An empty cart has no shipping charge. Tax is rounded to the
    /// currency's minor units; the subtotal is left exact. Amounts too large
    /// for a `Decimal` saturate at its bounds.
    #[must_use]
    pub fn compute(state: &CartState, pricing: &PricingConfig) -> Self {
        let currency = pricing.currency;
        let subtotal = state.subtotal();

        let shipping = if state.is_empty() || subtotal > pricing.free_shipping_threshold {
            Decimal::ZERO
        } else {
            pricing.shipping_fee
        };
        let tax = subtotal
            .saturating_mul(pricing.tax_rate)
            .round_dp(currency.minor_units());
        let grand_total = subtotal.saturating_add(shipping).saturating_add(tax);

        Self {
            item_count: state.item_count(),
            distinct_items: state.distinct_count(),
            subtotal: Price::new(subtotal, currency),
            shipping: Price::new(shipping, currency),
            tax: Price::new(tax, currency),
            grand_total: Price::new(grand_total, currency),
        }
    }
}
