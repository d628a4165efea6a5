//! Cart line items and the aggregate cart state.
//!
//! `CartState` holds the pure mutation rules. It knows nothing about storage
//! or subscribers; [`crate::CartStore`] wraps it with both.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use souq_core::{ID_FIELD, Product, ProductId, QUANTITY_FIELD, price_of, stock_of};

/// One distinct product held in the cart.
///
/// `fields` is a snapshot of the product taken when it was first added.
/// Later adds of the same product only bump `quantity`; the snapshot (price
/// included) is never refreshed from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product identity, unique within the cart.
    pub id: ProductId,
    /// Descriptive fields copied from the product at add-time.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    /// Units of this product, always at least 1.
    pub quantity: u32,
}

impl LineItem {
    fn from_product(product: Product) -> Self {
        let mut fields = product.attributes;
        fields.remove(ID_FIELD);
        fields.remove(QUANTITY_FIELD);
        Self {
            id: product.id,
            fields,
            quantity: 1,
        }
    }

    /// Display name from the snapshot.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    /// Snapshotted unit price: `price`, else `sale_price`, else zero.
    #[must_use]
    pub fn unit_price(&self) -> Decimal {
        price_of(&self.fields)
    }

    /// Unit price times quantity, saturating at the `Decimal` bounds.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price().saturating_mul(Decimal::from(self.quantity))
    }

    /// Stock level recorded in the snapshot, if any.
    #[must_use]
    pub fn stock_limit(&self) -> Option<u64> {
        stock_of(&self.fields)
    }

    /// Whether the quantity has reached the snapshotted stock level.
    ///
    /// The store never enforces stock; callers check this before
    /// increasing.
    #[must_use]
    pub fn is_at_stock_limit(&self) -> bool {
        self.stock_limit()
            .is_some_and(|limit| u64::from(self.quantity) >= limit)
    }
}

/// The full cart: line items in first-add order, unique by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartState {
    /// Line items, in the order they were first added.
    pub items: Vec<LineItem>,
}

impl CartState {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Look up a line item by product id.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    fn get_mut(&mut self, id: &ProductId) -> Option<&mut LineItem> {
        self.items.iter_mut().find(|item| &item.id == id)
    }

    /// Total units across all line items.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Number of distinct products.
    #[must_use]
    pub fn distinct_count(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of unit price times quantity over all line items.
    ///
    /// Saturates at the `Decimal` bounds instead of overflowing.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items
            .iter()
            .map(LineItem::line_total)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// Add one unit of `product`, returning the resulting quantity.
    ///
    /// An existing line keeps its snapshot; a new line is appended.
    pub fn add(&mut self, product: Product) -> u32 {
        if let Some(item) = self.get_mut(&product.id) {
            item.quantity = item.quantity.saturating_add(1);
            return item.quantity;
        }
        self.items.push(LineItem::from_product(product));
        1
    }

    /// Increment an existing line; `None` if absent.
    pub fn increase(&mut self, id: &ProductId) -> Option<u32> {
        let item = self.get_mut(id)?;
        item.quantity = item.quantity.saturating_add(1);
        Some(item.quantity)
    }

    /// Decrement an existing line, never below 1.
    ///
    /// Returns `None` when the item is absent or already at 1; decrementing
    /// never removes a line.
    pub fn decrease(&mut self, id: &ProductId) -> Option<u32> {
        let item = self.get_mut(id)?;
        if item.quantity <= 1 {
            return None;
        }
        item.quantity -= 1;
        Some(item.quantity)
    }

    /// Remove a line, returning it if it was present.
    pub fn remove(&mut self, id: &ProductId) -> Option<LineItem> {
        let index = self.items.iter().position(|item| &item.id == id)?;
        Some(self.items.remove(index))
    }

    /// Drop every line, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let removed = self.items.len();
        self.items.clear();
        removed
    }

    /// Restore the invariants on state read back from storage.
    ///
    /// Lines with quantity 0 are dropped and repeated ids are folded into
    /// the first occurrence.
    #[must_use]
    pub fn normalized(self) -> Self {
        let mut out = Self::new();
        for item in self.items.into_iter().filter(|item| item.quantity > 0) {
            match out.get_mut(&item.id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(item.quantity);
                }
                None => out.items.push(item),
            }
        }
        out
    }
}
