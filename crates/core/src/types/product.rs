//! Catalog product records as handed to the cart.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::ProductId;
use super::price::{is_truthy, lenient_amount};

/// Key of the identity field.
pub const ID_FIELD: &str = "id";
/// Key a cart line stores its quantity under.
pub const QUANTITY_FIELD: &str = "quantity";
/// Key of the primary price field.
pub const PRICE_FIELD: &str = "price";
/// Key of the alternate price field, used when the primary is unset.
pub const SALE_PRICE_FIELD: &str = "sale_price";
/// Key of the stock level field.
pub const STOCK_FIELD: &str = "stock_quantity";

/// Errors that can occur when reading a [`Product`] from JSON.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProductError {
    /// The input is not a JSON object.
    #[error("product must be a JSON object")]
    NotAnObject,
    /// The object has no `id` key.
    #[error("product is missing an id")]
    MissingId,
    /// The `id` is neither an integer nor a non-empty string.
    #[error("invalid product id: {0}")]
    InvalidId(String),
}

/// A product-like record: a stable identity plus opaque descriptive fields.
///
/// Fields other than `id` are carried through untouched, so whatever the
/// catalog sends (name, image, barcode, category detail, selected attributes)
/// ends up in the cart exactly as it was.
///
/// ## Examples
///
/// ```
/// use serde_json::json;
/// use souq_core::{Product, ProductError, ProductId};
///
/// let hammer = Product::from_json(json!({"id": 1, "name": "Hammer", "price": 10})).unwrap();
/// assert_eq!(hammer.id, ProductId::Number(1));
/// assert_eq!(hammer.name(), Some("Hammer"));
///
/// assert_eq!(
///     Product::from_json(json!({"name": "Nameless"})),
///     Err(ProductError::MissingId)
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Product identity.
    pub id: ProductId,
    /// Every other field of the record.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Product {
    /// Create a product with no descriptive fields.
    #[must_use]
    pub fn new(id: impl Into<ProductId>) -> Self {
        Self {
            id: id.into(),
            attributes: Map::new(),
        }
    }

    /// Builder-style setter for a descriptive field.
    ///
    /// `id` and `quantity` are owned by the product and the cart line, so
    /// setting either here is ignored.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if !is_reserved_field(&key) {
            self.attributes.insert(key, value.into());
        }
        self
    }

    /// Read a product from an arbitrary JSON value.
    ///
    /// Records without a usable identity are rejected rather than admitted
    /// under a made-up id.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::NotAnObject`, `ProductError::MissingId`, or
    /// `ProductError::InvalidId`.
    pub fn from_json(value: Value) -> Result<Self, ProductError> {
        let Value::Object(mut attributes) = value else {
            return Err(ProductError::NotAnObject);
        };
        let raw_id = attributes.remove(ID_FIELD).ok_or(ProductError::MissingId)?;
        let id = ProductId::from_json(&raw_id)?;
        Ok(Self { id, attributes })
    }

    /// Display name, if the record has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.attributes.get("name").and_then(Value::as_str)
    }

    /// Unit price from `price`, falling back to `sale_price`, else zero.
    #[must_use]
    pub fn price(&self) -> Decimal {
        price_of(&self.attributes)
    }

    /// Units in stock, when the record reports a numeric stock level.
    #[must_use]
    pub fn stock_quantity(&self) -> Option<u64> {
        stock_of(&self.attributes)
    }
}

/// Whether `key` names a field that must not appear among descriptive fields.
#[must_use]
pub fn is_reserved_field(key: &str) -> bool {
    key == ID_FIELD || key == QUANTITY_FIELD
}

/// Price rule shared by products and cart line items.
#[must_use]
pub fn price_of(fields: &Map<String, Value>) -> Decimal {
    fields
        .get(PRICE_FIELD)
        .filter(|v| is_truthy(v))
        .or_else(|| fields.get(SALE_PRICE_FIELD))
        .map_or(Decimal::ZERO, lenient_amount)
}

/// Stock rule shared by products and cart line items.
#[must_use]
pub fn stock_of(fields: &Map<String, Value>) -> Option<u64> {
    match fields.get(STOCK_FIELD)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
