//! Product identity.
//!
//! The catalog backend hands out product ids as JSON integers, but records
//! created by hand (or imported from elsewhere) may use string SKUs. Both are
//! accepted, and the two forms never compare equal to each other.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::product::ProductError;

/// A product identifier, unique within a cart.
///
/// ## Examples
///
/// ```
/// use souq_core::ProductId;
///
/// let numeric: ProductId = "42".parse().unwrap();
/// let sku: ProductId = "HAM-001".parse().unwrap();
///
/// assert_eq!(numeric, ProductId::Number(42));
/// assert_eq!(sku, ProductId::Text("HAM-001".to_string()));
/// assert_ne!(ProductId::Number(1), ProductId::Text("1".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged, try_from = "Value")]
pub enum ProductId {
    /// Integer id, as issued by the catalog API.
    Number(i64),
    /// Non-empty string id.
    Text(String),
}

impl ProductId {
    /// Read an id from a raw JSON value.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::InvalidId` for anything other than an integer
    /// or a non-empty string.
    pub fn from_json(value: &Value) -> Result<Self, ProductError> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(Self::Number)
                .ok_or_else(|| ProductError::InvalidId(value.to_string())),
            Value::String(s) if !s.is_empty() => Ok(Self::Text(s.clone())),
            other => Err(ProductError::InvalidId(other.to_string())),
        }
    }
}

impl TryFrom<Value> for ProductId {
    type Error = ProductError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_json(&value)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for ProductId {
    type Err = ProductError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ProductError::InvalidId("\"\"".to_string()));
        }
        Ok(s.parse::<i64>()
            .map_or_else(|_| Self::Text(s.to_owned()), Self::Number))
    }
}

impl From<i64> for ProductId {
    fn from(id: i64) -> Self {
        Self::Number(id)
    }
}

impl From<i32> for ProductId {
    fn from(id: i32) -> Self {
        Self::Number(i64::from(id))
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_integer() {
        assert_eq!(ProductId::from_json(&json!(7)).unwrap(), ProductId::Number(7));
    }

    #[test]
    fn test_from_json_string() {
        assert_eq!(
            ProductId::from_json(&json!("sku-7")).unwrap(),
            ProductId::Text("sku-7".to_string())
        );
    }

    #[test]
    fn test_from_json_rejects_unusable_values() {
        for value in [json!(1.5), json!(""), json!(null), json!(true), json!([1]), json!({})] {
            assert!(
                matches!(ProductId::from_json(&value), Err(ProductError::InvalidId(_))),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn test_number_and_text_are_distinct() {
        assert_ne!(ProductId::from(1), ProductId::from("1"));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("12".parse::<ProductId>().unwrap(), ProductId::Number(12));
        assert_eq!(
            "-drill".parse::<ProductId>().unwrap(),
            ProductId::Text("-drill".to_string())
        );
        assert!("".parse::<ProductId>().is_err());
    }

    #[test]
    fn test_serde_is_untagged() {
        assert_eq!(serde_json::to_string(&ProductId::Number(3)).unwrap(), "3");
        assert_eq!(
            serde_json::to_string(&ProductId::Text("a".to_string())).unwrap(),
            "\"a\""
        );

        let parsed: ProductId = serde_json::from_str("\"a\"").unwrap();
        assert_eq!(parsed, ProductId::Text("a".to_string()));
    }

    #[test]
    fn test_deserialize_applies_from_json_rules() {
        assert!(serde_json::from_str::<ProductId>("\"\"").is_err());
        assert!(serde_json::from_str::<ProductId>("1.5").is_err());
        assert!(serde_json::from_str::<ProductId>("null").is_err());
        assert_eq!(
            serde_json::from_str::<ProductId>("9").unwrap(),
            ProductId::Number(9)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ProductId::Number(5).to_string(), "5");
        assert_eq!(ProductId::from("bolt").to_string(), "bolt");
    }
}
