//! Type-safe price representation using decimal arithmetic.
//!
//! Catalog records carry prices as whatever the backend happened to emit:
//! JSON numbers, numeric strings, strings with a unit suffix, or nothing at
//! all. [`lenient_amount`] turns any of those into a [`Decimal`] so totals can
//! be summed without floating point drift.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dinars, not fils).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Format for display, e.g. `KD 36.500`.
    ///
    /// The amount is rounded and padded to the currency's minor units.
    #[must_use]
    pub fn display(&self) -> String {
        let mut amount = self.amount.round_dp(self.currency_code.minor_units());
        amount.rescale(self.currency_code.minor_units());
        format!("{} {amount}", self.currency_code.symbol())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    KWD,
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol used in front of amounts.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::KWD => "KD",
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// ISO 4217 alphabetic code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::KWD => "KWD",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
        }
    }

    /// Number of digits after the decimal point (3 for the Kuwaiti dinar).
    #[must_use]
    pub const fn minor_units(&self) -> u32 {
        match self {
            Self::KWD => 3,
            _ => 2,
        }
    }
}

impl FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "KWD" => Ok(Self::KWD),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            other => Err(format!("unsupported currency code: {other}")),
        }
    }
}

/// Whether a JSON value counts as "set" when choosing between price fields.
///
/// `null`, `false`, `0` and the empty string are treated as unset so the
/// caller falls back to the alternate field.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Read a price amount from a loosely-typed JSON value.
///
/// Numbers are used as-is. Strings are parsed by their leading numeric
/// prefix, so `"12.5 KD"` reads as `12.5`. Everything else, and anything
/// that does not start with a number, reads as zero.
#[must_use]
pub fn lenient_amount(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(Decimal::from)
            .or_else(|| parse_decimal(&n.to_string()))
            .unwrap_or(Decimal::ZERO),
        Value::String(s) => numeric_prefix(s)
            .and_then(|prefix| parse_decimal(&prefix))
            .unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Extract `[+-]digits[.digits][e[+-]digits]` from the start of `s`,
/// ignoring leading whitespace.
fn numeric_prefix(s: &str) -> Option<String> {
    let s = s.trim_start();
    let mut out = String::new();
    let mut chars = s.chars().peekable();

    match chars.peek() {
        Some('-') => {
            out.push('-');
            chars.next();
        }
        Some('+') => {
            chars.next();
        }
        _ => {}
    }

    let mut integer_digits = 0usize;
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        out.push(c);
        integer_digits += 1;
        chars.next();
    }

    let mut fraction = String::new();
    if chars.peek() == Some(&'.') {
        chars.next();
        while let Some(&c) = chars.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            fraction.push(c);
            chars.next();
        }
    }

    if integer_digits == 0 && fraction.is_empty() {
        return None;
    }
    if integer_digits == 0 {
        out.push('0');
    }
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(&fraction);
    }
    if let Some(exponent) = exponent_suffix(chars) {
        out.push_str(&exponent);
    }
    Some(out)
}

/// An exponent counts only when at least one digit follows the marker.
fn exponent_suffix(mut chars: impl Iterator<Item = char>) -> Option<String> {
    let mut out = String::from("e");
    match chars.next()? {
        'e' | 'E' => {}
        _ => return None,
    }
    let mut signed = false;
    let mut digits = 0usize;
    for c in chars {
        match c {
            '-' | '+' if !signed && digits == 0 => {
                signed = true;
                if c == '-' {
                    out.push(c);
                }
            }
            c if c.is_ascii_digit() => {
                out.push(c);
                digits += 1;
            }
            _ => break,
        }
    }
    (digits > 0).then_some(out)
}
