//! Chain-native argument values produced by coercion

use alloy_primitives::{Sign, I256, U256};
use serde_json::{Number, Value};

/// Outcome of parsing a structured (JSON) argument.
///
/// Unparseable input is kept verbatim so downstream callbacks can tell the
/// two cases apart.
#[derive(Debug, Clone, PartialEq)]
pub enum Structured {
    Parsed(Value),
    Raw(String),
}

/// A coerced argument value
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Null,
    Bool(bool),
    Uint(U256),
    Int(I256),
    /// Fixed-point decimal, already normalized to its canonical digit count
    Fixed(String),
    Float(f64),
    String(String),
    Address(String),
    Bytes(Vec<u8>),
    /// Type qualifier passed through verbatim (e.g. Move type arguments)
    TypeTag(String),
    Array(Vec<NativeValue>),
    Optional(Option<Box<NativeValue>>),
    Structured(Structured),
}

impl NativeValue {
    /// Textual view for string-like values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::String(s)
            | NativeValue::Address(s)
            | NativeValue::TypeTag(s)
            | NativeValue::Fixed(s)
            | NativeValue::Structured(Structured::Raw(s)) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, NativeValue::Null | NativeValue::Optional(None))
    }

    /// Unsigned integer view, accepting non-negative signed values and numeric text
    pub fn as_u256(&self) -> Option<U256> {
        match self {
            NativeValue::Uint(v) => Some(*v),
            NativeValue::Int(v) if !v.is_negative() => Some(v.into_raw()),
            NativeValue::String(s) => parse_u256(s),
            NativeValue::Float(f) if f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64 => {
                Some(U256::from(*f as u64))
            }
            _ => None,
        }
    }

    /// JSON representation handed to external callables
    pub fn to_json(&self) -> Value {
        match self {
            NativeValue::Null | NativeValue::Optional(None) => Value::Null,
            NativeValue::Bool(b) => Value::Bool(*b),
            NativeValue::Uint(v) => match u64::try_from(*v) {
                Ok(small) => Value::Number(small.into()),
                Err(_) => Value::String(v.to_string()),
            },
            NativeValue::Int(v) => match i64::try_from(*v) {
                Ok(small) => Value::Number(small.into()),
                Err(_) => Value::String(v.to_string()),
            },
            NativeValue::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            NativeValue::Fixed(s)
            | NativeValue::String(s)
            | NativeValue::Address(s)
            | NativeValue::TypeTag(s) => Value::String(s.clone()),
            NativeValue::Bytes(bytes) => {
                Value::Array(bytes.iter().map(|b| Value::Number((*b).into())).collect())
            }
            NativeValue::Array(items) => Value::Array(items.iter().map(|v| v.to_json()).collect()),
            NativeValue::Optional(Some(inner)) => inner.to_json(),
            NativeValue::Structured(Structured::Parsed(value)) => value.clone(),
            NativeValue::Structured(Structured::Raw(raw)) => Value::String(raw.clone()),
        }
    }
}

/// Parse a decimal or 0x-prefixed hex unsigned integer
pub fn parse_u256(text: &str) -> Option<U256> {
    let text = text.trim();
    let (digits, radix) = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (text, 10),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    U256::from_str_radix(digits, radix as u64).ok()
}

/// Parse a signed integer: optional sign, then decimal or 0x-prefixed hex
pub fn parse_i256(text: &str) -> Option<I256> {
    let text = text.trim();
    let (sign, magnitude) = match text.strip_prefix('-') {
        Some(rest) => (Sign::Negative, rest),
        None => (Sign::Positive, text.strip_prefix('+').unwrap_or(text)),
    };
    if magnitude.starts_with(['-', '+']) {
        return None;
    }
    I256::checked_from_sign_and_abs(sign, parse_u256(magnitude)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_small_integers_become_numbers() {
        assert_eq!(NativeValue::Uint(U256::from(42u64)).to_json(), json!(42));
        assert_eq!(NativeValue::Int(I256::try_from(-7i64).unwrap()).to_json(), json!(-7));
    }

    #[test]
    fn test_large_integers_become_strings() {
        let big = U256::MAX;
        assert_eq!(NativeValue::Uint(big).to_json(), json!(big.to_string()));
    }

    #[test]
    fn test_bytes_become_number_array() {
        assert_eq!(NativeValue::Bytes(vec![0x48, 0x69]).to_json(), json!([72, 105]));
    }

    #[test]
    fn test_parse_u256_rejects_garbage() {
        assert_eq!(parse_u256("0x10"), Some(U256::from(16u64)));
        assert_eq!(parse_u256("12a"), None);
        assert_eq!(parse_u256(""), None);
        assert_eq!(parse_i256("-12"), I256::try_from(-12i64).ok());
        assert_eq!(parse_i256("1.5"), None);
    }

    #[test]
    fn test_hex_prefix_needs_digits() {
        assert_eq!(parse_u256("0x"), None);
        assert_eq!(parse_u256("0X"), None);
        assert_eq!(parse_u256("0x_1"), None);
        assert_eq!(parse_u256("0xg1"), None);
        assert_eq!(parse_u256("0xFF"), Some(U256::from(255u64)));
        assert_eq!(parse_i256("-0x"), None);
        assert_eq!(parse_i256("--1"), None);
    }

    #[test]
    fn test_signed_accepts_hex() {
        assert_eq!(parse_i256("0x10"), I256::try_from(16i64).ok());
        assert_eq!(parse_i256("-0x10"), I256::try_from(-16i64).ok());
        assert_eq!(parse_i256("+0x7f"), I256::try_from(127i64).ok());
    }
}
