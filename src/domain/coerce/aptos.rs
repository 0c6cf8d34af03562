//! Move argument vocabulary

use super::{
    parse_bool, parse_bytes, parse_number, parse_structured, parse_uint, width_suffix, Coercer,
    CoercionError, Container, NativeValue,
};
use crate::domain::chain::Chain;

pub const TYPE_ARG: &str = "type_arg";

const VOCABULARY: &[&str] = &[
    TYPE_ARG, "address", "string", "number", "boolean", "bytes", "u8", "u16", "u32", "u64", "u128",
    "u256", "array", "object",
];

pub struct AptosCoercer;

impl Coercer for AptosCoercer {
    fn chain(&self) -> Chain {
        Chain::Aptos
    }

    fn vocabulary(&self) -> &'static [&'static str] {
        VOCABULARY
    }

    fn coerce_flat(&self, kind: &str, raw: &str) -> Result<NativeValue, CoercionError> {
        match kind {
            TYPE_ARG => Ok(NativeValue::TypeTag(raw.trim().to_string())),
            "address" => parse_address(raw),
            "string" => Ok(NativeValue::String(raw.to_string())),
            "number" => parse_number(kind, raw),
            "boolean" => parse_bool(kind, raw),
            "bytes" => parse_bytes(kind, raw),
            "array" | "object" => Ok(parse_structured(raw)),
            _ => match width_suffix(kind, "u") {
                Some(bits) => parse_uint(kind, raw, bits),
                None => Err(CoercionError::invalid(kind, raw, "unsupported Move type")),
            },
        }
    }

    fn container(&self, name: &str) -> Option<Container> {
        match name {
            "vector" => Some(Container::Array),
            "option" => Some(Container::Optional),
            _ => None,
        }
    }

    fn is_type_qualifier(&self, kind: &str) -> bool {
        kind == TYPE_ARG
    }

    fn is_bytes(&self, kind: &str) -> bool {
        kind == "bytes"
    }

    fn is_bool(&self, kind: &str) -> bool {
        kind == "boolean"
    }
}

/// Account addresses are up to 32 bytes of hex, kept in short form
fn parse_address(raw: &str) -> Result<NativeValue, CoercionError> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if digits.is_empty() || digits.len() > 64 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CoercionError::invalid("address", raw, "expected up to 64 hex digits"));
    }
    Ok(NativeValue::Address(format!("0x{}", digits.to_lowercase())))
}
