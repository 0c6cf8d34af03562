//! Cadence argument vocabulary

use serde_json::{json, Value};

use super::{
    parse_bool, parse_fixed, parse_int, parse_structured, parse_uint, width_suffix, Coercer,
    CoercionError, Container, NativeValue,
};
use crate::domain::chain::Chain;

const VOCABULARY: &[&str] = &[
    "String", "Character", "Address", "Bool", "Int", "UInt", "Int8", "Int16", "Int32", "Int64",
    "Int128", "Int256", "UInt8", "UInt16", "UInt32", "UInt64", "UInt128", "UInt256", "Word8",
    "Word16", "Word32", "Word64", "UFix64", "Fix64", "Path", "Dictionary", "Struct",
];

/// Unbounded Cadence `Int`/`UInt` are held in 256 bits
const UNBOUNDED_BITS: usize = 256;

pub struct FlowCoercer;

impl Coercer for FlowCoercer {
    fn chain(&self) -> Chain {
        Chain::Flow
    }

    fn vocabulary(&self) -> &'static [&'static str] {
        VOCABULARY
    }

    fn coerce_flat(&self, kind: &str, raw: &str) -> Result<NativeValue, CoercionError> {
        match kind {
            "String" => Ok(NativeValue::String(raw.to_string())),
            "Character" => {
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(NativeValue::String(c.to_string())),
                    _ => Err(CoercionError::invalid(kind, raw, "expected a single character")),
                }
            }
            "Address" => parse_address(raw),
            "Bool" => parse_bool(kind, raw),
            "Int" => parse_int(kind, raw, UNBOUNDED_BITS),
            "UInt" => parse_uint(kind, raw, UNBOUNDED_BITS),
            "UFix64" => parse_fixed(kind, raw, false),
            "Fix64" => parse_fixed(kind, raw, true),
            "Path" => parse_path(raw),
            "Dictionary" | "Struct" => Ok(parse_structured(raw)),
            _ => {
                if let Some(bits) = width_suffix(kind, "UInt").or_else(|| width_suffix(kind, "Word")) {
                    parse_uint(kind, raw, bits)
                } else if let Some(bits) = width_suffix(kind, "Int") {
                    parse_int(kind, raw, bits)
                } else {
                    Err(CoercionError::invalid(kind, raw, "unsupported Cadence type"))
                }
            }
        }
    }

    fn container(&self, name: &str) -> Option<Container> {
        match name {
            "Array" => Some(Container::Array),
            "Optional" => Some(Container::Optional),
            _ => None,
        }
    }

    fn is_bool(&self, kind: &str) -> bool {
        kind == "Bool"
    }
}

/// Flow addresses are 8 bytes, rendered as `0x` + 16 lowercase hex digits
fn parse_address(raw: &str) -> Result<NativeValue, CoercionError> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if digits.is_empty() || digits.len() > 16 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CoercionError::invalid("Address", raw, "expected up to 16 hex digits"));
    }
    Ok(NativeValue::Address(format!("0x{:0>16}", digits.to_lowercase())))
}

fn parse_path(raw: &str) -> Result<NativeValue, CoercionError> {
    match split_path(raw) {
        Some(_) => Ok(NativeValue::String(raw.trim().to_string())),
        None => Err(CoercionError::invalid(
            "Path",
            raw,
            "expected /storage/<id>, /public/<id> or /private/<id>",
        )),
    }
}

fn split_path(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.trim().strip_prefix('/')?;
    let (domain, identifier) = rest.split_once('/')?;
    let valid_domain = matches!(domain, "storage" | "public" | "private");
    let valid_identifier = !identifier.is_empty()
        && identifier.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    (valid_domain && valid_identifier).then_some((domain, identifier))
}

/// JSON-Cadence encoding of a coerced argument, as accepted by the Access API
pub fn cadence_json(kind: &str, value: &NativeValue) -> Value {
    let kind = kind.trim();
    if let Some(generic) = super::generic::split_generic(kind) {
        match (FlowCoercer.container(generic.container), value) {
            (Some(Container::Array), NativeValue::Array(items)) => {
                let encoded: Vec<Value> =
                    items.iter().map(|item| cadence_json(generic.inner, item)).collect();
                return json!({ "type": "Array", "value": encoded });
            }
            (Some(Container::Optional), NativeValue::Optional(inner)) => {
                let encoded = inner.as_deref().map(|v| cadence_json(generic.inner, v));
                return json!({ "type": "Optional", "value": encoded });
            }
            _ => {}
        }
    }

    match value {
        NativeValue::Bool(b) => json!({ "type": "Bool", "value": b }),
        NativeValue::Uint(v) => json!({ "type": kind, "value": v.to_string() }),
        NativeValue::Int(v) => json!({ "type": kind, "value": v.to_string() }),
        NativeValue::Fixed(s) => json!({ "type": kind, "value": s }),
        NativeValue::Address(a) => json!({ "type": "Address", "value": a }),
        NativeValue::String(s) if kind == "Path" => match split_path(s) {
            Some((domain, identifier)) => json!({
                "type": "Path",
                "value": { "domain": domain, "identifier": identifier }
            }),
            None => json!({ "type": "String", "value": s }),
        },
        NativeValue::String(s) if kind == "Character" => json!({ "type": "Character", "value": s }),
        NativeValue::Structured(_) => json!({ "type": kind, "value": value.to_json() }),
        other => json!({ "type": "String", "value": other.to_json() }),
    }
}
