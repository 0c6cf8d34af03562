//! Coercion engine - turns user-entered argument text into chain-native values
//!
//! Each chain supplies a [`Coercer`] describing its kind vocabulary. The
//! engine itself is chain-agnostic:
//! - kinds in the vocabulary are coerced by the chain's flat rules
//! - `Container(Inner)` expressions recurse through [`generic`]
//! - anything else falls back to the restricted [`literal`] parser

pub mod aptos;
pub mod evm;
pub mod flow;
pub mod generic;
pub mod literal;
mod native;
pub mod solana;

use alloy_primitives::I256;
use thiserror::Error;

use crate::domain::argument::ArgValue;
use crate::domain::chain::Chain;

pub use generic::Container;
pub use native::{parse_i256, parse_u256, NativeValue, Structured};

/// Decimal digits of the fixed-point formats (Flow UFix64/Fix64)
pub const FIXED_POINT_DIGITS: usize = 8;

const MAX_NESTING: usize = 32;

/// Raw text is syntactically invalid for its declared kind
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("invalid {kind} value '{input}': {reason}")]
    Invalid {
        kind: String,
        input: String,
        reason: String,
    },
    #[error("invalid literal '{input}': {reason}")]
    Literal { input: String, reason: String },
    #[error("{kind} value {input} does not fit in {bits} bits")]
    OutOfRange {
        kind: String,
        input: String,
        bits: usize,
    },
    #[error("kind expression nested too deeply")]
    NestingTooDeep,
}

impl CoercionError {
    pub fn invalid(kind: &str, input: &str, reason: impl Into<String>) -> Self {
        CoercionError::Invalid {
            kind: kind.to_string(),
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// A chain's argument kind vocabulary and its flat coercion rules
pub trait Coercer: Send + Sync {
    fn chain(&self) -> Chain;

    /// Kind tags offered to the user for this chain
    fn vocabulary(&self) -> &'static [&'static str];

    /// Whether `kind` is a flat kind this chain coerces directly
    fn recognizes(&self, kind: &str) -> bool {
        self.vocabulary().contains(&kind)
    }

    /// Coerce text for a recognized kind
    fn coerce_flat(&self, kind: &str, raw: &str) -> Result<NativeValue, CoercionError>;

    /// Container shape named by a generic kind expression, if any
    fn container(&self, _name: &str) -> Option<Container> {
        None
    }

    /// Type-qualifier kinds are passed to call sites separately from values
    fn is_type_qualifier(&self, _kind: &str) -> bool {
        false
    }

    /// Byte-string kinds are normalized before dispatch
    fn is_bytes(&self, _kind: &str) -> bool {
        false
    }

    fn is_bool(&self, _kind: &str) -> bool {
        false
    }
}

/// Coerce raw text for `kind` using the chain's vocabulary.
///
/// Pure: identical inputs always produce identical outputs.
pub fn coerce(coercer: &dyn Coercer, kind: &str, raw: &str) -> Result<NativeValue, CoercionError> {
    coerce_nested(coercer, kind.trim(), raw, 0)
}

/// Coerce an argument value. Already-coerced values are returned unchanged.
pub fn coerce_value(
    coercer: &dyn Coercer,
    kind: &str,
    value: &ArgValue,
) -> Result<NativeValue, CoercionError> {
    match value {
        ArgValue::Text(raw) => coerce(coercer, kind, raw),
        ArgValue::Native(native) => Ok(native.clone()),
    }
}

fn coerce_nested(
    coercer: &dyn Coercer,
    kind: &str,
    raw: &str,
    depth: usize,
) -> Result<NativeValue, CoercionError> {
    if depth > MAX_NESTING {
        return Err(CoercionError::NestingTooDeep);
    }
    if kind.is_empty() {
        return Ok(NativeValue::String(raw.to_string()));
    }
    if coercer.recognizes(kind) {
        return coercer.coerce_flat(kind, raw);
    }
    if let Some(generic) = generic::split_generic(kind) {
        if let Some(container) = coercer.container(generic.container) {
            return coerce_container(coercer, container, kind, generic.inner, raw, depth);
        }
    }
    literal::parse_literal(raw)
}

fn coerce_container(
    coercer: &dyn Coercer,
    container: Container,
    kind: &str,
    inner: &str,
    raw: &str,
    depth: usize,
) -> Result<NativeValue, CoercionError> {
    match container {
        Container::Optional => {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed == "null" || trimmed == "nil" {
                Ok(NativeValue::Optional(None))
            } else {
                let value = coerce_nested(coercer, inner, raw, depth + 1)?;
                Ok(NativeValue::Optional(Some(Box::new(value))))
            }
        }
        Container::Array => {
            let items = generic::split_list(raw).ok_or_else(|| {
                CoercionError::invalid(kind, raw, "expected a bracketed list [a, b, ...]")
            })?;
            items
                .iter()
                .map(|item| coerce_nested(coercer, inner, item, depth + 1))
                .collect::<Result<Vec<_>, _>>()
                .map(NativeValue::Array)
        }
    }
}

// === Shared flat rules ===

/// Case-insensitive `true` / `false`
pub(crate) fn parse_bool(kind: &str, raw: &str) -> Result<NativeValue, CoercionError> {
    match raw.trim().to_lowercase().as_str() {
        "true" => Ok(NativeValue::Bool(true)),
        "false" => Ok(NativeValue::Bool(false)),
        _ => Err(CoercionError::invalid(kind, raw, "expected true or false")),
    }
}

/// Hex text to bytes, two characters per byte, optional `0x` prefix
pub(crate) fn parse_bytes(kind: &str, raw: &str) -> Result<NativeValue, CoercionError> {
    let trimmed = raw.trim();
    let hex_str = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if hex_str.len() % 2 != 0 {
        return Err(CoercionError::invalid(kind, raw, "odd number of hex digits"));
    }
    hex::decode(hex_str)
        .map(NativeValue::Bytes)
        .map_err(|e| CoercionError::invalid(kind, raw, e.to_string()))
}

/// Unsigned integer bounded to `bits`
pub(crate) fn parse_uint(kind: &str, raw: &str, bits: usize) -> Result<NativeValue, CoercionError> {
    let value = parse_u256(raw)
        .ok_or_else(|| CoercionError::invalid(kind, raw, "expected an unsigned integer"))?;
    if bits < 256 && value.bit_len() > bits {
        return Err(CoercionError::OutOfRange {
            kind: kind.to_string(),
            input: raw.trim().to_string(),
            bits,
        });
    }
    Ok(NativeValue::Uint(value))
}

/// Signed integer bounded to `bits`
pub(crate) fn parse_int(kind: &str, raw: &str, bits: usize) -> Result<NativeValue, CoercionError> {
    let value = parse_i256(raw)
        .ok_or_else(|| CoercionError::invalid(kind, raw, "expected an integer"))?;
    if bits < 256 {
        // two's complement: -2^(n-1) ..= 2^(n-1) - 1
        let magnitude = if value.is_negative() {
            (value + I256::ONE).unsigned_abs()
        } else {
            value.unsigned_abs()
        };
        if magnitude.bit_len() > bits - 1 {
            return Err(CoercionError::OutOfRange {
                kind: kind.to_string(),
                input: raw.trim().to_string(),
                bits,
            });
        }
    }
    Ok(NativeValue::Int(value))
}

/// Integer or fixed-point decimal normalized to [`FIXED_POINT_DIGITS`]
/// fractional digits, e.g. `1.5` -> `1.50000000`
pub(crate) fn parse_fixed(kind: &str, raw: &str, signed: bool) -> Result<NativeValue, CoercionError> {
    let trimmed = raw.trim();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    if negative && !signed {
        return Err(CoercionError::invalid(kind, raw, "value must not be negative"));
    }

    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let digits_ok = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !digits_ok(whole) || !digits_ok(fraction) {
        return Err(CoercionError::invalid(kind, raw, "expected a decimal number"));
    }
    if fraction.len() > FIXED_POINT_DIGITS {
        return Err(CoercionError::invalid(
            kind,
            raw,
            format!("at most {} fractional digits", FIXED_POINT_DIGITS),
        ));
    }

    let whole = whole.trim_start_matches('0');
    let whole = if whole.is_empty() { "0" } else { whole };
    let sign = if negative && (whole != "0" || fraction.chars().any(|c| c != '0')) {
        "-"
    } else {
        ""
    };
    Ok(NativeValue::Fixed(format!(
        "{}{}.{:0<width$}",
        sign,
        whole,
        fraction,
        width = FIXED_POINT_DIGITS
    )))
}

/// Integer if integral, otherwise a float
pub(crate) fn parse_number(kind: &str, raw: &str) -> Result<NativeValue, CoercionError> {
    let trimmed = raw.trim();
    if let Some(value) = parse_u256(trimmed) {
        return Ok(NativeValue::Uint(value));
    }
    if let Some(value) = parse_i256(trimmed) {
        return Ok(NativeValue::Int(value));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(NativeValue::Float)
        .ok_or_else(|| CoercionError::invalid(kind, raw, "expected a number"))
}

/// JSON, falling back to the raw text when it does not parse
pub(crate) fn parse_structured(raw: &str) -> NativeValue {
    match serde_json::from_str(raw.trim()) {
        Ok(value) => NativeValue::Structured(Structured::Parsed(value)),
        Err(_) => NativeValue::Structured(Structured::Raw(raw.to_string())),
    }
}

/// Integer width encoded in a kind suffix, e.g. `UInt64` -> 64
pub(crate) fn width_suffix(kind: &str, prefix: &str) -> Option<usize> {
    let rest = kind.strip_prefix(prefix)?;
    if rest.is_empty() {
        return None;
    }
    rest.parse().ok()
}
