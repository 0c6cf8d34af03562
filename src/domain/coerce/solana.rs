//! Solana argument vocabulary

use super::{parse_bool, parse_number, Coercer, CoercionError, NativeValue};
use crate::domain::chain::Chain;

const VOCABULARY: &[&str] = &["String", "string", "Number", "number", "Bool", "PublicKey"];

const PUBLIC_KEY_LEN: usize = 32;

pub struct SolanaCoercer;

impl Coercer for SolanaCoercer {
    fn chain(&self) -> Chain {
        Chain::Solana
    }

    fn vocabulary(&self) -> &'static [&'static str] {
        VOCABULARY
    }

    fn coerce_flat(&self, kind: &str, raw: &str) -> Result<NativeValue, CoercionError> {
        match kind {
            "String" | "string" => Ok(NativeValue::String(raw.to_string())),
            "Number" | "number" => parse_number(kind, raw),
            "Bool" => parse_bool(kind, raw),
            "PublicKey" => parse_public_key(raw),
            _ => Err(CoercionError::invalid(kind, raw, "unsupported Solana type")),
        }
    }

    fn is_bool(&self, kind: &str) -> bool {
        kind == "Bool"
    }
}

/// Base58 text that decodes to exactly 32 bytes
pub fn parse_public_key(raw: &str) -> Result<NativeValue, CoercionError> {
    let trimmed = raw.trim();
    let bytes = bs58::decode(trimmed)
        .into_vec()
        .map_err(|e| CoercionError::invalid("PublicKey", raw, e.to_string()))?;
    if bytes.len() != PUBLIC_KEY_LEN {
        return Err(CoercionError::invalid(
            "PublicKey",
            raw,
            format!("expected {} bytes, got {}", PUBLIC_KEY_LEN, bytes.len()),
        ));
    }
    Ok(NativeValue::Address(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::coerce::coerce;

    const SYSTEM_PROGRAM: &str = "11111111111111111111111111111111";

    #[test]
    fn test_public_key() {
        assert_eq!(
            coerce(&SolanaCoercer, "PublicKey", SYSTEM_PROGRAM),
            Ok(NativeValue::Address(SYSTEM_PROGRAM.to_string()))
        );
        assert!(coerce(&SolanaCoercer, "PublicKey", "0OIl").is_err());
        assert!(coerce(&SolanaCoercer, "PublicKey", "1111").is_err());
    }

    #[test]
    fn test_number_accepts_floats() {
        assert_eq!(coerce(&SolanaCoercer, "Number", "0.5"), Ok(NativeValue::Float(0.5)));
        assert!(coerce(&SolanaCoercer, "Number", "lots").is_err());
    }

    #[test]
    fn test_strings_kept_verbatim() {
        assert_eq!(
            coerce(&SolanaCoercer, "String", " 1000 "),
            Ok(NativeValue::String(" 1000 ".to_string()))
        );
    }
}
