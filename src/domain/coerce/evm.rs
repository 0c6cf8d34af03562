//! Solidity ABI argument vocabulary
//!
//! Argument kinds are ABI type strings (`uint256`, `address[]`, `(bool,bytes)`)
//! resolved with [`DynSolType`]. The helpers at the bottom encode coerced
//! arguments into calldata and decode call results for a JSON ABI function.

use std::str::FromStr;

use alloy_dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy_json_abi::Function;
use alloy_primitives::{Address, FixedBytes, I256};

use super::generic::split_list;
use super::{parse_bool, parse_bytes, parse_number, Coercer, CoercionError, NativeValue};
use crate::domain::chain::Chain;

const VOCABULARY: &[&str] = &[
    "address", "uint256", "int256", "bool", "string", "bytes", "bytes32", "number",
];

pub struct EvmCoercer;

impl Coercer for EvmCoercer {
    fn chain(&self) -> Chain {
        Chain::Evm
    }

    fn vocabulary(&self) -> &'static [&'static str] {
        VOCABULARY
    }

    /// Any parseable ABI type, plus the untyped `number`
    fn recognizes(&self, kind: &str) -> bool {
        kind == "number" || DynSolType::parse(kind).is_ok()
    }

    fn coerce_flat(&self, kind: &str, raw: &str) -> Result<NativeValue, CoercionError> {
        if kind == "number" {
            return parse_number(kind, raw);
        }
        let ty = DynSolType::parse(kind)
            .map_err(|e| CoercionError::invalid(kind, raw, e.to_string()))?;
        parse_sol_value(&ty, raw).map(from_sol_value)
    }

    fn is_bytes(&self, kind: &str) -> bool {
        kind == "bytes"
    }

    fn is_bool(&self, kind: &str) -> bool {
        kind == "bool"
    }
}

/// Parse text into an ABI value of type `ty`
pub fn parse_sol_value(ty: &DynSolType, raw: &str) -> Result<DynSolValue, CoercionError> {
    let kind = ty.sol_type_name();
    let arg = raw.trim();
    match ty {
        DynSolType::Address => Address::from_str(arg)
            .map(DynSolValue::Address)
            .map_err(|e| CoercionError::invalid(&kind, raw, e.to_string())),

        DynSolType::Bool => match parse_bool(&kind, arg)? {
            NativeValue::Bool(b) => Ok(DynSolValue::Bool(b)),
            _ => Err(CoercionError::invalid(&kind, raw, "expected true or false")),
        },

        DynSolType::Uint(size) => match super::parse_uint(&kind, arg, *size)? {
            NativeValue::Uint(v) => Ok(DynSolValue::Uint(v, *size)),
            _ => Err(CoercionError::invalid(&kind, raw, "expected an unsigned integer")),
        },

        DynSolType::Int(size) => match super::parse_int(&kind, arg, *size)? {
            NativeValue::Int(v) => Ok(DynSolValue::Int(v, *size)),
            _ => Err(CoercionError::invalid(&kind, raw, "expected an integer")),
        },

        DynSolType::Bytes => match parse_bytes(&kind, arg)? {
            NativeValue::Bytes(bytes) => Ok(DynSolValue::Bytes(bytes)),
            _ => Err(CoercionError::invalid(&kind, raw, "expected hex bytes")),
        },

        DynSolType::FixedBytes(size) => match parse_bytes(&kind, arg)? {
            NativeValue::Bytes(bytes) if bytes.len() == *size => {
                let mut word = [0u8; 32];
                word[..*size].copy_from_slice(&bytes);
                Ok(DynSolValue::FixedBytes(FixedBytes::from(word), *size))
            }
            NativeValue::Bytes(bytes) => Err(CoercionError::invalid(
                &kind,
                raw,
                format!("expected {} bytes, got {}", size, bytes.len()),
            )),
            _ => Err(CoercionError::invalid(&kind, raw, "expected hex bytes")),
        },

        DynSolType::String => {
            let quoted = arg.len() >= 2
                && ((arg.starts_with('"') && arg.ends_with('"'))
                    || (arg.starts_with('\'') && arg.ends_with('\'')));
            let s = if quoted { &arg[1..arg.len() - 1] } else { raw };
            Ok(DynSolValue::String(s.to_string()))
        }

        DynSolType::Array(inner) => {
            let items = list_items(&kind, arg)?;
            items
                .iter()
                .map(|item| parse_sol_value(inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::Array)
        }

        DynSolType::FixedArray(inner, size) => {
            let items = list_items(&kind, arg)?;
            if items.len() != *size {
                return Err(CoercionError::invalid(
                    &kind,
                    raw,
                    format!("expected {} elements, got {}", size, items.len()),
                ));
            }
            items
                .iter()
                .map(|item| parse_sol_value(inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::FixedArray)
        }

        DynSolType::Tuple(types) => {
            let body = arg
                .strip_prefix('(')
                .and_then(|rest| rest.strip_suffix(')'))
                .ok_or_else(|| {
                    CoercionError::invalid(&kind, raw, "tuple must be enclosed in parentheses")
                })?;
            let items = list_items(&kind, &format!("[{}]", body))?;
            if items.len() != types.len() {
                return Err(CoercionError::invalid(
                    &kind,
                    raw,
                    format!("expected {} elements, got {}", types.len(), items.len()),
                ));
            }
            types
                .iter()
                .zip(items.iter())
                .map(|(ty, item)| parse_sol_value(ty, item))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::Tuple)
        }

        _ => Err(CoercionError::invalid(&kind, raw, "unsupported ABI type")),
    }
}

fn list_items(kind: &str, arg: &str) -> Result<Vec<String>, CoercionError> {
    split_list(arg)
        .ok_or_else(|| CoercionError::invalid(kind, arg, "expected a bracketed list [a, b, ...]"))
}

/// Project an ABI value into the chain-neutral value set
pub fn from_sol_value(value: DynSolValue) -> NativeValue {
    match value {
        DynSolValue::Address(addr) => NativeValue::Address(addr.to_checksum(None)),
        DynSolValue::Bool(b) => NativeValue::Bool(b),
        DynSolValue::Uint(v, _) => NativeValue::Uint(v),
        DynSolValue::Int(v, _) => NativeValue::Int(v),
        DynSolValue::Bytes(bytes) => NativeValue::Bytes(bytes),
        DynSolValue::FixedBytes(word, size) => NativeValue::Bytes(word[..size].to_vec()),
        DynSolValue::String(s) => NativeValue::String(s),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            NativeValue::Array(items.into_iter().map(from_sol_value).collect())
        }
        other => NativeValue::String(format!("{:?}", other)),
    }
}

/// Rebuild an ABI value of type `ty` from a coerced argument
pub fn to_sol_value(ty: &DynSolType, value: &NativeValue) -> Result<DynSolValue, CoercionError> {
    let kind = ty.sol_type_name();
    let mismatch = || CoercionError::invalid(&kind, &format!("{:?}", value), "type mismatch");
    match (ty, value) {
        (DynSolType::Bool, NativeValue::Bool(b)) => Ok(DynSolValue::Bool(*b)),
        (DynSolType::Uint(size), v) => v
            .as_u256()
            .map(|n| DynSolValue::Uint(n, *size))
            .ok_or_else(mismatch),
        (DynSolType::Int(size), NativeValue::Int(v)) => Ok(DynSolValue::Int(*v, *size)),
        (DynSolType::Int(size), NativeValue::Uint(v)) => I256::try_from(*v)
            .map(|n| DynSolValue::Int(n, *size))
            .map_err(|_| mismatch()),
        (DynSolType::Bytes, NativeValue::Bytes(bytes)) => Ok(DynSolValue::Bytes(bytes.clone())),
        (DynSolType::FixedBytes(_), NativeValue::Bytes(bytes)) => {
            parse_sol_value(ty, &hex::encode(bytes))
        }
        (DynSolType::Array(inner), NativeValue::Array(items)) => items
            .iter()
            .map(|item| to_sol_value(inner, item))
            .collect::<Result<Vec<_>, _>>()
            .map(DynSolValue::Array),
        (DynSolType::FixedArray(inner, size), NativeValue::Array(items)) if items.len() == *size => {
            items
                .iter()
                .map(|item| to_sol_value(inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::FixedArray)
        }
        (DynSolType::Tuple(types), NativeValue::Array(items)) if items.len() == types.len() => types
            .iter()
            .zip(items)
            .map(|(ty, item)| to_sol_value(ty, item))
            .collect::<Result<Vec<_>, _>>()
            .map(DynSolValue::Tuple),
        (DynSolType::String, NativeValue::String(s)) => Ok(DynSolValue::String(s.clone())),
        (_, v) => match v.as_str() {
            Some(text) => parse_sol_value(ty, text),
            None => Err(mismatch()),
        },
    }
}

/// Selector followed by the ABI-encoded arguments
pub fn encode_call(function: &Function, args: &[NativeValue]) -> Result<Vec<u8>, CoercionError> {
    let signature = function.signature();
    if args.len() != function.inputs.len() {
        return Err(CoercionError::invalid(
            &signature,
            &format!("{} arguments", args.len()),
            format!("expected {} arguments", function.inputs.len()),
        ));
    }

    let mut calldata = function.selector().to_vec();
    if function.inputs.is_empty() {
        return Ok(calldata);
    }

    let values = function
        .inputs
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let ty = param
                .resolve()
                .map_err(|e| CoercionError::invalid(&param.ty, &param.name, e.to_string()))?;
            to_sol_value(&ty, arg)
        })
        .collect::<Result<Vec<_>, _>>()?;
    calldata.extend_from_slice(&DynSolValue::Tuple(values).abi_encode_params());
    Ok(calldata)
}

/// Decode the return data of `function`
pub fn decode_output(function: &Function, data: &[u8]) -> Result<Vec<NativeValue>, CoercionError> {
    let signature = function.signature();
    let types = function
        .outputs
        .iter()
        .map(|param| param.resolve())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CoercionError::invalid(&signature, "outputs", e.to_string()))?;
    if types.is_empty() {
        return Ok(Vec::new());
    }

    let decoded = DynSolType::Tuple(types)
        .abi_decode_params(data)
        .map_err(|e| CoercionError::invalid(&signature, &hex::encode(data), e.to_string()))?;
    match decoded {
        DynSolValue::Tuple(values) => Ok(values.into_iter().map(from_sol_value).collect()),
        other => Ok(vec![from_sol_value(other)]),
    }
}
