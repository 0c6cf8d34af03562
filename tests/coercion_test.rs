//! Argument coercion across chain vocabularies
//!
//! Coercion is pure: the same kind and text always yield the same value,
//! and a value that has already been coerced passes through untouched.

use alloy_primitives::U256;
use walletlab::core::{ChainContext, EngineError, ErrorKind, ExecutionOutcome, OperationKind};
use walletlab::core::{prepare, ImportedTemplate};
use walletlab::domain::argument::{ArgValue, Argument, ArgumentModel};
use walletlab::domain::chain::Chain;
use walletlab::domain::coerce::{coerce, coerce_value, Coercer, NativeValue};

fn state(kind: OperationKind, args: Vec<Argument>) -> ImportedTemplate {
    let mut state = ImportedTemplate::empty(kind);
    state.arguments = ArgumentModel::new(args, true);
    state
}

#[test]
fn test_numeric_and_fixed_point() {
    let flow = Chain::Flow.coercer();
    assert_eq!(
        coerce(flow, "UInt64", "42"),
        Ok(NativeValue::Uint(U256::from(42u64)))
    );
    assert_eq!(
        coerce(flow, "UFix64", "1.5"),
        Ok(NativeValue::Fixed("1.50000000".to_string()))
    );
    assert_eq!(
        coerce(Chain::Evm.coercer(), "uint256", "42"),
        Ok(NativeValue::Uint(U256::from(42u64)))
    );
}

#[test]
fn test_boolean_any_case() {
    assert_eq!(coerce(Chain::Flow.coercer(), "Bool", "TRUE"), Ok(NativeValue::Bool(true)));
    assert_eq!(coerce(Chain::Evm.coercer(), "bool", "False"), Ok(NativeValue::Bool(false)));
    assert!(coerce(Chain::Evm.coercer(), "bool", "yes").is_err());
}

#[test]
fn test_blank_required_boolean_is_missing() {
    let ctx = ChainContext::new(Chain::Flow);
    let state = state(OperationKind::ReadScript, vec![Argument::new("Bool")]);
    let err = prepare(&ctx, &state, &[]).unwrap_err();
    assert_eq!(
        err,
        EngineError::ArgumentsMissing {
            kind: OperationKind::ReadScript
        }
    );
    let ExecutionOutcome::Error(outcome) = ExecutionOutcome::error(&err) else {
        panic!("expected an error outcome");
    };
    assert_eq!(outcome.kind, ErrorKind::ArgumentsMissing);
    assert_eq!(outcome.message, "Script arguments are missing.");
}

#[test]
fn test_hex_bytes_decode() {
    assert_eq!(
        coerce(Chain::Evm.coercer(), "bytes", "48656c6c6f"),
        Ok(NativeValue::Bytes(b"Hello".to_vec()))
    );
    assert_eq!(
        coerce(Chain::Aptos.coercer(), "bytes", "0x48656c6c6f"),
        Ok(NativeValue::Bytes(b"Hello".to_vec()))
    );
    assert!(coerce(Chain::Evm.coercer(), "bytes", "4865f").is_err());
}

#[test]
fn test_coercion_is_pure() {
    for chain in Chain::ALL {
        let coercer = chain.coercer();
        for kind in coercer.vocabulary() {
            for raw in ["1", "0x01", "[1, 2]", "TRUE", "abc"] {
                assert_eq!(coerce(coercer, kind, raw), coerce(coercer, kind, raw));
            }
        }
    }
}

#[test]
fn test_native_values_pass_through() {
    let value = NativeValue::Bytes(b"Hello".to_vec());
    let coerced = coerce_value(
        Chain::Evm.coercer(),
        "bytes",
        &ArgValue::Native(value.clone()),
    );
    assert_eq!(coerced, Ok(value));
}

#[test]
fn test_generic_containers() {
    let flow = Chain::Flow.coercer();
    assert_eq!(
        coerce(flow, "Array(UInt8)", "[1, 2]"),
        Ok(NativeValue::Array(vec![
            NativeValue::Uint(U256::from(1u64)),
            NativeValue::Uint(U256::from(2u64)),
        ]))
    );
    assert_eq!(coerce(flow, "Optional(String)", ""), Ok(NativeValue::Optional(None)));
}

#[test]
fn test_bad_input_names_argument() {
    let ctx = ChainContext::new(Chain::Evm);
    let state = state(
        OperationKind::ContractCall,
        vec![Argument::new("uint8").with_name("amount").with_value("300")],
    );
    let err = prepare(&ctx, &state, &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Coercion);
    assert!(err.to_string().starts_with("argument #1 (amount)"));
}

#[test]
fn test_hex_prefix_without_digits_rejected() {
    assert!(coerce(Chain::Flow.coercer(), "UInt64", "0x").is_err());
    assert!(coerce(Chain::Evm.coercer(), "uint256", "0x").is_err());
    assert!(coerce(Chain::Aptos.coercer(), "u64", "0x").is_err());
    assert!(coerce(Chain::Evm.coercer(), "number", "0x").is_err());
    assert!(coerce(Chain::Flow.coercer(), "Array(UInt8)", "[0x_]").is_err());
}

#[test]
fn test_hex_accepted_for_signed_and_unsigned() {
    let flow = Chain::Flow.coercer();
    assert_eq!(
        coerce(flow, "UInt8", "0x10"),
        Ok(NativeValue::Uint(U256::from(16u64)))
    );
    assert_eq!(
        coerce(flow, "Int8", "0x10"),
        Ok(NativeValue::Int(alloy_primitives::I256::try_from(16i64).unwrap()))
    );
    assert!(coerce(flow, "Int8", "0x80").is_err());
}
