//! EVM templates: native sends, message signing, demo contract calls and
//! ERC-4337 user operations

use std::sync::Arc;

use alloy_json_abi::{Function, StateMutability};
use alloy_primitives::Address;
use serde_json::{json, Map, Value};

use crate::core::error::CallError;
use crate::core::outcome::{CallbackResult, SubmittedTransaction};
use crate::core::request::{callback, ExecutionCallback, ExecutionRequest, OperationKind};
use crate::core::template::{Catalog, EditorProfile, Template, TemplateGroup};
use crate::domain::argument::Argument;
use crate::domain::chain::Chain;
use crate::domain::coerce::{parse_u256, NativeValue};
use crate::domain::info::{AuxiliaryInfo, InfoEntry, InfoGroup};
use crate::infrastructure::{EvmClient, ReceiptWatch, SignMethod};

/// Demo value-store contract
pub const DEMO_CONTRACT: &str = "0xFB9688306D687F16C6d658Fa2A04e0fB59071212";

const TYPED_DATA_V3: &str = r#"{"types":{"EIP712Domain":[{"name":"name","type":"string"},{"name":"version","type":"string"},{"name":"chainId","type":"uint256"},{"name":"verifyingContract","type":"address"}],"Person":[{"name":"name","type":"string"},{"name":"wallet","type":"address"}],"Mail":[{"name":"from","type":"Person"},{"name":"to","type":"Person"},{"name":"contents","type":"string"}]},"primaryType":"Mail","domain":{"name":"Ether Mail","version":"1","chainId":4,"verifyingContract":"0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"},"message":{"from":{"name":"Cow","wallet":"0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"},"to":{"name":"Bob","wallet":"0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"},"contents":"Hello, Bob!"}}"#;

const TYPED_DATA_V4: &str = r#"{"domain":{"chainId":4,"name":"Ether Mail","verifyingContract":"0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC","version":"1"},"message":{"contents":"Hello, Bob!","from":{"name":"Cow","wallets":["0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826","0xDeaDbeefdEAdbeefdEadbEEFdeadbeEFdEaDbeeF"]},"to":[{"name":"Bob","wallets":["0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB","0xB0BdaBea57B0BDABeA57b0bdABEA57b0BDabEa57","0xB0B0b0b0b0b0B000000000000000000000000000"]}]},"primaryType":"Mail","types":{"EIP712Domain":[{"name":"name","type":"string"},{"name":"version","type":"string"},{"name":"chainId","type":"uint256"},{"name":"verifyingContract","type":"address"}],"Group":[{"name":"name","type":"string"},{"name":"members","type":"Person[]"}],"Mail":[{"name":"from","type":"Person"},{"name":"to","type":"Person[]"},{"name":"contents","type":"string"}],"Person":[{"name":"name","type":"string"},{"name":"wallets","type":"address[]"}]}}"#;

fn submitted(client: &Arc<EvmClient>, hash: String) -> CallbackResult {
    let watch = Arc::new(ReceiptWatch::new(Arc::clone(client)));
    CallbackResult::Submitted(
        SubmittedTransaction::new(hash.clone(), json!({ "transactionHash": hash })).with_watch(watch),
    )
}

fn info_text<'a>(info: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    info.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Wei amount as a hex quantity
fn quantity(raw: &str) -> Result<String, CallError> {
    parse_u256(raw)
        .map(|v| format!("0x{v:x}"))
        .ok_or_else(|| CallError::new(format!("Invalid amount: {raw}")))
}

fn send_native(client: Arc<EvmClient>) -> Arc<dyn ExecutionCallback> {
    callback(move |_ctx, request| {
        let client = Arc::clone(&client);
        async move {
            let ExecutionRequest::Transaction { args, .. } = request else {
                return Err(CallError::new("Expected a transaction request"));
            };
            let to = args
                .get("receipient")
                .and_then(NativeValue::as_str)
                .ok_or_else(|| CallError::new("Recipient is required"))?
                .to_string();
            let amount = args
                .get("amount")
                .and_then(NativeValue::as_u256)
                .ok_or_else(|| CallError::new("Amount is required"))?;
            let tx = json!({ "to": to, "value": format!("0x{amount:x}") });
            let hash = client.send_transaction(tx).await?;
            Ok(submitted(&client, hash))
        }
    })
}

/// Message text as the hex payload `eth_sign` and `personal_sign` expect
fn message_hex(message: &str) -> String {
    let is_hex = message
        .strip_prefix("0x")
        .is_some_and(|h| h.len() % 2 == 0 && h.chars().all(|c| c.is_ascii_hexdigit()));
    if is_hex {
        message.to_string()
    } else {
        format!("0x{}", hex::encode(message.as_bytes()))
    }
}

fn sign(client: Arc<EvmClient>, method: SignMethod) -> Arc<dyn ExecutionCallback> {
    callback(move |_ctx, request| {
        let client = Arc::clone(&client);
        async move {
            let message = request
                .args()
                .and_then(|args| args.first_text())
                .ok_or_else(|| CallError::new("Message is required"))?;
            let payload = match method {
                SignMethod::EthSign | SignMethod::PersonalSign => {
                    Value::String(message_hex(&message))
                }
                SignMethod::TypedDataV3 | SignMethod::TypedDataV4 => {
                    serde_json::from_str(&message).unwrap_or(Value::String(message))
                }
            };
            let signature = client.sign(method, payload).await?;
            Ok(CallbackResult::Value(json!({ "signature": signature })))
        }
    })
}

fn contract_call(client: Arc<EvmClient>) -> Arc<dyn ExecutionCallback> {
    callback(move |_ctx, request| {
        let client = Arc::clone(&client);
        async move {
            let ExecutionRequest::ContractCall { info, args } = request else {
                return Err(CallError::new("Expected a contract call"));
            };
            let address: Address = info_text(&info, "contractAddress")
                .ok_or_else(|| CallError::new("Contract address is required"))?
                .parse()
                .map_err(|e| CallError::new(format!("Invalid contract address: {e}")))?;
            let signature = info_text(&info, "method")
                .ok_or_else(|| CallError::new("Method signature is required"))?;
            let function = Function::parse(signature)
                .map_err(|e| CallError::new(format!("Invalid method signature: {e}")))?;
            let values: Vec<NativeValue> = args.values().into_iter().cloned().collect();

            if matches!(
                function.state_mutability,
                StateMutability::View | StateMutability::Pure
            ) {
                let outputs = client.call_function(address, &function, &values).await?;
                let result = match outputs.as_slice() {
                    [single] => single.to_json(),
                    many => Value::Array(many.iter().map(NativeValue::to_json).collect()),
                };
                return Ok(CallbackResult::Value(result));
            }

            let value = info_text(&info, "value").map(quantity).transpose()?;
            let hash = client
                .transact_function(address, &function, &values, value)
                .await?;
            Ok(submitted(&client, hash))
        }
    })
}

fn contract_info(address: &str, method: &str) -> AuxiliaryInfo {
    AuxiliaryInfo::contract(
        InfoGroup::default()
            .with(
                "contractAddress",
                InfoEntry::new(address).with_comment("contract address"),
            )
            .with("method", InfoEntry::new(method).with_comment("method signature"))
            .with("value", InfoEntry::new("").with_comment("value (wei)")),
    )
}

fn user_operation_args() -> Vec<Argument> {
    let number = |name: &str| {
        Argument::new("number")
            .with_name(name)
            .with_comment(name)
            .optional()
    };
    vec![
        Argument::new("string")
            .with_name("callData")
            .with_comment("call data (hex)"),
        number("callGasLimit"),
        number("verificationGasLimit"),
        number("preVerificationGas"),
        number("maxFeePerGas"),
        number("maxPriorityFeePerGas"),
        Argument::new("string")
            .with_name("paymasterAndData")
            .with_comment("paymasterAndData")
            .optional(),
        Argument::new("string")
            .with_name("sender")
            .with_comment("sender")
            .optional(),
    ]
}

pub fn catalog(client: Arc<EvmClient>) -> Catalog {
    let contract = contract_call(Arc::clone(&client));
    let demo = |method: &str, args: Vec<Argument>| {
        Template::new(OperationKind::ContractCall)
            .with_auxiliary(contract_info(DEMO_CONTRACT, method))
            .with_args(args)
            .with_callback(Arc::clone(&contract))
    };
    let new_value = |comment: &str| {
        vec![Argument::new("uint256")
            .with_name("value")
            .with_comment(comment)]
    };

    let transactions = TemplateGroup::new("Transactions").with(
        "sendETH",
        Template::new(OperationKind::Transaction)
            .with_args(vec![
                Argument::new("uint256")
                    .with_name("amount")
                    .with_comment("amount(wei)"),
                Argument::new("address")
                    .with_name("receipient")
                    .with_comment("receipient"),
            ])
            .with_callback(send_native(Arc::clone(&client)))
            .signing(),
    );

    let message = |value: &str| {
        vec![Argument::new("string")
            .with_comment("message")
            .with_value(value)]
    };
    let sign_template = |method: SignMethod, value: &str| {
        Template::new(OperationKind::SignMessage)
            .with_args(message(value))
            .with_callback(sign(Arc::clone(&client), method))
            .fixed_shape()
    };
    let signing = TemplateGroup::new("Sign Message")
        .with("signMessageEth", sign_template(SignMethod::EthSign, ""))
        .with(
            "signMessagePersonal",
            sign_template(SignMethod::PersonalSign, ""),
        )
        .with(
            "signV3TypedData",
            sign_template(SignMethod::TypedDataV3, TYPED_DATA_V3),
        )
        .with(
            "signV4TypedData",
            sign_template(SignMethod::TypedDataV4, TYPED_DATA_V4),
        );

    let interact = TemplateGroup::new("Interact With Contract")
        .with(
            "getValue",
            demo("function value() view returns (uint256)", Vec::new()),
        )
        .with(
            "getValue2",
            demo("function value2() view returns (uint256)", Vec::new()),
        )
        .with(
            "setValue",
            demo(
                "function setValue(uint256 newValue)",
                new_value("value(number)"),
            ),
        )
        .with(
            "setValue2",
            demo(
                "function setValue2(uint256 newValue)",
                new_value("value2(number)"),
            ),
        )
        .with(
            "callContract",
            Template::new(OperationKind::ContractCall)
                .with_description("Call any contract method by its signature")
                .with_auxiliary(contract_info("", ""))
                .with_callback(Arc::clone(&contract)),
        );

    let user_operations = TemplateGroup::new("User Operations").with(
        "sendTokenWithOperation",
        Template::new(OperationKind::UserOperation)
            .with_description("Send token with userOperation")
            .with_args(user_operation_args())
            .signing()
            .fixed_shape(),
    );

    let profile = EditorProfile {
        disabled_kinds: vec![OperationKind::ReadScript, OperationKind::ResourceRead],
        default_kind: OperationKind::Transaction,
        clear_body: true,
        ..EditorProfile::default()
    };

    Catalog::new(Chain::Evm, profile)
        .with_group(transactions)
        .with_group(signing)
        .with_group(interact)
        .with_group(user_operations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dispatch::prepare;
    use crate::core::request::ChainContext;
    use crate::domain::coerce::evm::encode_call;
    use crate::domain::info::InfoFamily;
    use alloy_primitives::U256;
    use alloy_sol_types::SolCall;

    alloy_sol_types::sol! {
        contract ValueStore {
            function value() external view returns (uint256);
            function setValue(uint256 newValue) external;
        }
    }

    fn evm_catalog() -> Catalog {
        catalog(Arc::new(EvmClient::connect("http://127.0.0.1:1").unwrap()))
    }

    #[test]
    fn test_demo_signatures_match_bindings() {
        let catalog = evm_catalog();
        let ctx = ChainContext::new(Chain::Evm);

        let state = catalog.find_path("Interact With Contract/setValue").unwrap().import(&ctx);
        let signature = state.auxiliary.get(InfoFamily::Contract, "method").unwrap();
        let function = Function::parse(signature).unwrap();
        let encoded = encode_call(&function, &[NativeValue::Uint(U256::from(7u64))]).unwrap();
        let expected = ValueStore::setValueCall {
            newValue: U256::from(7u64),
        }
        .abi_encode();
        assert_eq!(encoded, expected);

        let getter = catalog.find_path("getValue").unwrap().import(&ctx);
        let function =
            Function::parse(getter.auxiliary.get(InfoFamily::Contract, "method").unwrap()).unwrap();
        assert_eq!(function.state_mutability, StateMutability::View);
        assert_eq!(function.selector().0, ValueStore::valueCall::SELECTOR);
    }

    #[test]
    fn test_message_hex() {
        assert_eq!(message_hex("Hello"), "0x48656c6c6f");
        assert_eq!(message_hex("0xdeadbeef"), "0xdeadbeef");
        assert_eq!(message_hex("0xabc"), "0x3078616263");
    }

    #[test]
    fn test_quantity() {
        assert_eq!(quantity("1000").unwrap(), "0x3e8");
        assert!(quantity("ten").is_err());
    }

    #[test]
    fn test_user_operation_request() {
        let catalog = evm_catalog();
        let ctx = ChainContext::new(Chain::Evm);
        let mut state = catalog.find_path("sendTokenWithOperation").unwrap().import(&ctx);
        assert!(state.arguments.push(Argument::new("string")).is_err());
        state.arguments.set_named("callData", "0xdeadbeef");
        state.arguments.set_named("callGasLimit", "21000");

        let ExecutionRequest::UserOperation(op) = prepare(&ctx, &state, &[]).unwrap() else {
            panic!("expected a user operation");
        };
        assert_eq!(op.call_data, "0xdeadbeef");
        assert_eq!(op.call_gas_limit, Some(U256::from(21000u64)));
        assert_eq!(op.sender, None);
    }

    #[test]
    fn test_profile() {
        let catalog = evm_catalog();
        assert_eq!(catalog.profile.default_kind, OperationKind::Transaction);
        assert!(!catalog.profile.is_enabled(OperationKind::ReadScript));
        let names: Vec<&str> = catalog.entries().map(|(_, n, _)| n).collect();
        assert_eq!(names.len(), 11);
    }
}
