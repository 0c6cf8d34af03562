//! Aptos templates: script payloads, entry functions, message signing and
//! resource reads

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::catalog::{account_or_placeholder, preview};
use crate::core::error::CallError;
use crate::core::outcome::CallbackResult;
use crate::core::request::{
    callback, CoercedArgs, ExecutionCallback, ExecutionRequest, OperationKind,
};
use crate::core::template::{Catalog, EditorProfile, Template, TemplateGroup};
use crate::domain::argument::Argument;
use crate::domain::chain::Chain;
use crate::domain::coerce::aptos::TYPE_ARG;
use crate::domain::coerce::{width_suffix, NativeValue};
use crate::domain::info::{AuxiliaryInfo, InfoEntry, InfoFormat, InfoGroup};
use crate::infrastructure::AptosClient;

/// Account publishing the demo `hero` and `hello_world` modules
pub const DEMO_MODULES: &str = "0x4282ed29feb89781cd4da44a5bb1d23ff7e31a9dd64536233792efe78b4a494d";
pub const COIN_STORE: &str = "0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>";

const TRANSFER_BYTECODE: &str = "0xa11ceb0b0500000005010002030205050706070d170824200000000100010003060c0503000d6170746f735f6163636f756e74087472616e736665720000000000000000000000000000000000000000000000000000000000000001000001050b000b010b02110002";
const SEND_ARGUMENTS_BYTECODE: &str = "0xa11ceb0b0500000006010006020604030a0a051426073a35086f6000000101020200030700010403010002050402000b0c0c01020304050a020a020a020800010a0300010a020a0c01020304050a020a020a03080006737472696e67057574696c730b68656c6c6f5f776f726c6406537472696e6707746f5f753634730c646f67655f69735f646f70650000000000000000000000000000000000000000000000000000000000000001453da6fd658eef417b758a9d4263a70edd527ddc204357b3cb97635d3d4d2a25db0811ac77320edb8a76520cea79af8850d2e9ca56f6cbf81dbbfd1279abe99a0000010f0b0911000c0b0b010b020b030b040b050b060b070b080b0b0b0a110102";

/// Move JSON: integers wider than 32 bits travel as strings
fn move_json(kind: &str, value: &NativeValue) -> Value {
    match value {
        NativeValue::Uint(v) => match width_suffix(kind, "u") {
            Some(bits) if bits <= 32 => value.to_json(),
            _ => Value::String(v.to_string()),
        },
        other => other.to_json(),
    }
}

/// `(type_arguments, arguments)` in declaration order
fn payload_args(args: &CoercedArgs) -> (Vec<Value>, Vec<Value>) {
    let (qualifiers, values): (Vec<_>, Vec<_>) = args.iter().partition(|a| a.type_qualifier);
    (
        qualifiers.iter().map(|a| a.value.to_json()).collect(),
        values.iter().map(|a| move_json(&a.kind, &a.value)).collect(),
    )
}

fn info_text<'a>(info: &'a Map<String, Value>, key: &str) -> Result<&'a str, CallError> {
    info.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CallError::new(format!("{key} is required")))
}

fn script_payload() -> Arc<dyn ExecutionCallback> {
    callback(|ctx, request| async move {
        let ExecutionRequest::ReadScript { args, info, abi, .. } = request else {
            return Err(CallError::new("Expected a script request"));
        };
        let (type_arguments, arguments) = payload_args(&args);
        Ok(preview(
            "aptos_script_payload",
            json!({
                "sender": account_or_placeholder(&ctx),
                "type": "script_payload",
                "code": { "bytecode": info_text(&info, "bytecode")?, "abi": abi },
                "type_arguments": type_arguments,
                "arguments": arguments,
            }),
        ))
    })
}

fn entry_function() -> Arc<dyn ExecutionCallback> {
    callback(|ctx, request| async move {
        let ExecutionRequest::ContractCall { info, args } = request else {
            return Err(CallError::new("Expected a contract call"));
        };
        let function = format!(
            "{}::{}",
            info_text(&info, "moduleName")?,
            info_text(&info, "method")?
        );
        let (type_arguments, arguments) = payload_args(&args);
        Ok(preview(
            "aptos_entry_function",
            json!({
                "sender": account_or_placeholder(&ctx),
                "type": "entry_function_payload",
                "function": function,
                "type_arguments": type_arguments,
                "arguments": arguments,
            }),
        ))
    })
}

/// Wallet-standard message: `APTOS` header, the requested fields, then
/// message and nonce
fn full_message(ctx_account: &str, chain_id: u8, args: &CoercedArgs) -> String {
    let flag = |name: &str| matches!(args.get(name), Some(NativeValue::Bool(true)));
    let text = |name: &str| {
        args.get(name)
            .and_then(NativeValue::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let mut lines = vec!["APTOS".to_string()];
    if flag("address") {
        lines.push(format!("address: {ctx_account}"));
    }
    if flag("application") {
        lines.push("application: walletlab".to_string());
    }
    if flag("chainId") {
        lines.push(format!("chainId: {chain_id}"));
    }
    lines.push(format!("message: {}", text("message")));
    lines.push(format!("nonce: {}", text("nonce")));
    lines.join("\n")
}

fn sign_message() -> Arc<dyn ExecutionCallback> {
    callback(|ctx, request| async move {
        let ExecutionRequest::SignMessage { args } = request else {
            return Err(CallError::new("Expected a sign message request"));
        };
        let account = account_or_placeholder(&ctx);
        let mut payload = Value::Object(args.named());
        payload["fullMessage"] = Value::String(full_message(&account, 2, &args));
        Ok(preview("aptos_sign_message", payload))
    })
}

fn read_resource(client: Arc<AptosClient>) -> Arc<dyn ExecutionCallback> {
    callback(move |_ctx, request| {
        let client = Arc::clone(&client);
        async move {
            let ExecutionRequest::ResourceRead { args } = request else {
                return Err(CallError::new("Expected a resource request"));
            };
            let values = args.values();
            let (Some(address), Some(resource_type)) = (
                values.first().and_then(|v| v.as_str()),
                values.get(1).and_then(|v| v.as_str()),
            ) else {
                return Err(CallError::new("Address and resource type are required"));
            };
            let data = client.resource(address, resource_type).await?;
            Ok(CallbackResult::Value(data.unwrap_or(Value::Null)))
        }
    })
}

fn script_abi(params: &str) -> InfoGroup {
    InfoGroup::default()
        .with("name", InfoEntry::new("main").with_comment("Move function name"))
        .with(
            "visibility",
            InfoEntry::new("public")
                .with_comment("Move function visibility (private / public / friend)"),
        )
        .with(
            "is_entry",
            InfoEntry::new("true")
                .with_comment("Whether the function can be called as an entry function directly in a transaction")
                .with_format(InfoFormat::Bool),
        )
        .with(
            "generic_type_params",
            InfoEntry::new("[]")
                .with_comment("Generic type params associated with the Move function")
                .with_format(InfoFormat::JsonList),
        )
        .with(
            "params",
            InfoEntry::new(params)
                .with_comment("Parameters associated with the move function")
                .with_format(InfoFormat::JsonList),
        )
        .with(
            "return",
            InfoEntry::new("[]")
                .with_comment("Return type of the function")
                .with_format(InfoFormat::JsonList),
        )
}

fn script_info(bytecode: &str, params: &str) -> AuxiliaryInfo {
    AuxiliaryInfo::script(
        InfoGroup::default().with(
            "bytecode",
            InfoEntry::new(bytecode).with_comment("Move script bytecode"),
        ),
        script_abi(params),
    )
}

fn module_info(module: &str, method: &str) -> AuxiliaryInfo {
    AuxiliaryInfo::contract(
        InfoGroup::default()
            .with("moduleName", InfoEntry::new(module).with_comment("module name"))
            .with("method", InfoEntry::new(method).with_comment("method")),
    )
}

fn arg(kind: &str, name: &str, value: &str) -> Argument {
    Argument::new(kind)
        .with_name(name)
        .with_comment(name)
        .with_value(value)
}

fn send_arguments_args() -> Vec<Argument> {
    vec![
        arg("boolean", "bool", "false"),
        arg("u8", "u8", "123"),
        arg("u64", "u64", "123"),
        arg("u128", "u128", "123"),
        arg(
            "address",
            "address",
            "0xdb0811ac77320edb8a76520cea79af8850d2e9ca56f6cbf81dbbfd1279abe99a",
        ),
        arg("string", "vector<u8> (plain text)", "abcde"),
        arg("array", "vector<u8> (uint8 array)", "[97, 98, 99, 100, 101]"),
        arg("array", "vector<u64>", "[1, 2, 3]"),
        arg("string", "0x1::string::String", "foo"),
    ]
}

const NFT_OBJECT: &str = "0x551fbed4b345a137d850447e6306843fcdb27da49f44dea373a08d194075932f";
const NFT_OBJECTS: &str = r#"["0x551fbed4b345a137d850447e6306843fcdb27da49f44dea373a08d194075932f","0x83ed72471daf45a685a81f68f43d5f7766479b886093c4643df07d785c1edfc1"]"#;

pub fn catalog(client: Arc<AptosClient>) -> Catalog {
    let script = script_payload();
    let entry = entry_function();
    let module = |name: &str, method: &str, description: &str, args: Vec<Argument>| {
        Template::new(OperationKind::ContractCall)
            .with_description(description)
            .with_auxiliary(module_info(name, method))
            .with_args(args)
            .with_callback(Arc::clone(&entry))
    };
    let hero = format!("{DEMO_MODULES}::hero");
    let hello_world = format!("{DEMO_MODULES}::hello_world");

    let scripts = TemplateGroup::new("Script")
        .with(
            "transferTokenScript",
            Template::new(OperationKind::ReadScript)
                .with_description("Transfer token by sending a script payload transaction")
                .with_auxiliary(script_info(TRANSFER_BYTECODE, r#"["&signer", "address", "u64"]"#))
                .with_args(vec![
                    Argument::new("address")
                        .with_name("recipient")
                        .with_comment("recipient"),
                    Argument::new("number").with_name("value").with_comment("value"),
                ])
                .with_callback(Arc::clone(&script)),
        )
        .with(
            "sendArgumentScript",
            Template::new(OperationKind::ReadScript)
                .with_description("send argument test by sending a script payload transaction")
                .with_auxiliary(script_info(
                    SEND_ARGUMENTS_BYTECODE,
                    r#"["signer","signer","bool","u8","u64","u128","address","vector<u8>","vector<u8>","vector<u8>","0x1::string::String"]"#,
                ))
                .with_args(send_arguments_args())
                .with_callback(Arc::clone(&script)),
        );

    let modules = TemplateGroup::new("Modules")
        .with(
            "transferAptosCoin",
            module(
                "0x1::coin",
                "transfer",
                "Transfer Aptos coin to other address",
                vec![
                    Argument::new(TYPE_ARG)
                        .with_comment("coin type")
                        .with_value("0x1::aptos_coin::AptosCoin"),
                    Argument::new("address")
                        .with_name("recipient")
                        .with_comment("recipient"),
                    Argument::new("u64").with_name("value").with_comment("value"),
                ],
            ),
        )
        .with(
            "sendArguments",
            module(
                &hello_world,
                "doge_is_dope",
                "Send all kinds of arguments to the contract to see if it works as expected",
                send_arguments_args(),
            ),
        )
        .with(
            "mintNFT",
            module(
                &hero,
                "mint",
                "Mint Aptos v2 NFT",
                vec![
                    arg("string", "description", "My hero"),
                    arg("string", "gender", "Female"),
                    arg("string", "name", "Phoenix Flamestride"),
                    arg("string", "race", "Cinderkin"),
                    arg("string", "uri", "https://placedog.net/500?r"),
                ],
            ),
        )
        .with(
            "sendTxWithNFT",
            module(
                &hero,
                "summon_hero",
                "Send tx with object arguments",
                vec![
                    arg("object", "hero", NFT_OBJECT),
                    arg("object", "equipment", NFT_OBJECTS),
                ],
            ),
        )
        .with(
            "logGenerics",
            module(
                &hello_world,
                "log_generics",
                "Send tx with generic object arguments",
                vec![
                    Argument::new(TYPE_ARG)
                        .with_comment("object type")
                        .with_value(format!("{DEMO_MODULES}::hero::Hero")),
                    arg("object", "object", NFT_OBJECT),
                    arg("object", "objects", NFT_OBJECTS),
                ],
            ),
        )
        .with(
            "triggerError",
            module(
                &hello_world,
                "arithmetic_error_entry",
                "Trigger an error with the contract method",
                vec![Argument::new("u64")
                    .with_name("value")
                    .with_comment("Input below 100 can trigger an error")],
            ),
        );

    let sign = TemplateGroup::new("Sign Message").with(
        "signMessage",
        Template::new(OperationKind::SignMessage)
            .with_args(vec![
                Argument::new("string").with_name("message").with_comment("message"),
                Argument::new("string").with_name("nonce").with_comment("nonce"),
                Argument::new("boolean")
                    .with_name("address")
                    .with_comment("address (Optional)")
                    .optional(),
                Argument::new("boolean")
                    .with_name("chainId")
                    .with_comment("chainId (Optional)")
                    .optional(),
                Argument::new("boolean")
                    .with_name("application")
                    .with_comment("application (Optional)")
                    .optional(),
            ])
            .with_callback(sign_message())
            .fixed_shape(),
    );

    let resource = TemplateGroup::new("Resource").with(
        "getAptosBalance",
        Template::new(OperationKind::ResourceRead)
            .with_args(vec![
                Argument::new("string").with_comment("address"),
                Argument::new("string")
                    .with_comment("resource key")
                    .with_value(COIN_STORE),
            ])
            .with_callback(read_resource(client))
            .fixed_shape(),
    );

    let profile = EditorProfile {
        disabled_kinds: vec![OperationKind::ReadScript, OperationKind::Transaction],
        default_kind: OperationKind::ContractCall,
        autoload_kinds: vec![OperationKind::SignMessage, OperationKind::ContractCall],
        extra_signers: true,
        clear_body: true,
    };

    Catalog::new(Chain::Aptos, profile)
        .with_group(scripts)
        .with_group(modules)
        .with_group(sign)
        .with_group(resource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dispatch::prepare;
    use crate::core::request::ChainContext;

    fn aptos_catalog() -> Catalog {
        catalog(Arc::new(AptosClient::new("http://127.0.0.1:1").unwrap()))
    }

    async fn run(
        callback: Arc<dyn ExecutionCallback>,
        ctx: &ChainContext,
        path: &str,
        edit: impl FnOnce(&mut crate::core::template::ImportedTemplate),
    ) -> Value {
        let catalog = aptos_catalog();
        let mut state = catalog.find_path(path).unwrap().import(ctx);
        edit(&mut state);
        let request = prepare(ctx, &state, &[]).unwrap();
        match callback.execute(ctx, request).await.unwrap() {
            CallbackResult::Value(value) => value,
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_entry_function_splits_type_args() {
        let ctx = ChainContext::new(Chain::Aptos).with_account("0x1");
        let value = run(entry_function(), &ctx, "Modules/transferAptosCoin", |state| {
            state.arguments.set_named("recipient", "0xA");
            state.arguments.set_named("value", "100");
        })
        .await;
        let payload = &value["payload"];
        assert_eq!(payload["function"], "0x1::coin::transfer");
        assert_eq!(payload["type_arguments"], json!(["0x1::aptos_coin::AptosCoin"]));
        assert_eq!(payload["arguments"], json!(["0xa", "100"]));
    }

    #[tokio::test]
    async fn test_script_payload_formats_abi() {
        let ctx = ChainContext::new(Chain::Aptos);
        let value = run(script_payload(), &ctx, "Script/sendArgumentScript", |_| {}).await;
        let payload = &value["payload"];
        assert_eq!(payload["code"]["abi"]["is_entry"], json!(true));
        assert_eq!(payload["code"]["abi"]["params"][2], "bool");
        assert_eq!(payload["code"]["bytecode"], SEND_ARGUMENTS_BYTECODE);
        let arguments = payload["arguments"].as_array().unwrap();
        assert_eq!(arguments[0], json!(false));
        assert_eq!(arguments[1], json!(123));
        assert_eq!(arguments[2], "123");
        assert_eq!(arguments[6], json!([97, 98, 99, 100, 101]));
    }

    #[tokio::test]
    async fn test_sign_message_full_message() {
        let ctx = ChainContext::new(Chain::Aptos).with_account("0x1");
        let value = run(sign_message(), &ctx, "signMessage", |state| {
            state.arguments.set_named("message", "hello");
            state.arguments.set_named("nonce", "42");
            state.arguments.set_named("chainId", "TRUE");
        })
        .await;
        let payload = &value["payload"];
        assert_eq!(payload["address"], json!(false));
        assert_eq!(
            payload["fullMessage"],
            "APTOS\nchainId: 2\nmessage: hello\nnonce: 42"
        );
    }

    #[test]
    fn test_profile_autoloads_contract() {
        let catalog = aptos_catalog();
        assert_eq!(catalog.profile.default_kind, OperationKind::ContractCall);
        assert_eq!(
            catalog.first_for_kind(OperationKind::ContractCall).map(|t| t.description.clone()),
            Some(Some("Transfer Aptos coin to other address".to_string()))
        );
    }
}
