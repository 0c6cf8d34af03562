//! Solana templates: SOL transfer and the counter program

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::catalog::{account_or_placeholder, preview};
use crate::core::error::CallError;
use crate::core::outcome::CallbackResult;
use crate::core::request::{callback, ExecutionCallback, ExecutionRequest, OperationKind};
use crate::core::template::{Catalog, EditorProfile, Template, TemplateGroup};
use crate::domain::argument::Argument;
use crate::domain::chain::Chain;
use crate::domain::info::{AuxiliaryInfo, InfoEntry, InfoGroup};
use crate::infrastructure::{ProgramLayout, SolanaClient};

pub const SYSTEM_PROGRAM: &str = "11111111111111111111111111111111";
pub const MEMO_PROGRAM: &str = "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr";
const COUNTER_LAYOUT: &str = r#"[{"name":"is_init","type":"u8"},{"name":"value","type":"u32"}]"#;

fn info_text<'a>(info: &'a Map<String, Value>, key: &str) -> Result<&'a str, CallError> {
    info.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CallError::new(format!("{key} is required")))
}

fn layout(info: &Map<String, Value>) -> Result<ProgramLayout, CallError> {
    Ok(ProgramLayout::parse(info_text(info, "struct")?)?)
}

fn send_sol() -> Arc<dyn ExecutionCallback> {
    callback(|ctx, request| async move {
        let ExecutionRequest::Transaction { args, .. } = request else {
            return Err(CallError::new("Expected a transaction request"));
        };
        let named = args.named();
        let from = account_or_placeholder(&ctx);
        Ok(preview(
            "solana_transaction",
            json!({
                "feePayer": from,
                "instructions": [{
                    "programId": SYSTEM_PROGRAM,
                    "type": "transfer",
                    "fromPubkey": from,
                    "toPubkey": named.get("receipient").cloned().unwrap_or(Value::Null),
                    "lamports": named.get("amount").cloned().unwrap_or(Value::Null),
                }],
            }),
        ))
    })
}

fn partial_sign(instruction_count: usize) -> Arc<dyn ExecutionCallback> {
    callback(move |ctx, _request| async move {
        let from = account_or_placeholder(&ctx);
        let memo = json!({
            "programId": MEMO_PROGRAM,
            "keys": [
                { "pubkey": from, "isSigner": false, "isWritable": true },
                { "pubkey": "<new keypair>", "isSigner": true, "isWritable": true },
            ],
            "data": "Data to send in transaction",
        });
        let instructions = vec![memo; instruction_count];
        Ok(preview(
            "solana_partial_sign",
            json!({
                "feePayer": from,
                "instructions": instructions,
                "partialSigners": ["<new keypair>"],
            }),
        ))
    })
}

fn read_account(client: Arc<SolanaClient>) -> Arc<dyn ExecutionCallback> {
    callback(move |_ctx, request| {
        let client = Arc::clone(&client);
        async move {
            let ExecutionRequest::ContractCall { info, .. } = request else {
                return Err(CallError::new("Expected a contract call"));
            };
            let layout = layout(&info)?;
            let account = info_text(&info, "accountPubKey")?;
            let data = client
                .account_data(account)
                .await?
                .ok_or_else(|| CallError::new("Error: Program not found."))?;
            Ok(CallbackResult::Value(Value::Object(layout.decode(&data)?)))
        }
    })
}

fn write_account() -> Arc<dyn ExecutionCallback> {
    callback(|ctx, request| async move {
        let ExecutionRequest::ContractCall { info, args } = request else {
            return Err(CallError::new("Expected a contract call"));
        };
        let layout = layout(&info)?;
        let data = layout.encode(&args.named())?;
        let from = account_or_placeholder(&ctx);
        let program_id = info_text(&info, "programId")?;
        let account = info_text(&info, "accountPubKey")?;
        Ok(preview(
            "solana_transaction",
            json!({
                "feePayer": from,
                "instructions": [{
                    "programId": program_id,
                    "keys": [
                        { "pubkey": account, "isSigner": false, "isWritable": true },
                        { "pubkey": from, "isSigner": false, "isWritable": false },
                    ],
                    "methodIndex": info.get("methodIndex").cloned().unwrap_or(Value::Null),
                    "data": hex::encode(data),
                }],
            }),
        ))
    })
}

fn program_info(with_method: bool) -> AuxiliaryInfo {
    let mut group = InfoGroup::default()
        .with(
            "programId",
            InfoEntry::new("").with_comment("program id"),
        )
        .with(
            "accountPubKey",
            InfoEntry::new("").with_comment("account PubKey"),
        )
        .with(
            "struct",
            InfoEntry::new(COUNTER_LAYOUT).with_comment("program layout"),
        );
    if with_method {
        group.insert("methodIndex", InfoEntry::new("0").with_comment("method index"));
    }
    AuxiliaryInfo::contract(group)
}

pub fn catalog(client: Arc<SolanaClient>) -> Catalog {
    let transactions = TemplateGroup::new("Transactions")
        .with(
            "sendSOL",
            Template::new(OperationKind::Transaction)
                .with_args(vec![
                    Argument::new("String")
                        .with_name("amount")
                        .with_comment("amount(lamports)"),
                    Argument::new("PublicKey")
                        .with_name("receipient")
                        .with_comment("receipient"),
                ])
                .with_callback(send_sol())
                .signing(),
        )
        .with(
            "testPartialSign",
            Template::new(OperationKind::Transaction)
                .with_description("Test Partial Sign")
                .with_callback(partial_sign(1)),
        )
        .with(
            "testPartialSignAndWrap",
            Template::new(OperationKind::Transaction).with_callback(partial_sign(2)),
        );

    let contract = TemplateGroup::new("Contract")
        .with(
            "getValue",
            Template::new(OperationKind::ContractCall)
                .with_description("Read from the contract")
                .with_auxiliary(program_info(false))
                .with_callback(read_account(client)),
        )
        .with(
            "setValue",
            Template::new(OperationKind::ContractCall)
                .with_description("Write with the contract method")
                .with_auxiliary(program_info(true))
                .with_args(vec![Argument::new("Number")
                    .with_name("value")
                    .with_comment("value(number)")])
                .with_callback(write_account()),
        );

    let profile = EditorProfile {
        disabled_kinds: vec![OperationKind::ReadScript],
        default_kind: OperationKind::Transaction,
        clear_body: true,
        ..EditorProfile::default()
    };

    Catalog::new(Chain::Solana, profile)
        .with_group(transactions)
        .with_group(contract)
}
