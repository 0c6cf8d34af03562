//! Built-in catalogs wired into editor sessions
//!
//! Only offline paths run here: previews, layout encoding and session
//! defaults. Endpoints point at a closed local port.

use serde_json::json;
use walletlab::catalog::{self, Connection};
use walletlab::config::Config;
use walletlab::core::{EditorSession, ExecutionOutcome, OperationKind};
use walletlab::domain::chain::Chain;
use walletlab::domain::info::InfoFamily;

fn offline_config() -> Config {
    let mut config = Config::default();
    for chain in Chain::ALL {
        config.set_endpoint(chain, "http://127.0.0.1:1");
    }
    config
}

fn session(chain: Chain) -> EditorSession {
    let Connection { context, catalog } = catalog::connect(chain, &offline_config()).unwrap();
    EditorSession::new(context, catalog)
}

#[test]
fn test_every_template_is_runnable() {
    for chain in Chain::ALL {
        let connection = catalog::connect(chain, &offline_config()).unwrap();
        for (group, name, template) in connection.catalog.entries() {
            let runnable =
                template.callback.is_some() || template.kind == OperationKind::UserOperation;
            assert!(runnable, "{chain}: {group}/{name} has no execution path");
        }
    }
}

#[tokio::test]
async fn test_session_defaults_per_chain() {
    let aptos = session(Chain::Aptos);
    assert_eq!(aptos.kind(), OperationKind::ContractCall);
    assert_eq!(aptos.state().description.as_deref(), Some("Transfer Aptos coin to other address"));

    let mut evm = session(Chain::Evm);
    assert_eq!(evm.kind(), OperationKind::Transaction);
    assert!(evm.state().body.is_empty());
    assert!(!evm.select_kind(OperationKind::ReadScript));

    let flow = session(Chain::Flow);
    assert_eq!(flow.kind(), OperationKind::ReadScript);
}

#[tokio::test]
async fn test_aptos_entry_function_preview() {
    let mut session = session(Chain::Aptos);
    assert!(session.arguments_mut().set_named("recipient", "0x2"));
    assert!(session.arguments_mut().set_named("value", "1000"));

    let ExecutionOutcome::Value(value) = session.submit().await else {
        panic!("expected a preview");
    };
    assert_eq!(value["preview"], "aptos_entry_function");
    assert_eq!(value["payload"]["function"], "0x1::coin::transfer");
    assert_eq!(value["payload"]["type_arguments"], json!(["0x1::aptos_coin::AptosCoin"]));
    assert_eq!(value["payload"]["arguments"], json!(["0x2", "1000"]));
}

#[tokio::test]
async fn test_flow_sign_message_preview() {
    let mut session = session(Chain::Flow);
    assert!(session.import("Sign Message/signMessage"));
    session.arguments_mut().set_value(0, "Hello").unwrap();
    let ExecutionOutcome::Value(value) = session.submit().await else {
        panic!("expected a preview");
    };
    assert_eq!(value["payload"]["messageHex"], "48656c6c6f");
}

#[tokio::test]
async fn test_flow_dao_vote_preview() {
    let mut session = session(Chain::Flow);
    assert!(session.import("DAO/vote"));
    let kinds: Vec<&str> = session.state().arguments.iter().map(|a| a.kind.as_str()).collect();
    assert_eq!(kinds, ["UInt64", "Int"]);
    session.arguments_mut().set_value(0, "3").unwrap();
    session.arguments_mut().set_value(1, "1").unwrap();

    let ExecutionOutcome::Value(value) = session.submit().await else {
        panic!("expected a preview");
    };
    let payload = &value["payload"];
    assert_eq!(payload["arguments"][0], json!({ "type": "UInt64", "value": "3" }));
    assert_eq!(payload["arguments"][1], json!({ "type": "Int", "value": "1" }));
    assert_eq!(payload["shouldSign"], json!(true));
}

#[tokio::test]
async fn test_solana_write_needs_program() {
    let mut session = session(Chain::Solana);
    assert!(session.import("Contract/setValue"));
    session.arguments_mut().set_named("value", "7");

    let ExecutionOutcome::Error(err) = session.submit().await else {
        panic!("expected an error");
    };
    assert_eq!(err.message, "programId is required");

    assert!(session.auxiliary_mut().set(InfoFamily::Contract, "programId", "11111111111111111111111111111111"));
    assert!(session.auxiliary_mut().set_any("accountPubKey", "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr"));
    let ExecutionOutcome::Value(value) = session.submit().await else {
        panic!("expected a preview");
    };
    assert_eq!(value["payload"]["instructions"][0]["data"], "0007000000");
}

#[tokio::test]
async fn test_unreachable_endpoint_is_an_error_outcome() {
    let mut session = session(Chain::Aptos);
    assert!(session.import("Resource/getAptosBalance"));
    session.arguments_mut().set_value(0, "0x1").unwrap();

    let ExecutionOutcome::Error(err) = session.submit().await else {
        panic!("expected an error");
    };
    assert!(!err.message.is_empty());
}
