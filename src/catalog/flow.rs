//! Flow templates: balance scripts, token transfers, user message signing

use std::sync::Arc;

use serde_json::{json, Value};

use crate::catalog::{account_or_placeholder, preview};
use crate::core::error::CallError;
use crate::core::outcome::CallbackResult;
use crate::core::request::{callback, CoercedArgs, ExecutionCallback, ExecutionRequest, OperationKind};
use crate::core::template::{Catalog, EditorProfile, Template, TemplateGroup};
use crate::domain::argument::Argument;
use crate::domain::chain::Chain;
use crate::domain::coerce::flow::cadence_json;
use crate::infrastructure::FlowClient;

const FUNGIBLE_TOKEN: &str = "0x9a0766d93b6608b7";
const FLOW_TOKEN: &str = "0x7e60df042a9c0868";
const FUSD: &str = "0xe223d8a629e49c68";
const BLOCTO_TOKEN: &str = "0x6e0797ac987005f5";
const TELEPORTED_TETHER_TOKEN: &str = "0xab26e0a07d770ec1";
const BLOCTO_DAO: &str = "0x18cce040948c8c91";

const GET_TOPICS: &str = r#"pub fun main(): [BloctoDAO.Topic] {
  return BloctoDAO.getTopics()
}
"#;

const GET_TOPIC: &str = r#"pub fun main(id: UInt64): BloctoDAO.Topic {
  return BloctoDAO.getTopic(id: id)
}
"#;

const CHECK_IS_PROPOSER: &str = r#"pub fun main(account: Address): Bool {
  let proposer = getAccount(account).getCapability(/public/bloctoDAOProposer).borrow<&BloctoDAO.Proposer>()
  return proposer != nil
}
"#;

const CHECK_CAN_VOTE: &str = r#"pub fun main(address: Address, topicId: UInt64): Bool {
  let amount = BloctoDAO.getStakedBLT(address: address)
  let topic = BloctoDAO.getTopic(id: topicId)
  return amount >= topic.minVoteStakingAmount
}
"#;

const GET_VOTED_OPTIONS: &str = r#"pub fun main(account: Address): { UInt64: Int } {
  let voterPublic = getAccount(account).getCapability(BloctoDAO.VoterPublicPath).borrow<&BloctoDAO.Voter{BloctoDAO.VoterPublic}>()
    ?? panic("Can't borrow voter public reference")

  return voterPublic.getVotedOptions()
}
"#;

const CREATE_TOPIC: &str = r#"transaction(title: String, description: String, options: [String], startAt: UFix64?, endAt: UFix64?, minVoteStakingAmount: UFix64?) {
  let proposer: &BloctoDAO.Proposer
  prepare(signer: AuthAccount) {
    self.proposer = signer.getCapability(/public/bloctoDAOProposer).borrow<&BloctoDAO.Proposer>()
      ?? panic("Could not borrow reference")
  }

  execute {
    self.proposer.addTopic(
      title: title,
      description: description,
      options: options,
      startAt: startAt,
      endAt: endAt,
      minVoteStakingAmount: minVoteStakingAmount
    )
  }
}
"#;

const VOTE: &str = r#"transaction(topicId: UInt64, optionIndex: Int) {
  let voter: &BloctoDAO.Voter
  prepare(signer: AuthAccount) {
    if signer.borrow<&BloctoDAO.Voter>(from: BloctoDAO.VoterStoragePath) == nil {
      signer.save(<- BloctoDAO.initVoter(), to: BloctoDAO.VoterStoragePath)
      signer.link<&BloctoDAO.Voter{BloctoDAO.VoterPublic}>(BloctoDAO.VoterPublicPath, target: BloctoDAO.VoterStoragePath)
      signer.link<&BloctoDAO.Voter>(BloctoDAO.VoterPath, target: BloctoDAO.VoterStoragePath)
    }

    self.voter = signer.getCapability(BloctoDAO.VoterPath).borrow<&BloctoDAO.Voter>()
      ?? panic("Could not borrow voter reference")
  }

  execute {
    self.voter.vote(topicId: topicId, optionIndex: optionIndex)
  }
}
"#;

const COUNT: &str = r#"transaction(topicId: UInt64, maxSize: Int) {
  prepare() {
    BloctoDAO.count(topicId: topicId, maxSize: maxSize)
  }
}
"#;

/// Cadence `body` importing the Blocto DAO contract
fn dao(body: &str) -> String {
    format!("import BloctoDAO from {BLOCTO_DAO}\n\n{body}")
}

fn dao_args(args: &[(&str, &str)]) -> Vec<Argument> {
    args.iter()
        .map(|(kind, comment)| Argument::new(*kind).with_comment(*comment))
        .collect()
}

fn balance_script(token: &str, token_address: &str, balance_path: &str) -> String {
    format!(
        r#"import FungibleToken from {FUNGIBLE_TOKEN}
import {token} from {token_address}

pub fun main (address: Address): UFix64 {{
    let vaultRef = getAccount(address).getCapability({balance_path})!.borrow<&FungibleToken.Vault{{FungibleToken.Balance}}>()
        ?? panic("Could not borrow reference to the owner's Vault!")
    return vaultRef.balance
}}
"#
    )
}

fn transfer_transaction(
    token: &str,
    token_address: &str,
    storage_path: &str,
    receiver_path: &str,
) -> String {
    format!(
        r#"import FungibleToken from {FUNGIBLE_TOKEN}
import {token} from {token_address}

transaction(amount: UFix64, to: Address) {{
    let sentVault: @FungibleToken.Vault

    prepare(signer: AuthAccount) {{
        let vaultRef = signer.borrow<&{token}.Vault>(from: {storage_path})
            ?? panic("Could not borrow reference to the owner's Vault!")
        self.sentVault <- vaultRef.withdraw(amount: amount)
    }}

    execute {{
        let receiverRef = getAccount(to).getCapability({receiver_path})
            .borrow<&{{FungibleToken.Receiver}}>()
            ?? panic("Could not borrow receiver reference to the recipient's Vault")
        receiverRef.deposit(from: <-self.sentVault)
    }}
}}
"#
    )
}

fn cadence_args(args: &CoercedArgs) -> Vec<Value> {
    args.iter().map(|a| cadence_json(&a.kind, &a.value)).collect()
}

fn run_script(client: Arc<FlowClient>) -> Arc<dyn ExecutionCallback> {
    callback(move |_ctx, request| {
        let client = Arc::clone(&client);
        async move {
            let ExecutionRequest::ReadScript { body, args, .. } = request else {
                return Err(CallError::new("Expected a script request"));
            };
            let result = client.execute_script(&body, &cadence_args(&args)).await?;
            Ok(CallbackResult::Value(result))
        }
    })
}

fn send_transaction() -> Arc<dyn ExecutionCallback> {
    callback(|ctx, request| async move {
        let ExecutionRequest::Transaction {
            args,
            should_sign,
            signers,
            body,
        } = request
        else {
            return Err(CallError::new("Expected a transaction request"));
        };
        let payer = account_or_placeholder(&ctx);
        let mut authorizers = vec![payer.clone()];
        authorizers.extend(signers.iter().map(|s| s.address.clone()));
        Ok(preview(
            "flow_transaction",
            json!({
                "cadence": body,
                "arguments": cadence_args(&args),
                "proposer": payer,
                "payer": payer,
                "authorizers": authorizers,
                "shouldSign": should_sign,
            }),
        ))
    })
}

fn sign_message() -> Arc<dyn ExecutionCallback> {
    callback(|ctx, request| async move {
        let message = request
            .args()
            .and_then(|args| args.first_text())
            .unwrap_or_default();
        Ok(preview(
            "flow_user_signature",
            json!({
                "address": account_or_placeholder(&ctx),
                "message": message,
                "messageHex": hex::encode(message.as_bytes()),
            }),
        ))
    })
}

fn transfer(body: String) -> Template {
    Template::new(OperationKind::Transaction)
        .with_body(body)
        .with_args(vec![
            Argument::new("UFix64").with_comment("amount"),
            Argument::new("Address").with_comment("receipient"),
        ])
        .with_callback(send_transaction())
        .signing()
}

fn balance(body: String, script: &Arc<dyn ExecutionCallback>) -> Template {
    Template::new(OperationKind::ReadScript)
        .with_body(body)
        .with_args(vec![Argument::new("Address").with_comment("address")])
        .with_callback(Arc::clone(script))
}

fn dao_group(script: &Arc<dyn ExecutionCallback>) -> TemplateGroup {
    let read = |body: &str, args: &[(&str, &str)]| {
        Template::new(OperationKind::ReadScript)
            .with_body(dao(body))
            .with_args(dao_args(args))
            .with_callback(Arc::clone(script))
    };
    let write = |body: &str, args: &[(&str, &str)]| {
        Template::new(OperationKind::Transaction)
            .with_body(dao(body))
            .with_args(dao_args(args))
            .with_callback(send_transaction())
    };

    TemplateGroup::new("DAO")
        .with("getTopics", read(GET_TOPICS, &[]))
        .with("getTopic", read(GET_TOPIC, &[("UInt64", "topicId")]))
        .with(
            "checkIsProposer",
            read(CHECK_IS_PROPOSER, &[("Address", "user address")]),
        )
        .with(
            "checkCanVote",
            read(
                CHECK_CAN_VOTE,
                &[("Address", "user address"), ("UInt64", "topicId")],
            ),
        )
        .with(
            "getVotedOptions",
            read(GET_VOTED_OPTIONS, &[("Address", "user address")]),
        )
        .with(
            "createTopic",
            write(
                CREATE_TOPIC,
                &[
                    ("String", "title"),
                    ("String", "description"),
                    ("Array(String)", "options"),
                    ("Optional(UFix64)", "start timestamp"),
                    ("Optional(UFix64)", "end timestamp"),
                    ("Optional(UFix64)", "min vote staking amount"),
                ],
            )
            .signing(),
        )
        .with(
            "vote",
            write(VOTE, &[("UInt64", "topicId"), ("Int", "option index")]).signing(),
        )
        .with(
            "count",
            write(COUNT, &[("UInt64", "topicId"), ("Int", "maxSize")]),
        )
}

pub fn catalog(client: Arc<FlowClient>) -> Catalog {
    let script = run_script(client);
    let dao = dao_group(&script);

    let scripts = TemplateGroup::new("Scripts")
        .with(
            "getFUSDBalance",
            balance(balance_script("FUSD", FUSD, "/public/fusdBalance"), &script),
        )
        .with(
            "getBLTBalance",
            balance(
                balance_script("BloctoToken", BLOCTO_TOKEN, "/public/bloctoTokenBalance"),
                &script,
            ),
        )
        .with(
            "getTUSDTBalance",
            balance(
                balance_script(
                    "TeleportedTetherToken",
                    TELEPORTED_TETHER_TOKEN,
                    "TeleportedTetherToken.TokenPublicBalancePath",
                ),
                &script,
            ),
        )
        .with(
            "getFlowBalance",
            balance(
                balance_script("FlowToken", FLOW_TOKEN, "/public/flowTokenBalance"),
                &script,
            ),
        );

    let transactions = TemplateGroup::new("Transactions")
        .with(
            "sendFUSD",
            transfer(transfer_transaction(
                "FUSD",
                FUSD,
                "/storage/fusdVault",
                "/public/fusdReceiver",
            )),
        )
        .with(
            "sendBLT",
            transfer(transfer_transaction(
                "BloctoToken",
                BLOCTO_TOKEN,
                "/storage/bloctoTokenVault",
                "/public/bloctoTokenReceiver",
            )),
        )
        .with(
            "sendTUSDT",
            transfer(transfer_transaction(
                "TeleportedTetherToken",
                TELEPORTED_TETHER_TOKEN,
                "TeleportedTetherToken.TokenStoragePath",
                "TeleportedTetherToken.TokenPublicReceiverPath",
            )),
        )
        .with(
            "sendFlow",
            transfer(transfer_transaction(
                "FlowToken",
                FLOW_TOKEN,
                "/storage/flowTokenVault",
                "/public/flowTokenReceiver",
            )),
        );

    let sign = TemplateGroup::new("Sign Message").with(
        "signMessage",
        Template::new(OperationKind::SignMessage)
            .with_args(vec![Argument::new("String").with_comment("message")])
            .with_callback(sign_message())
            .fixed_shape(),
    );

    let profile = EditorProfile {
        extra_signers: true,
        ..EditorProfile::default()
    };

    Catalog::new(Chain::Flow, profile)
        .with_group(dao)
        .with_group(scripts)
        .with_group(transactions)
        .with_group(sign)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::request::ChainContext;

    fn flow_catalog() -> Catalog {
        catalog(Arc::new(FlowClient::new("http://127.0.0.1:1").unwrap()))
    }

    #[test]
    fn test_scripts_reference_testnet_contracts() {
        let catalog = flow_catalog();
        let template = catalog.find("Scripts", "getFlowBalance").unwrap();
        assert!(template.body.contains("import FlowToken from 0x7e60df042a9c0868"));
        assert!(template.body.contains("FungibleToken.Vault{FungibleToken.Balance}"));
        assert_eq!(template.arguments[0].kind, "Address");
    }

    #[test]
    fn test_dao_group_entries() {
        let catalog = flow_catalog();
        assert_eq!(catalog.groups[0].title, "DAO");
        let names: Vec<&str> = catalog.groups[0].names().collect();
        assert_eq!(
            names,
            [
                "getTopics",
                "getTopic",
                "checkIsProposer",
                "checkCanVote",
                "getVotedOptions",
                "createTopic",
                "vote",
                "count",
            ]
        );

        let can_vote = catalog.find("DAO", "checkCanVote").unwrap();
        assert_eq!(can_vote.kind, OperationKind::ReadScript);
        let kinds: Vec<&str> = can_vote.arguments.iter().map(|a| a.kind.as_str()).collect();
        assert_eq!(kinds, ["Address", "UInt64"]);
        assert!(can_vote.body.starts_with("import BloctoDAO from 0x18cce040948c8c91\n\npub fun main"));

        assert!(catalog.find("DAO", "vote").unwrap().should_sign);
        assert!(!catalog.find("DAO", "count").unwrap().should_sign);
        assert_eq!(catalog.find("DAO", "getTopics").unwrap().arguments.len(), 0);
    }

    #[tokio::test]
    async fn test_dao_create_topic_optional_args() {
        let ctx = ChainContext::new(Chain::Flow).with_account("0xf8d6e0586b0a20c7");
        let mut state = flow_catalog().find("DAO", "createTopic").unwrap().import(&ctx);
        state.arguments.set_value(0, "Upgrade").unwrap();
        state.arguments.set_value(1, "Adopt the new staking rules").unwrap();
        state.arguments.set_value(2, r#"["yes", "no"]"#).unwrap();
        state.arguments.set_value(5, "100").unwrap();

        let request = crate::core::dispatch::prepare(&ctx, &state, &[]).unwrap();
        let CallbackResult::Value(value) = send_transaction().execute(&ctx, request).await.unwrap()
        else {
            panic!("expected a preview");
        };
        let arguments = &value["payload"]["arguments"];
        assert_eq!(arguments[3], json!({ "type": "Optional", "value": null }));
        assert_eq!(
            arguments[5],
            json!({ "type": "Optional", "value": { "type": "UFix64", "value": "100.00000000" } })
        );
    }

    #[tokio::test]
    async fn test_transaction_preview_carries_signers() {
        let catalog = flow_catalog();
        let mut state = catalog
            .find("Transactions", "sendFlow")
            .unwrap()
            .import(&ChainContext::new(Chain::Flow));
        state.arguments.set_value(0, "1.5").unwrap();
        state.arguments.set_value(1, "0x01").unwrap();
        let ctx = ChainContext::new(Chain::Flow).with_account("0xf8d6e0586b0a20c7");
        let signers = vec![crate::core::request::Signer {
            address: "0x01cf0e2f2f715450".into(),
            private_key: "00".into(),
        }];

        let request = crate::core::dispatch::prepare(&ctx, &state, &signers).unwrap();
        let CallbackResult::Value(value) = send_transaction().execute(&ctx, request).await.unwrap()
        else {
            panic!("expected a preview");
        };
        let payload = &value["payload"];
        assert_eq!(payload["arguments"][0], json!({ "type": "UFix64", "value": "1.50000000" }));
        assert_eq!(
            payload["arguments"][1],
            json!({ "type": "Address", "value": "0x0000000000000001" })
        );
        assert_eq!(payload["authorizers"], json!(["0xf8d6e0586b0a20c7", "0x01cf0e2f2f715450"]));
        assert_eq!(payload["shouldSign"], json!(true));
    }

    #[tokio::test]
    async fn test_sign_message_hex() {
        let ctx = ChainContext::new(Chain::Flow);
        let catalog = flow_catalog();
        let mut state = catalog.find_path("signMessage").unwrap().import(&ctx);
        state.arguments.set_value(0, "Hello").unwrap();
        let request = crate::core::dispatch::prepare(&ctx, &state, &[]).unwrap();
        let CallbackResult::Value(value) = sign_message().execute(&ctx, request).await.unwrap()
        else {
            panic!("expected a preview");
        };
        assert_eq!(value["payload"]["messageHex"], "48656c6c6f");
    }
}
