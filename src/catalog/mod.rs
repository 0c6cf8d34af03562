//! Built-in template catalogs, one per chain.
//!
//! Read paths call the configured endpoints. Paths that need a wallet key the
//! CLI does not hold build the chain-native request and return it as a
//! payload preview instead of submitting it.

pub mod aptos;
pub mod evm;
pub mod flow;
pub mod solana;

use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::Config;
use crate::core::outcome::CallbackResult;
use crate::core::request::ChainContext;
use crate::core::template::Catalog;
use crate::domain::chain::Chain;
use crate::infrastructure::{AptosClient, EvmClient, FlowClient, SolanaClient};

/// Chain context plus the catalog bound to its endpoint
pub struct Connection {
    pub context: ChainContext,
    pub catalog: Arc<Catalog>,
}

/// Build the context and catalog of `chain` from `config`
pub fn connect(chain: Chain, config: &Config) -> Result<Connection> {
    let endpoint = config.endpoint(chain);
    debug!(%chain, endpoint, "Connecting catalog");
    let mut context = ChainContext::new(chain);
    let catalog = match chain {
        Chain::Evm => {
            let client = Arc::new(EvmClient::connect(endpoint)?);
            context = context.with_wallet(client.clone());
            evm::catalog(client)
        }
        Chain::Flow => flow::catalog(Arc::new(FlowClient::new(endpoint)?)),
        Chain::Aptos => aptos::catalog(Arc::new(AptosClient::new(endpoint)?)),
        Chain::Solana => solana::catalog(Arc::new(SolanaClient::new(endpoint)?)),
    };
    Ok(Connection {
        context,
        catalog: Arc::new(catalog),
    })
}

/// Request a wallet would be asked to sign, returned unsent
pub(crate) fn preview(kind: &str, payload: Value) -> CallbackResult {
    CallbackResult::Value(json!({ "preview": kind, "payload": payload }))
}

/// Account the request is made for; placeholder when no wallet is connected
pub(crate) fn account_or_placeholder(ctx: &ChainContext) -> String {
    ctx.account.clone().unwrap_or_else(|| "<connected account>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_every_chain() {
        let config = Config::default();
        for chain in Chain::ALL {
            let connection = connect(chain, &config).unwrap();
            assert_eq!(connection.catalog.chain, chain);
            assert_eq!(connection.context.chain, chain);
            assert!(!connection.catalog.groups.is_empty());
        }
        let evm = connect(Chain::Evm, &config).unwrap();
        assert!(evm.context.wallet.is_some());
    }

    #[test]
    fn test_preview_shape() {
        let CallbackResult::Value(value) = preview("flow_transaction", json!({ "a": 1 })) else {
            panic!("expected a value");
        };
        assert_eq!(value["preview"], "flow_transaction");
        assert_eq!(value["payload"]["a"], 1);
    }
}
