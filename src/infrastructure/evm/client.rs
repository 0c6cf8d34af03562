//! EVM JSON-RPC client
//!
//! Contract reads go through `eth_call` with ABI encoding done locally.
//! Everything that needs a key (transactions, signatures, user operations) is
//! delegated to the node's managed accounts via raw requests, so the same
//! client works against anvil, hardhat or a wallet-backed RPC.

use alloy::network::Ethereum;
use alloy::providers::{
    fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
    Identity, Provider, ProviderBuilder, RootProvider,
};
use alloy::rpc::types::TransactionRequest;
use alloy_json_abi::Function;
use alloy_primitives::{Address, Bytes};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::core::error::CallError;
use crate::core::request::{UserOperation, WalletProvider};
use crate::domain::coerce::evm::{decode_output, encode_call};
use crate::domain::coerce::NativeValue;

/// ERC-4337 v0.6 entry point
pub const ENTRY_POINT: &str = "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789";

type HttpFillProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider,
    Ethereum,
>;

/// Message signing methods exposed by the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignMethod {
    EthSign,
    PersonalSign,
    TypedDataV3,
    TypedDataV4,
}

impl SignMethod {
    pub fn rpc_name(&self) -> &'static str {
        match self {
            SignMethod::EthSign => "eth_sign",
            SignMethod::PersonalSign => "personal_sign",
            SignMethod::TypedDataV3 => "eth_signTypedData_v3",
            SignMethod::TypedDataV4 => "eth_signTypedData_v4",
        }
    }

    /// Positional params; `personal_sign` takes the message first
    fn params(&self, account: &str, message: Value) -> Value {
        match self {
            SignMethod::PersonalSign => json!([message, account]),
            _ => json!([account, message]),
        }
    }
}

pub struct EvmClient {
    provider: HttpFillProvider,
    endpoint: String,
}

impl EvmClient {
    pub fn connect(url: &str) -> Result<Self> {
        let rpc_url = url
            .parse()
            .with_context(|| format!("Invalid HTTP URL: {url}"))?;
        let provider = ProviderBuilder::new().connect_http(rpc_url);
        Ok(Self {
            provider,
            endpoint: url.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn raw(&self, method: &'static str, params: Value) -> Result<Value> {
        debug!(endpoint = %self.endpoint, method, "RPC request");
        self.provider
            .raw_request(method.into(), params)
            .await
            .with_context(|| format!("{method} failed"))
    }

    pub async fn accounts(&self) -> Result<Vec<Address>> {
        Ok(self.provider.get_accounts().await?)
    }

    /// First node-managed account, used as the implicit sender
    pub async fn default_account(&self) -> Result<Address> {
        self.accounts()
            .await?
            .into_iter()
            .next()
            .context("Node exposes no accounts")
    }

    /// Read-only contract call, decoded against `function`'s outputs
    pub async fn call_function(
        &self,
        to: Address,
        function: &Function,
        args: &[NativeValue],
    ) -> Result<Vec<NativeValue>> {
        let data = encode_call(function, args)?;
        let request = TransactionRequest::default()
            .to(to)
            .input(Bytes::from(data).into());
        debug!(%to, function = %function.name, "eth_call");
        let output = self
            .provider
            .call(request)
            .await
            .with_context(|| format!("eth_call {} failed", function.name))?;
        Ok(decode_output(function, &output)?)
    }

    /// State-changing contract call from the default account
    pub async fn transact_function(
        &self,
        to: Address,
        function: &Function,
        args: &[NativeValue],
        value: Option<String>,
    ) -> Result<String> {
        let data = encode_call(function, args)?;
        let mut tx = json!({
            "to": to.to_string(),
            "data": format!("0x{}", hex::encode(data)),
        });
        if let Some(value) = value {
            tx["value"] = Value::String(value);
        }
        self.send_transaction(tx).await
    }

    /// `eth_sendTransaction`; fills `from` with the default account when absent
    pub async fn send_transaction(&self, mut tx: Value) -> Result<String> {
        if tx.get("from").map_or(true, Value::is_null) {
            tx["from"] = Value::String(self.default_account().await?.to_string());
        }
        let hash = self.raw("eth_sendTransaction", json!([tx])).await?;
        hash.as_str()
            .map(str::to_string)
            .context("eth_sendTransaction returned no hash")
    }

    /// Receipt JSON, or `Null` while the transaction is pending
    pub async fn receipt(&self, hash: &str) -> Result<Value> {
        self.raw("eth_getTransactionReceipt", json!([hash])).await
    }

    pub async fn sign(&self, method: SignMethod, message: Value) -> Result<String> {
        let account = self.default_account().await?.to_string();
        let signature = self
            .raw(method.rpc_name(), method.params(&account, message))
            .await?;
        signature
            .as_str()
            .map(str::to_string)
            .with_context(|| format!("{} returned no signature", method.rpc_name()))
    }
}

#[async_trait]
impl WalletProvider for EvmClient {
    async fn send_user_operation(&self, operation: &UserOperation) -> Result<String, CallError> {
        let params = json!([operation, ENTRY_POINT]);
        let hash = self.raw("eth_sendUserOperation", params).await?;
        hash.as_str()
            .map(str::to_string)
            .ok_or_else(|| CallError::new("eth_sendUserOperation returned no hash"))
    }
}

impl std::fmt::Debug for EvmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmClient")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_param_order() {
        let message = json!("0x48656c6c6f");
        assert_eq!(
            SignMethod::PersonalSign.params("0xabc", message.clone()),
            json!(["0x48656c6c6f", "0xabc"])
        );
        assert_eq!(
            SignMethod::EthSign.params("0xabc", message),
            json!(["0xabc", "0x48656c6c6f"])
        );
    }

    #[test]
    fn test_connect_rejects_bad_url() {
        assert!(EvmClient::connect("not a url").is_err());
        let client = EvmClient::connect("http://127.0.0.1:8545").unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:8545");
    }
}
