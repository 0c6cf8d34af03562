//! Execution requests - one strongly-typed payload per operation kind
//!
//! A request is built fresh on every submit from the live editor state and
//! handed to the template's [`ExecutionCallback`] (or, for user operations,
//! to the chain context's [`WalletProvider`]).

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use alloy_primitives::U256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::error::CallError;
use crate::core::outcome::CallbackResult;
use crate::domain::chain::Chain;
use crate::domain::coerce::{CoercionError, NativeValue};

/// Category of request an editor builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    ReadScript,
    Transaction,
    SignMessage,
    ContractCall,
    ResourceRead,
    UserOperation,
}

impl OperationKind {
    pub const ALL: [OperationKind; 6] = [
        OperationKind::ReadScript,
        OperationKind::Transaction,
        OperationKind::SignMessage,
        OperationKind::ContractCall,
        OperationKind::ResourceRead,
        OperationKind::UserOperation,
    ];

    /// Editor tab title
    pub fn tab_name(&self) -> &'static str {
        match self {
            OperationKind::ReadScript => "Script",
            OperationKind::Transaction => "Transaction",
            OperationKind::SignMessage => "Sign Message",
            OperationKind::ContractCall => "Contract",
            OperationKind::ResourceRead => "Resource",
            OperationKind::UserOperation => "User Operations",
        }
    }

    /// Message used when the external call fails without one
    pub fn default_failure(&self) -> &'static str {
        match self {
            OperationKind::ReadScript => "Running script failed",
            OperationKind::Transaction => "Sending transaction failed",
            OperationKind::SignMessage => "Signing message failed",
            OperationKind::ContractCall => "Function call failed",
            OperationKind::ResourceRead => "Reading resource failed",
            OperationKind::UserOperation => "Sending user operation failed",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::ReadScript => "Script",
            OperationKind::Transaction => "Transaction",
            OperationKind::SignMessage => "Sign message",
            OperationKind::ContractCall => "Contract method",
            OperationKind::ResourceRead => "Resource",
            OperationKind::UserOperation => "User operation",
        };
        f.write_str(name)
    }
}

/// Extra transaction signer credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    pub address: String,
    pub private_key: String,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("address", &self.address)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Wallet entry point for account-abstraction user operations
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Submit a user operation, returning its hash
    async fn send_user_operation(&self, operation: &UserOperation) -> Result<String, CallError>;
}

/// Explicit chain context threaded into every dispatch
#[derive(Clone)]
pub struct ChainContext {
    pub chain: Chain,
    /// Connected account, when the wallet exposes one
    pub account: Option<String>,
    pub wallet: Option<Arc<dyn WalletProvider>>,
}

impl ChainContext {
    pub fn new(chain: Chain) -> Self {
        Self {
            chain,
            account: None,
            wallet: None,
        }
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn with_wallet(mut self, wallet: Arc<dyn WalletProvider>) -> Self {
        self.wallet = Some(wallet);
        self
    }
}

impl fmt::Debug for ChainContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainContext")
            .field("chain", &self.chain)
            .field("account", &self.account)
            .field("wallet", &self.wallet.is_some())
            .finish()
    }
}

/// A coerced argument as handed to the call site
#[derive(Debug, Clone, PartialEq)]
pub struct CoercedArgument {
    pub kind: String,
    pub name: Option<String>,
    pub value: NativeValue,
    /// Passed separately from value arguments (e.g. Move type arguments)
    pub type_qualifier: bool,
}

/// Coerced arguments in declaration order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoercedArgs(Vec<CoercedArgument>);

impl CoercedArgs {
    pub fn new(args: Vec<CoercedArgument>) -> Self {
        Self(args)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CoercedArgument> {
        self.0.iter()
    }

    /// Positional values
    pub fn values(&self) -> Vec<&NativeValue> {
        self.0.iter().map(|a| &a.value).collect()
    }

    /// Positional values as JSON
    pub fn to_json(&self) -> Vec<Value> {
        self.0.iter().map(|a| a.value.to_json()).collect()
    }

    /// Name -> value mapping of every named argument
    pub fn named(&self) -> Map<String, Value> {
        self.0
            .iter()
            .filter_map(|a| a.name.as_ref().map(|n| (n.clone(), a.value.to_json())))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&NativeValue> {
        self.0
            .iter()
            .find(|a| a.name.as_deref() == Some(name))
            .map(|a| &a.value)
    }

    /// `(type qualifiers, value arguments)`, each in declaration order
    pub fn split_qualifiers(&self) -> (Vec<&NativeValue>, Vec<&NativeValue>) {
        let (qualifiers, values): (Vec<_>, Vec<_>) =
            self.0.iter().partition(|a| a.type_qualifier);
        (
            qualifiers.into_iter().map(|a| &a.value).collect(),
            values.into_iter().map(|a| &a.value).collect(),
        )
    }

    /// Text of the first argument, for single-message operations
    pub fn first_text(&self) -> Option<String> {
        self.0.first().map(|a| match a.value.as_str() {
            Some(s) => s.to_string(),
            None => a.value.to_json().to_string(),
        })
    }
}

/// ERC-4337 user operation assembled from named arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub call_data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_gas_limit: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_gas_limit: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_verification_gas: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paymaster_and_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
}

impl UserOperation {
    /// Build from named arguments; `callData` is required, the rest optional
    pub fn from_args(args: &CoercedArgs) -> Result<Self, CoercionError> {
        let text = |name: &str| {
            args.get(name)
                .and_then(|v| v.as_str().map(str::to_string))
                .filter(|s| !s.trim().is_empty())
        };
        let number = |name: &str| -> Result<Option<U256>, CoercionError> {
            match args.get(name).filter(|v| !v.is_null()) {
                None => Ok(None),
                Some(NativeValue::String(s)) if s.trim().is_empty() => Ok(None),
                Some(v) => v.as_u256().map(Some).ok_or_else(|| {
                    CoercionError::invalid(name, &v.to_json().to_string(), "expected a non-negative integer")
                }),
            }
        };

        let call_data = text("callData")
            .ok_or_else(|| CoercionError::invalid("callData", "", "call data is required"))?;
        Ok(Self {
            call_data,
            call_gas_limit: number("callGasLimit")?,
            verification_gas_limit: number("verificationGasLimit")?,
            pre_verification_gas: number("preVerificationGas")?,
            max_fee_per_gas: number("maxFeePerGas")?,
            max_priority_fee_per_gas: number("maxPriorityFeePerGas")?,
            paymaster_and_data: text("paymasterAndData"),
            sender: text("sender"),
        })
    }
}

/// Per-kind payload handed to an execution callback
#[derive(Debug, Clone)]
pub enum ExecutionRequest {
    ReadScript {
        body: String,
        args: CoercedArgs,
        /// Formatted script info (e.g. bytecode)
        info: Map<String, Value>,
        /// Formatted script ABI, empty when none is declared
        abi: Map<String, Value>,
    },
    Transaction {
        args: CoercedArgs,
        should_sign: bool,
        signers: Vec<Signer>,
        body: String,
    },
    SignMessage {
        args: CoercedArgs,
    },
    ContractCall {
        info: Map<String, Value>,
        args: CoercedArgs,
    },
    ResourceRead {
        args: CoercedArgs,
    },
    UserOperation(UserOperation),
}

impl ExecutionRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            ExecutionRequest::ReadScript { .. } => OperationKind::ReadScript,
            ExecutionRequest::Transaction { .. } => OperationKind::Transaction,
            ExecutionRequest::SignMessage { .. } => OperationKind::SignMessage,
            ExecutionRequest::ContractCall { .. } => OperationKind::ContractCall,
            ExecutionRequest::ResourceRead { .. } => OperationKind::ResourceRead,
            ExecutionRequest::UserOperation(_) => OperationKind::UserOperation,
        }
    }

    pub fn args(&self) -> Option<&CoercedArgs> {
        match self {
            ExecutionRequest::ReadScript { args, .. }
            | ExecutionRequest::Transaction { args, .. }
            | ExecutionRequest::SignMessage { args }
            | ExecutionRequest::ContractCall { args, .. }
            | ExecutionRequest::ResourceRead { args } => Some(args),
            ExecutionRequest::UserOperation(_) => None,
        }
    }
}

/// Chain-specific execution path bound to a template
#[async_trait]
pub trait ExecutionCallback: Send + Sync {
    async fn execute(
        &self,
        ctx: &ChainContext,
        request: ExecutionRequest,
    ) -> Result<CallbackResult, CallError>;
}

struct FnCallback<F>(F);

#[async_trait]
impl<F, Fut> ExecutionCallback for FnCallback<F>
where
    F: Fn(ChainContext, ExecutionRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CallbackResult, CallError>> + Send + 'static,
{
    async fn execute(
        &self,
        ctx: &ChainContext,
        request: ExecutionRequest,
    ) -> Result<CallbackResult, CallError> {
        (self.0)(ctx.clone(), request).await
    }
}

/// Wrap an async closure as an [`ExecutionCallback`]
pub fn callback<F, Fut>(f: F) -> Arc<dyn ExecutionCallback>
where
    F: Fn(ChainContext, ExecutionRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CallbackResult, CallError>> + Send + 'static,
{
    Arc::new(FnCallback(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg(name: &str, kind: &str, value: NativeValue) -> CoercedArgument {
        CoercedArgument {
            kind: kind.to_string(),
            name: Some(name.to_string()),
            value,
            type_qualifier: kind == "type_arg",
        }
    }

    #[test]
    fn test_split_qualifiers_keeps_order() {
        let args = CoercedArgs::new(vec![
            arg("coin", "type_arg", NativeValue::TypeTag("0x1::aptos_coin::AptosCoin".into())),
            arg("to", "address", NativeValue::Address("0x1".into())),
            arg("amount", "u64", NativeValue::Uint(U256::from(5u64))),
        ]);
        let (qualifiers, values) = args.split_qualifiers();
        assert_eq!(qualifiers.len(), 1);
        assert_eq!(values, vec![&NativeValue::Address("0x1".into()), &NativeValue::Uint(U256::from(5u64))]);
    }

    #[test]
    fn test_named_projection() {
        let args = CoercedArgs::new(vec![
            arg("amount", "String", NativeValue::String("1000".into())),
            arg("receipient", "String", NativeValue::String("abc".into())),
        ]);
        let named = args.named();
        assert_eq!(named["amount"], serde_json::json!("1000"));
        assert_eq!(named["receipient"], serde_json::json!("abc"));
    }

    #[test]
    fn test_user_operation_from_args() {
        let args = CoercedArgs::new(vec![
            arg("callData", "string", NativeValue::String("0xdeadbeef".into())),
            arg("callGasLimit", "number", NativeValue::Uint(U256::from(21000u64))),
            arg("maxFeePerGas", "number", NativeValue::Null),
            arg("sender", "string", NativeValue::String("".into())),
        ]);
        let op = UserOperation::from_args(&args).unwrap();
        assert_eq!(op.call_data, "0xdeadbeef");
        assert_eq!(op.call_gas_limit, Some(U256::from(21000u64)));
        assert_eq!(op.max_fee_per_gas, None);
        assert_eq!(op.sender, None);

        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["callData"], "0xdeadbeef");
        assert!(json.get("sender").is_none());
    }

    #[test]
    fn test_user_operation_requires_call_data() {
        assert!(UserOperation::from_args(&CoercedArgs::default()).is_err());
    }

    #[test]
    fn test_signer_debug_redacts_key() {
        let signer = Signer {
            address: "0x01".into(),
            private_key: "secret".into(),
        };
        assert!(!format!("{:?}", signer).contains("secret"));
    }
}
