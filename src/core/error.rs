//! Error taxonomy surfaced by the dispatcher and finality tracker

use std::fmt;

use thiserror::Error;

use crate::core::request::OperationKind;
use crate::domain::coerce::CoercionError;

/// Category of a failed submit, as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ArgumentsMissing,
    Coercion,
    ExecutionCallbackMissing,
    ExternalCall,
    ExecutionFailed,
    Subscription,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::ArgumentsMissing => "ArgumentsMissing",
            ErrorKind::Coercion => "CoercionError",
            ErrorKind::ExecutionCallbackMissing => "ExecutionCallbackMissing",
            ErrorKind::ExternalCall => "ExternalCallError",
            ErrorKind::ExecutionFailed => "ExecutionFailed",
            ErrorKind::Subscription => "SubscriptionError",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("{kind} arguments are missing.")]
    ArgumentsMissing { kind: OperationKind },

    /// `field` names the offending input, e.g. `argument #2 (amount)`
    #[error("{field}: {source}")]
    Coercion {
        field: String,
        #[source]
        source: CoercionError,
    },

    #[error("{} method is not provided.", .kind.tab_name())]
    ExecutionCallbackMissing { kind: OperationKind },

    #[error("{0}")]
    ExternalCall(String),

    #[error("{0}")]
    ExecutionFailed(String),

    #[error("{0}")]
    Subscription(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::ArgumentsMissing { .. } => ErrorKind::ArgumentsMissing,
            EngineError::Coercion { .. } => ErrorKind::Coercion,
            EngineError::ExecutionCallbackMissing { .. } => ErrorKind::ExecutionCallbackMissing,
            EngineError::ExternalCall(_) => ErrorKind::ExternalCall,
            EngineError::ExecutionFailed(_) => ErrorKind::ExecutionFailed,
            EngineError::Subscription(_) => ErrorKind::Subscription,
        }
    }
}

/// Error an external callable rejects with. The message may be absent, in
/// which case the dispatcher substitutes a per-kind default.
#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
#[error("{}", message.as_deref().unwrap_or("external call failed"))]
pub struct CallError {
    pub message: Option<String>,
}

impl CallError {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            message: (!message.trim().is_empty()).then_some(message),
        }
    }

    /// Rejection without a message
    pub fn silent() -> Self {
        Self { message: None }
    }
}

impl From<anyhow::Error> for CallError {
    fn from(err: anyhow::Error) -> Self {
        CallError::new(format!("{:#}", err))
    }
}

impl From<CoercionError> for CallError {
    fn from(err: CoercionError) -> Self {
        CallError::new(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_message_is_absent() {
        assert_eq!(CallError::new("  ").message, None);
        assert_eq!(CallError::new("boom").message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_missing_arguments_message() {
        let err = EngineError::ArgumentsMissing {
            kind: OperationKind::Transaction,
        };
        assert_eq!(err.to_string(), "Transaction arguments are missing.");
        assert_eq!(err.kind(), ErrorKind::ArgumentsMissing);
    }

    #[test]
    fn test_anyhow_chain_kept() {
        let err = anyhow::anyhow!("connection refused").context("eth_call failed");
        let call: CallError = err.into();
        assert_eq!(
            call.message.as_deref(),
            Some("eth_call failed: connection refused")
        );
    }
}
