//! What callbacks return and what the dispatcher reports

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::core::error::{CallError, EngineError, ErrorKind};

/// Tears down a live subscription
pub type Unsubscribe = Box<dyn FnOnce() + Send>;

/// Live snapshot feed for one submitted transaction
pub struct Subscription {
    pub snapshots: BoxStream<'static, Value>,
    pub unsubscribe: Unsubscribe,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Status feed of a chain, plus the predicate that marks a snapshot final
#[async_trait]
pub trait TransactionWatch: Send + Sync {
    /// Begin delivering snapshots for `transaction_id`
    async fn subscribe(&self, transaction_id: &str) -> Result<Subscription, CallError>;

    fn is_terminal(&self, snapshot: &Value) -> bool;
}

/// A transaction accepted by the chain, optionally observable
#[derive(Clone)]
pub struct SubmittedTransaction {
    pub transaction_id: String,
    pub payload: Value,
    pub watch: Option<Arc<dyn TransactionWatch>>,
}

impl SubmittedTransaction {
    pub fn new(transaction_id: impl Into<String>, payload: Value) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            payload,
            watch: None,
        }
    }

    pub fn with_watch(mut self, watch: Arc<dyn TransactionWatch>) -> Self {
        self.watch = Some(watch);
        self
    }
}

impl fmt::Debug for SubmittedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmittedTransaction")
            .field("transaction_id", &self.transaction_id)
            .field("payload", &self.payload)
            .field("watch", &self.watch.is_some())
            .finish()
    }
}

/// Successful callback completion
#[derive(Debug, Clone)]
pub enum CallbackResult {
    /// Arbitrary structured result
    Value(Value),
    /// A transaction identifier, with an optional status feed
    Submitted(SubmittedTransaction),
    /// Structurally an error even though nothing was raised
    Failure(CallError),
}

impl From<Value> for CallbackResult {
    fn from(value: Value) -> Self {
        CallbackResult::Value(value)
    }
}

/// Identifier and latest payload of a submitted transaction
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionHandle {
    pub transaction_id: String,
    pub payload: Value,
}

/// User-visible error: category and a never-empty message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&EngineError> for OutcomeError {
    fn from(err: &EngineError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for OutcomeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Normalized result of a submit
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Value(Value),
    TransactionHandle(TransactionHandle),
    Error(OutcomeError),
}

impl ExecutionOutcome {
    pub fn error(err: &EngineError) -> Self {
        ExecutionOutcome::Error(err.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ExecutionOutcome::Error(_))
    }
}
