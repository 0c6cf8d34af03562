//! Execution Dispatcher
//!
//! Turns live editor state into an [`ExecutionRequest`], invokes the path
//! selected by the operation kind and normalizes whatever comes back into an
//! [`ExecutionOutcome`]. Nothing raised below this point escapes: every
//! failure becomes `ExecutionOutcome::Error`.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::core::error::{CallError, EngineError};
use crate::core::outcome::{
    CallbackResult, ExecutionOutcome, SubmittedTransaction, TransactionHandle, TransactionWatch,
};
use crate::core::request::{
    ChainContext, CoercedArgs, CoercedArgument, ExecutionRequest, OperationKind, Signer,
    UserOperation,
};
use crate::core::template::ImportedTemplate;
use crate::domain::argument::{ArgValue, Argument};
use crate::domain::coerce::{self, generic, Coercer, Container, NativeValue};
use crate::domain::info::InfoFamily;

/// Result of a submit: settled, or a transaction that can be observed
pub enum Dispatched {
    Outcome(ExecutionOutcome),
    Pending {
        handle: TransactionHandle,
        watch: Arc<dyn TransactionWatch>,
    },
}

impl Dispatched {
    /// Outcome to display right away
    pub fn outcome(&self) -> ExecutionOutcome {
        match self {
            Dispatched::Outcome(outcome) => outcome.clone(),
            Dispatched::Pending { handle, .. } => ExecutionOutcome::TransactionHandle(handle.clone()),
        }
    }

    fn error(err: &EngineError) -> Self {
        Dispatched::Outcome(ExecutionOutcome::error(err))
    }
}

impl fmt::Debug for Dispatched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatched::Outcome(outcome) => f.debug_tuple("Outcome").field(outcome).finish(),
            Dispatched::Pending { handle, .. } => {
                f.debug_struct("Pending").field("handle", handle).finish()
            }
        }
    }
}

/// Submit the live editor state once.
///
/// Exactly one handler path runs, chosen by `state.kind`.
pub async fn dispatch(ctx: &ChainContext, state: &ImportedTemplate, signers: &[Signer]) -> Dispatched {
    let kind = state.kind;
    debug!(chain = %ctx.chain, ?kind, args = state.arguments.len(), "Dispatching request");

    let request = match panic::catch_unwind(AssertUnwindSafe(|| prepare(ctx, state, signers))) {
        Ok(Ok(request)) => request,
        Ok(Err(err)) => {
            warn!(?kind, error = %err, "Request rejected before dispatch");
            return Dispatched::error(&err);
        }
        Err(payload) => {
            let err = EngineError::ExecutionFailed(panic_message(payload));
            warn!(?kind, error = %err, "Request preparation panicked");
            return Dispatched::error(&err);
        }
    };

    match AssertUnwindSafe(invoke(ctx, state, request)).catch_unwind().await {
        Ok(Ok(dispatched)) => {
            info!(?kind, result = ?dispatched, "Dispatch finished");
            dispatched
        }
        Ok(Err(err)) => {
            warn!(?kind, error = %err, "Dispatch failed");
            Dispatched::error(&err)
        }
        Err(payload) => {
            let err = EngineError::ExecutionFailed(panic_message(payload));
            warn!(?kind, error = %err, "Execution panicked");
            Dispatched::error(&err)
        }
    }
}

/// Build the request for `state` without invoking anything
pub fn prepare(
    ctx: &ChainContext,
    state: &ImportedTemplate,
    signers: &[Signer],
) -> Result<ExecutionRequest, EngineError> {
    let kind = state.kind;
    if state.arguments.all_values_empty() {
        return Err(EngineError::ArgumentsMissing { kind });
    }
    let coercer = ctx.chain.coercer();
    let normalized = normalize_bytes(coercer, state.arguments.as_slice())?;
    let args = coerce_arguments(coercer, kind, &normalized)?;

    let request = match kind {
        OperationKind::ReadScript => ExecutionRequest::ReadScript {
            body: state.body.clone(),
            args,
            info: formatted(state, InfoFamily::Script)?,
            abi: formatted(state, InfoFamily::ScriptAbi)?,
        },
        OperationKind::Transaction => ExecutionRequest::Transaction {
            args,
            should_sign: state.should_sign,
            signers: signers.to_vec(),
            body: state.body.clone(),
        },
        OperationKind::SignMessage => ExecutionRequest::SignMessage { args },
        OperationKind::ContractCall => ExecutionRequest::ContractCall {
            info: formatted(state, InfoFamily::Contract)?,
            args,
        },
        OperationKind::ResourceRead => ExecutionRequest::ResourceRead { args },
        OperationKind::UserOperation => {
            let operation =
                UserOperation::from_args(&args).map_err(|source| EngineError::Coercion {
                    field: "user operation".to_string(),
                    source,
                })?;
            ExecutionRequest::UserOperation(operation)
        }
    };
    Ok(request)
}

/// Copy of `args` with byte-string kinds replaced by their decoded bytes.
///
/// The live argument list is left untouched so a resubmit starts again
/// from the user's text.
pub fn normalize_bytes(coercer: &dyn Coercer, args: &[Argument]) -> Result<Vec<Argument>, EngineError> {
    args.iter()
        .enumerate()
        .map(|(index, arg)| match &arg.value {
            ArgValue::Text(raw) if coercer.is_bytes(&arg.kind) && !raw.trim().is_empty() => {
                let bytes = coerce::coerce(coercer, &arg.kind, raw)
                    .map_err(|source| coercion_error(index, arg, source))?;
                Ok(Argument {
                    value: ArgValue::Native(bytes),
                    ..arg.clone()
                })
            }
            _ => Ok(arg.clone()),
        })
        .collect()
}

/// Coerce every argument for `kind`, short-circuiting on the first failure
pub fn coerce_arguments(
    coercer: &dyn Coercer,
    kind: OperationKind,
    args: &[Argument],
) -> Result<CoercedArgs, EngineError> {
    let mut coerced = Vec::with_capacity(args.len());
    for (index, arg) in args.iter().enumerate() {
        let value = if arg.value.is_empty() {
            empty_value(coercer, kind, arg)?
        } else {
            coerce::coerce_value(coercer, &arg.kind, &arg.value)
                .map_err(|source| coercion_error(index, arg, source))?
        };
        coerced.push(CoercedArgument {
            kind: arg.kind.clone(),
            name: arg.name.clone(),
            value,
            type_qualifier: coercer.is_type_qualifier(&arg.kind),
        });
    }
    Ok(CoercedArgs::new(coerced))
}

/// Value of an argument left blank. Only optional arguments may be blank.
fn empty_value(
    coercer: &dyn Coercer,
    kind: OperationKind,
    arg: &Argument,
) -> Result<NativeValue, EngineError> {
    let optional_kind = generic::split_generic(&arg.kind)
        .and_then(|g| coercer.container(g.container))
        == Some(Container::Optional);

    if optional_kind {
        return Ok(NativeValue::Optional(None));
    }
    if arg.required {
        return Err(EngineError::ArgumentsMissing { kind });
    }
    if coercer.is_bool(&arg.kind) {
        Ok(NativeValue::Bool(false))
    } else {
        Ok(NativeValue::Null)
    }
}

fn coercion_error(index: usize, arg: &Argument, source: coerce::CoercionError) -> EngineError {
    EngineError::Coercion {
        field: format!("argument #{} ({})", index + 1, arg.label()),
        source,
    }
}

fn formatted(
    state: &ImportedTemplate,
    family: InfoFamily,
) -> Result<serde_json::Map<String, Value>, EngineError> {
    state
        .auxiliary
        .formatted(family)
        .map_err(|source| EngineError::Coercion {
            field: format!("{} info", family.name()),
            source,
        })
}

async fn invoke(
    ctx: &ChainContext,
    state: &ImportedTemplate,
    request: ExecutionRequest,
) -> Result<Dispatched, EngineError> {
    let kind = request.kind();

    if let ExecutionRequest::UserOperation(operation) = request {
        let wallet = ctx
            .wallet
            .as_ref()
            .ok_or(EngineError::ExecutionCallbackMissing { kind })?;
        let hash = wallet
            .send_user_operation(&operation)
            .await
            .map_err(|e| external(kind, e))?;
        return Ok(Dispatched::Outcome(ExecutionOutcome::Value(json!(hash))));
    }

    let callback = state
        .callback
        .as_ref()
        .ok_or(EngineError::ExecutionCallbackMissing { kind })?;
    let result = callback
        .execute(ctx, request)
        .await
        .map_err(|e| external(kind, e))?;
    normalize_result(kind, result)
}

/// Map a callback completion onto the outcome taxonomy
fn normalize_result(kind: OperationKind, result: CallbackResult) -> Result<Dispatched, EngineError> {
    let value = match result {
        CallbackResult::Failure(err) => return Err(external(kind, err)),
        CallbackResult::Submitted(tx) => return Ok(pending(tx)),
        CallbackResult::Value(value) => value,
    };

    match kind {
        OperationKind::SignMessage => {
            if let Some(message) = embedded_error(&value) {
                return Err(external(kind, CallError::new(message)));
            }
        }
        OperationKind::ResourceRead => {
            if let Some(message) = value.get("message").and_then(Value::as_str) {
                return Err(external(kind, CallError::new(message)));
            }
        }
        OperationKind::ContractCall | OperationKind::Transaction => {
            if let Some(id) = value.get("transactionId").and_then(Value::as_str) {
                let payload = value.get("transaction").cloned().unwrap_or(Value::Null);
                return Ok(pending(SubmittedTransaction::new(id, payload)));
            }
        }
        OperationKind::ReadScript | OperationKind::UserOperation => {}
    }
    Ok(Dispatched::Outcome(ExecutionOutcome::Value(value)))
}

fn pending(tx: SubmittedTransaction) -> Dispatched {
    let handle = TransactionHandle {
        transaction_id: tx.transaction_id,
        payload: tx.payload,
    };
    match tx.watch {
        Some(watch) => Dispatched::Pending { handle, watch },
        None => Dispatched::Outcome(ExecutionOutcome::TransactionHandle(handle)),
    }
}

/// Message of an error-shaped result, e.g. `{"error": {"message": "..."}}`
fn embedded_error(value: &Value) -> Option<String> {
    let error = value.get("error")?;
    match error {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(
            other
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_default(),
        ),
    }
}

fn external(kind: OperationKind, err: CallError) -> EngineError {
    EngineError::ExternalCall(
        err.message
            .unwrap_or_else(|| kind.default_failure().to_string()),
    )
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "Execution failed".to_string())
}
