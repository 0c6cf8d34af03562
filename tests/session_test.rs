//! Editor session: import, edit, submit and observe finality
//!
//! Status feeds are in-memory channels keyed by transaction id, so each
//! submit gets its own stream and unsubscribes can be counted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::channel::mpsc::{self, UnboundedSender};
use futures::StreamExt;
use serde_json::{json, Value};
use walletlab::core::{
    callback, CallError, Catalog, CallbackResult, ChainContext, EditorProfile, EditorSession,
    ExecutionOutcome, ExecutionRequest, FinalityState, OperationKind, Signer,
    SubmittedTransaction, Subscription, Template, TemplateGroup, TransactionWatch,
};
use walletlab::domain::argument::Argument;
use walletlab::domain::chain::Chain;

#[derive(Default)]
struct ChannelWatch {
    feeds: Mutex<HashMap<String, mpsc::UnboundedReceiver<Value>>>,
    unsubscribes: Arc<AtomicUsize>,
}

impl ChannelWatch {
    /// Sender for the feed of `transaction_id`
    fn feed(&self, transaction_id: &str) -> UnboundedSender<Value> {
        let (tx, rx) = mpsc::unbounded();
        self.feeds.lock().unwrap().insert(transaction_id.to_string(), rx);
        tx
    }

    fn unsubscribes(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionWatch for ChannelWatch {
    async fn subscribe(&self, transaction_id: &str) -> Result<Subscription, CallError> {
        let rx = self
            .feeds
            .lock()
            .unwrap()
            .remove(transaction_id)
            .ok_or_else(|| CallError::new(format!("no feed for {transaction_id}")))?;
        let counter = Arc::clone(&self.unsubscribes);
        Ok(Subscription {
            snapshots: rx.boxed(),
            unsubscribe: Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        })
    }

    fn is_terminal(&self, snapshot: &Value) -> bool {
        snapshot["status"] == "sealed"
    }
}

/// Catalog whose transaction template submits `tx-1`, `tx-2`, ... in turn
fn submitting_catalog(watch: Arc<ChannelWatch>) -> Arc<Catalog> {
    let counter = Arc::new(AtomicUsize::new(0));
    let submit = callback(move |_ctx, _request| {
        let watch = Arc::clone(&watch);
        let id = counter.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            let tx = SubmittedTransaction::new(format!("tx-{id}"), json!({ "status": "submitted" }))
                .with_watch(watch);
            Ok(CallbackResult::Submitted(tx))
        }
    });
    let echo = callback(|_ctx, request| async move {
        let args = request.args().map(|a| a.to_json()).unwrap_or_default();
        Ok(CallbackResult::Value(Value::Array(args)))
    });
    let profile = EditorProfile {
        extra_signers: true,
        ..EditorProfile::default()
    };
    Arc::new(
        Catalog::new(Chain::Flow, profile)
            .with_group(
                TemplateGroup::new("Transactions").with(
                    "send",
                    Template::new(OperationKind::Transaction)
                        .with_body("transaction {}")
                        .with_args(vec![Argument::new("UFix64").with_comment("amount")])
                        .with_callback(submit)
                        .signing(),
                ),
            )
            .with_group(
                TemplateGroup::new("Scripts").with(
                    "echo",
                    Template::new(OperationKind::ReadScript)
                        .with_body("pub fun main(a: UInt64): UInt64 { return a }")
                        .with_args(vec![Argument::new("UInt64").with_value("7")])
                        .with_callback(echo),
                ),
            ),
    )
}

fn session(watch: &Arc<ChannelWatch>) -> EditorSession {
    EditorSession::new(
        ChainContext::new(Chain::Flow),
        submitting_catalog(Arc::clone(watch)),
    )
}

#[tokio::test]
async fn test_import_edit_submit_round_trip() {
    let watch = Arc::new(ChannelWatch::default());
    let mut session = session(&watch);
    assert!(session.import("Scripts/echo"));
    assert!(session.arguments_mut().set_value(0, "42").is_ok());

    let outcome = session.submit().await;
    assert_eq!(outcome, ExecutionOutcome::Value(json!([42])));
    assert_eq!(session.display().body, "[\n  42\n]");

    // the catalog template keeps its own value
    assert!(session.import("Scripts/echo"));
    assert_eq!(session.submit().await, ExecutionOutcome::Value(json!([7])));
}

#[tokio::test]
async fn test_three_snapshots_seal_and_unsubscribe_once() {
    let watch = Arc::new(ChannelWatch::default());
    let feed = watch.feed("tx-1");
    for status in ["pending", "executed", "sealed"] {
        feed.unbounded_send(json!({ "status": status })).unwrap();
    }

    let mut session = session(&watch);
    assert!(session.import("Transactions/send"));
    session.arguments_mut().set_value(0, "1.5").unwrap();
    let outcome = session.submit().await;
    let ExecutionOutcome::TransactionHandle(handle) = outcome else {
        panic!("expected a transaction handle");
    };
    assert_eq!(handle.transaction_id, "tx-1");

    let state = session.wait_for_finality().await;
    assert_eq!(
        state,
        FinalityState::Sealed {
            transaction_id: "tx-1".to_string(),
            payload: json!({ "status": "sealed" }),
        }
    );
    assert_eq!(watch.unsubscribes(), 1);
    let snapshot = session.latest_snapshot().unwrap();
    assert!(snapshot.is_terminal);
    assert_eq!(session.display().title, "Response of tx tx-1:");
}

#[tokio::test]
async fn test_resubmit_ignores_stale_feed() {
    let watch = Arc::new(ChannelWatch::default());
    let first = watch.feed("tx-1");
    let second = watch.feed("tx-2");

    let mut session = session(&watch);
    assert!(session.import("Transactions/send"));
    session.arguments_mut().set_value(0, "1").unwrap();
    session.submit().await;
    session.submit().await;

    first
        .unbounded_send(json!({ "status": "sealed", "from": "first" }))
        .unwrap();
    second.unbounded_send(json!({ "status": "pending" })).unwrap();
    second
        .unbounded_send(json!({ "status": "sealed", "from": "second" }))
        .unwrap();

    let state = session.wait_for_finality().await;
    assert_eq!(
        state,
        FinalityState::Sealed {
            transaction_id: "tx-2".to_string(),
            payload: json!({ "status": "sealed", "from": "second" }),
        }
    );
    assert_eq!(session.latest_snapshot().unwrap().transaction_id, "tx-2");
    assert_eq!(watch.unsubscribes(), 2);
}

#[tokio::test]
async fn test_subscribe_failure_marks_failed() {
    let watch = Arc::new(ChannelWatch::default());
    let mut session = session(&watch);
    assert!(session.import("Transactions/send"));
    session.arguments_mut().set_value(0, "1").unwrap();
    session.submit().await;

    let state = session.wait_for_finality().await;
    assert_eq!(
        state,
        FinalityState::Failed {
            transaction_id: "tx-1".to_string(),
            error: "no feed for tx-1".to_string(),
        }
    );
    assert_eq!(session.display().body, "Error: no feed for tx-1");
}

/// Catalog of one transaction and one script that record the request they receive
fn capturing_catalog(
    profile: EditorProfile,
    sink: Arc<Mutex<Vec<ExecutionRequest>>>,
) -> Arc<Catalog> {
    let record = callback(move |_ctx, request| {
        let sink = Arc::clone(&sink);
        async move {
            sink.lock().unwrap().push(request);
            Ok(CallbackResult::Value(json!("ok")))
        }
    });
    Arc::new(
        Catalog::new(Chain::Flow, profile)
            .with_group(
                TemplateGroup::new("Transactions").with(
                    "send",
                    Template::new(OperationKind::Transaction)
                        .with_body("transaction {}")
                        .with_args(vec![Argument::new("UFix64").with_value("1")])
                        .with_callback(Arc::clone(&record)),
                ),
            )
            .with_group(
                TemplateGroup::new("Scripts").with(
                    "echo",
                    Template::new(OperationKind::ReadScript)
                        .with_body("pub fun main(): Int { return 7 }")
                        .with_callback(record),
                ),
            ),
    )
}

fn signer(address: &str) -> Signer {
    Signer {
        address: address.to_string(),
        private_key: "00".to_string(),
    }
}

fn transaction_signers(request: &ExecutionRequest) -> Vec<Signer> {
    match request {
        ExecutionRequest::Transaction { signers, .. } => signers.clone(),
        other => panic!("expected a transaction request, got {:?}", other.kind()),
    }
}

#[tokio::test]
async fn test_signers_only_reach_transactions() {
    let sink = Arc::new(Mutex::new(Vec::new()));
    let profile = EditorProfile {
        extra_signers: true,
        ..EditorProfile::default()
    };
    let mut session = EditorSession::new(
        ChainContext::new(Chain::Flow),
        capturing_catalog(profile, Arc::clone(&sink)),
    );
    let configured = vec![signer("0x01cf0e2f2f715450"), signer("0x179b6b1cb6755e31")];
    session.set_signers(configured.clone());

    assert!(session.import("Transactions/send"));
    assert_eq!(session.submit().await, ExecutionOutcome::Value(json!("ok")));
    assert!(session.import("Scripts/echo"));
    assert_eq!(session.submit().await, ExecutionOutcome::Value(json!("ok")));

    let requests = sink.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(transaction_signers(&requests[0]), configured);
    assert!(matches!(requests[1], ExecutionRequest::ReadScript { .. }));
}

#[tokio::test]
async fn test_signers_ignored_without_extra_signer_support() {
    let sink = Arc::new(Mutex::new(Vec::new()));
    let mut session = EditorSession::new(
        ChainContext::new(Chain::Flow),
        capturing_catalog(EditorProfile::default(), Arc::clone(&sink)),
    );
    session.set_signers(vec![signer("0x01cf0e2f2f715450")]);

    assert!(session.import("Transactions/send"));
    assert_eq!(session.submit().await, ExecutionOutcome::Value(json!("ok")));
    let requests = sink.lock().unwrap();
    assert!(transaction_signers(&requests[0]).is_empty());
}
