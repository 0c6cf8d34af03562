//! Editor session - owns the live editor state of one chain
//!
//! Import and edit happen on the session directly. `submit` dispatches the
//! current state and, when the result is an observable transaction, spawns a
//! pump task that feeds snapshots into the shared [`FinalityTracker`] under
//! the epoch it was started with.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::StreamExt;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::core::dispatch::{self, Dispatched};
use crate::core::finality::{Delivery, Epoch, FinalitySnapshot, FinalityState, FinalityTracker};
use crate::core::outcome::{ExecutionOutcome, TransactionHandle, TransactionWatch};
use crate::core::request::{ChainContext, OperationKind, Signer};
use crate::core::template::{Catalog, ImportedTemplate, Template};
use crate::domain::argument::ArgumentModel;
use crate::domain::info::AuxiliaryInfo;

/// Result panel content: a title and a printable body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayView {
    pub title: String,
    pub body: String,
}

pub struct EditorSession {
    ctx: ChainContext,
    catalog: Arc<Catalog>,
    state: ImportedTemplate,
    signers: Vec<Signer>,
    outcome: Option<ExecutionOutcome>,
    tracker: Arc<Mutex<FinalityTracker>>,
    /// Highest epoch whose pump has finished; every change wakes waiters
    finished: watch::Sender<Epoch>,
}

impl EditorSession {
    pub fn new(ctx: ChainContext, catalog: Arc<Catalog>) -> Self {
        let default_kind = catalog.profile.default_kind;
        let (finished, _) = watch::channel(0);
        let mut session = Self {
            ctx,
            catalog,
            state: ImportedTemplate::empty(default_kind),
            signers: Vec::new(),
            outcome: None,
            tracker: Arc::new(Mutex::new(FinalityTracker::new())),
            finished,
        };
        session.select_kind(default_kind);
        session
    }

    pub fn context(&self) -> &ChainContext {
        &self.ctx
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn state(&self) -> &ImportedTemplate {
        &self.state
    }

    pub fn kind(&self) -> OperationKind {
        self.state.kind
    }

    pub fn arguments_mut(&mut self) -> &mut ArgumentModel {
        &mut self.state.arguments
    }

    pub fn auxiliary_mut(&mut self) -> &mut AuxiliaryInfo {
        &mut self.state.auxiliary
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.state.body = body.into();
    }

    pub fn set_should_sign(&mut self, should_sign: bool) {
        self.state.should_sign = should_sign;
    }

    /// Extra transaction signers; ignored on chains without signer support
    pub fn set_signers(&mut self, signers: Vec<Signer>) {
        if !signers.is_empty() && !self.catalog.profile.extra_signers {
            warn!(chain = %self.ctx.chain, "Extra signers are not supported on this chain");
            return;
        }
        self.signers = signers;
    }

    /// Replace the live state with a copy of `template`
    pub fn import_template(&mut self, template: &Template) {
        debug!(chain = %self.ctx.chain, kind = ?template.kind, "Importing template");
        self.state = template.import(&self.ctx);
        if self.catalog.profile.clear_body && template.body.is_empty() {
            self.state.body.clear();
        }
    }

    /// Import `"<group>/<name>"` from the session's catalog
    pub fn import(&mut self, path: &str) -> bool {
        let catalog = Arc::clone(&self.catalog);
        match catalog.find_path(path) {
            Some(template) => {
                self.import_template(template);
                true
            }
            None => false,
        }
    }

    /// Switch operation kind. Kinds flagged for autoload import their first
    /// template, or start from an empty argument list when there is none.
    pub fn select_kind(&mut self, kind: OperationKind) -> bool {
        if !self.catalog.profile.is_enabled(kind) {
            return false;
        }
        self.state.kind = kind;
        if self.catalog.profile.autoload_kinds.contains(&kind) {
            let catalog = Arc::clone(&self.catalog);
            match catalog.first_for_kind(kind) {
                Some(template) => self.import_template(template),
                None => {
                    self.state = ImportedTemplate::empty(kind);
                }
            }
        }
        true
    }

    /// Dispatch the live state once. Any observation left over from a
    /// previous submit is torn down first.
    pub async fn submit(&mut self) -> ExecutionOutcome {
        self.lock().invalidate();
        self.outcome = None;

        let signers: &[Signer] = if self.state.kind == OperationKind::Transaction {
            &self.signers
        } else {
            &[]
        };
        let dispatched = dispatch::dispatch(&self.ctx, &self.state, signers).await;
        let outcome = dispatched.outcome();

        match dispatched {
            Dispatched::Outcome(ExecutionOutcome::TransactionHandle(handle)) => {
                let epoch = self.lock().begin(&handle);
                self.mark_finished(epoch);
            }
            Dispatched::Pending { handle, watch: feed } => {
                let epoch = self.lock().begin(&handle);
                self.spawn_observer(epoch, handle, feed);
            }
            Dispatched::Outcome(_) => {}
        }

        self.outcome = Some(outcome.clone());
        outcome
    }

    pub fn outcome(&self) -> Option<&ExecutionOutcome> {
        self.outcome.as_ref()
    }

    pub fn finality_state(&self) -> FinalityState {
        self.lock().state().clone()
    }

    pub fn latest_snapshot(&self) -> Option<FinalitySnapshot> {
        self.lock().latest().cloned()
    }

    /// Resolves once the current observation is sealed, failed, or its feed
    /// has ended
    pub async fn wait_for_finality(&self) -> FinalityState {
        let mut finished = self.finished.subscribe();
        loop {
            {
                let tracker = self.lock();
                let state = tracker.state();
                let done = state.is_settled()
                    || matches!(state, FinalityState::Idle)
                    || *finished.borrow_and_update() >= tracker.epoch();
                if done {
                    return state.clone();
                }
            }
            if finished.changed().await.is_err() {
                return self.finality_state();
            }
        }
    }

    /// Title and body shown for the latest outcome
    pub fn display(&self) -> DisplayView {
        let run_result = |body: String| DisplayView {
            title: "Run result:".to_string(),
            body,
        };
        match &self.outcome {
            None => run_result(String::new()),
            Some(ExecutionOutcome::Value(value)) => run_result(pretty(value)),
            Some(ExecutionOutcome::Error(err)) => run_result(format!("Error: {}", err.message)),
            Some(ExecutionOutcome::TransactionHandle(handle)) => {
                let tracker = self.lock();
                if let FinalityState::Failed { error, .. } = tracker.state() {
                    return run_result(format!("Error: {}", error));
                }
                let payload = tracker
                    .latest()
                    .filter(|s| s.transaction_id == handle.transaction_id)
                    .map(|s| &s.payload)
                    .unwrap_or(&handle.payload);
                DisplayView {
                    title: format!("Response of tx {}:", handle.transaction_id),
                    body: pretty(payload),
                }
            }
        }
    }

    fn spawn_observer(
        &self,
        epoch: Epoch,
        handle: TransactionHandle,
        feed: Arc<dyn TransactionWatch>,
    ) {
        let tracker = Arc::clone(&self.tracker);
        let finished = self.finished.clone();
        tokio::spawn(async move {
            observe(epoch, &handle.transaction_id, feed, &tracker, &finished).await;
            finished.send_modify(|last| *last = (*last).max(epoch));
        });
    }

    fn mark_finished(&self, epoch: Epoch) {
        self.finished.send_modify(|last| *last = (*last).max(epoch));
    }

    fn lock(&self) -> MutexGuard<'_, FinalityTracker> {
        lock(&self.tracker)
    }
}

/// Feed snapshots of one epoch into the tracker until sealed, stale or the
/// stream ends
async fn observe(
    epoch: Epoch,
    transaction_id: &str,
    feed: Arc<dyn TransactionWatch>,
    tracker: &Mutex<FinalityTracker>,
    finished: &watch::Sender<Epoch>,
) {
    let subscription = match feed.subscribe(transaction_id).await {
        Ok(subscription) => subscription,
        Err(err) => {
            let message = err
                .message
                .unwrap_or_else(|| "Subscribing to transaction failed".to_string());
            lock(tracker).fail(epoch, message);
            return;
        }
    };

    let mut snapshots = subscription.snapshots;
    let observing = lock(tracker).start_observing(epoch, subscription.unsubscribe);
    if !observing {
        return;
    }
    finished.send_modify(|_| {});

    while let Some(snapshot) = snapshots.next().await {
        let terminal = feed.is_terminal(&snapshot);
        let delivery = lock(tracker).deliver(epoch, snapshot, terminal);
        finished.send_modify(|_| {});
        match delivery {
            Delivery::Accepted => continue,
            Delivery::Sealed => {
                info!(epoch, tx = transaction_id, "Observation complete");
                return;
            }
            Delivery::Stale => return,
        }
    }
    debug!(epoch, tx = transaction_id, "Snapshot feed ended before finality");
}

fn lock(tracker: &Mutex<FinalityTracker>) -> MutexGuard<'_, FinalityTracker> {
    tracker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn pretty(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
