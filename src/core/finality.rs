//! Finality Tracker
//!
//! `Idle -> Submitted -> Observing -> Sealed | Failed`
//!
//! Every submit opens a new epoch. Snapshots, subscriptions and failures are
//! tagged with the epoch they belong to; anything carrying an older epoch is
//! dropped without touching state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::core::outcome::{TransactionHandle, Unsubscribe};

/// Identity of one observation session
pub type Epoch = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum FinalityState {
    Idle,
    Submitted { transaction_id: String },
    Observing { transaction_id: String },
    Sealed { transaction_id: String, payload: Value },
    Failed { transaction_id: String, error: String },
}

impl FinalityState {
    pub fn is_settled(&self) -> bool {
        matches!(self, FinalityState::Sealed { .. } | FinalityState::Failed { .. })
    }

    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            FinalityState::Idle => None,
            FinalityState::Submitted { transaction_id }
            | FinalityState::Observing { transaction_id }
            | FinalityState::Sealed { transaction_id, .. }
            | FinalityState::Failed { transaction_id, .. } => Some(transaction_id),
        }
    }
}

/// Latest payload seen for the tracked transaction
#[derive(Debug, Clone, PartialEq)]
pub struct FinalitySnapshot {
    pub transaction_id: String,
    pub payload: Value,
    pub is_terminal: bool,
    pub received_at: DateTime<Utc>,
}

/// What happened to a delivered snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Accepted,
    /// Terminal snapshot; the subscription has been torn down
    Sealed,
    /// Older epoch or tracker not observing; ignored
    Stale,
}

pub struct FinalityTracker {
    epoch: Epoch,
    state: FinalityState,
    latest: Option<FinalitySnapshot>,
    unsubscribe: Option<Unsubscribe>,
}

impl Default for FinalityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl FinalityTracker {
    pub fn new() -> Self {
        Self {
            epoch: 0,
            state: FinalityState::Idle,
            latest: None,
            unsubscribe: None,
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn state(&self) -> &FinalityState {
        &self.state
    }

    pub fn latest(&self) -> Option<&FinalitySnapshot> {
        self.latest.as_ref()
    }

    pub fn is_current(&self, epoch: Epoch) -> bool {
        epoch == self.epoch
    }

    /// Tear down any live subscription and open a new epoch in `Idle`
    pub fn invalidate(&mut self) -> Epoch {
        self.release();
        self.epoch += 1;
        self.state = FinalityState::Idle;
        self.latest = None;
        debug!(epoch = self.epoch, "Finality tracker reset");
        self.epoch
    }

    /// Track a freshly submitted transaction under a new epoch
    pub fn begin(&mut self, handle: &TransactionHandle) -> Epoch {
        let epoch = self.invalidate();
        self.state = FinalityState::Submitted {
            transaction_id: handle.transaction_id.clone(),
        };
        self.latest = Some(FinalitySnapshot {
            transaction_id: handle.transaction_id.clone(),
            payload: handle.payload.clone(),
            is_terminal: false,
            received_at: Utc::now(),
        });
        info!(epoch, tx = %handle.transaction_id, "Transaction submitted");
        epoch
    }

    /// Attach the live subscription of `epoch`.
    ///
    /// A subscription arriving for a stale epoch is unsubscribed immediately.
    pub fn start_observing(&mut self, epoch: Epoch, unsubscribe: Unsubscribe) -> bool {
        let transaction_id = match (&self.state, self.is_current(epoch)) {
            (FinalityState::Submitted { transaction_id }, true) => transaction_id.clone(),
            _ => {
                debug!(epoch, current = self.epoch, "Dropping stale subscription");
                unsubscribe();
                return false;
            }
        };
        debug!(epoch, tx = %transaction_id, "Observing transaction");
        self.unsubscribe = Some(unsubscribe);
        self.state = FinalityState::Observing { transaction_id };
        true
    }

    /// Record a snapshot for `epoch`. A terminal snapshot seals the tracker
    /// and unsubscribes exactly once.
    pub fn deliver(&mut self, epoch: Epoch, payload: Value, is_terminal: bool) -> Delivery {
        let transaction_id = match (&self.state, self.is_current(epoch)) {
            (FinalityState::Observing { transaction_id }, true) => transaction_id.clone(),
            _ => {
                debug!(epoch, current = self.epoch, "Ignoring stale snapshot");
                return Delivery::Stale;
            }
        };

        self.latest = Some(FinalitySnapshot {
            transaction_id: transaction_id.clone(),
            payload: payload.clone(),
            is_terminal,
            received_at: Utc::now(),
        });

        if !is_terminal {
            return Delivery::Accepted;
        }
        self.release();
        info!(epoch, tx = %transaction_id, "Transaction sealed");
        self.state = FinalityState::Sealed {
            transaction_id,
            payload,
        };
        Delivery::Sealed
    }

    /// Subscribing failed for `epoch`
    pub fn fail(&mut self, epoch: Epoch, error: impl Into<String>) -> bool {
        if !self.is_current(epoch) || self.state.is_settled() {
            return false;
        }
        let Some(transaction_id) = self.state.transaction_id().map(str::to_string) else {
            return false;
        };
        let error = error.into();
        warn!(epoch, tx = %transaction_id, %error, "Finality tracking failed");
        self.release();
        self.state = FinalityState::Failed {
            transaction_id,
            error,
        };
        true
    }

    /// Drop back to `Idle`, releasing any live subscription
    pub fn reset(&mut self) -> Epoch {
        self.invalidate()
    }

    fn release(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for FinalityTracker {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for FinalityTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinalityTracker")
            .field("epoch", &self.epoch)
            .field("state", &self.state)
            .field("latest", &self.latest)
            .field("subscribed", &self.unsubscribe.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn handle(id: &str) -> TransactionHandle {
        TransactionHandle {
            transaction_id: id.to_string(),
            payload: json!({ "status": 0 }),
        }
    }

    fn counter() -> (Arc<AtomicUsize>, Unsubscribe) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn test_three_snapshots_seal_once() {
        let mut tracker = FinalityTracker::new();
        let epoch = tracker.begin(&handle("0x1"));
        let (count, unsub) = counter();
        assert!(tracker.start_observing(epoch, unsub));

        assert_eq!(tracker.deliver(epoch, json!({ "status": 1 }), false), Delivery::Accepted);
        assert_eq!(tracker.deliver(epoch, json!({ "status": 2 }), false), Delivery::Accepted);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(tracker.deliver(epoch, json!({ "status": 4 }), true), Delivery::Sealed);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert_eq!(
            tracker.state(),
            &FinalityState::Sealed {
                transaction_id: "0x1".into(),
                payload: json!({ "status": 4 }),
            }
        );
        assert_eq!(tracker.deliver(epoch, json!({ "status": 5 }), true), Delivery::Stale);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_new_submit_invalidates_previous() {
        let mut tracker = FinalityTracker::new();
        let first = tracker.begin(&handle("0x1"));
        let (first_count, unsub) = counter();
        tracker.start_observing(first, unsub);

        let second = tracker.begin(&handle("0x2"));
        assert_eq!(first_count.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.deliver(first, json!("late"), true), Delivery::Stale);
        assert_eq!(
            tracker.state(),
            &FinalityState::Submitted {
                transaction_id: "0x2".into()
            }
        );

        let (second_count, unsub) = counter();
        assert!(tracker.start_observing(second, unsub));
        let (late_count, late_unsub) = counter();
        assert!(!tracker.start_observing(first, late_unsub));
        assert_eq!(late_count.load(Ordering::SeqCst), 1);
        assert_eq!(second_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscribe_failure() {
        let mut tracker = FinalityTracker::new();
        let epoch = tracker.begin(&handle("0x1"));
        assert!(!tracker.fail(epoch + 1, "stale"));
        assert!(tracker.fail(epoch, "node unreachable"));
        assert_eq!(
            tracker.state(),
            &FinalityState::Failed {
                transaction_id: "0x1".into(),
                error: "node unreachable".into(),
            }
        );
    }

    #[test]
    fn test_latest_keeps_only_most_recent() {
        let mut tracker = FinalityTracker::new();
        let epoch = tracker.begin(&handle("0x1"));
        assert_eq!(tracker.latest().unwrap().payload, json!({ "status": 0 }));
        let (_, unsub) = counter();
        tracker.start_observing(epoch, unsub);
        tracker.deliver(epoch, json!(1), false);
        tracker.deliver(epoch, json!(2), false);
        assert_eq!(tracker.latest().unwrap().payload, json!(2));
        assert!(!tracker.latest().unwrap().is_terminal);
    }

    #[test]
    fn test_drop_releases_subscription() {
        let (count, unsub) = counter();
        {
            let mut tracker = FinalityTracker::new();
            let epoch = tracker.begin(&handle("0x1"));
            tracker.start_observing(epoch, unsub);
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
