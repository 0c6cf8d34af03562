//! Receipt polling feed for submitted EVM transactions

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::core::error::CallError;
use crate::core::outcome::{Subscription, TransactionWatch};
use crate::infrastructure::evm::client::EvmClient;

const POLL_INTERVAL: Duration = Duration::from_millis(900);
const MAX_POLLS: usize = 200;

/// Polls `eth_getTransactionReceipt` until the transaction is mined
pub struct ReceiptWatch {
    client: Arc<EvmClient>,
    interval: Duration,
    max_polls: usize,
}

impl ReceiptWatch {
    pub fn new(client: Arc<EvmClient>) -> Self {
        Self {
            client,
            interval: POLL_INTERVAL,
            max_polls: MAX_POLLS,
        }
    }
}

struct PollState {
    client: Arc<EvmClient>,
    hash: String,
    interval: Duration,
    remaining: usize,
    cancelled: Arc<AtomicBool>,
    done: bool,
    first: bool,
}

/// Snapshot for a pending transaction
fn pending(hash: &str) -> Value {
    json!({ "transactionHash": hash, "status": "pending" })
}

fn mined(receipt: &Value) -> bool {
    receipt.get("blockNumber").is_some_and(|n| !n.is_null())
}

async fn poll(mut state: PollState) -> Option<(Value, PollState)> {
    if state.done || state.remaining == 0 || state.cancelled.load(Ordering::SeqCst) {
        return None;
    }
    if !state.first {
        tokio::time::sleep(state.interval).await;
        if state.cancelled.load(Ordering::SeqCst) {
            return None;
        }
    }
    state.first = false;
    state.remaining -= 1;

    let snapshot = match state.client.receipt(&state.hash).await {
        Ok(Value::Null) => pending(&state.hash),
        Ok(receipt) => {
            state.done = mined(&receipt);
            receipt
        }
        Err(err) => {
            warn!(tx = %state.hash, error = %err, "Receipt poll failed");
            pending(&state.hash)
        }
    };
    Some((snapshot, state))
}

#[async_trait]
impl TransactionWatch for ReceiptWatch {
    async fn subscribe(&self, transaction_id: &str) -> Result<Subscription, CallError> {
        if transaction_id.trim().is_empty() {
            return Err(CallError::new("Missing transaction hash"));
        }
        debug!(tx = transaction_id, endpoint = self.client.endpoint(), "Watching receipt");
        let cancelled = Arc::new(AtomicBool::new(false));
        let state = PollState {
            client: Arc::clone(&self.client),
            hash: transaction_id.to_string(),
            interval: self.interval,
            remaining: self.max_polls,
            cancelled: Arc::clone(&cancelled),
            done: false,
            first: true,
        };
        Ok(Subscription {
            snapshots: stream::unfold(state, poll).boxed(),
            unsubscribe: Box::new(move || cancelled.store(true, Ordering::SeqCst)),
        })
    }

    fn is_terminal(&self, snapshot: &Value) -> bool {
        mined(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_requires_block_number() {
        assert!(!mined(&pending("0x1")));
        assert!(!mined(&json!({ "blockNumber": null })));
        assert!(mined(&json!({ "blockNumber": "0x10", "status": "0x1" })));
    }

    #[tokio::test]
    async fn test_cancelled_feed_ends() {
        let client = Arc::new(EvmClient::connect("http://127.0.0.1:1").unwrap());
        let watch = ReceiptWatch::new(client);
        let subscription = watch.subscribe("0xabc").await.unwrap();
        (subscription.unsubscribe)();
        let snapshots: Vec<Value> = subscription.snapshots.collect().await;
        assert!(snapshots.is_empty());
    }

    #[tokio::test]
    async fn test_blank_hash_rejected() {
        let client = Arc::new(EvmClient::connect("http://127.0.0.1:1").unwrap());
        assert!(ReceiptWatch::new(client).subscribe(" ").await.is_err());
    }
}
