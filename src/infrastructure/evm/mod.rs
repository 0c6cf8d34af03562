//! EVM JSON-RPC access via alloy

pub mod client;
pub mod receipt;

pub use client::{EvmClient, SignMethod, ENTRY_POINT};
pub use receipt::ReceiptWatch;
