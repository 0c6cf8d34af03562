//! Chain endpoint clients used by the built-in catalogs

pub mod evm;
pub mod layout;
pub mod rest;

pub use evm::{EvmClient, ReceiptWatch, SignMethod};
pub use layout::ProgramLayout;
pub use rest::{AptosClient, FlowClient, SolanaClient};
