//! walletlab: a multi-chain wallet playground engine.
//!
//! Templates are imported into an editor session, edited, coerced into
//! chain-native values and dispatched to per-chain callables. Submitted
//! transactions are observed until they seal.

pub mod catalog;
pub mod config;
pub mod core;
pub mod domain;
pub mod infrastructure;
pub mod logging;
