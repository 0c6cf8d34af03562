//! Supported chain families

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::coerce::{self, Coercer};

/// Chain family an editor session talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Flow,
    Evm,
    Solana,
    Aptos,
}

impl Chain {
    pub const ALL: [Chain; 4] = [Chain::Flow, Chain::Evm, Chain::Solana, Chain::Aptos];

    pub fn name(&self) -> &'static str {
        match self {
            Chain::Flow => "flow",
            Chain::Evm => "evm",
            Chain::Solana => "solana",
            Chain::Aptos => "aptos",
        }
    }

    /// Argument vocabulary used to coerce values for this chain
    pub fn coercer(&self) -> &'static dyn Coercer {
        match self {
            Chain::Flow => &coerce::flow::FlowCoercer,
            Chain::Evm => &coerce::evm::EvmCoercer,
            Chain::Solana => &coerce::solana::SolanaCoercer,
            Chain::Aptos => &coerce::aptos::AptosCoercer,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flow" => Ok(Chain::Flow),
            "evm" | "eth" | "ethereum" => Ok(Chain::Evm),
            "solana" | "sol" => Ok(Chain::Solana),
            "aptos" | "apt" => Ok(Chain::Aptos),
            other => Err(format!(
                "unknown chain '{}' (expected flow, evm, solana or aptos)",
                other
            )),
        }
    }
}
