use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::core::request::Signer;
use crate::domain::chain::Chain;

pub const DEFAULT_EVM_RPC: &str = "http://127.0.0.1:8545";
pub const DEFAULT_FLOW_ACCESS_API: &str = "https://rest-testnet.onflow.org";
pub const DEFAULT_APTOS_NODE_URL: &str = "https://fullnode.testnet.aptoslabs.com/v1";
pub const DEFAULT_SOLANA_RPC: &str = "https://api.devnet.solana.com";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EvmConfig {
    #[serde(default = "default_evm_rpc")]
    pub rpc: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FlowConfig {
    #[serde(default = "default_flow_access_api")]
    pub access_api: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AptosConfig {
    #[serde(default = "default_aptos_node_url")]
    pub node_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SolanaConfig {
    #[serde(default = "default_solana_rpc")]
    pub rpc: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignerSpec {
    pub address: String,
    pub private_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub default_chain: Option<String>,

    #[serde(default)]
    pub evm: EvmConfig,

    #[serde(default)]
    pub flow: FlowConfig,

    #[serde(default)]
    pub aptos: AptosConfig,

    #[serde(default)]
    pub solana: SolanaConfig,

    #[serde(default)]
    pub signers: Vec<SignerSpec>,
}

fn default_evm_rpc() -> String {
    DEFAULT_EVM_RPC.to_string()
}

fn default_flow_access_api() -> String {
    DEFAULT_FLOW_ACCESS_API.to_string()
}

fn default_aptos_node_url() -> String {
    DEFAULT_APTOS_NODE_URL.to_string()
}

fn default_solana_rpc() -> String {
    DEFAULT_SOLANA_RPC.to_string()
}

impl Default for EvmConfig {
    fn default() -> Self {
        Self { rpc: default_evm_rpc() }
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            access_api: default_flow_access_api(),
        }
    }
}

impl Default for AptosConfig {
    fn default() -> Self {
        Self {
            node_url: default_aptos_node_url(),
        }
    }
}

impl Default for SolanaConfig {
    fn default() -> Self {
        Self {
            rpc: default_solana_rpc(),
        }
    }
}

impl Config {
    /// Configured default chain; unknown names fall back to EVM
    pub fn default_chain(&self) -> Chain {
        self.default_chain
            .as_deref()
            .and_then(|name| name.parse().ok())
            .unwrap_or(Chain::Evm)
    }

    /// Endpoint of `chain`
    pub fn endpoint(&self, chain: Chain) -> &str {
        match chain {
            Chain::Evm => &self.evm.rpc,
            Chain::Flow => &self.flow.access_api,
            Chain::Aptos => &self.aptos.node_url,
            Chain::Solana => &self.solana.rpc,
        }
    }

    /// Replace the endpoint of `chain`
    pub fn set_endpoint(&mut self, chain: Chain, url: impl Into<String>) {
        let url = url.into();
        match chain {
            Chain::Evm => self.evm.rpc = url,
            Chain::Flow => self.flow.access_api = url,
            Chain::Aptos => self.aptos.node_url = url,
            Chain::Solana => self.solana.rpc = url,
        }
    }

    pub fn signers(&self) -> Vec<Signer> {
        self.signers
            .iter()
            .map(|s| Signer {
                address: s.address.clone(),
                private_key: s.private_key.clone(),
            })
            .collect()
    }
}

pub fn load() -> Config {
    match config_path() {
        Some(path) => load_from(&path),
        None => Config::default(),
    }
}

/// Read `path`; a missing or malformed file yields the defaults
pub fn load_from(path: &Path) -> Config {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => {
            debug!(path = %path.display(), "No config file, using defaults");
            return Config::default();
        }
    };
    match toml::from_str::<Config>(&content) {
        Ok(config) => config,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Ignoring malformed config");
            Config::default()
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("WALLETLAB_CONFIG").map(PathBuf::from) {
        return Some(path);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("walletlab").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("walletlab").join("config.toml"));
    }

    directories::ProjectDirs::from("io", "walletlab", "walletlab")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
