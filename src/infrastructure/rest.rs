//! HTTP clients for the non-EVM chains
//!
//! - Flow Access REST API: read-only Cadence scripts
//! - Aptos fullnode REST API: account resources
//! - Solana JSON-RPC: raw account data

use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Map, Value};
use tracing::debug;

const TIMEOUT: Duration = Duration::from_secs(10);

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

async fn read_json(response: reqwest::Response, what: &str) -> Result<Value> {
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {what} response"))?;
    if !status.is_success() {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string());
        bail!("{what} returned {status}: {message}");
    }
    Ok(body)
}

// ============================================================================
// Flow
// ============================================================================

pub struct FlowClient {
    http: reqwest::Client,
    base: String,
}

impl FlowClient {
    pub fn new(access_api: &str) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            base: trim_base(access_api),
        })
    }

    /// Execute a read-only script against the latest sealed block.
    /// `arguments` are JSON-Cadence values; the result is simplified with
    /// [`simplify_cadence`].
    pub async fn execute_script(&self, code: &str, arguments: &[Value]) -> Result<Value> {
        let body = json!({
            "script": BASE64.encode(code),
            "arguments": arguments
                .iter()
                .map(|a| BASE64.encode(a.to_string()))
                .collect::<Vec<_>>(),
        });
        let url = format!("{}/v1/scripts?block_height=sealed", self.base);
        debug!(%url, args = arguments.len(), "Executing Cadence script");
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Flow access API unreachable")?;
        let encoded = read_json(response, "Flow script").await?;
        let encoded = encoded
            .as_str()
            .context("Flow script result is not a string")?;
        let decoded = BASE64
            .decode(encoded.trim())
            .context("Flow script result is not base64")?;
        let cadence: Value =
            serde_json::from_slice(&decoded).context("Flow script result is not JSON-Cadence")?;
        Ok(simplify_cadence(&cadence))
    }
}

/// Strip JSON-Cadence type tags down to plain JSON
pub fn simplify_cadence(value: &Value) -> Value {
    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        return value.clone();
    };
    let inner = value.get("value").unwrap_or(&Value::Null);
    match kind {
        "Optional" => {
            if inner.is_null() {
                Value::Null
            } else {
                simplify_cadence(inner)
            }
        }
        "Void" => Value::Null,
        "Array" => Value::Array(
            inner
                .as_array()
                .map(|items| items.iter().map(simplify_cadence).collect())
                .unwrap_or_default(),
        ),
        "Dictionary" => {
            let mut out = Map::new();
            for entry in inner.as_array().into_iter().flatten() {
                let key = simplify_cadence(entry.get("key").unwrap_or(&Value::Null));
                let key = match key {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                out.insert(key, simplify_cadence(entry.get("value").unwrap_or(&Value::Null)));
            }
            Value::Object(out)
        }
        "Struct" | "Resource" | "Event" | "Contract" | "Enum" => {
            let mut out = Map::new();
            for field in inner
                .get("fields")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                if let Some(name) = field.get("name").and_then(Value::as_str) {
                    out.insert(
                        name.to_string(),
                        simplify_cadence(field.get("value").unwrap_or(&Value::Null)),
                    );
                }
            }
            Value::Object(out)
        }
        "Path" => {
            let domain = inner.get("domain").and_then(Value::as_str).unwrap_or("");
            let identifier = inner.get("identifier").and_then(Value::as_str).unwrap_or("");
            Value::String(format!("/{domain}/{identifier}"))
        }
        _ => inner.clone(),
    }
}

// ============================================================================
// Aptos
// ============================================================================

pub struct AptosClient {
    http: reqwest::Client,
    base: String,
}

impl AptosClient {
    /// `node_url` includes the `/v1` prefix
    pub fn new(node_url: &str) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            base: trim_base(node_url),
        })
    }

    pub async fn account_resources(&self, address: &str) -> Result<Vec<Value>> {
        let url = format!("{}/accounts/{}/resources", self.base, address);
        debug!(%url, "Fetching Aptos resources");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Aptos fullnode unreachable")?;
        match read_json(response, "Aptos resources").await? {
            Value::Array(resources) => Ok(resources),
            other => bail!("Unexpected Aptos resources payload: {other}"),
        }
    }

    /// `data` of the resource whose type equals `resource_type`
    pub async fn resource(&self, address: &str, resource_type: &str) -> Result<Option<Value>> {
        let resources = self.account_resources(address).await?;
        Ok(find_resource(resources, resource_type))
    }
}

fn find_resource(resources: Vec<Value>, resource_type: &str) -> Option<Value> {
    resources
        .into_iter()
        .find(|r| r.get("type").and_then(Value::as_str) == Some(resource_type))
        .and_then(|mut r| r.get_mut("data").map(Value::take))
}

// ============================================================================
// Solana
// ============================================================================

pub struct SolanaClient {
    http: reqwest::Client,
    rpc: String,
}

impl SolanaClient {
    pub fn new(rpc: &str) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            rpc: rpc.to_string(),
        })
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let body = json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params });
        debug!(rpc = %self.rpc, method, "Solana RPC request");
        let response = self
            .http
            .post(&self.rpc)
            .json(&body)
            .send()
            .await
            .context("Solana RPC unreachable")?;
        let mut reply = read_json(response, method).await?;
        if let Some(error) = reply.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            bail!("{method} failed: {message}");
        }
        Ok(reply.get_mut("result").map(Value::take).unwrap_or(Value::Null))
    }

    /// Raw account data, `None` when the account does not exist
    pub async fn account_data(&self, pubkey: &str) -> Result<Option<Vec<u8>>> {
        let result = self
            .request("getAccountInfo", json!([pubkey, { "encoding": "base64" }]))
            .await?;
        account_bytes(&result)
    }
}

fn account_bytes(result: &Value) -> Result<Option<Vec<u8>>> {
    let value = match result.get("value") {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value,
    };
    let encoded = value
        .get("data")
        .and_then(|d| d.get(0))
        .and_then(Value::as_str)
        .context("Account data missing")?;
    let bytes = BASE64
        .decode(encoded)
        .context("Account data is not base64")?;
    Ok(Some(bytes))
}
