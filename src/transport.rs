//! Chain RPC transport.
//!
//! The wallet-connection and chain-RPC stack is externally owned; this
//! module is the seam the gateway talks through. `HttpTransport` speaks
//! JSON-RPC against a node endpoint, with call arguments JSON-serialized
//! and base64-encoded in the request body. Tests swap in a mock
//! implementation of `ChainTransport`.

use crate::error::{ClientError, ContractError};
use crate::types::{Address, TxReceipt};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Value};
use std::sync::OnceLock;
use std::time::Duration;

static HTTP: OnceLock<reqwest::Client> = OnceLock::new();

/// Shared HTTP client for the whole process (gateway, media probe, pinning).
pub(crate) fn http_client() -> &'static reqwest::Client {
    HTTP.get_or_init(|| {
        reqwest::Client::builder()
            .pool_max_idle_per_host(8)
            .tcp_nodelay(true)
            .build()
            .expect("reqwest client")
    })
}

/// A read-only contract call. The connected account rides along as caller
/// context even for calls that do not strictly need it, because some views
/// (interaction state) vary by caller.
#[derive(Clone, Debug)]
pub struct CallRequest {
    pub contract: Address,
    pub function: &'static str,
    pub args: Value,
    pub caller: Option<Address>,
}

/// A state-changing contract call, signed as `from`.
#[derive(Clone, Debug)]
pub struct TxRequest {
    pub contract: Address,
    pub function: &'static str,
    pub args: Value,
    pub from: Address,
}

#[async_trait]
pub trait ChainTransport: Send + Sync {
    /// Execute a view call and return the raw decoded result value.
    async fn call(&self, req: CallRequest) -> Result<Value, ClientError>;

    /// Submit a transaction; returns its hash. Confirmation is the
    /// gateway's job.
    async fn submit(&self, req: TxRequest) -> Result<String, ClientError>;

    /// Poll for a transaction receipt. `None` means not yet included.
    async fn receipt(&self, tx_hash: &str) -> Result<Option<TxReceipt>, ClientError>;

    fn chain_id(&self) -> u64;
}

/// JSON-RPC transport over HTTP.
pub struct HttpTransport {
    url: String,
    chain_id: u64,
    timeout_ms: u64,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, chain_id: u64, timeout_ms: u64) -> Self {
        HttpTransport {
            url: url.into(),
            chain_id,
            timeout_ms,
        }
    }

    async fn rpc_post(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": "socialchain",
            "method": method,
            "params": params,
        });

        // Small, bounded retry on transient HTTP failures
        let mut attempt = 0u32;
        loop {
            let res = http_client()
                .post(&self.url)
                .json(&body)
                .timeout(Duration::from_millis(self.timeout_ms))
                .send()
                .await?;

            if res.status().is_success() {
                let v: Value = res.json().await?;
                if let Some(err) = v.get("error") {
                    return Err(decode_rpc_error(err));
                }
                if let Some(r) = v.get("result") {
                    return Ok(r.clone());
                }
                return Err(ClientError::ChainCallFailed(
                    "invalid rpc payload (no result)".into(),
                ));
            }

            if matches!(res.status().as_u16(), 429 | 500 | 502 | 503 | 504) && attempt < 2 {
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(150 * attempt as u64)).await;
                continue;
            }
            return Err(ClientError::ChainCallFailed(format!(
                "http {}",
                res.status()
            )));
        }
    }
}

/// A revert carries the contract's named error in `error.data.name`;
/// anything else is a transport-level failure.
fn decode_rpc_error(err: &Value) -> ClientError {
    if let Some(name) = err
        .get("data")
        .and_then(|d| d.get("name"))
        .and_then(|n| n.as_str())
    {
        return ClientError::ChainCallReverted(ContractError::from_name(name));
    }
    let code = err.get("code").and_then(|c| c.as_i64()).unwrap_or_default();
    let msg = err
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("rpc error");
    ClientError::ChainCallFailed(format!("rpc {code} {msg}"))
}

#[async_trait]
impl ChainTransport for HttpTransport {
    async fn call(&self, req: CallRequest) -> Result<Value, ClientError> {
        let args_json = serde_json::to_string(&req.args)
            .map_err(|e| ClientError::ChainCallFailed(e.to_string()))?;
        let args_base64 = general_purpose::STANDARD.encode(args_json.as_bytes());

        log::debug!("[transport] call {} from {:?}", req.function, req.caller);
        self.rpc_post(
            "contract_call",
            json!({
                "to": req.contract,
                "function": req.function,
                "args_base64": args_base64,
                "from": req.caller,
            }),
        )
        .await
    }

    async fn submit(&self, req: TxRequest) -> Result<String, ClientError> {
        let args_json = serde_json::to_string(&req.args)
            .map_err(|e| ClientError::ChainCallFailed(e.to_string()))?;
        let args_base64 = general_purpose::STANDARD.encode(args_json.as_bytes());

        log::info!("[transport] submit {} from {}", req.function, req.from);
        let v = self
            .rpc_post(
                "contract_sendTransaction",
                json!({
                    "to": req.contract,
                    "function": req.function,
                    "args_base64": args_base64,
                    "from": req.from,
                }),
            )
            .await?;
        v.as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ClientError::ChainCallFailed(format!("bad tx hash {v}")))
    }

    async fn receipt(&self, tx_hash: &str) -> Result<Option<TxReceipt>, ClientError> {
        let v = self
            .rpc_post("contract_getTransactionReceipt", json!([tx_hash]))
            .await?;
        if v.is_null() {
            return Ok(None);
        }
        let block_number = v
            .get("blockNumber")
            .and_then(|b| b.as_u64())
            .unwrap_or_default();
        let success = match v.get("status") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s == "0x1" || s == "1",
            Some(Value::Number(n)) => n.as_u64() == Some(1),
            _ => false,
        };
        Ok(Some(TxReceipt {
            tx_hash: tx_hash.to_string(),
            block_number,
            success,
        }))
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revert_data_decodes_to_named_error() {
        let err = decode_rpc_error(&json!({
            "code": 3,
            "message": "execution reverted",
            "data": { "name": "alreadyFollowing", "args": [] }
        }));
        assert!(matches!(
            err,
            ClientError::ChainCallReverted(ContractError::AlreadyFollowing)
        ));
    }

    #[test]
    fn plain_rpc_error_is_transport_failure() {
        let err = decode_rpc_error(&json!({"code": -32000, "message": "nope"}));
        match err {
            ClientError::ChainCallFailed(msg) => assert!(msg.contains("-32000")),
            other => panic!("expected ChainCallFailed, got {other:?}"),
        }
    }
}
