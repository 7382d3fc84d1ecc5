use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};

use super::types::RpcEnvelope;
use super::{classify_rpc_error, RpcTransport};
use crate::error::ClientError;

/// JSON-RPC over HTTP POST.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpTransport {
    /// Transport whose every request gives up after `request_timeout`.
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ClientError::Transport(format!("cannot build http client: {e}")))?;
        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RpcTransport for HttpTransport {
    async fn call(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::to_vec(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))
        .map_err(|e| ClientError::InvalidResponse(format!("cannot encode request: {e}")))?;

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        // Error objects may arrive with a non-2xx status; prefer them when
        // the body parses.
        let envelope: RpcEnvelope = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ClientError::Transport(format!("{method}: http status {status}")));
            }
            Err(e) => {
                return Err(ClientError::InvalidResponse(format!("{method}: {e}")));
            }
        };

        if let Some(err) = envelope.error {
            tracing::debug!(method, code = err.code, message = %err.message, "rpc error");
            return Err(classify_rpc_error(err));
        }
        Ok(envelope.result.unwrap_or(Value::Null))
    }
}
