//! JSON-RPC plumbing.
//!
//! [`RpcTransport`] is the seam between this crate and the network: one
//! request in, one `result` value out. [`HttpTransport`] is the production
//! implementation; tests substitute an in-memory ledger. [`RpcClient`] layers
//! typed methods on top of any transport.

pub mod http;
pub mod types;

use std::future::Future;

use serde_json::Value;

pub use http::HttpTransport;
pub use types::{RawAccount, RpcErrorObject, SignatureStatus};

use crate::error::ClientError;

/// JSON-RPC error code for a transaction rejected by preflight simulation.
pub const PREFLIGHT_FAILURE_CODE: i64 = -32002;
/// JSON-RPC error code for a node that is behind or unhealthy.
pub const NODE_UNHEALTHY_CODE: i64 = -32005;
/// JSON-RPC error code for a `getProgramAccounts` scan the node gave up on.
pub const SCAN_LIMIT_CODE: i64 = -32010;

/// Sends one JSON-RPC request and returns its `result`.
///
/// Implementations map an RPC `error` object through [`classify_rpc_error`]
/// and network failures to [`ClientError::Transport`].
pub trait RpcTransport: Send + Sync {
    fn call(
        &self,
        method: &str,
        params: Value,
    ) -> impl Future<Output = Result<Value, ClientError>> + Send;
}

impl<T: RpcTransport> RpcTransport for &T {
    fn call(
        &self,
        method: &str,
        params: Value,
    ) -> impl Future<Output = Result<Value, ClientError>> + Send {
        (**self).call(method, params)
    }
}

/// Map an RPC error object onto the client's error taxonomy.
pub fn classify_rpc_error(err: RpcErrorObject) -> ClientError {
    let lowered = err.message.to_ascii_lowercase();

    if err.code == PREFLIGHT_FAILURE_CODE {
        let logs = err
            .data
            .as_ref()
            .and_then(|d| d.get("logs"))
            .and_then(Value::as_array)
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        return ClientError::PreflightRejected {
            message: err.message,
            logs,
        };
    }

    if err.code == SCAN_LIMIT_CODE
        || lowered.contains("scan aborted")
        || lowered.contains("too many accounts")
        || lowered.contains("response too large")
    {
        return ClientError::ResultSetTruncated(err.message);
    }

    if err.code == NODE_UNHEALTHY_CODE {
        return ClientError::Transport(err.message);
    }

    ClientError::Rpc {
        code: err.code,
        message: err.message,
    }
}

/// Typed RPC methods over a transport.
///
/// Query methods live in [`crate::query`], submission methods in
/// [`crate::submit`].
#[derive(Debug)]
pub struct RpcClient<T> {
    transport: T,
}

impl<T: RpcTransport> RpcClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) async fn request<R>(&self, method: &str, params: Value) -> Result<R, ClientError>
    where
        R: serde::de::DeserializeOwned,
    {
        tracing::trace!(method, "rpc request");
        let result = self.transport.call(method, params).await?;
        serde_json::from_value(result)
            .map_err(|e| ClientError::InvalidResponse(format!("{method}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn err(code: i64, message: &str, data: Option<Value>) -> RpcErrorObject {
        RpcErrorObject {
            code,
            message: message.into(),
            data,
        }
    }

    #[test]
    fn preflight_failure_keeps_logs() {
        let classified = classify_rpc_error(err(
            -32002,
            "Transaction simulation failed: Error processing Instruction 0: custom program error: 0x0",
            Some(json!({
                "err": { "InstructionError": [0, { "Custom": 0 }] },
                "logs": [
                    "Program 3RAeCuRqF9kGXyXwk9Lynj19fuxJJj5RXCga9KiihaKF invoke [1]",
                    "Allocate: account Address { address: 7Qqer..., base: None } already in use"
                ]
            })),
        ));
        match classified {
            ClientError::PreflightRejected { logs, .. } => {
                assert_eq!(logs.len(), 2);
                assert!(logs[1].contains("already in use"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn scan_limits_become_truncation() {
        assert!(matches!(
            classify_rpc_error(err(-32010, "scan limit", None)),
            ClientError::ResultSetTruncated(_)
        ));
        assert!(matches!(
            classify_rpc_error(err(-32600, "Scan aborted: The accumulated scan results exceeded the limit", None)),
            ClientError::ResultSetTruncated(_)
        ));
    }

    #[test]
    fn unhealthy_node_is_retryable() {
        assert!(classify_rpc_error(err(-32005, "Node is behind by 42 slots", None)).is_retryable());
    }

    #[test]
    fn other_codes_pass_through() {
        assert!(matches!(
            classify_rpc_error(err(-32602, "Invalid params", None)),
            ClientError::Rpc { code: -32602, .. }
        ));
    }
}
