use std::time::Duration;

use market_core::{CoreError, Pubkey, Signature};
use thiserror::Error;

/// Errors raised while talking to the ledger or driving a submission.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("transaction rejected in preflight: {message}")]
    PreflightRejected { message: String, logs: Vec<String> },

    #[error("transaction {signature} failed on chain: {error}")]
    ExecutionFailed { signature: Signature, error: String },

    #[error("{instruction} already applied: account {address} exists")]
    IdempotencyCollision {
        address: Pubkey,
        instruction: &'static str,
    },

    #[error("transaction {signature} not confirmed after {waited:?}; query its status before retrying")]
    ConfirmationTimeout {
        signature: Signature,
        waited: Duration,
    },

    #[error("result set truncated by node: {0}")]
    ResultSetTruncated(String),

    #[error("account not found: {0}")]
    AccountNotFound(Pubkey),

    #[error("insufficient funds: need {needed} lamports, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Whether resending the same signed bytes may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }

    /// Program log lines attached to a preflight rejection, if any.
    pub fn logs(&self) -> &[String] {
        match self {
            ClientError::PreflightRejected { logs, .. } => logs,
            _ => &[],
        }
    }
}
