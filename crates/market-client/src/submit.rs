//! Submission and confirmation.
//!
//! A transaction is signed once. Every resend after a transport failure
//! reuses the exact same wire bytes, so the cluster sees at most one
//! distinct transaction and a duplicate is detected by signature.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use market_core::{Signature, SignedTransaction};
use serde_json::json;
use tokio::time::Instant;

use crate::config::{ClientConfig, Commitment};
use crate::error::ClientError;
use crate::rpc::types::{LatestBlockhash, WithContext};
use crate::rpc::{RpcClient, RpcTransport, SignatureStatus};

/// Knobs for one send-and-confirm cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOptions {
    pub commitment: Commitment,
    pub confirm_timeout: Duration,
    pub poll_interval: Duration,
    pub max_send_attempts: u32,
}

impl From<&ClientConfig> for SubmitOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            commitment: config.commitment,
            confirm_timeout: config.confirm_timeout,
            poll_interval: config.poll_interval,
            max_send_attempts: config.max_send_attempts.max(1),
        }
    }
}

/// Whether an error says the cluster already holds this exact transaction.
pub fn is_already_processed(err: &ClientError) -> bool {
    let mentions = |text: &str| {
        let text = text.to_ascii_lowercase();
        text.contains("already been processed") || text.contains("alreadyprocessed")
    };
    match err {
        ClientError::PreflightRejected { message, logs } => {
            mentions(message) || logs.iter().any(|l| mentions(l))
        }
        ClientError::Rpc { message, .. } => mentions(message),
        _ => false,
    }
}

impl<T: RpcTransport> RpcClient<T> {
    pub async fn get_latest_blockhash(
        &self,
        commitment: Commitment,
    ) -> Result<[u8; 32], ClientError> {
        let response: WithContext<LatestBlockhash> = self
            .request("getLatestBlockhash", json!([{ "commitment": commitment }]))
            .await?;

        let bytes = bs58::decode(&response.value.blockhash)
            .into_vec()
            .map_err(|e| ClientError::InvalidResponse(format!("bad blockhash: {e}")))?;
        let blockhash: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            ClientError::InvalidResponse(format!("blockhash is {} bytes", v.len()))
        })?;

        tracing::debug!(
            blockhash = %response.value.blockhash,
            last_valid_block_height = response.value.last_valid_block_height,
            "fetched blockhash"
        );
        Ok(blockhash)
    }

    /// Submit wire bytes once. Preflight runs at `commitment`.
    pub async fn send_transaction(
        &self,
        wire: &[u8],
        commitment: Commitment,
    ) -> Result<Signature, ClientError> {
        let signature: String = self
            .request(
                "sendTransaction",
                json!([
                    STANDARD.encode(wire),
                    { "encoding": "base64", "preflightCommitment": commitment },
                ]),
            )
            .await?;
        signature.parse::<Signature>().map_err(ClientError::from)
    }

    /// Status of one signature, `None` if the cluster has not seen it.
    pub async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, ClientError> {
        let response: WithContext<Vec<Option<SignatureStatus>>> = self
            .request(
                "getSignatureStatuses",
                json!([[signature.to_string()], { "searchTransactionHistory": true }]),
            )
            .await?;
        Ok(response.value.into_iter().next().flatten())
    }

    /// Send a signed transaction, resending the same bytes on transport
    /// failures up to `max_send_attempts` times in total.
    ///
    /// A duplicate-submission rejection resolves to the transaction's own
    /// signature; confirmation then reports how the earlier copy fared.
    pub async fn send_with_retry(
        &self,
        tx: &SignedTransaction,
        options: &SubmitOptions,
    ) -> Result<Signature, ClientError> {
        let wire = tx.to_wire()?;
        let expected = *tx.signature().ok_or_else(|| {
            ClientError::Core(market_core::CoreError::SigningError(
                "transaction carries no signatures".into(),
            ))
        })?;

        let max_attempts = options.max_send_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.send_transaction(&wire, options.commitment).await {
                Ok(signature) => {
                    tracing::info!(%signature, attempt, bytes = wire.len(), "transaction sent");
                    return Ok(signature);
                }
                Err(e) if is_already_processed(&e) => {
                    tracing::info!(signature = %expected, "transaction already processed, checking its status");
                    return Ok(expected);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    tracing::warn!(attempt, max_attempts, error = %e, "send failed, resending same transaction");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Poll until `signature` reaches the requested commitment, fails on
    /// chain, or the timeout elapses.
    ///
    /// The timeout bounds the whole wait, including a status request that
    /// never answers.
    pub async fn confirm_signature(
        &self,
        signature: &Signature,
        options: &SubmitOptions,
    ) -> Result<SignatureStatus, ClientError> {
        let start = Instant::now();
        let deadline = start + options.confirm_timeout;

        loop {
            let polled = tokio::time::timeout_at(deadline, self.get_signature_status(signature))
                .await
                .map_err(|_| timed_out(signature, start))?;

            match polled {
                Ok(Some(status)) => {
                    if let Some(err) = &status.err {
                        return Err(ClientError::ExecutionFailed {
                            signature: *signature,
                            error: err.to_string(),
                        });
                    }
                    if status.reaches(options.commitment) {
                        tracing::info!(
                            %signature,
                            slot = status.slot,
                            commitment = %status.commitment(),
                            "transaction confirmed"
                        );
                        return Ok(status);
                    }
                    tracing::debug!(%signature, commitment = %status.commitment(), "waiting for commitment");
                }
                Ok(None) => tracing::debug!(%signature, "signature not yet visible"),
                // Polling is read-only; a flaky node only delays the answer.
                Err(e) if e.is_retryable() => {
                    tracing::debug!(%signature, error = %e, "status poll failed");
                }
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline {
                return Err(timed_out(signature, start));
            }
            let next_poll = (Instant::now() + options.poll_interval).min(deadline);
            tokio::time::sleep_until(next_poll).await;
        }
    }

    pub async fn send_and_confirm(
        &self,
        tx: &SignedTransaction,
        options: &SubmitOptions,
    ) -> Result<Signature, ClientError> {
        let signature = self.send_with_retry(tx, options).await?;
        self.confirm_signature(&signature, options).await?;
        Ok(signature)
    }
}

fn timed_out(signature: &Signature, start: Instant) -> ClientError {
    let waited = start.elapsed();
    tracing::warn!(%signature, ?waited, "confirmation timed out");
    ClientError::ConfirmationTimeout {
        signature: *signature,
        waited,
    }
}
