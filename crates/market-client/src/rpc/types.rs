//! JSON shapes of the RPC methods this crate uses.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use market_core::Pubkey;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Commitment;
use crate::error::ClientError;

/// The `{ jsonrpc, id, result | error }` envelope.
#[derive(Debug, Deserialize)]
pub struct RpcEnvelope {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Responses wrapped as `{ context: { slot }, value }`.
#[derive(Debug, Deserialize)]
pub struct WithContext<T> {
    pub value: T,
}

/// An account as returned with `"encoding": "base64"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiAccount {
    pub lamports: u64,
    pub owner: String,
    /// `[payload, "base64"]`
    pub data: (String, String),
    #[serde(default)]
    pub executable: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyedUiAccount {
    pub pubkey: String,
    pub account: UiAccount,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestBlockhash {
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    #[serde(default)]
    pub slot: u64,
    #[serde(default)]
    pub confirmations: Option<u64>,
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub confirmation_status: Option<Commitment>,
}

impl SignatureStatus {
    /// Effective commitment. A status without `confirmationStatus` and
    /// without a confirmation count has been rooted.
    pub fn commitment(&self) -> Commitment {
        match (self.confirmation_status, self.confirmations) {
            (Some(c), _) => c,
            (None, None) => Commitment::Finalized,
            (None, Some(_)) => Commitment::Processed,
        }
    }

    pub fn reaches(&self, target: Commitment) -> bool {
        self.commitment() >= target
    }
}

/// Raw account contents with the payload already base64-decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAccount {
    pub lamports: u64,
    pub owner: Pubkey,
    pub data: Vec<u8>,
    pub executable: bool,
}

impl TryFrom<UiAccount> for RawAccount {
    type Error = ClientError;

    fn try_from(ui: UiAccount) -> Result<Self, Self::Error> {
        let (payload, encoding) = ui.data;
        if encoding != "base64" {
            return Err(ClientError::InvalidResponse(format!(
                "expected base64 account data, got {encoding}"
            )));
        }
        let data = STANDARD
            .decode(payload.as_bytes())
            .map_err(|e| ClientError::InvalidResponse(format!("bad base64 account data: {e}")))?;
        let owner = ui
            .owner
            .parse()
            .map_err(|e| ClientError::InvalidResponse(format!("bad owner: {e}")))?;

        Ok(Self {
            lamports: ui.lamports,
            owner,
            data,
            executable: ui.executable,
        })
    }
}

impl From<&RawAccount> for UiAccount {
    fn from(raw: &RawAccount) -> Self {
        Self {
            lamports: raw.lamports,
            owner: raw.owner.to_string(),
            data: (STANDARD.encode(&raw.data), "base64".to_string()),
            executable: raw.executable,
        }
    }
}
