//! Client configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use market_core::{Pubkey, MARKETPLACE_PROGRAM_ID, MARKETPLACE_TOKEN_MINT};
use serde::{Deserialize, Serialize};

pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// Upper bound on a single JSON-RPC round trip.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How far the cluster must have progressed on a transaction before it
/// counts as landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Commitment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            other => Err(format!(
                "unknown commitment {other:?}, expected processed, confirmed or finalized"
            )),
        }
    }
}

/// Everything a [`MarketplaceClient`](crate::MarketplaceClient) needs besides
/// its transport and signers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub rpc_url: String,
    pub program_id: Pubkey,
    pub token_mint: Pubkey,
    /// Wallet that collects marketplace fees. `None` means the marketplace
    /// authority, which is what `initialize` registers by default. Must
    /// match the wallet the marketplace was initialized with.
    pub treasury_wallet: Option<Pubkey>,
    pub commitment: Commitment,
    /// Upper bound on waiting for a submitted transaction to land.
    pub confirm_timeout: Duration,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    /// Total send attempts for one signed transaction, including the first.
    pub max_send_attempts: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            program_id: MARKETPLACE_PROGRAM_ID,
            token_mint: MARKETPLACE_TOKEN_MINT,
            treasury_wallet: None,
            commitment: Commitment::default(),
            confirm_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_send_attempts: 3,
        }
    }
}
