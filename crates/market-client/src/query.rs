//! Account queries: fetch raw accounts by address or by structural filter,
//! and decode them into marketplace records.

use market_core::{CoreError, Pubkey};
use serde_json::{json, Value};

use crate::config::Commitment;
use crate::error::ClientError;
use crate::rpc::types::{KeyedUiAccount, UiAccount, WithContext};
use crate::rpc::{RawAccount, RpcClient, RpcTransport};

/// A server-side `getProgramAccounts` filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Account data length equals exactly this many bytes.
    DataSize(u64),
    /// Account data at `offset` starts with `bytes`.
    Memcmp { offset: usize, bytes: Vec<u8> },
}

impl Filter {
    pub fn memcmp(offset: usize, bytes: impl AsRef<[u8]>) -> Self {
        Filter::Memcmp {
            offset,
            bytes: bytes.as_ref().to_vec(),
        }
    }

    /// Wire form. Memcmp bytes are sent Base58-encoded.
    pub fn to_json(&self) -> Value {
        match self {
            Filter::DataSize(size) => json!({ "dataSize": size }),
            Filter::Memcmp { offset, bytes } => json!({
                "memcmp": {
                    "offset": offset,
                    "bytes": bs58::encode(bytes).into_string(),
                }
            }),
        }
    }

    /// Evaluate the filter locally against account data.
    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            Filter::DataSize(size) => data.len() as u64 == *size,
            Filter::Memcmp { offset, bytes } => offset
                .checked_add(bytes.len())
                .and_then(|end| data.get(*offset..end))
                .is_some_and(|window| window == bytes.as_slice()),
        }
    }
}

/// Result of decoding a program-account scan. Accounts that failed to
/// decode are kept aside rather than failing the whole scan.
#[derive(Debug)]
pub struct ScanReport<R> {
    pub records: Vec<(Pubkey, R)>,
    pub skipped: Vec<(Pubkey, CoreError)>,
}

impl<R> ScanReport<R> {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Decode every account with `decode`, reporting (and logging) failures.
pub fn decode_accounts<R>(
    accounts: Vec<(Pubkey, RawAccount)>,
    decode: impl Fn(&[u8]) -> Result<R, CoreError>,
) -> ScanReport<R> {
    let mut records = Vec::with_capacity(accounts.len());
    let mut skipped = Vec::new();

    for (address, account) in accounts {
        match decode(&account.data) {
            Ok(record) => records.push((address, record)),
            Err(e) => {
                tracing::warn!(%address, error = %e, "skipping undecodable account");
                skipped.push((address, e));
            }
        }
    }

    ScanReport { records, skipped }
}

impl<T: RpcTransport> RpcClient<T> {
    /// Fetch one account. A missing account is `Ok(None)`.
    pub async fn get_account(
        &self,
        address: &Pubkey,
        commitment: Commitment,
    ) -> Result<Option<RawAccount>, ClientError> {
        let response: WithContext<Option<UiAccount>> = self
            .request(
                "getAccountInfo",
                json!([
                    address.to_string(),
                    { "encoding": "base64", "commitment": commitment },
                ]),
            )
            .await?;

        let account = response.value.map(RawAccount::try_from).transpose()?;
        tracing::debug!(
            %address,
            found = account.is_some(),
            len = account.as_ref().map_or(0, |a| a.data.len()),
            "fetched account"
        );
        Ok(account)
    }

    /// All accounts owned by `program` matching every filter. No matches is
    /// an empty vector.
    pub async fn get_program_accounts(
        &self,
        program: &Pubkey,
        filters: &[Filter],
        commitment: Commitment,
    ) -> Result<Vec<(Pubkey, RawAccount)>, ClientError> {
        let filters: Vec<Value> = filters.iter().map(Filter::to_json).collect();
        let keyed: Vec<KeyedUiAccount> = self
            .request(
                "getProgramAccounts",
                json!([
                    program.to_string(),
                    { "encoding": "base64", "commitment": commitment, "filters": filters },
                ]),
            )
            .await?;

        let accounts = keyed
            .into_iter()
            .map(|k| {
                let address: Pubkey = k
                    .pubkey
                    .parse()
                    .map_err(|e| ClientError::InvalidResponse(format!("bad account key: {e}")))?;
                Ok((address, RawAccount::try_from(k.account)?))
            })
            .collect::<Result<Vec<_>, ClientError>>()?;

        tracing::debug!(%program, matches = accounts.len(), "program account scan");
        Ok(accounts)
    }

    /// Lamport balance of an account (0 when it does not exist).
    pub async fn get_balance(
        &self,
        address: &Pubkey,
        commitment: Commitment,
    ) -> Result<u64, ClientError> {
        let response: WithContext<u64> = self
            .request(
                "getBalance",
                json!([address.to_string(), { "commitment": commitment }]),
            )
            .await?;
        Ok(response.value)
    }
}
