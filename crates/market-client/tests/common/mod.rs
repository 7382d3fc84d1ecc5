//! In-memory ledger implementing `RpcTransport`.
//!
//! It verifies signatures, executes marketplace instructions against a map
//! of accounts the way the deployed program would, and lets tests inject
//! transport failures, scan limits and unconfirmed transactions. Like the
//! runtime, it rejects writes to accounts the message marks read-only and
//! signer roles filled by keys that did not sign.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use market_client::rpc::types::UiAccount;
use market_client::rpc::{classify_rpc_error, RpcErrorObject};
use market_client::{
    ClientConfig, ClientError, Commitment, MarketplaceClient, RawAccount, RpcTransport,
};
use market_core::state::COMPONENT_OBSERVED_ACCOUNT_SIZE;
use market_core::{
    associated_token_address, component_address, decode_transaction, Component, Keypair,
    Marketplace, MarketplaceInstruction, Message, Pubkey, Purchase, MARKETPLACE_PROGRAM_ID,
};
use serde_json::{json, Value};

pub const BLOCKHASH: [u8; 32] = [9; 32];
pub const RENT_LAMPORTS: u64 = 2_039_280;

#[derive(Default)]
struct LedgerState {
    accounts: BTreeMap<Pubkey, RawAccount>,
    balances: HashMap<Pubkey, u64>,
    statuses: HashMap<String, Value>,
    sent: Vec<Vec<u8>>,
    clock: i64,
    /// Fee wallet and mint registered by `initialize`.
    treasury: Option<(Pubkey, Pubkey)>,
    transport_failures: u32,
    never_confirm: bool,
    fail_on_chain: bool,
    truncate_scans: bool,
}

pub struct MockLedger {
    program_id: Pubkey,
    state: Mutex<LedgerState>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            program_id: MARKETPLACE_PROGRAM_ID,
            state: Mutex::new(LedgerState {
                clock: 1_720_000_000,
                ..LedgerState::default()
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap()
    }

    pub fn fund(&self, owner: &Pubkey, lamports: u64) {
        self.state().balances.insert(*owner, lamports);
    }

    pub fn insert_account(&self, address: Pubkey, data: Vec<u8>) {
        let account = RawAccount {
            lamports: RENT_LAMPORTS,
            owner: self.program_id,
            data,
            executable: false,
        };
        self.state().accounts.insert(address, account);
    }

    pub fn account_data(&self, address: &Pubkey) -> Option<Vec<u8>> {
        self.state().accounts.get(address).map(|a| a.data.clone())
    }

    pub fn fail_next_sends(&self, n: u32) {
        self.state().transport_failures = n;
    }

    pub fn set_never_confirm(&self, value: bool) {
        self.state().never_confirm = value;
    }

    pub fn set_fail_on_chain(&self, value: bool) {
        self.state().fail_on_chain = value;
    }

    pub fn set_truncate_scans(&self, value: bool) {
        self.state().truncate_scans = value;
    }

    /// Every wire transaction that reached the ledger, including ones that
    /// were answered with a transport failure.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.state().sent.clone()
    }

    fn handle(&self, method: &str, params: &Value) -> Result<Value, ClientError> {
        match method {
            "getAccountInfo" => {
                let address = parse_key(&params[0])?;
                let value = self
                    .state()
                    .accounts
                    .get(&address)
                    .map(|a| serde_json::to_value(UiAccount::from(a)).unwrap());
                Ok(json!({ "context": { "slot": 1 }, "value": value }))
            }
            "getProgramAccounts" => self.program_accounts(params),
            "getBalance" => {
                let address = parse_key(&params[0])?;
                let state = self.state();
                let lamports = state
                    .balances
                    .get(&address)
                    .copied()
                    .or_else(|| state.accounts.get(&address).map(|a| a.lamports))
                    .unwrap_or(0);
                Ok(json!({ "context": { "slot": 1 }, "value": lamports }))
            }
            "getLatestBlockhash" => Ok(json!({
                "context": { "slot": 1 },
                "value": {
                    "blockhash": bs58::encode(BLOCKHASH).into_string(),
                    "lastValidBlockHeight": 150,
                }
            })),
            "sendTransaction" => self.send(params),
            "getSignatureStatuses" => {
                let signature = params[0][0].as_str().unwrap_or_default();
                let status = self.state().statuses.get(signature).cloned();
                Ok(json!({ "context": { "slot": 2 }, "value": [status] }))
            }
            other => Err(rpc_error(-32601, &format!("Method not found: {other}"), None)),
        }
    }

    fn program_accounts(&self, params: &Value) -> Result<Value, ClientError> {
        let state = self.state();
        if state.truncate_scans {
            return Err(rpc_error(
                -32010,
                "scan aborted: the accumulated scan results exceeded the limit",
                None,
            ));
        }

        let program = parse_key(&params[0])?;
        let filters = params[1]["filters"].as_array().cloned().unwrap_or_default();

        let matches: Vec<Value> = state
            .accounts
            .iter()
            .filter(|(_, account)| account.owner == program)
            .filter(|(_, account)| filters.iter().all(|f| filter_matches(f, &account.data)))
            .map(|(address, account)| {
                json!({ "pubkey": address.to_string(), "account": UiAccount::from(account) })
            })
            .collect();
        Ok(Value::Array(matches))
    }

    fn send(&self, params: &Value) -> Result<Value, ClientError> {
        let wire = STANDARD
            .decode(params[0].as_str().unwrap_or_default())
            .map_err(|e| rpc_error(-32602, &format!("invalid base64: {e}"), None))?;

        let mut state = self.state();
        state.sent.push(wire.clone());
        if state.transport_failures > 0 {
            state.transport_failures -= 1;
            return Err(ClientError::Transport("connection reset by peer".into()));
        }

        let tx = decode_transaction(&wire)
            .map_err(|e| rpc_error(-32602, &format!("failed to deserialize: {e}"), None))?;
        tx.verify()
            .map_err(|e| preflight("Transaction signature verification failure", vec![e.to_string()]))?;
        let signature = tx.signatures[0].to_string();

        if state.statuses.contains_key(&signature) {
            return Err(preflight(
                "Transaction simulation failed: This transaction has already been processed",
                vec![],
            ));
        }
        if tx.message.recent_blockhash != BLOCKHASH {
            return Err(preflight("Transaction simulation failed: Blockhash not found", vec![]));
        }

        let message = &tx.message;
        let keys = &message.account_keys;
        let snapshot = state.accounts.clone();
        let treasury = state.treasury;
        for ix in &message.instructions {
            if keys[ix.program_id_index as usize] != self.program_id {
                continue;
            }
            let accounts: Vec<Pubkey> = ix
                .account_indices
                .iter()
                .map(|i| keys[*i as usize])
                .collect();
            let signed: Vec<bool> = ix
                .account_indices
                .iter()
                .map(|i| message.is_signer(*i as usize))
                .collect();
            let outcome = MarketplaceInstruction::unpack(&ix.data)
                .map_err(|e| preflight(&format!("invalid instruction data: {e}"), vec![]))
                .and_then(|decoded| self.execute(&mut state, &decoded, &accounts, &signed));
            if let Err(e) = outcome {
                state.accounts = snapshot;
                state.treasury = treasury;
                return Err(e);
            }
        }
        if let Some(address) = modified_readonly(&snapshot, &state.accounts, message) {
            state.accounts = snapshot;
            state.treasury = treasury;
            return Err(preflight(
                "Transaction simulation failed: Error processing Instruction 0: instruction modified data of a read-only account",
                vec![format!("Program log: read-only account {address} was written")],
            ));
        }

        state.clock += 1;
        let status = if state.fail_on_chain {
            json!({
                "slot": 3,
                "confirmations": 0,
                "err": { "InstructionError": [0, { "Custom": 6003 }] },
                "confirmationStatus": "confirmed"
            })
        } else if state.never_confirm {
            json!({ "slot": 3, "confirmations": 0, "err": null, "confirmationStatus": "processed" })
        } else {
            json!({ "slot": 3, "confirmations": 1, "err": null, "confirmationStatus": "confirmed" })
        };
        state.statuses.insert(signature.clone(), status);
        Ok(Value::String(signature))
    }

    fn execute(
        &self,
        state: &mut LedgerState,
        ix: &MarketplaceInstruction,
        accounts: &[Pubkey],
        signed: &[bool],
    ) -> Result<(), ClientError> {
        let program_log = |msg: &str| {
            vec![
                format!("Program {} invoke [1]", self.program_id),
                format!("Program log: {msg}"),
                format!("Program {} failed", self.program_id),
            ]
        };
        let require_signer = |position: usize, role: &str| {
            if signed[position] {
                return Ok(());
            }
            Err(preflight(
                "Transaction simulation failed: Error processing Instruction 0: custom program error: 0xbc2",
                program_log(&format!(
                    "AnchorError caused by account: {role}. Error Code: AccountNotSigner."
                )),
            ))
        };
        let already_in_use = |address: &Pubkey| {
            preflight(
                "Transaction simulation failed: Error processing Instruction 0: custom program error: 0x0",
                vec![format!(
                    "Allocate: account Address {{ address: {address}, base: None }} already in use"
                )],
            )
        };

        match ix {
            MarketplaceInstruction::Initialize { fee_percentage } => {
                let (marketplace, mint, treasury, authority) =
                    (accounts[0], accounts[1], accounts[2], accounts[3]);
                require_signer(3, "authority")?;
                if state.accounts.contains_key(&marketplace) {
                    return Err(already_in_use(&marketplace));
                }
                let record = Marketplace {
                    authority,
                    fee_percentage: *fee_percentage,
                    total_volume: 0,
                    total_components: 0,
                };
                state.accounts.insert(marketplace, program_account(self.program_id, record.encode()));
                state.treasury = Some((treasury, mint));
            }
            MarketplaceInstruction::ListComponent {
                component_id,
                price,
                metadata_uri,
            } => {
                let (component, marketplace, creator) = (accounts[0], accounts[1], accounts[2]);
                require_signer(2, "creator")?;
                let expected = component_address(&self.program_id, component_id)
                    .map_err(ClientError::from)?
                    .0;
                if component != expected {
                    return Err(preflight(
                        "Transaction simulation failed: Error processing Instruction 0: custom program error: 0x7d6",
                        program_log("AnchorError caused by account: component. Error Code: ConstraintSeeds."),
                    ));
                }
                if state.accounts.contains_key(&component) {
                    return Err(already_in_use(&component));
                }
                decode_existing(state, &marketplace, Marketplace::decode)?;
                let record = Component {
                    creator,
                    component_id: component_id.clone(),
                    price: *price,
                    metadata_uri: metadata_uri.clone(),
                    is_active: true,
                    total_sales: 0,
                    created_at: state.clock,
                };
                let mut data = record.encode().map_err(ClientError::from)?;
                data.resize(COMPONENT_OBSERVED_ACCOUNT_SIZE as usize, 0);
                state.accounts.insert(component, program_account(self.program_id, data));

                update_marketplace(state, &marketplace, |m| m.total_components += 1)?;
            }
            MarketplaceInstruction::PurchaseComponent => {
                let (component, marketplace, purchase, buyer) =
                    (accounts[0], accounts[1], accounts[2], accounts[3]);
                require_signer(3, "buyer")?;
                let fee_account = accounts[6];
                let paid_to_treasury = state.treasury.is_some_and(|(wallet, mint)| {
                    associated_token_address(&wallet, &mint).is_ok_and(|ata| ata == fee_account)
                });
                if !paid_to_treasury {
                    return Err(preflight(
                        "Transaction simulation failed: Error processing Instruction 0: custom program error: 0x7d3",
                        program_log("AnchorError caused by account: treasury_token_account. Error Code: ConstraintRaw."),
                    ));
                }
                let mut listing = decode_existing(state, &component, Component::decode)?;
                if !listing.is_active {
                    return Err(preflight(
                        "Transaction simulation failed: Error processing Instruction 0: custom program error: 0x1773",
                        program_log("AnchorError occurred. Error Code: ComponentNotActive. Error Number: 6003. Error Message: Component not active."),
                    ));
                }
                if state.accounts.contains_key(&purchase) {
                    return Err(already_in_use(&purchase));
                }
                decode_existing(state, &marketplace, Marketplace::decode)?;
                let receipt = Purchase {
                    buyer,
                    component_id: listing.component_id.clone(),
                    price: listing.price,
                    purchased_at: state.clock,
                };
                state.accounts.insert(
                    purchase,
                    program_account(self.program_id, receipt.encode().map_err(ClientError::from)?),
                );

                listing.total_sales += 1;
                let price = listing.price;
                replace_data(state, &component, listing.encode().map_err(ClientError::from)?);
                update_marketplace(state, &marketplace, |m| m.total_volume += price)?;
            }
            MarketplaceInstruction::DelistComponent => {
                let (component, creator) = (accounts[0], accounts[1]);
                require_signer(1, "creator")?;
                let mut listing = decode_existing(state, &component, Component::decode)?;
                if listing.creator != creator {
                    return Err(preflight(
                        "Transaction simulation failed: Error processing Instruction 0: custom program error: 0x7d1",
                        program_log("AnchorError caused by account: component. Error Code: ConstraintHasOne."),
                    ));
                }
                listing.is_active = false;
                replace_data(state, &component, listing.encode().map_err(ClientError::from)?);
            }
        }
        Ok(())
    }
}

impl RpcTransport for MockLedger {
    async fn call(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        self.handle(method, &params)
    }
}

fn program_account(owner: Pubkey, data: Vec<u8>) -> RawAccount {
    RawAccount {
        lamports: RENT_LAMPORTS,
        owner,
        data,
        executable: false,
    }
}

fn decode_existing<R>(
    state: &LedgerState,
    address: &Pubkey,
    decode: fn(&[u8]) -> Result<R, market_core::CoreError>,
) -> Result<R, ClientError> {
    let account = state.accounts.get(address).ok_or_else(|| {
        preflight(
            "Transaction simulation failed: Error processing Instruction 0: custom program error: 0xbc4",
            vec!["Program log: AnchorError caused by account. Error Code: AccountNotInitialized.".into()],
        )
    })?;
    Ok(decode(&account.data)?)
}

/// Overwrite the leading bytes, keeping the allocation size.
fn replace_data(state: &mut LedgerState, address: &Pubkey, bytes: Vec<u8>) {
    if let Some(account) = state.accounts.get_mut(address) {
        let len = account.data.len().max(bytes.len());
        account.data = bytes;
        account.data.resize(len, 0);
    }
}

fn update_marketplace(
    state: &mut LedgerState,
    address: &Pubkey,
    update: impl FnOnce(&mut Marketplace),
) -> Result<(), ClientError> {
    let mut market = decode_existing(state, address, Marketplace::decode)?;
    update(&mut market);
    replace_data(state, address, market.encode());
    Ok(())
}

/// First account whose contents changed although the message did not mark
/// it writable.
fn modified_readonly(
    before: &BTreeMap<Pubkey, RawAccount>,
    after: &BTreeMap<Pubkey, RawAccount>,
    message: &Message,
) -> Option<Pubkey> {
    after
        .iter()
        .filter(|(address, account)| before.get(*address) != Some(*account))
        .map(|(address, _)| *address)
        .find(|address| {
            !message
                .account_keys
                .iter()
                .position(|k| k == address)
                .is_some_and(|i| message.is_writable(i))
        })
}

fn filter_matches(filter: &Value, data: &[u8]) -> bool {
    if let Some(size) = filter.get("dataSize").and_then(Value::as_u64) {
        return data.len() as u64 == size;
    }
    if let Some(memcmp) = filter.get("memcmp") {
        let offset = memcmp["offset"].as_u64().unwrap_or(0) as usize;
        let bytes = bs58::decode(memcmp["bytes"].as_str().unwrap_or_default())
            .into_vec()
            .unwrap_or_default();
        return data.get(offset..offset + bytes.len()) == Some(bytes.as_slice());
    }
    false
}

fn parse_key(value: &Value) -> Result<Pubkey, ClientError> {
    value
        .as_str()
        .unwrap_or_default()
        .parse()
        .map_err(|e| rpc_error(-32602, &format!("Invalid param: {e}"), None))
}

fn rpc_error(code: i64, message: &str, data: Option<Value>) -> ClientError {
    classify_rpc_error(RpcErrorObject {
        code,
        message: message.into(),
        data,
    })
}

fn preflight(message: &str, logs: Vec<String>) -> ClientError {
    rpc_error(
        -32002,
        message,
        Some(json!({ "err": "InstructionError", "logs": logs })),
    )
}

// ─── Test helpers ───────────────────────────────────────────────────

pub fn test_config() -> ClientConfig {
    ClientConfig {
        rpc_url: "http://mock.invalid".into(),
        commitment: Commitment::Confirmed,
        confirm_timeout: Duration::from_secs(5),
        poll_interval: Duration::from_millis(50),
        ..ClientConfig::default()
    }
}

pub fn client(ledger: &MockLedger) -> MarketplaceClient<&MockLedger> {
    MarketplaceClient::new(ledger, test_config())
}

pub fn funded_keypair(ledger: &MockLedger) -> Keypair {
    let keypair = Keypair::generate(&mut rand::rngs::OsRng);
    ledger.fund(&keypair.pubkey(), 1_000_000_000);
    keypair
}
