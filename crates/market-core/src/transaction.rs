//! Transaction assembly, wire format, and signing.
//!
//! Transactions are built by hand, with no `solana-sdk` dependency. The wire
//! format is a compact binary layout:
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]        (see below)
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```

use std::fmt;
use std::str::FromStr;

use crate::address::Pubkey;
use crate::codec::Reader;
use crate::error::CoreError;
use crate::keypair::Keypair;

/// The system program: 32 zero bytes, `11111111111111111111111111111111`.
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0u8; 32]);

/// Account indices are a single byte on the wire.
const MAX_ACCOUNT_KEYS: usize = 256;

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` value in the compact-u16 format.
///
/// - Values 0..0x7f       -> 1 byte
/// - Values 0x80..0x3fff  -> 2 bytes
/// - Values 0x4000..      -> 3 bytes
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decode a compact-u16 value from a byte slice.
///
/// Returns `(value, bytes_consumed)` or an error if the data is truncated.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), CoreError> {
    let mut value: u32 = 0;
    let mut shift = 0u32;
    let mut consumed = 0usize;

    loop {
        let byte = *data.get(consumed).ok_or_else(|| {
            CoreError::SerializationError(
                "unexpected end of data while decoding compact-u16".into(),
            )
        })?;
        consumed += 1;

        value |= ((byte & 0x7f) as u32) << shift;
        shift += 7;

        if byte & 0x80 == 0 || consumed >= 3 {
            break;
        }
    }

    let value = u16::try_from(value)
        .map_err(|_| CoreError::SerializationError("compact-u16 value overflow".into()))?;

    Ok((value, consumed))
}

fn compact_len(len: usize, what: &str) -> Result<Vec<u8>, CoreError> {
    let len = u16::try_from(len)
        .map_err(|_| CoreError::SerializationError(format!("too many {what}: {len}")))?;
    Ok(encode_compact_u16(len))
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A single account reference in an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    /// A writable account.
    pub fn new(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    /// A read-only account.
    pub fn new_readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// An instruction before it is compiled into a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Pubkey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

/// A compiled message: the atomic unit that gets signed and submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// All account keys referenced by this message, in canonical order:
    ///   1. writable signers
    ///   2. read-only signers
    ///   3. writable non-signers
    ///   4. read-only non-signers
    pub account_keys: Vec<Pubkey>,

    /// Number of required signatures (first N accounts are signers).
    pub num_required_signatures: u8,
    /// How many of the signing accounts are read-only.
    pub num_readonly_signed: u8,
    /// How many of the non-signing accounts are read-only.
    pub num_readonly_unsigned: u8,

    pub recent_blockhash: [u8; 32],

    /// Compiled instructions (account references replaced with indices).
    pub instructions: Vec<CompiledInstruction>,
}

impl Message {
    /// Whether the key at `index` must sign.
    pub fn is_signer(&self, index: usize) -> bool {
        index < usize::from(self.num_required_signatures)
    }

    /// Whether the key at `index` is writable, as encoded by the header
    /// counts.
    pub fn is_writable(&self, index: usize) -> bool {
        let signers = usize::from(self.num_required_signatures);
        if index < signers {
            return index < signers.saturating_sub(usize::from(self.num_readonly_signed));
        }
        let unsigned_writable = self
            .account_keys
            .len()
            .saturating_sub(usize::from(self.num_readonly_unsigned));
        index < unsigned_writable
    }
}

/// An instruction whose account references are u8 indices into the
/// message's `account_keys`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

/// A 64-byte Ed25519 transaction signature. Displays as Base58, which is
/// also the transaction identifier used by the RPC API.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; 64]);

impl Signature {
    pub const fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

impl FromStr for Signature {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| CoreError::SerializationError(format!("invalid signature: {e}")))?;
        let arr: [u8; 64] = bytes.try_into().map_err(|v: Vec<u8>| {
            CoreError::SerializationError(format!("expected 64 signature bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }
}

/// A message plus one signature per required signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub signatures: Vec<Signature>,
    pub message: Message,
}

impl SignedTransaction {
    /// The transaction id: the first (fee payer) signature.
    pub fn signature(&self) -> Option<&Signature> {
        self.signatures.first()
    }

    /// Serialize into the wire format.
    pub fn to_wire(&self) -> Result<Vec<u8>, CoreError> {
        let message_bytes = serialize_message(&self.message)?;

        let mut wire = Vec::with_capacity(3 + 64 * self.signatures.len() + message_bytes.len());
        wire.extend_from_slice(&compact_len(self.signatures.len(), "signatures")?);
        for sig in &self.signatures {
            wire.extend_from_slice(sig.as_bytes());
        }
        wire.extend_from_slice(&message_bytes);

        Ok(wire)
    }

    /// Check every signature against its signer key.
    pub fn verify(&self) -> Result<(), CoreError> {
        let message_bytes = serialize_message(&self.message)?;
        let signers = self.message.num_required_signatures as usize;
        if self.signatures.len() != signers || self.message.account_keys.len() < signers {
            return Err(CoreError::SigningError(format!(
                "expected {signers} signatures, got {}",
                self.signatures.len()
            )));
        }

        for (key, sig) in self.message.account_keys.iter().zip(&self.signatures) {
            let vk = ed25519_dalek::VerifyingKey::from_bytes(key.as_array())
                .map_err(|e| CoreError::SigningError(format!("bad signer key {key}: {e}")))?;
            vk.verify_strict(
                &message_bytes,
                &ed25519_dalek::Signature::from_bytes(sig.as_bytes()),
            )
            .map_err(|_| CoreError::SigningError(format!("invalid signature for {key}")))?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Transaction building
// ---------------------------------------------------------------------------

/// Compile instructions into a message with a single fee payer.
///
/// The fee payer is always a writable signer at index 0. Accounts used by
/// several instructions are merged, OR-ing their signer/writable flags;
/// each instruction keeps its own account order through the index list.
pub fn compile_message(
    instructions: &[Instruction],
    fee_payer: &Pubkey,
    recent_blockhash: &[u8; 32],
) -> Result<Message, CoreError> {
    if instructions.is_empty() {
        return Err(CoreError::TransactionBuildError(
            "at least one instruction is required".into(),
        ));
    }

    struct AccountEntry {
        pubkey: Pubkey,
        is_signer: bool,
        is_writable: bool,
    }

    let mut entries: Vec<AccountEntry> = Vec::new();

    let mut upsert = |pubkey: Pubkey, signer: bool, writable: bool| {
        if let Some(entry) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
            entry.is_signer |= signer;
            entry.is_writable |= writable;
        } else {
            entries.push(AccountEntry {
                pubkey,
                is_signer: signer,
                is_writable: writable,
            });
        }
    };

    // Fee payer is always signer + writable, and inserted first.
    upsert(*fee_payer, true, true);

    for ix in instructions {
        for meta in &ix.accounts {
            upsert(meta.pubkey, meta.is_signer, meta.is_writable);
        }
        // Program IDs are non-signer, read-only accounts.
        upsert(ix.program_id, false, false);
    }

    if entries.len() > MAX_ACCOUNT_KEYS {
        return Err(CoreError::TransactionBuildError(format!(
            "{} accounts exceed the {MAX_ACCOUNT_KEYS} account limit",
            entries.len()
        )));
    }

    // Stable sort keeps insertion order within a category, so the fee payer
    // stays at index 0 among the writable signers.
    entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
        (true, true) => 0u8,
        (true, false) => 1,
        (false, true) => 2,
        (false, false) => 3,
    });

    let num_signers = entries.iter().filter(|e| e.is_signer).count() as u8;
    let num_readonly_signed = entries
        .iter()
        .filter(|e| e.is_signer && !e.is_writable)
        .count() as u8;
    let num_readonly_unsigned = entries
        .iter()
        .filter(|e| !e.is_signer && !e.is_writable)
        .count() as u8;

    let account_keys: Vec<Pubkey> = entries.iter().map(|e| e.pubkey).collect();
    let index_of = |key: &Pubkey| -> Result<u8, CoreError> {
        account_keys
            .iter()
            .position(|k| k == key)
            .map(|i| i as u8)
            .ok_or_else(|| {
                CoreError::TransactionBuildError(format!("account {key} not in account keys"))
            })
    };

    let mut compiled = Vec::with_capacity(instructions.len());
    for ix in instructions {
        let program_id_index = index_of(&ix.program_id)?;
        let account_indices = ix
            .accounts
            .iter()
            .map(|meta| index_of(&meta.pubkey))
            .collect::<Result<Vec<u8>, CoreError>>()?;

        compiled.push(CompiledInstruction {
            program_id_index,
            account_indices,
            data: ix.data.clone(),
        });
    }

    tracing::debug!(
        accounts = account_keys.len(),
        signers = num_signers,
        instructions = compiled.len(),
        "compiled message"
    );

    Ok(Message {
        account_keys,
        num_required_signatures: num_signers,
        num_readonly_signed,
        num_readonly_unsigned,
        recent_blockhash: *recent_blockhash,
        instructions: compiled,
    })
}

/// Serialize the message (the bytes that get signed).
pub fn serialize_message(message: &Message) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::with_capacity(256);

    buf.push(message.num_required_signatures);
    buf.push(message.num_readonly_signed);
    buf.push(message.num_readonly_unsigned);

    buf.extend_from_slice(&compact_len(message.account_keys.len(), "account keys")?);
    for key in &message.account_keys {
        buf.extend_from_slice(key.as_ref());
    }

    buf.extend_from_slice(&message.recent_blockhash);

    buf.extend_from_slice(&compact_len(message.instructions.len(), "instructions")?);
    for ix in &message.instructions {
        buf.push(ix.program_id_index);

        buf.extend_from_slice(&compact_len(ix.account_indices.len(), "instruction accounts")?);
        buf.extend_from_slice(&ix.account_indices);

        buf.extend_from_slice(&compact_len(ix.data.len(), "instruction data bytes")?);
        buf.extend_from_slice(&ix.data);
    }

    Ok(buf)
}

/// Sign a message with every required signer.
///
/// `signers` may be given in any order; each required signer slot is filled
/// by the keypair whose public key sits at that index of `account_keys`.
pub fn sign_message(message: Message, signers: &[&Keypair]) -> Result<SignedTransaction, CoreError> {
    let message_bytes = serialize_message(&message)?;

    let required = message.num_required_signatures as usize;
    let mut signatures = Vec::with_capacity(required);
    for key in message.account_keys.iter().take(required) {
        let keypair = signers
            .iter()
            .find(|kp| kp.pubkey() == *key)
            .ok_or_else(|| CoreError::SigningError(format!("missing signer for {key}")))?;
        signatures.push(Signature::new(keypair.sign_message(&message_bytes)));
    }

    Ok(SignedTransaction {
        signatures,
        message,
    })
}

/// Compile, sign, and return a transaction ready for submission.
pub fn build_signed_transaction(
    instructions: &[Instruction],
    fee_payer: &Keypair,
    extra_signers: &[&Keypair],
    recent_blockhash: &[u8; 32],
) -> Result<SignedTransaction, CoreError> {
    let message = compile_message(instructions, &fee_payer.pubkey(), recent_blockhash)?;
    let signers: Vec<&Keypair> = std::iter::once(fee_payer)
        .chain(extra_signers.iter().copied())
        .collect();
    sign_message(message, &signers)
}

// ---------------------------------------------------------------------------
// Wire decoding
// ---------------------------------------------------------------------------

/// Parse a wire-format transaction back into signatures and message.
pub fn decode_transaction(wire: &[u8]) -> Result<SignedTransaction, CoreError> {
    let (num_sigs, mut offset) = decode_compact_u16(wire)?;

    let mut signatures = Vec::with_capacity(num_sigs as usize);
    for _ in 0..num_sigs {
        let bytes = wire
            .get(offset..offset + 64)
            .ok_or_else(|| {
                CoreError::SerializationError(
                    "transaction too short: signature slots exceed length".into(),
                )
            })?;
        let mut sig = [0u8; 64];
        sig.copy_from_slice(bytes);
        signatures.push(Signature::new(sig));
        offset += 64;
    }

    let message = decode_message(&wire[offset..])?;
    Ok(SignedTransaction {
        signatures,
        message,
    })
}

/// Parse a serialized message. Trailing bytes are rejected.
pub fn decode_message(bytes: &[u8]) -> Result<Message, CoreError> {
    let mut reader = Reader::new(bytes);
    let truncated = |e: CoreError| CoreError::SerializationError(format!("message truncated: {e}"));

    let num_required_signatures = reader.read_u8().map_err(truncated)?;
    let num_readonly_signed = reader.read_u8().map_err(truncated)?;
    let num_readonly_unsigned = reader.read_u8().map_err(truncated)?;

    let num_accounts = read_compact(&mut reader)?;
    let mut account_keys = Vec::with_capacity(num_accounts);
    for _ in 0..num_accounts {
        account_keys.push(reader.read_pubkey().map_err(truncated)?);
    }

    let recent_blockhash = reader.read_array::<32>().map_err(truncated)?;

    let num_instructions = read_compact(&mut reader)?;
    let mut instructions = Vec::with_capacity(num_instructions);
    for _ in 0..num_instructions {
        let program_id_index = reader.read_u8().map_err(truncated)?;
        let n = read_compact(&mut reader)?;
        let account_indices = reader.read_bytes(n).map_err(truncated)?.to_vec();
        let n = read_compact(&mut reader)?;
        let data = reader.read_bytes(n).map_err(truncated)?.to_vec();
        instructions.push(CompiledInstruction {
            program_id_index,
            account_indices,
            data,
        });
    }

    reader
        .finish()
        .map_err(|e| CoreError::SerializationError(e.to_string()))?;

    Ok(Message {
        account_keys,
        num_required_signatures,
        num_readonly_signed,
        num_readonly_unsigned,
        recent_blockhash,
        instructions,
    })
}

fn read_compact(reader: &mut Reader<'_>) -> Result<usize, CoreError> {
    let window = reader.clone().read_bytes(reader.remaining().min(3))?;
    let (value, consumed) = decode_compact_u16(window)?;
    reader.read_bytes(consumed)?;
    Ok(value as usize)
}
