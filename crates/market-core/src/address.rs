//! Ledger identities and their Base58 text form.
//!
//! An identity (wallet, program, mint, or program-derived account) is a raw
//! 32-byte value. Its textual form is the Base58 encoding of those bytes with
//! no hashing or checksum, using the alphabet of the `bs58` crate.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A 32-byte ledger identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Pubkey([u8; 32]);

impl Pubkey {
    pub const fn new_from_array(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn as_array(&self) -> &[u8; 32] {
        &self.0
    }

    /// Build a pubkey from a slice that must be exactly 32 bytes long.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            CoreError::InvalidAddress(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }
}

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Pubkey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bytes_to_address(&self.0))
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({self})")
    }
}

impl FromStr for Pubkey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        address_to_bytes(s).map(Self)
    }
}

/// Validate an address string.
///
/// A valid address is a Base58 string that decodes to exactly 32 bytes.
/// Returns `Ok(true)` if valid, or an error if decoding fails or the length
/// is wrong.
pub fn validate_address(address: &str) -> Result<bool, CoreError> {
    address_to_bytes(address).map(|_| true)
}

/// Decode an address string to its 32-byte representation.
pub fn address_to_bytes(address: &str) -> Result<[u8; 32], CoreError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| CoreError::InvalidAddress(format!("base58 decode failed: {e}")))?;

    let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
        CoreError::InvalidAddress(format!("expected 32 bytes, got {}", v.len()))
    })?;

    Ok(arr)
}

/// Encode 32 bytes as an address (Base58 string).
pub fn bytes_to_address(bytes: &[u8; 32]) -> String {
    bs58::encode(bytes).into_string()
}
