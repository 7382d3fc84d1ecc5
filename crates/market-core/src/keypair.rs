//! Signing identities and the on-disk credential file.
//!
//! The credential file is the ledger CLI's format: a JSON array of 64 byte
//! values, the 32-byte Ed25519 secret seed followed by the 32-byte public
//! key. Buffers holding secret material are zeroized once parsed.

use std::fmt;
use std::path::Path;

use ed25519_dalek::Signer;
use zeroize::Zeroize;

use crate::address::Pubkey;
use crate::error::CoreError;

/// Length of a full keypair (secret seed || public key).
pub const KEYPAIR_LEN: usize = 64;

/// An Ed25519 signing identity. The inner key zeroizes itself on drop.
pub struct Keypair {
    signing_key: ed25519_dalek::SigningKey,
}

impl Keypair {
    /// Build a keypair from a 32-byte secret seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Build a keypair from the 64-byte `secret || public` layout.
    ///
    /// The public half must match the key derived from the secret half.
    pub fn from_keypair_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.len() != KEYPAIR_LEN {
            return Err(CoreError::MalformedCredential(format!(
                "expected {KEYPAIR_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes[..32]);
        let keypair = Self::from_seed(&seed);
        seed.zeroize();

        if keypair.pubkey().as_ref() != &bytes[32..] {
            return Err(CoreError::MalformedCredential(
                "public key does not match secret key".into(),
            ));
        }

        Ok(keypair)
    }

    /// Generate a fresh random keypair.
    pub fn generate<R>(rng: &mut R) -> Self
    where
        R: rand_core::CryptoRng + rand_core::RngCore,
    {
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(rng),
        }
    }

    /// Parse the JSON credential format (`[12, 34, ...]`, 64 entries).
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let mut bytes: Vec<u8> = serde_json::from_str(json)
            .map_err(|e| CoreError::MalformedCredential(format!("invalid JSON byte array: {e}")))?;
        let result = Self::from_keypair_bytes(&bytes);
        bytes.zeroize();
        result
    }

    /// Read a credential file from disk.
    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CoreError::CredentialFileMissing(path.to_path_buf()));
        }

        let mut contents = std::fs::read_to_string(path).map_err(|e| {
            CoreError::MalformedCredential(format!("cannot read {}: {e}", path.display()))
        })?;
        let result = Self::from_json(&contents);
        contents.zeroize();

        let keypair = result?;
        tracing::debug!(pubkey = %keypair.pubkey(), path = %path.display(), "loaded credential");
        Ok(keypair)
    }

    /// Serialize into the JSON credential format.
    pub fn to_json(&self) -> String {
        let mut bytes = self.to_keypair_bytes();
        let json = serde_json::Value::from(bytes.to_vec()).to_string();
        bytes.zeroize();
        json
    }

    /// `secret || public`, 64 bytes.
    pub fn to_keypair_bytes(&self) -> [u8; KEYPAIR_LEN] {
        self.signing_key.to_keypair_bytes()
    }

    pub fn pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign arbitrary bytes, returning the 64-byte Ed25519 signature.
    pub fn sign_message(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}
