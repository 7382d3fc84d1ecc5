//! Program Derived Address (PDA) derivation.
//!
//! Marketplace, component, and purchase accounts live at addresses computed
//! from fixed seed tags plus caller-supplied identifiers. The derivation
//! matches the ledger's own algorithm byte for byte:
//!
//! ```text
//! SHA-256(seed_0 || seed_1 || ... || bump || program_id || "ProgramDerivedAddress")
//! ```
//!
//! searching bump seeds from 255 down to 0 and keeping the first hash that is
//! NOT a valid Ed25519 point, so no private key can ever sign for it.

use sha2::{Digest, Sha256};

use crate::address::Pubkey;
use crate::error::CoreError;

/// The string appended to PDA derivation: "ProgramDerivedAddress".
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Maximum length of a single seed in bytes.
pub const MAX_SEED_LEN: usize = 32;

/// Maximum number of seeds, counting the bump seed.
pub const MAX_SEEDS: usize = 16;

/// Seed tag of the singleton marketplace account.
pub const MARKETPLACE_SEED: &[u8] = b"marketplace";

/// Seed tag of component listing accounts.
pub const COMPONENT_SEED: &[u8] = b"component";

/// Seed tag of purchase receipt accounts.
pub const PURCHASE_SEED: &[u8] = b"purchase";

/// Address of the singleton marketplace account: seeds `["marketplace"]`.
pub fn marketplace_address(program_id: &Pubkey) -> Result<(Pubkey, u8), CoreError> {
    find_program_address(&[MARKETPLACE_SEED], program_id)
}

/// Address of a component listing: seeds `["component", component_id]`.
///
/// The identifier is hashed as raw UTF-8 bytes with no length prefix, which
/// caps it at 32 bytes.
pub fn component_address(
    program_id: &Pubkey,
    component_id: &str,
) -> Result<(Pubkey, u8), CoreError> {
    find_program_address(&[COMPONENT_SEED, component_id.as_bytes()], program_id)
}

/// Address of a purchase receipt: seeds `["purchase", buyer, component_id]`.
pub fn purchase_address(
    program_id: &Pubkey,
    buyer: &Pubkey,
    component_id: &str,
) -> Result<(Pubkey, u8), CoreError> {
    find_program_address(
        &[PURCHASE_SEED, buyer.as_ref(), component_id.as_bytes()],
        program_id,
    )
}

/// Find a valid Program Derived Address for the given seeds and program.
///
/// Iterates bump seeds from 255 down to 0 and returns the first address that
/// is off the Ed25519 curve together with its bump.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), CoreError> {
    check_seeds(seeds, 1)?;

    for bump in (0u8..=255).rev() {
        if let Some(address) = try_create_program_address(seeds, &[bump], program_id) {
            tracing::trace!(%address, bump, "derived program address");
            return Ok((address, bump));
        }
    }

    Err(CoreError::AddressDerivationExhausted)
}

/// Recompute a PDA from seeds and a known bump.
///
/// Fails with [`CoreError::InvalidAddress`] if that bump lands on the curve.
pub fn create_program_address(
    seeds: &[&[u8]],
    bump: u8,
    program_id: &Pubkey,
) -> Result<Pubkey, CoreError> {
    check_seeds(seeds, 1)?;
    try_create_program_address(seeds, &[bump], program_id).ok_or_else(|| {
        CoreError::InvalidAddress(format!("bump {bump} yields an on-curve address"))
    })
}

fn check_seeds(seeds: &[&[u8]], extra: usize) -> Result<(), CoreError> {
    if seeds.len() + extra > MAX_SEEDS {
        return Err(CoreError::TooManySeeds(seeds.len() + extra));
    }
    if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
        return Err(CoreError::SeedTooLong(seed.len()));
    }
    Ok(())
}

/// Returns `Some(address)` if the derived point is OFF the Ed25519 curve,
/// `None` if it falls on the curve (try next bump).
fn try_create_program_address(
    seeds: &[&[u8]],
    bump_seed: &[u8],
    program_id: &Pubkey,
) -> Option<Pubkey> {
    let mut hasher = Sha256::new();

    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(bump_seed);
    hasher.update(program_id);
    hasher.update(PDA_MARKER);

    let hash: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&hash) {
        return None;
    }

    Some(Pubkey::new_from_array(hash))
}

/// Check if 32 bytes decompress to a valid Ed25519 point.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> Pubkey {
        "3RAeCuRqF9kGXyXwk9Lynj19fuxJJj5RXCga9KiihaKF".parse().unwrap()
    }

    #[test]
    fn marketplace_address_is_deterministic() {
        let (a, bump_a) = marketplace_address(&program()).unwrap();
        let (b, bump_b) = marketplace_address(&program()).unwrap();
        assert_eq!(a, b);
        assert_eq!(bump_a, bump_b);
    }

    #[test]
    fn marketplace_address_golden() {
        let (address, bump) = marketplace_address(&program()).unwrap();
        assert_eq!(
            address.to_string(),
            "7QqerDKseC3tkNRYhpzzLtVLECLwSKym5a6oroGYdLaa"
        );
        assert_eq!(bump, 255);
    }

    #[test]
    fn component_address_golden() {
        let (address, bump) = component_address(&program(), "test-component-001").unwrap();
        assert_eq!(
            address.to_string(),
            "ALteXPHfXH143sdSQPcd3YUQyBiEs1W8rWxcokkfyEk1"
        );
        assert_eq!(bump, 255);
    }

    #[test]
    fn purchase_address_walks_bumps_down() {
        let buyer = Pubkey::new_from_array([7u8; 32]);
        let (address, bump) = purchase_address(&program(), &buyer, "test-component-001").unwrap();
        assert_eq!(
            address.to_string(),
            "6WkfYFkG4JCcYkgaaTWVfBzQ6s25UhY4w9M4BbWQYs59"
        );
        assert_eq!(bump, 252);
    }

    #[test]
    fn create_with_found_bump_matches() {
        let (address, bump) = component_address(&program(), "abc").unwrap();
        let again =
            create_program_address(&[COMPONENT_SEED, b"abc"], bump, &program()).unwrap();
        assert_eq!(address, again);
    }

    #[test]
    fn pda_is_not_on_curve() {
        let (address, _) = component_address(&program(), "widget").unwrap();
        assert!(!is_on_curve(address.as_array()));
    }

    #[test]
    fn different_ids_give_different_addresses() {
        let (a, _) = component_address(&program(), "a").unwrap();
        let (b, _) = component_address(&program(), "b").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn identifier_is_not_length_prefixed() {
        // Splitting the id across seeds must yield the same hash input, which
        // only holds if seeds are concatenated raw.
        let (joined, _) = find_program_address(&[b"component", b"ab"], &program()).unwrap();
        let (split, _) = find_program_address(&[b"component", b"a", b"b"], &program()).unwrap();
        assert_eq!(joined, split);
    }

    #[test]
    fn seed_longer_than_32_bytes_fails() {
        let long_id = "x".repeat(33);
        let err = component_address(&program(), &long_id).unwrap_err();
        assert!(matches!(err, CoreError::SeedTooLong(33)));
    }

    #[test]
    fn too_many_seeds_fails() {
        let seeds: Vec<&[u8]> = (0..16).map(|_| b"s".as_slice()).collect();
        let err = find_program_address(&seeds, &program()).unwrap_err();
        assert!(matches!(err, CoreError::TooManySeeds(17)));
    }

    #[test]
    fn is_on_curve_accepts_basepoint() {
        let mut basepoint = [0x66u8; 32];
        basepoint[0] = 0x58;
        assert!(is_on_curve(&basepoint));
    }

    #[test]
    fn is_on_curve_rejects_off_curve_bytes() {
        assert!(!is_on_curve(&[0x02; 32]));
    }
}
