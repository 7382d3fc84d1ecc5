//! Token program identities and associated token account derivation.
//!
//! Purchases move the marketplace's fungible token between the buyer's,
//! creator's, and treasury's token accounts. Those accounts are usually the
//! owner's associated token account (ATA) for the configured mint.

use crate::address::Pubkey;
use crate::error::CoreError;
use crate::pda::find_program_address;

/// SPL Token Program ID: `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`
pub const TOKEN_PROGRAM_ID: Pubkey = Pubkey::new_from_array([
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb, 0x79,
    0xac, 0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85, 0x7e, 0xff,
    0x00, 0xa9,
]);

/// Associated Token Account Program ID: `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey = Pubkey::new_from_array([
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e, 0x0d,
    0x83, 0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8, 0xdb, 0xe9,
    0xf8, 0x59,
]);

/// Derive the associated token account address for a wallet + mint pair.
///
/// Seeds: `[wallet, token_program_id, mint]` under the ATA program.
pub fn associated_token_address(wallet: &Pubkey, mint: &Pubkey) -> Result<Pubkey, CoreError> {
    find_program_address(
        &[wallet.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _bump)| address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pda::is_on_curve;

    #[test]
    fn token_program_id_roundtrip() {
        assert_eq!(
            TOKEN_PROGRAM_ID.to_string(),
            "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA"
        );
    }

    #[test]
    fn associated_token_program_id_roundtrip() {
        assert_eq!(
            ASSOCIATED_TOKEN_PROGRAM_ID.to_string(),
            "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL"
        );
    }

    #[test]
    fn ata_is_not_on_curve() {
        let wallet = Pubkey::new_from_array([0xAA; 32]);
        let mint = Pubkey::new_from_array([0xBB; 32]);
        let ata = associated_token_address(&wallet, &mint).unwrap();
        assert!(!is_on_curve(ata.as_array()));
    }

    #[test]
    fn ata_differs_per_wallet() {
        let mint: Pubkey = "BMge7se4AqyTqEpcTSHURzA4YG9rNvmHscFEFJK9pump".parse().unwrap();
        let a = associated_token_address(&Pubkey::new_from_array([1; 32]), &mint).unwrap();
        let b = associated_token_address(&Pubkey::new_from_array([2; 32]), &mint).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn ata_is_deterministic() {
        let wallet = Pubkey::new_from_array([0x11; 32]);
        let mint = Pubkey::new_from_array([0x22; 32]);
        assert_eq!(
            associated_token_address(&wallet, &mint).unwrap(),
            associated_token_address(&wallet, &mint).unwrap()
        );
    }
}
