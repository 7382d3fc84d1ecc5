//! Client-side core for the component marketplace program.
//!
//! Everything here is synchronous and deterministic: program address
//! derivation, the Anchor/Borsh instruction and account codec, transaction
//! assembly and signing, and credential loading. Nothing in this crate talks
//! to the network; see `market-client` for that.
//!
//! Like the rest of the workspace this avoids `solana-sdk` and `anchor-lang`
//! and implements the wire formats by hand on top of `ed25519-dalek`,
//! `curve25519-dalek`, `sha2` and `bs58`.

pub mod address;
pub mod codec;
pub mod error;
pub mod events;
pub mod fee;
pub mod instructions;
pub mod keypair;
pub mod pda;
pub mod state;
pub mod token;
pub mod transaction;

// Re-export key public types for ergonomic imports.
pub use address::{address_to_bytes, bytes_to_address, validate_address, Pubkey};
pub use codec::{
    account_discriminator, encode_instruction, event_discriminator, instruction_discriminator,
    Arg, UintWidth,
};
pub use error::CoreError;
pub use events::{parse_events, MarketplaceEvent};
pub use fee::FeeQuote;
pub use instructions::{
    DelistComponentAccounts, InitializeAccounts, ListComponentAccounts, MarketplaceInstruction,
    PurchaseComponentAccounts, MAX_FEE_BPS,
};
pub use keypair::Keypair;
pub use pda::{component_address, find_program_address, marketplace_address, purchase_address};
pub use state::{Component, Marketplace, Purchase};
pub use token::{associated_token_address, ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_PROGRAM_ID};
pub use transaction::{
    build_signed_transaction, compile_message, decode_transaction, AccountMeta, Instruction,
    Message, Signature, SignedTransaction, SYSTEM_PROGRAM_ID,
};

/// Deployed marketplace program: `3RAeCuRqF9kGXyXwk9Lynj19fuxJJj5RXCga9KiihaKF`.
pub const MARKETPLACE_PROGRAM_ID: Pubkey = Pubkey::new_from_array([
    0x23, 0xe8, 0x37, 0x04, 0xab, 0x73, 0x0c, 0x85, 0xd0, 0x36, 0xdf, 0x78, 0x17, 0x03, 0x55,
    0x0f, 0x8d, 0x2c, 0x99, 0xa7, 0xab, 0x27, 0x3a, 0x9d, 0xeb, 0x64, 0xf4, 0x25, 0xb2, 0x00,
    0x31, 0xb6,
]);

/// Marketplace payment token: `BMge7se4AqyTqEpcTSHURzA4YG9rNvmHscFEFJK9pump`.
pub const MARKETPLACE_TOKEN_MINT: Pubkey = Pubkey::new_from_array([
    0x99, 0xe1, 0x4e, 0x77, 0x39, 0x27, 0x13, 0xf7, 0x45, 0x63, 0x46, 0x92, 0x76, 0xc2, 0x13,
    0xb1, 0xc2, 0xec, 0xd3, 0x8d, 0x26, 0x2f, 0xf4, 0xe8, 0x6b, 0xe5, 0x5e, 0xfe, 0x14, 0xe3,
    0x02, 0xcf,
]);
