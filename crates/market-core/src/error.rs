use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while deriving addresses, encoding/decoding marketplace
/// data, assembling transactions, or loading credentials.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("no valid bump seed found for program address")]
    AddressDerivationExhausted,

    #[error("seed is {0} bytes, max seed length is 32")]
    SeedTooLong(usize),

    #[error("too many seeds: {0} (max 16 including bump)")]
    TooManySeeds(usize),

    #[error("value {value} does not fit in {width}")]
    EncodingOverflow { value: u128, width: &'static str },

    #[error("instruction name must not be empty")]
    InvalidDiscriminatorInput,

    #[error("account data truncated: need {needed} bytes, got {actual}")]
    TruncatedAccountData { needed: usize, actual: usize },

    #[error("account discriminator does not match {record}")]
    AccountDiscriminatorMismatch { record: &'static str },

    #[error("unknown instruction discriminator: {0}")]
    UnknownInstruction(String),

    #[error("invalid field encoding: {0}")]
    InvalidFieldEncoding(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("credential file not found: {}", .0.display())]
    CredentialFileMissing(PathBuf),

    #[error("malformed credential: {0}")]
    MalformedCredential(String),

    #[error("invalid fee: {0} basis points (max 10000)")]
    InvalidFee(u16),
}
