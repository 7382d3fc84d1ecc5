//! Async client for the component marketplace program.
//!
//! Builds on `market-core` for everything deterministic and adds the
//! network half: JSON-RPC transport, account queries, and transaction
//! submission with confirmation polling. The transport is a trait
//! ([`rpc::RpcTransport`]) so the whole client runs against an in-memory
//! ledger in tests.

pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod rpc;
pub mod submit;

pub use client::{MarketplaceClient, MIN_INITIALIZE_BALANCE};
pub use config::{ClientConfig, Commitment, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RPC_URL};
pub use error::ClientError;
pub use query::{Filter, ScanReport};
pub use rpc::{HttpTransport, RawAccount, RpcClient, RpcTransport, SignatureStatus};
pub use submit::SubmitOptions;
