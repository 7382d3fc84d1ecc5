use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use market_client::{ClientConfig, Commitment, DEFAULT_RPC_URL};
use market_core::{Pubkey, MARKETPLACE_PROGRAM_ID, MARKETPLACE_TOKEN_MINT};

#[derive(Parser, Debug)]
#[command(name = "market", version, about = "Component marketplace client")]
pub struct CliArgs {
    /// JSON-RPC endpoint.
    #[arg(long, env = "MARKET_RPC_URL", default_value = DEFAULT_RPC_URL, global = true)]
    pub rpc_url: String,

    /// Credential file: a JSON array of 64 bytes. Defaults to
    /// `$HOME/.config/solana/id.json`.
    #[arg(long, env = "MARKET_KEYPAIR", global = true)]
    pub keypair: Option<PathBuf>,

    /// Marketplace program address.
    #[arg(long, env = "MARKET_PROGRAM_ID", default_value_t = MARKETPLACE_PROGRAM_ID, global = true)]
    pub program_id: Pubkey,

    /// Payment token mint.
    #[arg(long = "mint", env = "MARKET_TOKEN_MINT", default_value_t = MARKETPLACE_TOKEN_MINT, global = true)]
    pub token_mint: Pubkey,

    /// Wallet collecting marketplace fees. Defaults to the marketplace
    /// authority.
    #[arg(long = "treasury", env = "MARKET_TREASURY", global = true)]
    pub treasury_wallet: Option<Pubkey>,

    #[arg(long, default_value_t = Commitment::Confirmed, global = true)]
    pub commitment: Commitment,

    /// Seconds to wait for a submitted transaction to be confirmed.
    #[arg(long, default_value_t = 60, global = true)]
    pub timeout_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the derived marketplace, component, and purchase addresses.
    Address {
        #[arg(long)]
        component: Option<String>,
        /// Buyer for the purchase receipt address (defaults to the keypair).
        #[arg(long)]
        buyer: Option<Pubkey>,
    },
    /// Create the marketplace (one time, by its authority).
    Initialize {
        /// Marketplace fee in basis points (250 = 2.5%).
        #[arg(long, default_value_t = 250)]
        fee_bps: u16,
    },
    /// List a component for sale.
    List {
        component_id: String,
        /// Price in the smallest token unit.
        #[arg(long)]
        price: u64,
        #[arg(long)]
        metadata_uri: String,
    },
    /// Buy a listed component.
    Purchase { component_id: String },
    /// Deactivate one of your listings.
    Delist { component_id: String },
    ShowMarketplace,
    ShowComponent { component_id: String },
    /// List components, optionally only those of one creator.
    Components {
        #[arg(long)]
        creator: Option<Pubkey>,
    },
    ShowPurchase {
        component_id: String,
        /// Defaults to the keypair's public key.
        #[arg(long)]
        buyer: Option<Pubkey>,
    },
    /// Print the 8-byte discriminator for a name.
    Discriminator {
        name: String,
        #[arg(long, value_enum, default_value_t = DiscriminatorKind::Instruction)]
        kind: DiscriminatorKind,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscriminatorKind {
    Instruction,
    Account,
    Event,
}

impl CliArgs {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            rpc_url: self.rpc_url.clone(),
            program_id: self.program_id,
            token_mint: self.token_mint,
            treasury_wallet: self.treasury_wallet,
            commitment: self.commitment,
            confirm_timeout: Duration::from_secs(self.timeout_secs),
            ..ClientConfig::default()
        }
    }

    pub fn keypair_path(&self) -> PathBuf {
        self.keypair.clone().unwrap_or_else(default_keypair_path)
    }
}

fn default_keypair_path() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".config/solana/id.json")
}
