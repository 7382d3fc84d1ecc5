//! Marketplace program instructions.
//!
//! [`MarketplaceInstruction`] is the payload half: discriminator plus
//! Borsh-encoded arguments. The `*Accounts` structs are the other half, the
//! ordered account list each instruction expects. The program reads accounts
//! by position, so the order produced by `to_account_metas` is part of the
//! wire contract.

use crate::address::Pubkey;
use crate::codec::{encode_instruction, instruction_discriminator, Arg, Reader, DISCRIMINATOR_LEN};
use crate::error::CoreError;
use crate::pda::{component_address, marketplace_address, purchase_address};
use crate::token::{associated_token_address, TOKEN_PROGRAM_ID};
use crate::transaction::{AccountMeta, Instruction, SYSTEM_PROGRAM_ID};

/// Fee rates are basis points; 10000 is 100%.
pub const MAX_FEE_BPS: u16 = 10_000;

/// A decoded instruction payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketplaceInstruction {
    /// One-time creation of the marketplace singleton.
    Initialize { fee_percentage: u16 },
    ListComponent {
        component_id: String,
        price: u64,
        metadata_uri: String,
    },
    PurchaseComponent,
    /// Marks a listing inactive. Only its creator may do this.
    DelistComponent,
}

impl MarketplaceInstruction {
    pub const ALL_NAMES: [&'static str; 4] = [
        "initialize",
        "list_component",
        "purchase_component",
        "delist_component",
    ];

    /// Instruction name as hashed into the discriminator.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialize { .. } => "initialize",
            Self::ListComponent { .. } => "list_component",
            Self::PurchaseComponent => "purchase_component",
            Self::DelistComponent => "delist_component",
        }
    }

    pub fn discriminator(&self) -> Result<[u8; DISCRIMINATOR_LEN], CoreError> {
        instruction_discriminator(self.name())
    }

    pub fn pack(&self) -> Result<Vec<u8>, CoreError> {
        let args = match self {
            Self::Initialize { fee_percentage } => vec![Arg::u16(*fee_percentage)],
            Self::ListComponent {
                component_id,
                price,
                metadata_uri,
            } => vec![
                Arg::string(component_id.as_str()),
                Arg::u64(*price),
                Arg::string(metadata_uri.as_str()),
            ],
            Self::PurchaseComponent | Self::DelistComponent => Vec::new(),
        };
        encode_instruction(self.name(), &args)
    }

    /// Decode a payload produced by [`pack`](Self::pack). Trailing bytes are
    /// rejected.
    pub fn unpack(data: &[u8]) -> Result<Self, CoreError> {
        let mut r = Reader::new(data);
        let tag = r.read_array::<DISCRIMINATOR_LEN>()?;

        let name = Self::ALL_NAMES
            .into_iter()
            .find(|name| instruction_discriminator(name).is_ok_and(|d| d == tag))
            .ok_or_else(|| CoreError::UnknownInstruction(hex::encode(tag)))?;

        let ix = match name {
            "initialize" => Self::Initialize {
                fee_percentage: r.read_u16()?,
            },
            "list_component" => Self::ListComponent {
                component_id: r.read_string()?,
                price: r.read_u64()?,
                metadata_uri: r.read_string()?,
            },
            "purchase_component" => Self::PurchaseComponent,
            _ => Self::DelistComponent,
        };
        r.finish()?;
        Ok(ix)
    }
}

// ---------------------------------------------------------------------------
// Account lists
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializeAccounts {
    pub marketplace: Pubkey,
    pub token_mint: Pubkey,
    /// Wallet whose token account for `token_mint` receives marketplace fees.
    pub treasury: Pubkey,
    pub authority: Pubkey,
}

impl InitializeAccounts {
    /// Derive the marketplace address. `treasury_wallet` is a wallet, not a
    /// token account; purchases pay fees into its associated token account.
    pub fn derive(
        program_id: &Pubkey,
        authority: &Pubkey,
        token_mint: &Pubkey,
        treasury_wallet: &Pubkey,
    ) -> Result<Self, CoreError> {
        let (marketplace, _) = marketplace_address(program_id)?;
        Ok(Self {
            marketplace,
            token_mint: *token_mint,
            treasury: *treasury_wallet,
            authority: *authority,
        })
    }

    pub fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.marketplace, false),
            AccountMeta::new_readonly(self.token_mint, false),
            AccountMeta::new_readonly(self.treasury, false),
            AccountMeta::new(self.authority, true),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListComponentAccounts {
    pub component: Pubkey,
    pub marketplace: Pubkey,
    pub creator: Pubkey,
}

impl ListComponentAccounts {
    pub fn derive(
        program_id: &Pubkey,
        creator: &Pubkey,
        component_id: &str,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            component: component_address(program_id, component_id)?.0,
            marketplace: marketplace_address(program_id)?.0,
            creator: *creator,
        })
    }

    pub fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.component, false),
            AccountMeta::new(self.marketplace, false),
            AccountMeta::new(self.creator, true),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseComponentAccounts {
    pub component: Pubkey,
    pub marketplace: Pubkey,
    pub purchase: Pubkey,
    pub buyer: Pubkey,
    pub buyer_token_account: Pubkey,
    pub creator_token_account: Pubkey,
    pub marketplace_token_account: Pubkey,
}

impl PurchaseComponentAccounts {
    /// Derive every account from the listing's creator and the treasury
    /// wallet the marketplace was initialized with. Token accounts are the
    /// associated token accounts of `token_mint`.
    pub fn derive(
        program_id: &Pubkey,
        buyer: &Pubkey,
        creator: &Pubkey,
        treasury_owner: &Pubkey,
        token_mint: &Pubkey,
        component_id: &str,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            component: component_address(program_id, component_id)?.0,
            marketplace: marketplace_address(program_id)?.0,
            purchase: purchase_address(program_id, buyer, component_id)?.0,
            buyer: *buyer,
            buyer_token_account: associated_token_address(buyer, token_mint)?,
            creator_token_account: associated_token_address(creator, token_mint)?,
            marketplace_token_account: associated_token_address(treasury_owner, token_mint)?,
        })
    }

    pub fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.component, false),
            AccountMeta::new(self.marketplace, false),
            AccountMeta::new(self.purchase, false),
            AccountMeta::new(self.buyer, true),
            AccountMeta::new(self.buyer_token_account, false),
            AccountMeta::new(self.creator_token_account, false),
            AccountMeta::new(self.marketplace_token_account, false),
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelistComponentAccounts {
    pub component: Pubkey,
    pub creator: Pubkey,
}

impl DelistComponentAccounts {
    pub fn derive(
        program_id: &Pubkey,
        creator: &Pubkey,
        component_id: &str,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            component: component_address(program_id, component_id)?.0,
            creator: *creator,
        })
    }

    pub fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.component, false),
            AccountMeta::new_readonly(self.creator, true),
        ]
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn initialize(
    program_id: &Pubkey,
    accounts: &InitializeAccounts,
    fee_percentage: u16,
) -> Result<Instruction, CoreError> {
    if fee_percentage > MAX_FEE_BPS {
        return Err(CoreError::InvalidFee(fee_percentage));
    }
    build(
        program_id,
        accounts.to_account_metas(),
        &MarketplaceInstruction::Initialize { fee_percentage },
    )
}

pub fn list_component(
    program_id: &Pubkey,
    accounts: &ListComponentAccounts,
    component_id: &str,
    price: u64,
    metadata_uri: &str,
) -> Result<Instruction, CoreError> {
    build(
        program_id,
        accounts.to_account_metas(),
        &MarketplaceInstruction::ListComponent {
            component_id: component_id.to_owned(),
            price,
            metadata_uri: metadata_uri.to_owned(),
        },
    )
}

pub fn purchase_component(
    program_id: &Pubkey,
    accounts: &PurchaseComponentAccounts,
) -> Result<Instruction, CoreError> {
    build(
        program_id,
        accounts.to_account_metas(),
        &MarketplaceInstruction::PurchaseComponent,
    )
}

pub fn delist_component(
    program_id: &Pubkey,
    accounts: &DelistComponentAccounts,
) -> Result<Instruction, CoreError> {
    build(
        program_id,
        accounts.to_account_metas(),
        &MarketplaceInstruction::DelistComponent,
    )
}

fn build(
    program_id: &Pubkey,
    accounts: Vec<AccountMeta>,
    ix: &MarketplaceInstruction,
) -> Result<Instruction, CoreError> {
    let data = ix.pack()?;
    tracing::debug!(
        instruction = ix.name(),
        accounts = accounts.len(),
        data_len = data.len(),
        "built instruction"
    );
    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}
