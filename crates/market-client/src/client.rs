//! High-level marketplace operations.

use market_core::instructions::{self, MarketplaceInstruction};
use market_core::state::{COMPONENT_CREATOR_OFFSET, COMPONENT_OBSERVED_ACCOUNT_SIZE};
use market_core::{
    build_signed_transaction, component_address, marketplace_address, purchase_address,
    Component, DelistComponentAccounts, InitializeAccounts, Instruction, Keypair,
    ListComponentAccounts, Marketplace, Pubkey, Purchase, PurchaseComponentAccounts, Signature,
};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::query::{decode_accounts, Filter, ScanReport};
use crate::rpc::{HttpTransport, RpcClient, RpcTransport};
use crate::submit::SubmitOptions;

/// Lamports the authority must hold before `initialize` (0.01 SOL).
pub const MIN_INITIALIZE_BALANCE: u64 = 10_000_000;

/// Idempotency guard for instructions that create an account: the address
/// the instruction would create plus the instruction's name.
#[derive(Debug, Clone, Copy)]
struct CreateGuard {
    address: Pubkey,
    instruction: &'static str,
}

impl CreateGuard {
    fn new(address: Pubkey, ix: &MarketplaceInstruction) -> Self {
        Self {
            address,
            instruction: ix.name(),
        }
    }
}

/// Client context: transport, program identities and submission settings.
///
/// All methods take `&self`; independent calls may run concurrently.
#[derive(Debug)]
pub struct MarketplaceClient<T> {
    rpc: RpcClient<T>,
    config: ClientConfig,
}

impl MarketplaceClient<HttpTransport> {
    /// Client over HTTP JSON-RPC at `config.rpc_url`.
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(config.rpc_url.clone(), config.request_timeout)?;
        Ok(Self::new(transport, config))
    }
}

impl<T: RpcTransport> MarketplaceClient<T> {
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            rpc: RpcClient::new(transport),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn rpc(&self) -> &RpcClient<T> {
        &self.rpc
    }

    fn submit_options(&self) -> SubmitOptions {
        SubmitOptions::from(&self.config)
    }

    /// Fee wallet: the configured one, else the marketplace authority.
    fn treasury_wallet(&self, authority: &Pubkey) -> Pubkey {
        self.config.treasury_wallet.unwrap_or(*authority)
    }

    // -- addresses -----------------------------------------------------------

    pub fn marketplace_address(&self) -> Result<Pubkey, ClientError> {
        Ok(marketplace_address(&self.config.program_id)?.0)
    }

    pub fn component_address(&self, component_id: &str) -> Result<Pubkey, ClientError> {
        Ok(component_address(&self.config.program_id, component_id)?.0)
    }

    pub fn purchase_address(
        &self,
        buyer: &Pubkey,
        component_id: &str,
    ) -> Result<Pubkey, ClientError> {
        Ok(purchase_address(&self.config.program_id, buyer, component_id)?.0)
    }

    // -- reads ---------------------------------------------------------------

    async fn fetch_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, ClientError> {
        Ok(self
            .rpc
            .get_account(address, self.config.commitment)
            .await?
            .map(|account| account.data))
    }

    pub async fn fetch_marketplace(&self) -> Result<Option<Marketplace>, ClientError> {
        let address = self.marketplace_address()?;
        match self.fetch_data(&address).await? {
            Some(data) => Ok(Some(Marketplace::decode(&data)?)),
            None => Ok(None),
        }
    }

    pub async fn fetch_component(
        &self,
        component_id: &str,
    ) -> Result<Option<Component>, ClientError> {
        let address = self.component_address(component_id)?;
        match self.fetch_data(&address).await? {
            Some(data) => Ok(Some(Component::decode(&data)?)),
            None => Ok(None),
        }
    }

    pub async fn fetch_purchase(
        &self,
        buyer: &Pubkey,
        component_id: &str,
    ) -> Result<Option<Purchase>, ClientError> {
        let address = self.purchase_address(buyer, component_id)?;
        match self.fetch_data(&address).await? {
            Some(data) => Ok(Some(Purchase::decode(&data)?)),
            None => Ok(None),
        }
    }

    /// Every listing, active or not.
    pub async fn all_components(&self) -> Result<ScanReport<Component>, ClientError> {
        self.scan_components(Vec::new()).await
    }

    /// Listings created by `creator`. No listings is an empty report.
    pub async fn components_by_creator(
        &self,
        creator: &Pubkey,
    ) -> Result<ScanReport<Component>, ClientError> {
        self.scan_components(vec![Filter::memcmp(COMPONENT_CREATOR_OFFSET, creator)])
            .await
    }

    async fn scan_components(
        &self,
        extra: Vec<Filter>,
    ) -> Result<ScanReport<Component>, ClientError> {
        let mut filters = vec![
            Filter::DataSize(COMPONENT_OBSERVED_ACCOUNT_SIZE),
            Filter::memcmp(0, Component::discriminator()),
        ];
        filters.extend(extra);

        let accounts = self
            .rpc
            .get_program_accounts(&self.config.program_id, &filters, self.config.commitment)
            .await?;
        Ok(decode_accounts(accounts, Component::decode))
    }

    // -- writes --------------------------------------------------------------

    /// Create the marketplace singleton with `fee_percentage` basis points.
    ///
    /// Fails with [`ClientError::IdempotencyCollision`] if the marketplace
    /// already exists, and otherwise with [`ClientError::InsufficientFunds`]
    /// if the authority holds less than [`MIN_INITIALIZE_BALANCE`].
    pub async fn initialize(
        &self,
        authority: &Keypair,
        fee_percentage: u16,
    ) -> Result<Signature, ClientError> {
        let program_id = &self.config.program_id;
        let authority_key = authority.pubkey();
        let accounts = InitializeAccounts::derive(
            program_id,
            &authority_key,
            &self.config.token_mint,
            &self.treasury_wallet(&authority_key),
        )?;
        let ix = instructions::initialize(program_id, &accounts, fee_percentage)?;

        let guard = CreateGuard::new(
            accounts.marketplace,
            &MarketplaceInstruction::Initialize { fee_percentage },
        );
        self.ensure_absent(guard).await?;

        let available = self
            .rpc
            .get_balance(&authority.pubkey(), self.config.commitment)
            .await?;
        if available < MIN_INITIALIZE_BALANCE {
            return Err(ClientError::InsufficientFunds {
                needed: MIN_INITIALIZE_BALANCE,
                available,
            });
        }

        self.submit(&[ix], authority, Some(guard)).await
    }

    pub async fn list_component(
        &self,
        creator: &Keypair,
        component_id: &str,
        price: u64,
        metadata_uri: &str,
    ) -> Result<Signature, ClientError> {
        let program_id = &self.config.program_id;
        let accounts = ListComponentAccounts::derive(program_id, &creator.pubkey(), component_id)?;
        let ix =
            instructions::list_component(program_id, &accounts, component_id, price, metadata_uri)?;

        let payload = MarketplaceInstruction::ListComponent {
            component_id: component_id.to_owned(),
            price,
            metadata_uri: metadata_uri.to_owned(),
        };
        let guard = CreateGuard::new(accounts.component, &payload);
        self.ensure_absent(guard).await?;
        self.submit(&[ix], creator, Some(guard)).await
    }

    /// Buy a listing. The creator token account comes from the on-chain
    /// listing; the fee token account belongs to the treasury wallet, which
    /// defaults to the marketplace authority.
    pub async fn purchase_component(
        &self,
        buyer: &Keypair,
        component_id: &str,
    ) -> Result<Signature, ClientError> {
        let program_id = &self.config.program_id;
        let component = self
            .fetch_component(component_id)
            .await?
            .ok_or(ClientError::AccountNotFound(self.component_address(component_id)?))?;
        let marketplace = self
            .fetch_marketplace()
            .await?
            .ok_or(ClientError::AccountNotFound(self.marketplace_address()?))?;

        let accounts = PurchaseComponentAccounts::derive(
            program_id,
            &buyer.pubkey(),
            &component.creator,
            &self.treasury_wallet(&marketplace.authority),
            &self.config.token_mint,
            component_id,
        )?;
        let ix = instructions::purchase_component(program_id, &accounts)?;

        let guard =
            CreateGuard::new(accounts.purchase, &MarketplaceInstruction::PurchaseComponent);
        self.ensure_absent(guard).await?;
        self.submit(&[ix], buyer, Some(guard)).await
    }

    pub async fn delist_component(
        &self,
        creator: &Keypair,
        component_id: &str,
    ) -> Result<Signature, ClientError> {
        let program_id = &self.config.program_id;
        let accounts =
            DelistComponentAccounts::derive(program_id, &creator.pubkey(), component_id)?;
        let ix = instructions::delist_component(program_id, &accounts)?;
        self.submit(&[ix], creator, None).await
    }

    /// Sign once and drive the transaction to confirmation.
    ///
    /// Callers check a guard's account before building anything. Here a
    /// preflight rejection is re-checked against remote state, so a collision
    /// is only reported when the account really exists.
    async fn submit(
        &self,
        instructions: &[Instruction],
        payer: &Keypair,
        guard: Option<CreateGuard>,
    ) -> Result<Signature, ClientError> {
        let options = self.submit_options();
        let blockhash = self.rpc.get_latest_blockhash(options.commitment).await?;
        let tx = build_signed_transaction(instructions, payer, &[], &blockhash)?;

        match self.rpc.send_and_confirm(&tx, &options).await {
            Err(err @ ClientError::PreflightRejected { .. }) => {
                if let Some(guard) = guard {
                    self.ensure_absent(guard).await?;
                }
                tracing::warn!(logs = ?err.logs(), "preflight rejected transaction");
                Err(err)
            }
            other => other,
        }
    }

    async fn ensure_absent(&self, guard: CreateGuard) -> Result<(), ClientError> {
        let existing = self
            .rpc
            .get_account(&guard.address, self.config.commitment)
            .await?;
        if existing.is_some() {
            tracing::warn!(
                address = %guard.address,
                instruction = guard.instruction,
                "account already exists, not resubmitting"
            );
            return Err(ClientError::IdempotencyCollision {
                address: guard.address,
                instruction: guard.instruction,
            });
        }
        Ok(())
    }
}
