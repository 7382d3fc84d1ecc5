//! `market`: one-shot commands against the component marketplace program.

mod cli;
mod output;

use anyhow::{bail, Context};
use clap::Parser;
use colored::Colorize;
use market_client::{ClientError, MarketplaceClient};
use market_core::{
    account_discriminator, event_discriminator, instruction_discriminator, Component, FeeQuote,
    Keypair, Marketplace, Pubkey, Purchase,
};
use tracing_subscriber::EnvFilter;

use crate::cli::{CliArgs, Command, DiscriminatorKind};
use crate::output::{header, print_kv, LogColor};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    run(args).await
}

async fn run(args: CliArgs) -> anyhow::Result<()> {
    let client = MarketplaceClient::from_config(args.client_config())
        .context("cannot create rpc client")?;
    tracing::debug!(
        rpc_url = %client.config().rpc_url,
        program_id = %client.config().program_id,
        "client ready"
    );

    match &args.command {
        Command::Address { component, buyer } => {
            header("Addresses");
            print_kv!("program", client.config().program_id);
            print_kv!("marketplace", client.marketplace_address()?);
            if let Some(id) = component {
                print_kv!("component", client.component_address(id)?);
                let buyer = match buyer {
                    Some(buyer) => Some(*buyer),
                    None => load_keypair(&args).ok().map(|k| k.pubkey()),
                };
                if let Some(buyer) = buyer {
                    print_kv!("purchase", client.purchase_address(&buyer, id)?);
                }
            }
        }
        Command::Initialize { fee_bps } => {
            let authority = load_keypair(&args)?;
            print_kv!("authority", authority.pubkey());
            print_kv!("fee", format!("{fee_bps} bps ({:.2}%)", *fee_bps as f64 / 100.0));

            match client.initialize(&authority, *fee_bps).await {
                Ok(signature) => {
                    print_kv!("signature", signature, LogColor::Header);
                    if let Some(market) = client.fetch_marketplace().await? {
                        show_marketplace(&client.marketplace_address()?, &market);
                    }
                }
                Err(ClientError::IdempotencyCollision { address, .. }) => {
                    let note = "marketplace already initialized";
                    println!("{}", note.color(colored::Color::from(LogColor::Warning)));
                    if let Some(market) = client.fetch_marketplace().await? {
                        show_marketplace(&address, &market);
                    }
                }
                Err(e) => return Err(report(e)).context("initialize failed"),
            }
        }
        Command::List {
            component_id,
            price,
            metadata_uri,
        } => {
            let creator = load_keypair(&args)?;
            let signature = client
                .list_component(&creator, component_id, *price, metadata_uri)
                .await
                .map_err(report)
                .context("list_component failed")?;
            print_kv!("signature", signature, LogColor::Header);
            print_kv!("component", client.component_address(component_id)?);
        }
        Command::Purchase { component_id } => {
            let buyer = load_keypair(&args)?;
            if let (Some(component), Some(market)) = (
                client.fetch_component(component_id).await?,
                client.fetch_marketplace().await?,
            ) {
                let quote = FeeQuote::compute(component.price, market.fee_percentage)?;
                print_kv!("price", quote.price);
                print_kv!("marketplace fee", quote.marketplace_fee);
                print_kv!("creator receives", quote.creator_amount);
            }
            let signature = client
                .purchase_component(&buyer, component_id)
                .await
                .map_err(report)
                .context("purchase_component failed")?;
            print_kv!("signature", signature, LogColor::Header);
            print_kv!("receipt", client.purchase_address(&buyer.pubkey(), component_id)?);
        }
        Command::Delist { component_id } => {
            let creator = load_keypair(&args)?;
            let signature = client
                .delist_component(&creator, component_id)
                .await
                .map_err(report)
                .context("delist_component failed")?;
            print_kv!("signature", signature, LogColor::Header);
        }
        Command::ShowMarketplace => {
            let address = client.marketplace_address()?;
            match client.fetch_marketplace().await? {
                Some(market) => show_marketplace(&address, &market),
                None => bail!("marketplace {address} is not initialized"),
            }
        }
        Command::ShowComponent { component_id } => {
            let address = client.component_address(component_id)?;
            match client.fetch_component(component_id).await? {
                Some(component) => show_component(&address, &component),
                None => bail!("component {component_id:?} not found at {address}"),
            }
        }
        Command::Components { creator } => {
            let scan = match creator {
                Some(creator) => client.components_by_creator(creator).await?,
                None => client.all_components().await?,
            };
            if scan.is_empty() {
                println!("no components found");
            }
            for (address, component) in &scan.records {
                show_component(address, component);
                println!();
            }
            for (address, err) in &scan.skipped {
                print_kv!("skipped", format!("{address}: {err}"), LogColor::Warning);
            }
        }
        Command::ShowPurchase {
            component_id,
            buyer,
        } => {
            let buyer = match buyer {
                Some(buyer) => *buyer,
                None => load_keypair(&args)?.pubkey(),
            };
            let address = client.purchase_address(&buyer, component_id)?;
            match client.fetch_purchase(&buyer, component_id).await? {
                Some(purchase) => show_purchase(&address, &purchase),
                None => bail!("no purchase of {component_id:?} by {buyer}"),
            }
        }
        Command::Discriminator { name, kind } => {
            let bytes = match kind {
                DiscriminatorKind::Instruction => instruction_discriminator(name)?,
                DiscriminatorKind::Account => account_discriminator(name),
                DiscriminatorKind::Event => event_discriminator(name),
            };
            print_kv!("hex", hex::encode(bytes));
            print_kv!("bytes", format!("{bytes:?}"));
        }
    }

    Ok(())
}

fn load_keypair(args: &CliArgs) -> anyhow::Result<Keypair> {
    let path = args.keypair_path();
    Keypair::read_from_file(&path)
        .with_context(|| format!("cannot load keypair from {}", path.display()))
}

/// Print preflight logs before handing the error to `anyhow`.
fn report(err: ClientError) -> ClientError {
    for line in err.logs() {
        eprintln!("  {}", line.color(colored::Color::from(LogColor::FadedGray)));
    }
    err
}

fn show_marketplace(address: &Pubkey, market: &Marketplace) {
    header("Marketplace");
    print_kv!("address", address);
    print_kv!("authority", market.authority);
    print_kv!("fee", format!("{} bps", market.fee_percentage));
    print_kv!("total volume", market.total_volume);
    print_kv!("total components", market.total_components);
}

fn show_component(address: &Pubkey, component: &Component) {
    header(&component.component_id);
    print_kv!("address", address);
    print_kv!("creator", component.creator);
    print_kv!("price", component.price);
    print_kv!("metadata uri", component.metadata_uri);
    let status = if component.is_active { "active" } else { "inactive" };
    let status_color = if component.is_active {
        LogColor::Info
    } else {
        LogColor::Warning
    };
    print_kv!("status", status, status_color);
    print_kv!("total sales", component.total_sales);
    print_kv!("created at", component.created_at);
}

fn show_purchase(address: &Pubkey, purchase: &Purchase) {
    header("Purchase");
    print_kv!("address", address);
    print_kv!("buyer", purchase.buyer);
    print_kv!("component", purchase.component_id);
    print_kv!("price", purchase.price);
    print_kv!("purchased at", purchase.purchased_at);
}
