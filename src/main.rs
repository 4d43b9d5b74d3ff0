//! Testnet wallet CLI.
//!
//! # Architecture Overview
//!
//! ```text
//!                ┌───────────────────────────────────────────────────────┐
//!                │                    TESTNET WALLET                      │
//!                │                                                        │
//!   EIP-1193     │  ┌──────────┐   ┌───────────────┐   ┌──────────────┐  │
//!   wallet ◀─────┼──│ provider │◀──│ WalletSession │──▶│ NetworkGuard │  │
//!   (JSON-RPC)   │  │  poller  │   └───────┬───────┘   └──────────────┘  │
//!                │  └──────────┘           │ signing connection          │
//!                │                         ▼                             │
//!                │  ┌──────────────────┐  ┌──────────────────────┐       │
//!   Public RPC ◀─┼──│ ProviderResolver │◀─│ TransferOrchestrator │       │
//!                │  └────────┬─────────┘  └──────────────────────┘       │
//!                │           │                                           │
//!                │           ▼                                           │
//!                │  ┌────────────────┐      HTTP faucets                 │
//!                │  │ TreasuryFaucet │─────────────────────────────────▶ │
//!                │  └────────────────┘                                   │
//!                │                                                        │
//!                │  Cross-cutting: config, error normalization,          │
//!                │  observability, lifecycle (shutdown)                   │
//!                └───────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use alloy::primitives::utils::format_units;
use alloy::primitives::{Address, U256};
use clap::{Parser, Subcommand};
use serde_json::json;

use testnet_wallet::config::{load_config, WalletConfig};
use testnet_wallet::config::validation::validate_config;
use testnet_wallet::observability::{logging, metrics};
use testnet_wallet::transfer::TransferRequest;
use testnet_wallet::WalletApp;

#[derive(Parser)]
#[command(name = "testnet-wallet")]
#[command(about = "Token balances, transfers and gas top-ups on a test network", long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in Sepolia defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show session, network and treasury state
    Status,
    /// Request account access from the wallet
    Connect,
    /// Show native and token balances
    Balances {
        #[arg(short, long)]
        address: Option<Address>,
    },
    /// Estimate gas for a token transfer
    Estimate {
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: String,
        #[arg(long, default_value = "USDC")]
        token: String,
    },
    /// Send tokens from the connected account
    Send {
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: String,
        #[arg(long, default_value = "USDC")]
        token: String,
    },
    /// Fund an address with gas (treasury, then faucets)
    Topup {
        #[arg(short, long)]
        address: Option<Address>,
    },
    /// Show the treasury balance
    Treasury,
    /// Request test tokens from the token faucets
    Tokens {
        #[arg(short, long)]
        address: Option<Address>,
    },
    /// Show local transaction history
    History,
    /// Refresh balances periodically until Ctrl-C
    Watch {
        #[arg(short, long)]
        address: Option<Address>,
    },
}

fn print_json(value: &serde_json::Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => {
            let config = WalletConfig::default();
            if let Err(errors) = validate_config(&config) {
                for error in &errors {
                    eprintln!("invalid default configuration: {}", error);
                }
                return Err("invalid default configuration".into());
            }
            config
        }
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!(
        chain_id = config.network.chain_id,
        network = %config.network.name,
        wallet = ?config.wallet.url,
        "testnet-wallet v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let app = WalletApp::from_config(config)?;
    app.start().await;

    let result = run(&app, cli.command).await;
    app.stop();
    result
}

async fn run(app: &WalletApp, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Status => {
            let session = app.session.session();
            let network = app.session.network();
            let connection = app.read_connection().await?;
            let treasury = app.faucet.treasury_info(connection.as_ref()).await;
            print_json(&json!({
                "state": session.state.as_str(),
                "address": session.address,
                "last_error": session.last_error.as_ref().map(|e| e.to_string()),
                "chain_id": network.map(|n| n.chain_id.to_hex()),
                "wrong_network": app.session.is_wrong_network(),
                "treasury": treasury,
                "can_request_topup": app.faucet.can_request(),
            }))?;
        }
        Commands::Connect => {
            let address = app.session.connect().await?;
            print_json(&json!({ "address": address }))?;
        }
        Commands::Balances { address } => {
            let owner = app.account(address)?;
            let refresher = app.balance_refresher(owner).await?;
            let snapshot = refresher.refresh().await;
            print_json(&serde_json::to_value(&snapshot)?)?;
        }
        Commands::Estimate { to, amount, token } => {
            let request = TransferRequest::new(to, amount, token);
            let connection = app.read_connection().await?;
            let estimate = app
                .orchestrator
                .estimate_gas(&request, connection.as_ref())
                .await?;
            print_json(&json!({
                "gas_limit": estimate.gas_limit,
                "gas_price_gwei": format_units(U256::from(estimate.gas_price), "gwei")?,
                "total_cost_eth": format_units(estimate.total_cost, "ether")?,
            }))?;
        }
        Commands::Send { to, amount, token } => {
            let request = TransferRequest::new(to, amount, token);
            let connection = app.signing_connection().await?;
            let hash = app
                .orchestrator
                .send_token(&request, connection.as_ref())
                .await?;
            print_json(&json!({
                "hash": hash,
                "explorer": app.config.network.explorer_tx_url(&hash.to_string()),
            }))?;
        }
        Commands::Topup { address } => {
            let owner = app.account(address)?;
            if !app.faucet.can_request() {
                eprintln!("Top-up cooldown active, try again later");
                return Ok(());
            }
            let connection = app.read_connection().await?;
            let outcome = app.faucet.request_topup(owner, connection.as_ref()).await?;
            print_json(&serde_json::to_value(&outcome)?)?;
        }
        Commands::Treasury => {
            let connection = app.read_connection().await?;
            let info = app.faucet.treasury_info(connection.as_ref()).await;
            print_json(&json!({
                "address": app.faucet.treasury_address(),
                "info": info,
            }))?;
        }
        Commands::Tokens { address } => {
            let owner = app.account(address)?;
            let results = app.faucet.request_test_tokens(owner).await?;
            print_json(&serde_json::to_value(&results)?)?;
        }
        Commands::History => {
            let records = app.orchestrator.history().records();
            print_json(&serde_json::to_value(&records)?)?;
        }
        Commands::Watch { address } => {
            let owner = app.account(address)?;
            let refresher = app.balance_refresher(owner).await?;

            if let Some(addr) = &app.config.observability.metrics_address {
                metrics::init_metrics(addr.parse()?)?;
            }

            let mut snapshots = refresher.subscribe();
            tokio::spawn(refresher.run(app.shutdown().subscribe()));

            loop {
                tokio::select! {
                    changed = snapshots.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let snapshot = snapshots.borrow_and_update().clone();
                        if let Some(snapshot) = snapshot {
                            let summary: Vec<_> = snapshot
                                .tokens
                                .iter()
                                .map(|t| format!("{} {}", t.balance, t.symbol))
                                .collect();
                            let native = snapshot
                                .native
                                .as_ref()
                                .map(|n| format!("{} ETH ({:?})", n.formatted, n.level))
                                .unwrap_or_else(|| "ETH unavailable".to_string());
                            println!("{} | {}", native, summary.join(" | "));
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Ctrl-C received, stopping");
                        break;
                    }
                }
            }
        }
    }
    Ok(())
}
