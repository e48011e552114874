//! Main entry point for the raydium-sniper bot
//!
//! The binary only paper-trades: discovery, risk checks, swaps, signing, submission and
//! prices all come from [`SimulatedMarket`], while liveness is checked against the
//! configured RPC endpoint. Live trading needs a real swap builder and wallet signer, wired
//! through [`Collaborators`] together with
//! [`RpcSubmitter`](raydium_sniper::sniper::rpc::RpcSubmitter); none ships with this binary.
//! Ctrl-C sells any open position and stops the run.

use anyhow::Result;
use raydium_sniper::sniper::rpc::{rpc_client, RpcHealthProbe};
use raydium_sniper::sniper::{
    Collaborators, LogNotifier, Notifier, SimulatedMarket, SniperBuilder, SniperConfig,
    SqliteTradeLedger, TelegramNotifier, TradeLedger,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};

const RPC_TIMEOUT: Duration = Duration::from_secs(30);
const PAPER_VOLATILITY: f64 = 0.08;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Starting raydium-sniper (paper trading)");

    let config = SniperConfig::load()?;
    if config.allowed_pools.is_empty() {
        warn!("No allowed pools configured (SNIPER_ALLOWED_POOLS); nothing will be traded");
    }

    let client = rpc_client(&config.rpc_url, RPC_TIMEOUT);
    let probe = Arc::new(RpcHealthProbe::new(client));

    let notifier: Arc<dyn Notifier> = match TelegramNotifier::from_env() {
        Some(telegram) => {
            info!("Telegram notifications enabled");
            Arc::new(telegram)
        }
        None => Arc::new(LogNotifier),
    };

    let market = Arc::new(SimulatedMarket::new(config.allowed_pools.clone(), PAPER_VOLATILITY));
    let services = Collaborators::simulated(market, probe, notifier);

    let mut builder = SniperBuilder::from_config(config.clone());
    if let Some(path) = &config.ledger_path {
        let ledger: Arc<dyn TradeLedger> = Arc::new(SqliteTradeLedger::open(path).await?);
        builder = builder.with_ledger(ledger);
    }
    let mut controller = builder.build(services)?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down after the current position is sold");
                shutdown.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    match controller.run(cancel).await {
        Ok(stats) => {
            info!("Shutdown complete: {:?}", stats);
            Ok(())
        }
        Err(e) if e.is_fatal() => {
            error!("Fatal: {}", e);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}
