//! Position entry and exit - building, signing and submitting swap transactions.

use crate::sniper::collaborators::{PriceFeed, TradeBuilder, TransactionSubmitter, WalletSigner};
use crate::sniper::config::SniperConfig;
use crate::sniper::connection_guard::ConnectionGuard;
use crate::sniper::error::SniperResult;
use crate::sniper::notifier::{notify_quietly, Notifier};
use crate::sniper::types::{ClosedPosition, ExitTrigger, Position, SellAmount, SubmitOptions};
use crate::types::Candidate;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Services shared by entry and exit.
#[derive(Clone)]
pub struct ExecutionServices {
    pub trader: Arc<dyn TradeBuilder>,
    pub signer: Arc<dyn WalletSigner>,
    pub submitter: Arc<dyn TransactionSubmitter>,
    pub notifier: Arc<dyn Notifier>,
    pub notify_timeout: Duration,
}

/// Buys an approved candidate.
///
/// Entry is split at the submission boundary: [`PositionEntry::submit_buy`] is safe to
/// retry, [`PositionEntry::confirm_fill`] is not allowed to resubmit and retries only the
/// price read.
pub struct PositionEntry {
    services: ExecutionServices,
    prices: Arc<dyn PriceFeed>,
    guard: Arc<ConnectionGuard>,
    trade_size_sol: f64,
    slippage: f64,
    submit_options: SubmitOptions,
    poll_interval: Duration,
}

impl PositionEntry {
    pub fn new(
        services: ExecutionServices,
        prices: Arc<dyn PriceFeed>,
        guard: Arc<ConnectionGuard>,
        config: &SniperConfig,
    ) -> Self {
        Self {
            services,
            prices,
            guard,
            trade_size_sol: config.trade_size_sol(),
            slippage: config.slippage_tolerance,
            submit_options: SubmitOptions {
                skip_preflight: config.skip_preflight,
                commitment: config.commitment,
            },
            poll_interval: config.poll_interval(),
        }
    }

    /// Buy and open a position: one submission, then [`Self::confirm_fill`].
    pub async fn enter(&self, candidate: &Candidate) -> Result<Position> {
        let signature = self.submit_buy(candidate).await?;
        Ok(self.confirm_fill(candidate, signature).await?)
    }

    /// Build, sign and submit one buy. Returns the transaction signature.
    ///
    /// Nothing has landed when this fails, so the caller may retry it.
    #[instrument(skip(self, candidate), fields(mint = %candidate.mint))]
    pub async fn submit_buy(&self, candidate: &Candidate) -> Result<String> {
        info!("Attempting to buy {} for {} SOL...", candidate.symbol, self.trade_size_sol);

        let unsigned = self
            .services
            .trader
            .build_buy(&candidate.mint, self.trade_size_sol, self.slippage)
            .await
            .context("Failed to build buy transaction")?;
        let signed = self
            .services
            .signer
            .sign(unsigned)
            .await
            .context("Failed to sign buy transaction")?;
        self.services
            .submitter
            .submit(&signed, self.submit_options)
            .await
            .context("Failed to submit buy transaction")
    }

    /// Read the fill price for a submitted buy and open the position.
    ///
    /// The buy has already landed, so a failed price read never fails the entry: it goes
    /// through the connection guard and is retried every poll interval until it succeeds.
    /// Only guard exhaustion ends the wait.
    #[instrument(skip(self, candidate, signature), fields(mint = %candidate.mint))]
    pub async fn confirm_fill(&self, candidate: &Candidate, signature: String) -> SniperResult<Position> {
        let mut failures: u32 = 0;
        let fill_price = loop {
            match self.prices.token_price(&candidate.mint).await {
                Ok(price) => break price,
                Err(e) => {
                    failures += 1;
                    warn!(
                        "Failed to fetch fill price for {} (failure #{}, buy {} already submitted): {:#}",
                        candidate.mint, failures, signature, e
                    );
                    self.guard.ensure_connected().await?;
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        };

        info!(
            "Purchased {} successfully at {} (signature: {})",
            candidate.symbol, fill_price, signature
        );
        notify_quietly(
            self.services.notifier.as_ref(),
            &format!("Purchased {}", candidate.symbol),
            self.services.notify_timeout,
        )
        .await;

        Ok(Position::open(
            candidate.mint.clone(),
            candidate.symbol.clone(),
            fill_price,
            self.trade_size_sol,
            signature,
        ))
    }
}

/// Sells the full balance of a position.
pub struct PositionExit {
    services: ExecutionServices,
    guard: Arc<ConnectionGuard>,
    submit_options: SubmitOptions,
}

impl PositionExit {
    pub fn new(services: ExecutionServices, guard: Arc<ConnectionGuard>, config: &SniperConfig) -> Self {
        Self {
            services,
            guard,
            submit_options: SubmitOptions {
                skip_preflight: config.skip_preflight,
                commitment: config.commitment,
            },
        }
    }

    /// One sell attempt for the entire held balance.
    #[instrument(skip(self, position), fields(mint = %position.mint()))]
    pub async fn try_exit(&self, position: &Position) -> Result<String> {
        let unsigned = self
            .services
            .trader
            .build_sell(position.mint(), SellAmount::All)
            .await
            .context("Failed to build sell transaction")?;
        let signed = self
            .services
            .signer
            .sign(unsigned)
            .await
            .context("Failed to sign sell transaction")?;
        self.services
            .submitter
            .submit(&signed, self.submit_options)
            .await
            .context("Failed to submit sell transaction")
    }

    /// Sell until it succeeds.
    ///
    /// Each failure goes through [`ConnectionGuard::ensure_connected`] and the whole sell is
    /// retried. There is no ceiling of its own; only guard exhaustion ends the loop.
    #[instrument(skip(self, position, trigger), fields(mint = %position.mint(), reason = %trigger.reason))]
    pub async fn exit(&self, position: Position, trigger: ExitTrigger) -> SniperResult<ClosedPosition> {
        let mut failures: u32 = 0;
        let exit_signature = loop {
            match self.try_exit(&position).await {
                Ok(signature) => break signature,
                Err(e) => {
                    failures += 1;
                    warn!(
                        "Connection error during sell of {} (failure #{}): {:#}. Attempting to reconnect...",
                        position.mint(),
                        failures,
                        e
                    );
                    self.guard.ensure_connected().await?;
                }
            }
        };

        info!(
            "Sold {} successfully (reason: {}, signature: {})",
            position.symbol(),
            trigger.reason,
            exit_signature
        );
        notify_quietly(
            self.services.notifier.as_ref(),
            &format!("Sold {} ({})", position.symbol(), trigger.reason),
            self.services.notify_timeout,
        )
        .await;

        Ok(ClosedPosition {
            position: position.close(),
            exit_signature,
            reason: trigger.reason,
            exit_price: trigger.price,
            closed_at: chrono::Utc::now().timestamp_millis() as u64,
        })
    }
}
