//! Position monitor - polls live price until an exit condition fires.
//!
//! [`PositionMonitor::watch`] covers the `Watching` state: it returns the trigger that moves
//! the position to `Exiting` once a poll crosses the take-profit or stop-loss line, or the
//! operator cancels. The controller moves it to `Done` once the sell lands. There is no
//! time limit on `Watching`.

use crate::sniper::collaborators::PriceFeed;
use crate::sniper::config::SniperConfig;
use crate::sniper::connection_guard::ConnectionGuard;
use crate::sniper::error::SniperResult;
use crate::sniper::notifier::{notify_quietly, Notifier};
use crate::sniper::types::{ExitReason, ExitTrigger, Position};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Exit thresholds, as multiples of the entry price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitPolicy {
    pub take_profit_multiplier: f64,
    pub stop_loss_multiplier: f64,
}

impl ExitPolicy {
    pub fn from_config(config: &SniperConfig) -> Self {
        Self {
            take_profit_multiplier: config.take_profit_multiplier,
            stop_loss_multiplier: config.stop_loss_multiplier,
        }
    }

    /// Decide whether `price` triggers an exit. Take-profit is checked first and wins
    /// when both lines are crossed at once.
    pub fn evaluate(&self, entry_price: f64, price: f64) -> Option<ExitReason> {
        if price >= entry_price * self.take_profit_multiplier {
            Some(ExitReason::TakeProfit)
        } else if price <= entry_price * self.stop_loss_multiplier {
            Some(ExitReason::StopLoss)
        } else {
            None
        }
    }
}

pub struct PositionMonitor {
    prices: Arc<dyn PriceFeed>,
    guard: Arc<ConnectionGuard>,
    notifier: Arc<dyn Notifier>,
    policy: ExitPolicy,
    poll_interval: Duration,
    notify_timeout: Duration,
}

impl PositionMonitor {
    pub fn new(
        prices: Arc<dyn PriceFeed>,
        guard: Arc<ConnectionGuard>,
        notifier: Arc<dyn Notifier>,
        config: &SniperConfig,
    ) -> Self {
        Self {
            prices,
            guard,
            notifier,
            policy: ExitPolicy::from_config(config),
            poll_interval: config.poll_interval(),
            notify_timeout: config.notify_timeout(),
        }
    }

    pub fn policy(&self) -> ExitPolicy {
        self.policy
    }

    /// Watch `position` until an exit condition fires.
    ///
    /// Price-fetch failures go through the connection guard, wait one poll interval and
    /// resume watching. Cancellation yields an [`ExitReason::Shutdown`] trigger so the caller still
    /// sells the position. The exit notification fires before this returns, ahead of the
    /// sell transaction.
    #[instrument(skip(self, position, cancel), fields(mint = %position.mint()))]
    pub async fn watch(&self, position: &Position, cancel: &CancellationToken) -> SniperResult<ExitTrigger> {
        info!(
            "Monitoring {} for take profit ({}x) or stop loss ({}x) from entry {}",
            position.mint(),
            self.policy.take_profit_multiplier,
            self.policy.stop_loss_multiplier,
            position.entry_price()
        );

        let mut polls: u32 = 0;
        let mut last_price: Option<f64> = None;

        let trigger = loop {
            if cancel.is_cancelled() {
                break ExitTrigger {
                    reason: ExitReason::Shutdown,
                    price: last_price,
                    polls,
                };
            }

            let price = match self.prices.token_price(position.mint()).await {
                Ok(price) => price,
                Err(e) => {
                    warn!("Connection error while monitoring: {:#}. Attempting to reconnect...", e);
                    self.guard.ensure_connected().await?;
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = tokio::time::sleep(self.poll_interval) => {}
                    }
                    continue;
                }
            };
            polls += 1;
            last_price = Some(price);

            if let Some(reason) = self.policy.evaluate(position.entry_price(), price) {
                break ExitTrigger {
                    reason,
                    price: Some(price),
                    polls,
                };
            }

            debug!("Poll {}: price {} within bounds", polls, price);
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        };

        let message = match trigger.reason {
            ExitReason::TakeProfit => format!("Take profit hit for {}", position.mint()),
            ExitReason::StopLoss => format!("Stop loss hit for {}", position.mint()),
            ExitReason::Shutdown => format!("Shutdown requested, selling {}", position.mint()),
        };
        info!(
            "Selling {} - {} (price: {:?}, poll {})",
            position.mint(),
            trigger.reason,
            trigger.price,
            trigger.polls
        );
        notify_quietly(self.notifier.as_ref(), &message, self.notify_timeout).await;
        Ok(trigger)
    }
}
