//! Sniper module - the trading core.
//!
//! Wires discovery, risk screening, entry, monitoring and exit into a single sequential
//! lifecycle guarded by an RPC reconnect loop. External services are reached through the
//! traits in [`collaborators`], so the core runs the same against the live network, the
//! paper-trading [`simulation`] or test mocks.

pub mod types;
pub mod config;
pub mod error;
pub mod collaborators;
pub mod connection_guard;
pub mod scanner;
pub mod screener;
pub mod execution;
pub mod monitor;
pub mod notifier;
pub mod ledger;
pub mod rpc;
pub mod simulation;
pub mod controller;

// Re-export main public types and the controller
pub use controller::{CandidateOutcome, PositionBook, RunStats, TradeLifecycleController};
pub use types::{
    ClosedPosition, ExitReason, ExitTrigger, MonitorState, Position, PositionStatus,
    RiskVerdict, ScreenDecision, SellAmount, SignedTx, SubmitOptions, UnsignedTx,
};
pub use config::{Commitment, SniperConfig};
pub use error::{SniperError, SniperResult};

// Re-export other key components for advanced usage
pub use collaborators::{
    PoolDiscovery, PriceFeed, RiskChecks, TradeBuilder, TransactionSubmitter, WalletSigner,
};
pub use connection_guard::{ConnectionGuard, ConnectionState, HealthProbe};
pub use scanner::CandidateScanner;
pub use screener::RiskScreener;
pub use execution::{ExecutionServices, PositionEntry, PositionExit};
pub use monitor::{ExitPolicy, PositionMonitor};
pub use notifier::{notify_quietly, LogNotifier, Notifier, TelegramNotifier};
pub use ledger::{SqliteTradeLedger, TradeLedger, TradeRecord};
pub use simulation::SimulatedMarket;

use std::sync::Arc;

/// External services the controller talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub probe: Arc<dyn HealthProbe>,
    pub discovery: Arc<dyn PoolDiscovery>,
    pub risk: Arc<dyn RiskChecks>,
    pub trader: Arc<dyn TradeBuilder>,
    pub signer: Arc<dyn WalletSigner>,
    pub submitter: Arc<dyn TransactionSubmitter>,
    pub prices: Arc<dyn PriceFeed>,
    pub notifier: Arc<dyn Notifier>,
}

impl Collaborators {
    /// Every trading service backed by one paper market; `probe` stays real.
    pub fn simulated(market: Arc<SimulatedMarket>, probe: Arc<dyn HealthProbe>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            probe,
            discovery: market.clone(),
            risk: market.clone(),
            trader: market.clone(),
            signer: market.clone(),
            submitter: market.clone(),
            prices: market,
            notifier,
        }
    }
}

/// Sniper builder for convenient construction with sensible defaults.
pub struct SniperBuilder {
    config: SniperConfig,
    ledger: Option<Arc<dyn TradeLedger>>,
}

impl SniperBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::from_config(SniperConfig::default())
    }

    /// Start from an already loaded configuration.
    pub fn from_config(config: SniperConfig) -> Self {
        Self { config, ledger: None }
    }

    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.config.rpc_url = url.into();
        self
    }

    /// Set take-profit and stop-loss multipliers.
    pub fn with_exit_multipliers(mut self, take_profit: f64, stop_loss: f64) -> Self {
        self.config.take_profit_multiplier = take_profit;
        self.config.stop_loss_multiplier = stop_loss;
        self
    }

    /// Set the default buy size and its ceiling, in SOL.
    pub fn with_trade_size(mut self, clip_sol: f64, max_sol: f64) -> Self {
        self.config.default_clip_sol = clip_sol;
        self.config.max_trade_amount_sol = max_sol;
        self
    }

    pub fn with_slippage(mut self, slippage: f64) -> Self {
        self.config.slippage_tolerance = slippage;
        self
    }

    /// Set the liquidity floor and the tax ceiling used by screening.
    pub fn with_risk_limits(mut self, min_liquidity: f64, max_tax_rate_percent: f64) -> Self {
        self.config.min_liquidity = min_liquidity;
        self.config.max_tax_rate_percent = max_tax_rate_percent;
        self
    }

    pub fn with_allowed_pools<I, S>(mut self, pools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_pools = pools.into_iter().map(Into::into).collect();
        self
    }

    /// Set price poll and discovery scan intervals.
    pub fn with_intervals(mut self, poll_ms: u64, scan_ms: u64) -> Self {
        self.config.poll_interval_ms = poll_ms;
        self.config.scan_interval_ms = scan_ms;
        self
    }

    /// Set the reconnect budget.
    pub fn with_reconnect(mut self, max_attempts: u32, delay_ms: u64) -> Self {
        self.config.reconnect_max_attempts = max_attempts;
        self.config.reconnect_delay_ms = delay_ms;
        self
    }

    pub fn with_submission(mut self, skip_preflight: bool, commitment: Commitment) -> Self {
        self.config.skip_preflight = skip_preflight;
        self.config.commitment = commitment;
        self
    }

    /// Attach a trade ledger.
    pub fn with_ledger(mut self, ledger: Arc<dyn TradeLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Build the sniper configuration.
    pub fn build_config(self) -> SniperConfig {
        self.config
    }

    /// Validate the configuration and wire the controller.
    pub fn build(self, services: Collaborators) -> SniperResult<TradeLifecycleController> {
        self.config.validate()?;
        let config = Arc::new(self.config);

        let guard = Arc::new(ConnectionGuard::from_config(services.probe, &config));
        let execution = ExecutionServices {
            trader: services.trader,
            signer: services.signer,
            submitter: services.submitter,
            notifier: services.notifier.clone(),
            notify_timeout: config.notify_timeout(),
        };

        let scanner = CandidateScanner::new(services.discovery, config.allow_list());
        let screener = RiskScreener::from_config(services.risk, &config);
        let entry = PositionEntry::new(execution.clone(), services.prices.clone(), guard.clone(), &config);
        let monitor = PositionMonitor::new(services.prices, guard.clone(), services.notifier, &config);
        let exit = PositionExit::new(execution, guard.clone(), &config);

        Ok(TradeLifecycleController::new(
            config,
            guard,
            scanner,
            screener,
            entry,
            monitor,
            exit,
            self.ledger,
        ))
    }
}

impl Default for SniperBuilder {
    fn default() -> Self {
        Self::new()
    }
}
