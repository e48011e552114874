//! Trade lifecycle controller.
//!
//! Runs discovery cycles and walks each candidate through screen → enter → monitor → exit,
//! one candidate at a time. A candidate's full cycle, including the sell, completes before
//! the next candidate is looked at, so at most one position is ever open. [`PositionBook`]
//! enforces that explicitly.
//!
//! Retry policy at each boundary:
//! - scan: reconnect, wait one scan interval, then rescan, without limit
//! - screen / buy submission: reconnect, then retry once; a second failure drops the candidate
//! - fill price: reconnect and re-read without limit; a submitted buy is never resubmitted
//! - monitor / exit: reconnect and continue, without limit
//!
//! Only connection guard exhaustion ends a run with an error.

use crate::sniper::config::SniperConfig;
use crate::sniper::connection_guard::ConnectionGuard;
use crate::sniper::error::{SniperError, SniperResult};
use crate::sniper::execution::{PositionEntry, PositionExit};
use crate::sniper::ledger::TradeLedger;
use crate::sniper::monitor::PositionMonitor;
use crate::sniper::scanner::CandidateScanner;
use crate::sniper::screener::RiskScreener;
use crate::sniper::types::{ClosedPosition, ExitReason, MonitorState, Position, ScreenDecision};
use crate::types::Candidate;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Holds the single open position.
#[derive(Debug, Default)]
pub struct PositionBook {
    open: Option<Position>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new open position. Fails if any position is already open.
    pub fn open(&mut self, position: Position) -> SniperResult<()> {
        if let Some(existing) = &self.open {
            return Err(SniperError::PositionConflict {
                mint: existing.mint().to_string(),
            });
        }
        self.open = Some(position);
        Ok(())
    }

    pub fn is_open(&self, mint: &str) -> bool {
        self.open.as_ref().is_some_and(|p| p.mint() == mint)
    }

    pub fn current(&self) -> Option<&Position> {
        self.open.as_ref()
    }

    /// Remove and return the open position.
    pub fn take(&mut self) -> Option<Position> {
        self.open.take()
    }
}

/// Counters for one controller run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunStats {
    pub cycles: u64,
    pub candidates_seen: u64,
    pub skipped_low_liquidity: u64,
    pub rejected_risk: u64,
    pub dropped_errors: u64,
    pub entries: u64,
    pub take_profit_exits: u64,
    pub stop_loss_exits: u64,
    pub shutdown_exits: u64,
    pub reconnects: u64,
}

impl RunStats {
    fn record_exit(&mut self, reason: ExitReason) {
        match reason {
            ExitReason::TakeProfit => self.take_profit_exits += 1,
            ExitReason::StopLoss => self.stop_loss_exits += 1,
            ExitReason::Shutdown => self.shutdown_exits += 1,
        }
    }
}

/// What happened to one candidate.
#[derive(Debug, Clone)]
pub enum CandidateOutcome {
    Skipped,
    Rejected,
    /// A position for this mint is already open
    AlreadyHeld,
    /// Screening or buy submission failed twice
    Dropped,
    Traded(ClosedPosition),
}

pub struct TradeLifecycleController {
    config: Arc<SniperConfig>,
    guard: Arc<ConnectionGuard>,
    scanner: CandidateScanner,
    screener: RiskScreener,
    entry: PositionEntry,
    monitor: PositionMonitor,
    exit: PositionExit,
    ledger: Option<Arc<dyn TradeLedger>>,
    book: PositionBook,
    monitor_state: Option<MonitorState>,
    stats: RunStats,
}

impl TradeLifecycleController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<SniperConfig>,
        guard: Arc<ConnectionGuard>,
        scanner: CandidateScanner,
        screener: RiskScreener,
        entry: PositionEntry,
        monitor: PositionMonitor,
        exit: PositionExit,
        ledger: Option<Arc<dyn TradeLedger>>,
    ) -> Self {
        Self {
            config,
            guard,
            scanner,
            screener,
            entry,
            monitor,
            exit,
            ledger,
            book: PositionBook::new(),
            monitor_state: None,
            stats: RunStats::default(),
        }
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn open_position(&self) -> Option<&Position> {
        self.book.current()
    }

    /// State of the monitor for the current (or last) position.
    pub fn monitor_state(&self) -> Option<MonitorState> {
        self.monitor_state
    }

    /// Run discovery cycles until `cancel` fires or connectivity is lost for good.
    pub async fn run(&mut self, cancel: CancellationToken) -> SniperResult<RunStats> {
        info!(
            "Trade lifecycle controller starting ({} allow-listed pool(s))",
            self.scanner.allow_list().len()
        );
        self.warn_about_stale_trades().await;

        while !cancel.is_cancelled() {
            self.run_cycle(&cancel).await?;

            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(self.config.scan_interval()) => {}
            }
        }

        self.stats.reconnects = self.guard.reconnect_count();
        info!("Controller stopped: {:?}", self.stats);
        Ok(self.stats.clone())
    }

    /// One scan followed by sequential processing of every candidate it produced.
    #[instrument(skip(self, cancel), fields(cycle = self.stats.cycles + 1))]
    pub async fn run_cycle(&mut self, cancel: &CancellationToken) -> SniperResult<Vec<CandidateOutcome>> {
        self.stats.cycles += 1;
        let candidates = self.scan_until_success(cancel).await?;

        let mut outcomes = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if cancel.is_cancelled() {
                info!("Shutdown requested, abandoning remaining candidates");
                break;
            }
            outcomes.push(self.process_candidate(&candidate, cancel).await?);
        }

        self.stats.reconnects = self.guard.reconnect_count();
        Ok(outcomes)
    }

    async fn scan_until_success(&self, cancel: &CancellationToken) -> SniperResult<Vec<Candidate>> {
        loop {
            match self.scanner.scan().await {
                Ok(candidates) => return Ok(candidates),
                Err(e) => {
                    warn!("Connection error detected during scan: {:#}. Attempting to reconnect...", e);
                    self.guard.ensure_connected().await?;
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(Vec::new()),
                        _ = tokio::time::sleep(self.config.scan_interval()) => {}
                    }
                }
            }
        }
    }

    #[instrument(skip(self, candidate, cancel), fields(mint = %candidate.mint))]
    async fn process_candidate(
        &mut self,
        candidate: &Candidate,
        cancel: &CancellationToken,
    ) -> SniperResult<CandidateOutcome> {
        self.stats.candidates_seen += 1;

        if self.book.is_open(&candidate.mint) {
            warn!("Skipping {} - position already open", candidate.symbol);
            return Ok(CandidateOutcome::AlreadyHeld);
        }

        let decision = match self
            .retry_once_after_reconnect("screen", || self.screener.screen(candidate))
            .await?
        {
            Some(decision) => decision,
            None => {
                self.stats.dropped_errors += 1;
                return Ok(CandidateOutcome::Dropped);
            }
        };

        match decision {
            ScreenDecision::Skipped { .. } => {
                self.stats.skipped_low_liquidity += 1;
                return Ok(CandidateOutcome::Skipped);
            }
            ScreenDecision::Rejected(_) => {
                self.stats.rejected_risk += 1;
                return Ok(CandidateOutcome::Rejected);
            }
            ScreenDecision::Approved(_) => {}
        }

        let signature = match self
            .retry_once_after_reconnect("buy", || self.entry.submit_buy(candidate))
            .await?
        {
            Some(signature) => signature,
            None => {
                self.stats.dropped_errors += 1;
                return Ok(CandidateOutcome::Dropped);
            }
        };
        // the buy has landed; from here on the position must be held and sold
        let position = self.entry.confirm_fill(candidate, signature).await?;
        self.stats.entries += 1;

        if let Some(ledger) = &self.ledger {
            if let Err(e) = ledger.record_entry(&position).await {
                error!("Failed to record entry for {}: {:#}", position.mint(), e);
            }
        }

        self.book.open(position.clone())?;
        let closed = self.hold_until_exit(position, cancel).await?;
        Ok(CandidateOutcome::Traded(closed))
    }

    /// Monitor an open position and sell it. Clears the book once the sell lands.
    async fn hold_until_exit(&mut self, position: Position, cancel: &CancellationToken) -> SniperResult<ClosedPosition> {
        self.monitor_state = Some(MonitorState::Watching);
        let trigger = self.monitor.watch(&position, cancel).await?;
        self.monitor_state = Some(MonitorState::Exiting(trigger));

        let closed = self.exit.exit(position, trigger).await?;
        self.book.take();
        self.monitor_state = Some(MonitorState::Done);
        self.stats.record_exit(closed.reason);

        if let Some(pnl) = closed.pnl_percent() {
            info!("Closed {} with {:+.2}% ({})", closed.position.symbol(), pnl, closed.reason);
        }
        if let Some(ledger) = &self.ledger {
            if let Err(e) = ledger.record_exit(&closed).await {
                error!("Failed to record exit for {}: {:#}", closed.position.mint(), e);
            }
        }
        Ok(closed)
    }

    /// Run `op`; on failure reconnect and run it exactly once more.
    ///
    /// `Ok(None)` means both attempts failed. Only guard exhaustion is an error.
    async fn retry_once_after_reconnect<T, F, Fut>(&self, what: &str, mut op: F) -> SniperResult<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        match op().await {
            Ok(value) => return Ok(Some(value)),
            Err(e) => {
                warn!("Connection error during {}: {:#}. Attempting to reconnect...", what, e);
            }
        }

        self.guard.ensure_connected().await?;

        match op().await {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("{} failed again after reconnect, dropping candidate: {:#}", what, e);
                Ok(None)
            }
        }
    }

    async fn warn_about_stale_trades(&self) {
        let Some(ledger) = &self.ledger else {
            return;
        };
        match ledger.open_trades().await {
            Ok(trades) if !trades.is_empty() => {
                for trade in trades {
                    warn!(
                        "Ledger shows {} ({}) still OPEN from a previous run (entry {} at {})",
                        trade.symbol, trade.mint, trade.entry_signature, trade.entry_price
                    );
                }
            }
            Ok(_) => debug!("No stale open trades in ledger"),
            Err(e) => error!("Failed to read open trades from ledger: {:#}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_allows_a_single_position() {
        let mut book = PositionBook::new();
        book.open(Position::open("MintA", "AAA", 1.0, 0.1, "sig-a")).unwrap();

        assert!(book.is_open("MintA"));
        assert!(!book.is_open("MintB"));

        let err = book.open(Position::open("MintB", "BBB", 1.0, 0.1, "sig-b")).unwrap_err();
        assert!(matches!(err, SniperError::PositionConflict { ref mint } if mint == "MintA"));
    }

    #[test]
    fn test_book_rejects_duplicate_mint() {
        let mut book = PositionBook::new();
        book.open(Position::open("MintA", "AAA", 1.0, 0.1, "sig-1")).unwrap();
        assert!(book.open(Position::open("MintA", "AAA", 1.1, 0.1, "sig-2")).is_err());
        // the original baseline is untouched
        assert_eq!(book.current().unwrap().entry_price(), 1.0);
    }

    #[test]
    fn test_book_reopens_after_take() {
        let mut book = PositionBook::new();
        book.open(Position::open("MintA", "AAA", 1.0, 0.1, "sig-1")).unwrap();
        assert_eq!(book.take().unwrap().mint(), "MintA");
        assert!(book.current().is_none());
        assert!(book.open(Position::open("MintA", "AAA", 1.0, 0.1, "sig-2")).is_ok());
    }

    #[test]
    fn test_exit_counters() {
        let mut stats = RunStats::default();
        stats.record_exit(ExitReason::TakeProfit);
        stats.record_exit(ExitReason::StopLoss);
        stats.record_exit(ExitReason::StopLoss);
        assert_eq!(stats.take_profit_exits, 1);
        assert_eq!(stats.stop_loss_exits, 2);
        assert_eq!(stats.shutdown_exits, 0);
    }
}
