//! Data types flowing through the trade lifecycle.

use crate::sniper::config::Commitment;
use crate::types::Pubkey;
use serde::{Deserialize, Serialize};
use solana_sdk::transaction::Transaction;
use std::fmt;

/// Combined result of the five external risk checks for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskVerdict {
    pub honeypot: bool,
    pub whale_risk: bool,
    pub tax_rate_percent: f64,
    pub dev_risk: bool,
    pub low_volume: bool,
}

impl RiskVerdict {
    /// Names of the gates that fired. Empty means the candidate is clean.
    pub fn failed_checks(&self, max_tax_rate_percent: f64) -> Vec<&'static str> {
        let mut failed = Vec::new();
        if self.honeypot {
            failed.push("honeypot");
        }
        if self.whale_risk {
            failed.push("whale");
        }
        if self.tax_rate_percent > max_tax_rate_percent {
            failed.push("tax");
        }
        if self.dev_risk {
            failed.push("dev_history");
        }
        if self.low_volume {
            failed.push("low_volume");
        }
        failed
    }

    pub fn is_clean(&self, max_tax_rate_percent: f64) -> bool {
        self.failed_checks(max_tax_rate_percent).is_empty()
    }
}

/// Outcome of screening a single candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenDecision {
    Approved(RiskVerdict),
    Rejected(RiskVerdict),
    /// Liquidity below the floor; no risk check was run.
    Skipped { liquidity: f64, floor: f64 },
}

impl ScreenDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, ScreenDecision::Approved(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionStatus {
    Open,
    Closed,
}

/// A held token with its frozen entry price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    mint: Pubkey,
    symbol: String,
    entry_price: f64,
    amount_sol: f64,
    entry_signature: String,
    opened_at: u64,
    status: PositionStatus,
}

impl Position {
    pub fn open(
        mint: impl Into<Pubkey>,
        symbol: impl Into<String>,
        entry_price: f64,
        amount_sol: f64,
        entry_signature: impl Into<String>,
    ) -> Self {
        Self {
            mint: mint.into(),
            symbol: symbol.into(),
            entry_price,
            amount_sol,
            entry_signature: entry_signature.into(),
            opened_at: chrono::Utc::now().timestamp_millis() as u64,
            status: PositionStatus::Open,
        }
    }

    pub fn mint(&self) -> &str {
        &self.mint
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    pub fn amount_sol(&self) -> f64 {
        self.amount_sol
    }

    pub fn entry_signature(&self) -> &str {
        &self.entry_signature
    }

    pub fn opened_at(&self) -> u64 {
        self.opened_at
    }

    pub fn status(&self) -> PositionStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Consumes the open position. Only the exit path calls this.
    pub(crate) fn close(mut self) -> Self {
        self.status = PositionStatus::Closed;
        self
    }
}

/// Why a position is being exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    /// Operator requested termination while the position was open
    Shutdown,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::TakeProfit => "TAKE_PROFIT",
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::Shutdown => "SHUTDOWN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TAKE_PROFIT" => Some(ExitReason::TakeProfit),
            "STOP_LOSS" => Some(ExitReason::StopLoss),
            "SHUTDOWN" => Some(ExitReason::Shutdown),
            _ => None,
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the monitor observed when it decided to exit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitTrigger {
    pub reason: ExitReason,
    /// Last observed price, if any poll succeeded
    pub price: Option<f64>,
    /// Number of successful price polls
    pub polls: u32,
}

/// Position monitor states.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MonitorState {
    Watching,
    Exiting(ExitTrigger),
    Done,
}

/// A position after its sell transaction was submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedPosition {
    pub position: Position,
    pub exit_signature: String,
    pub reason: ExitReason,
    pub exit_price: Option<f64>,
    pub closed_at: u64,
}

impl ClosedPosition {
    /// Price change relative to entry, in percent.
    pub fn pnl_percent(&self) -> Option<f64> {
        let entry = self.position.entry_price();
        match self.exit_price {
            Some(exit) if entry > 0.0 => Some((exit / entry - 1.0) * 100.0),
            _ => None,
        }
    }
}

/// How much of the held balance to sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SellAmount {
    /// The entire held balance. Partial fills are not tolerated.
    All,
}

/// Transaction built by the trading service, not yet signed.
#[derive(Debug, Clone, Default)]
pub struct UnsignedTx(pub Transaction);

/// Transaction signed by the wallet, ready for submission.
#[derive(Debug, Clone, Default)]
pub struct SignedTx(pub Transaction);

/// Submission options forwarded to the RPC layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOptions {
    pub skip_preflight: bool,
    pub commitment: Commitment,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            skip_preflight: true,
            commitment: Commitment::Confirmed,
        }
    }
}
