//! Contracts for the external services the trading core depends on.
//!
//! Discovery, risk heuristics, transaction construction, signing, submission and
//! price data are owned by other services. The core only sequences calls to them
//! and reacts to their failures.

use crate::sniper::types::{SellAmount, SignedTx, SubmitOptions, UnsignedTx};
use crate::types::{PoolInfo, TokenInfo};
use anyhow::Result;
use async_trait::async_trait;

/// New pool listings and token metadata.
#[async_trait]
pub trait PoolDiscovery: Send + Sync {
    async fn list_new_pools(&self) -> Result<Vec<PoolInfo>>;

    /// Returns `None` when the token is unknown to the metadata service.
    async fn token_info(&self, mint: &str) -> Result<Option<TokenInfo>>;
}

/// The five independent risk heuristics. Each handles its own timeout.
#[async_trait]
pub trait RiskChecks: Send + Sync {
    async fn honeypot(&self, mint: &str) -> Result<bool>;
    async fn whale_risk(&self, mint: &str) -> Result<bool>;
    /// Token transfer tax, in percent
    async fn tax_rate(&self, mint: &str) -> Result<f64>;
    async fn developer_history(&self, mint: &str) -> Result<bool>;
    /// True when volume or holder count is too low
    async fn volume_and_holders(&self, mint: &str) -> Result<bool>;
}

/// Builds swap transactions on the venue.
#[async_trait]
pub trait TradeBuilder: Send + Sync {
    async fn build_buy(&self, mint: &str, amount_sol: f64, slippage: f64) -> Result<UnsignedTx>;
    async fn build_sell(&self, mint: &str, amount: SellAmount) -> Result<UnsignedTx>;
}

/// Wallet approval step. May be slow or user-gated.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    async fn sign(&self, tx: UnsignedTx) -> Result<SignedTx>;
}

/// Sends a signed transaction to the network and returns its signature.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    async fn submit(&self, tx: &SignedTx, options: SubmitOptions) -> Result<String>;
}

/// Live token price, in SOL.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn token_price(&self, mint: &str) -> Result<f64>;
}
