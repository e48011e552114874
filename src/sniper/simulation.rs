//! Paper-trading market.
//!
//! Stands in for discovery, risk, trading, signing, submission and price services so the
//! full lifecycle can run without touching real funds. Prices follow a random walk.

use crate::sniper::collaborators::{
    PoolDiscovery, PriceFeed, RiskChecks, TradeBuilder, TransactionSubmitter, WalletSigner,
};
use crate::sniper::types::{SellAmount, SignedTx, SubmitOptions, UnsignedTx};
use crate::types::{PoolInfo, TokenInfo};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Simulated venue backing every trading collaborator.
pub struct SimulatedMarket {
    listings: Vec<String>,
    prices: Mutex<HashMap<String, f64>>,
    /// Per-poll volatility of the random walk, as a fraction
    volatility: f64,
    submissions: Mutex<u64>,
}

impl SimulatedMarket {
    /// A market that lists `mints` on every discovery pass.
    pub fn new(mints: Vec<String>, volatility: f64) -> Self {
        Self {
            listings: mints,
            prices: Mutex::new(HashMap::new()),
            volatility,
            submissions: Mutex::new(0),
        }
    }

    fn next_price(&self, mint: &str) -> Result<f64> {
        let mut prices = self
            .prices
            .lock()
            .map_err(|_| anyhow!("price table lock poisoned"))?;
        let mut rng = rand::thread_rng();
        let price = prices
            .entry(mint.to_string())
            .or_insert_with(|| rng.gen_range(0.000_01..0.001));
        let step = if self.volatility > 0.0 {
            rng.gen_range(-self.volatility..self.volatility)
        } else {
            0.0
        };
        *price = (*price * (1.0 + step)).max(f64::MIN_POSITIVE);
        Ok(*price)
    }
}

#[async_trait]
impl PoolDiscovery for SimulatedMarket {
    async fn list_new_pools(&self) -> Result<Vec<PoolInfo>> {
        Ok(self
            .listings
            .iter()
            .map(|mint| PoolInfo {
                token_mint_address: mint.clone(),
                symbol: mint.chars().take(4).collect::<String>().to_uppercase(),
                pool_address: None,
            })
            .collect())
    }

    async fn token_info(&self, mint: &str) -> Result<Option<TokenInfo>> {
        let liquidity = rand::thread_rng().gen_range(1_000.0..20_000.0);
        Ok(Some(TokenInfo {
            mint: mint.to_string(),
            liquidity,
            decimals: Some(9),
        }))
    }
}

#[async_trait]
impl RiskChecks for SimulatedMarket {
    async fn honeypot(&self, _mint: &str) -> Result<bool> {
        Ok(rand::thread_rng().gen_bool(0.1))
    }

    async fn whale_risk(&self, _mint: &str) -> Result<bool> {
        Ok(rand::thread_rng().gen_bool(0.15))
    }

    async fn tax_rate(&self, _mint: &str) -> Result<f64> {
        Ok(rand::thread_rng().gen_range(0.0..15.0))
    }

    async fn developer_history(&self, _mint: &str) -> Result<bool> {
        Ok(rand::thread_rng().gen_bool(0.1))
    }

    async fn volume_and_holders(&self, _mint: &str) -> Result<bool> {
        Ok(rand::thread_rng().gen_bool(0.2))
    }
}

#[async_trait]
impl TradeBuilder for SimulatedMarket {
    async fn build_buy(&self, mint: &str, amount_sol: f64, slippage: f64) -> Result<UnsignedTx> {
        debug!("Simulated buy of {} for {} SOL ({}% slippage)", mint, amount_sol, slippage * 100.0);
        Ok(UnsignedTx::default())
    }

    async fn build_sell(&self, mint: &str, amount: SellAmount) -> Result<UnsignedTx> {
        debug!("Simulated sell of {:?} {}", amount, mint);
        Ok(UnsignedTx::default())
    }
}

#[async_trait]
impl WalletSigner for SimulatedMarket {
    async fn sign(&self, tx: UnsignedTx) -> Result<SignedTx> {
        Ok(SignedTx(tx.0))
    }
}

#[async_trait]
impl TransactionSubmitter for SimulatedMarket {
    async fn submit(&self, _tx: &SignedTx, options: SubmitOptions) -> Result<String> {
        let mut count = self
            .submissions
            .lock()
            .map_err(|_| anyhow!("submission counter lock poisoned"))?;
        *count += 1;
        debug!("Simulated submission #{} ({:?})", *count, options);
        Ok(format!("PaperTx{}_{}", *count, chrono::Utc::now().timestamp_millis()))
    }
}

#[async_trait]
impl PriceFeed for SimulatedMarket {
    async fn token_price(&self, mint: &str) -> Result<f64> {
        self.next_price(mint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lists_configured_mints() {
        let market = SimulatedMarket::new(vec!["MintAlpha".to_string(), "MintBeta".to_string()], 0.1);
        let pools = market.list_new_pools().await.unwrap();

        assert_eq!(pools.len(), 2);
        assert_eq!(pools[0].token_mint_address, "MintAlpha");
        assert_eq!(pools[0].symbol, "MINT");
    }

    #[tokio::test]
    async fn test_random_walk_stays_positive() {
        let market = SimulatedMarket::new(vec![], 0.5);
        for _ in 0..200 {
            assert!(market.token_price("Mint").await.unwrap() > 0.0);
        }
    }

    #[tokio::test]
    async fn test_submissions_get_unique_signatures() {
        let market = SimulatedMarket::new(vec![], 0.1);
        let a = market.submit(&SignedTx::default(), SubmitOptions::default()).await.unwrap();
        let b = market.submit(&SignedTx::default(), SubmitOptions::default()).await.unwrap();
        assert_ne!(a, b);
    }
}
