//! Shared mocks for integration tests.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use raydium_sniper::sniper::{
    Collaborators, HealthProbe, Notifier, PoolDiscovery, PriceFeed, RiskChecks, SellAmount,
    SignedTx, SubmitOptions, TradeBuilder, TransactionSubmitter, UnsignedTx, WalletSigner,
};
use raydium_sniper::{PoolInfo, TokenInfo};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Scripted venue backing every trading collaborator.
///
/// Failure counters fail the next `n` calls of their operation, then recover.
#[derive(Default)]
pub struct MockVenue {
    pub pools: Mutex<Vec<PoolInfo>>,
    pub liquidity: Mutex<HashMap<String, f64>>,
    pub tax_rate: Mutex<f64>,
    pub honeypot: Mutex<bool>,

    /// Prices served in order; `None` is a network failure. The last price repeats.
    pub prices: Mutex<VecDeque<Option<f64>>>,
    last_price: Mutex<Option<f64>>,

    pub scan_failures: AtomicU32,
    pub screen_failures: AtomicU32,
    pub buy_failures: AtomicU32,
    pub submit_failures: AtomicU32,

    pub scan_calls: AtomicU32,
    pub honeypot_calls: AtomicU32,
    pub buy_builds: AtomicU32,
    pub sell_builds: AtomicU32,
    pub submissions: AtomicU32,
    pub price_calls: AtomicU32,

    pub buy_requests: Mutex<Vec<(String, f64, f64)>>,
    pub submit_options: Mutex<Vec<SubmitOptions>>,
}

impl MockVenue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn list(&self, mint: &str, symbol: &str, liquidity: f64) {
        self.pools.lock().unwrap().push(PoolInfo {
            token_mint_address: mint.to_string(),
            symbol: symbol.to_string(),
            pool_address: None,
        });
        self.liquidity.lock().unwrap().insert(mint.to_string(), liquidity);
    }

    pub fn script_prices(&self, prices: &[Option<f64>]) {
        self.prices.lock().unwrap().extend(prices.iter().copied());
    }

    pub fn set_tax_rate(&self, tax: f64) {
        *self.tax_rate.lock().unwrap() = tax;
    }

    pub fn set_honeypot(&self, honeypot: bool) {
        *self.honeypot.lock().unwrap() = honeypot;
    }

    pub fn count(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::SeqCst)
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl PoolDiscovery for MockVenue {
    async fn list_new_pools(&self) -> Result<Vec<PoolInfo>> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.scan_failures) {
            return Err(anyhow!("pool listing: connection reset"));
        }
        Ok(self.pools.lock().unwrap().clone())
    }

    async fn token_info(&self, mint: &str) -> Result<Option<TokenInfo>> {
        Ok(self.liquidity.lock().unwrap().get(mint).map(|liquidity| TokenInfo {
            mint: mint.to_string(),
            liquidity: *liquidity,
            decimals: Some(9),
        }))
    }
}

#[async_trait]
impl RiskChecks for MockVenue {
    async fn honeypot(&self, _mint: &str) -> Result<bool> {
        self.honeypot_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.screen_failures) {
            return Err(anyhow!("honeypot check: timeout"));
        }
        Ok(*self.honeypot.lock().unwrap())
    }

    async fn whale_risk(&self, _mint: &str) -> Result<bool> {
        Ok(false)
    }

    async fn tax_rate(&self, _mint: &str) -> Result<f64> {
        Ok(*self.tax_rate.lock().unwrap())
    }

    async fn developer_history(&self, _mint: &str) -> Result<bool> {
        Ok(false)
    }

    async fn volume_and_holders(&self, _mint: &str) -> Result<bool> {
        Ok(false)
    }
}

#[async_trait]
impl TradeBuilder for MockVenue {
    async fn build_buy(&self, mint: &str, amount_sol: f64, slippage: f64) -> Result<UnsignedTx> {
        self.buy_builds.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.buy_failures) {
            return Err(anyhow!("quote service unavailable"));
        }
        self.buy_requests
            .lock()
            .unwrap()
            .push((mint.to_string(), amount_sol, slippage));
        Ok(UnsignedTx::default())
    }

    async fn build_sell(&self, _mint: &str, amount: SellAmount) -> Result<UnsignedTx> {
        assert_eq!(amount, SellAmount::All);
        self.sell_builds.fetch_add(1, Ordering::SeqCst);
        Ok(UnsignedTx::default())
    }
}

#[async_trait]
impl WalletSigner for MockVenue {
    async fn sign(&self, tx: UnsignedTx) -> Result<SignedTx> {
        Ok(SignedTx(tx.0))
    }
}

#[async_trait]
impl TransactionSubmitter for MockVenue {
    async fn submit(&self, _tx: &SignedTx, options: SubmitOptions) -> Result<String> {
        if Self::take_failure(&self.submit_failures) {
            return Err(anyhow!("sendTransaction: connection reset"));
        }
        let n = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;
        self.submit_options.lock().unwrap().push(options);
        Ok(format!("Sig{}", n))
    }
}

#[async_trait]
impl PriceFeed for MockVenue {
    async fn token_price(&self, _mint: &str) -> Result<f64> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.prices.lock().unwrap().pop_front();
        match next {
            Some(Some(price)) => {
                *self.last_price.lock().unwrap() = Some(price);
                Ok(price)
            }
            Some(None) => Err(anyhow!("getTokenPrice: connection reset")),
            None => self
                .last_price
                .lock()
                .unwrap()
                .ok_or_else(|| anyhow!("no price scripted")),
        }
    }
}

/// Health probe that fails the next `n` probes.
#[derive(Default)]
pub struct MockProbe {
    pub failures: AtomicU32,
    pub calls: AtomicU32,
}

impl MockProbe {
    pub fn healthy() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(failures: u32) -> Arc<Self> {
        Arc::new(Self {
            failures: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthProbe for MockProbe {
    async fn probe(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if MockVenue::take_failure(&self.failures) {
            return Err(anyhow!("connection refused"));
        }
        Ok(())
    }
}

/// Records every notification.
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn count_starting_with(&self, prefix: &str) -> usize {
        self.messages().iter().filter(|m| m.starts_with(prefix)).count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

/// Wire a venue, probe and notifier into a collaborator set.
pub fn collaborators(
    venue: &Arc<MockVenue>,
    probe: &Arc<MockProbe>,
    notifier: &Arc<RecordingNotifier>,
) -> Collaborators {
    Collaborators {
        probe: probe.clone(),
        discovery: venue.clone(),
        risk: venue.clone(),
        trader: venue.clone(),
        signer: venue.clone(),
        submitter: venue.clone(),
        prices: venue.clone(),
        notifier: notifier.clone(),
    }
}
