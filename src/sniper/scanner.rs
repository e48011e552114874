//! Candidate scanner - one discovery pass per controller cycle.

use crate::sniper::collaborators::PoolDiscovery;
use crate::types::Candidate;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Turns fresh pool listings into allow-listed candidates.
pub struct CandidateScanner {
    discovery: Arc<dyn PoolDiscovery>,
    allow_list: HashSet<String>,
}

impl CandidateScanner {
    pub fn new(discovery: Arc<dyn PoolDiscovery>, allow_list: HashSet<String>) -> Self {
        Self {
            discovery,
            allow_list,
        }
    }

    /// Run one discovery round trip.
    ///
    /// Pools outside the allow-list and tokens without metadata are dropped with a log
    /// line. Any network failure fails the whole pass.
    #[instrument(skip(self))]
    pub async fn scan(&self) -> Result<Vec<Candidate>> {
        info!("Scanning for new tokens...");
        let pools = self
            .discovery
            .list_new_pools()
            .await
            .context("Failed to list new pools")?;

        let mut candidates = Vec::new();
        for pool in pools {
            if !self.allow_list.contains(&pool.token_mint_address) {
                info!("Skipping {} - Not in whitelist.", pool.symbol);
                continue;
            }

            let token_info = self
                .discovery
                .token_info(&pool.token_mint_address)
                .await
                .with_context(|| format!("Failed to fetch token info for {}", pool.token_mint_address))?;

            match token_info {
                Some(info) => candidates.push(Candidate {
                    mint: pool.token_mint_address,
                    symbol: pool.symbol,
                    liquidity: info.liquidity,
                }),
                None => info!("Skipping {} - No token info available.", pool.symbol),
            }
        }

        debug!("Scan produced {} candidate(s)", candidates.len());
        Ok(candidates)
    }

    pub fn allow_list(&self) -> &HashSet<String> {
        &self.allow_list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PoolInfo, TokenInfo};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticDiscovery {
        pools: Vec<PoolInfo>,
        missing_info: HashSet<String>,
        list_calls: AtomicUsize,
    }

    #[async_trait]
    impl PoolDiscovery for StaticDiscovery {
        async fn list_new_pools(&self) -> Result<Vec<PoolInfo>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.pools.clone())
        }

        async fn token_info(&self, mint: &str) -> Result<Option<TokenInfo>> {
            if self.missing_info.contains(mint) {
                return Ok(None);
            }
            Ok(Some(TokenInfo {
                mint: mint.to_string(),
                liquidity: 7_500.0,
                decimals: Some(9),
            }))
        }
    }

    fn pool(mint: &str) -> PoolInfo {
        PoolInfo {
            token_mint_address: mint.to_string(),
            symbol: format!("{}-SYM", mint),
            pool_address: None,
        }
    }

    fn allow(mints: &[&str]) -> HashSet<String> {
        mints.iter().map(|m| m.to_string()).collect()
    }

    #[tokio::test]
    async fn test_allow_list_is_exhaustive() {
        let discovery = Arc::new(StaticDiscovery {
            pools: vec![pool("A"), pool("B"), pool("C"), pool("D")],
            missing_info: HashSet::new(),
            list_calls: AtomicUsize::new(0),
        });
        let scanner = CandidateScanner::new(discovery, allow(&["A", "C", "Z"]));

        let candidates = scanner.scan().await.unwrap();
        let mints: Vec<_> = candidates.iter().map(|c| c.mint.as_str()).collect();

        assert_eq!(mints, vec!["A", "C"]);
        assert!(candidates.iter().all(|c| scanner.allow_list().contains(&c.mint)));
        assert_eq!(candidates[0].liquidity, 7_500.0);
    }

    #[tokio::test]
    async fn test_empty_allow_list_yields_nothing() {
        let discovery = Arc::new(StaticDiscovery {
            pools: vec![pool("A"), pool("B")],
            missing_info: HashSet::new(),
            list_calls: AtomicUsize::new(0),
        });
        let scanner = CandidateScanner::new(discovery, HashSet::new());

        assert!(scanner.scan().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_token_info_is_dropped() {
        let discovery = Arc::new(StaticDiscovery {
            pools: vec![pool("A"), pool("B")],
            missing_info: allow(&["A"]),
            list_calls: AtomicUsize::new(0),
        });
        let scanner = CandidateScanner::new(discovery, allow(&["A", "B"]));

        let candidates = scanner.scan().await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].mint, "B");
    }

    #[tokio::test]
    async fn test_every_scan_is_a_fresh_round_trip() {
        let discovery = Arc::new(StaticDiscovery {
            pools: vec![pool("A")],
            missing_info: HashSet::new(),
            list_calls: AtomicUsize::new(0),
        });
        let scanner = CandidateScanner::new(discovery.clone(), allow(&["A"]));

        scanner.scan().await.unwrap();
        scanner.scan().await.unwrap();
        assert_eq!(discovery.list_calls.load(Ordering::SeqCst), 2);
    }
}
