//! Trading configuration.
//!
//! All thresholds are read once at startup and never mutated afterwards. Values are
//! layered: built-in defaults, then an optional JSON file, then environment overrides.

use crate::sniper::error::{SniperError, SniperResult};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::Path;
use std::time::Duration;

/// Commitment level used when submitting transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl std::str::FromStr for Commitment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            other => Err(anyhow::anyhow!("Unknown commitment level: {}", other)),
        }
    }
}

/// Trade parameters for the whole process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SniperConfig {
    /// RPC endpoint used for liveness probing and submission
    pub rpc_url: String,
    /// Sell once price >= entry * take_profit_multiplier
    pub take_profit_multiplier: f64,
    /// Sell once price <= entry * stop_loss_multiplier
    pub stop_loss_multiplier: f64,
    /// Default buy size in SOL
    pub default_clip_sol: f64,
    /// Hard ceiling on a single buy in SOL
    pub max_trade_amount_sol: f64,
    /// Slippage tolerance as a fraction (0.02 = 2%)
    pub slippage_tolerance: f64,
    /// Candidates below this liquidity are skipped without running risk checks
    pub min_liquidity: f64,
    /// Maximum acceptable token tax, in percent
    pub max_tax_rate_percent: f64,
    /// Mint addresses the bot is permitted to trade
    pub allowed_pools: Vec<String>,
    /// Price poll interval while holding a position
    pub poll_interval_ms: u64,
    /// Pause between discovery cycles
    pub scan_interval_ms: u64,
    /// Reconnect attempts before giving up
    pub reconnect_max_attempts: u32,
    /// Delay between reconnect attempts
    pub reconnect_delay_ms: u64,
    /// Submit without preflight simulation
    pub skip_preflight: bool,
    pub commitment: Commitment,
    /// Upper bound on a single notification delivery
    pub notify_timeout_ms: u64,
    /// SQLite trade ledger location; no ledger when unset
    pub ledger_path: Option<String>,
}

impl Default for SniperConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            take_profit_multiplier: 2.0,
            stop_loss_multiplier: 0.7,
            default_clip_sol: 0.1,
            max_trade_amount_sol: 0.5,
            slippage_tolerance: 0.02,
            min_liquidity: 5000.0,
            max_tax_rate_percent: 10.0,
            allowed_pools: Vec::new(),
            poll_interval_ms: 5_000,
            scan_interval_ms: 10_000,
            reconnect_max_attempts: 10,
            reconnect_delay_ms: 5_000,
            skip_preflight: true,
            commitment: Commitment::Confirmed,
            notify_timeout_ms: 5_000,
            ledger_path: None,
        }
    }
}

impl SniperConfig {
    /// Load configuration: defaults, then the JSON file named by `SNIPER_CONFIG`
    /// (if set), then individual environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match env::var("SNIPER_CONFIG") {
            Ok(path) => Self::from_json_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file. Missing fields fall back to defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Apply `SNIPER_*` environment variables on top of the current values.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = env::var("SNIPER_RPC_URL") {
            self.rpc_url = url;
        }
        override_parsed("SNIPER_TAKE_PROFIT", &mut self.take_profit_multiplier)?;
        override_parsed("SNIPER_STOP_LOSS", &mut self.stop_loss_multiplier)?;
        override_parsed("SNIPER_CLIP_SOL", &mut self.default_clip_sol)?;
        override_parsed("SNIPER_MAX_TRADE_SOL", &mut self.max_trade_amount_sol)?;
        override_parsed("SNIPER_SLIPPAGE", &mut self.slippage_tolerance)?;
        override_parsed("SNIPER_MIN_LIQUIDITY", &mut self.min_liquidity)?;
        override_parsed("SNIPER_MAX_TAX", &mut self.max_tax_rate_percent)?;
        override_parsed("SNIPER_POLL_INTERVAL_MS", &mut self.poll_interval_ms)?;
        override_parsed("SNIPER_SCAN_INTERVAL_MS", &mut self.scan_interval_ms)?;
        override_parsed("SNIPER_RECONNECT_ATTEMPTS", &mut self.reconnect_max_attempts)?;
        override_parsed("SNIPER_RECONNECT_DELAY_MS", &mut self.reconnect_delay_ms)?;
        override_parsed("SNIPER_SKIP_PREFLIGHT", &mut self.skip_preflight)?;
        override_parsed("SNIPER_COMMITMENT", &mut self.commitment)?;
        if let Ok(pools) = env::var("SNIPER_ALLOWED_POOLS") {
            self.allowed_pools = parse_pool_list(&pools);
        }
        if let Ok(path) = env::var("SNIPER_LEDGER_PATH") {
            self.ledger_path = Some(path);
        }
        Ok(())
    }

    /// Reject parameter combinations that would make the exit policy meaningless.
    pub fn validate(&self) -> SniperResult<()> {
        if !(self.take_profit_multiplier > 1.0) {
            return Err(SniperError::Config(format!(
                "take_profit_multiplier must be > 1.0, got {}",
                self.take_profit_multiplier
            )));
        }
        if !(self.stop_loss_multiplier > 0.0 && self.stop_loss_multiplier < 1.0) {
            return Err(SniperError::Config(format!(
                "stop_loss_multiplier must be in (0, 1), got {}",
                self.stop_loss_multiplier
            )));
        }
        if !(self.trade_size_sol() > 0.0) {
            return Err(SniperError::Config(
                "default_clip_sol and max_trade_amount_sol must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.slippage_tolerance) {
            return Err(SniperError::Config(format!(
                "slippage_tolerance must be in [0, 1), got {}",
                self.slippage_tolerance
            )));
        }
        if self.reconnect_max_attempts == 0 {
            return Err(SniperError::Config(
                "reconnect_max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Size of a single buy: the default clip, capped by the configured ceiling.
    pub fn trade_size_sol(&self) -> f64 {
        self.default_clip_sol.min(self.max_trade_amount_sol)
    }

    pub fn allow_list(&self) -> HashSet<String> {
        self.allowed_pools.iter().cloned().collect()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_timeout_ms)
    }
}

fn override_parsed<T>(key: &str, target: &mut T) -> Result<()>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(raw) = env::var(key) {
        *target = raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {} ({})", key, raw, e))?;
    }
    Ok(())
}

fn parse_pool_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_trading_policy() {
        let config = SniperConfig::default();

        assert_eq!(config.take_profit_multiplier, 2.0);
        assert_eq!(config.stop_loss_multiplier, 0.7);
        assert_eq!(config.max_trade_amount_sol, 0.5);
        assert_eq!(config.slippage_tolerance, 0.02);
        assert_eq!(config.min_liquidity, 5000.0);
        assert_eq!(config.max_tax_rate_percent, 10.0);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.reconnect_max_attempts, 10);
        assert_eq!(config.reconnect_delay(), Duration::from_secs(5));
        assert!(config.skip_preflight);
        assert_eq!(config.commitment, Commitment::Confirmed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_trade_size_is_capped() {
        let mut config = SniperConfig::default();
        assert_eq!(config.trade_size_sol(), 0.1);

        config.max_trade_amount_sol = 0.05;
        assert_eq!(config.trade_size_sol(), 0.05);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config = SniperConfig::from_json_str(
            r#"{ "take_profit_multiplier": 3.0, "allowed_pools": ["MintA", "MintB"], "commitment": "finalized" }"#,
        )
        .unwrap();

        assert_eq!(config.take_profit_multiplier, 3.0);
        assert_eq!(config.stop_loss_multiplier, 0.7);
        assert_eq!(config.commitment, Commitment::Finalized);
        assert!(config.allow_list().contains("MintB"));
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let mut config = SniperConfig::default();
        config.take_profit_multiplier = 0.9;
        assert!(matches!(config.validate(), Err(SniperError::Config(_))));

        let mut config = SniperConfig::default();
        config.stop_loss_multiplier = 1.2;
        assert!(config.validate().is_err());

        let mut config = SniperConfig::default();
        config.reconnect_max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = SniperConfig::default();
        config.slippage_tolerance = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pool_list_parsing() {
        assert_eq!(
            parse_pool_list(" MintA, ,MintB ,"),
            vec!["MintA".to_string(), "MintB".to_string()]
        );
    }

    #[test]
    fn test_commitment_from_str() {
        assert_eq!("Confirmed".parse::<Commitment>().unwrap(), Commitment::Confirmed);
        assert!("instant".parse::<Commitment>().is_err());
    }
}
