//! Risk screener - liquidity floor plus the five external risk checks.

use crate::sniper::collaborators::RiskChecks;
use crate::sniper::config::SniperConfig;
use crate::sniper::types::{RiskVerdict, ScreenDecision};
use crate::types::Candidate;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, instrument};

pub struct RiskScreener {
    checks: Arc<dyn RiskChecks>,
    min_liquidity: f64,
    max_tax_rate_percent: f64,
}

impl RiskScreener {
    pub fn new(checks: Arc<dyn RiskChecks>, min_liquidity: f64, max_tax_rate_percent: f64) -> Self {
        Self {
            checks,
            min_liquidity,
            max_tax_rate_percent,
        }
    }

    pub fn from_config(checks: Arc<dyn RiskChecks>, config: &SniperConfig) -> Self {
        Self::new(checks, config.min_liquidity, config.max_tax_rate_percent)
    }

    /// Screen one candidate. Never cached: every call re-runs the checks.
    ///
    /// Below the liquidity floor no check is invoked. Above it all five run, even when
    /// one has already failed, so the rejection log carries the full picture.
    #[instrument(skip(self, candidate), fields(mint = %candidate.mint))]
    pub async fn screen(&self, candidate: &Candidate) -> Result<ScreenDecision> {
        if candidate.liquidity < self.min_liquidity {
            info!(
                "Skipping {} - Liquidity {:.2} below floor {:.2}",
                candidate.symbol, candidate.liquidity, self.min_liquidity
            );
            return Ok(ScreenDecision::Skipped {
                liquidity: candidate.liquidity,
                floor: self.min_liquidity,
            });
        }

        let verdict = self.run_checks(&candidate.mint).await?;
        let failed = verdict.failed_checks(self.max_tax_rate_percent);

        if failed.is_empty() {
            info!("{} passed risk screening (Tax: {}%)", candidate.symbol, verdict.tax_rate_percent);
            Ok(ScreenDecision::Approved(verdict))
        } else {
            info!(
                "Skipping {} - Risk detected [{}] (Honeypot: {}, Whale: {}, Tax: {}%, Dev History: {}, Low Volume: {})",
                candidate.symbol,
                failed.join(", "),
                verdict.honeypot,
                verdict.whale_risk,
                verdict.tax_rate_percent,
                verdict.dev_risk,
                verdict.low_volume
            );
            Ok(ScreenDecision::Rejected(verdict))
        }
    }

    async fn run_checks(&self, mint: &str) -> Result<RiskVerdict> {
        // join! rather than try_join! so every check runs to completion
        let (honeypot, whale_risk, tax_rate, dev_risk, low_volume) = tokio::join!(
            self.checks.honeypot(mint),
            self.checks.whale_risk(mint),
            self.checks.tax_rate(mint),
            self.checks.developer_history(mint),
            self.checks.volume_and_holders(mint),
        );

        Ok(RiskVerdict {
            honeypot: honeypot.context("Honeypot check failed")?,
            whale_risk: whale_risk.context("Whale check failed")?,
            tax_rate_percent: tax_rate.context("Tax rate check failed")?,
            dev_risk: dev_risk.context("Developer history check failed")?,
            low_volume: low_volume.context("Volume/holder check failed")?,
        })
    }
}
