//! Connection guard for RPC session liveness.
//!
//! Every network-facing step in the trading core calls [`ConnectionGuard::ensure_connected`]
//! after a failure. The guard only restores connectivity; retrying the failed business
//! operation is the caller's job. When the reconnect budget is exhausted the guard returns
//! [`SniperError::ReconnectExhausted`], which the binary turns into a non-zero exit: there is
//! no safe way to keep trading on stale data.

use crate::sniper::config::SniperConfig;
use crate::sniper::error::{SniperError, SniperResult};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Lightweight round-trip against the network endpoint.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self) -> Result<()>;
}

/// Session state as seen by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Last probe succeeded
    Connected,
    /// A caller reported a network failure; not yet probed
    Degraded,
    /// Reconnect loop in progress
    Reconnecting,
}

#[derive(Debug)]
struct GuardState {
    state: ConnectionState,
    /// Attempts made by the reconnect loop currently running (0 when idle)
    attempts: u32,
    /// Successful reconnects over the process lifetime
    reconnects: u64,
}

/// Guards RPC connectivity with a bounded, fixed-delay reconnect loop.
pub struct ConnectionGuard {
    probe: Arc<dyn HealthProbe>,
    max_attempts: u32,
    retry_delay: Duration,
    inner: Mutex<GuardState>,
}

impl ConnectionGuard {
    /// Create a new guard with an explicit retry budget.
    pub fn new(probe: Arc<dyn HealthProbe>, max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            probe,
            max_attempts,
            retry_delay,
            inner: Mutex::new(GuardState {
                state: ConnectionState::Connected,
                attempts: 0,
                reconnects: 0,
            }),
        }
    }

    pub fn from_config(probe: Arc<dyn HealthProbe>, config: &SniperConfig) -> Self {
        Self::new(probe, config.reconnect_max_attempts, config.reconnect_delay())
    }

    /// Single health probe. Updates the session state.
    #[instrument(skip(self))]
    pub async fn probe(&self) -> bool {
        match self.probe.probe().await {
            Ok(()) => {
                self.lock().state = ConnectionState::Connected;
                true
            }
            Err(e) => {
                warn!("Health probe failed: {:#}", e);
                self.lock().state = ConnectionState::Degraded;
                false
            }
        }
    }

    /// Block until the endpoint answers a probe, or the retry budget runs out.
    ///
    /// A probe that fails `n` times before succeeding costs `n + 1` probe calls and `n`
    /// sleeps of the configured delay.
    #[instrument(skip(self))]
    pub async fn ensure_connected(&self) -> SniperResult<()> {
        info!("Attempting to reconnect...");
        self.lock().state = ConnectionState::Reconnecting;

        for attempt in 1..=self.max_attempts {
            self.lock().attempts = attempt;

            match self.probe.probe().await {
                Ok(()) => {
                    let mut inner = self.lock();
                    inner.state = ConnectionState::Connected;
                    inner.attempts = 0;
                    inner.reconnects += 1;
                    info!("Reconnected successfully after {} attempt(s)", attempt);
                    return Ok(());
                }
                Err(e) => {
                    if attempt < self.max_attempts {
                        warn!(
                            "Reconnect attempt {} failed: {:#}. Retrying in {:?}...",
                            attempt, e, self.retry_delay
                        );
                        tokio::time::sleep(self.retry_delay).await;
                    } else {
                        warn!("Reconnect attempt {} failed: {:#}", attempt, e);
                    }
                }
            }
        }

        self.lock().state = ConnectionState::Degraded;
        error!("Failed to reconnect after {} attempts", self.max_attempts);
        Err(SniperError::ReconnectExhausted {
            attempts: self.max_attempts,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    /// Attempts made by the reconnect loop in progress; 0 when idle.
    pub fn current_attempts(&self) -> u32 {
        self.lock().attempts
    }

    pub fn reconnect_count(&self) -> u64 {
        self.lock().reconnects
    }

    fn lock(&self) -> MutexGuard<'_, GuardState> {
        // State is plain data; a poisoned lock still holds a usable value.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` probes, then succeeds.
    struct FlakyProbe {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyProbe {
        fn new(failures: u32) -> Arc<Self> {
            Arc::new(Self {
                failures,
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HealthProbe for FlakyProbe {
        async fn probe(&self) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(anyhow::anyhow!("connection refused"))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_after_failures() {
        let probe = FlakyProbe::new(3);
        let guard = ConnectionGuard::new(probe.clone(), 10, Duration::from_secs(5));

        let started = tokio::time::Instant::now();
        guard.ensure_connected().await.unwrap();

        assert_eq!(probe.calls(), 4);
        assert_eq!(started.elapsed(), Duration::from_secs(15));
        assert_eq!(guard.state(), ConnectionState::Connected);
        assert_eq!(guard.current_attempts(), 0);
        assert_eq!(guard.reconnect_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_does_not_sleep() {
        let probe = FlakyProbe::new(0);
        let guard = ConnectionGuard::new(probe.clone(), 10, Duration::from_secs(5));

        let started = tokio::time::Instant::now();
        guard.ensure_connected().await.unwrap();

        assert_eq!(probe.calls(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_attempt_within_budget_succeeds() {
        let probe = FlakyProbe::new(9);
        let guard = ConnectionGuard::new(probe.clone(), 10, Duration::from_secs(5));

        guard.ensure_connected().await.unwrap();
        assert_eq!(probe.calls(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhaustion_is_fatal() {
        let probe = FlakyProbe::new(u32::MAX);
        let guard = ConnectionGuard::new(probe.clone(), 10, Duration::from_secs(5));

        let err = guard.ensure_connected().await.unwrap_err();

        assert!(err.is_fatal());
        assert!(matches!(err, SniperError::ReconnectExhausted { attempts: 10 }));
        assert_eq!(probe.calls(), 10);
        assert_eq!(guard.state(), ConnectionState::Degraded);
    }

    #[tokio::test]
    async fn test_probe_updates_state() {
        let probe = FlakyProbe::new(1);
        let guard = ConnectionGuard::new(probe, 3, Duration::ZERO);

        assert!(!guard.probe().await);
        assert_eq!(guard.state(), ConnectionState::Degraded);
        assert!(guard.probe().await);
        assert_eq!(guard.state(), ConnectionState::Connected);
    }
}
