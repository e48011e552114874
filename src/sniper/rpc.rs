//! Solana RPC adapters: liveness probe and raw transaction submission.

use crate::sniper::collaborators::TransactionSubmitter;
use crate::sniper::config::Commitment;
use crate::sniper::connection_guard::HealthProbe;
use crate::sniper::types::{SignedTx, SubmitOptions};
use anyhow::{Context, Result};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use solana_transaction_status::UiTransactionEncoding;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

pub fn rpc_client(url: &str, timeout: Duration) -> Arc<RpcClient> {
    Arc::new(RpcClient::new_with_timeout_and_commitment(
        url.to_string(),
        timeout,
        CommitmentConfig::confirmed(),
    ))
}

/// Probes the endpoint with `getEpochInfo`.
pub struct RpcHealthProbe {
    client: Arc<RpcClient>,
}

impl RpcHealthProbe {
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HealthProbe for RpcHealthProbe {
    async fn probe(&self) -> Result<()> {
        let epoch = self
            .client
            .get_epoch_info()
            .await
            .context("getEpochInfo failed")?;
        debug!("RPC alive at epoch {} slot {}", epoch.epoch, epoch.absolute_slot);
        Ok(())
    }
}

/// Submits signed transactions with `sendTransaction`.
pub struct RpcSubmitter {
    client: Arc<RpcClient>,
}

impl RpcSubmitter {
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self { client }
    }

    /// Map submission options onto the RPC send config.
    pub fn send_config(options: SubmitOptions) -> RpcSendTransactionConfig {
        RpcSendTransactionConfig {
            skip_preflight: options.skip_preflight,
            preflight_commitment: Some(commitment_level(options.commitment)),
            encoding: Some(UiTransactionEncoding::Base64),
            ..RpcSendTransactionConfig::default()
        }
    }
}

#[async_trait]
impl TransactionSubmitter for RpcSubmitter {
    #[instrument(skip(self, tx))]
    async fn submit(&self, tx: &SignedTx, options: SubmitOptions) -> Result<String> {
        let signature = self
            .client
            .send_transaction_with_config(&tx.0, Self::send_config(options))
            .await
            .context("sendTransaction failed")?;
        Ok(signature.to_string())
    }
}

fn commitment_level(commitment: Commitment) -> CommitmentLevel {
    match commitment {
        Commitment::Processed => CommitmentLevel::Processed,
        Commitment::Confirmed => CommitmentLevel::Confirmed,
        Commitment::Finalized => CommitmentLevel::Finalized,
    }
}
