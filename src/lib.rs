//! raydium-sniper - automated Raydium listing sniper for Solana
//!
//! This crate discovers newly listed tokens, screens them against a set of risk checks,
//! buys approved tokens and sells them on take-profit, stop-loss or operator shutdown,
//! reconnecting to the RPC endpoint whenever a network step fails.

pub mod types;
pub mod sniper;

// Re-export main types for convenience
pub use types::{Candidate, PoolInfo, TokenInfo};
