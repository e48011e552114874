//! Core types shared between discovery and the trading core.

use serde::{Deserialize, Serialize};

/// A simple public key representation (base58 string, as returned by discovery services)
pub type Pubkey = String;

/// A freshly listed pool as reported by the discovery service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolInfo {
    /// The mint address of the listed token
    pub token_mint_address: Pubkey,
    /// The token symbol for display
    pub symbol: String,
    /// The pool account address, if known
    pub pool_address: Option<Pubkey>,
}

/// Token metadata returned by the discovery service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    pub mint: Pubkey,
    /// Pool liquidity in quote units
    pub liquidity: f64,
    pub decimals: Option<u8>,
}

/// A newly discovered token pending risk screening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// The mint address of the token
    pub mint: Pubkey,
    /// Display symbol
    pub symbol: String,
    /// Pool liquidity in quote units
    pub liquidity: f64,
}

impl Candidate {
    pub fn new(mint: impl Into<Pubkey>, symbol: impl Into<String>, liquidity: f64) -> Self {
        Self {
            mint: mint.into(),
            symbol: symbol.into(),
            liquidity,
        }
    }
}
