//! Error types for the trading core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SniperError {
    /// The connection guard ran out of reconnect attempts. Unrecoverable.
    #[error("Failed to reconnect after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error("Position already open for {mint}")]
    PositionConflict { mint: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl SniperError {
    /// Whether this error must terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SniperError::ReconnectExhausted { .. })
    }
}

pub type SniperResult<T> = Result<T, SniperError>;
