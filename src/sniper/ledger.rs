//! Trade ledger - persistent record of every entry and exit.
//!
//! The controller writes to the ledger on a best-effort basis; a ledger failure is logged
//! and never blocks a buy or a sell.

use crate::sniper::types::{ClosedPosition, ExitReason, Position, PositionStatus};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePoolOptions, FromRow, Pool, Sqlite};
use tracing::{debug, info};

/// Persistent trade journal.
#[async_trait]
pub trait TradeLedger: Send + Sync {
    /// Records a freshly opened position. Returns the record ID.
    async fn record_entry(&self, position: &Position) -> Result<i64>;

    /// Marks the open record for this position's entry signature as closed.
    async fn record_exit(&self, closed: &ClosedPosition) -> Result<()>;

    /// Trades that were opened but never closed (e.g. left behind by a crash).
    async fn open_trades(&self) -> Result<Vec<TradeRecord>>;

    /// Most recent trades, newest first.
    async fn recent_trades(&self, limit: i64) -> Result<Vec<TradeRecord>>;

    /// Health check for the storage backend.
    async fn health_check(&self) -> Result<bool>;
}

/// A row of the trade journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: i64,
    pub mint: String,
    pub symbol: String,
    pub amount_sol: f64,
    pub entry_price: f64,
    pub entry_signature: String,
    pub opened_at: u64,
    pub exit_price: Option<f64>,
    pub exit_signature: Option<String>,
    pub exit_reason: Option<ExitReason>,
    pub pnl_percent: Option<f64>,
    pub closed_at: Option<u64>,
    pub status: PositionStatus,
}

#[derive(FromRow)]
struct TradeRow {
    id: i64,
    mint: String,
    symbol: String,
    amount_sol: f64,
    entry_price: f64,
    entry_signature: String,
    opened_at: i64,
    exit_price: Option<f64>,
    exit_signature: Option<String>,
    exit_reason: Option<String>,
    pnl_percent: Option<f64>,
    closed_at: Option<i64>,
    status: String,
}

impl TryFrom<TradeRow> for TradeRecord {
    type Error = anyhow::Error;

    fn try_from(row: TradeRow) -> Result<Self> {
        let status = match row.status.as_str() {
            "OPEN" => PositionStatus::Open,
            "CLOSED" => PositionStatus::Closed,
            other => return Err(anyhow!("Unknown trade status in ledger: {}", other)),
        };
        let exit_reason = match row.exit_reason {
            Some(raw) => Some(
                ExitReason::parse(&raw).ok_or_else(|| anyhow!("Unknown exit reason in ledger: {}", raw))?,
            ),
            None => None,
        };

        Ok(TradeRecord {
            id: row.id,
            mint: row.mint,
            symbol: row.symbol,
            amount_sol: row.amount_sol,
            entry_price: row.entry_price,
            entry_signature: row.entry_signature,
            opened_at: row.opened_at as u64,
            exit_price: row.exit_price,
            exit_signature: row.exit_signature,
            exit_reason,
            pnl_percent: row.pnl_percent,
            closed_at: row.closed_at.map(|t| t as u64),
            status,
        })
    }
}

const SELECT_TRADES: &str = r#"
    SELECT id, mint, symbol, amount_sol, entry_price, entry_signature, opened_at,
           exit_price, exit_signature, exit_reason, pnl_percent, closed_at, status
    FROM trades
"#;

/// SQLite implementation of [`TradeLedger`].
pub struct SqliteTradeLedger {
    pool: Pool<Sqlite>,
}

impl SqliteTradeLedger {
    /// Open (or create) the ledger database at `path`.
    pub async fn open(path: &str) -> Result<Self> {
        let url = format!("sqlite:{}?mode=rwc", path);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .with_context(|| format!("Failed to connect to SQLite database {}", path))?;

        Self::create_schema(&pool).await?;
        info!("Trade ledger initialized at {}", path);
        Ok(Self { pool })
    }

    /// In-memory ledger. A single connection keeps every query on the same database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory SQLite database")?;

        Self::create_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn create_schema(pool: &Pool<Sqlite>) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trades (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                mint TEXT NOT NULL,
                symbol TEXT NOT NULL,
                amount_sol REAL NOT NULL,
                entry_price REAL NOT NULL,
                entry_signature TEXT NOT NULL UNIQUE,
                opened_at INTEGER NOT NULL,
                exit_price REAL,
                exit_signature TEXT,
                exit_reason TEXT,
                pnl_percent REAL,
                closed_at INTEGER,
                status TEXT NOT NULL DEFAULT 'OPEN'
            );
            "#,
        )
        .execute(pool)
        .await
        .context("Failed to create trades table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_trades_status ON trades (status);")
            .execute(pool)
            .await
            .context("Failed to create trades status index")?;

        Ok(())
    }
}

#[async_trait]
impl TradeLedger for SqliteTradeLedger {
    async fn record_entry(&self, position: &Position) -> Result<i64> {
        debug!("Recording entry for mint: {}", position.mint());

        let result = sqlx::query(
            r#"
            INSERT INTO trades (mint, symbol, amount_sol, entry_price, entry_signature, opened_at, status)
            VALUES (?, ?, ?, ?, ?, ?, 'OPEN');
            "#,
        )
        .bind(position.mint())
        .bind(position.symbol())
        .bind(position.amount_sol())
        .bind(position.entry_price())
        .bind(position.entry_signature())
        .bind(position.opened_at() as i64)
        .execute(&self.pool)
        .await
        .context("Failed to insert trade")?;

        Ok(result.last_insert_rowid())
    }

    async fn record_exit(&self, closed: &ClosedPosition) -> Result<()> {
        debug!("Recording exit for mint: {}", closed.position.mint());

        let result = sqlx::query(
            r#"
            UPDATE trades
            SET exit_price = ?, exit_signature = ?, exit_reason = ?, pnl_percent = ?,
                closed_at = ?, status = 'CLOSED'
            WHERE entry_signature = ? AND status = 'OPEN';
            "#,
        )
        .bind(closed.exit_price)
        .bind(closed.exit_signature.as_str())
        .bind(closed.reason.as_str())
        .bind(closed.pnl_percent())
        .bind(closed.closed_at as i64)
        .bind(closed.position.entry_signature())
        .execute(&self.pool)
        .await
        .context("Failed to update trade")?;

        if result.rows_affected() == 0 {
            return Err(anyhow!(
                "No open trade found for entry signature {}",
                closed.position.entry_signature()
            ));
        }
        Ok(())
    }

    async fn open_trades(&self) -> Result<Vec<TradeRecord>> {
        let rows: Vec<TradeRow> = sqlx::query_as(&format!("{} WHERE status = 'OPEN' ORDER BY opened_at ASC", SELECT_TRADES))
            .fetch_all(&self.pool)
            .await
            .context("Failed to query open trades")?;

        rows.into_iter().map(TradeRecord::try_from).collect()
    }

    async fn recent_trades(&self, limit: i64) -> Result<Vec<TradeRecord>> {
        let rows: Vec<TradeRow> = sqlx::query_as(&format!("{} ORDER BY id DESC LIMIT ?", SELECT_TRADES))
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("Failed to query recent trades")?;

        rows.into_iter().map(TradeRecord::try_from).collect()
    }

    async fn health_check(&self) -> Result<bool> {
        let value: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Ledger health check failed")?;
        Ok(value == 1)
    }
}
