//! Repository layer for database operations.
//!
//! Methods are organized across submodules by domain:
//! - `partners.rs` - partner accounts and their claim/withdrawal/sale logs
//! - `auctions.rs` - auctions and bids
//!
//! Mutating methods take a `&mut SqliteConnection` so callers can run them
//! inside one transaction: re-read, apply the engine rule, then write with
//! a version check.

mod auctions;
mod partners;

use crate::domain::{Decimal, TimeMs};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{Sqlite, SqlitePool};
use sqlx::Transaction;
use std::str::FromStr;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Open a transaction for one mutation unit.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    /// Round-trip a trivial query to prove the pool can serve requests.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn acquire(&self) -> Result<PoolConnection<Sqlite>, sqlx::Error> {
        self.pool.acquire().await
    }
}

/// Parse a stored canonical decimal. Corrupt money is a decode error, never zero.
fn decode_decimal(column: &str, raw: &str) -> Result<Decimal, sqlx::Error> {
    Decimal::from_str(raw).map_err(|e| decode_error(column, raw, e))
}

fn decode_optional_decimal(column: &str, raw: Option<String>) -> Result<Option<Decimal>, sqlx::Error> {
    raw.map(|s| decode_decimal(column, &s)).transpose()
}

fn decode_enum<T: FromStr<Err = String>>(column: &str, raw: &str) -> Result<T, sqlx::Error> {
    T::from_str(raw).map_err(|e| decode_error(column, raw, e))
}

fn decode_time(raw: Option<i64>) -> Option<TimeMs> {
    raw.map(TimeMs::new)
}

fn decode_error(column: &str, raw: &str, err: impl std::fmt::Display) -> sqlx::Error {
    tracing::warn!(column, value = raw, error = %err, "Failed to decode stored value");
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("invalid value {:?}: {}", raw, err).into(),
    }
}
