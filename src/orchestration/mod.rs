//! Transactional services over the repository and the pure engine.
//!
//! Each mutation is one short unit: open a transaction, re-read the record,
//! run the engine rule, write with a version check, commit. Lost races are
//! retried a bounded number of times.

pub mod auctions;
pub mod finalizer;
pub mod partners;
mod retry;

pub use auctions::AuctionService;
pub use finalizer::spawn_finalizer;
pub use partners::{PartnerService, PartnerSettings, SaleOutcome};

use crate::engine::{AuctionError, LedgerError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Auction(#[from] AuctionError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} was modified concurrently, please retry")]
    Conflict(String),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl ServiceError {
    /// Lost optimistic races and SQLite lock contention.
    pub(crate) fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Conflict(_) => true,
            ServiceError::Db(sqlx::Error::Database(db)) => {
                if db.is_unique_violation() {
                    return true;
                }
                // SQLITE_BUSY (5) and SQLITE_LOCKED (6), including extended codes.
                db.code()
                    .and_then(|c| c.parse::<i32>().ok())
                    .map(|c| matches!(c & 0xff, 5 | 6))
                    .unwrap_or(false)
            }
            _ => false,
        }
    }
}
