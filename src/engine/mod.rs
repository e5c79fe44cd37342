//! Pure rules for the partner ledger and the auction engine.
//!
//! Nothing in here performs I/O. Callers load a record inside a
//! transaction, run one of these functions on it, and persist the result.

pub mod auction;
pub mod money;
pub mod partner_ledger;

pub use auction::{AuctionError, AuctionView, BidReceipt};
pub use money::{AmountError, AmountRules};
pub use partner_ledger::{ApplyOutcome, LedgerError, LedgerPolicy, LevelInfo, SaleCredit};

/// Coarse classification used to pick an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-range input.
    Validation,
    /// The operation is not valid for the record's current state.
    StateConflict,
    NotFound,
}
