//! Domain types for the partner ledger and the auction engine.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Domain primitives: TimeMs, UserId
//! - Partner accounts with their claim, withdrawal and discount-code logs
//! - The static reward tier table
//! - Auctions and their bid log

pub mod auction;
pub mod decimal;
pub mod partner;
pub mod primitives;
pub mod reward_level;

pub use auction::{Auction, AuctionStatus, Bid, NewAuction};
pub use decimal::Decimal;
pub use partner::{
    BankInfo, ClaimStatus, DiscountCode, PartnerAccount, PartnerStatus, RewardClaim, Withdrawal,
    WithdrawalStatus,
};
pub use primitives::{TimeMs, UserId};
pub use reward_level::{RewardLevel, RewardTable, RewardTableError};
