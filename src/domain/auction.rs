//! Auction record and its append-only bid log.

use crate::domain::{Decimal, TimeMs, UserId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuctionStatus {
    Scheduled,
    Active,
    /// Past `end_time`, waiting to be finalized.
    Ended,
    Completed,
    NoBids,
    Unpaid,
    Cancelled,
}

impl AuctionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuctionStatus::Scheduled => "scheduled",
            AuctionStatus::Active => "active",
            AuctionStatus::Ended => "ended",
            AuctionStatus::Completed => "completed",
            AuctionStatus::NoBids => "no_bids",
            AuctionStatus::Unpaid => "unpaid",
            AuctionStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AuctionStatus::Completed
                | AuctionStatus::NoBids
                | AuctionStatus::Unpaid
                | AuctionStatus::Cancelled
        )
    }
}

impl FromStr for AuctionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(AuctionStatus::Scheduled),
            "active" => Ok(AuctionStatus::Active),
            "ended" => Ok(AuctionStatus::Ended),
            "completed" => Ok(AuctionStatus::Completed),
            "no_bids" => Ok(AuctionStatus::NoBids),
            "unpaid" => Ok(AuctionStatus::Unpaid),
            "cancelled" => Ok(AuctionStatus::Cancelled),
            other => Err(format!("unknown auction status: {}", other)),
        }
    }
}

impl std::fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An accepted bid. Only `is_winning` ever changes after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub id: String,
    pub auction_id: i64,
    /// Position in the auction's bid log, starting at 1.
    pub seq: i64,
    pub bidder_id: UserId,
    pub amount: Decimal,
    pub created_at: TimeMs,
    pub is_winning: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// Persisted status. May lag the clock; see `engine::auction::effective_status`.
    pub status: AuctionStatus,
    pub start_price: Decimal,
    pub current_price: Decimal,
    pub bid_increment: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserve_price: Option<Decimal>,
    pub start_time: TimeMs,
    pub end_time: TimeMs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winning_bid: Option<Decimal>,
    /// Ascending by (created_at, seq).
    pub bids: Vec<Bid>,
    pub created_at: TimeMs,
    #[serde(skip)]
    pub version: i64,
}

impl Auction {
    pub fn winning(&self) -> Option<&Bid> {
        self.bids.iter().rev().find(|b| b.is_winning)
    }

    /// `None` only if the sum leaves the decimal range.
    pub fn minimum_next_bid(&self) -> Option<Decimal> {
        self.current_price.checked_add(self.bid_increment)
    }
}

/// Admin input for creating an auction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuction {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_price: Decimal,
    pub bid_increment: Decimal,
    #[serde(default)]
    pub reserve_price: Option<Decimal>,
    pub start_time: TimeMs,
    pub end_time: TimeMs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!AuctionStatus::Scheduled.is_terminal());
        assert!(!AuctionStatus::Active.is_terminal());
        assert!(!AuctionStatus::Ended.is_terminal());
        assert!(AuctionStatus::Completed.is_terminal());
        assert!(AuctionStatus::NoBids.is_terminal());
        assert!(AuctionStatus::Unpaid.is_terminal());
        assert!(AuctionStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&AuctionStatus::NoBids).unwrap(),
            "\"no_bids\""
        );
        assert_eq!(
            "no_bids".parse::<AuctionStatus>().unwrap(),
            AuctionStatus::NoBids
        );
    }

    #[test]
    fn test_new_auction_accepts_integer_amounts() {
        let json = serde_json::json!({
            "title": "Signed racket",
            "startPrice": 1000,
            "bidIncrement": "100",
            "startTime": 1000,
            "endTime": 2000
        });
        let new: NewAuction = serde_json::from_value(json).unwrap();
        assert_eq!(new.start_price, Decimal::from(1000));
        assert_eq!(new.bid_increment, Decimal::from(100));
        assert!(new.reserve_price.is_none());
        assert_eq!(new.description, "");
    }
}
