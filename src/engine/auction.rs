//! Auction state machine and bid validation.
//!
//! `scheduled -> active -> ended -> {completed | no_bids}` is driven by the
//! server clock. Admins may close any non-terminal auction as `cancelled`
//! or `unpaid`. Terminal states never move again.

use super::money::{AmountError, AmountRules};
use super::ErrorKind;
use crate::domain::{Auction, AuctionStatus, Bid, Decimal, NewAuction, TimeMs, UserId};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    #[error("auction is {0}, bidding is not open")]
    AuctionNotActive(AuctionStatus),
    #[error("auction has ended")]
    AuctionEnded,
    #[error("bid too low, minimum bid is {minimum}")]
    BidTooLow { minimum: Decimal },
    #[error("auction has not reached its end time yet")]
    NotYetEnded,
    #[error("auction is already {0}")]
    AlreadyTerminal(AuctionStatus),
    #[error("invalid auction: {0}")]
    InvalidAuction(String),
    #[error(transparent)]
    Amount(#[from] AmountError),
}

impl AuctionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuctionError::BidTooLow { .. }
            | AuctionError::InvalidAuction(_)
            | AuctionError::Amount(_) => ErrorKind::Validation,
            AuctionError::AuctionNotActive(_)
            | AuctionError::AuctionEnded
            | AuctionError::NotYetEnded
            | AuctionError::AlreadyTerminal(_) => ErrorKind::StateConflict,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuctionError::AuctionNotActive(_) => "AUCTION_NOT_ACTIVE",
            AuctionError::AuctionEnded => "AUCTION_ENDED",
            AuctionError::BidTooLow { .. } => "BID_TOO_LOW",
            AuctionError::NotYetEnded => "AUCTION_NOT_ENDED",
            AuctionError::AlreadyTerminal(_) => "AUCTION_CLOSED",
            AuctionError::InvalidAuction(_) => "INVALID_AUCTION",
            AuctionError::Amount(e) => e.code(),
        }
    }
}

/// Status as of `now`, regardless of what was last persisted.
pub fn effective_status(auction: &Auction, now: TimeMs) -> AuctionStatus {
    if auction.status.is_terminal() {
        return auction.status;
    }
    if now >= auction.end_time {
        AuctionStatus::Ended
    } else if now >= auction.start_time {
        AuctionStatus::Active
    } else {
        AuctionStatus::Scheduled
    }
}

pub fn validate_new(new: &NewAuction, rules: &AmountRules) -> Result<(), AuctionError> {
    let invalid = |msg: &str| -> Result<(), AuctionError> {
        Err(AuctionError::InvalidAuction(msg.to_string()))
    };
    if new.title.trim().is_empty() {
        return invalid("title must not be empty");
    }
    if !new.start_price.is_positive() {
        return invalid("startPrice must be greater than zero");
    }
    if !new.bid_increment.is_positive() {
        return invalid("bidIncrement must be greater than zero");
    }
    if let Some(reserve) = new.reserve_price {
        if reserve < new.start_price {
            return invalid("reservePrice must be at least startPrice");
        }
    }
    if new.end_time <= new.start_time {
        return invalid("endTime must be after startTime");
    }
    rules.check(new.start_price)?;
    rules.check(new.bid_increment)?;
    if let Some(reserve) = new.reserve_price {
        rules.check(reserve)?;
    }
    Ok(())
}

/// Build an unsaved scheduled auction (id 0 until persisted).
pub fn create(new: NewAuction, rules: &AmountRules, now: TimeMs) -> Result<Auction, AuctionError> {
    validate_new(&new, rules)?;
    Ok(Auction {
        id: 0,
        title: new.title.trim().to_string(),
        description: new.description,
        status: AuctionStatus::Scheduled,
        start_price: new.start_price,
        current_price: new.start_price,
        bid_increment: new.bid_increment,
        reserve_price: new.reserve_price,
        start_time: new.start_time,
        end_time: new.end_time,
        winner_id: None,
        winning_bid: None,
        bids: Vec::new(),
        created_at: now,
        version: 0,
    })
}

/// Result of an accepted bid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BidReceipt {
    pub current_price: Decimal,
    pub bid_count: usize,
    pub bid: Bid,
}

/// Validate and apply a bid against the auction as loaded inside the
/// caller's transaction.
pub fn place_bid(
    auction: &mut Auction,
    bidder_id: UserId,
    amount: Decimal,
    rules: &AmountRules,
    now: TimeMs,
) -> Result<BidReceipt, AuctionError> {
    match effective_status(auction, now) {
        AuctionStatus::Active => {}
        AuctionStatus::Ended | AuctionStatus::Completed | AuctionStatus::NoBids => {
            return Err(AuctionError::AuctionEnded)
        }
        other => return Err(AuctionError::AuctionNotActive(other)),
    }

    rules.check(amount)?;
    let minimum = auction.minimum_next_bid().ok_or(AmountError::TooLarge {
        maximum: rules.maximum,
    })?;
    if amount < minimum {
        return Err(AuctionError::BidTooLow { minimum });
    }

    for bid in auction.bids.iter_mut().filter(|b| b.is_winning) {
        bid.is_winning = false;
    }
    let bid = Bid {
        id: Uuid::new_v4().to_string(),
        auction_id: auction.id,
        seq: auction.bids.len() as i64 + 1,
        bidder_id,
        amount,
        created_at: now,
        is_winning: true,
    };
    auction.bids.push(bid.clone());
    auction.current_price = amount;
    auction.status = AuctionStatus::Active;

    Ok(BidReceipt {
        current_price: amount,
        bid_count: auction.bids.len(),
        bid,
    })
}

/// Close an auction whose end time has passed.
///
/// Returns `false` when the auction was already terminal (no-op).
pub fn finalize(auction: &mut Auction, now: TimeMs) -> Result<bool, AuctionError> {
    if auction.status.is_terminal() {
        return Ok(false);
    }
    if now < auction.end_time {
        return Err(AuctionError::NotYetEnded);
    }

    match auction.winning().map(|b| (b.bidder_id.clone(), b.amount)) {
        Some((winner, amount)) => {
            auction.status = AuctionStatus::Completed;
            auction.winner_id = Some(winner);
            auction.winning_bid = Some(amount);
        }
        None => {
            auction.status = AuctionStatus::NoBids;
        }
    }
    Ok(true)
}

/// Admin close of a live auction.
pub fn cancel(auction: &mut Auction, unpaid: bool) -> Result<(), AuctionError> {
    if auction.status.is_terminal() {
        return Err(AuctionError::AlreadyTerminal(auction.status));
    }
    auction.status = if unpaid {
        AuctionStatus::Unpaid
    } else {
        AuctionStatus::Cancelled
    };
    Ok(())
}

/// Read model for polling clients. Raw instants only; formatting the
/// remaining time is left to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionView {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: AuctionStatus,
    pub start_price: Decimal,
    pub current_price: Decimal,
    pub bid_increment: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_next_bid: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserve_price: Option<Decimal>,
    pub reserve_met: bool,
    pub start_time: TimeMs,
    pub end_time: TimeMs,
    /// `start_time` while scheduled, `end_time` otherwise.
    pub countdown_target: TimeMs,
    pub server_time: TimeMs,
    pub can_bid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winning_bid: Option<Decimal>,
    pub bid_count: usize,
    pub bids: Vec<Bid>,
}

pub fn view(auction: &Auction, now: TimeMs) -> AuctionView {
    let status = effective_status(auction, now);
    let countdown_target = if status == AuctionStatus::Scheduled {
        auction.start_time
    } else {
        auction.end_time
    };
    let reserve_met = match auction.reserve_price {
        None => true,
        Some(reserve) => auction
            .winning()
            .map(|b| b.amount >= reserve)
            .unwrap_or(false),
    };

    let mut bids = auction.bids.clone();
    bids.sort_by_key(|b| (b.created_at, b.seq));

    AuctionView {
        id: auction.id,
        title: auction.title.clone(),
        description: auction.description.clone(),
        status,
        start_price: auction.start_price,
        current_price: auction.current_price,
        bid_increment: auction.bid_increment,
        minimum_next_bid: auction.minimum_next_bid(),
        reserve_price: auction.reserve_price,
        reserve_met,
        start_time: auction.start_time,
        end_time: auction.end_time,
        countdown_target,
        server_time: now,
        can_bid: status == AuctionStatus::Active && now < auction.end_time,
        winner_id: auction.winner_id.clone(),
        winning_bid: auction.winning_bid,
        bid_count: bids.len(),
        bids,
    }
}
