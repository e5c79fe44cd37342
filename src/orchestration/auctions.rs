//! Auction service: bidding, closing and the polling read model.

use super::retry::with_conflict_retry;
use super::ServiceError;
use crate::clock::Clock;
use crate::db::Repository;
use crate::domain::{Auction, Decimal, NewAuction, UserId};
use crate::engine::auction::{self, AuctionView, BidReceipt};
use crate::engine::AmountRules;
use sqlx::sqlite::SqliteConnection;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct AuctionService {
    repo: Arc<Repository>,
    clock: Arc<dyn Clock>,
    amounts: AmountRules,
    conflict_retries: u32,
}

impl AuctionService {
    pub fn new(
        repo: Arc<Repository>,
        clock: Arc<dyn Clock>,
        amounts: AmountRules,
        conflict_retries: u32,
    ) -> Self {
        Self {
            repo,
            clock,
            amounts,
            conflict_retries,
        }
    }

    pub async fn create(&self, new: NewAuction) -> Result<AuctionView, ServiceError> {
        let now = self.clock.now();
        let mut auction = auction::create(new, &self.amounts, now)?;

        let mut tx = self.repo.begin().await?;
        auction.id = Repository::insert_auction(&mut tx, &auction).await?;
        tx.commit().await?;

        info!(auction_id = auction.id, title = %auction.title, "Auction created");
        Ok(auction::view(&auction, now))
    }

    /// Place a bid. Only one of several concurrent equal bids can win; the
    /// rest are re-validated against the new price on retry and rejected.
    pub async fn place_bid(
        &self,
        auction_id: i64,
        bidder_id: &UserId,
        amount: Decimal,
    ) -> Result<BidReceipt, ServiceError> {
        with_conflict_retry("place_bid", self.conflict_retries, || async move {
            let mut tx = self.repo.begin().await?;
            let mut auction = load_or_not_found(&mut tx, auction_id).await?;
            let receipt = auction::place_bid(
                &mut auction,
                bidder_id.clone(),
                amount,
                &self.amounts,
                self.clock.now(),
            )?;

            Repository::append_winning_bid(&mut tx, &receipt.bid).await?;
            save_or_conflict(&mut tx, &auction).await?;
            tx.commit().await?;

            info!(auction_id, bidder = %bidder_id, amount = %amount, "Bid accepted");
            Ok(receipt)
        })
        .await
    }

    /// Close an auction past its end time. Closing a closed auction is a no-op.
    pub async fn finalize(&self, auction_id: i64) -> Result<(AuctionView, bool), ServiceError> {
        with_conflict_retry("finalize", self.conflict_retries, || async move {
            let mut tx = self.repo.begin().await?;
            let mut auction = load_or_not_found(&mut tx, auction_id).await?;
            let now = self.clock.now();

            if !auction::finalize(&mut auction, now)? {
                debug!(auction_id, status = auction.status.as_str(), "Auction already closed");
                return Ok((auction::view(&auction, now), false));
            }
            save_or_conflict(&mut tx, &auction).await?;
            tx.commit().await?;

            info!(
                auction_id,
                status = auction.status.as_str(),
                winner = auction.winner_id.as_ref().map(|w| w.as_str()),
                "Auction finalized"
            );
            Ok((auction::view(&auction, now), true))
        })
        .await
    }

    /// Finalize every auction whose end time has passed. Returns how many
    /// changed state; per-auction failures are logged and skipped.
    pub async fn finalize_due(&self) -> Result<usize, ServiceError> {
        let due = self.repo.due_auction_ids(self.clock.now()).await?;
        let mut closed = 0;
        for auction_id in due {
            match self.finalize(auction_id).await {
                Ok((_, true)) => closed += 1,
                Ok((_, false)) => {}
                Err(e) => warn!(auction_id, error = %e, "Failed to finalize auction"),
            }
        }
        Ok(closed)
    }

    pub async fn cancel(&self, auction_id: i64, unpaid: bool) -> Result<AuctionView, ServiceError> {
        with_conflict_retry("cancel_auction", self.conflict_retries, || async move {
            let mut tx = self.repo.begin().await?;
            let mut auction = load_or_not_found(&mut tx, auction_id).await?;
            auction::cancel(&mut auction, unpaid)?;
            save_or_conflict(&mut tx, &auction).await?;
            tx.commit().await?;

            info!(auction_id, status = auction.status.as_str(), "Auction closed by admin");
            Ok(auction::view(&auction, self.clock.now()))
        })
        .await
    }

    pub async fn view(&self, auction_id: i64) -> Result<AuctionView, ServiceError> {
        let auction = self
            .repo
            .get_auction(auction_id)
            .await?
            .ok_or_else(|| not_found(auction_id))?;
        Ok(auction::view(&auction, self.clock.now()))
    }

    pub async fn list(&self) -> Result<Vec<AuctionView>, ServiceError> {
        let now = self.clock.now();
        Ok(self
            .repo
            .list_auctions()
            .await?
            .iter()
            .map(|a| auction::view(a, now))
            .collect())
    }
}

fn not_found(auction_id: i64) -> ServiceError {
    ServiceError::NotFound(format!("auction {}", auction_id))
}

async fn load_or_not_found(
    conn: &mut SqliteConnection,
    auction_id: i64,
) -> Result<Auction, ServiceError> {
    Repository::load_auction(conn, auction_id)
        .await?
        .ok_or_else(|| not_found(auction_id))
}

async fn save_or_conflict(conn: &mut SqliteConnection, auction: &Auction) -> Result<(), ServiceError> {
    if Repository::save_auction(conn, auction).await? {
        Ok(())
    } else {
        Err(ServiceError::Conflict(format!("auction {}", auction.id)))
    }
}
