//! Auction and bid operations for the repository.

use super::{decode_decimal, decode_enum, decode_optional_decimal, Repository};
use crate::domain::{Auction, AuctionStatus, Bid, TimeMs, UserId};
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;

const TERMINAL_STATUSES: [AuctionStatus; 4] = [
    AuctionStatus::Completed,
    AuctionStatus::NoBids,
    AuctionStatus::Unpaid,
    AuctionStatus::Cancelled,
];

impl Repository {
    /// Read an auction outside any transaction. For display only.
    pub async fn get_auction(&self, id: i64) -> Result<Option<Auction>, sqlx::Error> {
        let mut conn = self.acquire().await?;
        Self::load_auction(&mut conn, id).await
    }

    /// All auctions, newest start first.
    pub async fn list_auctions(&self) -> Result<Vec<Auction>, sqlx::Error> {
        let mut conn = self.acquire().await?;
        let ids: Vec<i64> = sqlx::query("SELECT id FROM auctions ORDER BY start_time_ms DESC, id DESC")
            .fetch_all(&mut *conn)
            .await?
            .iter()
            .map(|row| row.get("id"))
            .collect();

        let mut auctions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(auction) = Self::load_auction(&mut conn, id).await? {
                auctions.push(auction);
            }
        }
        Ok(auctions)
    }

    /// Non-terminal auctions whose end time is at or before `now`.
    pub async fn due_auction_ids(&self, now: TimeMs) -> Result<Vec<i64>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM auctions
            WHERE end_time_ms <= ? AND status NOT IN (?, ?, ?, ?)
            ORDER BY end_time_ms ASC, id ASC
            "#,
        )
        .bind(now.as_ms())
        .bind(TERMINAL_STATUSES[0].as_str())
        .bind(TERMINAL_STATUSES[1].as_str())
        .bind(TERMINAL_STATUSES[2].as_str())
        .bind(TERMINAL_STATUSES[3].as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    /// Load an auction with its bid log in ascending order.
    pub async fn load_auction(
        conn: &mut SqliteConnection,
        id: i64,
    ) -> Result<Option<Auction>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, title, description, status, start_price, current_price, bid_increment,
                   reserve_price, start_time_ms, end_time_ms, winner_id, winning_bid,
                   created_at, version
            FROM auctions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Auction {
            id: row.get("id"),
            title: row.get("title"),
            description: row.get("description"),
            status: decode_enum("status", &row.get::<String, _>("status"))?,
            start_price: decode_decimal("start_price", &row.get::<String, _>("start_price"))?,
            current_price: decode_decimal("current_price", &row.get::<String, _>("current_price"))?,
            bid_increment: decode_decimal("bid_increment", &row.get::<String, _>("bid_increment"))?,
            reserve_price: decode_optional_decimal("reserve_price", row.get("reserve_price"))?,
            start_time: TimeMs::new(row.get("start_time_ms")),
            end_time: TimeMs::new(row.get("end_time_ms")),
            winner_id: row.get::<Option<String>, _>("winner_id").map(UserId::new),
            winning_bid: decode_optional_decimal("winning_bid", row.get("winning_bid"))?,
            bids: Self::load_bids(conn, id).await?,
            created_at: TimeMs::new(row.get("created_at")),
            version: row.get("version"),
        }))
    }

    async fn load_bids(conn: &mut SqliteConnection, auction_id: i64) -> Result<Vec<Bid>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, auction_id, seq, bidder_id, amount, created_at_ms, is_winning
            FROM bids
            WHERE auction_id = ?
            ORDER BY created_at_ms ASC, seq ASC
            "#,
        )
        .bind(auction_id)
        .fetch_all(&mut *conn)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Bid {
                    id: row.get("id"),
                    auction_id: row.get("auction_id"),
                    seq: row.get("seq"),
                    bidder_id: UserId::new(row.get::<String, _>("bidder_id")),
                    amount: decode_decimal("amount", &row.get::<String, _>("amount"))?,
                    created_at: TimeMs::new(row.get("created_at_ms")),
                    is_winning: row.get::<i64, _>("is_winning") != 0,
                })
            })
            .collect()
    }

    /// Insert a new auction and return its id.
    pub async fn insert_auction(
        conn: &mut SqliteConnection,
        auction: &Auction,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO auctions (
                title, description, status, start_price, current_price, bid_increment,
                reserve_price, start_time_ms, end_time_ms, winner_id, winning_bid, created_at,
                version
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(&auction.title)
        .bind(&auction.description)
        .bind(auction.status.as_str())
        .bind(auction.start_price.to_canonical_string())
        .bind(auction.current_price.to_canonical_string())
        .bind(auction.bid_increment.to_canonical_string())
        .bind(auction.reserve_price.map(|d| d.to_canonical_string()))
        .bind(auction.start_time.as_ms())
        .bind(auction.end_time.as_ms())
        .bind(auction.winner_id.as_ref().map(|w| w.as_str()))
        .bind(auction.winning_bid.map(|d| d.to_canonical_string()))
        .bind(auction.created_at.as_ms())
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Write status/price/winner if the row is still at `auction.version`.
    ///
    /// Returns `false` on a version mismatch; the caller must roll back.
    pub async fn save_auction(
        conn: &mut SqliteConnection,
        auction: &Auction,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE auctions SET
                status = ?, current_price = ?, winner_id = ?, winning_bid = ?,
                version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(auction.status.as_str())
        .bind(auction.current_price.to_canonical_string())
        .bind(auction.winner_id.as_ref().map(|w| w.as_str()))
        .bind(auction.winning_bid.map(|d| d.to_canonical_string()))
        .bind(auction.id)
        .bind(auction.version)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Append a bid, demoting whatever bid was winning before it.
    pub async fn append_winning_bid(
        conn: &mut SqliteConnection,
        bid: &Bid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE bids SET is_winning = 0 WHERE auction_id = ? AND is_winning = 1")
            .bind(bid.auction_id)
            .execute(&mut *conn)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO bids (id, auction_id, seq, bidder_id, amount, created_at_ms, is_winning)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&bid.id)
        .bind(bid.auction_id)
        .bind(bid.seq)
        .bind(bid.bidder_id.as_str())
        .bind(bid.amount.to_canonical_string())
        .bind(bid.created_at.as_ms())
        .bind(bid.is_winning as i64)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}
