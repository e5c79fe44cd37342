use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::auth::AuthUser;
use super::AppState;
use crate::domain::{AuctionStatus, Decimal, TimeMs};
use crate::engine::{AuctionView, BidReceipt};
use crate::error::AppError;

/// List row: the view without its bid log.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionSummary {
    pub id: i64,
    pub title: String,
    pub status: AuctionStatus,
    pub current_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_next_bid: Option<Decimal>,
    pub start_time: TimeMs,
    pub end_time: TimeMs,
    pub countdown_target: TimeMs,
    pub bid_count: usize,
    pub can_bid: bool,
}

impl From<AuctionView> for AuctionSummary {
    fn from(view: AuctionView) -> Self {
        Self {
            id: view.id,
            title: view.title,
            status: view.status,
            current_price: view.current_price,
            minimum_next_bid: view.minimum_next_bid,
            start_time: view.start_time,
            end_time: view.end_time,
            countdown_target: view.countdown_target,
            bid_count: view.bid_count,
            can_bid: view.can_bid,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionsResponse {
    pub auctions: Vec<AuctionSummary>,
    pub server_time: TimeMs,
}

pub async fn list_auctions(State(state): State<AppState>) -> Result<Json<AuctionsResponse>, AppError> {
    let auctions = state.auctions.list().await?;
    Ok(Json(AuctionsResponse {
        auctions: auctions.into_iter().map(AuctionSummary::from).collect(),
        server_time: state.clock.now(),
    }))
}

pub async fn get_auction(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<AuctionView>, AppError> {
    let Path(id) = id?;
    Ok(Json(state.auctions.view(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct BidRequest {
    pub amount: Decimal,
}

pub async fn place_bid(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<BidRequest>, JsonRejection>,
) -> Result<Json<BidReceipt>, AppError> {
    let Path(id) = id?;
    let Json(req) = body?;
    let receipt = state
        .auctions
        .place_bid(id, &identity.user_id, req.amount)
        .await?;
    Ok(Json(receipt))
}
