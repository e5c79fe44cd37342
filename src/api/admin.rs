//! Admin-only endpoints: partner review, sale posting, payouts and auction control.

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::auth::AdminUser;
use super::AppState;
use crate::domain::{Decimal, NewAuction, PartnerAccount, UserId, Withdrawal};
use crate::engine::{AuctionView, SaleCredit};
use crate::error::AppError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRequest {
    pub commission_rate: Option<Decimal>,
}

/// Body is optional; an empty request approves at the default rate.
pub async fn approve_partner(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<String>,
    body: Bytes,
) -> Result<Json<PartnerAccount>, AppError> {
    let req: ApproveRequest = optional_json(&body)?;
    let account = state
        .partners
        .approve(&UserId::new(user_id), req.commission_rate)
        .await?;
    tracing::info!(admin = %admin.user_id, partner = %account.user_id, "Admin approved partner");
    Ok(Json(account))
}

pub async fn reject_partner(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(user_id): Path<String>,
) -> Result<Json<PartnerAccount>, AppError> {
    Ok(Json(state.partners.reject(&UserId::new(user_id)).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    pub order_ref: String,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleResponse {
    pub account: PartnerAccount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit: Option<SaleCredit>,
    pub duplicate: bool,
}

pub async fn record_sale(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(user_id): Path<String>,
    body: Result<Json<SaleRequest>, JsonRejection>,
) -> Result<Json<SaleResponse>, AppError> {
    let Json(req) = body?;
    let outcome = state
        .partners
        .record_sale(&UserId::new(user_id), &req.order_ref, req.amount)
        .await?;
    Ok(Json(SaleResponse {
        duplicate: outcome.credit.is_none(),
        account: outcome.account,
        credit: outcome.credit,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    pub approve: bool,
}

pub async fn settle_withdrawal(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(withdrawal_id): Path<String>,
    body: Result<Json<SettleRequest>, JsonRejection>,
) -> Result<Json<Withdrawal>, AppError> {
    let Json(req) = body?;
    let withdrawal = state
        .partners
        .settle_withdrawal(&withdrawal_id, req.approve)
        .await?;
    Ok(Json(withdrawal))
}

pub async fn create_auction(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    body: Result<Json<NewAuction>, JsonRejection>,
) -> Result<Json<AuctionView>, AppError> {
    let Json(new) = body?;
    Ok(Json(state.auctions.create(new).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeResponse {
    pub auction: AuctionView,
    /// False when the auction had already been closed.
    pub changed: bool,
}

pub async fn finalize_auction(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<FinalizeResponse>, AppError> {
    let Path(id) = id?;
    let (auction, changed) = state.auctions.finalize(id).await?;
    Ok(Json(FinalizeResponse { auction, changed }))
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub unpaid: bool,
}

pub async fn cancel_auction(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    id: Result<Path<i64>, PathRejection>,
    body: Bytes,
) -> Result<Json<AuctionView>, AppError> {
    let Path(id) = id?;
    let req: CancelRequest = optional_json(&body)?;
    Ok(Json(state.auctions.cancel(id, req.unpaid).await?))
}

/// Decode a body that may be omitted. Blank means defaults; anything else
/// must parse.
fn optional_json<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        AppError::validation(
            "INVALID_BODY",
            format!("Failed to parse the request body as JSON: {}", e),
        )
    })
}
