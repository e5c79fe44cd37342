use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::auth::AuthUser;
use super::AppState;
use crate::domain::{BankInfo, Decimal, PartnerAccount, RewardClaim, RewardLevel, Withdrawal};
use crate::engine::LevelInfo;
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelsResponse {
    pub levels: Vec<RewardLevel>,
}

pub async fn get_levels(State(state): State<AppState>) -> Json<LevelsResponse> {
    Json(LevelsResponse {
        levels: state.partners.levels().levels().to_vec(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub affiliate_code: String,
}

pub async fn apply(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    body: Result<Json<ApplyRequest>, JsonRejection>,
) -> Result<Json<PartnerAccount>, AppError> {
    let Json(req) = body?;
    let account = state
        .partners
        .apply(&identity.user_id, &req.affiliate_code)
        .await?;
    Ok(Json(account))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerMeResponse {
    pub account: PartnerAccount,
    pub level_info: LevelInfo,
}

pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<PartnerMeResponse>, AppError> {
    let (account, level_info) = state.partners.level_info(&identity.user_id).await?;
    Ok(Json(PartnerMeResponse { account, level_info }))
}

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub level: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub claim: RewardClaim,
    pub available_commission: Decimal,
    pub claimed_levels: Vec<u32>,
}

pub async fn claim(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    body: Result<Json<ClaimRequest>, JsonRejection>,
) -> Result<Json<ClaimResponse>, AppError> {
    let Json(req) = body?;
    let (account, claim) = state
        .partners
        .claim_reward(&identity.user_id, req.level)
        .await?;
    Ok(Json(ClaimResponse {
        claim,
        available_commission: account.available_commission,
        claimed_levels: account.claimed_levels.into_iter().collect(),
    }))
}

/// Bank fields default to empty so a missing one reports which field it was.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub bank_name: String,
    #[serde(default)]
    pub account_number: String,
    #[serde(default)]
    pub account_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawResponse {
    pub withdrawal: Withdrawal,
    pub available_commission: Decimal,
    pub paid_commission: Decimal,
}

pub async fn withdraw(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    body: Result<Json<WithdrawRequest>, JsonRejection>,
) -> Result<Json<WithdrawResponse>, AppError> {
    let Json(req) = body?;
    let bank_info = BankInfo {
        bank_name: req.bank_name,
        account_number: req.account_number,
        account_name: req.account_name,
    };
    let (account, withdrawal) = state
        .partners
        .request_withdrawal(&identity.user_id, req.amount, bank_info)
        .await?;
    Ok(Json(WithdrawResponse {
        withdrawal,
        available_commission: account.available_commission,
        paid_commission: account.paid_commission,
    }))
}
