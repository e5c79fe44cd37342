//! Partner ledger rules.
//!
//! Every function here validates first and mutates second, so a returned
//! error always leaves the account untouched. Persistence and locking live
//! in `orchestration::partners`.

use super::money::{AmountError, AmountRules};
use super::ErrorKind;
use crate::domain::{
    BankInfo, ClaimStatus, Decimal, DiscountCode, PartnerAccount, PartnerStatus, RewardClaim,
    RewardLevel, RewardTable, TimeMs, UserId, Withdrawal, WithdrawalStatus,
};
use rust_decimal_macros::dec;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Points accrued per unit of attributed sales.
pub const POINTS_PER_SALE_UNIT: Decimal = Decimal::new(dec!(0.01));

/// Policy constants the ledger checks against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPolicy {
    pub minimum_withdrawal: Decimal,
    pub amounts: AmountRules,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            minimum_withdrawal: Decimal::from(500),
            amounts: AmountRules::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("affiliate code must be 3-20 characters of letters, digits, '-' or '_'")]
    InvalidAffiliateCode,
    #[error("affiliate code {0} is already taken")]
    AffiliateCodeTaken(String),
    #[error("account already holds a {0} partner application")]
    AlreadyPartner(PartnerStatus),
    #[error("partner account is already approved")]
    AlreadyApproved,
    #[error("partner account is {0}, expected pending")]
    NotPending(PartnerStatus),
    #[error("partner account is {0}, expected approved")]
    NotApproved(PartnerStatus),
    #[error("commission rate must be in (0, 1], got {0}")]
    InvalidCommissionRate(Decimal),
    #[error("amount must be greater than zero")]
    NonPositiveAmount,
    #[error("unknown reward level {0}")]
    UnknownLevel(u32),
    #[error("reward level {0} has already been claimed")]
    AlreadyClaimed(u32),
    #[error("level {level} requires {required} points, account has {available}")]
    InsufficientPoints {
        level: u32,
        required: Decimal,
        available: Decimal,
    },
    #[error("minimum withdrawal is {minimum}")]
    BelowMinimum { minimum: Decimal },
    #[error("requested {requested} exceeds available commission {available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },
    #[error("missing bank field: {0}")]
    MissingBankInfo(&'static str),
    #[error("unknown withdrawal {0}")]
    UnknownWithdrawal(String),
    #[error("withdrawal {0} has already been settled")]
    WithdrawalSettled(String),
    #[error("orderRef is required")]
    MissingOrderRef,
    #[error("orderRef {0} is already credited to another partner")]
    OrderRefTaken(String),
    #[error(transparent)]
    Amount(#[from] AmountError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidAffiliateCode
            | LedgerError::InvalidCommissionRate(_)
            | LedgerError::NonPositiveAmount
            | LedgerError::BelowMinimum { .. }
            | LedgerError::InsufficientBalance { .. }
            | LedgerError::MissingBankInfo(_)
            | LedgerError::MissingOrderRef
            | LedgerError::Amount(_) => ErrorKind::Validation,
            LedgerError::UnknownLevel(_) | LedgerError::UnknownWithdrawal(_) => {
                ErrorKind::NotFound
            }
            LedgerError::AffiliateCodeTaken(_)
            | LedgerError::AlreadyPartner(_)
            | LedgerError::AlreadyApproved
            | LedgerError::NotPending(_)
            | LedgerError::NotApproved(_)
            | LedgerError::AlreadyClaimed(_)
            | LedgerError::InsufficientPoints { .. }
            | LedgerError::WithdrawalSettled(_)
            | LedgerError::OrderRefTaken(_) => ErrorKind::StateConflict,
        }
    }

    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidAffiliateCode => "INVALID_AFFILIATE_CODE",
            LedgerError::AffiliateCodeTaken(_) => "AFFILIATE_CODE_TAKEN",
            LedgerError::AlreadyPartner(_) => "ALREADY_PARTNER",
            LedgerError::AlreadyApproved => "ALREADY_APPROVED",
            LedgerError::NotPending(_) => "NOT_PENDING",
            LedgerError::NotApproved(_) => "NOT_APPROVED",
            LedgerError::InvalidCommissionRate(_) => "INVALID_COMMISSION_RATE",
            LedgerError::NonPositiveAmount => "NON_POSITIVE_AMOUNT",
            LedgerError::UnknownLevel(_) => "UNKNOWN_LEVEL",
            LedgerError::AlreadyClaimed(_) => "ALREADY_CLAIMED",
            LedgerError::InsufficientPoints { .. } => "INSUFFICIENT_POINTS",
            LedgerError::BelowMinimum { .. } => "BELOW_MINIMUM",
            LedgerError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            LedgerError::MissingBankInfo(_) => "MISSING_BANK_INFO",
            LedgerError::UnknownWithdrawal(_) => "UNKNOWN_WITHDRAWAL",
            LedgerError::WithdrawalSettled(_) => "WITHDRAWAL_SETTLED",
            LedgerError::MissingOrderRef => "MISSING_ORDER_REF",
            LedgerError::OrderRefTaken(_) => "ORDER_REF_TAKEN",
            LedgerError::Amount(e) => e.code(),
        }
    }
}

/// What `apply` decided to do with the caller's existing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// No record existed; a pending one was created.
    Created(PartnerAccount),
    /// A rejected record was reset to a fresh pending application.
    Reapplied(PartnerAccount),
    /// Same code re-submitted for a live application; nothing changed.
    Unchanged(PartnerAccount),
}

impl ApplyOutcome {
    pub fn into_account(self) -> PartnerAccount {
        match self {
            ApplyOutcome::Created(a) | ApplyOutcome::Reapplied(a) | ApplyOutcome::Unchanged(a) => a,
        }
    }
}

/// Validate and upper-case an affiliate code.
pub fn normalize_affiliate_code(raw: &str) -> Result<String, LedgerError> {
    let code = raw.trim();
    let valid_len = (3..=20).contains(&code.chars().count());
    let valid_chars = code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid_len || !valid_chars {
        return Err(LedgerError::InvalidAffiliateCode);
    }
    Ok(code.to_ascii_uppercase())
}

/// Apply for the partner program.
///
/// Re-submitting the same code for a pending or approved application is an
/// idempotent replay. A different code for a live application is rejected.
pub fn apply(
    existing: Option<PartnerAccount>,
    user_id: UserId,
    raw_code: &str,
    now: TimeMs,
) -> Result<ApplyOutcome, LedgerError> {
    let code = normalize_affiliate_code(raw_code)?;
    match existing {
        None => Ok(ApplyOutcome::Created(PartnerAccount::pending(
            user_id, code, now,
        ))),
        Some(account) if account.status == PartnerStatus::Rejected => {
            let mut fresh = PartnerAccount::pending(user_id, code, now);
            fresh.version = account.version;
            fresh.last_bank_info = account.last_bank_info;
            Ok(ApplyOutcome::Reapplied(fresh))
        }
        Some(account) if account.affiliate_code == code => Ok(ApplyOutcome::Unchanged(account)),
        Some(account) => Err(LedgerError::AlreadyPartner(account.status)),
    }
}

/// Approve a pending application and fix its commission rate.
pub fn approve(account: &mut PartnerAccount, rate: Decimal, now: TimeMs) -> Result<(), LedgerError> {
    match account.status {
        PartnerStatus::Pending => {}
        PartnerStatus::Approved => return Err(LedgerError::AlreadyApproved),
        other => return Err(LedgerError::NotPending(other)),
    }
    if !rate.is_positive() || rate > Decimal::one() {
        return Err(LedgerError::InvalidCommissionRate(rate));
    }

    account.status = PartnerStatus::Approved;
    account.commission_rate = Some(rate);
    account.approved_at = Some(now);
    Ok(())
}

pub fn reject(account: &mut PartnerAccount) -> Result<(), LedgerError> {
    if account.status != PartnerStatus::Pending {
        return Err(LedgerError::NotPending(account.status));
    }
    account.status = PartnerStatus::Rejected;
    Ok(())
}

/// Amounts credited by one settled sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleCredit {
    pub sale_amount: Decimal,
    pub commission: Decimal,
    pub points: Decimal,
}

/// Credit a settled sale: sales, points and commission move together.
pub fn record_sale(
    account: &mut PartnerAccount,
    sale_amount: Decimal,
    policy: &LedgerPolicy,
) -> Result<SaleCredit, LedgerError> {
    let rate = approved_rate(account)?;
    if !sale_amount.is_positive() {
        return Err(LedgerError::NonPositiveAmount);
    }
    policy.amounts.check(sale_amount)?;

    let commission = (sale_amount * rate).round_to_scale(policy.amounts.currency_scale);
    let points = sale_amount * POINTS_PER_SALE_UNIT;

    account.total_sales += sale_amount;
    account.partner_points += points;
    account.total_commission += commission;
    account.available_commission += commission;

    Ok(SaleCredit {
        sale_amount,
        commission,
        points,
    })
}

/// Claim the one-off reward for `level`. A level pays out at most once.
pub fn claim_reward(
    account: &mut PartnerAccount,
    table: &RewardTable,
    level: u32,
    now: TimeMs,
) -> Result<RewardClaim, LedgerError> {
    approved_rate(account)?;
    let tier = table.get(level).ok_or(LedgerError::UnknownLevel(level))?;
    if account.claimed_levels.contains(&level) {
        return Err(LedgerError::AlreadyClaimed(level));
    }
    if account.partner_points < tier.points_required {
        return Err(LedgerError::InsufficientPoints {
            level,
            required: tier.points_required,
            available: account.partner_points,
        });
    }

    let claim = RewardClaim {
        id: Uuid::new_v4().to_string(),
        level,
        reward_amount: tier.reward,
        claimed_at: now,
        status: ClaimStatus::Completed,
    };

    account.claimed_levels.insert(level);
    account.reward_claims.push(claim.clone());
    account.available_commission += tier.reward;
    account.total_commission += tier.reward;

    Ok(claim)
}

/// Move `amount` from available to paid and queue a pending payout.
pub fn request_withdrawal(
    account: &mut PartnerAccount,
    amount: Decimal,
    bank_info: BankInfo,
    policy: &LedgerPolicy,
    now: TimeMs,
) -> Result<Withdrawal, LedgerError> {
    approved_rate(account)?;
    if let Some(field) = bank_info.first_missing_field() {
        return Err(LedgerError::MissingBankInfo(field));
    }
    if !amount.is_positive() {
        return Err(LedgerError::NonPositiveAmount);
    }
    policy.amounts.check(amount)?;
    if amount < policy.minimum_withdrawal {
        return Err(LedgerError::BelowMinimum {
            minimum: policy.minimum_withdrawal,
        });
    }
    if amount > account.available_commission {
        return Err(LedgerError::InsufficientBalance {
            requested: amount,
            available: account.available_commission,
        });
    }

    let withdrawal = Withdrawal {
        id: Uuid::new_v4().to_string(),
        amount,
        status: WithdrawalStatus::Pending,
        bank_info: bank_info.clone(),
        requested_at: now,
        settled_at: None,
    };

    account.available_commission -= amount;
    account.paid_commission += amount;
    account.withdrawals.push(withdrawal.clone());
    account.last_bank_info = Some(bank_info);

    Ok(withdrawal)
}

/// Close out a pending withdrawal.
///
/// A rejected payout returns its amount from paid to available so the
/// commission partition still holds.
pub fn settle_withdrawal(
    account: &mut PartnerAccount,
    withdrawal_id: &str,
    approve: bool,
    now: TimeMs,
) -> Result<Withdrawal, LedgerError> {
    let idx = account
        .withdrawals
        .iter()
        .position(|w| w.id == withdrawal_id)
        .ok_or_else(|| LedgerError::UnknownWithdrawal(withdrawal_id.to_string()))?;
    if account.withdrawals[idx].status != WithdrawalStatus::Pending {
        return Err(LedgerError::WithdrawalSettled(withdrawal_id.to_string()));
    }

    let amount = account.withdrawals[idx].amount;
    if !approve {
        account.paid_commission -= amount;
        account.available_commission += amount;
    }

    let withdrawal = &mut account.withdrawals[idx];
    withdrawal.status = if approve {
        WithdrawalStatus::Completed
    } else {
        WithdrawalStatus::Rejected
    };
    withdrawal.settled_at = Some(now);
    Ok(withdrawal.clone())
}

/// Tier standing of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelInfo {
    pub partner_points: Decimal,
    pub current_level: Option<RewardLevel>,
    pub next_level: Option<RewardLevel>,
    /// Percent of the way from the current threshold to the next, in [0, 100].
    pub progress_percent: Decimal,
    /// Unlocked but not yet claimed.
    pub claimable_levels: Vec<RewardLevel>,
}

pub fn level_info(account: &PartnerAccount, table: &RewardTable) -> LevelInfo {
    let points = account.partner_points;
    let current = table.current_level(points).copied();
    let next = table.next_level(points).copied();

    let progress_percent = match next {
        None => Decimal::hundred(),
        Some(next) => {
            let floor = current
                .map(|c| c.points_required)
                .unwrap_or_else(Decimal::zero);
            let span = next.points_required - floor;
            if span.is_positive() {
                ((points - floor) / span * Decimal::hundred())
                    .clamp(Decimal::zero(), Decimal::hundred())
                    .round_to_scale(2)
            } else {
                Decimal::zero()
            }
        }
    };

    let claimable_levels = table
        .unlocked(points)
        .filter(|l| !account.claimed_levels.contains(&l.level))
        .copied()
        .collect();

    LevelInfo {
        partner_points: points,
        current_level: current,
        next_level: next,
        progress_percent,
        claimable_levels,
    }
}

fn approved_rate(account: &PartnerAccount) -> Result<Decimal, LedgerError> {
    match (account.status, account.commission_rate) {
        (PartnerStatus::Approved, Some(rate)) => Ok(rate),
        (status, _) => Err(LedgerError::NotApproved(status)),
    }
}
