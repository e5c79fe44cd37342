//! Partner program service.

use super::retry::with_conflict_retry;
use super::ServiceError;
use crate::clock::Clock;
use crate::config::Config;
use crate::db::Repository;
use crate::domain::{
    BankInfo, Decimal, PartnerAccount, RewardClaim, RewardTable, UserId, Withdrawal,
};
use crate::engine::partner_ledger::{self, ApplyOutcome, LedgerPolicy, LevelInfo, SaleCredit};
use crate::engine::LedgerError;
use rust_decimal_macros::dec;
use sqlx::sqlite::SqliteConnection;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tunables for [`PartnerService`].
#[derive(Debug, Clone, Copy)]
pub struct PartnerSettings {
    pub policy: LedgerPolicy,
    /// Rate used when an admin approves without naming one.
    pub default_commission_rate: Decimal,
    pub conflict_retries: u32,
}

impl PartnerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            policy: LedgerPolicy {
                minimum_withdrawal: config.min_withdrawal,
                amounts: config.amount_rules(),
            },
            default_commission_rate: config.default_commission_rate,
            conflict_retries: config.conflict_retries,
        }
    }
}

impl Default for PartnerSettings {
    fn default() -> Self {
        Self {
            policy: LedgerPolicy::default(),
            default_commission_rate: Decimal::new(dec!(0.1)),
            conflict_retries: 5,
        }
    }
}

/// Result of an admin sale posting.
#[derive(Debug, Clone)]
pub struct SaleOutcome {
    pub account: PartnerAccount,
    /// `None` when the order had already been credited.
    pub credit: Option<SaleCredit>,
}

#[derive(Clone)]
pub struct PartnerService {
    repo: Arc<Repository>,
    clock: Arc<dyn Clock>,
    levels: Arc<RewardTable>,
    settings: PartnerSettings,
}

impl PartnerService {
    pub fn new(
        repo: Arc<Repository>,
        clock: Arc<dyn Clock>,
        levels: RewardTable,
        settings: PartnerSettings,
    ) -> Self {
        Self {
            repo,
            clock,
            levels: Arc::new(levels),
            settings,
        }
    }

    pub fn levels(&self) -> &RewardTable {
        &self.levels
    }

    pub async fn account(&self, user_id: &UserId) -> Result<PartnerAccount, ServiceError> {
        self.repo
            .get_partner(user_id)
            .await?
            .ok_or_else(|| not_found(user_id))
    }

    pub async fn level_info(
        &self,
        user_id: &UserId,
    ) -> Result<(PartnerAccount, LevelInfo), ServiceError> {
        let account = self.account(user_id).await?;
        let info = partner_ledger::level_info(&account, &self.levels);
        Ok((account, info))
    }

    /// Submit (or replay) a partner application.
    pub async fn apply(
        &self,
        user_id: &UserId,
        affiliate_code: &str,
    ) -> Result<PartnerAccount, ServiceError> {
        with_conflict_retry("apply", self.settings.conflict_retries, || async move {
            let mut tx = self.repo.begin().await?;
            let existing = Repository::load_partner(&mut tx, user_id).await?;
            let now = self.clock.now();

            let outcome = partner_ledger::apply(existing, user_id.clone(), affiliate_code, now)?;
            if let ApplyOutcome::Unchanged(account) = outcome {
                debug!(user_id = %user_id, code = %account.affiliate_code, "Partner application replayed");
                return Ok(account);
            }
            match &outcome {
                ApplyOutcome::Unchanged(_) => {}
                ApplyOutcome::Created(account) => {
                    ensure_code_free(&mut tx, user_id, &account.affiliate_code).await?;
                    Repository::insert_partner(&mut tx, account).await?;
                }
                ApplyOutcome::Reapplied(account) => {
                    ensure_code_free(&mut tx, user_id, &account.affiliate_code).await?;
                    save_or_conflict(&mut tx, account).await?;
                    Repository::replace_discount_codes(&mut tx, account).await?;
                }
            }
            tx.commit().await?;

            let account = outcome.into_account();
            info!(user_id = %user_id, code = %account.affiliate_code, "Partner application submitted");
            Ok(account)
        })
        .await
    }

    pub async fn approve(
        &self,
        user_id: &UserId,
        commission_rate: Option<Decimal>,
    ) -> Result<PartnerAccount, ServiceError> {
        let rate = commission_rate.unwrap_or(self.settings.default_commission_rate);
        with_conflict_retry("approve", self.settings.conflict_retries, || async move {
            let mut tx = self.repo.begin().await?;
            let mut account = load_or_not_found(&mut tx, user_id).await?;
            partner_ledger::approve(&mut account, rate, self.clock.now())?;
            save_or_conflict(&mut tx, &account).await?;
            tx.commit().await?;

            info!(user_id = %user_id, rate = %rate, "Partner approved");
            Ok(account)
        })
        .await
    }

    pub async fn reject(&self, user_id: &UserId) -> Result<PartnerAccount, ServiceError> {
        with_conflict_retry("reject", self.settings.conflict_retries, || async move {
            let mut tx = self.repo.begin().await?;
            let mut account = load_or_not_found(&mut tx, user_id).await?;
            partner_ledger::reject(&mut account)?;
            save_or_conflict(&mut tx, &account).await?;
            tx.commit().await?;

            info!(user_id = %user_id, "Partner rejected");
            Ok(account)
        })
        .await
    }

    /// Credit a settled order to the partner. Replaying an `order_ref` for
    /// the same partner is a no-op; one credited elsewhere is a conflict.
    pub async fn record_sale(
        &self,
        user_id: &UserId,
        order_ref: &str,
        amount: Decimal,
    ) -> Result<SaleOutcome, ServiceError> {
        let order_ref = order_ref.trim();
        if order_ref.is_empty() {
            return Err(LedgerError::MissingOrderRef.into());
        }

        with_conflict_retry("record_sale", self.settings.conflict_retries, || async move {
            let mut tx = self.repo.begin().await?;
            let mut account = load_or_not_found(&mut tx, user_id).await?;
            let before = account.clone();
            let credit = partner_ledger::record_sale(&mut account, amount, &self.settings.policy)?;

            let now = self.clock.now();
            if !Repository::insert_sale(&mut tx, user_id, order_ref, &credit, now).await? {
                match Repository::sale_owner(&mut tx, order_ref).await? {
                    Some(owner) if &owner != user_id => {
                        warn!(user_id = %user_id, owner = %owner, order_ref, "Order already credited to another partner");
                        return Err(LedgerError::OrderRefTaken(order_ref.to_string()).into());
                    }
                    _ => {}
                }
                debug!(user_id = %user_id, order_ref, "Sale already recorded");
                return Ok(SaleOutcome {
                    account: before,
                    credit: None,
                });
            }
            save_or_conflict(&mut tx, &account).await?;
            tx.commit().await?;

            info!(
                user_id = %user_id,
                order_ref,
                amount = %credit.sale_amount,
                commission = %credit.commission,
                "Sale credited"
            );
            Ok(SaleOutcome {
                account,
                credit: Some(credit),
            })
        })
        .await
    }

    pub async fn claim_reward(
        &self,
        user_id: &UserId,
        level: u32,
    ) -> Result<(PartnerAccount, RewardClaim), ServiceError> {
        with_conflict_retry("claim_reward", self.settings.conflict_retries, || async move {
            let mut tx = self.repo.begin().await?;
            let mut account = load_or_not_found(&mut tx, user_id).await?;
            let claim =
                partner_ledger::claim_reward(&mut account, &self.levels, level, self.clock.now())?;

            Repository::insert_reward_claim(&mut tx, user_id, &claim).await?;
            save_or_conflict(&mut tx, &account).await?;
            tx.commit().await?;

            info!(user_id = %user_id, level, reward = %claim.reward_amount, "Reward claimed");
            Ok((account, claim))
        })
        .await
    }

    pub async fn request_withdrawal(
        &self,
        user_id: &UserId,
        amount: Decimal,
        bank_info: BankInfo,
    ) -> Result<(PartnerAccount, Withdrawal), ServiceError> {
        let bank_info = &bank_info;
        with_conflict_retry("request_withdrawal", self.settings.conflict_retries, || async move {
            let mut tx = self.repo.begin().await?;
            let mut account = load_or_not_found(&mut tx, user_id).await?;
            let withdrawal = partner_ledger::request_withdrawal(
                &mut account,
                amount,
                bank_info.clone(),
                &self.settings.policy,
                self.clock.now(),
            )?;

            Repository::insert_withdrawal(&mut tx, user_id, &withdrawal).await?;
            save_or_conflict(&mut tx, &account).await?;
            tx.commit().await?;

            info!(user_id = %user_id, withdrawal_id = %withdrawal.id, amount = %amount, "Withdrawal requested");
            Ok((account, withdrawal))
        })
        .await
    }

    /// Admin payout decision for a pending withdrawal.
    pub async fn settle_withdrawal(
        &self,
        withdrawal_id: &str,
        approve: bool,
    ) -> Result<Withdrawal, ServiceError> {
        with_conflict_retry("settle_withdrawal", self.settings.conflict_retries, || async move {
            let mut tx = self.repo.begin().await?;
            let owner = Repository::withdrawal_owner(&mut tx, withdrawal_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("withdrawal {}", withdrawal_id)))?;
            let mut account = load_or_not_found(&mut tx, &owner).await?;
            let withdrawal = partner_ledger::settle_withdrawal(
                &mut account,
                withdrawal_id,
                approve,
                self.clock.now(),
            )?;

            Repository::update_withdrawal_status(&mut tx, &withdrawal).await?;
            save_or_conflict(&mut tx, &account).await?;
            tx.commit().await?;

            info!(
                user_id = %owner,
                withdrawal_id,
                status = withdrawal.status.as_str(),
                "Withdrawal settled"
            );
            Ok(withdrawal)
        })
        .await
    }
}

fn not_found(user_id: &UserId) -> ServiceError {
    ServiceError::NotFound(format!("partner account for {}", user_id))
}

async fn load_or_not_found(
    conn: &mut SqliteConnection,
    user_id: &UserId,
) -> Result<PartnerAccount, ServiceError> {
    Repository::load_partner(conn, user_id)
        .await?
        .ok_or_else(|| not_found(user_id))
}

async fn save_or_conflict(
    conn: &mut SqliteConnection,
    account: &PartnerAccount,
) -> Result<(), ServiceError> {
    if Repository::save_partner(conn, account).await? {
        Ok(())
    } else {
        Err(ServiceError::Conflict(format!(
            "partner account for {}",
            account.user_id
        )))
    }
}

async fn ensure_code_free(
    conn: &mut SqliteConnection,
    user_id: &UserId,
    code: &str,
) -> Result<(), ServiceError> {
    match Repository::affiliate_code_owner(conn, code).await? {
        Some(owner) if &owner != user_id => {
            Err(LedgerError::AffiliateCodeTaken(code.to_string()).into())
        }
        _ => Ok(()),
    }
}
