//! Partner account operations for the repository.

use super::{decode_decimal, decode_enum, decode_optional_decimal, decode_time, Repository};
use crate::domain::{
    BankInfo, Decimal, DiscountCode, PartnerAccount, RewardClaim, TimeMs, UserId, Withdrawal,
};
use crate::engine::SaleCredit;
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;

impl Repository {
    /// Read a partner account outside any transaction. May be stale; never
    /// use the result to authorize a write.
    pub async fn get_partner(&self, user_id: &UserId) -> Result<Option<PartnerAccount>, sqlx::Error> {
        let mut conn = self.acquire().await?;
        Self::load_partner(&mut conn, user_id).await
    }

    /// Load the full account, logs included.
    pub async fn load_partner(
        conn: &mut SqliteConnection,
        user_id: &UserId,
    ) -> Result<Option<PartnerAccount>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT user_id, affiliate_code, status, commission_rate, total_sales,
                   total_commission, available_commission, paid_commission, partner_points,
                   bank_name, account_number, account_name, applied_at, approved_at, version
            FROM partner_accounts
            WHERE user_id = ?
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&mut *conn)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let last_bank_info = match (
            row.get::<Option<String>, _>("bank_name"),
            row.get::<Option<String>, _>("account_number"),
            row.get::<Option<String>, _>("account_name"),
        ) {
            (Some(bank_name), Some(account_number), Some(account_name)) => Some(BankInfo {
                bank_name,
                account_number,
                account_name,
            }),
            _ => None,
        };

        let reward_claims = Self::load_reward_claims(conn, user_id).await?;
        let claimed_levels = reward_claims.iter().map(|c| c.level).collect();

        Ok(Some(PartnerAccount {
            user_id: UserId::new(row.get::<String, _>("user_id")),
            affiliate_code: row.get("affiliate_code"),
            status: decode_enum("status", &row.get::<String, _>("status"))?,
            commission_rate: decode_optional_decimal("commission_rate", row.get("commission_rate"))?,
            total_sales: decode_decimal("total_sales", &row.get::<String, _>("total_sales"))?,
            total_commission: decode_decimal(
                "total_commission",
                &row.get::<String, _>("total_commission"),
            )?,
            available_commission: decode_decimal(
                "available_commission",
                &row.get::<String, _>("available_commission"),
            )?,
            paid_commission: decode_decimal(
                "paid_commission",
                &row.get::<String, _>("paid_commission"),
            )?,
            partner_points: decode_decimal("partner_points", &row.get::<String, _>("partner_points"))?,
            claimed_levels,
            reward_claims,
            withdrawals: Self::load_withdrawals(conn, user_id).await?,
            discount_codes: Self::load_discount_codes(conn, user_id).await?,
            last_bank_info,
            applied_at: TimeMs::new(row.get("applied_at")),
            approved_at: decode_time(row.get("approved_at")),
            version: row.get("version"),
        }))
    }

    async fn load_reward_claims(
        conn: &mut SqliteConnection,
        user_id: &UserId,
    ) -> Result<Vec<RewardClaim>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, level, reward_amount, claimed_at, status
            FROM reward_claims
            WHERE user_id = ?
            ORDER BY claimed_at ASC, level ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&mut *conn)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(RewardClaim {
                    id: row.get("id"),
                    level: row.get::<i64, _>("level") as u32,
                    reward_amount: decode_decimal(
                        "reward_amount",
                        &row.get::<String, _>("reward_amount"),
                    )?,
                    claimed_at: TimeMs::new(row.get("claimed_at")),
                    status: decode_enum("status", &row.get::<String, _>("status"))?,
                })
            })
            .collect()
    }

    async fn load_withdrawals(
        conn: &mut SqliteConnection,
        user_id: &UserId,
    ) -> Result<Vec<Withdrawal>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, amount, status, bank_name, account_number, account_name,
                   requested_at, settled_at
            FROM withdrawals
            WHERE user_id = ?
            ORDER BY requested_at ASC, rowid ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&mut *conn)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Withdrawal {
                    id: row.get("id"),
                    amount: decode_decimal("amount", &row.get::<String, _>("amount"))?,
                    status: decode_enum("status", &row.get::<String, _>("status"))?,
                    bank_info: BankInfo {
                        bank_name: row.get("bank_name"),
                        account_number: row.get("account_number"),
                        account_name: row.get("account_name"),
                    },
                    requested_at: TimeMs::new(row.get("requested_at")),
                    settled_at: decode_time(row.get("settled_at")),
                })
            })
            .collect()
    }

    async fn load_discount_codes(
        conn: &mut SqliteConnection,
        user_id: &UserId,
    ) -> Result<Vec<DiscountCode>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT code, percent_off, active FROM discount_codes WHERE user_id = ? ORDER BY code ASC",
        )
        .bind(user_id.as_str())
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows
            .iter()
            .map(|row| DiscountCode {
                code: row.get("code"),
                percent_off: row.get::<i64, _>("percent_off") as u32,
                active: row.get::<i64, _>("active") != 0,
            })
            .collect())
    }

    /// Owner of an affiliate code, if any.
    pub async fn affiliate_code_owner(
        conn: &mut SqliteConnection,
        code: &str,
    ) -> Result<Option<UserId>, sqlx::Error> {
        let row = sqlx::query("SELECT user_id FROM partner_accounts WHERE affiliate_code = ?")
            .bind(code)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(|r| UserId::new(r.get::<String, _>("user_id"))))
    }

    /// Insert a brand-new account and its discount codes.
    pub async fn insert_partner(
        conn: &mut SqliteConnection,
        account: &PartnerAccount,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO partner_accounts (
                user_id, affiliate_code, status, commission_rate, total_sales,
                total_commission, available_commission, paid_commission, partner_points,
                bank_name, account_number, account_name, applied_at, approved_at, version
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(account.user_id.as_str())
        .bind(&account.affiliate_code)
        .bind(account.status.as_str())
        .bind(account.commission_rate.map(|d| d.to_canonical_string()))
        .bind(account.total_sales.to_canonical_string())
        .bind(account.total_commission.to_canonical_string())
        .bind(account.available_commission.to_canonical_string())
        .bind(account.paid_commission.to_canonical_string())
        .bind(account.partner_points.to_canonical_string())
        .bind(account.last_bank_info.as_ref().map(|b| b.bank_name.as_str()))
        .bind(account.last_bank_info.as_ref().map(|b| b.account_number.as_str()))
        .bind(account.last_bank_info.as_ref().map(|b| b.account_name.as_str()))
        .bind(account.applied_at.as_ms())
        .bind(account.approved_at.map(|t| t.as_ms()))
        .execute(&mut *conn)
        .await?;

        Self::replace_discount_codes(conn, account).await
    }

    /// Write the account's scalar fields if nobody else has since `account.version`.
    ///
    /// Returns `false` on a version mismatch; the caller must roll back.
    pub async fn save_partner(
        conn: &mut SqliteConnection,
        account: &PartnerAccount,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE partner_accounts SET
                affiliate_code = ?, status = ?, commission_rate = ?, total_sales = ?,
                total_commission = ?, available_commission = ?, paid_commission = ?,
                partner_points = ?, bank_name = ?, account_number = ?, account_name = ?,
                applied_at = ?, approved_at = ?, version = version + 1
            WHERE user_id = ? AND version = ?
            "#,
        )
        .bind(&account.affiliate_code)
        .bind(account.status.as_str())
        .bind(account.commission_rate.map(|d| d.to_canonical_string()))
        .bind(account.total_sales.to_canonical_string())
        .bind(account.total_commission.to_canonical_string())
        .bind(account.available_commission.to_canonical_string())
        .bind(account.paid_commission.to_canonical_string())
        .bind(account.partner_points.to_canonical_string())
        .bind(account.last_bank_info.as_ref().map(|b| b.bank_name.as_str()))
        .bind(account.last_bank_info.as_ref().map(|b| b.account_number.as_str()))
        .bind(account.last_bank_info.as_ref().map(|b| b.account_name.as_str()))
        .bind(account.applied_at.as_ms())
        .bind(account.approved_at.map(|t| t.as_ms()))
        .bind(account.user_id.as_str())
        .bind(account.version)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Replace the account's discount codes with the in-memory set.
    pub async fn replace_discount_codes(
        conn: &mut SqliteConnection,
        account: &PartnerAccount,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM discount_codes WHERE user_id = ?")
            .bind(account.user_id.as_str())
            .execute(&mut *conn)
            .await?;

        for code in &account.discount_codes {
            sqlx::query(
                "INSERT INTO discount_codes (code, user_id, percent_off, active) VALUES (?, ?, ?, ?)",
            )
            .bind(&code.code)
            .bind(account.user_id.as_str())
            .bind(code.percent_off as i64)
            .bind(code.active as i64)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    pub async fn insert_reward_claim(
        conn: &mut SqliteConnection,
        user_id: &UserId,
        claim: &RewardClaim,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO reward_claims (id, user_id, level, reward_amount, claimed_at, status)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&claim.id)
        .bind(user_id.as_str())
        .bind(claim.level as i64)
        .bind(claim.reward_amount.to_canonical_string())
        .bind(claim.claimed_at.as_ms())
        .bind(claim.status.as_str())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn insert_withdrawal(
        conn: &mut SqliteConnection,
        user_id: &UserId,
        withdrawal: &Withdrawal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO withdrawals (
                id, user_id, amount, status, bank_name, account_number, account_name,
                requested_at, settled_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&withdrawal.id)
        .bind(user_id.as_str())
        .bind(withdrawal.amount.to_canonical_string())
        .bind(withdrawal.status.as_str())
        .bind(&withdrawal.bank_info.bank_name)
        .bind(&withdrawal.bank_info.account_number)
        .bind(&withdrawal.bank_info.account_name)
        .bind(withdrawal.requested_at.as_ms())
        .bind(withdrawal.settled_at.map(|t| t.as_ms()))
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn update_withdrawal_status(
        conn: &mut SqliteConnection,
        withdrawal: &Withdrawal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE withdrawals SET status = ?, settled_at = ? WHERE id = ?")
            .bind(withdrawal.status.as_str())
            .bind(withdrawal.settled_at.map(|t| t.as_ms()))
            .bind(&withdrawal.id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Owner of a withdrawal, for admin settlement by id.
    pub async fn withdrawal_owner(
        conn: &mut SqliteConnection,
        withdrawal_id: &str,
    ) -> Result<Option<UserId>, sqlx::Error> {
        let row = sqlx::query("SELECT user_id FROM withdrawals WHERE id = ?")
            .bind(withdrawal_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(|r| UserId::new(r.get::<String, _>("user_id"))))
    }

    /// Record a settled sale idempotently.
    ///
    /// Returns `false` if `order_ref` was already recorded.
    pub async fn insert_sale(
        conn: &mut SqliteConnection,
        user_id: &UserId,
        order_ref: &str,
        credit: &SaleCredit,
        recorded_at: TimeMs,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO partner_sales (order_ref, user_id, amount, commission, points, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(order_ref) DO NOTHING
            "#,
        )
        .bind(order_ref)
        .bind(user_id.as_str())
        .bind(credit.sale_amount.to_canonical_string())
        .bind(credit.commission.to_canonical_string())
        .bind(credit.points.to_canonical_string())
        .bind(recorded_at.as_ms())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Partner an `order_ref` was credited to, if any.
    pub async fn sale_owner(
        conn: &mut SqliteConnection,
        order_ref: &str,
    ) -> Result<Option<UserId>, sqlx::Error> {
        let row = sqlx::query("SELECT user_id FROM partner_sales WHERE order_ref = ?")
            .bind(order_ref)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(|r| UserId::new(r.get::<String, _>("user_id"))))
    }

    /// Sum of recorded sale amounts for an account, for reconciliation.
    pub async fn sum_recorded_sales(&self, user_id: &UserId) -> Result<Decimal, sqlx::Error> {
        let rows = sqlx::query("SELECT amount FROM partner_sales WHERE user_id = ?")
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| decode_decimal("amount", &row.get::<String, _>("amount")))
            .sum()
    }
}
