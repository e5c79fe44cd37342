//! Partner (affiliate) account and its append-only logs.

use crate::domain::{Decimal, TimeMs, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartnerStatus {
    Pending,
    Approved,
    Rejected,
}

impl PartnerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartnerStatus::Pending => "pending",
            PartnerStatus::Approved => "approved",
            PartnerStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for PartnerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PartnerStatus::Pending),
            "approved" => Ok(PartnerStatus::Approved),
            "rejected" => Ok(PartnerStatus::Rejected),
            other => Err(format!("unknown partner status: {}", other)),
        }
    }
}

impl std::fmt::Display for PartnerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payout destination, stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankInfo {
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
}

impl BankInfo {
    /// Name of the first blank field, if any.
    pub fn first_missing_field(&self) -> Option<&'static str> {
        [
            ("bankName", &self.bank_name),
            ("accountNumber", &self.account_number),
            ("accountName", &self.account_name),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Completed,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Completed => "completed",
        }
    }
}

impl FromStr for ClaimStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(ClaimStatus::Completed),
            other => Err(format!("unknown claim status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardClaim {
    pub id: String,
    pub level: u32,
    pub reward_amount: Decimal,
    pub claimed_at: TimeMs,
    pub status: ClaimStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Completed,
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for WithdrawalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WithdrawalStatus::Pending),
            "completed" => Ok(WithdrawalStatus::Completed),
            "rejected" => Ok(WithdrawalStatus::Rejected),
            other => Err(format!("unknown withdrawal status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    pub id: String,
    pub amount: Decimal,
    pub status: WithdrawalStatus,
    pub bank_info: BankInfo,
    pub requested_at: TimeMs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<TimeMs>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountCode {
    pub code: String,
    pub percent_off: u32,
    pub active: bool,
}

/// Server-owned partner record.
///
/// Invariant: `total_commission == available_commission + paid_commission`.
/// `claimed_levels` only ever grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerAccount {
    pub user_id: UserId,
    pub affiliate_code: String,
    pub status: PartnerStatus,
    /// Unset until approval.
    pub commission_rate: Option<Decimal>,
    pub total_sales: Decimal,
    pub total_commission: Decimal,
    pub available_commission: Decimal,
    pub paid_commission: Decimal,
    pub partner_points: Decimal,
    pub claimed_levels: BTreeSet<u32>,
    pub reward_claims: Vec<RewardClaim>,
    pub withdrawals: Vec<Withdrawal>,
    pub discount_codes: Vec<DiscountCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_bank_info: Option<BankInfo>,
    pub applied_at: TimeMs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<TimeMs>,
    /// Optimistic concurrency token; bumped on every persisted mutation.
    #[serde(skip)]
    pub version: i64,
}

impl PartnerAccount {
    /// Fresh pending application with every counter at zero.
    pub fn pending(user_id: UserId, affiliate_code: String, now: TimeMs) -> Self {
        let discount_codes = vec![DiscountCode::default_for(&affiliate_code)];
        Self {
            user_id,
            affiliate_code,
            status: PartnerStatus::Pending,
            commission_rate: None,
            total_sales: Decimal::zero(),
            total_commission: Decimal::zero(),
            available_commission: Decimal::zero(),
            paid_commission: Decimal::zero(),
            partner_points: Decimal::zero(),
            claimed_levels: BTreeSet::new(),
            reward_claims: Vec::new(),
            withdrawals: Vec::new(),
            discount_codes,
            last_bank_info: None,
            applied_at: now,
            approved_at: None,
            version: 0,
        }
    }

    pub fn commission_balanced(&self) -> bool {
        self.total_commission == self.available_commission + self.paid_commission
    }
}

impl DiscountCode {
    pub const DEFAULT_PERCENT_OFF: u32 = 10;

    /// The code handed out with every application: `<AFFILIATE_CODE>10`.
    pub fn default_for(affiliate_code: &str) -> Self {
        Self {
            code: format!("{}{}", affiliate_code, Self::DEFAULT_PERCENT_OFF),
            percent_off: Self::DEFAULT_PERCENT_OFF,
            active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_account_starts_balanced_and_empty() {
        let account =
            PartnerAccount::pending(UserId::new("u1"), "SMASH".to_string(), TimeMs::new(5));
        assert_eq!(account.status, PartnerStatus::Pending);
        assert!(account.commission_rate.is_none());
        assert!(account.commission_balanced());
        assert!(account.partner_points.is_zero());
        assert_eq!(account.discount_codes.len(), 1);
        assert_eq!(account.discount_codes[0].code, "SMASH10");
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            PartnerStatus::Pending,
            PartnerStatus::Approved,
            PartnerStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<PartnerStatus>().unwrap(), status);
        }
        assert!("archived".parse::<PartnerStatus>().is_err());
    }

    #[test]
    fn test_bank_info_missing_field() {
        let info = BankInfo {
            bank_name: "First Bank".to_string(),
            account_number: "  ".to_string(),
            account_name: "Lin".to_string(),
        };
        assert_eq!(info.first_missing_field(), Some("accountNumber"));
    }

    #[test]
    fn test_version_is_not_serialized() {
        let account =
            PartnerAccount::pending(UserId::new("u1"), "SMASH".to_string(), TimeMs::new(5));
        let json = serde_json::to_value(&account).unwrap();
        assert!(json.get("version").is_none());
        assert_eq!(json["status"], "pending");
        assert_eq!(json["totalCommission"], "0");
    }
}
