//! Static reward tier table.

use crate::domain::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use thiserror::Error;

/// One reward tier: reaching `points_required` unlocks a one-off `reward`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardLevel {
    pub level: u32,
    pub points_required: Decimal,
    pub reward: Decimal,
}

impl RewardLevel {
    pub fn new(level: u32, points_required: Decimal, reward: Decimal) -> Self {
        Self {
            level,
            points_required,
            reward,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RewardTableError {
    #[error("reward table must not be empty")]
    Empty,
    #[error("level numbers must be strictly increasing (at level {0})")]
    LevelOrder(u32),
    #[error("points thresholds must be strictly increasing (at level {0})")]
    ThresholdOrder(u32),
    #[error("reward must be non-negative (at level {0})")]
    NegativeReward(u32),
}

/// Ordered list of reward levels. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardTable {
    levels: Vec<RewardLevel>,
}

impl RewardTable {
    /// Build a table, checking that levels and thresholds strictly increase.
    pub fn new(levels: Vec<RewardLevel>) -> Result<Self, RewardTableError> {
        if levels.is_empty() {
            return Err(RewardTableError::Empty);
        }
        for pair in levels.windows(2) {
            if pair[1].level <= pair[0].level {
                return Err(RewardTableError::LevelOrder(pair[1].level));
            }
            if pair[1].points_required <= pair[0].points_required {
                return Err(RewardTableError::ThresholdOrder(pair[1].level));
            }
        }
        if let Some(bad) = levels.iter().find(|l| l.reward.is_negative()) {
            return Err(RewardTableError::NegativeReward(bad.level));
        }
        Ok(Self { levels })
    }

    pub fn levels(&self) -> &[RewardLevel] {
        &self.levels
    }

    pub fn get(&self, level: u32) -> Option<&RewardLevel> {
        self.levels.iter().find(|l| l.level == level)
    }

    /// Highest level whose threshold is met. Meeting a threshold exactly counts.
    pub fn current_level(&self, points: Decimal) -> Option<&RewardLevel> {
        self.levels
            .iter()
            .take_while(|l| l.points_required <= points)
            .last()
    }

    /// First level whose threshold is not yet met.
    pub fn next_level(&self, points: Decimal) -> Option<&RewardLevel> {
        self.levels.iter().find(|l| l.points_required > points)
    }

    /// All levels whose threshold is met.
    pub fn unlocked(&self, points: Decimal) -> impl Iterator<Item = &RewardLevel> {
        self.levels
            .iter()
            .take_while(move |l| l.points_required <= points)
    }
}

impl Default for RewardTable {
    fn default() -> Self {
        Self {
            levels: vec![
                RewardLevel::new(1, Decimal::new(dec!(100)), Decimal::new(dec!(300))),
                RewardLevel::new(2, Decimal::new(dec!(300)), Decimal::new(dec!(1200))),
                RewardLevel::new(3, Decimal::new(dec!(800)), Decimal::new(dec!(4000))),
                RewardLevel::new(4, Decimal::new(dec!(2000)), Decimal::new(dec!(12000))),
                RewardLevel::new(5, Decimal::new(dec!(5000)), Decimal::new(dec!(35000))),
            ],
        }
    }
}
