//! Bounds on amounts that arrive from outside (bids, prices, sales,
//! withdrawals).

use crate::domain::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;

/// Largest amount accepted anywhere. Running totals stay far below the
/// range of the underlying decimal.
pub const DEFAULT_MAXIMUM_AMOUNT: Decimal = Decimal::new(dec!(1000000000000));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountRules {
    /// Fractional digits of the smallest currency unit.
    pub currency_scale: u32,
    pub maximum: Decimal,
}

impl Default for AmountRules {
    fn default() -> Self {
        Self {
            currency_scale: 2,
            maximum: DEFAULT_MAXIMUM_AMOUNT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount must not exceed {maximum}")]
    TooLarge { maximum: Decimal },
    #[error("amount must have at most {scale} decimal places")]
    TooPrecise { scale: u32 },
}

impl AmountError {
    pub fn code(&self) -> &'static str {
        match self {
            AmountError::TooLarge { .. } => "AMOUNT_TOO_LARGE",
            AmountError::TooPrecise { .. } => "INVALID_AMOUNT_PRECISION",
        }
    }
}

impl AmountRules {
    /// Reject amounts above the maximum or finer than the currency unit.
    /// Sign checks stay with the caller.
    pub fn check(&self, amount: Decimal) -> Result<Decimal, AmountError> {
        if amount > self.maximum {
            return Err(AmountError::TooLarge {
                maximum: self.maximum,
            });
        }
        if !amount.fits_scale(self.currency_scale) {
            return Err(AmountError::TooPrecise {
                scale: self.currency_scale,
            });
        }
        Ok(amount)
    }
}
