//! Monetary amounts.

use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Number of fractional digits kept for every amount.
pub const CURRENCY_SCALE: u32 = 2;

/// Largest amount a `NUMERIC(12,2)` column holds.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, CURRENCY_SCALE);

/// Non-negative decimal amount with currency precision (two fractional digits).
///
/// Serialized as a decimal string (`"10.00"`) so no precision is lost in
/// transit; deserialization accepts either a string or a JSON number and runs
/// the same validation as [`Money::new`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub fn new(amount: Decimal) -> DomainResult<Self> {
        if amount < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "amount cannot be negative: {amount}"
            )));
        }
        if amount > MAX_AMOUNT {
            return Err(DomainError::validation(format!(
                "amount cannot exceed {MAX_AMOUNT}: {amount}"
            )));
        }
        let normalized = amount.normalize();
        if normalized.scale() > CURRENCY_SCALE {
            return Err(DomainError::validation(format!(
                "amount cannot have more than {CURRENCY_SCALE} decimal places: {amount}"
            )));
        }
        let mut amount = normalized;
        amount.rescale(CURRENCY_SCALE);
        Ok(Self(amount))
    }

    /// Build an amount from the smallest currency unit (e.g. cents).
    pub fn from_cents(cents: i64) -> DomainResult<Self> {
        Self::new(Decimal::new(cents, CURRENCY_SCALE))
    }

    pub fn zero() -> Self {
        Self(Decimal::new(0, CURRENCY_SCALE))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Extended price for `quantity` units.
    pub fn times(self, quantity: i64) -> DomainResult<Self> {
        let extended = self
            .0
            .checked_mul(Decimal::from(quantity))
            .ok_or_else(|| DomainError::invariant("amount overflow"))?;
        Self::new(extended)
    }

    pub fn checked_add(self, other: Self) -> DomainResult<Self> {
        let sum = self
            .0
            .checked_add(other.0)
            .ok_or_else(|| DomainError::invariant("amount overflow"))?;
        Self::new(sum)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl TryFrom<Decimal> for Money {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl FromStr for Money {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = s
            .trim()
            .parse::<Decimal>()
            .map_err(|e| DomainError::validation(format!("invalid amount '{s}': {e}")))?;
        Self::new(amount)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
