//! Money type
//!
//! Domain primitive for monetary values held as integer cents.
//! Floating point is only ever used at the edges (display and input parsing);
//! all arithmetic happens on the cent count.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops;

use super::DomainError;

/// Currency prefix used by [`Money::format`]
const CURRENCY_SYMBOL: &str = "R$";

/// Money represents a non-negative amount in minor currency units.
///
/// # Invariants
/// - Value is always >= 0
/// - Every operation returns a new value
///
/// # Example
/// ```
/// use wallet_ledger::domain::Money;
///
/// let price = Money::from_float(12.5).unwrap();
/// assert_eq!(price.to_cents(), 1250);
/// assert_eq!(price.format(), "R$ 12,50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Money(i64);

impl Money {
    /// Create Money from a cent count.
    ///
    /// # Errors
    /// - `DomainError::InvalidAmount` if `cents < 0`
    pub fn from_cents(cents: i64) -> Result<Self, DomainError> {
        if cents < 0 {
            return Err(DomainError::InvalidAmount(format!(
                "money cannot be negative (got {} cents)",
                cents
            )));
        }

        Ok(Self(cents))
    }

    /// Create Money from a major-unit float, rounding to the nearest cent.
    pub fn from_float(amount: f64) -> Result<Self, DomainError> {
        let cents = (amount * 100.0).round();
        if !cents.is_finite() || cents >= i64::MAX as f64 || cents < i64::MIN as f64 {
            return Err(DomainError::InvalidAmount(format!(
                "amount out of range: {}",
                amount
            )));
        }

        Self::from_cents(cents as i64)
    }

    /// Create Money from an exact decimal in major units.
    ///
    /// Rounds half away from zero to two decimal places, then applies the
    /// same rules as [`Money::from_cents`].
    pub fn from_decimal(amount: Decimal) -> Result<Self, DomainError> {
        let out_of_range = || DomainError::InvalidAmount(format!("amount out of range: {}", amount));

        let cents = amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or_else(out_of_range)?
            .to_i64()
            .ok_or_else(out_of_range)?;

        Self::from_cents(cents)
    }

    /// The additive identity
    pub fn zero() -> Self {
        Self(0)
    }

    /// Sum of two amounts. Saturates at `i64::MAX` cents instead of wrapping.
    pub fn add(&self, other: &Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }

    /// Difference of two amounts.
    ///
    /// # Errors
    /// - `DomainError::InvalidAmount` if the result would be negative
    pub fn subtract(&self, other: &Money) -> Result<Money, DomainError> {
        let result = self.0 - other.0;
        if result < 0 {
            return Err(DomainError::InvalidAmount(format!(
                "result cannot be negative ({} - {})",
                self, other
            )));
        }

        Ok(Money(result))
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_less_than(&self, other: &Money) -> bool {
        self.0 < other.0
    }

    pub fn is_greater_than(&self, other: &Money) -> bool {
        self.0 > other.0
    }

    pub fn is_greater_than_or_equal(&self, other: &Money) -> bool {
        self.0 >= other.0
    }

    /// Get the cent count
    pub fn to_cents(&self) -> i64 {
        self.0
    }

    /// Major units as a float (display only)
    pub fn to_float(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Locale-style display: `R$ 1.234,56`
    pub fn format(&self) -> String {
        let units = (self.0 / 100).to_string();
        let fraction = self.0 % 100;

        // Thousands separator every three digits from the right
        let mut grouped = String::with_capacity(units.len() + units.len() / 3);
        for (i, digit) in units.chars().enumerate() {
            if i > 0 && (units.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(digit);
        }

        format!("{} {},{:02}", CURRENCY_SYMBOL, grouped, fraction)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl TryFrom<i64> for Money {
    type Error = DomainError;

    fn try_from(cents: i64) -> Result<Self, Self::Error> {
        Money::from_cents(cents)
    }
}

impl From<Money> for i64 {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money::add(&self, &rhs)
    }
}

// Note: no Sub impl, subtraction can fail and goes through `subtract`

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}
