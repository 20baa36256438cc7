//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Split payment check in floating point:                                │
//! │    3000.10 + 2649.90 == 5650.00 ?  → sometimes false  ❌               │
//! │                                                                         │
//! │  Card surcharge in floating point:                                     │
//! │    1000 × 1.05 = 1050.0000000000002                                    │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units (céntimos)                          │
//! │    Every multiplier and tax rate is in basis points, and every         │
//! │    multiplication rounds half-up to the cent exactly once.             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use mostrador_core::money::Money;
//!
//! let base = Money::from_major(1000); // ₡1000.00
//! assert_eq!(base.cents(), 100_000);
//!
//! let line = base * 5;
//! assert_eq!(line, Money::from_major(5000));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::types::{PriceMultiplier, TaxRate};

/// Basis point denominator: 10000 bps = 100%.
const BPS_SCALE: i128 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (céntimos).
///
/// ## Design Decisions
/// - **i64 (signed)**: payment deltas are signed (remaining vs. excess)
/// - **Single field tuple struct**: zero-cost abstraction over i64
///
/// ## Where Money Flows
/// ```text
/// LineItem.unit_base_price ──► PricingCalculator ──► Totals.subtotal
///                                                        │
///                                   Totals.tax ◄─────────┤
///                                                        ▼
///                           PaymentSplit.amount ──► Totals.total
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole currency units.
    ///
    /// ## Example
    /// ```rust
    /// use mostrador_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(5650).cents(), 565_000);
    /// ```
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Returns `self - other`, floored at zero.
    ///
    /// Used wherever a "what is still owed" figure must never go negative.
    #[inline]
    pub fn saturating_remaining(self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }

    /// Calculates tax, rounding half-up to the cent.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`.
    ///
    /// ## Example
    /// ```rust
    /// use mostrador_core::money::Money;
    /// use mostrador_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_major(5000);
    /// let tax = subtotal.calculate_tax(TaxRate::from_bps(1300)); // 13%
    /// assert_eq!(tax, Money::from_major(650));
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        Money::from_cents(scale_bps(self.0, rate.bps()))
    }

    /// Applies a payment-method price multiplier, rounding half-up.
    ///
    /// ## Example
    /// ```rust
    /// use mostrador_core::money::Money;
    /// use mostrador_core::types::PriceMultiplier;
    ///
    /// let base = Money::from_major(1000);
    /// let card = base.apply_multiplier(PriceMultiplier::from_bps(10500)); // ×1.05
    /// assert_eq!(card, Money::from_major(1050));
    /// ```
    pub fn apply_multiplier(&self, multiplier: PriceMultiplier) -> Money {
        Money::from_cents(scale_bps(self.0, multiplier.bps()))
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

/// `amount * bps / 10000`, half-up, computed in i128 so large carts cannot overflow.
fn scale_bps(amount: i64, bps: u32) -> i64 {
    let scaled = amount as i128 * bps as i128;
    let rounded = if scaled >= 0 {
        (scaled + BPS_SCALE / 2) / BPS_SCALE
    } else {
        (scaled - BPS_SCALE / 2) / BPS_SCALE
    };
    rounded as i64
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money with the colón sign. For debugging and logs; the UI formats
/// amounts itself.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₡{}.{:02}", sign, self.major().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_major() {
        let money = Money::from_major(1099);
        assert_eq!(money.cents(), 109_900);
        assert_eq!(money.major(), 1099);
        assert_eq!(money.cents_part(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "₡10.99");
        assert_eq!(format!("{}", Money::from_major(5650)), "₡5650.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-₡5.50");
        assert_eq!(format!("{}", Money::zero()), "₡0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!((-a).cents(), -1000);
    }

    #[test]
    fn test_sum() {
        let amounts = [Money::from_major(3000), Money::from_major(2650)];
        let total: Money = amounts.iter().sum();
        assert_eq!(total, Money::from_major(5650));
    }

    #[test]
    fn test_tax_thirteen_percent() {
        let subtotal = Money::from_major(5000);
        let tax = subtotal.calculate_tax(TaxRate::from_bps(1300));
        assert_eq!(tax, Money::from_major(650));
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // 0.50 at 13% = 0.065 → 0.07
        let tax = Money::from_cents(50).calculate_tax(TaxRate::from_bps(1300));
        assert_eq!(tax.cents(), 7);
    }

    #[test]
    fn test_multiplier_rounding() {
        // 0.99 × 1.05 = 1.0395 → 1.04
        let price = Money::from_cents(99).apply_multiplier(PriceMultiplier::from_bps(10500));
        assert_eq!(price.cents(), 104);

        let identity = Money::from_cents(12_345).apply_multiplier(PriceMultiplier::IDENTITY);
        assert_eq!(identity.cents(), 12_345);
    }

    #[test]
    fn test_negative_scaling_is_symmetric() {
        let positive = Money::from_cents(50).calculate_tax(TaxRate::from_bps(1300));
        let negative = Money::from_cents(-50).calculate_tax(TaxRate::from_bps(1300));
        assert_eq!(positive, -negative);
    }

    #[test]
    fn test_saturating_remaining() {
        let total = Money::from_major(100);
        assert_eq!(total.saturating_remaining(Money::from_major(40)), Money::from_major(60));
        assert_eq!(total.saturating_remaining(Money::from_major(140)), Money::zero());
    }
}
