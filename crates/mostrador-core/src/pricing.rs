//! # Pricing Calculator
//!
//! Derives per-payment-method unit prices and cart totals.
//!
//! ## Price Derivation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  unit_base_price ──► × multiplier(method) ──► unit price               │
//! │                                                   │                     │
//! │                                      × quantity   ▼                     │
//! │                                              line total                 │
//! │                                                   │  Σ                  │
//! │                                                   ▼                     │
//! │                     subtotal ──► tax = subtotal × 13% ──► total         │
//! │                                                                         │
//! │  Split payments are priced at base (no method surcharge): a card       │
//! │  surcharge on part of a document has no single line price to print.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is a pure function. Negative prices never reach it: the
//! cart rejects them on entry, so a negative input is a programming error
//! and only trips a debug assertion.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::LineItem;
use crate::money::Money;
use crate::types::{PaymentMethod, PriceMultiplier, ProductId};
use crate::TAX_RATE;

// =============================================================================
// Multiplier Table
// =============================================================================

/// Price multiplier per payment method.
///
/// Store configuration, loaded by the engine; defaults to a 5% card surcharge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MultiplierTable {
    pub cash: PriceMultiplier,
    pub card: PriceMultiplier,
    pub transfer: PriceMultiplier,
    pub sinpe_mobile: PriceMultiplier,
}

impl MultiplierTable {
    pub fn multiplier(&self, method: PaymentMethod) -> PriceMultiplier {
        match method {
            PaymentMethod::Cash => self.cash,
            PaymentMethod::Card => self.card,
            PaymentMethod::Transfer => self.transfer,
            PaymentMethod::SinpeMobile => self.sinpe_mobile,
        }
    }
}

impl Default for MultiplierTable {
    fn default() -> Self {
        MultiplierTable {
            cash: PriceMultiplier::IDENTITY,
            card: PriceMultiplier::from_bps(10_500),
            transfer: PriceMultiplier::IDENTITY,
            sinpe_mobile: PriceMultiplier::IDENTITY,
        }
    }
}

// =============================================================================
// Pricing Mode
// =============================================================================

/// Which price list a cart is totalled under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case", tag = "mode", content = "method")]
pub enum PricingMode {
    /// One payment method covers the whole document.
    Method(PaymentMethod),
    /// Several methods share the total; base prices apply.
    Split,
}

// =============================================================================
// Totals
// =============================================================================

/// Subtotal, tax and total of a cart under one pricing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

impl Totals {
    /// Builds totals from a subtotal using the fixed tax rate.
    pub fn from_subtotal(subtotal: Money) -> Self {
        let tax = subtotal.calculate_tax(TAX_RATE);
        Totals {
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }
}

/// A line with its price under the chosen mode (receipt and document lines).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricedLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i64,
    pub unit_base_price: Money,
    pub unit_price: Money,
    pub line_total: Money,
}

// =============================================================================
// Calculator
// =============================================================================

/// Applies a [`MultiplierTable`] and the fixed tax rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PricingCalculator {
    table: MultiplierTable,
}

impl PricingCalculator {
    pub fn new(table: MultiplierTable) -> Self {
        PricingCalculator { table }
    }

    pub fn table(&self) -> &MultiplierTable {
        &self.table
    }

    /// `base × multiplier(method)`, rounded to the cent.
    pub fn unit_price(&self, base: Money, method: PaymentMethod) -> Money {
        debug_assert!(!base.is_negative(), "negative base price {base}");
        base.apply_multiplier(self.table.multiplier(method))
    }

    /// Unit price under a pricing mode.
    pub fn unit_price_for(&self, base: Money, mode: PricingMode) -> Money {
        match mode {
            PricingMode::Method(method) => self.unit_price(base, method),
            PricingMode::Split => {
                debug_assert!(!base.is_negative(), "negative base price {base}");
                base
            }
        }
    }

    /// Prices every line of a cart.
    pub fn price_lines(&self, lines: &[LineItem], mode: PricingMode) -> Vec<PricedLine> {
        lines
            .iter()
            .map(|line| {
                debug_assert!(line.quantity >= 1, "line quantity below 1");
                let unit_price = self.unit_price_for(line.unit_base_price, mode);
                PricedLine {
                    product_id: line.product_id,
                    name: line.name.clone(),
                    quantity: line.quantity,
                    unit_base_price: line.unit_base_price,
                    unit_price,
                    line_total: unit_price.multiply_quantity(line.quantity),
                }
            })
            .collect()
    }

    /// `subtotal = Σ unit_price × qty`, `tax = subtotal × 13%`, `total = subtotal + tax`.
    ///
    /// ## Example
    /// ```rust
    /// use mostrador_core::cart::LineItem;
    /// use mostrador_core::money::Money;
    /// use mostrador_core::pricing::{PricingCalculator, PricingMode};
    /// use mostrador_core::types::{PaymentMethod, ProductId};
    ///
    /// let line = LineItem::new(ProductId(1), "Pastillas de freno", Money::from_major(1000), 5, 5).unwrap();
    /// let totals = PricingCalculator::default()
    ///     .totals(&[line], PricingMode::Method(PaymentMethod::Cash));
    ///
    /// assert_eq!(totals.subtotal, Money::from_major(5000));
    /// assert_eq!(totals.tax, Money::from_major(650));
    /// assert_eq!(totals.total, Money::from_major(5650));
    /// ```
    pub fn totals(&self, lines: &[LineItem], mode: PricingMode) -> Totals {
        let subtotal = self
            .price_lines(lines, mode)
            .iter()
            .map(|l| l.line_total)
            .sum();
        Totals::from_subtotal(subtotal)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
