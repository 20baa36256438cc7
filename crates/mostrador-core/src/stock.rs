//! # Stock Reconciliation
//!
//! Compares what the cart requires with live stock on hand.
//!
//! ## Classification
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  required  available   fulfilled = min(r, a)   shortfall = max(0, r-a) │
//! │  ────────  ─────────   ─────────────────────   ──────────────────────  │
//! │      5         5                 5                        0  Satisfiable│
//! │     10         4                 4                        6  Partial    │
//! │      3         0                 0                        3  Unsatisf.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Shortage Policy
//! A shortfall never blocks finalization on its own and is never resolved
//! silently. The operator chooses:
//! - remove the short lines and validate again, or
//! - finalize anyway, turning each shortfall into a [`PendingDeliveryRecord`].
//!
//! Every function here is pure. The live lookup is done once per attempt by
//! the engine and handed in as a map; registering pending deliveries (which
//! assigns tracking codes) is an engine step too.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::cart::LineItem;
use crate::money::Money;
use crate::pricing::{PricingCalculator, PricingMode};
use crate::types::ProductId;

/// Reason recorded on every pending delivery created at billing time.
pub const SHORTFALL_REASON: &str = "insufficient stock at time of billing";

// =============================================================================
// Classification
// =============================================================================

/// Per-line verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockVerdict {
    /// Everything requested is on hand.
    Satisfiable,
    /// Some, but not all, is on hand.
    Partial,
    /// Nothing is on hand.
    Unsatisfiable,
}

/// Required vs. available for one cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockClassification {
    pub product_id: ProductId,
    pub name: String,
    pub unit_base_price: Money,
    pub required: i64,
    pub available: i64,
    pub fulfilled: i64,
    pub shortfall: i64,
}

impl StockClassification {
    /// Classifies one requirement against one stock figure.
    ///
    /// Negative stock (oversold catalog) counts as zero available.
    pub fn new(
        product_id: ProductId,
        name: impl Into<String>,
        unit_base_price: Money,
        required: i64,
        available: i64,
    ) -> Self {
        let on_hand = available.max(0);
        StockClassification {
            product_id,
            name: name.into(),
            unit_base_price,
            required,
            available: on_hand,
            fulfilled: required.min(on_hand),
            shortfall: (required - on_hand).max(0),
        }
    }

    pub fn verdict(&self) -> StockVerdict {
        if self.shortfall == 0 {
            StockVerdict::Satisfiable
        } else if self.fulfilled > 0 {
            StockVerdict::Partial
        } else {
            StockVerdict::Unsatisfiable
        }
    }

    pub fn is_short(&self) -> bool {
        self.shortfall > 0
    }
}

/// Classifies every cart line against live stock.
///
/// Products missing from `live_stock` are treated as having none on hand.
/// Output order follows the cart. Calling it twice with the same inputs
/// yields the same output.
pub fn classify(lines: &[LineItem], live_stock: &HashMap<ProductId, i64>) -> Vec<StockClassification> {
    lines
        .iter()
        .map(|line| {
            let available = live_stock.get(&line.product_id).copied().unwrap_or(0);
            StockClassification::new(
                line.product_id,
                line.name.clone(),
                line.unit_base_price,
                line.quantity,
                available,
            )
        })
        .collect()
}

/// True when any line is short.
pub fn has_shortfall(classifications: &[StockClassification]) -> bool {
    classifications.iter().any(StockClassification::is_short)
}

/// The products that are short, in cart order.
pub fn short_products(classifications: &[StockClassification]) -> Vec<ProductId> {
    classifications
        .iter()
        .filter(|c| c.is_short())
        .map(|c| c.product_id)
        .collect()
}

// =============================================================================
// Pending Deliveries
// =============================================================================

/// An obligation to deliver a shortfall once restocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PendingDeliveryRecord {
    pub product_id: ProductId,
    pub name: String,
    pub quantity_pending: i64,
    /// Opaque code assigned by the document store on registration.
    pub tracking_code: Option<String>,
    pub unit_price: Money,
    pub reason: String,
}

/// One record per short line; `quantity_pending = shortfall`.
///
/// The unit price is the price the customer is billed under `mode`.
/// Tracking codes are left empty for the registration step to fill.
pub fn build_pending_deliveries(
    classifications: &[StockClassification],
    pricing: &PricingCalculator,
    mode: PricingMode,
) -> Vec<PendingDeliveryRecord> {
    classifications
        .iter()
        .filter(|c| c.is_short())
        .map(|c| PendingDeliveryRecord {
            product_id: c.product_id,
            name: c.name.clone(),
            quantity_pending: c.shortfall,
            tracking_code: None,
            unit_price: pricing.unit_price_for(c.unit_base_price, mode),
            reason: SHORTFALL_REASON.to_string(),
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentMethod;

    fn line(id: i64, qty: i64, base_major: i64) -> LineItem {
        LineItem::new(ProductId(id), format!("Repuesto {}", id), Money::from_major(base_major), qty, qty)
            .unwrap()
    }

    fn stock(pairs: &[(i64, i64)]) -> HashMap<ProductId, i64> {
        pairs.iter().map(|(id, q)| (ProductId(*id), *q)).collect()
    }

    #[test]
    fn test_fully_satisfiable() {
        let result = classify(&[line(1, 5, 1000)], &stock(&[(1, 5)]));

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].fulfilled, 5);
        assert_eq!(result[0].shortfall, 0);
        assert_eq!(result[0].verdict(), StockVerdict::Satisfiable);
        assert!(!has_shortfall(&result));
    }

    #[test]
    fn test_partial_shortfall() {
        let result = classify(&[line(2, 10, 500)], &stock(&[(2, 4)]));

        assert_eq!(result[0].fulfilled, 4);
        assert_eq!(result[0].shortfall, 6);
        assert_eq!(result[0].verdict(), StockVerdict::Partial);
        assert!(has_shortfall(&result));
        assert_eq!(short_products(&result), vec![ProductId(2)]);
    }

    #[test]
    fn test_missing_and_negative_stock_count_as_zero() {
        let result = classify(&[line(3, 3, 100), line(4, 2, 100)], &stock(&[(4, -5)]));

        assert_eq!(result[0].available, 0);
        assert_eq!(result[0].shortfall, 3);
        assert_eq!(result[0].verdict(), StockVerdict::Unsatisfiable);
        assert_eq!(result[1].available, 0);
        assert_eq!(result[1].fulfilled, 0);
        assert_eq!(result[1].shortfall, 2);
    }

    #[test]
    fn test_oversold_stock_keeps_the_shortfall_formula() {
        let c = StockClassification::new(ProductId(9), "Oversold", Money::from_major(100), 4, -3);

        assert_eq!(c.available, 0);
        assert_eq!(c.shortfall, (c.required - c.available).max(0));
        assert_eq!(c.shortfall, 4);
        assert_eq!(c.fulfilled, 0);
    }

    #[test]
    fn test_shortfall_formula_holds_for_every_line() {
        let lines: Vec<LineItem> = (1..=12).map(|i| line(i, i, 100)).collect();
        let live = stock(&(1..=12).map(|i| (i, 12 - i)).collect::<Vec<_>>());

        for c in classify(&lines, &live) {
            assert_eq!(c.shortfall, (c.required - c.available).max(0));
            assert_eq!(c.fulfilled, c.required.min(c.available));
            assert_eq!(c.fulfilled + c.shortfall, c.required);
        }
    }

    #[test]
    fn test_classify_is_pure() {
        let lines = vec![line(1, 5, 1000), line(2, 10, 500)];
        let live = stock(&[(1, 5), (2, 4)]);

        assert_eq!(classify(&lines, &live), classify(&lines, &live));
    }

    #[test]
    fn test_build_pending_deliveries() {
        let result = classify(&[line(1, 5, 1000), line(2, 10, 500)], &stock(&[(1, 9), (2, 4)]));
        let pricing = PricingCalculator::default();

        let records =
            build_pending_deliveries(&result, &pricing, PricingMode::Method(PaymentMethod::Card));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].product_id, ProductId(2));
        assert_eq!(records[0].quantity_pending, 6);
        assert_eq!(records[0].unit_price, Money::from_major(525));
        assert_eq!(records[0].reason, SHORTFALL_REASON);
        assert!(records[0].tracking_code.is_none());
    }

    #[test]
    fn test_no_pending_deliveries_without_shortfall() {
        let result = classify(&[line(1, 5, 1000)], &stock(&[(1, 5)]));
        let records = build_pending_deliveries(&result, &PricingCalculator::default(), PricingMode::Split);
        assert!(records.is_empty());
    }
}
