//! # Payment Allocator
//!
//! Validates and reconciles one or many payment entries against a total.
//!
//! ## Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SINGLE                              │  SPLIT ("pago múltiple")         │
//! │  ──────                              │  ─────                           │
//! │  One method pays the whole total.    │  Σ amount == total (± 1 cent)    │
//! │  Always valid. Cash may record the   │  every amount > 0                │
//! │  amount tendered to compute change.  │  priced at base, no surcharge    │
//! │                                      │                                  │
//! │  total 5650, Cash                    │  total 5650                      │
//! │    → ok                              │    Cash 3000 + Card 2650 → ok    │
//! │                                      │    Cash 3000 alone → delta 2650  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The signed delta is part of the contract: the orchestrator refuses to
//! finalize while it is non-zero, and the UI renders it as "remaining" (> 0)
//! or "excess" (< 0).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::PricingMode;
use crate::types::PaymentMethod;
use crate::validation::validate_split_amount;
use crate::SPLIT_TOLERANCE;

// =============================================================================
// Payment Split
// =============================================================================

/// One method's share of a document total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSplit {
    pub method: PaymentMethod,
    pub amount: Money,
    /// Card voucher, transfer or SINPE confirmation number.
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl PaymentSplit {
    pub fn new(method: PaymentMethod, amount: Money) -> Self {
        PaymentSplit {
            method,
            amount,
            reference: None,
            note: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

// =============================================================================
// Payment Plan
// =============================================================================

/// How a document will be paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum PaymentPlan {
    /// One method covers the whole total.
    Single {
        method: PaymentMethod,
        /// Cash handed over by the customer, when recorded.
        #[serde(default)]
        tendered: Option<Money>,
    },
    /// Explicit shares per method.
    Split { splits: Vec<PaymentSplit> },
}

impl PaymentPlan {
    pub fn single(method: PaymentMethod) -> Self {
        PaymentPlan::Single {
            method,
            tendered: None,
        }
    }

    pub fn cash_tendered(tendered: Money) -> Self {
        PaymentPlan::Single {
            method: PaymentMethod::Cash,
            tendered: Some(tendered),
        }
    }

    pub fn split(splits: Vec<PaymentSplit>) -> Self {
        PaymentPlan::Split { splits }
    }

    /// The price list this plan is totalled under.
    pub fn pricing_mode(&self) -> PricingMode {
        match self {
            PaymentPlan::Single { method, .. } => PricingMode::Method(*method),
            PaymentPlan::Split { .. } => PricingMode::Split,
        }
    }

    /// Checks the plan against a total. Splits may drift by one cent.
    pub fn validate(&self, total: Money) -> CoreResult<()> {
        match self {
            PaymentPlan::Single { method, tendered } => {
                validate_single(total, *method)?;
                if let Some(tendered) = tendered {
                    change_due(total, *tendered)?;
                }
                Ok(())
            }
            PaymentPlan::Split { splits } => validate_split(total, splits),
        }
    }

    /// The payment lines to record on the document.
    pub fn breakdown(&self, total: Money) -> Vec<PaymentSplit> {
        match self {
            PaymentPlan::Single { method, .. } => vec![PaymentSplit::new(*method, total)],
            PaymentPlan::Split { splits } => splits.clone(),
        }
    }

    /// Change to hand back, for a cash tender above the total.
    pub fn change(&self, total: Money) -> Money {
        match self {
            PaymentPlan::Single {
                tendered: Some(tendered),
                ..
            } => tendered.saturating_remaining(total),
            _ => Money::zero(),
        }
    }
}

// =============================================================================
// Allocator Operations
// =============================================================================

/// A single-method payment is the whole total, so it is always valid.
pub fn validate_single(_total: Money, _method: PaymentMethod) -> CoreResult<()> {
    Ok(())
}

/// Checks that splits are all positive and add up to `total`.
///
/// ## Errors
/// - `InvalidSplitAmount` for the first split with amount ≤ 0
/// - `PaymentMismatch { delta }` with `delta = total - Σamount` when
///   `|delta|` exceeds one cent
///
/// ## Example
/// ```rust
/// use mostrador_core::money::Money;
/// use mostrador_core::payment::{validate_split, PaymentSplit};
/// use mostrador_core::types::PaymentMethod;
/// use mostrador_core::CoreError;
///
/// let total = Money::from_major(5650);
/// let ok = [
///     PaymentSplit::new(PaymentMethod::Cash, Money::from_major(3000)),
///     PaymentSplit::new(PaymentMethod::Card, Money::from_major(2650)),
/// ];
/// assert!(validate_split(total, &ok).is_ok());
///
/// let short = [PaymentSplit::new(PaymentMethod::Cash, Money::from_major(3000))];
/// assert_eq!(
///     validate_split(total, &short),
///     Err(CoreError::PaymentMismatch { delta: Money::from_major(2650) })
/// );
/// ```
pub fn validate_split(total: Money, splits: &[PaymentSplit]) -> CoreResult<()> {
    for (index, split) in splits.iter().enumerate() {
        validate_split_amount(index, split.amount)?;
    }

    let delta = split_delta(total, splits);
    if delta.abs() > SPLIT_TOLERANCE {
        return Err(CoreError::PaymentMismatch { delta });
    }

    Ok(())
}

/// `total - Σamount`, signed.
pub fn split_delta(total: Money, splits: &[PaymentSplit]) -> Money {
    total - allocated(splits)
}

/// Σamount.
pub fn allocated(splits: &[PaymentSplit]) -> Money {
    splits.iter().map(|s| s.amount).sum()
}

/// `max(0, total - Σamount)`.
pub fn remaining(total: Money, splits: &[PaymentSplit]) -> Money {
    total.saturating_remaining(allocated(splits))
}

/// Adding another split is refused once nothing remains to allocate.
pub fn can_add_split(total: Money, splits: &[PaymentSplit]) -> bool {
    remaining(total, splits).is_positive()
}

/// Amount to pre-fill in a newly added split line, if one may be added.
pub fn prefill_amount(total: Money, splits: &[PaymentSplit]) -> Option<Money> {
    let left = remaining(total, splits);
    left.is_positive().then_some(left)
}

/// Change for a cash tender. Tendering less than the total is a mismatch.
pub fn change_due(total: Money, tendered: Money) -> CoreResult<Money> {
    let delta = total - tendered;
    if delta.is_positive() {
        return Err(CoreError::PaymentMismatch { delta });
    }
    Ok(-delta)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn split(method: PaymentMethod, major: i64) -> PaymentSplit {
        PaymentSplit::new(method, Money::from_major(major))
    }

    fn total() -> Money {
        Money::from_major(5650)
    }

    #[test]
    fn test_exact_split_is_ok() {
        let splits = [split(PaymentMethod::Cash, 3000), split(PaymentMethod::Card, 2650)];
        assert!(validate_split(total(), &splits).is_ok());
        assert_eq!(split_delta(total(), &splits), Money::zero());
    }

    #[test]
    fn test_missing_amount_reports_remaining() {
        let splits = [split(PaymentMethod::Cash, 3000)];
        assert_eq!(
            validate_split(total(), &splits),
            Err(CoreError::PaymentMismatch {
                delta: Money::from_major(2650)
            })
        );
    }

    #[test]
    fn test_excess_reports_negative_delta() {
        let splits = [split(PaymentMethod::Cash, 3000), split(PaymentMethod::Card, 3000)];
        assert_eq!(
            validate_split(total(), &splits),
            Err(CoreError::PaymentMismatch {
                delta: Money::from_major(-350)
            })
        );
    }

    #[test]
    fn test_perturbing_any_split_beyond_tolerance_fails() {
        let base = vec![
            split(PaymentMethod::Cash, 2000),
            split(PaymentMethod::Transfer, 1650),
            split(PaymentMethod::SinpeMobile, 2000),
        ];
        assert!(validate_split(total(), &base).is_ok());

        for i in 0..base.len() {
            for bump in [2, -2, 100, -100] {
                let mut perturbed = base.clone();
                perturbed[i].amount += Money::from_cents(bump);
                assert_eq!(
                    validate_split(total(), &perturbed),
                    Err(CoreError::PaymentMismatch {
                        delta: Money::from_cents(-bump)
                    })
                );
            }
        }
    }

    #[test]
    fn test_one_cent_is_within_tolerance() {
        let splits = [
            split(PaymentMethod::Cash, 3000),
            PaymentSplit::new(PaymentMethod::Card, Money::from_cents(264_999)),
        ];
        assert!(validate_split(total(), &splits).is_ok());
    }

    #[test]
    fn test_non_positive_split_is_invalid() {
        let splits = [
            split(PaymentMethod::Cash, 5650),
            PaymentSplit::new(PaymentMethod::Card, Money::zero()),
        ];
        assert_eq!(
            validate_split(total(), &splits),
            Err(CoreError::InvalidSplitAmount {
                index: 1,
                amount: Money::zero()
            })
        );
    }

    #[test]
    fn test_remaining_and_prefill() {
        let mut splits = vec![split(PaymentMethod::Cash, 3000)];
        assert_eq!(remaining(total(), &splits), Money::from_major(2650));
        assert!(can_add_split(total(), &splits));
        assert_eq!(prefill_amount(total(), &splits), Some(Money::from_major(2650)));

        splits.push(split(PaymentMethod::Card, 2650));
        assert_eq!(remaining(total(), &splits), Money::zero());
        assert!(!can_add_split(total(), &splits));
        assert_eq!(prefill_amount(total(), &splits), None);

        splits.push(split(PaymentMethod::Transfer, 10));
        assert_eq!(remaining(total(), &splits), Money::zero());
    }

    #[test]
    fn test_cash_change() {
        assert_eq!(
            change_due(total(), Money::from_major(6000)),
            Ok(Money::from_major(350))
        );
        assert_eq!(change_due(total(), total()), Ok(Money::zero()));
        assert_eq!(
            change_due(total(), Money::from_major(5000)),
            Err(CoreError::PaymentMismatch {
                delta: Money::from_major(650)
            })
        );
    }

    #[test]
    fn test_plan_validate_and_breakdown() {
        let single = PaymentPlan::single(PaymentMethod::Card);
        assert!(single.validate(total()).is_ok());
        assert_eq!(
            single.breakdown(total()),
            vec![PaymentSplit::new(PaymentMethod::Card, total())]
        );
        assert_eq!(single.change(total()), Money::zero());

        let tendered = PaymentPlan::cash_tendered(Money::from_major(10_000));
        assert!(tendered.validate(total()).is_ok());
        assert_eq!(tendered.change(total()), Money::from_major(4350));

        let split_plan = PaymentPlan::split(vec![split(PaymentMethod::Cash, 3000)]);
        assert!(split_plan.validate(total()).is_err());
        assert_eq!(split_plan.pricing_mode(), PricingMode::Split);
    }

    #[test]
    fn test_plan_serde_shape() {
        let plan = PaymentPlan::split(vec![
            split(PaymentMethod::Cash, 3000).with_note("billete grande"),
            split(PaymentMethod::SinpeMobile, 2650).with_reference("SP-88231"),
        ]);
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["mode"], "split");
        assert_eq!(json["splits"][1]["method"], "sinpe_mobile");
        assert_eq!(json["splits"][1]["reference"], "SP-88231");

        let back: PaymentPlan = serde_json::from_value(json).unwrap();
        assert_eq!(back, plan);
    }
}
