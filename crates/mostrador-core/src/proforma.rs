//! # Proforma Lifecycle
//!
//! A proforma is a non-binding quotation, valid for 30 days, convertible
//! into an invoice exactly once.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │              time ≥ valid_until (external sweep)                        │
//! │   ┌────────┐ ──────────────────────────────────► ┌─────────┐            │
//! │   │ Active │                                     │ Expired │            │
//! │   └────────┘ ──────────────────────────────────► └─────────┘            │
//! │      │  │      invoice created (conversion)      ┌────────────────────┐ │
//! │      │  └──────────────────────────────────────► │ ConvertedToInvoice │ │
//! │      │                                           └────────────────────┘ │
//! │      │         administrative                    ┌───────────┐          │
//! │      └─────────────────────────────────────────► │ Cancelled │          │
//! │                                                  └───────────┘          │
//! │  Every transition leaves Active. Nothing ever returns to Active.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The core never reads the clock: callers pass `now`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::cart::Cart;
use crate::document::DocumentBody;
use crate::error::{CoreError, CoreResult};
use crate::types::DocumentNumber;
use crate::PROFORMA_VALIDITY_DAYS;

// =============================================================================
// Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProformaStatus {
    Active,
    Expired,
    ConvertedToInvoice,
    Cancelled,
}

impl ProformaStatus {
    pub fn can_transition_to(&self, next: ProformaStatus) -> bool {
        matches!(
            (self, next),
            (ProformaStatus::Active, ProformaStatus::Expired)
                | (ProformaStatus::Active, ProformaStatus::ConvertedToInvoice)
                | (ProformaStatus::Active, ProformaStatus::Cancelled)
        )
    }
}

impl fmt::Display for ProformaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProformaStatus::Active => write!(f, "active"),
            ProformaStatus::Expired => write!(f, "expired"),
            ProformaStatus::ConvertedToInvoice => write!(f, "converted"),
            ProformaStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// =============================================================================
// Proforma
// =============================================================================

/// A numbered proforma as the store holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Proforma {
    pub number: DocumentNumber,
    pub status: ProformaStatus,
    pub body: DocumentBody,
    #[ts(as = "String")]
    pub valid_until: DateTime<Utc>,
}

/// End of the validity window for a proforma issued at `issued_at`.
pub fn valid_until(issued_at: DateTime<Utc>) -> DateTime<Utc> {
    issued_at + Duration::days(PROFORMA_VALIDITY_DAYS)
}

impl Proforma {
    /// Wraps a freshly numbered body as an active proforma.
    pub fn issue(number: DocumentNumber, body: DocumentBody) -> Self {
        let valid_until = valid_until(body.issued_at);
        Proforma {
            number,
            status: ProformaStatus::Active,
            body,
            valid_until,
        }
    }

    /// Active but past its validity window.
    pub fn is_due_to_expire(&self, now: DateTime<Utc>) -> bool {
        self.status == ProformaStatus::Active && now > self.valid_until
    }

    /// Whole days left before expiry, 0 once past it.
    pub fn days_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.valid_until - now).num_days().max(0)
    }

    /// Moves to `next` if the state machine allows it.
    pub fn transition_to(&mut self, next: ProformaStatus) -> CoreResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(self.not_convertible());
        }
        self.status = next;
        Ok(())
    }

    /// Applies the time-based transition. Returns true if it expired now.
    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_due_to_expire(now) {
            self.status = ProformaStatus::Expired;
            return true;
        }
        false
    }

    /// Conversion is legal only from `Active` and within validity.
    pub fn ensure_convertible(&self, now: DateTime<Utc>) -> CoreResult<()> {
        if self.status != ProformaStatus::Active {
            return Err(self.not_convertible());
        }
        if self.is_due_to_expire(now) {
            return Err(CoreError::ProformaNotConvertible {
                proforma_id: self.number.to_string(),
                status: ProformaStatus::Expired.to_string(),
            });
        }
        Ok(())
    }

    /// One-way: Active → ConvertedToInvoice.
    pub fn mark_converted(&mut self) -> CoreResult<()> {
        self.transition_to(ProformaStatus::ConvertedToInvoice)
    }

    /// A fresh cart with this proforma's client and lines.
    pub fn to_cart(&self) -> CoreResult<Cart> {
        Cart::from_parts(Some(self.body.client.clone()), self.body.cart_lines()?)
    }

    fn not_convertible(&self) -> CoreError {
        CoreError::ProformaNotConvertible {
            proforma_id: self.number.to_string(),
            status: self.status.to_string(),
        }
    }
}

/// Expires every due proforma. Returns the numbers that changed.
///
/// The core does not schedule this; whoever runs the periodic sweep calls it.
pub fn sweep_expired(proformas: &mut [Proforma], now: DateTime<Utc>) -> Vec<DocumentNumber> {
    proformas
        .iter_mut()
        .filter_map(|p| p.expire_if_due(now).then(|| p.number.clone()))
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::LineItem;
    use crate::money::Money;
    use crate::pricing::{PricingCalculator, PricingMode};
    use crate::types::{Client, PaymentMethod, ProductId};
    use chrono::TimeZone;

    fn issued_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn proforma(number: &str) -> Proforma {
        let lines = vec![
            LineItem::new(ProductId(1), "Amortiguador", Money::from_major(12_000), 2, 2).unwrap(),
        ];
        let mode = PricingMode::Method(PaymentMethod::Cash);
        let pricing = PricingCalculator::default();
        let body = DocumentBody {
            client: Client {
                id: 4,
                name: "Transportes Mora".to_string(),
                identification: None,
                email: None,
                phone: None,
            },
            lines: pricing.price_lines(&lines, mode),
            pricing: mode,
            totals: pricing.totals(&lines, mode),
            issued_at: issued_at(),
        };
        Proforma::issue(DocumentNumber::new(number), body)
    }

    #[test]
    fn test_issue_sets_thirty_day_window() {
        let p = proforma("PF-1");
        assert_eq!(p.status, ProformaStatus::Active);
        assert_eq!(p.valid_until, issued_at() + Duration::days(30));
        assert_eq!(p.days_remaining(issued_at()), 30);
    }

    #[test]
    fn test_expiry_is_time_based() {
        let mut p = proforma("PF-1");

        assert!(!p.expire_if_due(issued_at() + Duration::days(30)));
        assert_eq!(p.status, ProformaStatus::Active);

        assert!(p.expire_if_due(issued_at() + Duration::days(30) + Duration::seconds(1)));
        assert_eq!(p.status, ProformaStatus::Expired);
        assert!(!p.expire_if_due(issued_at() + Duration::days(90)));
    }

    #[test]
    fn test_convert_only_once() {
        let mut p = proforma("PF-2");
        let now = issued_at() + Duration::days(3);

        assert!(p.ensure_convertible(now).is_ok());
        p.mark_converted().unwrap();
        assert_eq!(p.status, ProformaStatus::ConvertedToInvoice);

        assert!(matches!(
            p.ensure_convertible(now),
            Err(CoreError::ProformaNotConvertible { .. })
        ));
        assert!(p.mark_converted().is_err());
    }

    #[test]
    fn test_expired_and_cancelled_are_not_convertible() {
        let mut expired = proforma("PF-3");
        expired.expire_if_due(issued_at() + Duration::days(31));
        assert!(expired.ensure_convertible(issued_at()).is_err());

        let mut cancelled = proforma("PF-4");
        cancelled.transition_to(ProformaStatus::Cancelled).unwrap();
        assert!(cancelled.ensure_convertible(issued_at()).is_err());
        assert!(cancelled.transition_to(ProformaStatus::Active).is_err());
    }

    #[test]
    fn test_past_validity_is_not_convertible_before_sweep() {
        let p = proforma("PF-5");
        let err = p.ensure_convertible(issued_at() + Duration::days(45)).unwrap_err();
        assert_eq!(
            err,
            CoreError::ProformaNotConvertible {
                proforma_id: "PF-5".to_string(),
                status: "expired".to_string()
            }
        );
        assert_eq!(p.status, ProformaStatus::Active);
    }

    #[test]
    fn test_sweep_expired() {
        let mut list = vec![proforma("PF-6"), proforma("PF-7"), proforma("PF-8")];
        list[1].valid_until = issued_at() + Duration::days(60);
        list[2].mark_converted().unwrap();

        let swept = sweep_expired(&mut list, issued_at() + Duration::days(40));
        assert_eq!(swept, vec![DocumentNumber::new("PF-6")]);
        assert_eq!(list[0].status, ProformaStatus::Expired);
        assert_eq!(list[1].status, ProformaStatus::Active);
        assert_eq!(list[2].status, ProformaStatus::ConvertedToInvoice);
    }

    #[test]
    fn test_to_cart_loads_client_and_lines() {
        let cart = proforma("PF-9").to_cart().unwrap();
        assert_eq!(cart.client().unwrap().name, "Transportes Mora");
        assert_eq!(cart.line(ProductId(1)).unwrap().quantity, 2);
        assert_eq!(cart.line(ProductId(1)).unwrap().unit_base_price, Money::from_major(12_000));
    }
}
