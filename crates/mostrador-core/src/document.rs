//! # Documents
//!
//! The financial artifacts a finalization produces, and the policy table that
//! picks their initial status.
//!
//! ## Status Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  kind       caller rights          initial status      decrements stock │
//! │  ────       ─────────────          ──────────────      ──────────────── │
//! │  Invoice    can_complete           Paid                yes              │
//! │  Invoice    can_create only        PendingAtCashier    no (until paid)  │
//! │  Invoice    neither                NotAuthorized       -                │
//! │  Proforma   any                    Active              never            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The rights are inputs. Nothing here decides who the caller is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::LineItem;
use crate::error::{CoreError, CoreResult};
use crate::payment::PaymentSplit;
use crate::pricing::{PricedLine, PricingMode, Totals};
use crate::proforma::ProformaStatus;
use crate::stock::PendingDeliveryRecord;
use crate::types::{AuthorizationFlags, Client, DocumentNumber};

// =============================================================================
// Kinds and Statuses
// =============================================================================

/// What the operator asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    #[default]
    Invoice,
    Proforma,
}

/// Lifecycle of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Paid at issue; stock leaves the shelf now.
    Paid,
    /// Issued by a salesperson, to be collected at the cashier.
    PendingAtCashier,
}

/// Status of either document kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case", tag = "kind", content = "status")]
pub enum DocumentStatus {
    Invoice(InvoiceStatus),
    Proforma(ProformaStatus),
}

impl DocumentStatus {
    /// Applies the status policy table.
    pub fn initial(kind: DocumentKind, flags: AuthorizationFlags) -> CoreResult<Self> {
        match kind {
            DocumentKind::Proforma => Ok(DocumentStatus::Proforma(ProformaStatus::Active)),
            DocumentKind::Invoice if flags.can_complete => {
                Ok(DocumentStatus::Invoice(InvoiceStatus::Paid))
            }
            DocumentKind::Invoice if flags.can_create => {
                Ok(DocumentStatus::Invoice(InvoiceStatus::PendingAtCashier))
            }
            DocumentKind::Invoice => Err(CoreError::NotAuthorized),
        }
    }

    /// Only paid invoices take stock off the shelf.
    pub fn decrements_stock(&self) -> bool {
        matches!(self, DocumentStatus::Invoice(InvoiceStatus::Paid))
    }

    pub fn kind(&self) -> DocumentKind {
        match self {
            DocumentStatus::Invoice(_) => DocumentKind::Invoice,
            DocumentStatus::Proforma(_) => DocumentKind::Proforma,
        }
    }
}

// =============================================================================
// Document Body
// =============================================================================

/// What every document carries: who, what, at which prices, when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DocumentBody {
    pub client: Client,
    pub lines: Vec<PricedLine>,
    pub pricing: PricingMode,
    pub totals: Totals,
    #[ts(as = "String")]
    pub issued_at: DateTime<Utc>,
}

impl DocumentBody {
    /// Lines as cart lines, with unknown stock (used to rebuild a cart).
    pub fn cart_lines(&self) -> CoreResult<Vec<LineItem>> {
        self.lines
            .iter()
            .map(|l| LineItem::new(l.product_id, l.name.clone(), l.unit_base_price, l.quantity, 0))
            .collect()
    }
}

// =============================================================================
// Document (submission payload)
// =============================================================================

/// A document ready to be submitted to the document store.
///
/// It has no number yet: the store assigns one on submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Document {
    Invoice {
        body: DocumentBody,
        status: InvoiceStatus,
        payments: Vec<PaymentSplit>,
        /// Shortfalls billed now and delivered later (no tracking codes yet).
        pending_deliveries: Vec<PendingDeliveryRecord>,
        /// Set when this invoice converts a proforma.
        source_proforma: Option<DocumentNumber>,
    },
    Proforma {
        body: DocumentBody,
        #[ts(as = "String")]
        valid_until: DateTime<Utc>,
    },
}

impl Document {
    pub fn body(&self) -> &DocumentBody {
        match self {
            Document::Invoice { body, .. } | Document::Proforma { body, .. } => body,
        }
    }

    pub fn status(&self) -> DocumentStatus {
        match self {
            Document::Invoice { status, .. } => DocumentStatus::Invoice(*status),
            Document::Proforma { .. } => DocumentStatus::Proforma(ProformaStatus::Active),
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.status().kind()
    }
}

// =============================================================================
// Issued Invoice
// =============================================================================

/// An invoice the store has numbered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub number: DocumentNumber,
    pub status: InvoiceStatus,
    pub body: DocumentBody,
    pub payments: Vec<PaymentSplit>,
    pub pending_deliveries: Vec<PendingDeliveryRecord>,
}

impl Invoice {
    pub fn is_pending_at_cashier(&self) -> bool {
        self.status == InvoiceStatus::PendingAtCashier
    }

    /// Settles a pending invoice with the payments collected at the cashier.
    pub fn mark_paid(&mut self, payments: Vec<PaymentSplit>) {
        self.status = InvoiceStatus::Paid;
        self.payments = payments;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_policy_table() {
        assert_eq!(
            DocumentStatus::initial(DocumentKind::Invoice, AuthorizationFlags::cashier()),
            Ok(DocumentStatus::Invoice(InvoiceStatus::Paid))
        );
        assert_eq!(
            DocumentStatus::initial(DocumentKind::Invoice, AuthorizationFlags::salesperson()),
            Ok(DocumentStatus::Invoice(InvoiceStatus::PendingAtCashier))
        );
        assert_eq!(
            DocumentStatus::initial(DocumentKind::Invoice, AuthorizationFlags::default()),
            Err(CoreError::NotAuthorized)
        );
        for flags in [
            AuthorizationFlags::cashier(),
            AuthorizationFlags::salesperson(),
            AuthorizationFlags::default(),
        ] {
            assert_eq!(
                DocumentStatus::initial(DocumentKind::Proforma, flags),
                Ok(DocumentStatus::Proforma(ProformaStatus::Active))
            );
        }
    }

    #[test]
    fn test_only_paid_invoices_decrement_stock() {
        assert!(DocumentStatus::Invoice(InvoiceStatus::Paid).decrements_stock());
        assert!(!DocumentStatus::Invoice(InvoiceStatus::PendingAtCashier).decrements_stock());
        assert!(!DocumentStatus::Proforma(ProformaStatus::Active).decrements_stock());
    }
}
