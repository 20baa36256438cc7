//! # Billing Gateway
//!
//! The one seam between the engine and the remote document store.
//!
//! ## Call Sequence per Finalization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Orchestrator                         BillingGateway (remote store)     │
//! │  ────────────                         ──────────────                    │
//! │  Reconciling ──────────────────────►  lookup_live_stock(ids)            │
//! │  Submitting  ──────────────────────►  submit_document(doc) → number     │
//! │  AdjustingStock ───(ledger guard)──►  adjust_stock(number, lines)       │
//! │  RegisteringPending ───────────────►  register_pending_deliveries(..)   │
//! │  (conversion only) ────────────────►  convert_proforma(proforma)        │
//! │                                                                         │
//! │  Settling a pending invoice:                                            │
//! │                    ────────────────►  verify_stock_for_document(number) │
//! │                    ────────────────►  mark_invoice_paid(number, pays)   │
//! │                                                                         │
//! │  Calls are strictly sequential. Each step needs the previous answer.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Implementations own the transport, including timeouts. A timed-out call
//! is reported as [`GatewayError::Timeout`](crate::error::GatewayError) like
//! any other failure.

use async_trait::async_trait;
use mostrador_core::document::Document;
use mostrador_core::payment::PaymentSplit;
use mostrador_core::stock::{PendingDeliveryRecord, StockClassification};
use mostrador_core::{DocumentNumber, ProductId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::GatewayResult;

// =============================================================================
// Stock Adjustment DTOs
// =============================================================================

/// One product to take off the shelf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustmentLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Result of one adjustment line as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineAdjustment {
    pub product_id: ProductId,
    pub quantity: i64,
    pub applied: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// The store's answer to an adjustment request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentReport {
    pub per_line: Vec<LineAdjustment>,
}

impl AdjustmentReport {
    pub fn all_applied(&self) -> bool {
        self.per_line.iter().all(|l| l.applied)
    }

    pub fn failed_lines(&self) -> impl Iterator<Item = &LineAdjustment> {
        self.per_line.iter().filter(|l| !l.applied)
    }
}

// =============================================================================
// Gateway Trait
// =============================================================================

/// Operations the engine needs from the remote document store.
#[async_trait]
pub trait BillingGateway: Send + Sync {
    /// Authoritative stock on hand. Products the store does not know may be
    /// omitted; they count as zero.
    async fn lookup_live_stock(
        &self,
        product_ids: &[ProductId],
    ) -> GatewayResult<HashMap<ProductId, i64>>;

    /// Creates the invoice or proforma and returns its number.
    ///
    /// A refusal by the store (`success: false` on the wire) is
    /// [`GatewayError::Rejected`](crate::error::GatewayError::Rejected).
    async fn submit_document(&self, document: &Document) -> GatewayResult<DocumentNumber>;

    /// Decrements stock for a document. Keyed by `number`.
    async fn adjust_stock(
        &self,
        number: &DocumentNumber,
        lines: &[StockAdjustmentLine],
    ) -> GatewayResult<AdjustmentReport>;

    /// Registers delivery obligations. Returns one tracking code per record,
    /// in the order given.
    async fn register_pending_deliveries(
        &self,
        number: &DocumentNumber,
        records: &[PendingDeliveryRecord],
    ) -> GatewayResult<Vec<String>>;

    /// Marks a proforma converted. Only called after its invoice exists.
    async fn convert_proforma(&self, proforma: &DocumentNumber) -> GatewayResult<()>;

    /// Classifies the lines of an issued invoice against current stock.
    async fn verify_stock_for_document(
        &self,
        number: &DocumentNumber,
    ) -> GatewayResult<Vec<StockClassification>>;

    /// Settles a `PendingAtCashier` invoice.
    async fn mark_invoice_paid(
        &self,
        number: &DocumentNumber,
        payments: &[PaymentSplit],
    ) -> GatewayResult<()>;
}
