//! # Finalization Summary
//!
//! What a finished attempt hands back: enough to print a receipt without
//! asking anyone else, plus every degraded outcome the operator must see.

use chrono::{DateTime, Utc};
use mostrador_core::document::DocumentStatus;
use mostrador_core::payment::PaymentSplit;
use mostrador_core::pricing::{PricedLine, Totals};
use mostrador_core::stock::{PendingDeliveryRecord, StockClassification};
use mostrador_core::{Client, DocumentNumber, Money};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FinalizationWarning;
use crate::gateway::StockAdjustmentLine;
use crate::idempotency::AdjustmentOutcome;

/// Receipt-ready result of a finalization or settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizationSummary {
    pub attempt_id: Uuid,
    pub document_number: DocumentNumber,
    pub status: DocumentStatus,

    pub store_name: String,
    pub terminal_id: String,
    pub issued_at: DateTime<Utc>,
    /// Set for proformas.
    pub valid_until: Option<DateTime<Utc>>,

    pub client: Client,
    pub lines: Vec<PricedLine>,
    pub totals: Totals,
    /// Empty for proformas.
    pub payments: Vec<PaymentSplit>,
    /// Cash handed back; zero unless a cash tender was recorded.
    pub change: Money,

    /// Shortfalls billed now, with tracking codes when registration worked.
    pub pending_deliveries: Vec<PendingDeliveryRecord>,

    /// Lines sent (or to be sent) to the stock adjustment.
    pub adjustment_lines: Vec<StockAdjustmentLine>,
    /// `None` when this document does not decrement stock, or the call failed.
    pub stock_adjustment: Option<AdjustmentOutcome>,

    /// The proforma this invoice converted.
    pub converted_proforma: Option<DocumentNumber>,

    pub warnings: Vec<FinalizationWarning>,
}

impl FinalizationSummary {
    /// True when a follow-up step failed and needs operator attention.
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Tracking codes in record order; records without one are skipped.
    pub fn tracking_codes(&self) -> Vec<&str> {
        self.pending_deliveries
            .iter()
            .filter_map(|r| r.tracking_code.as_deref())
            .collect()
    }
}

/// Result of [`Orchestrator::begin_finalization`](crate::Orchestrator::begin_finalization)
/// and the operations that continue it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "detail")]
pub enum FinalizationOutcome {
    Completed(Box<FinalizationSummary>),
    /// Live stock cannot cover the cart. The session waits for
    /// `resolve_shortage` or `abandon_shortage`.
    ShortageDecisionRequired(Vec<StockClassification>),
}

impl FinalizationOutcome {
    pub fn summary(&self) -> Option<&FinalizationSummary> {
        match self {
            FinalizationOutcome::Completed(summary) => Some(summary),
            FinalizationOutcome::ShortageDecisionRequired(_) => None,
        }
    }

    pub fn into_summary(self) -> Option<FinalizationSummary> {
        match self {
            FinalizationOutcome::Completed(summary) => Some(*summary),
            FinalizationOutcome::ShortageDecisionRequired(_) => None,
        }
    }
}

/// The operator's answer to a shortage prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortageDecision {
    /// Drop every short line and validate again.
    RemoveShortItems,
    /// Bill everything; shortfalls become pending deliveries.
    ProceedAnyway,
}
