//! # Stock Adjustment Ledger
//!
//! At-most-once stock decrements, keyed by document number.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  adjust_once(F-0101)  ──► not in ledger ──► gateway.adjust_stock ──► Ok │
//! │                                                 │                       │
//! │                                                 └─► ledger += F-0101    │
//! │                                                                         │
//! │  adjust_once(F-0101)  ──► in ledger ──────► AlreadyApplied (no call)    │
//! │                                                                         │
//! │  gateway error        ──► ledger unchanged, a retry may call again      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The lock is held across the gateway call, so two racing retries for the
//! same document cannot both reach the store.

use mostrador_core::DocumentNumber;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::GatewayResult;
use crate::gateway::{AdjustmentReport, BillingGateway, StockAdjustmentLine};

/// What happened to one adjustment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "report")]
pub enum AdjustmentOutcome {
    /// This request reached the store.
    Applied(AdjustmentReport),
    /// A previous request for the same document already did.
    AlreadyApplied,
}

impl AdjustmentOutcome {
    pub fn is_already_applied(&self) -> bool {
        matches!(self, AdjustmentOutcome::AlreadyApplied)
    }
}

/// Document numbers whose stock adjustment has been applied.
#[derive(Debug, Default)]
pub struct AdjustmentLedger {
    applied: Mutex<HashSet<DocumentNumber>>,
}

impl AdjustmentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from keys applied in an earlier run (e.g. reloaded by the caller).
    pub fn with_applied(numbers: impl IntoIterator<Item = DocumentNumber>) -> Self {
        AdjustmentLedger {
            applied: Mutex::new(numbers.into_iter().collect()),
        }
    }

    pub async fn is_applied(&self, number: &DocumentNumber) -> bool {
        self.applied.lock().await.contains(number)
    }

    pub async fn len(&self) -> usize {
        self.applied.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.applied.lock().await.is_empty()
    }

    /// Calls `adjust_stock` unless `number` was already applied.
    pub async fn adjust_once(
        &self,
        gateway: &dyn BillingGateway,
        number: &DocumentNumber,
        lines: &[StockAdjustmentLine],
    ) -> GatewayResult<AdjustmentOutcome> {
        let mut applied = self.applied.lock().await;
        if applied.contains(number) {
            debug!(document_number = %number, "Stock adjustment already applied, skipping");
            return Ok(AdjustmentOutcome::AlreadyApplied);
        }

        let report = gateway.adjust_stock(number, lines).await?;
        applied.insert(number.clone());
        info!(document_number = %number, lines = lines.len(), "Stock adjustment applied");

        Ok(AdjustmentOutcome::Applied(report))
    }
}
