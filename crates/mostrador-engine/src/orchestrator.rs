//! # Finalization Orchestrator
//!
//! Sequences one finalization attempt from "Finalize" to a numbered document.
//!
//! ## Attempt Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Finalization Attempt                             │
//! │                                                                         │
//! │  1. VALIDATING                                                          │
//! │     ├── cart not empty, client selected          → EmptyCart / NoClient │
//! │     ├── payment balances (±1 cent for splits)    → PaymentMismatch      │
//! │     └── status from rights: Paid / PendingAtCashier / Active            │
//! │                                                                         │
//! │  2. RECONCILING (invoices only)                                         │
//! │     ├── lookup_live_stock (once per attempt, never cached)              │
//! │     └── shortfall? ──► AwaitingShortageDecision (suspend)               │
//! │                                                                         │
//! │  3. SUBMITTING                                                          │
//! │     └── submit_document ──► number            (failure is fatal)        │
//! │                                                                         │
//! │  4. ADJUSTING STOCK (Paid invoices only)                                │
//! │     └── ledger.adjust_once(number, fulfilled qty)  (failure: warning)   │
//! │                                                                         │
//! │  5. REGISTERING PENDING (shortfall carried forward)                     │
//! │     └── register_pending_deliveries ──► tracking codes (warning)        │
//! │                                                                         │
//! │  6. COMPLETE                                                            │
//! │     ├── mark source proforma converted (warning)                        │
//! │     └── clear cart, return receipt summary                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every external call is awaited before the next one starts: each step
//! needs the previous step's answer.
//!
//! A caller may drop an attempt's future (a timeout, say). The session is
//! then settled by its phase: `Idle` before submission, `Failed` during it,
//! `Complete` once the document exists.

use chrono::Utc;
use mostrador_core::cart::{Cart, LineItem};
use mostrador_core::document::{
    Document, DocumentBody, DocumentKind, DocumentStatus, Invoice, InvoiceStatus,
};
use mostrador_core::payment::PaymentPlan;
use mostrador_core::pricing::{PricingCalculator, PricingMode, Totals};
use mostrador_core::proforma::{self, Proforma, ProformaStatus};
use mostrador_core::stock::{self, PendingDeliveryRecord, StockClassification};
use mostrador_core::{AuthorizationFlags, CoreError, DocumentNumber};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, FinalizationWarning};
use crate::gateway::{BillingGateway, StockAdjustmentLine};
use crate::idempotency::{AdjustmentLedger, AdjustmentOutcome};
use crate::session::{AttemptGuard, FinalizationPhase, FinalizationSession, SuspendedAttempt};
use crate::summary::{FinalizationOutcome, FinalizationSummary, ShortageDecision};

// =============================================================================
// Orchestrator
// =============================================================================

/// Drives finalization attempts against one document store.
///
/// Shared across sessions: the ledger and the converted-proforma guard live
/// here, the cart lives in each [`FinalizationSession`].
pub struct Orchestrator {
    gateway: Arc<dyn BillingGateway>,
    pricing: PricingCalculator,
    config: EngineConfig,
    ledger: AdjustmentLedger,
    converted: Mutex<HashSet<DocumentNumber>>,
}

impl Orchestrator {
    pub fn new(gateway: Arc<dyn BillingGateway>, config: EngineConfig) -> Self {
        Orchestrator {
            gateway,
            pricing: PricingCalculator::new(config.multiplier_table()),
            config,
            ledger: AdjustmentLedger::new(),
            converted: Mutex::new(HashSet::new()),
        }
    }

    /// Replaces the adjustment ledger, e.g. with keys reloaded after a restart.
    pub fn with_ledger(mut self, ledger: AdjustmentLedger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn pricing(&self) -> &PricingCalculator {
        &self.pricing
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &AdjustmentLedger {
        &self.ledger
    }

    // =========================================================================
    // Totals
    // =========================================================================

    /// Totals of a cart under a pricing mode (single method or split).
    pub fn compute_totals(&self, cart: &Cart, mode: PricingMode) -> Totals {
        self.pricing.totals(cart.lines(), mode)
    }

    /// Totals of the session's cart under its current payment plan.
    pub fn session_totals(&self, session: &FinalizationSession) -> Totals {
        self.compute_totals(session.cart(), session.payment().pricing_mode())
    }

    // =========================================================================
    // Finalization
    // =========================================================================

    /// Starts a finalization attempt for the session's cart.
    ///
    /// Returns `ShortageDecisionRequired` when live stock cannot cover the
    /// cart; the session then waits for [`resolve_shortage`](Self::resolve_shortage)
    /// or [`abandon_shortage`](Self::abandon_shortage).
    pub async fn begin_finalization(
        &self,
        session: &mut FinalizationSession,
        flags: AuthorizationFlags,
    ) -> EngineResult<FinalizationOutcome> {
        session.ensure_not_in_flight()?;

        let attempt_id = Uuid::new_v4();
        info!(
            attempt_id = %attempt_id,
            kind = ?session.kind(),
            lines = session.cart().len(),
            "Finalization started"
        );

        let mut session = AttemptGuard::new(session, attempt_id);
        let outcome = self.run_attempt(&mut session, attempt_id, flags).await?;
        Ok(outcome)
    }

    /// Continues a suspended attempt with the operator's decision.
    pub async fn resolve_shortage(
        &self,
        session: &mut FinalizationSession,
        decision: ShortageDecision,
    ) -> EngineResult<FinalizationOutcome> {
        if session.phase() != FinalizationPhase::AwaitingShortageDecision {
            return Err(EngineError::NoShortageDecisionPending);
        }
        let suspended = session
            .take_suspended()
            .ok_or(EngineError::NoShortageDecisionPending)?;
        let attempt_id = suspended.attempt_id;
        info!(attempt_id = %attempt_id, ?decision, "Shortage decision received");

        let mut session = AttemptGuard::new(session, attempt_id);
        match decision {
            ShortageDecision::RemoveShortItems => {
                let short = stock::short_products(&suspended.classifications);
                let removed = session.cart_for_attempt().remove_lines(&short);
                info!(attempt_id = %attempt_id, removed = removed.len(), "Short lines removed");
                let outcome = self
                    .run_attempt(&mut session, attempt_id, suspended.flags)
                    .await?;
                Ok(outcome)
            }
            ShortageDecision::ProceedAnyway => {
                let summary = self
                    .submit(&mut session, attempt_id, suspended.status, &suspended.classifications)
                    .await?;
                Ok(FinalizationOutcome::Completed(Box::new(summary)))
            }
        }
    }

    /// Drops a suspended attempt. No external call has been made; the cart
    /// is discarded and the session is idle again.
    pub fn abandon_shortage(&self, session: &mut FinalizationSession) -> EngineResult<()> {
        if session.phase() != FinalizationPhase::AwaitingShortageDecision {
            return Err(EngineError::NoShortageDecisionPending);
        }
        let attempt_id = session
            .take_suspended()
            .map(|s| s.attempt_id)
            .unwrap_or_else(Uuid::nil);
        info!(attempt_id = %attempt_id, "Shortage decision abandoned");
        session.abandon(attempt_id);
        Ok(())
    }

    /// Loads a proforma into the session and finalizes it as an invoice.
    ///
    /// The proforma is marked converted only after its invoice exists. A
    /// failed submission leaves it `Active`.
    pub async fn convert_proforma(
        &self,
        session: &mut FinalizationSession,
        proforma: &Proforma,
        flags: AuthorizationFlags,
    ) -> EngineResult<FinalizationOutcome> {
        session.ensure_not_in_flight()?;

        if self.converted.lock().await.contains(&proforma.number) {
            return Err(CoreError::ProformaNotConvertible {
                proforma_id: proforma.number.to_string(),
                status: ProformaStatus::ConvertedToInvoice.to_string(),
            }
            .into());
        }
        proforma.ensure_convertible(Utc::now())?;

        let cart = proforma.to_cart()?;
        if !session.cart().is_empty() {
            warn!(
                proforma = %proforma.number,
                dropped_lines = session.cart().len(),
                "Replacing the session cart with proforma lines"
            );
        }
        session.load_proforma(proforma.clone(), cart);

        self.begin_finalization(session, flags).await
    }

    /// Explicit follow-up for a `StockAdjustmentFailed` warning.
    ///
    /// Reports `AlreadyApplied` when an earlier attempt did land.
    pub async fn retry_stock_adjustment(
        &self,
        number: &DocumentNumber,
        lines: &[StockAdjustmentLine],
    ) -> EngineResult<AdjustmentOutcome> {
        self.ledger
            .adjust_once(self.gateway.as_ref(), number, lines)
            .await
            .map_err(|source| EngineError::StockAdjustmentFailed {
                number: number.clone(),
                source,
            })
    }

    // =========================================================================
    // Pending Invoice Settlement
    // =========================================================================

    /// Collects payment for an invoice issued `PendingAtCashier`.
    ///
    /// Stock is verified again. With a shortfall and `accept_shortfall`
    /// false, nothing is written and the classifications come back for the
    /// cashier to decide.
    pub async fn settle_pending_invoice(
        &self,
        invoice: &Invoice,
        plan: &PaymentPlan,
        flags: AuthorizationFlags,
        accept_shortfall: bool,
    ) -> EngineResult<FinalizationOutcome> {
        if !flags.can_complete {
            return Err(CoreError::NotAuthorized.into());
        }
        if !invoice.is_pending_at_cashier() {
            return Err(EngineError::InvoiceNotPending(invoice.number.clone()));
        }

        let total = invoice.body.totals.total;
        plan.validate(total)?;

        let attempt_id = Uuid::new_v4();
        let number = &invoice.number;
        info!(attempt_id = %attempt_id, document_number = %number, "Settling pending invoice");

        let classifications = self
            .gateway
            .verify_stock_for_document(number)
            .await
            .map_err(EngineError::StockLookupFailed)?;

        if stock::has_shortfall(&classifications) && !accept_shortfall {
            info!(attempt_id = %attempt_id, document_number = %number, "Shortfall at settlement");
            return Ok(FinalizationOutcome::ShortageDecisionRequired(classifications));
        }

        let payments = plan.breakdown(total);
        self.gateway
            .mark_invoice_paid(number, &payments)
            .await
            .map_err(|source| {
                error!(attempt_id = %attempt_id, document_number = %number, error = %source, "Settlement failed");
                EngineError::InvoiceSettlementFailed {
                    number: number.clone(),
                    source,
                }
            })?;

        let mut warnings = Vec::new();

        let adjustment_lines = adjustment_lines(&[], &classifications);
        let stock_adjustment = self
            .adjust_stock(attempt_id, number, &adjustment_lines, &mut warnings)
            .await;

        // Shortfall already recorded on the invoice is not registered twice.
        let mut pending =
            stock::build_pending_deliveries(&classifications, &self.pricing, invoice.body.pricing);
        for record in &mut pending {
            let recorded: i64 = invoice
                .pending_deliveries
                .iter()
                .filter(|r| r.product_id == record.product_id)
                .map(|r| r.quantity_pending)
                .sum();
            record.quantity_pending -= recorded;
        }
        pending.retain(|r| r.quantity_pending > 0);
        let pending = self
            .register_pending(attempt_id, number, pending, &mut warnings)
            .await;

        info!(
            attempt_id = %attempt_id,
            document_number = %number,
            warnings = warnings.len(),
            "Pending invoice settled"
        );

        Ok(FinalizationOutcome::Completed(Box::new(FinalizationSummary {
            attempt_id,
            document_number: number.clone(),
            status: DocumentStatus::Invoice(InvoiceStatus::Paid),
            store_name: self.config.store_name().to_string(),
            terminal_id: self.config.terminal_id().to_string(),
            issued_at: invoice.body.issued_at,
            valid_until: None,
            client: invoice.body.client.clone(),
            lines: invoice.body.lines.clone(),
            totals: invoice.body.totals,
            change: plan.change(total),
            payments,
            pending_deliveries: pending,
            adjustment_lines,
            stock_adjustment,
            converted_proforma: None,
            warnings,
        })))
    }

    // =========================================================================
    // Attempt Steps
    // =========================================================================

    async fn run_attempt(
        &self,
        session: &mut FinalizationSession,
        attempt_id: Uuid,
        flags: AuthorizationFlags,
    ) -> EngineResult<FinalizationOutcome> {
        session.enter(FinalizationPhase::Validating, attempt_id);
        let status = match self.validate(session, flags) {
            Ok(status) => status,
            Err(e) => {
                warn!(attempt_id = %attempt_id, error = %e, "Finalization refused");
                session.rewind(attempt_id);
                return Err(e);
            }
        };

        if status.kind() == DocumentKind::Proforma {
            let summary = self.submit(session, attempt_id, status, &[]).await?;
            return Ok(FinalizationOutcome::Completed(Box::new(summary)));
        }

        session.enter(FinalizationPhase::Reconciling, attempt_id);
        let product_ids = session.cart().product_ids();
        let live_stock = match self.gateway.lookup_live_stock(&product_ids).await {
            Ok(live) => live,
            Err(e) => {
                warn!(attempt_id = %attempt_id, error = %e, "Live stock lookup failed");
                session.rewind(attempt_id);
                return Err(EngineError::StockLookupFailed(e));
            }
        };

        let classifications = stock::classify(session.cart().lines(), &live_stock);
        if stock::has_shortfall(&classifications) {
            info!(
                attempt_id = %attempt_id,
                short_lines = stock::short_products(&classifications).len(),
                "Shortfall found, awaiting operator decision"
            );
            session.suspend(SuspendedAttempt {
                attempt_id,
                flags,
                status,
                classifications: classifications.clone(),
            });
            return Ok(FinalizationOutcome::ShortageDecisionRequired(classifications));
        }

        let summary = self
            .submit(session, attempt_id, status, &classifications)
            .await?;
        Ok(FinalizationOutcome::Completed(Box::new(summary)))
    }

    fn validate(
        &self,
        session: &FinalizationSession,
        flags: AuthorizationFlags,
    ) -> EngineResult<DocumentStatus> {
        let cart = session.cart();
        if cart.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }
        if cart.client().is_none() {
            return Err(CoreError::NoClientSelected.into());
        }

        let totals = self.session_totals(session);
        session.payment().validate(totals.total)?;

        Ok(DocumentStatus::initial(session.kind(), flags)?)
    }

    /// Submitting through Complete. Not cancellable once entered.
    async fn submit(
        &self,
        session: &mut FinalizationSession,
        attempt_id: Uuid,
        status: DocumentStatus,
        classifications: &[StockClassification],
    ) -> EngineResult<FinalizationSummary> {
        session.enter(FinalizationPhase::Submitting, attempt_id);

        let Some(client) = session.cart().client().cloned() else {
            session.rewind(attempt_id);
            return Err(CoreError::NoClientSelected.into());
        };
        let mode = session.payment().pricing_mode();
        let lines = self.pricing.price_lines(session.cart().lines(), mode);
        let totals = self.compute_totals(session.cart(), mode);
        let issued_at = Utc::now();
        let source_proforma = session.source_proforma().map(|p| p.number.clone());

        let body = DocumentBody {
            client: client.clone(),
            lines: lines.clone(),
            pricing: mode,
            totals,
            issued_at,
        };

        let mut pending = Vec::new();
        let mut payments = Vec::new();
        let mut valid_until = None;
        let document = match status {
            DocumentStatus::Proforma(_) => {
                let until = proforma::valid_until(issued_at);
                valid_until = Some(until);
                Document::Proforma {
                    body,
                    valid_until: until,
                }
            }
            DocumentStatus::Invoice(invoice_status) => {
                pending = stock::build_pending_deliveries(classifications, &self.pricing, mode);
                payments = session.payment().breakdown(totals.total);
                Document::Invoice {
                    body,
                    status: invoice_status,
                    payments: payments.clone(),
                    pending_deliveries: pending.clone(),
                    source_proforma: source_proforma.clone(),
                }
            }
        };

        let number = match self.gateway.submit_document(&document).await {
            Ok(number) => number,
            Err(e) => {
                error!(attempt_id = %attempt_id, error = %e, "Document submission failed");
                session.fail(attempt_id);
                return Err(EngineError::DocumentSubmissionFailed(e));
            }
        };
        info!(attempt_id = %attempt_id, document_number = %number, ?status, "Document issued");

        let mut warnings = Vec::new();

        let adjustment_lines = adjustment_lines(session.cart().lines(), classifications);
        let stock_adjustment = if status.decrements_stock() {
            session.enter(FinalizationPhase::AdjustingStock, attempt_id);
            self.adjust_stock(attempt_id, &number, &adjustment_lines, &mut warnings)
                .await
        } else {
            None
        };

        if !pending.is_empty() {
            session.enter(FinalizationPhase::RegisteringPending, attempt_id);
            pending = self
                .register_pending(attempt_id, &number, pending, &mut warnings)
                .await;
        }

        let converted_proforma = match source_proforma {
            Some(proforma) if status.kind() == DocumentKind::Invoice => {
                self.mark_converted(attempt_id, &proforma, &mut warnings).await;
                Some(proforma)
            }
            _ => None,
        };

        let summary = FinalizationSummary {
            attempt_id,
            document_number: number,
            status,
            store_name: self.config.store_name().to_string(),
            terminal_id: self.config.terminal_id().to_string(),
            issued_at,
            valid_until,
            client,
            lines,
            totals,
            change: session.payment().change(totals.total),
            payments,
            pending_deliveries: pending,
            adjustment_lines,
            stock_adjustment,
            converted_proforma,
            warnings,
        };

        session.finish(attempt_id);
        info!(
            attempt_id = %attempt_id,
            document_number = %summary.document_number,
            total = %summary.totals.total,
            warnings = summary.warnings.len(),
            "Finalization complete"
        );

        Ok(summary)
    }

    /// AdjustingStock. Failure is a warning: the document already exists.
    async fn adjust_stock(
        &self,
        attempt_id: Uuid,
        number: &DocumentNumber,
        lines: &[StockAdjustmentLine],
        warnings: &mut Vec<FinalizationWarning>,
    ) -> Option<AdjustmentOutcome> {
        if lines.is_empty() {
            return None;
        }

        match self
            .ledger
            .adjust_once(self.gateway.as_ref(), number, lines)
            .await
        {
            Ok(outcome) => {
                if let AdjustmentOutcome::Applied(report) = &outcome {
                    let failed: Vec<String> = report
                        .failed_lines()
                        .map(|l| {
                            format!(
                                "product {} ({})",
                                l.product_id,
                                l.message.as_deref().unwrap_or("not applied")
                            )
                        })
                        .collect();
                    if !failed.is_empty() {
                        warn!(attempt_id = %attempt_id, document_number = %number, ?failed, "Stock adjustment partially applied");
                        warnings.push(FinalizationWarning::StockAdjustmentFailed {
                            number: number.clone(),
                            reason: failed.join(", "),
                        });
                    }
                }
                Some(outcome)
            }
            Err(e) => {
                warn!(attempt_id = %attempt_id, document_number = %number, error = %e, "Stock adjustment failed");
                warnings.push(FinalizationWarning::StockAdjustmentFailed {
                    number: number.clone(),
                    reason: e.to_string(),
                });
                None
            }
        }
    }

    /// RegisteringPending. On failure the records go back without codes.
    async fn register_pending(
        &self,
        attempt_id: Uuid,
        number: &DocumentNumber,
        mut records: Vec<PendingDeliveryRecord>,
        warnings: &mut Vec<FinalizationWarning>,
    ) -> Vec<PendingDeliveryRecord> {
        if records.is_empty() {
            return records;
        }

        match self
            .gateway
            .register_pending_deliveries(number, &records)
            .await
        {
            Ok(codes) => {
                if codes.len() != records.len() {
                    warn!(
                        attempt_id = %attempt_id,
                        document_number = %number,
                        expected = records.len(),
                        received = codes.len(),
                        "Tracking code count mismatch"
                    );
                    warnings.push(FinalizationWarning::PendingRegistrationFailed {
                        number: number.clone(),
                        reason: format!(
                            "expected {} tracking codes, received {}",
                            records.len(),
                            codes.len()
                        ),
                    });
                }
                for (record, code) in records.iter_mut().zip(codes) {
                    record.tracking_code = Some(code);
                }
                info!(attempt_id = %attempt_id, document_number = %number, records = records.len(), "Pending deliveries registered");
            }
            Err(e) => {
                warn!(attempt_id = %attempt_id, document_number = %number, error = %e, "Pending delivery registration failed");
                warnings.push(FinalizationWarning::PendingRegistrationFailed {
                    number: number.clone(),
                    reason: e.to_string(),
                });
            }
        }

        records
    }

    /// Marks the source proforma converted, once.
    async fn mark_converted(
        &self,
        attempt_id: Uuid,
        proforma: &DocumentNumber,
        warnings: &mut Vec<FinalizationWarning>,
    ) {
        // The invoice exists: never convert this proforma again, even if the
        // store call below fails.
        if !self.converted.lock().await.insert(proforma.clone()) {
            return;
        }

        match self.gateway.convert_proforma(proforma).await {
            Ok(()) => info!(attempt_id = %attempt_id, proforma = %proforma, "Proforma converted"),
            Err(e) => {
                warn!(attempt_id = %attempt_id, proforma = %proforma, error = %e, "Proforma conversion failed");
                warnings.push(FinalizationWarning::ProformaConversionFailed {
                    proforma: proforma.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
}

/// Quantities to decrement: what is on the shelf, never the shortfall.
///
/// Without classifications every cart line is decremented in full.
fn adjustment_lines(
    cart_lines: &[LineItem],
    classifications: &[StockClassification],
) -> Vec<StockAdjustmentLine> {
    if classifications.is_empty() {
        return cart_lines
            .iter()
            .map(|l| StockAdjustmentLine {
                product_id: l.product_id,
                quantity: l.quantity,
            })
            .collect();
    }

    classifications
        .iter()
        .filter(|c| c.fulfilled > 0)
        .map(|c| StockAdjustmentLine {
            product_id: c.product_id,
            quantity: c.fulfilled,
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
