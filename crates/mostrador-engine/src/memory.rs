//! # In-Memory Billing Gateway
//!
//! A complete, deterministic document store kept in process memory.
//!
//! Used by the orchestrator tests and the `simulate` binary. It behaves like
//! the remote store where the engine can observe it:
//! - numbers are assigned sequentially (`F-0001`, `PF-0001`)
//! - `adjust_stock` is idempotent by document number on its side too
//! - proformas can be converted once
//!
//! Every operation counts its calls, and each can be told to fail once.

use async_trait::async_trait;
use mostrador_core::document::{Document, Invoice, InvoiceStatus};
use mostrador_core::payment::PaymentSplit;
use mostrador_core::proforma::{Proforma, ProformaStatus};
use mostrador_core::stock::{PendingDeliveryRecord, StockClassification};
use mostrador_core::{DocumentNumber, ProductId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{AdjustmentReport, BillingGateway, LineAdjustment, StockAdjustmentLine};

// =============================================================================
// Store State
// =============================================================================

#[derive(Debug, Default)]
struct StoreState {
    stock: HashMap<ProductId, i64>,
    next_invoice: u32,
    next_proforma: u32,
    invoices: HashMap<DocumentNumber, Invoice>,
    proformas: HashMap<DocumentNumber, Proforma>,
    adjusted: HashMap<DocumentNumber, AdjustmentReport>,
    pending: Vec<(DocumentNumber, PendingDeliveryRecord)>,
}

#[derive(Debug, Default)]
struct CallCounters {
    lookup: AtomicUsize,
    submit: AtomicUsize,
    adjust: AtomicUsize,
    register: AtomicUsize,
    convert: AtomicUsize,
    verify: AtomicUsize,
    mark_paid: AtomicUsize,
    /// Adjustments that actually changed stock.
    decrements: AtomicUsize,
}

#[derive(Debug, Default)]
struct FailureSwitches {
    lookup: AtomicBool,
    submit: AtomicBool,
    adjust: AtomicBool,
    register: AtomicBool,
    convert: AtomicBool,
    mark_paid: AtomicBool,
}

fn trip(switch: &AtomicBool) -> bool {
    switch.swap(false, Ordering::SeqCst)
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

// =============================================================================
// Gateway
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryGateway {
    state: Mutex<StoreState>,
    calls: CallCounters,
    fail: FailureSwitches,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets stock on hand for a product.
    pub fn with_stock(mut self, product_id: ProductId, quantity: i64) -> Self {
        self.state.get_mut().stock.insert(product_id, quantity);
        self
    }

    /// Stores a proforma as if it had been issued earlier.
    pub fn with_proforma(mut self, proforma: Proforma) -> Self {
        self.state
            .get_mut()
            .proformas
            .insert(proforma.number.clone(), proforma);
        self
    }

    pub async fn set_stock(&self, product_id: ProductId, quantity: i64) {
        self.state.lock().await.stock.insert(product_id, quantity);
    }

    pub async fn stock_of(&self, product_id: ProductId) -> i64 {
        self.state
            .lock()
            .await
            .stock
            .get(&product_id)
            .copied()
            .unwrap_or(0)
    }

    pub async fn invoice(&self, number: &DocumentNumber) -> Option<Invoice> {
        self.state.lock().await.invoices.get(number).cloned()
    }

    pub async fn proforma(&self, number: &DocumentNumber) -> Option<Proforma> {
        self.state.lock().await.proformas.get(number).cloned()
    }

    pub async fn proforma_status(&self, number: &DocumentNumber) -> Option<ProformaStatus> {
        self.proforma(number).await.map(|p| p.status)
    }

    /// Registered pending deliveries for a document, with tracking codes.
    pub async fn pending_for(&self, number: &DocumentNumber) -> Vec<PendingDeliveryRecord> {
        self.state
            .lock()
            .await
            .pending
            .iter()
            .filter(|(n, _)| n == number)
            .map(|(_, r)| r.clone())
            .collect()
    }

    // =========================================================================
    // Failure Injection
    // =========================================================================

    pub fn fail_next_lookup(&self) {
        self.fail.lookup.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_submit(&self) {
        self.fail.submit.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_adjustment(&self) {
        self.fail.adjust.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_registration(&self) {
        self.fail.register.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_conversion(&self) {
        self.fail.convert.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_mark_paid(&self) {
        self.fail.mark_paid.store(true, Ordering::SeqCst);
    }

    // =========================================================================
    // Call Counters
    // =========================================================================

    pub fn lookup_calls(&self) -> usize {
        self.calls.lookup.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.calls.submit.load(Ordering::SeqCst)
    }

    pub fn adjust_calls(&self) -> usize {
        self.calls.adjust.load(Ordering::SeqCst)
    }

    pub fn register_calls(&self) -> usize {
        self.calls.register.load(Ordering::SeqCst)
    }

    pub fn convert_calls(&self) -> usize {
        self.calls.convert.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.calls.verify.load(Ordering::SeqCst)
    }

    pub fn mark_paid_calls(&self) -> usize {
        self.calls.mark_paid.load(Ordering::SeqCst)
    }

    /// Adjustments that changed stock (duplicates excluded).
    pub fn applied_decrements(&self) -> usize {
        self.calls.decrements.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BillingGateway for InMemoryGateway {
    async fn lookup_live_stock(
        &self,
        product_ids: &[ProductId],
    ) -> GatewayResult<HashMap<ProductId, i64>> {
        bump(&self.calls.lookup);
        if trip(&self.fail.lookup) {
            return Err(GatewayError::Timeout(30));
        }

        let state = self.state.lock().await;
        Ok(product_ids
            .iter()
            .filter_map(|id| state.stock.get(id).map(|qty| (*id, *qty)))
            .collect())
    }

    async fn submit_document(&self, document: &Document) -> GatewayResult<DocumentNumber> {
        bump(&self.calls.submit);
        if trip(&self.fail.submit) {
            return Err(GatewayError::Transport("connection reset by peer".into()));
        }

        let mut state = self.state.lock().await;
        let number = match document {
            Document::Invoice {
                body,
                status,
                payments,
                pending_deliveries,
                ..
            } => {
                state.next_invoice += 1;
                let number = DocumentNumber::new(format!("F-{:04}", state.next_invoice));
                state.invoices.insert(
                    number.clone(),
                    Invoice {
                        number: number.clone(),
                        status: *status,
                        body: body.clone(),
                        payments: payments.clone(),
                        pending_deliveries: pending_deliveries.clone(),
                    },
                );
                number
            }
            Document::Proforma { body, valid_until } => {
                state.next_proforma += 1;
                let number = DocumentNumber::new(format!("PF-{:04}", state.next_proforma));
                let mut proforma = Proforma::issue(number.clone(), body.clone());
                proforma.valid_until = *valid_until;
                state.proformas.insert(number.clone(), proforma);
                number
            }
        };

        debug!(document_number = %number, "Document stored");
        Ok(number)
    }

    async fn adjust_stock(
        &self,
        number: &DocumentNumber,
        lines: &[StockAdjustmentLine],
    ) -> GatewayResult<AdjustmentReport> {
        bump(&self.calls.adjust);
        if trip(&self.fail.adjust) {
            return Err(GatewayError::Timeout(30));
        }

        let mut state = self.state.lock().await;
        if let Some(previous) = state.adjusted.get(number) {
            return Ok(previous.clone());
        }

        let mut per_line = Vec::with_capacity(lines.len());
        for line in lines {
            let applied = match state.stock.get_mut(&line.product_id) {
                Some(on_hand) => {
                    *on_hand -= line.quantity;
                    true
                }
                None => false,
            };
            per_line.push(LineAdjustment {
                product_id: line.product_id,
                quantity: line.quantity,
                applied,
                message: (!applied).then(|| "unknown product".to_string()),
            });
        }

        let report = AdjustmentReport { per_line };
        state.adjusted.insert(number.clone(), report.clone());
        bump(&self.calls.decrements);
        Ok(report)
    }

    async fn register_pending_deliveries(
        &self,
        number: &DocumentNumber,
        records: &[PendingDeliveryRecord],
    ) -> GatewayResult<Vec<String>> {
        bump(&self.calls.register);
        if trip(&self.fail.register) {
            return Err(GatewayError::Transport("pending service unavailable".into()));
        }

        let mut state = self.state.lock().await;
        let mut codes = Vec::with_capacity(records.len());
        for record in records {
            let code = format!("PD-{}", &Uuid::new_v4().simple().to_string()[..8]).to_uppercase();
            let mut stored = record.clone();
            stored.tracking_code = Some(code.clone());
            state.pending.push((number.clone(), stored));
            codes.push(code);
        }
        Ok(codes)
    }

    async fn convert_proforma(&self, proforma: &DocumentNumber) -> GatewayResult<()> {
        bump(&self.calls.convert);
        if trip(&self.fail.convert) {
            return Err(GatewayError::Transport("proforma service unavailable".into()));
        }

        let mut state = self.state.lock().await;
        let stored = state
            .proformas
            .get_mut(proforma)
            .ok_or_else(|| GatewayError::Rejected(format!("unknown proforma {}", proforma)))?;
        stored
            .mark_converted()
            .map_err(|e| GatewayError::Rejected(e.to_string()))
    }

    async fn verify_stock_for_document(
        &self,
        number: &DocumentNumber,
    ) -> GatewayResult<Vec<StockClassification>> {
        bump(&self.calls.verify);

        let state = self.state.lock().await;
        let invoice = state
            .invoices
            .get(number)
            .ok_or_else(|| GatewayError::Rejected(format!("unknown invoice {}", number)))?;

        Ok(invoice
            .body
            .lines
            .iter()
            .map(|line| {
                StockClassification::new(
                    line.product_id,
                    line.name.clone(),
                    line.unit_base_price,
                    line.quantity,
                    state.stock.get(&line.product_id).copied().unwrap_or(0),
                )
            })
            .collect())
    }

    async fn mark_invoice_paid(
        &self,
        number: &DocumentNumber,
        payments: &[PaymentSplit],
    ) -> GatewayResult<()> {
        bump(&self.calls.mark_paid);
        if trip(&self.fail.mark_paid) {
            return Err(GatewayError::Transport("connection reset by peer".into()));
        }

        let mut state = self.state.lock().await;
        let invoice = state
            .invoices
            .get_mut(number)
            .ok_or_else(|| GatewayError::Rejected(format!("unknown invoice {}", number)))?;
        if invoice.status != InvoiceStatus::PendingAtCashier {
            return Err(GatewayError::Rejected(format!("invoice {} is already paid", number)));
        }
        invoice.mark_paid(payments.to_vec());
        Ok(())
    }
}
