//! # Finalization Session
//!
//! Everything one counter session owns: the cart, the chosen payment, the
//! document kind, and where the current finalization attempt stands.
//!
//! ## Phases
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Idle ──► Validating ──► Reconciling ──┬──────────────► Submitting      │
//! │   ▲          │               │         │                    │           │
//! │   │ error    │     shortfall │         │                    ▼           │
//! │   ├──────────┘               ▼         │             AdjustingStock     │
//! │   │              AwaitingShortageDecision                   │           │
//! │   │  abandon        │    │   │                              ▼           │
//! │   └─────────────────┘    │   └─ proceed anyway ──► RegisteringPending   │
//! │        remove short lines│                                  │           │
//! │        ──► Validating ◄──┘                                  ▼           │
//! │                                                   Complete | Failed     │
//! │                                                                         │
//! │  A new attempt may start from Idle, Complete or Failed.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! While an attempt is in flight the cart and payment plan are frozen:
//! mutation goes through [`FinalizationSession::cart_mut`] and
//! [`FinalizationSession::set_payment`], which refuse with
//! `FinalizationInProgress`.

use mostrador_core::cart::Cart;
use mostrador_core::document::{DocumentKind, DocumentStatus};
use mostrador_core::payment::PaymentPlan;
use mostrador_core::proforma::Proforma;
use mostrador_core::stock::StockClassification;
use mostrador_core::{AuthorizationFlags, PaymentMethod};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Phase
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizationPhase {
    #[default]
    Idle,
    Validating,
    Reconciling,
    AwaitingShortageDecision,
    Submitting,
    AdjustingStock,
    RegisteringPending,
    Complete,
    Failed,
}

impl FinalizationPhase {
    /// True while an attempt owns the session.
    pub fn is_in_flight(&self) -> bool {
        !matches!(
            self,
            FinalizationPhase::Idle | FinalizationPhase::Complete | FinalizationPhase::Failed
        )
    }
}

impl fmt::Display for FinalizationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FinalizationPhase::Idle => "idle",
            FinalizationPhase::Validating => "validating",
            FinalizationPhase::Reconciling => "reconciling",
            FinalizationPhase::AwaitingShortageDecision => "awaiting_shortage_decision",
            FinalizationPhase::Submitting => "submitting",
            FinalizationPhase::AdjustingStock => "adjusting_stock",
            FinalizationPhase::RegisteringPending => "registering_pending",
            FinalizationPhase::Complete => "complete",
            FinalizationPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Suspended Attempt
// =============================================================================

/// An attempt parked on the operator's shortage decision.
#[derive(Debug, Clone)]
pub(crate) struct SuspendedAttempt {
    pub attempt_id: Uuid,
    pub flags: AuthorizationFlags,
    pub status: DocumentStatus,
    pub classifications: Vec<StockClassification>,
}

// =============================================================================
// Session
// =============================================================================

/// One counter session. Owned by the caller, lent to the orchestrator.
#[derive(Debug, Clone)]
pub struct FinalizationSession {
    cart: Cart,
    payment: PaymentPlan,
    kind: DocumentKind,
    phase: FinalizationPhase,
    suspended: Option<SuspendedAttempt>,
    source_proforma: Option<Proforma>,
}

impl Default for FinalizationSession {
    fn default() -> Self {
        FinalizationSession {
            cart: Cart::new(),
            payment: PaymentPlan::single(PaymentMethod::Cash),
            kind: DocumentKind::Invoice,
            phase: FinalizationPhase::Idle,
            suspended: None,
            source_proforma: None,
        }
    }
}

impl FinalizationSession {
    /// An empty session: no lines, no client, cash, invoice.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// The cart, for editing. Refused while an attempt is in flight.
    pub fn cart_mut(&mut self) -> EngineResult<&mut Cart> {
        self.ensure_not_in_flight()?;
        Ok(&mut self.cart)
    }

    pub fn payment(&self) -> &PaymentPlan {
        &self.payment
    }

    pub fn set_payment(&mut self, plan: PaymentPlan) -> EngineResult<()> {
        self.ensure_not_in_flight()?;
        self.payment = plan;
        Ok(())
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: DocumentKind) -> EngineResult<()> {
        self.ensure_not_in_flight()?;
        self.kind = kind;
        Ok(())
    }

    pub fn phase(&self) -> FinalizationPhase {
        self.phase
    }

    /// Classifications awaiting the operator's decision, if any.
    pub fn pending_shortage(&self) -> Option<&[StockClassification]> {
        self.suspended.as_ref().map(|s| s.classifications.as_slice())
    }

    /// The proforma this session's cart was loaded from, if any.
    pub fn source_proforma(&self) -> Option<&Proforma> {
        self.source_proforma.as_ref()
    }

    pub fn is_in_flight(&self) -> bool {
        self.phase.is_in_flight()
    }

    // =========================================================================
    // Orchestrator Hooks
    // =========================================================================

    pub(crate) fn ensure_not_in_flight(&self) -> EngineResult<()> {
        if self.phase.is_in_flight() {
            return Err(EngineError::FinalizationInProgress);
        }
        Ok(())
    }

    pub(crate) fn enter(&mut self, phase: FinalizationPhase, attempt_id: Uuid) {
        debug!(attempt_id = %attempt_id, from = %self.phase, to = %phase, "Finalization phase");
        self.phase = phase;
    }

    pub(crate) fn cart_for_attempt(&mut self) -> &mut Cart {
        &mut self.cart
    }

    pub(crate) fn suspend(&mut self, attempt: SuspendedAttempt) {
        self.enter(FinalizationPhase::AwaitingShortageDecision, attempt.attempt_id);
        self.suspended = Some(attempt);
    }

    pub(crate) fn take_suspended(&mut self) -> Option<SuspendedAttempt> {
        self.suspended.take()
    }

    pub(crate) fn load_proforma(&mut self, proforma: Proforma, cart: Cart) {
        self.cart = cart;
        self.kind = DocumentKind::Invoice;
        self.source_proforma = Some(proforma);
    }

    /// Success: the cart is discarded along with any proforma link.
    pub(crate) fn finish(&mut self, attempt_id: Uuid) {
        self.cart.clear();
        self.source_proforma = None;
        self.suspended = None;
        self.enter(FinalizationPhase::Complete, attempt_id);
    }

    /// Failure after submission began: the cart stays for a retry.
    pub(crate) fn fail(&mut self, attempt_id: Uuid) {
        self.suspended = None;
        self.enter(FinalizationPhase::Failed, attempt_id);
    }

    /// Back to idle with the cart intact (validation errors, lookup failures).
    pub(crate) fn rewind(&mut self, attempt_id: Uuid) {
        self.suspended = None;
        self.enter(FinalizationPhase::Idle, attempt_id);
    }

    /// Shortage flow abandoned: no side effects happened, the cart is discarded.
    pub(crate) fn abandon(&mut self, attempt_id: Uuid) {
        self.cart.clear();
        self.source_proforma = None;
        self.suspended = None;
        self.enter(FinalizationPhase::Idle, attempt_id);
    }

    /// Settles a session whose attempt stopped mid-phase (its future was
    /// dropped). Terminal and suspended sessions are left alone.
    pub(crate) fn interrupt(&mut self, attempt_id: Uuid) {
        match self.phase {
            FinalizationPhase::Validating | FinalizationPhase::Reconciling => {
                warn!(attempt_id = %attempt_id, phase = %self.phase, "Attempt interrupted before submission");
                self.rewind(attempt_id);
            }
            FinalizationPhase::AwaitingShortageDecision if self.suspended.is_none() => {
                warn!(attempt_id = %attempt_id, "Attempt interrupted while resuming");
                self.rewind(attempt_id);
            }
            FinalizationPhase::Submitting => {
                warn!(
                    attempt_id = %attempt_id,
                    "Attempt interrupted during submission; the document may exist"
                );
                self.fail(attempt_id);
            }
            FinalizationPhase::AdjustingStock | FinalizationPhase::RegisteringPending => {
                warn!(
                    attempt_id = %attempt_id,
                    phase = %self.phase,
                    "Attempt interrupted after submission; follow-up steps may be incomplete"
                );
                self.finish(attempt_id);
            }
            _ => {}
        }
    }
}

// =============================================================================
// Attempt Guard
// =============================================================================

/// Exclusive access to a session for one attempt.
///
/// Dropping the guard mid-phase (a cancelled or timed-out future) calls
/// [`FinalizationSession::interrupt`], so the session never stays in flight.
pub(crate) struct AttemptGuard<'a> {
    session: &'a mut FinalizationSession,
    attempt_id: Uuid,
}

impl<'a> AttemptGuard<'a> {
    pub(crate) fn new(session: &'a mut FinalizationSession, attempt_id: Uuid) -> Self {
        AttemptGuard {
            session,
            attempt_id,
        }
    }
}

impl Deref for AttemptGuard<'_> {
    type Target = FinalizationSession;

    fn deref(&self) -> &FinalizationSession {
        self.session
    }
}

impl DerefMut for AttemptGuard<'_> {
    fn deref_mut(&mut self) -> &mut FinalizationSession {
        self.session
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        self.session.interrupt(self.attempt_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_phases() {
        assert!(!FinalizationPhase::Idle.is_in_flight());
        assert!(!FinalizationPhase::Complete.is_in_flight());
        assert!(!FinalizationPhase::Failed.is_in_flight());
        assert!(FinalizationPhase::AwaitingShortageDecision.is_in_flight());
        assert!(FinalizationPhase::Submitting.is_in_flight());
    }

    #[test]
    fn test_session_is_frozen_while_in_flight() {
        let mut session = FinalizationSession::new();
        let attempt = Uuid::new_v4();
        session.suspend(SuspendedAttempt {
            attempt_id: attempt,
            flags: AuthorizationFlags::cashier(),
            status: DocumentStatus::Invoice(mostrador_core::document::InvoiceStatus::Paid),
            classifications: Vec::new(),
        });

        assert!(matches!(session.cart_mut(), Err(EngineError::FinalizationInProgress)));
        assert!(session
            .set_payment(PaymentPlan::single(PaymentMethod::Card))
            .is_err());
        assert!(session.set_kind(DocumentKind::Proforma).is_err());

        session.rewind(attempt);
        assert!(session.cart_mut().is_ok());
        assert_eq!(session.pending_shortage(), None);
    }

    #[test]
    fn test_dropped_guard_settles_the_phase() {
        let attempt = Uuid::new_v4();

        let mut session = FinalizationSession::new();
        {
            let mut guard = AttemptGuard::new(&mut session, attempt);
            guard.enter(FinalizationPhase::Reconciling, attempt);
        }
        assert_eq!(session.phase(), FinalizationPhase::Idle);
        assert!(session.cart_mut().is_ok());

        {
            let mut guard = AttemptGuard::new(&mut session, attempt);
            guard.enter(FinalizationPhase::Submitting, attempt);
        }
        assert_eq!(session.phase(), FinalizationPhase::Failed);

        {
            let mut guard = AttemptGuard::new(&mut session, attempt);
            guard.enter(FinalizationPhase::AdjustingStock, attempt);
        }
        assert_eq!(session.phase(), FinalizationPhase::Complete);
    }

    #[test]
    fn test_guard_leaves_suspended_attempt_alone() {
        let attempt = Uuid::new_v4();
        let mut session = FinalizationSession::new();
        {
            let mut guard = AttemptGuard::new(&mut session, attempt);
            guard.suspend(SuspendedAttempt {
                attempt_id: attempt,
                flags: AuthorizationFlags::cashier(),
                status: DocumentStatus::Invoice(mostrador_core::document::InvoiceStatus::Paid),
                classifications: Vec::new(),
            });
        }
        assert_eq!(session.phase(), FinalizationPhase::AwaitingShortageDecision);
        assert!(session.pending_shortage().is_some());
    }
}
