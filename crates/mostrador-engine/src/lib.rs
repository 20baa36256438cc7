//! # mostrador-engine: Sale Finalization for Mostrador
//!
//! Turns a priced cart into a numbered invoice or proforma, keeping stock,
//! pending deliveries and proforma state consistent with the document store.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Finalization Engine                                │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 Orchestrator (one per store)                     │  │
//! │  │                                                                  │  │
//! │  │  begin_finalization / resolve_shortage / convert_proforma        │  │
//! │  │  settle_pending_invoice / retry_stock_adjustment                 │  │
//! │  └──────┬──────────────────────┬──────────────────────┬─────────────┘  │
//! │         ▼                      ▼                      ▼                 │
//! │  ┌────────────────┐  ┌──────────────────┐  ┌────────────────────────┐  │
//! │  │ FinalizationSe-│  │ AdjustmentLedger │  │ BillingGateway (trait) │  │
//! │  │ ssion          │  │                  │  │                        │  │
//! │  │ cart, payment, │  │ one decrement    │  │ lookup / submit /      │  │
//! │  │ phase          │  │ per document     │  │ adjust / pending / ... │  │
//! │  └────────────────┘  └──────────────────┘  └───────────┬────────────┘  │
//! │                                                        │               │
//! │                                      ┌─────────────────┴────────────┐  │
//! │                                      │ InMemoryGateway │ remote ... │  │
//! │                                      └──────────────────────────────┘  │
//! │                                                                         │
//! │  Pricing, cart rules, split validation and stock classification live   │
//! │  in `mostrador-core` and are pure.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`orchestrator`] - Attempt sequencing and degraded outcomes
//! - [`session`] - Per-counter cart, payment and phase
//! - [`gateway`] - The remote document store contract
//! - [`idempotency`] - At-most-once stock adjustment
//! - [`memory`] - In-process document store
//! - [`summary`] - Receipt-ready results
//! - [`config`] - Store identity and multipliers
//! - [`error`] - Engine errors and warnings
//! - [`telemetry`] - Tracing subscriber setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mostrador_engine::{EngineConfig, InMemoryGateway, Orchestrator, FinalizationSession};
//! use mostrador_core::AuthorizationFlags;
//!
//! let orchestrator = Orchestrator::new(Arc::new(gateway), EngineConfig::load_or_default(None));
//! let mut session = FinalizationSession::new();
//! session.cart_mut()?.add_line(&product, 2)?;
//! session.cart_mut()?.select_client(client);
//!
//! match orchestrator.begin_finalization(&mut session, AuthorizationFlags::cashier()).await? {
//!     FinalizationOutcome::Completed(summary) => println!("{}", summary.document_number),
//!     FinalizationOutcome::ShortageDecisionRequired(lines) => { /* ask the operator */ }
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod gateway;
pub mod idempotency;
pub mod memory;
pub mod orchestrator;
pub mod session;
pub mod summary;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{EngineConfig, PricingSettings, StoreConfig};
pub use error::{EngineError, EngineResult, FinalizationWarning, GatewayError, GatewayResult};
pub use gateway::{AdjustmentReport, BillingGateway, LineAdjustment, StockAdjustmentLine};
pub use idempotency::{AdjustmentLedger, AdjustmentOutcome};
pub use memory::InMemoryGateway;
pub use orchestrator::Orchestrator;
pub use session::{FinalizationPhase, FinalizationSession};
pub use summary::{FinalizationOutcome, FinalizationSummary, ShortageDecision};
pub use telemetry::init_tracing;
