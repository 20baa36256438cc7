//! # mostrador-core: Pure Billing Logic for Mostrador
//!
//! This crate holds every rule of sale finalization that can be stated
//! without touching the network: pricing, the cart, payment allocation,
//! stock reconciliation and the proforma lifecycle.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Mostrador Billing Architecture                     │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Counter UI / caller                          │   │
//! │  │    Cart screen ──► Payment screen ──► Shortage prompt ──► Print │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               mostrador-engine (orchestrator)                   │   │
//! │  │    finalization state machine, idempotency ledger, gateway      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ mostrador-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐ │   │
//! │  │   │ pricing │ │  cart   │ │ payment │ │  stock  │ │ proforma │ │   │
//! │  │   │ ×mult.  │ │ lines   │ │ splits  │ │ classify│ │ lifecycle│ │   │
//! │  │   │ +13%    │ │ client  │ │ ±1 cent │ │ pending │ │ 30 days  │ │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └──────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO CLOCK • NO NETWORK • PURE FUNCTIONS               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money in cents, basis-point scaling with half-up rounding
//! - [`types`] - Payment methods, identifiers, client, authorization flags
//! - [`error`] - Domain error types
//! - [`validation`] - Field and quantity rules
//! - [`pricing`] - Payment-method multipliers and tax totals
//! - [`cart`] - Line items and the selected client
//! - [`payment`] - Single and split payment allocation
//! - [`stock`] - Shortfall classification and pending deliveries
//! - [`document`] - Invoices, proformas and the status policy
//! - [`proforma`] - Proforma expiry and conversion
//! - [`normalize`] - Upstream JSON records to typed values
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input, same output; `now` is always a parameter
//! 2. **Integer Money**: cents in `i64`, multipliers and tax in basis points
//! 3. **Explicit Errors**: every failure is a typed [`CoreError`]
//!
//! ## Example Usage
//!
//! ```rust
//! use mostrador_core::cart::LineItem;
//! use mostrador_core::pricing::{PricingCalculator, PricingMode};
//! use mostrador_core::{Money, PaymentMethod, ProductId};
//!
//! let lines = vec![
//!     LineItem::new(ProductId(1), "Pastillas de freno", Money::from_major(2000), 1, 5).unwrap(),
//! ];
//! let totals = PricingCalculator::default()
//!     .totals(&lines, PricingMode::Method(PaymentMethod::Card));
//!
//! // 2000 × 1.05 = 2100, plus 13% tax
//! assert_eq!(totals.subtotal, Money::from_major(2100));
//! assert_eq!(totals.tax, Money::from_major(273));
//! assert_eq!(totals.total, Money::from_major(2373));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod document;
pub mod error;
pub mod money;
pub mod normalize;
pub mod payment;
pub mod pricing;
pub mod proforma;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Value-added tax applied to every subtotal (13%).
pub const TAX_RATE: TaxRate = TaxRate::from_bps(1300);

/// Largest |total − Σ split amounts| still accepted as balanced.
///
/// Split amounts are typed by hand in major units; one cent of slack absorbs
/// the rounding of the displayed total.
pub const SPLIT_TOLERANCE: Money = Money::from_cents(1);

/// Maximum distinct lines in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Catches typos at the counter (1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Days a proforma stays convertible after issue.
pub const PROFORMA_VALIDITY_DAYS: i64 = 30;
