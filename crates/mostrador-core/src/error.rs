//! # Error Types
//!
//! Domain-specific error types for mostrador-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  mostrador-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  mostrador-engine errors (separate crate)                              │
//! │  ├── EngineError          - Fatal to a finalization attempt            │
//! │  └── FinalizationWarning  - Degraded but completed                     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → UI                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product id, delta, status)
//! 3. Errors are enum variants, never String
//! 4. Every CoreError is recoverable locally: no external call has happened

use thiserror::Error;

use crate::money::Money;
use crate::types::ProductId;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A cart with no lines cannot be finalized.
    #[error("Cart is empty")]
    EmptyCart,

    /// Invoices and proformas are always billed to a client.
    #[error("No client selected")]
    NoClientSelected,

    /// Quantity below 1 or above the per-line maximum.
    #[error("Invalid quantity {requested} for product {product_id} (allowed 1..={max})")]
    InvalidQuantity {
        product_id: ProductId,
        requested: i64,
        max: i64,
    },

    /// Requested more than the stock known when the line was added.
    ///
    /// ## When This Occurs
    /// Only at add/update time, against the stock figure shown in the
    /// product search. This is a soft check: the authoritative comparison
    /// happens in stock reconciliation at finalization time.
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
        requested: i64,
    },

    /// Split payments do not add up to the document total.
    ///
    /// `delta = total - Σamount`. Positive means money is still owed,
    /// negative means the splits exceed the total.
    #[error("Payments do not match total: difference {delta}")]
    PaymentMismatch { delta: Money },

    /// A split line with a zero or negative amount.
    #[error("Payment split #{index} has invalid amount {amount}")]
    InvalidSplitAmount { index: usize, amount: Money },

    /// Only `Active` proformas can become invoices.
    #[error("Proforma {proforma_id} is {status} and cannot be converted")]
    ProformaNotConvertible { proforma_id: String, status: String },

    /// The product is not in the cart.
    #[error("Product {0} is not in the cart")]
    LineNotFound(ProductId),

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// The caller holds neither "can complete" nor "can create" rights.
    #[error("Caller is not authorized to issue invoices")]
    NotAuthorized,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised at the boundary (upstream records, cashier input) before any
/// business rule runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., a string where a number was expected).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: ProductId(2),
            available: 4,
            requested: 10,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product 2: available 4, requested 10"
        );

        let err = CoreError::PaymentMismatch {
            delta: Money::from_major(2650),
        };
        assert_eq!(err.to_string(), "Payments do not match total: difference ₡2650.00");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
