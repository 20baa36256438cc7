//! # Engine Error Types
//!
//! Error types for finalization attempts and the remote document store.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Finalization Error Categories                       │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Domain (fatal) │  │  Gateway (fatal)│  │  Warnings (non-fatal)   │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Core(..)       │  │  StockLookup-   │  │  StockAdjustmentFailed  │ │
//! │  │  InProgress     │  │    Failed       │  │  PendingRegistration-   │ │
//! │  │  NoShortage-    │  │  DocumentSub-   │  │    Failed               │ │
//! │  │   DecisionPend. │  │    missionFailed│  │  ProformaConversion-    │ │
//! │  │  InvoiceNot-    │  │  InvoiceSettle- │  │    Failed               │ │
//! │  │   Pending       │  │    mentFailed   │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Fatal errors end the attempt: the session returns to Idle (before the  │
//! │  document exists) or Failed. Warnings ride along with a finalized       │
//! │  document: the sale happened, a follow-up step did not.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use mostrador_core::{CoreError, DocumentNumber};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type alias for document store calls.
pub type GatewayResult<T> = Result<T, GatewayError>;

// =============================================================================
// Gateway Error
// =============================================================================

/// Failure of one call to the remote document store.
///
/// Timeouts are the transport's business; they surface here like any other
/// failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The call never got an answer (connection refused, reset, DNS).
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The call took too long.
    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    /// The store answered and said no.
    #[error("Rejected by document store: {0}")]
    Rejected(String),
}

impl GatewayError {
    /// True if re-issuing the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Transport(_) | GatewayError::Timeout(_))
    }
}

// =============================================================================
// Engine Error
// =============================================================================

/// Fatal outcome of an engine operation.
#[derive(Debug, Error)]
pub enum EngineError {
    // =========================================================================
    // Domain Errors
    // =========================================================================
    /// A business rule refused the attempt (empty cart, no client, ...).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A finalization is already running for this session.
    #[error("A finalization is already in progress")]
    FinalizationInProgress,

    /// `resolve_shortage` was called with no shortage prompt open.
    #[error("No shortage decision is pending")]
    NoShortageDecisionPending,

    // =========================================================================
    // Gateway Errors
    // =========================================================================
    /// The live stock lookup failed; nothing was written.
    #[error("Stock lookup failed: {0}")]
    StockLookupFailed(GatewayError),

    /// The document store did not issue a document; nothing was written.
    #[error("Document submission failed: {0}")]
    DocumentSubmissionFailed(GatewayError),

    /// A pending invoice could not be marked paid.
    #[error("Invoice settlement failed for {number}: {source}")]
    InvoiceSettlementFailed {
        number: DocumentNumber,
        source: GatewayError,
    },

    /// Only invoices waiting at the cashier can be settled.
    #[error("Invoice {0} is not pending at the cashier")]
    InvoiceNotPending(DocumentNumber),

    /// An explicit stock adjustment retry did not reach the store.
    #[error("Stock adjustment failed for {number}: {source}")]
    StockAdjustmentFailed {
        number: DocumentNumber,
        source: GatewayError,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid engine configuration.
    #[error("Invalid billing configuration: {0}")]
    InvalidConfig(String),

    /// Failed to read or write the config file.
    #[error("Config file error: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// Failed to parse or render TOML.
    #[error("Config format error: {0}")]
    ConfigParse(String),
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::ConfigParse(err.to_string())
    }
}

impl From<toml::ser::Error> for EngineError {
    fn from(err: toml::ser::Error) -> Self {
        EngineError::ConfigParse(err.to_string())
    }
}

impl EngineError {
    /// True if the same attempt may simply be retried by the operator.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::StockLookupFailed(e) | EngineError::DocumentSubmissionFailed(e) => {
                e.is_retryable()
            }
            EngineError::InvoiceSettlementFailed { source, .. }
            | EngineError::StockAdjustmentFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// True if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidConfig(_) | EngineError::ConfigIo(_) | EngineError::ConfigParse(_)
        )
    }
}

// =============================================================================
// Finalization Warnings
// =============================================================================

/// A follow-up step that failed after the document was issued.
///
/// The document stands; the operator must reconcile by hand or retry.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FinalizationWarning {
    #[error("Stock was not decremented for {number}: {reason}")]
    StockAdjustmentFailed { number: DocumentNumber, reason: String },

    #[error("Pending deliveries were not registered for {number}: {reason}")]
    PendingRegistrationFailed { number: DocumentNumber, reason: String },

    #[error("Proforma {proforma} was not marked converted: {reason}")]
    ProformaConversionFailed {
        proforma: DocumentNumber,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(EngineError::StockLookupFailed(GatewayError::Timeout(30)).is_retryable());
        assert!(
            EngineError::DocumentSubmissionFailed(GatewayError::Transport("reset".into()))
                .is_retryable()
        );

        assert!(!EngineError::DocumentSubmissionFailed(GatewayError::Rejected(
            "duplicate".into()
        ))
        .is_retryable());
        assert!(!EngineError::Core(CoreError::EmptyCart).is_retryable());
        assert!(!EngineError::FinalizationInProgress.is_retryable());
    }

    #[test]
    fn test_core_errors_pass_through() {
        let err: EngineError = CoreError::NoClientSelected.into();
        assert_eq!(err.to_string(), CoreError::NoClientSelected.to_string());
    }

    #[test]
    fn test_warning_display() {
        let warning = FinalizationWarning::StockAdjustmentFailed {
            number: DocumentNumber::new("F-0101"),
            reason: "timeout".into(),
        };
        assert!(warning.to_string().contains("F-0101"));
        assert!(warning.to_string().contains("timeout"));
    }
}
