//! # Domain Types
//!
//! Small value types shared by every billing module.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │ PriceMultiplier │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  bps (u32)      │   │  Cash           │       │
//! │  │  1300 = 13%     │   │  10500 = ×1.05  │   │  Card           │       │
//! │  └─────────────────┘   └─────────────────┘   │  Transfer       │       │
//! │                                              │  SinpeMobile    │       │
//! │  ┌─────────────────┐   ┌─────────────────┐   └─────────────────┘       │
//! │  │    ProductId    │   │     Client      │                              │
//! │  │  ─────────────  │   │  ─────────────  │   ┌─────────────────┐       │
//! │  │  i64 (catalog)  │   │  id, name,      │   │ Authorization   │       │
//! │  └─────────────────┘   │  identification │   │ can_complete    │       │
//! │                        └─────────────────┘   │ can_create      │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1300 bps = 13% (IVA).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

// =============================================================================
// Price Multiplier
// =============================================================================

/// A per-payment-method price factor in basis points.
///
/// `10000` leaves the base price unchanged; `10500` is a 5% card surcharge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceMultiplier(u32);

impl PriceMultiplier {
    /// The base price, unchanged.
    pub const IDENTITY: PriceMultiplier = PriceMultiplier(10_000);

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        PriceMultiplier(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the factor as a decimal (for display only), e.g. `1.05`.
    #[inline]
    pub fn factor(&self) -> f64 {
        self.0 as f64 / 10_000.0
    }
}

impl Default for PriceMultiplier {
    fn default() -> Self {
        PriceMultiplier::IDENTITY
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer pays.
///
/// The price multiplier of each method lives in
/// [`MultiplierTable`](crate::pricing::MultiplierTable), not here: the table
/// is store configuration, the method is cart state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash.
    Cash,
    /// Credit or debit card on the store terminal.
    Card,
    /// Bank transfer.
    Transfer,
    /// SINPE Móvil phone transfer.
    SinpeMobile,
}

impl PaymentMethod {
    /// All methods, in the order the cashier screen lists them.
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::Transfer,
        PaymentMethod::SinpeMobile,
    ];

    /// Label printed on the receipt.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Efectivo",
            PaymentMethod::Card => "Tarjeta",
            PaymentMethod::Transfer => "Transferencia",
            PaymentMethod::SinpeMobile => "SINPE Móvil",
        }
    }

    /// Only cash tenders can produce change.
    pub fn gives_change(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "efectivo" => Ok(PaymentMethod::Cash),
            "card" | "tarjeta" | "credit" | "debit" => Ok(PaymentMethod::Card),
            "transfer" | "transferencia" => Ok(PaymentMethod::Transfer),
            "sinpe" | "sinpe_mobile" | "sinpemobile" | "sinpemovil" | "sinpe móvil" | "sinpe movil" => {
                Ok(PaymentMethod::SinpeMobile)
            }
            _ => Err(ValidationError::NotAllowed {
                field: "payment method".to_string(),
                allowed: PaymentMethod::ALL
                    .iter()
                    .map(|m| format!("{:?}", m).to_lowercase())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Identifiers
// =============================================================================

/// Catalog identifier of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number assigned by the document store to an invoice or proforma.
///
/// Doubles as the idempotency key of the stock adjustment for that document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentNumber(pub String);

impl DocumentNumber {
    pub fn new(number: impl Into<String>) -> Self {
        DocumentNumber(number.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Client
// =============================================================================

/// The customer a document is billed to.
///
/// Upstream records spell these fields several ways; use
/// [`normalize_client`](crate::normalize::normalize_client) at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: i64,
    pub name: String,
    /// Cédula or company id.
    pub identification: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

// =============================================================================
// Authorization
// =============================================================================

/// Role flags resolved by the caller. The core never computes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationFlags {
    /// May issue paid invoices and take payment.
    pub can_complete: bool,
    /// May create invoices that are paid later at the cashier.
    pub can_create: bool,
}

impl AuthorizationFlags {
    /// A cashier: can take payment.
    pub const fn cashier() -> Self {
        AuthorizationFlags {
            can_complete: true,
            can_create: true,
        }
    }

    /// A salesperson: builds invoices, the cashier collects.
    pub const fn salesperson() -> Self {
        AuthorizationFlags {
            can_complete: false,
            can_create: true,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_percentage() {
        let rate = TaxRate::from_bps(1300);
        assert_eq!(rate.bps(), 1300);
        assert!((rate.percentage() - 13.0).abs() < 0.001);
    }

    #[test]
    fn test_multiplier_default_is_identity() {
        assert_eq!(PriceMultiplier::default(), PriceMultiplier::IDENTITY);
        assert!((PriceMultiplier::from_bps(10500).factor() - 1.05).abs() < 1e-9);
    }

    #[test]
    fn test_payment_method_parsing() {
        assert_eq!("cash".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert_eq!("Efectivo".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert_eq!("tarjeta".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert_eq!(
            "transferencia".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::Transfer
        );
        assert_eq!("SINPE".parse::<PaymentMethod>().unwrap(), PaymentMethod::SinpeMobile);
        assert!("bitcoin".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_every_allowed_payment_method_name_parses() {
        let Err(ValidationError::NotAllowed { allowed, .. }) = "bitcoin".parse::<PaymentMethod>() else {
            panic!("expected NotAllowed");
        };
        assert_eq!(allowed.len(), PaymentMethod::ALL.len());
        for name in &allowed {
            assert!(name.parse::<PaymentMethod>().is_ok(), "{} is listed but refused", name);
        }
        assert_eq!("sinpemobile".parse::<PaymentMethod>().unwrap(), PaymentMethod::SinpeMobile);
    }

    #[test]
    fn test_payment_method_labels() {
        assert_eq!(PaymentMethod::SinpeMobile.to_string(), "SINPE Móvil");
        assert!(PaymentMethod::Cash.gives_change());
        assert!(!PaymentMethod::Card.gives_change());
    }

    #[test]
    fn test_client_serializes_camel_case() {
        let client = Client {
            id: 7,
            name: "Taller El Roble".to_string(),
            identification: Some("3-101-123456".to_string()),
            email: None,
            phone: None,
        };
        let json = serde_json::to_value(&client).unwrap();
        assert_eq!(json["identification"], "3-101-123456");
        assert_eq!(json["name"], "Taller El Roble");
    }
}
