//! # Validation Module
//!
//! Field-level checks shared by the cart, the payment allocator and the
//! boundary normalizers.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Web UI                                                       │
//! │  └── Immediate feedback (out of scope here)                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── quantities, prices, split amounts, names                          │
//! │  └── returns ValidationError / CoreError, never panics                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Finalization orchestrator                                    │
//! │  └── cart-level rules (empty cart, client, payment totals)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::ProductId;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a product or client display name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a line quantity.
///
/// ## Rules
/// - Must be at least 1
/// - Must not exceed MAX_ITEM_QUANTITY
///
/// ## Example
/// ```rust
/// use mostrador_core::types::ProductId;
/// use mostrador_core::validation::validate_quantity;
///
/// assert!(validate_quantity(ProductId(1), 5).is_ok());
/// assert!(validate_quantity(ProductId(1), 0).is_err());
/// ```
pub fn validate_quantity(product_id: ProductId, qty: i64) -> CoreResult<()> {
    if !(1..=MAX_ITEM_QUANTITY).contains(&qty) {
        return Err(CoreError::InvalidQuantity {
            product_id,
            requested: qty,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a base price. Zero is allowed (courtesy items).
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a known stock figure. Negative stock is a catalog error.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::OutOfRange {
            field: "available stock".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates one split line of a multi-method payment.
pub fn validate_split_amount(index: usize, amount: Money) -> CoreResult<()> {
    if !amount.is_positive() {
        return Err(CoreError::InvalidSplitAmount { index, amount });
    }

    Ok(())
}

/// Validates cart size before a new line is appended.
pub fn validate_cart_size(current_lines: usize) -> CoreResult<()> {
    if current_lines >= MAX_CART_ITEMS {
        return Err(CoreError::CartTooLarge {
            max: MAX_CART_ITEMS,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "Filtro de aceite").is_ok());
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", "   ").is_err());
        assert!(validate_name("name", &"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(ProductId(1), 1).is_ok());
        assert!(validate_quantity(ProductId(1), MAX_ITEM_QUANTITY).is_ok());

        assert!(matches!(
            validate_quantity(ProductId(1), 0),
            Err(CoreError::InvalidQuantity { requested: 0, .. })
        ));
        assert!(validate_quantity(ProductId(1), -3).is_err());
        assert!(validate_quantity(ProductId(1), MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(Money::zero()).is_ok());
        assert!(validate_price(Money::from_major(1000)).is_ok());
        assert!(validate_price(Money::from_cents(-1)).is_err());
    }

    #[test]
    fn test_validate_split_amount() {
        assert!(validate_split_amount(0, Money::from_cents(1)).is_ok());
        assert_eq!(
            validate_split_amount(2, Money::zero()),
            Err(CoreError::InvalidSplitAmount {
                index: 2,
                amount: Money::zero()
            })
        );
    }

    #[test]
    fn test_validate_cart_size() {
        assert!(validate_cart_size(0).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS).is_err());
    }
}
