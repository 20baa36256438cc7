//! # Cart Model
//!
//! The mutable collection of line items plus the selected client.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  UI Action                Operation              State Change           │
//! │  ─────────                ─────────              ────────────           │
//! │                                                                         │
//! │  Pick product ──────────► add_line() ──────────► push or qty += n      │
//! │                                                                         │
//! │  Edit quantity ─────────► set_quantity() ──────► lines[i].qty = n      │
//! │                                                                         │
//! │  Click remove ──────────► remove_line() ───────► lines.remove(i)       │
//! │                                                                         │
//! │  Pick client ───────────► select_client() ─────► client = Some(c)      │
//! │                                                                         │
//! │  Sale done / abandon ───► clear() ─────────────► lines = [], no client │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Lines are unique by `product_id` (adding the same product increases quantity)
//! - Every quantity is in `1..=MAX_ITEM_QUANTITY`
//! - Every base price is ≥ 0
//! - Insertion order is kept (display only)
//!
//! The stock check here is soft: it compares against the stock figure the
//! product search showed. The authoritative check runs in
//! [`stock::classify`](crate::stock::classify) at finalization time.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Client, ProductId};
use crate::validation::{
    validate_cart_size, validate_name, validate_price, validate_quantity, validate_stock,
};
use crate::MAX_ITEM_QUANTITY;

// =============================================================================
// Catalog Product
// =============================================================================

/// A product as the search screen shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    pub product_id: ProductId,
    pub name: String,
    /// Stock on hand when the product was looked up.
    pub available_stock: i64,
}

// =============================================================================
// Line Item
// =============================================================================

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_base_price: Money,
    pub quantity: i64,
    /// Stock known at add time. Soft, may be stale.
    pub available_stock: i64,
}

impl LineItem {
    /// Creates a validated line. Does not compare quantity with stock.
    pub fn new(
        product_id: ProductId,
        name: impl Into<String>,
        unit_base_price: Money,
        quantity: i64,
        available_stock: i64,
    ) -> CoreResult<Self> {
        let name = name.into();
        validate_name("product name", &name)?;
        validate_price(unit_base_price)?;
        validate_stock(available_stock)?;
        validate_quantity(product_id, quantity)?;

        Ok(LineItem {
            product_id,
            name,
            unit_base_price,
            quantity,
            available_stock,
        })
    }

    /// Base price × quantity.
    pub fn base_line_total(&self) -> Money {
        self.unit_base_price.multiply_quantity(self.quantity)
    }

    fn check_soft_stock(&self, requested: i64) -> CoreResult<()> {
        if requested > self.available_stock {
            return Err(CoreError::InsufficientStock {
                product_id: self.product_id,
                available: self.available_stock,
                requested,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart of one counter session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    lines: Vec<LineItem>,
    client: Option<Client>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart::default()
    }

    /// Rebuilds a cart from stored lines, e.g. the lines of a proforma.
    ///
    /// Lines sharing a product are merged. No soft stock check is applied:
    /// the stored stock figures are stale by definition, and reconciliation
    /// will look up live stock anyway.
    pub fn from_parts(client: Option<Client>, lines: Vec<LineItem>) -> CoreResult<Self> {
        let mut cart = Cart {
            lines: Vec::with_capacity(lines.len()),
            client,
        };

        for line in lines {
            if let Some(existing) = cart.find_mut(line.product_id) {
                let merged = existing.quantity + line.quantity;
                validate_quantity(line.product_id, merged)?;
                existing.quantity = merged;
            } else {
                validate_cart_size(cart.lines.len())?;
                cart.lines.push(line);
            }
        }

        Ok(cart)
    }

    /// Adds a product or increases its quantity if already present.
    ///
    /// ## Errors
    /// - `InvalidQuantity` if `qty < 1` or the merged quantity exceeds the maximum
    /// - `InsufficientStock` if the merged quantity exceeds `available_stock`
    /// - `CartTooLarge` if a new line would exceed the line limit
    /// - `Validation` for a negative price or empty name
    pub fn add_line(
        &mut self,
        product: &CatalogProduct,
        qty: i64,
        base_price: Money,
    ) -> CoreResult<()> {
        validate_quantity(product.product_id, qty)?;

        if let Some(line) = self.find_mut(product.product_id) {
            let new_qty = line.quantity + qty;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::InvalidQuantity {
                    product_id: product.product_id,
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }

            validate_stock(product.available_stock)?;
            // The latest lookup wins over what was known at first add.
            line.available_stock = product.available_stock;
            line.check_soft_stock(new_qty)?;
            line.quantity = new_qty;
            return Ok(());
        }

        validate_cart_size(self.lines.len())?;

        let line = LineItem::new(
            product.product_id,
            product.name.clone(),
            base_price,
            qty,
            product.available_stock,
        )?;
        line.check_soft_stock(qty)?;

        self.lines.push(line);
        Ok(())
    }

    /// Removes a line. Removing the last line leaves a valid, empty cart.
    pub fn remove_line(&mut self, product_id: ProductId) -> CoreResult<LineItem> {
        let index = self
            .lines
            .iter()
            .position(|l| l.product_id == product_id)
            .ok_or(CoreError::LineNotFound(product_id))?;

        Ok(self.lines.remove(index))
    }

    /// Removes every listed product that is present; returns what was removed.
    pub fn remove_lines(&mut self, product_ids: &[ProductId]) -> Vec<LineItem> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.lines)
            .into_iter()
            .partition(|l| product_ids.contains(&l.product_id));
        self.lines = kept;
        removed
    }

    /// Sets the quantity of an existing line, with the same bounds as `add_line`.
    pub fn set_quantity(&mut self, product_id: ProductId, qty: i64) -> CoreResult<()> {
        validate_quantity(product_id, qty)?;

        let line = self
            .find_mut(product_id)
            .ok_or(CoreError::LineNotFound(product_id))?;
        line.check_soft_stock(qty)?;
        line.quantity = qty;
        Ok(())
    }

    /// Empties the cart and detaches the client. Always safe.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.client = None;
    }

    pub fn select_client(&mut self, client: Client) {
        self.client = Some(client);
    }

    pub fn detach_client(&mut self) -> Option<Client> {
        self.client.take()
    }

    pub fn client(&self) -> Option<&Client> {
        self.client.as_ref()
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn line(&self, product_id: ProductId) -> Option<&LineItem> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct products.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Sum of all quantities.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn product_ids(&self) -> Vec<ProductId> {
        self.lines.iter().map(|l| l.product_id).collect()
    }

    fn find_mut(&mut self, product_id: ProductId) -> Option<&mut LineItem> {
        self.lines.iter_mut().find(|l| l.product_id == product_id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i64, stock: i64) -> CatalogProduct {
        CatalogProduct {
            product_id: ProductId(id),
            name: format!("Repuesto {}", id),
            available_stock: stock,
        }
    }

    fn client() -> Client {
        Client {
            id: 1,
            name: "Cliente Contado".to_string(),
            identification: None,
            email: None,
            phone: None,
        }
    }

    #[test]
    fn test_add_line() {
        let mut cart = Cart::new();
        cart.add_line(&product(1, 10), 2, Money::from_major(1000)).unwrap();

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.total_quantity(), 2);
        assert_eq!(cart.lines()[0].base_line_total(), Money::from_major(2000));
    }

    #[test]
    fn test_add_same_product_increases_quantity() {
        let mut cart = Cart::new();
        let p = product(1, 10);

        cart.add_line(&p, 2, Money::from_major(1000)).unwrap();
        cart.add_line(&p, 3, Money::from_major(1000)).unwrap();

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut cart = Cart::new();
        cart.add_line(&product(3, 5), 1, Money::from_major(10)).unwrap();
        cart.add_line(&product(1, 5), 1, Money::from_major(10)).unwrap();
        cart.add_line(&product(2, 5), 1, Money::from_major(10)).unwrap();
        cart.add_line(&product(3, 5), 1, Money::from_major(10)).unwrap();

        assert_eq!(cart.product_ids(), vec![ProductId(3), ProductId(1), ProductId(2)]);
    }

    #[test]
    fn test_add_rejects_bad_quantity() {
        let mut cart = Cart::new();
        let err = cart.add_line(&product(1, 10), 0, Money::from_major(1)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidQuantity { requested: 0, .. }));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_soft_stock_check() {
        let mut cart = Cart::new();
        let err = cart.add_line(&product(2, 4), 10, Money::from_major(500)).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientStock {
                product_id: ProductId(2),
                available: 4,
                requested: 10
            }
        );

        cart.add_line(&product(2, 4), 3, Money::from_major(500)).unwrap();
        let err = cart.add_line(&product(2, 4), 2, Money::from_major(500)).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { requested: 5, .. }));
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_add_rejects_negative_price() {
        let mut cart = Cart::new();
        let err = cart.add_line(&product(1, 10), 1, Money::from_cents(-1)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_set_quantity_bounds() {
        let mut cart = Cart::new();
        cart.add_line(&product(1, 6), 1, Money::from_major(100)).unwrap();

        cart.set_quantity(ProductId(1), 6).unwrap();
        assert_eq!(cart.total_quantity(), 6);

        assert!(matches!(
            cart.set_quantity(ProductId(1), 7),
            Err(CoreError::InsufficientStock { .. })
        ));
        assert!(matches!(
            cart.set_quantity(ProductId(1), 0),
            Err(CoreError::InvalidQuantity { .. })
        ));
        assert_eq!(
            cart.set_quantity(ProductId(9), 1),
            Err(CoreError::LineNotFound(ProductId(9)))
        );
        assert_eq!(cart.total_quantity(), 6);
    }

    #[test]
    fn test_remove_last_line_leaves_valid_cart() {
        let mut cart = Cart::new();
        cart.select_client(client());
        cart.add_line(&product(1, 6), 1, Money::from_major(100)).unwrap();

        let removed = cart.remove_line(ProductId(1)).unwrap();
        assert_eq!(removed.product_id, ProductId(1));
        assert!(cart.is_empty());
        assert!(cart.client().is_some());
        assert!(cart.remove_line(ProductId(1)).is_err());
    }

    #[test]
    fn test_remove_lines() {
        let mut cart = Cart::new();
        for id in 1..=4 {
            cart.add_line(&product(id, 5), 1, Money::from_major(10)).unwrap();
        }

        let removed = cart.remove_lines(&[ProductId(2), ProductId(4), ProductId(8)]);
        assert_eq!(removed.len(), 2);
        assert_eq!(cart.product_ids(), vec![ProductId(1), ProductId(3)]);
    }

    #[test]
    fn test_clear_detaches_client() {
        let mut cart = Cart::new();
        cart.select_client(client());
        cart.add_line(&product(1, 6), 2, Money::from_major(100)).unwrap();

        cart.clear();
        assert!(cart.is_empty());
        assert!(cart.client().is_none());

        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_from_parts_merges_duplicates_without_stock_check() {
        let lines = vec![
            LineItem::new(ProductId(1), "Bujía", Money::from_major(300), 4, 0).unwrap(),
            LineItem::new(ProductId(1), "Bujía", Money::from_major(300), 2, 0).unwrap(),
            LineItem::new(ProductId(2), "Filtro", Money::from_major(900), 1, 0).unwrap(),
        ];

        let cart = Cart::from_parts(Some(client()), lines).unwrap();
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.line(ProductId(1)).unwrap().quantity, 6);
        assert_eq!(cart.client().unwrap().id, 1);
    }
}
