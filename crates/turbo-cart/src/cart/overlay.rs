//! Client-side overlay of the authoritative cart.
//!
//! The overlay is a disposable snapshot: it is rebuilt wholesale every time
//! the cart is fetched and mutated in place while the user edits quantities.
//! Each row carries a busy flag that is set exactly while a remote update
//! started from that row is outstanding.

use std::ops::Deref;

use crate::cart::totals::CartTotals;
use crate::cart::CartItem;
use crate::error::CartError;
use crate::ids::{CartItemId, ProductId};
use crate::money::Currency;
use serde::Serialize;

/// A cart item plus its busy flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayItem {
    #[serde(flatten)]
    pub item: CartItem,
    pub busy: bool,
}

impl OverlayItem {
    fn idle(item: CartItem) -> Self {
        Self { item, busy: false }
    }
}

impl Deref for OverlayItem {
    type Target = CartItem;

    fn deref(&self) -> &CartItem {
        &self.item
    }
}

/// Mutable projection of the cart's line items.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CartOverlay {
    items: Vec<OverlayItem>,
}

impl CartOverlay {
    /// An empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an overlay straight from cart items.
    pub fn from_items(items: &[CartItem]) -> Self {
        let mut overlay = Self::new();
        overlay.initialize(items);
        overlay
    }

    /// Replace every row with one idle row per item.
    pub fn initialize(&mut self, items: &[CartItem]) {
        self.items = items.iter().cloned().map(OverlayItem::idle).collect();
    }

    /// Overwrite the quantity shown at `index`.
    ///
    /// This is typing feedback: the row is not marked busy and nothing is
    /// sent anywhere.
    pub fn set_quantity(&mut self, index: usize, value: i64) -> Result<(), CartError> {
        let row = self.row_mut(index)?;
        row.item.check_quantity(value)?;
        row.item.quantity = value;
        Ok(())
    }

    /// Toggle the busy flag at `index`.
    pub fn set_busy(&mut self, index: usize, busy: bool) -> Result<(), CartError> {
        self.row_mut(index)?.busy = busy;
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&OverlayItem> {
        self.items.get(index)
    }

    /// Like [`get`](Self::get), but an unknown index is an error.
    pub fn row(&self, index: usize) -> Result<&OverlayItem, CartError> {
        let len = self.items.len();
        self.items
            .get(index)
            .ok_or(CartError::IndexOutOfRange { index, len })
    }

    pub fn iter(&self) -> impl Iterator<Item = &OverlayItem> {
        self.items.iter()
    }

    pub fn items(&self) -> &[OverlayItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Row index of a line item.
    pub fn position(&self, item_id: &CartItemId) -> Option<usize> {
        self.items.iter().position(|row| &row.id == item_id)
    }

    /// Whether any row references `product_id`.
    pub fn contains_product(&self, product_id: &ProductId) -> bool {
        self.items.iter().any(|row| &row.product_id == product_id)
    }

    /// Number of rows waiting on a remote update.
    pub fn busy_count(&self) -> usize {
        self.items.iter().filter(|row| row.busy).count()
    }

    /// Drop every row of `product_id`, returning how many went.
    pub(crate) fn remove_product(&mut self, product_id: &ProductId) -> usize {
        let before = self.items.len();
        self.items.retain(|row| &row.product_id != product_id);
        before - self.items.len()
    }

    /// Aggregate totals over the rows as currently shown.
    pub fn totals(&self, currency: Currency) -> Result<CartTotals, CartError> {
        CartTotals::of(&self.items, currency)
    }

    fn row_mut(&mut self, index: usize) -> Result<&mut OverlayItem, CartError> {
        let len = self.items.len();
        self.items
            .get_mut(index)
            .ok_or(CartError::IndexOutOfRange { index, len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    fn items() -> Vec<CartItem> {
        vec![
            CartItem::new(
                CartItemId::new("1"),
                ProductId::new("p1"),
                "Diver",
                2,
                Money::new(100, Currency::VND),
            )
            .with_inventory_cap(5),
            CartItem::new(
                CartItemId::new("2"),
                ProductId::new("p2"),
                "Chrono",
                3,
                Money::new(50, Currency::VND),
            ),
        ]
    }

    #[test]
    fn test_initialize_builds_idle_rows() {
        let overlay = CartOverlay::from_items(&items());
        assert_eq!(overlay.len(), 2);
        assert!(overlay.iter().all(|row| !row.busy));
        assert_eq!(overlay.busy_count(), 0);
    }

    #[test]
    fn test_initialize_is_idempotent_and_clears_busy() {
        let source = items();
        let mut overlay = CartOverlay::from_items(&source);
        overlay.set_busy(1, true).unwrap();
        overlay.set_quantity(0, 4).unwrap();

        overlay.initialize(&source);
        overlay.initialize(&source);

        assert_eq!(overlay, CartOverlay::from_items(&source));
    }

    #[test]
    fn test_set_quantity_does_not_mark_busy() {
        let mut overlay = CartOverlay::from_items(&items());
        overlay.set_quantity(0, 4).unwrap();
        assert_eq!(overlay.get(0).unwrap().quantity, 4);
        assert!(!overlay.get(0).unwrap().busy);
    }

    #[test]
    fn test_set_quantity_respects_bounds() {
        let mut overlay = CartOverlay::from_items(&items());
        assert_eq!(
            overlay.set_quantity(0, 6),
            Err(CartError::QuantityExceedsInventory {
                requested: 6,
                available: 5
            })
        );
        assert_eq!(overlay.set_quantity(1, 0), Err(CartError::InvalidQuantity(0)));
        assert_eq!(overlay.get(0).unwrap().quantity, 2);
        assert_eq!(overlay.get(1).unwrap().quantity, 3);
    }

    #[test]
    fn test_out_of_range_index_leaves_rows_untouched() {
        let mut overlay = CartOverlay::from_items(&items());
        let before = overlay.clone();

        assert_eq!(
            overlay.set_quantity(2, 1),
            Err(CartError::IndexOutOfRange { index: 2, len: 2 })
        );
        assert_eq!(
            overlay.set_busy(9, true),
            Err(CartError::IndexOutOfRange { index: 9, len: 2 })
        );
        assert_eq!(overlay, before);
    }

    #[test]
    fn test_remove_product_counts_down() {
        let mut overlay = CartOverlay::from_items(&items());
        assert_eq!(overlay.remove_product(&ProductId::new("p1")), 1);
        assert_eq!(overlay.len(), 1);
        assert!(!overlay.contains_product(&ProductId::new("p1")));
        assert_eq!(overlay.position(&CartItemId::new("2")), Some(0));
    }
}
