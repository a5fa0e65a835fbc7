//! Authoritative cart and line item types.

use std::collections::HashSet;

use crate::error::CartError;
use crate::ids::{CartId, CartItemId, ProductId};
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// The cart as last reported by the remote cart service.
///
/// Items keep the order the service returned them in. Totals are never
/// stored here; see [`crate::cart::totals`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    /// Identifier used to address update calls.
    pub id: CartId,
    /// Currency every item is priced in.
    pub currency: Currency,
    /// Line items, in source order.
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Create an empty cart.
    pub fn new(id: CartId, currency: Currency) -> Self {
        Self {
            id,
            currency,
            items: Vec::new(),
        }
    }

    /// Builder-style item list.
    pub fn with_items(mut self, items: Vec<CartItem>) -> Self {
        self.items = items;
        self
    }

    /// Check the invariants the overlay relies on.
    ///
    /// Rejects duplicate item ids, quantities below 1, and items priced in a
    /// currency other than the cart's.
    pub fn validate(&self) -> Result<(), CartError> {
        let mut seen = HashSet::with_capacity(self.items.len());
        for item in &self.items {
            if !seen.insert(&item.id) {
                return Err(CartError::MalformedCart(format!(
                    "duplicate item id {}",
                    item.id
                )));
            }
            if item.quantity < 1 {
                return Err(CartError::MalformedCart(format!(
                    "item {} has quantity {}",
                    item.id, item.quantity
                )));
            }
            let mut prices =
                std::iter::once(&item.unit_price).chain(item.discounted_unit_price.as_ref());
            if let Some(price) = prices.find(|p| p.currency != self.currency) {
                return Err(CartError::MalformedCart(format!(
                    "item {} priced in {}, cart is {}",
                    item.id, price.currency, self.currency
                )));
            }
        }
        Ok(())
    }

    /// Number of line items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get an item by id.
    pub fn get_item(&self, item_id: &CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.id == item_id)
    }

    /// The full line list with one item's quantity replaced.
    pub fn lines_with_quantity(
        &self,
        item_id: &CartItemId,
        quantity: i64,
    ) -> Result<Vec<ReplaceLine>, CartError> {
        if self.get_item(item_id).is_none() {
            return Err(CartError::ItemNotInCart(item_id.to_string()));
        }
        Ok(self
            .items
            .iter()
            .map(|item| {
                let mut line = ReplaceLine::from(item);
                if &item.id == item_id {
                    line.quantity = quantity;
                }
                line
            })
            .collect())
    }

    /// The full line list with every item of `product_id` left out.
    pub fn lines_without_product(&self, product_id: &ProductId) -> Vec<ReplaceLine> {
        self.items
            .iter()
            .filter(|item| &item.product_id != product_id)
            .map(ReplaceLine::from)
            .collect()
    }
}

/// A line item in the cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    /// Line item id, unique within the cart.
    pub id: CartItemId,
    /// Product being purchased.
    pub product_id: ProductId,
    /// Product name (denormalized for display).
    pub product_name: String,
    /// Quantity, at least 1.
    pub quantity: i64,
    /// List price per unit.
    pub unit_price: Money,
    /// Sale price per unit; wins over `unit_price` when present.
    pub discounted_unit_price: Option<Money>,
    /// Maximum purchasable quantity. `None` means unbounded.
    pub inventory_cap: Option<i64>,
}

impl CartItem {
    /// Create an item with no discount and no inventory cap.
    pub fn new(
        id: CartItemId,
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: i64,
        unit_price: Money,
    ) -> Self {
        Self {
            id,
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
            discounted_unit_price: None,
            inventory_cap: None,
        }
    }

    pub fn with_discount(mut self, price: Money) -> Self {
        self.discounted_unit_price = Some(price);
        self
    }

    pub fn with_inventory_cap(mut self, cap: i64) -> Self {
        self.inventory_cap = Some(cap);
        self
    }

    /// Price actually charged per unit.
    pub fn effective_unit_price(&self) -> Money {
        self.discounted_unit_price.unwrap_or(self.unit_price)
    }

    /// Check a candidate quantity against the item's bounds.
    ///
    /// A cap below 1 still admits 1, matching [`clamp_quantity`](crate::quantity::clamp_quantity).
    pub fn check_quantity(&self, quantity: i64) -> Result<(), CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        match self.inventory_cap {
            Some(cap) if quantity > cap.max(1) => Err(CartError::QuantityExceedsInventory {
                requested: quantity,
                available: cap,
            }),
            _ => Ok(()),
        }
    }
}

/// One entry of a full-replace update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplaceLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl ReplaceLine {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

impl From<&CartItem> for ReplaceLine {
    fn from(item: &CartItem) -> Self {
        Self::new(item.product_id.clone(), item.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, product: &str, quantity: i64) -> CartItem {
        CartItem::new(
            CartItemId::new(id),
            ProductId::new(product),
            format!("Watch {product}"),
            quantity,
            Money::new(100, Currency::VND),
        )
    }

    fn cart() -> Cart {
        Cart::new(CartId::new("1"), Currency::VND).with_items(vec![
            item("10", "p1", 2),
            item("11", "p2", 3),
            item("12", "p1", 1),
        ])
    }

    #[test]
    fn test_effective_price_prefers_discount() {
        let plain = item("1", "p", 1);
        assert_eq!(plain.effective_unit_price().amount_cents, 100);

        let sale = plain.with_discount(Money::new(80, Currency::VND));
        assert_eq!(sale.effective_unit_price().amount_cents, 80);
    }

    #[test]
    fn test_lines_with_quantity_replaces_only_target() {
        let lines = cart()
            .lines_with_quantity(&CartItemId::new("11"), 7)
            .unwrap();
        let quantities: Vec<i64> = lines.iter().map(|l| l.quantity).collect();
        assert_eq!(quantities, vec![2, 7, 1]);
    }

    #[test]
    fn test_lines_with_quantity_unknown_item() {
        let result = cart().lines_with_quantity(&CartItemId::new("99"), 1);
        assert_eq!(result, Err(CartError::ItemNotInCart("99".to_string())));
    }

    #[test]
    fn test_lines_without_product_drops_every_match() {
        let lines = cart().lines_without_product(&ProductId::new("p1"));
        assert_eq!(lines, vec![ReplaceLine::new(ProductId::new("p2"), 3)]);
    }

    #[test]
    fn test_validate_rejects_duplicates_and_zero_quantity() {
        let mut dup = cart();
        dup.items.push(item("10", "p9", 1));
        assert!(matches!(dup.validate(), Err(CartError::MalformedCart(_))));

        let mut zero = cart();
        zero.items[0].quantity = 0;
        assert!(matches!(zero.validate(), Err(CartError::MalformedCart(_))));

        assert_eq!(cart().validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_foreign_currency() {
        let mut mixed = cart();
        mixed.items[1].unit_price = Money::new(5, Currency::USD);
        assert!(matches!(mixed.validate(), Err(CartError::MalformedCart(_))));
    }

    #[test]
    fn test_check_quantity_bounds() {
        let capped = item("1", "p", 1).with_inventory_cap(5);
        assert_eq!(capped.check_quantity(5), Ok(()));
        assert_eq!(capped.check_quantity(0), Err(CartError::InvalidQuantity(0)));
        assert_eq!(
            capped.check_quantity(6),
            Err(CartError::QuantityExceedsInventory {
                requested: 6,
                available: 5
            })
        );
        assert_eq!(item("2", "q", 1).check_quantity(10_000), Ok(()));
    }

    #[test]
    fn test_sold_out_item_still_admits_one() {
        let sold_out = item("1", "p", 1).with_inventory_cap(0);
        assert_eq!(sold_out.check_quantity(1), Ok(()));
        assert_eq!(
            sold_out.check_quantity(2),
            Err(CartError::QuantityExceedsInventory {
                requested: 2,
                available: 0
            })
        );
    }
}
