//! Aggregate totals derived from cart rows.
//!
//! Totals are recomputed on every query and never stored on the cart.

use crate::cart::{CartItem, OverlayItem};
use crate::error::CartError;
use crate::money::{Currency, Money};
use serde::Serialize;

/// Anything that contributes `quantity × unit price` to a cart total.
pub trait LineAmount {
    fn quantity(&self) -> i64;

    /// Price charged per unit (discounted price when there is one).
    fn unit_amount(&self) -> Money;
}

impl LineAmount for CartItem {
    fn quantity(&self) -> i64 {
        self.quantity
    }

    fn unit_amount(&self) -> Money {
        self.effective_unit_price()
    }
}

impl LineAmount for OverlayItem {
    fn quantity(&self) -> i64 {
        self.item.quantity
    }

    fn unit_amount(&self) -> Money {
        self.item.effective_unit_price()
    }
}

/// Sum of quantities; 0 for no rows.
pub fn total_quantity<'a, T>(items: impl IntoIterator<Item = &'a T>) -> i64
where
    T: LineAmount + 'a,
{
    items.into_iter().map(LineAmount::quantity).sum()
}

/// Line total for one row.
pub fn line_total<T: LineAmount>(item: &T) -> Result<Money, CartError> {
    item.unit_amount()
        .try_multiply(item.quantity())
        .ok_or(CartError::Overflow)
}

/// Sum of `effective unit price × quantity`; zero for no rows.
pub fn total_price<'a, T>(
    items: impl IntoIterator<Item = &'a T>,
    currency: Currency,
) -> Result<Money, CartError>
where
    T: LineAmount + 'a,
{
    let mut total = Money::zero(currency);
    for item in items {
        let line = line_total(item)?;
        if line.currency != currency {
            return Err(CartError::CurrencyMismatch {
                expected: currency.code().to_string(),
                got: line.currency.code().to_string(),
            });
        }
        total = total.try_add(&line).ok_or(CartError::Overflow)?;
    }
    Ok(total)
}

/// Both aggregates at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    pub quantity: i64,
    pub price: Money,
}

impl CartTotals {
    pub fn of<'a, T>(
        items: impl IntoIterator<Item = &'a T> + Clone,
        currency: Currency,
    ) -> Result<Self, CartError>
    where
        T: LineAmount + 'a,
    {
        Ok(Self {
            quantity: total_quantity(items.clone()),
            price: total_price(items, currency)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.quantity == 0
    }
}
