//! Cart engine error types.

use serde::Serialize;
use thiserror::Error;

/// Errors raised by the overlay and the sync coordinator.
///
/// None of these are reachable through quantity clamping, which always
/// resolves to an in-range value. They report programming errors (bad
/// index, unknown ticket), malformed carts, and interactions the
/// presentation layer should have blocked.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CartError {
    /// Row index outside the overlay.
    #[error("Cart row {index} out of range (cart has {len} rows)")]
    IndexOutOfRange { index: usize, len: usize },

    /// A remote update for this row is still outstanding.
    #[error("Cart row {index} is busy with a pending update")]
    ItemBusy { index: usize },

    /// No row references this product.
    #[error("Product not in cart: {0}")]
    ProductNotInCart(String),

    /// No row has this line item id.
    #[error("Item not in cart: {0}")]
    ItemNotInCart(String),

    /// Quantity below 1.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Quantity above the product's inventory.
    #[error("Quantity {requested} exceeds inventory ({available})")]
    QuantityExceedsInventory { requested: i64, available: i64 },

    /// Cart payload violates the data model.
    #[error("Malformed cart: {0}")]
    MalformedCart(String),

    /// A completion arrived for a request that is not in flight.
    #[error("No request in flight for ticket {0}")]
    UnknownTicket(u64),

    /// Currency mismatch.
    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    /// Arithmetic overflow.
    #[error("Arithmetic overflow in cart total")]
    Overflow,
}
