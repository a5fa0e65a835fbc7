//! Shopping cart module.
//!
//! Contains the authoritative cart model, the client overlay, and totals.

mod cart;
mod overlay;
pub mod totals;

pub use cart::{Cart, CartItem, ReplaceLine};
pub use overlay::{CartOverlay, OverlayItem};
pub use totals::{line_total, total_price, total_quantity, CartTotals, LineAmount};
