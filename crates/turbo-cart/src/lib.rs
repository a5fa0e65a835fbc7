//! Client-side cart reconciliation for TurboCommerce storefronts.
//!
//! The remote cart service owns the cart. This crate keeps a local,
//! optimistically edited copy of it and makes the two converge:
//!
//! - **Cart**: the authoritative cart, the editable overlay, derived totals
//! - **Quantity**: the clamped `- [ n ] +` input model
//! - **Sync**: single-flight full-replace updates with server reconciliation
//! - **Store**: the remote service port and an in-memory implementation
//! - **Session**: the signed-in user's token, address and cart id
//!
//! # Example
//!
//! ```rust,ignore
//! use turbo_cart::prelude::*;
//!
//! let (sync, mut notices) = CartSync::load(store, &CartId::new("42")).await?;
//!
//! // The user presses `+` on the first row.
//! let mut control = sync.control_for(0)?;
//! if let Some(event) = control.increase() {
//!     sync.handle_event(0, event)?;
//! }
//!
//! sync.flush().await;
//! while let Ok(Some(notice)) = notices.try_next() {
//!     println!("{notice:?}");
//! }
//! println!("Total: {}", sync.totals()?.price.display());
//! ```

pub mod cart;
pub mod error;
pub mod ids;
pub mod money;
pub mod quantity;
pub mod session;
pub mod store;
pub mod sync;

pub use error::CartError;
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::CartError;
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Cart
    pub use crate::cart::{Cart, CartItem, CartOverlay, CartTotals, OverlayItem, ReplaceLine};

    // Quantity
    pub use crate::quantity::{clamp_quantity, parse_quantity, QuantityControl, QuantityEvent};

    // Sync
    pub use crate::store::{CartStore, InMemoryCartStore, StoreError};
    pub use crate::sync::{
        CartSync, CommitOutcome, FlushSummary, ItemState, PendingChange, SyncCoordinator,
        SyncNotice,
    };

    // Session
    pub use crate::session::{AddressCodes, SessionContext, SessionError, SessionUser};
}
