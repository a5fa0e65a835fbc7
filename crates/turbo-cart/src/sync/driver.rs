//! Async driver that runs the coordinator against a cart store.

use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info};

use crate::cart::{Cart, CartOverlay, CartTotals};
use crate::error::CartError;
use crate::ids::{CartId, ProductId};
use crate::quantity::{QuantityControl, QuantityEvent};
use crate::store::{CartStore, StoreError};
use crate::sync::{CommitOutcome, SyncCoordinator, SyncNotice};

/// What one [`CartSync::flush`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSummary {
    /// Replace calls sent.
    pub dispatched: usize,
    /// Notices that reported a failure.
    pub failures: usize,
}

/// A cart session: overlay, sync queue and store in one place.
///
/// Interaction methods are synchronous and only touch local state.
/// [`flush`](Self::flush) does the network work. The coordinator lock is
/// never held across an await, so the overlay stays readable while a
/// request is outstanding.
pub struct CartSync<S> {
    store: S,
    coordinator: Mutex<SyncCoordinator>,
    notices: UnboundedSender<SyncNotice>,
}

impl<S: CartStore> CartSync<S> {
    /// Wrap an already fetched cart.
    pub fn new(store: S, cart: Cart) -> Result<(Self, UnboundedReceiver<SyncNotice>), CartError> {
        let coordinator = SyncCoordinator::new(cart)?;
        let (tx, rx) = mpsc::unbounded();
        Ok((
            Self {
                store,
                coordinator: Mutex::new(coordinator),
                notices: tx,
            },
            rx,
        ))
    }

    /// Fetch the cart and start a session on it.
    pub async fn load(
        store: S,
        cart_id: &CartId,
    ) -> Result<(Self, UnboundedReceiver<SyncNotice>), StoreError> {
        let cart = store.fetch_cart(cart_id).await?;
        info!(%cart_id, items = cart.len(), "cart loaded");
        Self::new(store, cart).map_err(|e| StoreError::Malformed(e.to_string()))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cart_id(&self) -> CartId {
        self.coordinator().cart_id().clone()
    }

    /// A copy of the overlay for rendering.
    pub fn overlay(&self) -> CartOverlay {
        self.coordinator().overlay().clone()
    }

    pub fn totals(&self) -> Result<CartTotals, CartError> {
        self.coordinator().totals()
    }

    pub fn control_for(&self, index: usize) -> Result<QuantityControl, CartError> {
        self.coordinator().control_for(index)
    }

    pub fn set_quantity(&self, index: usize, value: i64) -> Result<(), CartError> {
        self.coordinator().set_quantity(index, value)
    }

    pub fn commit_quantity_change(
        &self,
        index: usize,
        quantity: i64,
        should_commit: bool,
    ) -> Result<CommitOutcome, CartError> {
        self.coordinator()
            .commit_quantity_change(index, quantity, should_commit)
    }

    pub fn handle_event(
        &self,
        index: usize,
        event: QuantityEvent,
    ) -> Result<CommitOutcome, CartError> {
        self.coordinator().handle_event(index, event)
    }

    pub fn remove_item(&self, product_id: &ProductId) -> Result<CommitOutcome, CartError> {
        self.coordinator().remove_item(product_id)
    }

    pub fn is_idle(&self) -> bool {
        self.coordinator().is_idle()
    }

    /// Send queued changes until the queue is empty.
    ///
    /// Each change is one replace call followed by a re-fetch of the cart,
    /// whatever the replace outcome. If another flush already has a request
    /// outstanding this returns immediately and that flush drains the queue.
    pub async fn flush(&self) -> FlushSummary {
        let mut summary = FlushSummary::default();

        loop {
            let request = self.coordinator().next_request();
            summary.failures += self.forward_notices();
            let Some(request) = request else {
                break;
            };
            summary.dispatched += 1;

            let response = self
                .store
                .replace_cart_items(&request.cart_id, &request.lines)
                .await;
            if let Err(e) = self.coordinator().complete(request.ticket, response) {
                error!(ticket = request.ticket, error = %e, "completion rejected");
            }

            let refreshed = self.store.fetch_cart(&request.cart_id).await;
            self.coordinator().reconcile(refreshed);
            summary.failures += self.forward_notices();
        }

        if summary.dispatched > 0 {
            debug!(
                dispatched = summary.dispatched,
                failures = summary.failures,
                "flush finished"
            );
        }
        summary
    }

    /// Re-fetch the cart outside a flush, e.g. after another view changed it.
    ///
    /// Returns `false` when a replace was acknowledged while the fetch was
    /// outstanding; the fetched cart may be older than that response and is
    /// dropped.
    pub async fn refresh(&self) -> Result<bool, StoreError> {
        let (cart_id, observed) = {
            let coordinator = self.coordinator();
            (coordinator.cart_id().clone(), coordinator.generation())
        };
        let cart = self.store.fetch_cart(&cart_id).await?;
        let adopted = self
            .coordinator()
            .reload(cart, observed)
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        if !adopted {
            debug!(%cart_id, "refresh superseded by a newer acknowledgement");
        }
        Ok(adopted)
    }

    fn forward_notices(&self) -> usize {
        let notices = self.coordinator().drain_notices();
        let failures = notices.iter().filter(|n| n.is_failure()).count();
        for notice in notices {
            // A dropped receiver just means nobody is listening.
            let _ = self.notices.unbounded_send(notice);
        }
        failures
    }

    fn coordinator(&self) -> MutexGuard<'_, SyncCoordinator> {
        self.coordinator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
