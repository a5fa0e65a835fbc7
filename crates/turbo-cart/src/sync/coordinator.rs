//! Single-flight reconciliation state machine.
//!
//! The coordinator never performs I/O. Callers commit changes, ask for the
//! next [`ReplaceRequest`], run it against a [`CartStore`](crate::store::CartStore),
//! and feed the response back through [`SyncCoordinator::complete`] and the
//! follow-up fetch through [`SyncCoordinator::reconcile`].
//!
//! At most one replace request is in flight per cart. Commits made while a
//! request is outstanding are queued, and each queued change is turned into
//! a full line list against the latest acknowledged cart only when it is
//! dispatched, so a later request never resends a stale snapshot.

use std::collections::VecDeque;

use serde::Serialize;
use tracing::{debug, warn};

use crate::cart::{Cart, CartOverlay, CartTotals, ReplaceLine};
use crate::error::CartError;
use crate::ids::{CartId, CartItemId, ProductId};
use crate::quantity::{clamp_quantity, QuantityControl, QuantityEvent};
use crate::store::StoreError;

/// Identifies one queued change from commit to completion.
pub type Ticket = u64;

/// A local change waiting to reach the remote cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingChange {
    SetQuantity {
        item_id: CartItemId,
        product_id: ProductId,
        quantity: i64,
    },
    RemoveProduct {
        product_id: ProductId,
    },
}

impl PendingChange {
    pub fn product_id(&self) -> &ProductId {
        match self {
            PendingChange::SetQuantity { product_id, .. }
            | PendingChange::RemoveProduct { product_id } => product_id,
        }
    }
}

/// A full-replace call ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceRequest {
    pub ticket: Ticket,
    pub cart_id: CartId,
    pub lines: Vec<ReplaceLine>,
    pub change: PendingChange,
}

/// Result of a commit-triggering interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Only the overlay changed; nothing will be sent.
    Local,
    /// A remote update was queued.
    Queued(Ticket),
}

/// What happened to a queued change, for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncNotice {
    /// The service accepted the update.
    Applied { ticket: Ticket, change: PendingChange },
    /// The service refused the update or could not be reached. The row
    /// falls back to the server's value on the next reconcile.
    Rejected {
        ticket: Ticket,
        change: PendingChange,
        error: StoreError,
    },
    /// The change no longer applied to the acknowledged cart and was never sent.
    Dropped {
        ticket: Ticket,
        change: PendingChange,
        error: CartError,
    },
    /// Re-fetching the authoritative cart failed; the last acknowledged cart stays.
    RefreshFailed { error: StoreError },
}

impl SyncNotice {
    pub fn is_failure(&self) -> bool {
        !matches!(self, SyncNotice::Applied { .. })
    }
}

/// Per-row state induced by the busy flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemState {
    Idle,
    Pending,
}

#[derive(Debug, Clone)]
struct Queued {
    ticket: Ticket,
    change: PendingChange,
}

#[derive(Debug, Clone)]
enum Phase {
    Idle,
    InFlight(Queued),
    AwaitingRefresh,
}

/// Keeps the overlay and the remote cart converging.
#[derive(Debug)]
pub struct SyncCoordinator {
    acknowledged: Cart,
    overlay: CartOverlay,
    queue: VecDeque<Queued>,
    phase: Phase,
    next_ticket: Ticket,
    /// Bumped every time a cart is adopted.
    generation: u64,
    notices: Vec<SyncNotice>,
}

impl SyncCoordinator {
    /// Start from a freshly fetched cart.
    pub fn new(cart: Cart) -> Result<Self, CartError> {
        cart.validate()?;
        let overlay = CartOverlay::from_items(&cart.items);
        Ok(Self {
            acknowledged: cart,
            overlay,
            queue: VecDeque::new(),
            phase: Phase::Idle,
            next_ticket: 1,
            generation: 0,
            notices: Vec::new(),
        })
    }

    pub fn cart_id(&self) -> &CartId {
        &self.acknowledged.id
    }

    /// The cart as the service last reported it.
    pub fn acknowledged(&self) -> &Cart {
        &self.acknowledged
    }

    /// Counts adopted carts. Capture it before an out-of-band fetch and hand
    /// it back to [`reload`](Self::reload).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn overlay(&self) -> &CartOverlay {
        &self.overlay
    }

    /// Totals over the overlay as currently shown.
    pub fn totals(&self) -> Result<CartTotals, CartError> {
        self.overlay.totals(self.acknowledged.currency)
    }

    pub fn item_state(&self, index: usize) -> Result<ItemState, CartError> {
        Ok(if self.overlay.row(index)?.busy {
            ItemState::Pending
        } else {
            ItemState::Idle
        })
    }

    /// A quantity control bound to one row: its value, cap and busy flag.
    pub fn control_for(&self, index: usize) -> Result<QuantityControl, CartError> {
        let row = self.overlay.row(index)?;
        Ok(QuantityControl::controlled(row.quantity)
            .with_max(row.inventory_cap)
            .with_disabled(row.busy))
    }

    /// Show a typed value without committing it.
    pub fn set_quantity(&mut self, index: usize, value: i64) -> Result<(), CartError> {
        self.commit_quantity_change(index, value, false).map(|_| ())
    }

    /// Change a row's quantity, queueing a remote update when `should_commit`.
    ///
    /// Busy rows are rejected; the presentation layer is expected to have
    /// disabled their controls.
    pub fn commit_quantity_change(
        &mut self,
        index: usize,
        quantity: i64,
        should_commit: bool,
    ) -> Result<CommitOutcome, CartError> {
        let row = self.overlay.row(index)?;
        if row.busy {
            return Err(CartError::ItemBusy { index });
        }
        let item_id = row.id.clone();
        let product_id = row.product_id.clone();

        self.overlay.set_quantity(index, quantity)?;
        if !should_commit {
            return Ok(CommitOutcome::Local);
        }
        self.overlay.set_busy(index, true)?;

        let ticket = self.enqueue(PendingChange::SetQuantity {
            item_id,
            product_id,
            quantity,
        });
        debug!(ticket, index, quantity, "queued quantity change");
        Ok(CommitOutcome::Queued(ticket))
    }

    /// Commit only when `quantity` differs from the acknowledged value.
    pub fn commit_if_changed(
        &mut self,
        index: usize,
        quantity: i64,
    ) -> Result<CommitOutcome, CartError> {
        let changed = self.differs_from_acknowledged(index, quantity)?;
        self.commit_quantity_change(index, quantity, changed)
    }

    /// Route a quantity control event for row `index`.
    pub fn handle_event(
        &mut self,
        index: usize,
        event: QuantityEvent,
    ) -> Result<CommitOutcome, CartError> {
        match event {
            QuantityEvent::Typed(value) => self.commit_quantity_change(index, value, false),
            QuantityEvent::Increased(value) | QuantityEvent::Decreased(value) => {
                self.commit_if_changed(index, value)
            }
            // The unclamped value decides; an untouched row whose server
            // quantity exceeds its cap is left alone.
            QuantityEvent::FocusOut(raw) => {
                let changed = self.differs_from_acknowledged(index, raw)?;
                let cap = self.overlay.row(index)?.inventory_cap;
                self.commit_quantity_change(index, clamp_quantity(raw, cap), changed)
            }
        }
    }

    /// Remove every row of `product_id` and queue the removal.
    pub fn remove_item(&mut self, product_id: &ProductId) -> Result<CommitOutcome, CartError> {
        if !self.overlay.contains_product(product_id) {
            return Err(CartError::ProductNotInCart(product_id.to_string()));
        }
        let removed = self.overlay.remove_product(product_id);
        let ticket = self.enqueue(PendingChange::RemoveProduct {
            product_id: product_id.clone(),
        });
        debug!(ticket, %product_id, removed, "queued removal");
        Ok(CommitOutcome::Queued(ticket))
    }

    /// The next request to send, if none is outstanding.
    pub fn next_request(&mut self) -> Option<ReplaceRequest> {
        if !matches!(self.phase, Phase::Idle) {
            return None;
        }
        while let Some(queued) = self.queue.pop_front() {
            match self.build_lines(&queued.change) {
                Ok(lines) => {
                    debug!(ticket = queued.ticket, lines = lines.len(), "dispatching replace");
                    self.phase = Phase::InFlight(queued.clone());
                    return Some(ReplaceRequest {
                        ticket: queued.ticket,
                        cart_id: self.acknowledged.id.clone(),
                        lines,
                        change: queued.change,
                    });
                }
                Err(error) => {
                    warn!(ticket = queued.ticket, %error, "dropping change");
                    self.settle(&queued.change);
                    self.notices.push(SyncNotice::Dropped {
                        ticket: queued.ticket,
                        change: queued.change,
                        error,
                    });
                }
            }
        }
        None
    }

    /// Record the response to the in-flight request.
    ///
    /// Clears the row's busy flag whatever the outcome. The caller must
    /// follow up with [`reconcile`](Self::reconcile).
    pub fn complete(
        &mut self,
        ticket: Ticket,
        result: Result<Cart, StoreError>,
    ) -> Result<(), CartError> {
        let queued = match std::mem::replace(&mut self.phase, Phase::AwaitingRefresh) {
            Phase::InFlight(queued) if queued.ticket == ticket => queued,
            other => {
                self.phase = other;
                return Err(CartError::UnknownTicket(ticket));
            }
        };

        let outcome = result.and_then(|cart| {
            self.adopt(cart)
                .map_err(|e| StoreError::Malformed(e.to_string()))
        });
        self.settle(&queued.change);

        let notice = match outcome {
            Ok(()) => SyncNotice::Applied {
                ticket,
                change: queued.change,
            },
            Err(error) => {
                warn!(ticket, %error, "replace failed");
                SyncNotice::Rejected {
                    ticket,
                    change: queued.change,
                    error,
                }
            }
        };
        self.notices.push(notice);
        Ok(())
    }

    /// Adopt the re-fetched cart and rebuild the overlay.
    ///
    /// On failure the last acknowledged cart is kept, so rows still fall
    /// back to server truth.
    pub fn reconcile(&mut self, refreshed: Result<Cart, StoreError>) {
        let outcome = refreshed.and_then(|cart| {
            self.adopt(cart)
                .map_err(|e| StoreError::Malformed(e.to_string()))
        });
        if let Err(error) = outcome {
            warn!(cart_id = %self.acknowledged.id, %error, "refresh failed");
            self.notices.push(SyncNotice::RefreshFailed { error });
        }
        if matches!(self.phase, Phase::AwaitingRefresh) {
            self.phase = Phase::Idle;
        }
        self.rebuild();
    }

    /// Replace the acknowledged cart from outside the sync cycle, e.g. when
    /// another view invalidated it.
    ///
    /// `observed` is the [`generation`](Self::generation) read before the
    /// fetch started. If any cart was adopted since, `cart` may predate it and
    /// is discarded; returns whether it was adopted.
    pub fn reload(&mut self, cart: Cart, observed: u64) -> Result<bool, CartError> {
        if observed != self.generation {
            debug!(
                cart_id = %self.acknowledged.id,
                observed,
                current = self.generation,
                "discarding superseded cart"
            );
            return Ok(false);
        }
        self.adopt(cart)?;
        self.rebuild();
        Ok(true)
    }

    /// Take the notices produced since the last call.
    pub fn drain_notices(&mut self) -> Vec<SyncNotice> {
        std::mem::take(&mut self.notices)
    }

    /// No request in flight and nothing queued.
    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle) && self.queue.is_empty()
    }

    /// Queued changes, not counting the one in flight.
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    fn differs_from_acknowledged(&self, index: usize, quantity: i64) -> Result<bool, CartError> {
        let row = self.overlay.row(index)?;
        let acknowledged = self.acknowledged.get_item(&row.id).map(|item| item.quantity);
        Ok(acknowledged != Some(quantity))
    }

    fn enqueue(&mut self, change: PendingChange) -> Ticket {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.queue.push_back(Queued { ticket, change });
        ticket
    }

    fn build_lines(&self, change: &PendingChange) -> Result<Vec<ReplaceLine>, CartError> {
        match change {
            PendingChange::SetQuantity {
                item_id, quantity, ..
            } => {
                let item = self
                    .acknowledged
                    .get_item(item_id)
                    .ok_or_else(|| CartError::ItemNotInCart(item_id.to_string()))?;
                item.check_quantity(*quantity)?;
                self.acknowledged.lines_with_quantity(item_id, *quantity)
            }
            PendingChange::RemoveProduct { product_id } => {
                Ok(self.acknowledged.lines_without_product(product_id))
            }
        }
    }

    fn adopt(&mut self, cart: Cart) -> Result<(), CartError> {
        if cart.id != self.acknowledged.id {
            return Err(CartError::MalformedCart(format!(
                "expected cart {}, got {}",
                self.acknowledged.id, cart.id
            )));
        }
        cart.validate()?;
        self.acknowledged = cart;
        self.generation += 1;
        Ok(())
    }

    fn settle(&mut self, change: &PendingChange) {
        if let PendingChange::SetQuantity { item_id, .. } = change {
            if let Some(index) = self.overlay.position(item_id) {
                // Index comes from position(), so this cannot be out of range.
                let _ = self.overlay.set_busy(index, false);
            }
        }
    }

    fn rebuild(&mut self) {
        self.overlay.initialize(&self.acknowledged.items);

        let in_flight = match &self.phase {
            Phase::InFlight(queued) => Some(queued.change.clone()),
            _ => None,
        };
        let pending: Vec<PendingChange> = in_flight
            .into_iter()
            .chain(self.queue.iter().map(|q| q.change.clone()))
            .collect();

        for change in &pending {
            match change {
                PendingChange::SetQuantity {
                    item_id, quantity, ..
                } => {
                    let Some(index) = self.overlay.position(item_id) else {
                        continue;
                    };
                    if let Err(error) = self.overlay.set_quantity(index, *quantity) {
                        debug!(%item_id, %error, "pending quantity no longer fits");
                    }
                    let _ = self.overlay.set_busy(index, true);
                }
                PendingChange::RemoveProduct { product_id } => {
                    self.overlay.remove_product(product_id);
                }
            }
        }
    }
}
