//! Remote cart store port.
//!
//! The remote cart service owns the authoritative cart. The engine talks to
//! it through [`CartStore`], which only knows two calls: fetch the cart, and
//! replace its whole line list.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::cart::{Cart, CartItem, ReplaceLine};
use crate::ids::{CartId, CartItemId, ProductId};
use crate::money::Money;

/// Errors reported by a cart store.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StoreError {
    /// The service could not be reached.
    #[error("Cart service unavailable: {0}")]
    Unavailable(String),

    /// The service refused the request.
    #[error("Cart service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// No cart with this id.
    #[error("Cart not found: {0}")]
    NotFound(String),

    /// The payload could not be mapped onto the cart model.
    #[error("Malformed cart payload: {0}")]
    Malformed(String),
}

/// The remote cart service, as seen by the engine.
///
/// # Contract
///
/// - `replace_cart_items` is a full replace: any product missing from
///   `lines` is removed from the cart.
/// - Both calls return the cart as the service sees it afterwards.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Fetch the authoritative cart.
    async fn fetch_cart(&self, cart_id: &CartId) -> Result<Cart, StoreError>;

    /// Overwrite the cart's line list.
    async fn replace_cart_items(
        &self,
        cart_id: &CartId,
        lines: &[ReplaceLine],
    ) -> Result<Cart, StoreError>;
}

/// Catalog data the in-memory store needs to price a product.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub unit_price: Money,
    pub discounted_unit_price: Option<Money>,
    pub inventory_cap: Option<i64>,
}

impl From<&CartItem> for CatalogEntry {
    fn from(item: &CartItem) -> Self {
        Self {
            name: item.product_name.clone(),
            unit_price: item.unit_price,
            discounted_unit_price: item.discounted_unit_price,
            inventory_cap: item.inventory_cap,
        }
    }
}

#[derive(Debug)]
struct StoreState {
    cart: Cart,
    catalog: HashMap<ProductId, CatalogEntry>,
    replace_calls: Vec<Vec<ReplaceLine>>,
    fetch_calls: usize,
    replace_failures: VecDeque<StoreError>,
    fetch_failures: VecDeque<StoreError>,
    fetch_stalls: VecDeque<usize>,
    in_flight: usize,
    max_in_flight: usize,
}

/// A cart service held in memory.
///
/// Behaves like the remote service: full-replace semantics, inventory
/// enforcement, server-assigned item ids. It also records every replace
/// call and can be told to fail the next calls.
#[derive(Debug)]
pub struct InMemoryCartStore {
    state: Mutex<StoreState>,
}

impl InMemoryCartStore {
    /// Seed the store with a cart; its items also seed the catalog.
    pub fn new(cart: Cart) -> Self {
        let catalog = cart
            .items
            .iter()
            .map(|item| (item.product_id.clone(), CatalogEntry::from(item)))
            .collect();
        Self {
            state: Mutex::new(StoreState {
                cart,
                catalog,
                replace_calls: Vec::new(),
                fetch_calls: 0,
                replace_failures: VecDeque::new(),
                fetch_failures: VecDeque::new(),
                fetch_stalls: VecDeque::new(),
                in_flight: 0,
                max_in_flight: 0,
            }),
        }
    }

    /// Make another product purchasable.
    pub fn with_product(self, product_id: ProductId, entry: CatalogEntry) -> Self {
        self.state().catalog.insert(product_id, entry);
        self
    }

    /// Fail the next replace call with `error`.
    pub fn fail_next_replace(&self, error: StoreError) {
        self.state().replace_failures.push_back(error);
    }

    /// Fail the next fetch call with `error`.
    pub fn fail_next_fetch(&self, error: StoreError) {
        self.state().fetch_failures.push_back(error);
    }

    /// Make the next fetch read the cart right away but hand it back only
    /// after yielding `yields` times, like a slow response.
    pub fn stall_next_fetch(&self, yields: usize) {
        self.state().fetch_stalls.push_back(yields);
    }

    /// Overwrite the stored cart, as another device would.
    pub fn set_cart(&self, cart: Cart) {
        self.state().cart = cart;
    }

    /// The cart as currently stored.
    pub fn snapshot(&self) -> Cart {
        self.state().cart.clone()
    }

    /// Line lists of every replace call, in arrival order.
    pub fn replace_calls(&self) -> Vec<Vec<ReplaceLine>> {
        self.state().replace_calls.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.state().fetch_calls
    }

    /// Highest number of replace calls that were outstanding at once.
    pub fn max_concurrent_replaces(&self) -> usize {
        self.state().max_in_flight
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StoreState {
    fn apply(&mut self, lines: &[ReplaceLine]) -> Result<Cart, StoreError> {
        let mut used = HashSet::new();
        let mut items = Vec::with_capacity(lines.len());

        for line in lines {
            let entry = self.catalog.get(&line.product_id).ok_or_else(|| {
                StoreError::Rejected {
                    status: 400,
                    message: format!("unknown product {}", line.product_id),
                }
            })?;
            if line.quantity < 1 {
                return Err(StoreError::Rejected {
                    status: 400,
                    message: format!("invalid quantity {} for {}", line.quantity, line.product_id),
                });
            }
            if let Some(cap) = entry.inventory_cap {
                if line.quantity > cap {
                    return Err(StoreError::Rejected {
                        status: 400,
                        message: format!(
                            "insufficient inventory for {}: requested {}, available {}",
                            line.product_id, line.quantity, cap
                        ),
                    });
                }
            }

            let id = self
                .cart
                .items
                .iter()
                .find(|item| item.product_id == line.product_id && !used.contains(&item.id))
                .map(|item| item.id.clone())
                .unwrap_or_else(CartItemId::generate);
            used.insert(id.clone());

            items.push(CartItem {
                id,
                product_id: line.product_id.clone(),
                product_name: entry.name.clone(),
                quantity: line.quantity,
                unit_price: entry.unit_price,
                discounted_unit_price: entry.discounted_unit_price,
                inventory_cap: entry.inventory_cap,
            });
        }

        self.cart.items = items;
        Ok(self.cart.clone())
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn fetch_cart(&self, cart_id: &CartId) -> Result<Cart, StoreError> {
        let (result, stall) = {
            let mut state = self.state();
            state.fetch_calls += 1;
            let stall = state.fetch_stalls.pop_front().unwrap_or(0);
            let result = match state.fetch_failures.pop_front() {
                Some(error) => Err(error),
                None if &state.cart.id != cart_id => {
                    Err(StoreError::NotFound(cart_id.to_string()))
                }
                None => Ok(state.cart.clone()),
            };
            (result, stall)
        };

        for _ in 0..stall {
            tokio::task::yield_now().await;
        }
        result
    }

    async fn replace_cart_items(
        &self,
        cart_id: &CartId,
        lines: &[ReplaceLine],
    ) -> Result<Cart, StoreError> {
        {
            let mut state = self.state();
            state.replace_calls.push(lines.to_vec());
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
        }

        // Give concurrently polled callers a chance to overlap with us.
        tokio::task::yield_now().await;

        let mut state = self.state();
        state.in_flight -= 1;
        if let Some(error) = state.replace_failures.pop_front() {
            return Err(error);
        }
        if &state.cart.id != cart_id {
            return Err(StoreError::NotFound(cart_id.to_string()));
        }
        state.apply(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    fn seeded() -> InMemoryCartStore {
        let cart = Cart::new(CartId::new("1"), Currency::VND).with_items(vec![
            CartItem::new(
                CartItemId::new("10"),
                ProductId::new("p1"),
                "Diver",
                2,
                Money::new(100, Currency::VND),
            )
            .with_inventory_cap(3),
            CartItem::new(
                CartItemId::new("11"),
                ProductId::new("p2"),
                "Chrono",
                1,
                Money::new(50, Currency::VND),
            ),
        ]);
        InMemoryCartStore::new(cart)
    }

    #[tokio::test]
    async fn test_replace_is_full_replace() {
        let store = seeded();
        let cart_id = CartId::new("1");

        let cart = store
            .replace_cart_items(&cart_id, &[ReplaceLine::new(ProductId::new("p2"), 4)])
            .await
            .unwrap();

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items[0].id, CartItemId::new("11"));
        assert_eq!(cart.items[0].quantity, 4);
        assert_eq!(store.fetch_cart(&cart_id).await.unwrap(), cart);
        assert_eq!(store.replace_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_replace_enforces_inventory() {
        let store = seeded();
        let result = store
            .replace_cart_items(
                &CartId::new("1"),
                &[ReplaceLine::new(ProductId::new("p1"), 4)],
            )
            .await;

        assert!(matches!(result, Err(StoreError::Rejected { status: 400, .. })));
        assert_eq!(store.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed_once() {
        let store = seeded();
        let cart_id = CartId::new("1");
        store.fail_next_fetch(StoreError::Unavailable("offline".into()));

        assert!(store.fetch_cart(&cart_id).await.is_err());
        assert!(store.fetch_cart(&cart_id).await.is_ok());
        assert_eq!(store.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_stalled_fetch_returns_cart_as_read() {
        let store = seeded();
        let cart_id = CartId::new("1");
        store.stall_next_fetch(5);

        let lines = [ReplaceLine::new(ProductId::new("p2"), 4)];
        let (stale, _) = futures::join!(
            store.fetch_cart(&cart_id),
            store.replace_cart_items(&cart_id, &lines)
        );
        assert_eq!(stale.unwrap().len(), 2);
        assert_eq!(store.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_cart() {
        let store = seeded();
        let result = store.fetch_cart(&CartId::new("2")).await;
        assert_eq!(result, Err(StoreError::NotFound("2".into())));
    }
}
