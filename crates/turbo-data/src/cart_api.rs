//! Remote cart store over the storefront REST API.
//!
//! Carts live at `/api/carts/{id}`. Reads populate the product relation of
//! every line; writes replace the whole `cart_item` list.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use turbo_cart::cart::{Cart, CartItem, ReplaceLine};
use turbo_cart::ids::{CartId, CartItemId, ProductId};
use turbo_cart::money::{Currency, Money};
use turbo_cart::store::{CartStore, StoreError};

use crate::{FetchClient, FetchError, Response};

const POPULATE_KEY: &str = "populate[cart_item][populate]";
const POPULATE_VALUE: &str = "bb_product";

/// Numeric on the wire, but tolerated as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum WireId {
    Number(u64),
    Text(String),
}

impl WireId {
    fn into_string(self) -> String {
        match self {
            WireId::Number(n) => n.to_string(),
            WireId::Text(s) => s,
        }
    }
}

impl From<&ProductId> for WireId {
    fn from(id: &ProductId) -> Self {
        match id.as_str().parse() {
            Ok(n) => WireId::Number(n),
            Err(_) => WireId::Text(id.to_string()),
        }
    }
}

/// Prices come as decimal strings, occasionally as numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum WirePrice {
    Number(f64),
    Text(String),
}

impl WirePrice {
    fn parse(&self, currency: Currency) -> Result<Option<Money>, String> {
        let value = match self {
            WirePrice::Number(n) => *n,
            WirePrice::Text(s) if s.trim().is_empty() => return Ok(None),
            WirePrice::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("unparseable price '{}'", s))?,
        };
        if !value.is_finite() || value < 0.0 {
            return Err(format!("invalid price {}", value));
        }
        Ok(Some(Money::from_decimal(value, currency)))
    }
}

/// Response body of both cart endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct CartPayload {
    data: CartData,
}

#[derive(Debug, Clone, Deserialize)]
struct CartData {
    id: WireId,
    #[serde(default)]
    attributes: CartAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CartAttributes {
    #[serde(default)]
    cart_item: Vec<WireCartItem>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireCartItem {
    id: WireId,
    quantity: i64,
    bb_product: ProductRelation,
}

#[derive(Debug, Clone, Deserialize)]
struct ProductRelation {
    data: Option<WireProduct>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireProduct {
    id: WireId,
    attributes: ProductAttributes,
}

#[derive(Debug, Clone, Deserialize)]
struct ProductAttributes {
    name: String,
    price: Option<WirePrice>,
    #[serde(rename = "discountPrice")]
    discount_price: Option<WirePrice>,
    inventory: Option<i64>,
}

impl CartPayload {
    /// Map the payload onto the cart model, pricing in `currency`.
    pub fn into_cart(self, currency: Currency) -> Result<Cart, StoreError> {
        let cart_id = CartId::new(self.data.id.into_string());
        let items = self
            .data
            .attributes
            .cart_item
            .into_iter()
            .map(|item| item.into_cart_item(currency))
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Malformed)?;

        let cart = Cart::new(cart_id, currency).with_items(items);
        cart.validate()
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        Ok(cart)
    }
}

impl WireCartItem {
    fn into_cart_item(self, currency: Currency) -> Result<CartItem, String> {
        let item_id = self.id.into_string();
        let product = self
            .bb_product
            .data
            .ok_or_else(|| format!("cart item {} has no product", item_id))?;
        let attrs = product.attributes;

        let unit_price = attrs
            .price
            .as_ref()
            .map(|p| p.parse(currency))
            .transpose()?
            .flatten()
            .ok_or_else(|| format!("product '{}' has no price", attrs.name))?;
        let discount = attrs
            .discount_price
            .as_ref()
            .map(|p| p.parse(currency))
            .transpose()?
            .flatten()
            .filter(|m| !m.is_zero());

        let mut item = CartItem::new(
            CartItemId::new(item_id),
            ProductId::new(product.id.into_string()),
            attrs.name,
            self.quantity,
            unit_price,
        );
        if let Some(discount) = discount {
            item = item.with_discount(discount);
        }
        if let Some(cap) = attrs.inventory {
            item = item.with_inventory_cap(cap);
        }
        Ok(item)
    }
}

/// Request body of the replace call.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateCartBody {
    data: UpdateCartData,
}

#[derive(Debug, Clone, Serialize)]
struct UpdateCartData {
    cart_item: Vec<UpdateLine>,
}

#[derive(Debug, Clone, Serialize)]
struct UpdateLine {
    quantity: i64,
    bb_product: WireId,
}

impl UpdateCartBody {
    pub fn new(lines: &[ReplaceLine]) -> Self {
        let cart_item = lines
            .iter()
            .map(|line| UpdateLine {
                quantity: line.quantity,
                bb_product: WireId::from(&line.product_id),
            })
            .collect();
        Self {
            data: UpdateCartData { cart_item },
        }
    }
}

/// [`CartStore`] backed by the storefront REST API.
pub struct HttpCartStore {
    client: FetchClient,
    currency: Currency,
}

impl HttpCartStore {
    /// Prices read from the API are interpreted in `currency`.
    pub fn new(client: FetchClient, currency: Currency) -> Self {
        Self { client, currency }
    }

    fn path(cart_id: &CartId) -> String {
        format!("/api/carts/{}", cart_id)
    }

    fn read_cart(&self, response: Response) -> Result<Cart, StoreError> {
        let response = check_status(response)?;
        let payload: CartPayload = response
            .json()
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        payload.into_cart(self.currency)
    }
}

#[async_trait]
impl CartStore for HttpCartStore {
    async fn fetch_cart(&self, cart_id: &CartId) -> Result<Cart, StoreError> {
        let response = self
            .client
            .get(Self::path(cart_id))
            .query(POPULATE_KEY, POPULATE_VALUE)
            .send()
            .await
            .map_err(transport_error)?;

        let cart = self.read_cart(response)?;
        debug!(%cart_id, items = cart.len(), "cart fetched");
        Ok(cart)
    }

    async fn replace_cart_items(
        &self,
        cart_id: &CartId,
        lines: &[ReplaceLine],
    ) -> Result<Cart, StoreError> {
        let body = UpdateCartBody::new(lines);
        let response = self
            .client
            .put(Self::path(cart_id))
            .query(POPULATE_KEY, POPULATE_VALUE)
            .json(&body)
            .map_err(|e| StoreError::Malformed(e.to_string()))?
            .send()
            .await
            .map_err(transport_error)?;

        match self.read_cart(response) {
            Ok(cart) => {
                info!(%cart_id, lines = lines.len(), "cart replaced");
                Ok(cart)
            }
            Err(e) => {
                warn!(%cart_id, lines = lines.len(), error = %e, "cart replace failed");
                Err(e)
            }
        }
    }
}

fn check_status(response: Response) -> Result<Response, StoreError> {
    if response.is_not_found() {
        return Err(StoreError::NotFound(
            response.text().unwrap_or_default(),
        ));
    }
    response.error_for_status().map_err(|e| match e {
        FetchError::HttpError { status, message } => StoreError::Rejected { status, message },
        other => StoreError::Malformed(other.to_string()),
    })
}

fn transport_error(e: FetchError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const CART_JSON: &str = r#"{
        "data": {
            "id": 5,
            "attributes": {
                "cart_item": [
                    {
                        "id": 31,
                        "quantity": 2,
                        "bb_product": { "data": { "id": 12, "attributes": {
                            "name": "Seiko 5", "price": "3500000", "discountPrice": "3150000", "inventory": 4
                        } } }
                    },
                    {
                        "id": 32,
                        "quantity": 1,
                        "bb_product": { "data": { "id": 15, "attributes": {
                            "name": "Casio MTP", "price": 990000, "discountPrice": ""
                        } } }
                    }
                ]
            }
        },
        "meta": {}
    }"#;

    fn payload(json: &str) -> CartPayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_payload_maps_to_cart() {
        let cart = payload(CART_JSON).into_cart(Currency::VND).unwrap();

        assert_eq!(cart.id, CartId::new("5"));
        assert_eq!(cart.len(), 2);

        let seiko = &cart.items[0];
        assert_eq!(seiko.id, CartItemId::new("31"));
        assert_eq!(seiko.product_id, ProductId::new("12"));
        assert_eq!(seiko.unit_price, Money::new(3_500_000, Currency::VND));
        assert_eq!(
            seiko.effective_unit_price(),
            Money::new(3_150_000, Currency::VND)
        );
        assert_eq!(seiko.inventory_cap, Some(4));

        let casio = &cart.items[1];
        assert_eq!(casio.unit_price, Money::new(990_000, Currency::VND));
        assert_eq!(casio.discounted_unit_price, None);
        assert_eq!(casio.inventory_cap, None);
    }

    #[test]
    fn test_empty_cart_without_items() {
        let cart = payload(r#"{ "data": { "id": "9", "attributes": {} } }"#)
            .into_cart(Currency::VND)
            .unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.id, CartId::new("9"));
    }

    #[test]
    fn test_missing_product_is_malformed() {
        let json = r#"{ "data": { "id": 1, "attributes": { "cart_item": [
            { "id": 2, "quantity": 1, "bb_product": { "data": null } }
        ] } } }"#;
        assert!(matches!(
            payload(json).into_cart(Currency::VND),
            Err(StoreError::Malformed(_))
        ));
    }

    #[test]
    fn test_bad_price_is_malformed() {
        let json = r#"{ "data": { "id": 1, "attributes": { "cart_item": [
            { "id": 2, "quantity": 1, "bb_product": { "data": { "id": 3, "attributes": {
                "name": "x", "price": "abc"
            } } } }
        ] } } }"#;
        assert!(matches!(
            payload(json).into_cart(Currency::VND),
            Err(StoreError::Malformed(_))
        ));
    }

    #[test]
    fn test_zero_quantity_line_is_malformed() {
        let json = r#"{ "data": { "id": 1, "attributes": { "cart_item": [
            { "id": 2, "quantity": 0, "bb_product": { "data": { "id": 3, "attributes": {
                "name": "x", "price": "10"
            } } } }
        ] } } }"#;
        assert!(matches!(
            payload(json).into_cart(Currency::VND),
            Err(StoreError::Malformed(_))
        ));
    }

    #[test]
    fn test_update_body_shape() {
        let body = UpdateCartBody::new(&[
            ReplaceLine::new(ProductId::new("12"), 3),
            ReplaceLine::new(ProductId::new("sku-x"), 1),
        ]);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "data": { "cart_item": [
                    { "quantity": 3, "bb_product": 12 },
                    { "quantity": 1, "bb_product": "sku-x" }
                ] }
            })
        );
    }

    #[test]
    fn test_status_mapping() {
        let response = |status: u16, body: &str| {
            Response::new(status, HashMap::new(), body.as_bytes().to_vec())
        };

        assert!(check_status(response(200, "{}")).is_ok());
        assert!(matches!(
            check_status(response(404, "")),
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(
            check_status(response(400, "out of stock")).err(),
            Some(StoreError::Rejected {
                status: 400,
                message: "out of stock".into()
            })
        );
        assert!(matches!(
            transport_error(FetchError::Timeout),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn test_store_paths() {
        assert_eq!(HttpCartStore::path(&CartId::new("5")), "/api/carts/5");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        let client = FetchClient::new()
            .unwrap()
            .with_base_url("http://127.0.0.1:9")
            .with_timeout(std::time::Duration::from_millis(500));
        let store = HttpCartStore::new(client, Currency::VND);

        let result = store.fetch_cart(&CartId::new("1")).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
