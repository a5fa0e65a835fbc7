//! HTTP plumbing for TurboCommerce storefronts.
//!
//! [`FetchClient`] is a small builder API over `reqwest` with a base URL,
//! default headers and a request timeout. [`HttpCartStore`] uses it to
//! implement the cart engine's [`CartStore`](turbo_cart::store::CartStore)
//! port against the storefront's REST API.
//!
//! # Example
//!
//! ```rust,ignore
//! use turbo_data::{FetchClient, HttpCartStore};
//! use turbo_cart::prelude::*;
//!
//! let client = FetchClient::new()?
//!     .with_base_url("https://shop.example.com")
//!     .with_bearer_token(session.token.clone());
//! let store = HttpCartStore::new(client, Currency::VND);
//!
//! let (sync, notices) = CartSync::load(store, &cart_id).await?;
//! ```

mod cart_api;
mod error;
mod request;
mod response;

use std::collections::HashMap;
use std::time::Duration;

pub use cart_api::{CartPayload, HttpCartStore, UpdateCartBody};
pub use error::FetchError;
pub use request::{Method, RequestBuilder};
pub use response::Response;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the storefront API.
#[derive(Clone)]
pub struct FetchClient {
    http: reqwest::Client,
    base_url: Option<String>,
    default_headers: HashMap<String, String>,
    timeout: Duration,
}

impl FetchClient {
    /// Create a new HTTP client.
    pub fn new() -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("turbo-data/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: None,
            default_headers: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Create a client with a base URL that will be prepended to relative paths.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Add a default header that will be included in all requests.
    pub fn with_default_header(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    /// Authenticate every request with a bearer token.
    pub fn with_bearer_token(self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref());
        self.with_default_header("Authorization", value)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Create a GET request.
    pub fn get(&self, url: impl Into<String>) -> ClientRequestBuilder {
        self.request(Method::Get, url)
    }

    /// Create a PUT request.
    pub fn put(&self, url: impl Into<String>) -> ClientRequestBuilder {
        self.request(Method::Put, url)
    }

    /// Create a request with a custom method.
    pub fn request(&self, method: Method, url: impl Into<String>) -> ClientRequestBuilder {
        let mut builder = RequestBuilder::new(method, self.resolve(url.into()))
            .accept("application/json")
            .timeout(self.timeout);
        for (key, value) in &self.default_headers {
            builder = builder.header(key.clone(), value.clone());
        }

        ClientRequestBuilder {
            http: self.http.clone(),
            builder,
        }
    }

    fn resolve(&self, url: String) -> String {
        match &self.base_url {
            Some(base) if !url.starts_with("http://") && !url.starts_with("https://") => {
                format!(
                    "{}/{}",
                    base.trim_end_matches('/'),
                    url.trim_start_matches('/')
                )
            }
            _ => url,
        }
    }
}

/// A request builder bound to a client.
pub struct ClientRequestBuilder {
    http: reqwest::Client,
    builder: RequestBuilder,
}

impl ClientRequestBuilder {
    /// Add a header to the request.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.builder = self.builder.header(key, value);
        self
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.builder = self.builder.query(key, value);
        self
    }

    /// Set the request body as JSON.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Result<Self, FetchError> {
        self.builder = self.builder.json(value)?;
        Ok(self)
    }

    /// Add a bearer token authorization header.
    pub fn bearer_auth(mut self, token: impl AsRef<str>) -> Self {
        self.builder = self.builder.bearer_auth(token);
        self
    }

    pub fn url(&self) -> &str {
        self.builder.url()
    }

    /// Send the request and read the whole response.
    ///
    /// Non-2xx statuses are returned as a [`Response`], not an error; use
    /// [`Response::error_for_status`] to turn them into one.
    pub async fn send(self) -> Result<Response, FetchError> {
        let method = self.builder.method();
        let url = self.builder.url().to_string();
        tracing::debug!(method = method.as_str(), %url, "sending request");

        let response = self.builder.into_reqwest(&self.http).send().await?;
        let response = Response::read(response).await?;

        tracing::debug!(method = method.as_str(), %url, status = response.status, "response received");
        Ok(response)
    }
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{FetchClient, FetchError, HttpCartStore, Method, Response};
}
