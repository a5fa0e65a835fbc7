//! Signed-in user context.
//!
//! The storefront persists a JSON blob after login holding the auth token
//! and the user record. It is parsed and validated once, here, and the
//! resulting [`SessionContext`] is handed to whatever needs it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::ids::{CartId, UserId};

/// Errors raised while loading a session blob.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Invalid session JSON: {0}")]
    InvalidJson(String),

    #[error("Session has no auth token")]
    MissingToken,

    #[error("Session user has no id")]
    MissingUserId,

    #[error("Invalid address '{0}': expected <province>-<district>-<ward>[-<street>]")]
    InvalidAddress(String),
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Administrative division codes of the user's delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressCodes {
    pub province: u32,
    pub district: u32,
    pub ward: u32,
    /// Free-form street line, when one was saved.
    pub street: Option<String>,
}

impl AddressCodes {
    /// Parse `"<province>-<district>-<ward>[-<street>]"`.
    ///
    /// The street part may itself contain dashes.
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        let invalid = || SessionError::InvalidAddress(raw.to_string());
        let mut parts = raw.trim().splitn(4, '-');

        let mut code = || -> Result<u32, SessionError> {
            parts
                .next()
                .and_then(|p| p.trim().parse().ok())
                .ok_or_else(invalid)
        };
        let province = code()?;
        let district = code()?;
        let ward = code()?;

        let street = parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        Ok(Self {
            province,
            district,
            ward,
            street,
        })
    }
}

/// Everything a cart view needs to know about who is shopping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionContext {
    /// Bearer token for the cart service.
    pub token: String,
    pub user: SessionUser,
    pub address: Option<AddressCodes>,
    /// The user's cart, when the service already created one.
    pub cart_id: Option<CartId>,
}

#[derive(Deserialize)]
struct RawSession {
    #[serde(alias = "jwt")]
    token: Option<String>,
    user: RawUser,
}

#[derive(Deserialize)]
struct RawUser {
    id: Option<Value>,
    #[serde(default)]
    username: String,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    cart: Option<Value>,
}

impl SessionContext {
    /// Load and validate a persisted session blob.
    pub fn from_json(raw: &str) -> Result<Self, SessionError> {
        let session: RawSession =
            serde_json::from_str(raw).map_err(|e| SessionError::InvalidJson(e.to_string()))?;

        let token = session
            .token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(SessionError::MissingToken)?;

        let user = session.user;
        let id = user
            .id
            .as_ref()
            .and_then(scalar_id)
            .map(UserId::new)
            .ok_or(SessionError::MissingUserId)?;

        let address = match user.address.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(AddressCodes::parse(raw)?),
        };

        // The cart is either a bare id or a populated relation.
        let cart_id = user
            .cart
            .as_ref()
            .and_then(|cart| scalar_id(cart).or_else(|| cart.get("id").and_then(scalar_id)))
            .map(CartId::new);

        Ok(Self {
            token,
            user: SessionUser {
                id,
                username: user.username,
                email: user.email,
                phone: user.phone,
            },
            address,
            cart_id,
        })
    }
}

fn scalar_id(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_session() {
        let raw = r#"{
            "jwt": "abc.def",
            "user": {
                "id": 7,
                "username": "lan",
                "email": "lan@example.com",
                "phone": "0900000000",
                "address": "79-760-26734-12 Nguyen Hue",
                "cart": { "id": 42 }
            }
        }"#;

        let session = SessionContext::from_json(raw).unwrap();
        assert_eq!(session.token, "abc.def");
        assert_eq!(session.user.id, UserId::new("7"));
        assert_eq!(session.cart_id, Some(CartId::new("42")));
        assert_eq!(
            session.address,
            Some(AddressCodes {
                province: 79,
                district: 760,
                ward: 26734,
                street: Some("12 Nguyen Hue".into()),
            })
        );
    }

    #[test]
    fn test_minimal_session() {
        let raw = r#"{ "token": "t", "user": { "id": "u1", "cart": 3 } }"#;
        let session = SessionContext::from_json(raw).unwrap();
        assert_eq!(session.address, None);
        assert_eq!(session.cart_id, Some(CartId::new("3")));
        assert!(session.user.email.is_none());
    }

    #[test]
    fn test_rejects_missing_token() {
        let raw = r#"{ "jwt": "  ", "user": { "id": 1 } }"#;
        assert_eq!(
            SessionContext::from_json(raw),
            Err(SessionError::MissingToken)
        );
    }

    #[test]
    fn test_rejects_missing_user_id() {
        let raw = r#"{ "jwt": "t", "user": { "username": "x" } }"#;
        assert_eq!(
            SessionContext::from_json(raw),
            Err(SessionError::MissingUserId)
        );
    }

    #[test]
    fn test_rejects_bad_address() {
        let raw = r#"{ "jwt": "t", "user": { "id": 1, "address": "79-abc-1" } }"#;
        assert!(matches!(
            SessionContext::from_json(raw),
            Err(SessionError::InvalidAddress(_))
        ));
        assert!(AddressCodes::parse("79-760").is_err());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            SessionContext::from_json("not json"),
            Err(SessionError::InvalidJson(_))
        ));
    }
}
