//! CLI configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Config file names, in lookup order.
pub const CONFIG_NAMES: [&str; 3] = ["cart.toml", ".cart.toml", "cart.json"];

/// CLI configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Storefront API.
    #[serde(default)]
    pub api: ApiConfig,

    /// Which cart to work on.
    #[serde(default)]
    pub cart: CartConfig,

    /// Persisted login.
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging.
    #[serde(default)]
    pub log: LogConfig,
}

impl CliConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))
        }
    }
}

/// Storefront API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the storefront API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:1337".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Cart selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartConfig {
    /// Cart id; falls back to the session's cart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// ISO code of the currency prices are quoted in.
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "VND".to_string()
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            id: None,
            currency: default_currency(),
        }
    }
}

/// Where the login blob is stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of compact text.
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "warn".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

/// Generate a default cart.toml config file.
pub fn generate_default_config() -> String {
    r#"# Storefront cart configuration

[api]
base_url = "http://localhost:1337"
timeout_ms = 10000

[cart]
# id = "42"
currency = "VND"

[session]
# path = "session.json"

[log]
level = "warn"
json = false
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: CliConfig = toml::from_str("").unwrap();
        assert_eq!(config.api.base_url, "http://localhost:1337");
        assert_eq!(config.api.timeout_ms, 10_000);
        assert_eq!(config.cart.currency, "VND");
        assert!(config.cart.id.is_none());
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn test_generated_config_parses() {
        let config: CliConfig = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.cart.currency, "VND");
        assert!(!config.log.json);
    }

    #[test]
    fn test_partial_tables() {
        let config: CliConfig = toml::from_str(
            r#"
            [cart]
            id = "7"

            [log]
            json = true
            "#,
        )
        .unwrap();
        assert_eq!(config.cart.id.as_deref(), Some("7"));
        assert_eq!(config.cart.currency, "VND");
        assert!(config.log.json);
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn test_json_config() {
        let config: CliConfig =
            serde_json::from_str(r#"{ "api": { "base_url": "https://shop.vn" } }"#).unwrap();
        assert_eq!(config.api.base_url, "https://shop.vn");
        assert_eq!(config.api.timeout_ms, 10_000);
    }
}
