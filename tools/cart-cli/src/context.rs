//! CLI execution context.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use futures::channel::mpsc::UnboundedReceiver;
use turbo_cart::prelude::*;
use turbo_data::{FetchClient, HttpCartStore};

use crate::config::{CliConfig, CONFIG_NAMES};
use crate::output::Output;

/// Flags that override the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub config: Option<String>,
    pub session: Option<String>,
    pub cart: Option<String>,
}

/// Execution context for CLI commands.
pub struct Context {
    /// CLI configuration.
    pub config: CliConfig,
    /// Where the config came from, if a file was found.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
    overrides: Overrides,
}

impl Context {
    /// Load context from config file.
    pub fn load(overrides: Overrides, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (config, config_path) = match overrides.config.as_deref() {
            Some(path) => (CliConfig::load(path)?, Some(PathBuf::from(path))),
            None => match find_config(&cwd) {
                Some(path) => (CliConfig::load(&path.to_string_lossy())?, Some(path)),
                None => (CliConfig::default(), None),
            },
        };

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
            overrides,
        })
    }

    /// The persisted login, if one is configured.
    pub fn session(&self) -> Result<Option<SessionContext>> {
        let Some(path) = self
            .overrides
            .session
            .as_deref()
            .or(self.config.session.path.as_deref())
        else {
            return Ok(None);
        };
        let path = self.resolve_path(path);
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session file: {}", path.display()))?;
        let session = SessionContext::from_json(&raw)
            .with_context(|| format!("Invalid session file: {}", path.display()))?;
        Ok(Some(session))
    }

    pub fn currency(&self) -> Result<Currency> {
        let code = &self.config.cart.currency;
        match Currency::from_code(code) {
            Some(currency) => Ok(currency),
            None => bail!("Unknown currency in config: {}", code),
        }
    }

    /// Cart to work on: `--cart`, then the config, then the session.
    pub fn cart_id(&self, session: Option<&SessionContext>) -> Result<CartId> {
        if let Some(id) = self.overrides.cart.as_deref().or(self.config.cart.id.as_deref()) {
            return Ok(CartId::new(id));
        }
        match session.and_then(|s| s.cart_id.clone()) {
            Some(id) => Ok(id),
            None => bail!("No cart selected. Pass --cart, set cart.id, or configure a session."),
        }
    }

    /// The storefront cart store, authenticated when a session exists.
    pub fn store(&self, session: Option<&SessionContext>) -> Result<HttpCartStore> {
        let mut client = FetchClient::new()
            .context("Failed to create HTTP client")?
            .with_base_url(&self.config.api.base_url)
            .with_timeout(Duration::from_millis(self.config.api.timeout_ms));
        if let Some(session) = session {
            client = client.with_bearer_token(&session.token);
        }
        Ok(HttpCartStore::new(client, self.currency()?))
    }

    /// Fetch the selected cart and start a sync session on it.
    pub async fn open_cart(&self) -> Result<(CartSync<HttpCartStore>, UnboundedReceiver<SyncNotice>)> {
        let session = self.session()?;
        let cart_id = self.cart_id(session.as_ref())?;
        let store = self.store(session.as_ref())?;

        let spinner = self.output.spinner(&format!("Loading cart {}", cart_id));
        let loaded = CartSync::load(store, &cart_id).await;
        spinner.finish_and_clear();

        loaded.with_context(|| format!("Failed to load cart {}", cart_id))
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        if Path::new(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.cwd.join(path)
        }
    }
}

/// Find a config file in the directory tree.
fn find_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        for name in CONFIG_NAMES {
            let path = current.join(name);
            if path.is_file() {
                return Some(path);
            }
        }
        if !current.pop() {
            return None;
        }
    }
}
