//! # tb-configs
//!
//! Layered settings: built-in defaults, then an optional `threadboard.toml`,
//! then `THREADBOARD__SECTION__KEY` environment variables. A `.env` file in
//! the working directory is loaded first.

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use tb_services::{DisplayLabels, SiblingOrder};
use thiserror::Error;
use tracing::debug;

pub const ENV_PREFIX: &str = "THREADBOARD";
pub const DEFAULT_FILE: &str = "threadboard.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub thread: ThreadSettings,
    pub labels: DisplayLabels,
    pub session: SessionSettings,
}

/// Comment/user service endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    /// Applied to every network exchange.
    pub timeout_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3002/api".to_string(),
            timeout_ms: 5_000,
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThreadSettings {
    pub max_depth: usize,
    pub order: SiblingOrder,
}

impl Default for ThreadSettings {
    fn default() -> Self {
        Self {
            max_depth: 64,
            order: SiblingOrder::AsReturned,
        }
    }
}

/// Session artifacts handed over by the identity provider.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Raw `Cookie` header value containing the `session` cookie.
    pub cookie: Option<SecretString>,
    /// Raw bearer token whose payload carries the claim.
    pub token: Option<SecretString>,
}

impl Settings {
    /// Loads `.env`, then `threadboard.toml` (if present), then the environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::load_from(Path::new(DEFAULT_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let file = config::File::from(path).required(false);
        let settings: Settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        debug!(path = %path.display(), base_url = %settings.api.base_url, "settings loaded");
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.base_url must not be empty".into()));
        }
        if self.api.timeout_ms == 0 {
            return Err(ConfigError::Invalid("api.timeout_ms must be positive".into()));
        }
        if self.thread.max_depth == 0 {
            return Err(ConfigError::Invalid("thread.max_depth must be positive".into()));
        }
        Ok(())
    }
}
