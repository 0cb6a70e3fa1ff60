//! Server configuration.
//!
//! Loaded once at startup: an optional TOML file, then command-line and
//! environment overrides (see [`crate::cli`]). Nothing re-reads the
//! environment after that.

use std::path::Path;

use serde::{Deserialize, Serialize};

use botgate_auth::{BotAuthConfig, DEFAULT_BODY_LIMIT};

use crate::{Error, Result};

/// Default listen address.
pub const DEFAULT_BIND: &str = "127.0.0.1:3978";

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the webhook listens on.
    pub bind: String,
    /// Largest accepted request body, in bytes.
    pub body_limit: usize,
    /// Authentication gate settings.
    pub auth: BotAuthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            body_limit: DEFAULT_BODY_LIMIT,
            auth: BotAuthConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(e.to_string()))
    }

    /// Load from a TOML file, or return defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))
    }

    /// Reject combinations that cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.body_limit == 0 {
            return Err(Error::config("body_limit must be greater than zero"));
        }
        if self.auth.authentication_scheme.trim().is_empty() {
            return Err(Error::config("auth.authentication_scheme must not be empty"));
        }
        if !self.auth.disable_authentication && self.auth.openid_metadata_url.trim().is_empty() {
            return Err(Error::config("auth.openid_metadata_url must not be empty"));
        }
        Ok(())
    }
}
