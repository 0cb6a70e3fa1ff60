//! Credential providers: who the bot is, and whether authentication is on.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::BotAuthConfig;

/// Source of the bot's app identity and secret.
///
/// Implement this to look app ids up somewhere other than static
/// configuration (a secrets store, a multi-tenant table, ...).
pub trait CredentialProvider: Send + Sync + 'static {
    /// Whether `app_id` belongs to this bot.
    fn is_valid_app_id<'a>(&'a self, app_id: &'a str) -> BoxFuture<'a, bool>;

    /// The password for `app_id`, if it is known.
    fn app_password<'a>(&'a self, app_id: &'a str) -> BoxFuture<'a, Option<String>>;

    /// Whether authentication is turned off for the whole deployment.
    ///
    /// Only [`DisabledCredentialProvider`] answers `true`. A provider with
    /// no usable apps still authenticates, and so rejects every token.
    fn is_authentication_disabled(&self) -> BoxFuture<'_, bool>;
}

/// A single app id / password pair.
#[derive(Clone)]
pub struct StaticCredentialProvider {
    app_id: String,
    password: String,
}

impl StaticCredentialProvider {
    pub fn new(app_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            password: password.into(),
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }
}

impl fmt::Debug for StaticCredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentialProvider")
            .field("app_id", &self.app_id)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn is_valid_app_id<'a>(&'a self, app_id: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move { !self.app_id.is_empty() && app_id == self.app_id })
    }

    fn app_password<'a>(&'a self, app_id: &'a str) -> BoxFuture<'a, Option<String>> {
        Box::pin(async move { (app_id == self.app_id).then(|| self.password.clone()) })
    }

    fn is_authentication_disabled(&self) -> BoxFuture<'_, bool> {
        Box::pin(async { false })
    }
}

/// Several app id / password pairs, for deployments hosting more than one bot.
#[derive(Clone, Default)]
pub struct SimpleCredentialProvider {
    apps: HashMap<String, String>,
}

impl SimpleCredentialProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_app(mut self, app_id: impl Into<String>, password: impl Into<String>) -> Self {
        self.apps.insert(app_id.into(), password.into());
        self
    }
}

impl fmt::Debug for SimpleCredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut app_ids: Vec<&String> = self.apps.keys().collect();
        app_ids.sort();
        f.debug_struct("SimpleCredentialProvider")
            .field("app_ids", &app_ids)
            .finish()
    }
}

impl CredentialProvider for SimpleCredentialProvider {
    fn is_valid_app_id<'a>(&'a self, app_id: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move { self.apps.contains_key(app_id) })
    }

    fn app_password<'a>(&'a self, app_id: &'a str) -> BoxFuture<'a, Option<String>> {
        Box::pin(async move { self.apps.get(app_id).cloned() })
    }

    fn is_authentication_disabled(&self) -> BoxFuture<'_, bool> {
        Box::pin(async { false })
    }
}

/// Explicitly disables authentication (local development only).
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCredentialProvider;

impl CredentialProvider for DisabledCredentialProvider {
    fn is_valid_app_id<'a>(&'a self, _app_id: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async { false })
    }

    fn app_password<'a>(&'a self, _app_id: &'a str) -> BoxFuture<'a, Option<String>> {
        Box::pin(async { None })
    }

    fn is_authentication_disabled(&self) -> BoxFuture<'_, bool> {
        Box::pin(async { true })
    }
}

/// The credentials the gate authenticates with.
#[derive(Clone)]
pub enum Credentials {
    Provider(Arc<dyn CredentialProvider>),
    /// Nothing configured: every request is rejected.
    Unconfigured,
}

impl Credentials {
    /// Pick credentials by precedence: an explicit provider wins; otherwise
    /// a non-blank app id and password become a [`StaticCredentialProvider`];
    /// otherwise the gate is unconfigured and fails closed.
    pub fn resolve(
        provider: Option<Arc<dyn CredentialProvider>>,
        app_id: Option<&str>,
        password: Option<&str>,
    ) -> Self {
        if let Some(provider) = provider {
            return Credentials::Provider(provider);
        }

        let app_id = app_id.map(str::trim).filter(|s| !s.is_empty());
        let password = password.map(str::trim).filter(|s| !s.is_empty());
        match (app_id, password) {
            (Some(app_id), Some(password)) => Credentials::Provider(Arc::new(
                StaticCredentialProvider::new(app_id, password),
            )),
            _ => Credentials::Unconfigured,
        }
    }

    /// Credentials described by configuration alone.
    pub fn from_config(config: &BotAuthConfig) -> Self {
        let provider: Option<Arc<dyn CredentialProvider>> = if config.disable_authentication {
            Some(Arc::new(DisabledCredentialProvider))
        } else {
            None
        };
        Self::resolve(
            provider,
            config.app_id.as_deref(),
            config.app_password.as_deref(),
        )
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Credentials::Provider(_))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Provider(_) => f.write_str("Credentials::Provider"),
            Credentials::Unconfigured => f.write_str("Credentials::Unconfigured"),
        }
    }
}
