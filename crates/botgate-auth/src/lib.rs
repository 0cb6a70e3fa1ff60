//! Bearer-token authentication gate for bot messaging webhooks.
//!
//! Provides:
//! - [`BotAuthenticator`]: The gate; decides whether an inbound request is authenticated
//! - [`TokenVerifier`]: Trait for token verification (implement per identity provider)
//! - [`CredentialProvider`]: App id / secret lookup, and the "authentication disabled" switch
//! - [`BotAuthLayer`] / [`BotAuthService`]: Tower middleware around the gate
//! - [`TrustedServiceUrls`]: Reply endpoints seen on authenticated activities
//! - [`BotAuthConfig`]: Configuration for the gate
//! - [`AuthError`]: Rejection reasons

mod activity;
mod credentials;
mod error;
mod gate;
mod middleware;
mod principal;
#[cfg(test)]
mod proptests;
mod trust;

use std::fmt;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

pub use activity::{
    Activity, ChannelAccount, ConversationAccount, activities_from_json, activity_types,
};
pub use credentials::{
    CredentialProvider, Credentials, DisabledCredentialProvider, SimpleCredentialProvider,
    StaticCredentialProvider,
};
pub use error::AuthError;
pub use gate::{AuthOutcome, BEARER_PREFIX, BotAuthenticator, extract_bearer_token};
pub use middleware::{BotAuthLayer, BotAuthService, DEFAULT_BODY_LIMIT};
pub use principal::{
    BOT_ROLE, BotPrincipal, Claim, ROLE_CLAIM, VerifiedIdentity, app_id_from_parts,
    principal_from_parts,
};
pub use trust::{DEFAULT_TRUST_TTL, TrustedServiceUrls};

/// Authentication scheme name handed to the verifier.
pub const DEFAULT_AUTHENTICATION_SCHEME: &str = "Bearer";

/// OpenID metadata for tokens issued to channels.
pub const DEFAULT_OPENID_METADATA_URL: &str =
    "https://login.botframework.com/v1/.well-known/openidconfiguration";

/// Configuration for the authentication gate.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BotAuthConfig {
    /// The bot's app id.
    pub app_id: Option<String>,
    /// The bot's app password. Never printed by `Debug`.
    pub app_password: Option<String>,
    /// Where channel signing keys are discovered.
    pub openid_metadata_url: String,
    /// Reject tokens issued by the local emulator.
    pub disable_emulator_tokens: bool,
    /// Keep the raw token on the [`BotPrincipal`] for downstream use.
    pub save_token: bool,
    /// Let every request through. Local development only.
    pub disable_authentication: bool,
    /// Scheme name reported on the principal and handed to the verifier.
    pub authentication_scheme: String,
}

impl Default for BotAuthConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            app_password: None,
            openid_metadata_url: DEFAULT_OPENID_METADATA_URL.to_string(),
            disable_emulator_tokens: false,
            save_token: false,
            disable_authentication: false,
            authentication_scheme: DEFAULT_AUTHENTICATION_SCHEME.to_string(),
        }
    }
}

impl fmt::Debug for BotAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotAuthConfig")
            .field("app_id", &self.app_id)
            .field("app_password", &self.app_password.as_ref().map(|_| "<redacted>"))
            .field("openid_metadata_url", &self.openid_metadata_url)
            .field("disable_emulator_tokens", &self.disable_emulator_tokens)
            .field("save_token", &self.save_token)
            .field("disable_authentication", &self.disable_authentication)
            .field("authentication_scheme", &self.authentication_scheme)
            .finish()
    }
}

/// Everything a verifier needs to judge one token.
#[derive(Clone, Copy)]
pub struct VerificationRequest<'a> {
    /// Authentication scheme name (e.g. `"Bearer"`).
    pub scheme: &'a str,
    /// The raw token, prefix and whitespace stripped.
    pub token: &'a str,
    /// The configured app id, when static credentials are in use.
    pub app_id: Option<&'a str>,
    /// Where channel signing keys are discovered.
    pub openid_metadata_url: &'a str,
    /// Whether emulator-issued tokens may be accepted.
    pub allow_emulator_tokens: bool,
    /// Decides which audiences / app ids are acceptable.
    pub credentials: &'a dyn CredentialProvider,
}

/// Trait for verifying tokens and extracting the caller's identity.
///
/// Implement this for each identity provider. The gate calls `verify()`
/// once per request with the bearer token and maps any error to a
/// rejection. Network timeouts are the implementation's responsibility.
pub trait TokenVerifier: Send + Sync + 'static {
    /// Verify a token and return the identity it asserts.
    fn verify<'a>(
        &'a self,
        request: VerificationRequest<'a>,
    ) -> BoxFuture<'a, Result<VerifiedIdentity, AuthError>>;
}
