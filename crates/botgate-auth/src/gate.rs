//! The authentication gate.
//!
//! Every inbound request passes through [`BotAuthenticator`] before it
//! reaches application logic. The decision is single-shot: no retries, no
//! fallback scheme, and service URLs are only trusted after the request
//! has been authenticated.

use std::sync::Arc;

use http::HeaderMap;

use crate::activity::{Activity, activities_from_json};
use crate::credentials::{CredentialProvider, Credentials};
use crate::principal::BotPrincipal;
use crate::trust::TrustedServiceUrls;
use crate::{AuthError, BotAuthConfig, TokenVerifier, VerificationRequest};

/// Prefix an `Authorization` header must carry.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Result of running the gate on one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(BotPrincipal),
    Rejected(AuthError),
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthOutcome::Authenticated(_))
    }

    pub fn principal(&self) -> Option<&BotPrincipal> {
        match self {
            AuthOutcome::Authenticated(principal) => Some(principal),
            AuthOutcome::Rejected(_) => None,
        }
    }

    pub fn into_result(self) -> Result<BotPrincipal, AuthError> {
        match self {
            AuthOutcome::Authenticated(principal) => Ok(principal),
            AuthOutcome::Rejected(err) => Err(err),
        }
    }
}

/// Decides whether inbound requests are authenticated.
pub struct BotAuthenticator {
    credentials: Credentials,
    verifier: Arc<dyn TokenVerifier>,
    trust: Arc<TrustedServiceUrls>,
    scheme: String,
    app_id: Option<String>,
    openid_metadata_url: String,
    allow_emulator_tokens: bool,
    save_token: bool,
}

impl BotAuthenticator {
    /// Create a gate from configuration and a token verifier.
    ///
    /// Credentials come from the config; see [`Credentials::from_config`].
    pub fn new(config: &BotAuthConfig, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            credentials: Credentials::from_config(config),
            verifier,
            trust: Arc::new(TrustedServiceUrls::new()),
            scheme: config.authentication_scheme.clone(),
            app_id: config
                .app_id
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            openid_metadata_url: config.openid_metadata_url.clone(),
            allow_emulator_tokens: !config.disable_emulator_tokens,
            save_token: config.save_token,
        }
    }

    /// Use an explicit credential provider. Takes precedence over any app
    /// id and password in the configuration.
    pub fn with_credential_provider(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Credentials::Provider(provider);
        self
    }

    /// Share a trust registry with other components (e.g. an outbound client).
    pub fn with_trust_registry(mut self, trust: Arc<TrustedServiceUrls>) -> Self {
        self.trust = trust;
        self
    }

    pub fn trust_registry(&self) -> &Arc<TrustedServiceUrls> {
        &self.trust
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Judge the value of an `Authorization` header (or its absence).
    pub async fn authenticate(&self, authorization: Option<&str>) -> AuthOutcome {
        let outcome = self.decide(authorization).await;
        match &outcome {
            AuthOutcome::Authenticated(principal) => {
                log::debug!(
                    "Request authenticated (app_id: {})",
                    principal.app_id.as_deref().unwrap_or("none")
                );
            }
            AuthOutcome::Rejected(err) => log::warn!("Authentication failed: {err}"),
        }
        outcome
    }

    async fn decide(&self, authorization: Option<&str>) -> AuthOutcome {
        let provider = match &self.credentials {
            Credentials::Provider(provider) => provider,
            Credentials::Unconfigured => return AuthOutcome::Rejected(AuthError::NotConfigured),
        };

        if provider.is_authentication_disabled().await {
            return AuthOutcome::Authenticated(BotPrincipal::unauthenticated_bot(&self.scheme));
        }

        let Some(token) = authorization.and_then(extract_bearer_token) else {
            return AuthOutcome::Rejected(AuthError::MissingToken);
        };

        let request = VerificationRequest {
            scheme: &self.scheme,
            token,
            app_id: self.app_id.as_deref(),
            openid_metadata_url: &self.openid_metadata_url,
            allow_emulator_tokens: self.allow_emulator_tokens,
            credentials: provider.as_ref(),
        };

        match self.verifier.verify(request).await {
            Ok(identity) => {
                let saved = self.save_token.then(|| token.to_string());
                AuthOutcome::Authenticated(BotPrincipal::from_verified(
                    &self.scheme,
                    identity,
                    saved,
                ))
            }
            Err(err) => AuthOutcome::Rejected(err),
        }
    }

    /// Judge the `Authorization` header of a request.
    ///
    /// A header that is not valid UTF-8 counts as missing.
    pub async fn authenticate_headers(&self, headers: &HeaderMap) -> AuthOutcome {
        let authorization = headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        self.authenticate(authorization).await
    }

    /// Trust the service URL of every activity. Call only after the request
    /// carrying them has been authenticated.
    ///
    /// Returns how many URLs were newly trusted.
    pub fn register_service_urls(&self, activities: &[Activity]) -> usize {
        activities
            .iter()
            .filter_map(Activity::service_url)
            .filter(|url| {
                let added = self.trust.trust(url);
                if added {
                    log::debug!("Trusting service URL {url}");
                }
                added
            })
            .count()
    }

    /// Authenticate a whole request: headers first, then, only on success,
    /// register the service URLs found in the body.
    pub async fn authenticate_request(&self, headers: &HeaderMap, body: &[u8]) -> AuthOutcome {
        let outcome = self.authenticate_headers(headers).await;
        if outcome.is_authenticated() {
            self.register_service_urls(&activities_from_json(body));
        }
        outcome
    }
}

/// Extract the bearer token from an `Authorization` header value.
///
/// Returns `None` unless the value starts with `"Bearer "` and has a
/// non-blank remainder.
pub fn extract_bearer_token(value: &str) -> Option<&str> {
    value
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
