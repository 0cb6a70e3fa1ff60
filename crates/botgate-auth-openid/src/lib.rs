//! OpenID token verification for botgate.
//!
//! Implements [`botgate_auth::TokenVerifier`] for bot channel tokens:
//! - Channel tokens (issuer `https://api.botframework.com`) checked against
//!   keys discovered from the configured OpenID metadata URL
//! - Emulator tokens (Azure AD issuers) checked against the emulator's
//!   metadata, unless emulator tokens are disabled
//! - Signing key caching per metadata URL with TTL-based refresh

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use futures::future::BoxFuture;
use futures::lock::Mutex;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;

use botgate_auth::{AuthError, Claim, TokenVerifier, VerificationRequest, VerifiedIdentity};

/// TTL for cached signing keys (24 hours).
const KEY_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Minimum gap between two key fetches for the same metadata URL.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Upper bound on each metadata / JWKS request.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Accepted clock skew when checking `exp` / `nbf`, in seconds.
const CLOCK_SKEW_LEEWAY_SECS: u64 = 300;

const ALLOWED_ALGORITHMS: [Algorithm; 3] = [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];

/// Issuer of tokens sent by channels.
pub const CHANNEL_ISSUER: &str = "https://api.botframework.com";

/// OpenID metadata for tokens minted by the local emulator.
pub const EMULATOR_OPENID_METADATA_URL: &str =
    "https://login.microsoftonline.com/botframework.com/v2.0/.well-known/openid-configuration";

/// Issuers of emulator tokens (v1 and v2 endpoints of the two emulator tenants).
pub const EMULATOR_ISSUERS: [&str; 4] = [
    "https://sts.windows.net/d6d49420-f39b-4df7-a1dc-d59a935871db/",
    "https://login.microsoftonline.com/d6d49420-f39b-4df7-a1dc-d59a935871db/v2.0",
    "https://sts.windows.net/f8cdef31-a31e-4b4a-93e4-5f571e91255a/",
    "https://login.microsoftonline.com/f8cdef31-a31e-4b4a-93e4-5f571e91255a/v2.0",
];

/// A single JSON Web Key from a JWKS endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key ID - matched against the JWT header's `kid`.
    pub kid: String,
    /// RSA modulus (base64url-encoded).
    pub n: String,
    /// RSA exponent (base64url-encoded).
    pub e: String,
}

/// The part of an OpenID configuration document we need.
#[derive(Debug, Deserialize)]
struct OpenIdMetadata {
    jwks_uri: String,
}

/// The JWKS response. Keys that are not RSA keys with a `kid` are dropped.
#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<serde_json::Value>,
}

/// Cached keys with fetch timestamp.
struct CachedKeys {
    keys: Vec<Jwk>,
    fetched_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenSource {
    Channel,
    Emulator,
}

#[derive(Debug, Deserialize)]
struct UnverifiedClaims {
    iss: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    fn values(&self) -> Vec<&str> {
        match self {
            Audience::One(aud) => vec![aud.as_str()],
            Audience::Many(auds) => auds.iter().map(String::as_str).collect(),
        }
    }
}

/// Claims read from a verified bot token.
#[derive(Debug, Deserialize)]
struct BotClaims {
    iss: String,
    aud: Option<Audience>,
    appid: Option<String>,
    azp: Option<String>,
    ver: Option<String>,
    serviceurl: Option<String>,
}

/// Token verifier backed by OpenID metadata, with signing key caching.
///
/// Key fetches are serialized and rate limited per metadata URL: a token
/// naming an unknown `kid` triggers at most one fetch per
/// [`with_min_refresh_interval`](Self::with_min_refresh_interval) window.
pub struct OpenIdTokenVerifier {
    cached: RwLock<HashMap<String, CachedKeys>>,
    // Last fetch attempt per metadata URL; held across the fetch itself.
    refresh_attempts: Mutex<HashMap<String, Instant>>,
    emulator_metadata_url: String,
    http_client: Option<reqwest::Client>,
    cache_ttl: Duration,
    min_refresh_interval: Duration,
}

impl OpenIdTokenVerifier {
    /// Create a verifier that discovers keys over HTTP.
    pub fn new() -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AuthError::MetadataFetch(e.to_string()))?;
        Ok(Self {
            cached: RwLock::new(HashMap::new()),
            refresh_attempts: Mutex::new(HashMap::new()),
            emulator_metadata_url: EMULATOR_OPENID_METADATA_URL.to_string(),
            http_client: Some(client),
            cache_ttl: KEY_CACHE_TTL,
            min_refresh_interval: MIN_REFRESH_INTERVAL,
        })
    }

    /// How long fetched keys are used before they are fetched again.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Minimum gap between key fetches for one metadata URL.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Override where emulator signing keys are discovered.
    pub fn with_emulator_metadata_url(mut self, url: impl Into<String>) -> Self {
        self.emulator_metadata_url = url.into();
        self
    }

    /// Create a verifier with pre-loaded keys for the default channel and
    /// emulator metadata URLs (for testing).
    #[cfg(test)]
    pub fn with_static_keys(keys: Vec<Jwk>) -> Self {
        let mut cached = HashMap::new();
        for url in [
            botgate_auth::DEFAULT_OPENID_METADATA_URL,
            EMULATOR_OPENID_METADATA_URL,
        ] {
            cached.insert(
                url.to_string(),
                CachedKeys {
                    keys: keys.clone(),
                    fetched_at: Instant::now(),
                },
            );
        }
        Self {
            cached: RwLock::new(cached),
            refresh_attempts: Mutex::new(HashMap::new()),
            emulator_metadata_url: EMULATOR_OPENID_METADATA_URL.to_string(),
            http_client: None,
            cache_ttl: KEY_CACHE_TTL,
            min_refresh_interval: MIN_REFRESH_INTERVAL,
        }
    }

    /// Verify a bot token.
    ///
    /// The unverified issuer only routes the token to the right key set;
    /// the issuer is checked again once the signature is verified.
    async fn verify_token(
        &self,
        request: VerificationRequest<'_>,
    ) -> Result<VerifiedIdentity, AuthError> {
        let issuer = peek_issuer(request.token)?;
        match classify_issuer(&issuer)? {
            TokenSource::Channel => self.verify_channel_token(request).await,
            TokenSource::Emulator if !request.allow_emulator_tokens => {
                Err(AuthError::EmulatorTokensDisabled)
            }
            TokenSource::Emulator => self.verify_emulator_token(request).await,
        }
    }

    /// Channel tokens: the audience is the bot's app id.
    async fn verify_channel_token(
        &self,
        request: VerificationRequest<'_>,
    ) -> Result<VerifiedIdentity, AuthError> {
        let claims = self
            .decode_with_metadata(request.token, request.openid_metadata_url, &[CHANNEL_ISSUER])
            .await?;

        let audiences = claims.aud.as_ref().map(Audience::values).unwrap_or_default();
        let mut app_id = None;
        for aud in audiences {
            if request.credentials.is_valid_app_id(aud).await {
                app_id = Some(aud.to_string());
                break;
            }
        }
        let app_id = app_id.ok_or(AuthError::InvalidAudience)?;

        Ok(identity_from_claims(claims, app_id))
    }

    /// Emulator tokens: the app id lives in `appid` (v1) or `azp` (v2).
    async fn verify_emulator_token(
        &self,
        request: VerificationRequest<'_>,
    ) -> Result<VerifiedIdentity, AuthError> {
        let claims = self
            .decode_with_metadata(request.token, &self.emulator_metadata_url, &EMULATOR_ISSUERS)
            .await?;

        let app_id = match claims.ver.as_deref().map(str::trim) {
            None | Some("") | Some("1.0") => claims.appid.clone(),
            Some("2.0") => claims.azp.clone(),
            Some(other) => {
                return Err(AuthError::InvalidFormat(format!(
                    "unknown token version '{other}'"
                )));
            }
        }
        .ok_or_else(|| AuthError::InvalidFormat("emulator token missing app id".to_string()))?;

        if !request.credentials.is_valid_app_id(&app_id).await {
            return Err(AuthError::InvalidAudience);
        }

        Ok(identity_from_claims(claims, app_id))
    }

    async fn decode_with_metadata(
        &self,
        token: &str,
        metadata_url: &str,
        issuers: &[&str],
    ) -> Result<BotClaims, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidFormat(e.to_string()))?;
        if !ALLOWED_ALGORITHMS.contains(&header.alg) {
            return Err(AuthError::InvalidFormat(format!(
                "unsupported signing algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidFormat("missing kid in JWT header".to_string()))?;

        let key = self.find_key(metadata_url, &kid).await?;
        let decoding_key = DecodingKey::from_rsa_components(&key.n, &key.e)
            .map_err(|e| AuthError::InvalidSignature(e.to_string()))?;

        let mut validation = Validation::new(header.alg);
        validation.algorithms = ALLOWED_ALGORITHMS.to_vec();
        validation.leeway = CLOCK_SKEW_LEEWAY_SECS;
        validation.validate_nbf = true;
        // Audience is checked against the credential provider instead
        validation.validate_aud = false;
        validation.set_issuer(issuers);

        decode::<BotClaims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(map_jwt_error)
    }

    /// Find a key by `kid`, fetching/refreshing the cache as needed.
    async fn find_key(&self, metadata_url: &str, kid: &str) -> Result<Jwk, AuthError> {
        if let Some(key) = self.lookup_cached(metadata_url, kid) {
            return Ok(key);
        }

        if self.http_client.is_none() {
            return Err(AuthError::NoMatchingKey(kid.to_string()));
        }

        // Concurrent misses queue here; whoever gets the lock after a
        // fetch finds the fresh keys in the cache.
        let mut attempts = self.refresh_attempts.lock().await;
        if let Some(key) = self.lookup_cached(metadata_url, kid) {
            return Ok(key);
        }
        let now = Instant::now();
        if let Some(last) = attempts.get(metadata_url)
            && now.duration_since(*last) < self.min_refresh_interval
        {
            log::debug!("Key refresh for {metadata_url} skipped; last attempt too recent");
            return Err(AuthError::NoMatchingKey(kid.to_string()));
        }
        attempts.insert(metadata_url.to_string(), now);

        self.refresh_keys(metadata_url).await?;
        drop(attempts);

        self.lookup_cached(metadata_url, kid)
            .ok_or_else(|| AuthError::NoMatchingKey(kid.to_string()))
    }

    fn lookup_cached(&self, metadata_url: &str, kid: &str) -> Option<Jwk> {
        let cache = self.cached.read().unwrap_or_else(PoisonError::into_inner);
        let cached = cache.get(metadata_url)?;

        if self.http_client.is_some() && cached.fetched_at.elapsed() > self.cache_ttl {
            return None;
        }

        cached.keys.iter().find(|k| k.kid == kid).cloned()
    }

    async fn refresh_keys(&self, metadata_url: &str) -> Result<(), AuthError> {
        let client = self.http_client.as_ref().ok_or_else(|| {
            AuthError::MetadataFetch("no HTTP client (static keys mode)".to_string())
        })?;

        let metadata: OpenIdMetadata = client
            .get(metadata_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AuthError::MetadataFetch(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::MetadataFetch(e.to_string()))?;

        let response: JwksResponse = client
            .get(&metadata.jwks_uri)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AuthError::MetadataFetch(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::MetadataFetch(e.to_string()))?;

        let keys: Vec<Jwk> = response
            .keys
            .into_iter()
            .filter(|key| key.get("kty").and_then(serde_json::Value::as_str) == Some("RSA"))
            .filter_map(|key| serde_json::from_value(key).ok())
            .collect();
        log::debug!(
            "Fetched {} signing keys from {}",
            keys.len(),
            metadata.jwks_uri
        );

        let mut cache = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        cache.insert(
            metadata_url.to_string(),
            CachedKeys {
                keys,
                fetched_at: Instant::now(),
            },
        );

        Ok(())
    }
}

impl TokenVerifier for OpenIdTokenVerifier {
    fn verify<'a>(
        &'a self,
        request: VerificationRequest<'a>,
    ) -> BoxFuture<'a, Result<VerifiedIdentity, AuthError>> {
        Box::pin(async move { self.verify_token(request).await })
    }
}

/// Read the issuer from a token without verifying it.
fn peek_issuer(token: &str) -> Result<String, AuthError> {
    let mut segments = token.split('.');
    let (Some(_), Some(payload), Some(_), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(AuthError::InvalidFormat("token is not a JWT".to_string()));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| AuthError::InvalidFormat(format!("payload is not base64url: {e}")))?;
    let claims: UnverifiedClaims = serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::InvalidFormat(format!("payload is not JSON: {e}")))?;

    claims
        .iss
        .ok_or_else(|| AuthError::InvalidFormat("token has no issuer".to_string()))
}

fn classify_issuer(issuer: &str) -> Result<TokenSource, AuthError> {
    if issuer == CHANNEL_ISSUER {
        Ok(TokenSource::Channel)
    } else if EMULATOR_ISSUERS.contains(&issuer) {
        Ok(TokenSource::Emulator)
    } else {
        Err(AuthError::InvalidIssuer(issuer.to_string()))
    }
}

fn map_jwt_error(e: jsonwebtoken::errors::Error) -> AuthError {
    match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::ImmatureSignature => AuthError::InvalidFormat("token not yet valid".to_string()),
        ErrorKind::InvalidIssuer => AuthError::InvalidIssuer("issuer not accepted".to_string()),
        ErrorKind::InvalidAlgorithm => {
            AuthError::InvalidFormat("unsupported signing algorithm".to_string())
        }
        ErrorKind::MissingRequiredClaim(claim) => {
            AuthError::InvalidFormat(format!("missing required claim '{claim}'"))
        }
        _ => AuthError::InvalidSignature(e.to_string()),
    }
}

fn identity_from_claims(claims: BotClaims, app_id: String) -> VerifiedIdentity {
    let mut out = vec![Claim::new("iss", &claims.iss)];
    if let Some(aud) = &claims.aud {
        out.extend(aud.values().into_iter().map(|v| Claim::new("aud", v)));
    }
    if let Some(appid) = claims.appid {
        out.push(Claim::new("appid", appid));
    }
    if let Some(azp) = claims.azp {
        out.push(Claim::new("azp", azp));
    }
    if let Some(ver) = claims.ver {
        out.push(Claim::new("ver", ver));
    }
    if let Some(serviceurl) = claims.serviceurl {
        out.push(Claim::new("serviceurl", serviceurl));
    }

    VerifiedIdentity {
        issuer: claims.iss,
        app_id: Some(app_id),
        claims: out,
    }
}
