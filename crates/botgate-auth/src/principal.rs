//! Authenticated caller identity and extraction helpers.

use std::fmt;

/// Claim kind used for role claims.
pub const ROLE_CLAIM: &str = "role";

/// Role value marking the caller as the external channel / bot principal.
pub const BOT_ROLE: &str = "Bot";

/// A single `(kind, value)` claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Claim {
    pub kind: String,
    pub value: String,
}

impl Claim {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// A role claim with the given value.
    pub fn role(value: impl Into<String>) -> Self {
        Self::new(ROLE_CLAIM, value)
    }
}

/// What a [`TokenVerifier`](crate::TokenVerifier) hands back for a token it
/// accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// The token's issuer.
    pub issuer: String,
    /// The bot app id the token was issued for, if the verifier knows it.
    pub app_id: Option<String>,
    /// Claims taken from the token.
    pub claims: Vec<Claim>,
}

/// The authenticated caller, as seen by downstream handlers.
///
/// Stored in HTTP request extensions by [`BotAuthService`](crate::BotAuthService).
/// Always carries a `role=Bot` claim.
#[derive(Clone, PartialEq, Eq)]
pub struct BotPrincipal {
    /// Scheme the principal was authenticated under (e.g. `"Bearer"`).
    pub authentication_type: String,
    /// App id the token was issued for. `None` when authentication is disabled.
    pub app_id: Option<String>,
    /// Verifier claims merged with the bot role claim.
    pub claims: Vec<Claim>,
    token: Option<String>,
}

impl BotPrincipal {
    /// The synthetic principal used when authentication is disabled.
    pub fn unauthenticated_bot(authentication_type: impl Into<String>) -> Self {
        Self {
            authentication_type: authentication_type.into(),
            app_id: None,
            claims: vec![Claim::role(BOT_ROLE)],
            token: None,
        }
    }

    /// Build a principal from a verified identity, adding the bot role claim.
    ///
    /// `token` is retained only when the caller asked to save it.
    pub fn from_verified(
        authentication_type: impl Into<String>,
        identity: VerifiedIdentity,
        token: Option<String>,
    ) -> Self {
        let mut claims = identity.claims;
        let bot_role = Claim::role(BOT_ROLE);
        if !claims.contains(&bot_role) {
            claims.push(bot_role);
        }
        Self {
            authentication_type: authentication_type.into(),
            app_id: identity.app_id,
            claims,
            token,
        }
    }

    /// Whether the principal carries the given role.
    pub fn has_role(&self, role: &str) -> bool {
        self.claims
            .iter()
            .any(|c| c.kind == ROLE_CLAIM && c.value == role)
    }

    pub fn is_bot(&self) -> bool {
        self.has_role(BOT_ROLE)
    }

    /// First claim value of the given kind.
    pub fn claim(&self, kind: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.kind == kind)
            .map(|c| c.value.as_str())
    }

    /// The raw bearer token, if it was saved alongside the principal.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl fmt::Debug for BotPrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotPrincipal")
            .field("authentication_type", &self.authentication_type)
            .field("app_id", &self.app_id)
            .field("claims", &self.claims)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Extract the `BotPrincipal` from HTTP request `Parts`, if present.
pub fn principal_from_parts(parts: &http::request::Parts) -> Option<&BotPrincipal> {
    parts.extensions.get::<BotPrincipal>()
}

/// Extract the caller's app id from HTTP request `Parts`.
///
/// Returns `"anonymous"` if no app id is known (authentication disabled).
pub fn app_id_from_parts(parts: &http::request::Parts) -> &str {
    parts
        .extensions
        .get::<BotPrincipal>()
        .and_then(|p| p.app_id.as_deref())
        .unwrap_or("anonymous")
}
