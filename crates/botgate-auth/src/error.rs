//! Rejection reasons produced by the authentication gate.
//!
//! None of these variants ever carries the raw bearer token, so an
//! `AuthError` is always safe to log.

/// Errors that can occur during authentication.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Neither an app id/password pair nor a credential provider was
    /// configured, so no request can ever be authenticated.
    #[error("no credentials configured for this bot")]
    NotConfigured,

    /// No Authorization header or bearer token present.
    #[error("missing authentication token")]
    MissingToken,

    /// Token format is invalid (not a valid JWT).
    #[error("invalid token format: {0}")]
    InvalidFormat(String),

    /// JWT signature verification failed.
    #[error("invalid token signature: {0}")]
    InvalidSignature(String),

    /// Token has expired.
    #[error("token has expired")]
    Expired,

    /// Token was not issued for an app id known to the credential provider.
    #[error("invalid audience")]
    InvalidAudience,

    /// Token issuer is not one the verifier trusts.
    #[error("invalid issuer: {0}")]
    InvalidIssuer(String),

    /// Token came from the emulator but emulator tokens are disabled.
    #[error("emulator tokens are disabled")]
    EmulatorTokensDisabled,

    /// Failed to fetch OpenID metadata or signing keys.
    #[error("failed to fetch signing metadata: {0}")]
    MetadataFetch(String),

    /// No key in the JWKS matches the token's kid.
    #[error("no matching key for kid '{0}'")]
    NoMatchingKey(String),
}

impl AuthError {
    /// Whether the caller is at fault (vs. server-side configuration or
    /// metadata trouble). Both still reject with a 401.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AuthError::NotConfigured | AuthError::MetadataFetch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display() {
        let e = AuthError::MissingToken;
        assert_eq!(e.to_string(), "missing authentication token");
    }

    #[test]
    fn test_auth_error_no_matching_key_display() {
        let e = AuthError::NoMatchingKey("kid-1".to_string());
        assert_eq!(e.to_string(), "no matching key for kid 'kid-1'");
    }

    #[test]
    fn test_is_client_error() {
        assert!(AuthError::MissingToken.is_client_error());
        assert!(AuthError::Expired.is_client_error());
        assert!(AuthError::EmulatorTokensDisabled.is_client_error());
        assert!(!AuthError::NotConfigured.is_client_error());
        // A metadata outage is our problem, not the caller's
        assert!(!AuthError::MetadataFetch("timeout".into()).is_client_error());
    }
}
