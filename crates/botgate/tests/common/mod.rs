//! Common test utilities for botgate integration tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use futures::future::BoxFuture;

use botgate::ServerConfig;
use botgate_auth::{
    AuthError, BotAuthConfig, BotAuthenticator, Claim, TokenVerifier, VerificationRequest,
    VerifiedIdentity,
};

pub const APP_ID: &str = "app-123";
pub const VALID_TOKEN: &str = "valid-token";

/// Verifier that accepts [`VALID_TOKEN`] for [`APP_ID`] and nothing else.
pub struct StubVerifier;

impl TokenVerifier for StubVerifier {
    fn verify<'a>(
        &'a self,
        request: VerificationRequest<'a>,
    ) -> BoxFuture<'a, Result<VerifiedIdentity, AuthError>> {
        Box::pin(async move {
            match request.token {
                VALID_TOKEN => {
                    if !request.credentials.is_valid_app_id(APP_ID).await {
                        return Err(AuthError::InvalidAudience);
                    }
                    Ok(VerifiedIdentity {
                        issuer: "https://api.botframework.com".to_string(),
                        app_id: Some(APP_ID.to_string()),
                        claims: vec![Claim::new("aud", APP_ID)],
                    })
                }
                "expired-token" => Err(AuthError::Expired),
                _ => Err(AuthError::InvalidSignature("signature mismatch".to_string())),
            }
        })
    }
}

/// Test harness: a router plus the gate behind it.
pub struct TestApp {
    pub router: Router,
    pub authenticator: Arc<BotAuthenticator>,
}

impl TestApp {
    /// App with static credentials for [`APP_ID`].
    pub fn new() -> Self {
        Self::with_auth(BotAuthConfig {
            app_id: Some(APP_ID.to_string()),
            app_password: Some("secret".to_string()),
            ..Default::default()
        })
    }

    /// App with authentication switched off.
    pub fn disabled() -> Self {
        Self::with_auth(BotAuthConfig {
            disable_authentication: true,
            ..Default::default()
        })
    }

    pub fn with_auth(auth: BotAuthConfig) -> Self {
        let config = ServerConfig {
            auth,
            ..Default::default()
        };
        let authenticator = botgate::authenticator(&config, Arc::new(StubVerifier));
        let router = botgate::router(authenticator.clone(), config.body_limit);
        Self {
            router,
            authenticator,
        }
    }

    pub fn trusted_urls(&self) -> Vec<String> {
        self.authenticator.trust_registry().urls()
    }
}

/// Build a `POST /api/messages` request.
pub fn post_messages(authorization: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/messages")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
