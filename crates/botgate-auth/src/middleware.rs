//! Tower binding of the authentication gate.
//!
//! `BotAuthLayer` and `BotAuthService` wrap any inner service with the
//! gate. The inner service is never called for a rejected request.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::IntoResponse;
use http::{Request, StatusCode};
use http_body_util::LengthLimitError;
use tower::{Layer, Service};

use crate::activity::activities_from_json;
use crate::gate::{AuthOutcome, BotAuthenticator};

/// Largest request body buffered for activity extraction (256 KiB).
pub const DEFAULT_BODY_LIMIT: usize = 256 * 1024;

/// Tower `Layer` that wraps services with the bot authentication gate.
#[derive(Clone)]
pub struct BotAuthLayer {
    authenticator: Arc<BotAuthenticator>,
    body_limit: usize,
}

impl BotAuthLayer {
    /// Create a new auth layer around the given gate.
    pub fn new(authenticator: Arc<BotAuthenticator>) -> Self {
        Self {
            authenticator,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Cap on buffered body size; larger bodies get a 413.
    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }
}

impl<S> Layer<S> for BotAuthLayer {
    type Service = BotAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BotAuthService {
            inner,
            authenticator: self.authenticator.clone(),
            body_limit: self.body_limit,
        }
    }
}

/// Tower `Service` that runs the gate before forwarding requests.
///
/// On success, inserts [`BotPrincipal`](crate::BotPrincipal) into request
/// extensions where it's available to downstream handlers, and trusts the
/// service URLs found in the body. The body is forwarded byte-for-byte.
#[derive(Clone)]
pub struct BotAuthService<S> {
    inner: S,
    authenticator: Arc<BotAuthenticator>,
    body_limit: usize,
}

impl<S> Service<Request<Body>> for BotAuthService<S>
where
    S: Service<Request<Body>, Error = Infallible> + Clone + Send + 'static,
    S::Response: IntoResponse,
    S::Future: Send,
{
    type Response = axum::response::Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let authenticator = self.authenticator.clone();
        let body_limit = self.body_limit;

        Box::pin(async move {
            // Header first: rejected callers never get their body read
            let principal = match authenticator.authenticate_headers(req.headers()).await {
                AuthOutcome::Authenticated(principal) => principal,
                AuthOutcome::Rejected(_) => return Ok(unauthorized_response()),
            };

            let (mut parts, body) = req.into_parts();
            let bytes = match axum::body::to_bytes(body, body_limit).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    let too_large = err.into_inner().downcast_ref::<LengthLimitError>().is_some();
                    if too_large {
                        log::warn!("Request body exceeds {body_limit} bytes");
                        return Ok(error_response(
                            StatusCode::PAYLOAD_TOO_LARGE,
                            "request body too large",
                        ));
                    }
                    log::warn!("Failed to read request body");
                    return Ok(error_response(StatusCode::BAD_REQUEST, "unreadable request body"));
                }
            };

            authenticator.register_service_urls(&activities_from_json(&bytes));
            parts.extensions.insert(principal);

            let resp = inner
                .call(Request::from_parts(parts, Body::from(bytes)))
                .await
                .unwrap_or_else(|infallible| match infallible {});
            Ok(resp.into_response())
        })
    }
}

/// Build a 401 Unauthorized response with a WWW-Authenticate header.
///
/// The body is fixed: no token or claim detail is echoed to the caller.
fn unauthorized_response() -> axum::response::Response {
    let mut response = error_response(StatusCode::UNAUTHORIZED, "unauthorized");
    response.headers_mut().insert(
        http::header::WWW_AUTHENTICATE,
        http::HeaderValue::from_static("Bearer"),
    );
    response
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    let body = serde_json::json!({
        "error": {
            "category": "authentication",
            "message": message,
        }
    });

    (
        status,
        [(http::header::CONTENT_TYPE, "application/json")],
        serde_json::to_string(&body).unwrap_or_default(),
    )
        .into_response()
}
