//! Router assembly and serving.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use botgate_auth::{BotAuthLayer, BotAuthenticator, TokenVerifier};

use crate::Result;
use crate::config::ServerConfig;
use crate::handlers;

/// Build the application router.
///
/// `/api/messages` sits behind the authentication gate; `/healthz` does not.
pub fn router(authenticator: Arc<BotAuthenticator>, body_limit: usize) -> Router {
    let gated = Router::new()
        .route("/api/messages", post(handlers::post_messages))
        .route_layer(BotAuthLayer::new(authenticator).with_body_limit(body_limit));

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .merge(gated)
        .layer(TraceLayer::new_for_http())
}

/// Create the gate described by `config`.
pub fn authenticator(
    config: &ServerConfig,
    verifier: Arc<dyn TokenVerifier>,
) -> Arc<BotAuthenticator> {
    let authenticator = BotAuthenticator::new(&config.auth, verifier);
    if !authenticator.credentials().is_configured() {
        tracing::warn!(
            "No app id/password configured and authentication is not disabled; every request will be rejected"
        );
    } else if config.auth.disable_authentication {
        tracing::warn!("Authentication is disabled; accepting all requests");
    }
    Arc::new(authenticator)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: ServerConfig, verifier: Arc<dyn TokenVerifier>) -> Result<()> {
    let app = router(authenticator(&config, verifier), config.body_limit);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
