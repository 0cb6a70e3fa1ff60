//! Request handlers.
//!
//! Handlers behind the gate can rely on a [`BotPrincipal`] being present
//! in the request extensions.

use axum::Json;
use axum::extract::Extension;
use axum::http::StatusCode;
use serde_json::{Value, json};

use botgate_auth::{Activity, BotPrincipal};

/// `POST /api/messages` - receive one activity.
///
/// Message activities are acknowledged; everything else goes to
/// [`handle_system_activity`].
pub async fn post_messages(
    Extension(principal): Extension<BotPrincipal>,
    Json(activity): Json<Activity>,
) -> StatusCode {
    if activity.is_message() {
        let text = activity.text.as_deref().unwrap_or_default();
        tracing::info!(
            app_id = principal.app_id.as_deref().unwrap_or("anonymous"),
            channel = activity.channel_id.as_deref().unwrap_or("unknown"),
            chars = text.chars().count(),
            "Received message activity"
        );
    } else {
        handle_system_activity(&activity);
    }

    StatusCode::OK
}

/// Handle a non-message activity.
pub fn handle_system_activity(activity: &Activity) {
    tracing::debug!(
        kind = %activity.kind,
        channel = activity.channel_id.as_deref().unwrap_or("unknown"),
        "Received system activity"
    );
}

/// `GET /healthz` - liveness probe, outside the gate.
pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
