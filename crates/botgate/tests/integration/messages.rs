//! Status-code behavior of the gated message endpoint.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;

use crate::common::{TestApp, body_string, post_messages};

const MESSAGE: &str = r#"{"type":"message","serviceUrl":"https://chan.example/api","text":"hi"}"#;

#[tokio::test]
async fn test_valid_token_is_accepted() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(post_messages(Some("Bearer valid-token"), MESSAGE))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_header_is_unauthorized() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(post_messages(None, MESSAGE))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
}

#[tokio::test]
async fn test_wrong_scheme_is_unauthorized() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(post_messages(Some("Basic dmFsaWQtdG9rZW4="), MESSAGE))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rejection_does_not_echo_detail() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(post_messages(Some("Bearer expired-token"), MESSAGE))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_string(response).await;
    assert!(!body.contains("expired"));
    assert!(body.contains("unauthorized"));
}

#[tokio::test]
async fn test_unconfigured_rejects_valid_token() {
    let app = TestApp::with_auth(Default::default());
    let response = app
        .router
        .clone()
        .oneshot(post_messages(Some("Bearer valid-token"), MESSAGE))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.trusted_urls().is_empty());
}

#[tokio::test]
async fn test_disabled_accepts_without_header() {
    let app = TestApp::disabled();
    let response = app
        .router
        .clone()
        .oneshot(post_messages(None, MESSAGE))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.trusted_urls(), vec!["https://chan.example/api".to_string()]);
}

#[tokio::test]
async fn test_malformed_json_after_authentication_is_bad_request() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(post_messages(Some("Bearer valid-token"), "{not json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.trusted_urls().is_empty());
}

#[tokio::test]
async fn test_malformed_json_without_token_is_unauthorized() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(post_messages(None, "{not json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_system_activity_is_accepted() {
    let app = TestApp::new();
    let body = r#"{"type":"conversationUpdate","serviceUrl":"https://chan.example/api"}"#;
    let response = app
        .router
        .clone()
        .oneshot(post_messages(Some("Bearer valid-token"), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_healthz_is_not_gated() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("ok"));
}
