//! End-to-end gate scenarios: which service URLs become trusted, and when.

use axum::http::StatusCode;
use tower::ServiceExt;

use crate::common::{TestApp, post_messages};

#[tokio::test]
async fn test_single_message_with_valid_token_trusts_service_url() {
    let app = TestApp::new();
    let body = r#"{"type":"message","serviceUrl":"https://chan.example/api","text":"hi"}"#;

    let response = app
        .router
        .clone()
        .oneshot(post_messages(Some("Bearer valid-token"), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.trusted_urls(), vec!["https://chan.example/api".to_string()]);
}

#[tokio::test]
async fn test_array_without_header_trusts_nothing() {
    let app = TestApp::new();
    let body = r#"[{"type":"message","serviceUrl":"https://a"},{"type":"message","serviceUrl":"https://b"}]"#;

    let response = app
        .router
        .clone()
        .oneshot(post_messages(None, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.trusted_urls().is_empty());
}

#[tokio::test]
async fn test_authenticated_array_trusts_every_url() {
    let app = TestApp::new();
    let body = r#"[{"type":"message","serviceUrl":"https://a"},{"type":"message","serviceUrl":"https://b"}]"#;

    let response = app
        .router
        .clone()
        .oneshot(post_messages(Some("Bearer valid-token"), body))
        .await
        .unwrap();

    // The handler takes a single activity, but the gate has already run
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        app.trusted_urls(),
        vec!["https://a".to_string(), "https://b".to_string()]
    );
}

#[tokio::test]
async fn test_forged_token_trusts_nothing() {
    let app = TestApp::new();
    let body = r#"{"type":"message","serviceUrl":"https://attacker.example"}"#;

    let response = app
        .router
        .clone()
        .oneshot(post_messages(Some("Bearer forged-token"), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(!app
        .authenticator
        .trust_registry()
        .is_trusted("https://attacker.example"));
}

#[tokio::test]
async fn test_repeated_service_url_is_one_entry() {
    let app = TestApp::new();
    let body = r#"{"type":"message","serviceUrl":"https://chan.example/api"}"#;

    for _ in 0..2 {
        let response = app
            .router
            .clone()
            .oneshot(post_messages(Some("Bearer valid-token"), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(app.authenticator.trust_registry().len(), 1);
}

#[tokio::test]
async fn test_concurrent_requests_share_registry() {
    let app = TestApp::new();
    let requests = (0..16).map(|i| {
        let router = app.router.clone();
        let body = format!(
            r#"{{"type":"message","serviceUrl":"https://chan{}.example"}}"#,
            i % 4
        );
        tokio::spawn(async move {
            router
                .oneshot(post_messages(Some("Bearer valid-token"), &body))
                .await
                .unwrap()
                .status()
        })
    });

    for handle in requests.collect::<Vec<_>>() {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }
    assert_eq!(app.trusted_urls().len(), 4);
}
