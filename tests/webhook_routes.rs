//! Webhook route tests — verification handshake and event intake.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use loan_assist::decision::LocalPolicy;
use loan_assist::engine::{EngineConfig, FlowEngine};
use loan_assist::messaging::WhatsAppClient;
use loan_assist::stores::{
    MemoryAuditStore, MemoryLoanStore, MemoryProfileStore, ProfileStore,
};
use loan_assist::webhook::{AppState, router};

fn state() -> (AppState, Arc<MemoryProfileStore>) {
    let profiles = Arc::new(MemoryProfileStore::new());
    let engine = Arc::new(FlowEngine::new(
        profiles.clone(),
        Arc::new(MemoryLoanStore::new()),
        Arc::new(MemoryAuditStore::new()),
        // Unconfigured client: outbound messages are dry-run logged.
        Arc::new(WhatsAppClient::new(None, None)),
        Arc::new(LocalPolicy::default()),
        None,
        EngineConfig::default(),
    ));
    (
        AppState {
            engine,
            verify_token: "test-verify-token".to_string(),
        },
        profiles,
    )
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn handshake_echoes_the_challenge() {
    let (state, _) = state();
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/webhook?hub.mode=subscribe&hub.verify_token=test-verify-token&hub.challenge=4242")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "4242");
}

#[tokio::test]
async fn handshake_rejects_a_bad_token() {
    let (state, _) = state();
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/webhook?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=4242")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn receive_applies_messages_and_persists_the_session() {
    let (state, profiles) = state();
    let app = router(state);

    let delivery = json!({
        "entry": [{
            "changes": [{
                "value": {
                    "messages": [
                        {"from": "919000000001", "id": "wamid.1", "text": {"body": "1"}}
                    ]
                }
            }]
        }]
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook")
                .header("content-type", "application/json")
                .body(Body::from(delivery.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("processed"));

    let profile = profiles.get("919000000001").await.unwrap().unwrap();
    assert_eq!(
        profile.session.language,
        Some(loan_assist::lang::Language::En)
    );
}

#[tokio::test]
async fn empty_delivery_is_ignored() {
    let (state, _) = state();
    let app = router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("ignored"));
}
