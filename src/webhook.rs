//! Webhook surface — provider verification handshake, event intake, and a
//! health probe.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;

use crate::engine::FlowEngine;
use crate::inbound;

/// Shared webhook state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<FlowEngine>,
    pub verify_token: String,
}

/// Build the webhook router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", get(verify).post(receive))
        .route("/healthz", get(healthz))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Provider subscription handshake: echo the challenge when the mode and
/// token match.
async fn verify(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if params.get("hub.mode").map(String::as_str) != Some("subscribe") {
        return (StatusCode::BAD_REQUEST, "Invalid mode".to_string());
    }
    if params.get("hub.verify_token") != Some(&state.verify_token) {
        return (StatusCode::FORBIDDEN, "Verification token mismatch".to_string());
    }
    let challenge = params.get("hub.challenge").cloned().unwrap_or_default();
    (StatusCode::OK, challenge)
}

/// Receive a webhook delivery and apply its messages in arrival order.
/// Per-user ordering within one delivery follows from the sequential loop;
/// cross-delivery races are closed by the engine's version guard.
async fn receive(
    State(state): State<AppState>,
    axum::Json(body): axum::Json<Value>,
) -> impl IntoResponse {
    let events = inbound::extract_events(&body);
    if events.is_empty() {
        return axum::Json(json!({"status": "ignored"}));
    }
    for event in &events {
        if let Err(e) = state.engine.handle_event(event).await {
            tracing::error!(user_id = %event.user_id, error = %e, "Event handling failed");
        }
    }
    axum::Json(json!({"status": "processed"}))
}

async fn healthz() -> impl IntoResponse {
    axum::Json(json!({"status": "ok"}))
}
