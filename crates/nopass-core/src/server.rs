//! HTTP surface: `POST /v1/chat` and `GET /healthz`.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::error::{error_response, GatewayError};
use crate::gateway::Gateway;
use crate::types::ChatRequest;
use crate::Result;

/// Build the router.
///
/// The body limit is derived from the gateway's request limits, so any
/// request within those limits reaches validation.
pub fn router(gateway: Arc<Gateway>) -> Router {
    let body_limit = gateway.limits().max_body_bytes();
    Router::new()
        .route("/v1/chat", post(chat))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}

/// Bind and serve until ctrl-c.
pub async fn serve(config: &ServerConfig, gateway: Arc<Gateway>) -> Result<()> {
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| GatewayError::Config(format!("Failed to bind {}: {}", addr, e)))?;
    info!("NoPass gateway listening on {}", addr);

    axum::serve(listener, router(gateway))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| GatewayError::Config(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

async fn chat(
    State(gateway): State<Arc<Gateway>>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            debug!(error = %rejection, "Rejected request body");
            return error_response(StatusCode::BAD_REQUEST);
        }
    };

    match gateway.handle(request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
