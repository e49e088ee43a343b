use crate::audit::AuditLogger;
use crate::config::BridgeConfig;
use crate::providers::Provider;
use crate::proxy;
use crate::upstream::UpstreamClient;

use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared, read-only per-process state. The audit handle is the only part
/// with interior mutability.
#[derive(Clone)]
pub struct AppState {
    pub config: BridgeConfig,
    /// Classified once from `config.base_url`.
    pub provider: Provider,
    pub upstream: UpstreamClient,
    pub audit: AuditLogger,
}

impl AppState {
    pub fn new(config: BridgeConfig, client: reqwest::Client, audit: AuditLogger) -> Self {
        let provider = Provider::classify(&config.base_url);
        let upstream = UpstreamClient::new(client, &config.base_url, config.api_key.clone());
        Self {
            config,
            provider,
            upstream,
            audit,
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_home))
        .route("/health", get(handle_health))
        .route("/v1/messages", post(handle_messages))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_messages(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match proxy::proxy_messages(state, &body).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => {
            tracing::warn!(status = %e.status_code(), error = %e, "Request failed");
            e.into_response()
        }
    }
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "model": state.config.model,
    }))
}

async fn handle_home(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>openbridge</title><style>
body {{ font-family: Arial; max-width: 800px; margin: 40px auto; padding: 20px; }}
.status {{ background: #e3f2fd; padding: 20px; border-radius: 8px; }}
</style></head>
<body>
<h1>openbridge</h1>
<div class="status">
    <h2>Status: Running</h2>
    <p>Proxy listening on {host}:{port}</p>
    <p>Provider: {provider}</p>
    <p>Model: {model}</p>
</div>
</body>
</html>"#,
        host = escape_html(&state.config.host),
        port = state.config.port,
        provider = state.provider,
        model = escape_html(&state.config.model),
    ))
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
