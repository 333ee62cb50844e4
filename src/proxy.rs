//! Streaming token proxy.
//!
//! The provider's client credentials must never ship to the browser, so this
//! small service performs the client-credentials exchange and relays the
//! token payload. One endpoint, CORS open to the configured origins.

use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct ProxyState {
    http: reqwest::Client,
    accounts_url: String,
    client_id: String,
    client_secret: String,
}

pub fn router(config: &Config, client_id: &str, client_secret: &str) -> Router {
    let http = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("Failed to build HTTP client");

    let state = ProxyState {
        http,
        accounts_url: config
            .streaming_accounts_url
            .trim_end_matches('/')
            .to_string(),
        client_id: client_id.to_string(),
        client_secret: client_secret.to_string(),
    };

    let cors = if config.cors_allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors_allowed_origins {
            match origin.parse::<axum::http::HeaderValue>() {
                Ok(v) => origins.push(v),
                Err(e) => tracing::error!("Failed to parse CORS origin '{}': {}", origin, e),
            }
        }
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/spotify-token", get(spotify_token))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

async fn spotify_token(State(state): State<ProxyState>) -> impl IntoResponse {
    let token_url = format!("{}/api/token", state.accounts_url);
    let basic = BASE64.encode(format!("{}:{}", state.client_id, state.client_secret));

    let resp = state
        .http
        .post(&token_url)
        .header("Authorization", format!("Basic {}", basic))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await;

    let failed = |detail: String| {
        tracing::error!("Token exchange failed: {}", detail);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to get Spotify token" })),
        )
            .into_response()
    };

    match resp {
        Ok(resp) if resp.status().is_success() => match resp.json::<serde_json::Value>().await {
            Ok(body) => (StatusCode::OK, Json(body)).into_response(),
            Err(e) => failed(format!("unreadable response body: {}", e)),
        },
        Ok(resp) => failed(format!("accounts service returned status {}", resp.status())),
        Err(e) => failed(e.to_string()),
    }
}
