//! HTTP front for embed URLs.
//!
//! `GET /embed` with a Cognito `Authorization` header answers with a 302 to
//! a freshly generated QuickSight embed URL. `GET /health` is for load
//! balancer checks.

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use super::token::claims_from_bearer;
use super::EmbedService;

pub fn router(service: Arc<EmbedService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    Router::new()
        .route("/embed", get(handle_embed))
        .route("/health", get(handle_health))
        .with_state(service)
        .layer(cors)
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn handle_embed(State(service): State<Arc<EmbedService>>, headers: HeaderMap) -> Response {
    let Some(authorization) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    else {
        return (StatusCode::UNAUTHORIZED, "missing Authorization header").into_response();
    };

    let claims = match claims_from_bearer(authorization) {
        Ok(claims) => claims,
        Err(e) => {
            qs_warn!("Rejected embed request: {:#}", e);
            return (StatusCode::UNAUTHORIZED, "invalid token").into_response();
        }
    };

    match service.embed_url_for(&claims).await {
        Ok(url) => (StatusCode::FOUND, [(header::LOCATION, url)]).into_response(),
        Err(e) => {
            qs_error!("Embed URL for {} failed: {:#}", claims.email, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "could not generate embed URL",
            )
                .into_response()
        }
    }
}

/// Serve until Ctrl-C.
pub async fn serve(service: Arc<EmbedService>, bind_addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    qs_info!("Embed proxy listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                qs_warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
        .context("Embed proxy failed")?;
    qs_info!("Embed proxy stopped");
    Ok(())
}
