mod assets;
mod compress;
mod headers;
mod rate_limit;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::catalog::Catalog;
use crate::config::SkateConfig;
use crate::source::{load_catalog, DirSource};

pub use headers::CONTENT_SECURITY_POLICY;
pub use rate_limit::{RateDecision, RateLimiter};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SkateConfig>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: SkateConfig) -> Self {
        let limiter = RateLimiter::from_config(&config.server);
        Self { config: Arc::new(config), limiter: Arc::new(limiter) }
    }

    /// JSON is re-read per request so edits to the data files show up without a restart.
    async fn catalog(&self) -> Result<Catalog> {
        let source = DirSource::new(self.config.server.root.clone());
        Ok(load_catalog(&source, &self.config.endpoints).await?)
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/catalog", get(catalog_handler))
        .route("/api/search", get(search_handler))
        .fallback(assets::static_handler)
        .layer(from_fn_with_state(state.clone(), compress::compression_middleware))
        .layer(from_fn_with_state(state.clone(), rate_limit::rate_limit_middleware))
        .layer(from_fn(headers::security_headers_middleware))
        .with_state(state)
}

/// Bind, serve until SIGTERM/SIGINT, then drain.
pub async fn serve(config: SkateConfig) -> Result<()> {
    let bind = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind).await.with_context(|| format!("binding {bind}"))?;
    info!("SkateList server running on port {}", config.server.port);
    info!("Environment: {}", config.server.environment);
    info!(root = %config.server.root.display(), "serving web root");

    let app = build_router(AppState::new(config));
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .context("server failed")
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("SIGTERM received, shutting down gracefully"),
                    _ = sigint.recv() => info!("SIGINT received, shutting down gracefully"),
                }
                return;
            }
            (Err(e), _) | (_, Err(e)) => warn!("signal handlers unavailable, falling back to ctrl-c: {e}"),
        }
    }
    wait_for_ctrl_c(tokio::signal::ctrl_c()).await;
}

/// A failed handler install never resolves, so the server keeps running.
async fn wait_for_ctrl_c(signal: impl std::future::Future<Output = std::io::Result<()>>) {
    match signal.await {
        Ok(()) => info!("SIGINT received, shutting down gracefully"),
        Err(e) => {
            error!("ctrl-c handler unavailable, graceful shutdown disabled: {e}");
            std::future::pending::<()>().await;
        }
    }
}

pub(crate) fn internal_error(err: impl std::fmt::Display) -> Response {
    error!("Server error: {err}");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "Internal server error"}))).into_response()
}

async fn index_handler(State(state): State<AppState>) -> Response {
    assets::serve_index(&state.config.server.root, StatusCode::OK).await
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({"status": "OK", "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)}))
}

async fn catalog_handler(State(state): State<AppState>) -> Response {
    let catalog = match state.catalog().await {
        Ok(c) => c,
        Err(e) => return internal_error(e),
    };
    let nav = catalog.navigation();
    Json(json!({
        "categories": catalog.categorize(),
        "featured": catalog.featured(state.config.carousel_featured_count),
        "navigation": {
            "doneTitle": nav.done_title(),
            "todoTitle": nav.todo_title(),
            "done": nav.done,
            "todo": nav.todo,
        },
        "todo": catalog.todo_tricks(),
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    let catalog = match state.catalog().await {
        Ok(c) => c,
        Err(e) => return internal_error(e),
    };
    let categories = catalog.search(&params.q);
    Json(json!({
        "query": params.q.trim().to_lowercase(),
        "total": categories.len(),
        "categories": categories,
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn ctrl_c_failure_keeps_serving() {
        let failed = async { Err(std::io::Error::new(std::io::ErrorKind::Other, "no signal support")) };
        assert!(tokio::time::timeout(Duration::from_millis(50), wait_for_ctrl_c(failed)).await.is_err());
        assert!(tokio::time::timeout(Duration::from_millis(50), wait_for_ctrl_c(async { Ok(()) })).await.is_ok());
    }
}
