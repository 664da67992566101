//! lambda-inspector-server: HTTP query API and WebSocket proxy for the
//! Lambda invocation inspector.
//!
//! Every route lives under a configurable mount point
//! (`/_extension/lambda-inspector` by default):
//!
//! - GET  {mount}/health                - Server status and record count
//! - GET  {mount}/invocations           - Recorded invocations (`?arn=`, `?formatted=true`)
//! - POST {mount}/invoke                - Run an invocation through the configured executor
//! - GET  {mount}/ws/{*path}            - WebSocket proxy to `{ws_forward}{path}`
//!
//! All non-WebSocket responses use Content-Type: application/json.

pub mod config;
pub mod executor;
mod handlers;
mod middleware;
pub mod state;
mod ws;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Json, Router};
use lambda_inspector_storage::InMemoryInvocationLog;
use tower_http::cors::{Any, CorsLayer};

use self::handlers::{handle_health, handle_invoke, handle_list_invocations, handle_not_found};
use self::middleware::trace_requests;
use self::ws::{handle_ws_proxy, handle_ws_proxy_root};

pub use config::{ConfigError, ConfigOverrides, ServerConfig};
pub use executor::{ExecutorError, HttpExecutor};
pub use state::{AppState, SharedInvoker};

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Build the application router with every route under `mount`.
///
/// `mount` must be normalized the way [`ServerConfig`] does it: either `/`
/// or a `/`-prefixed path without a trailing slash.
pub fn router(state: Arc<AppState>, mount: &str) -> Router {
    let api = Router::new()
        .route("/health", get(handle_health))
        .route("/invocations", get(handle_list_invocations))
        .route("/invoke", post(handle_invoke))
        .route("/ws", get(handle_ws_proxy_root))
        .route("/ws/", get(handle_ws_proxy_root))
        .route("/ws/{*path}", get(handle_ws_proxy));

    let routes = if mount == "/" {
        Router::new().merge(api)
    } else {
        Router::new().nest(mount, api)
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    routes
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn(trace_requests))
        .layer(cors)
        .with_state(state)
}

/// Build the state described by `config`: an in-memory invocation log
/// (capped when `max_invocations` is set) and, if configured, the HTTP
/// executor behind `POST /invoke`.
pub fn build_state(config: &ServerConfig) -> Result<AppState, Box<dyn std::error::Error>> {
    let store = match config.max_invocations {
        Some(cap) => InMemoryInvocationLog::with_capacity_cap(cap),
        None => InMemoryInvocationLog::new(),
    };
    let mut state = AppState::new(Arc::new(store), config.ws_forward.clone());
    if let Some(url) = &config.executor_url {
        let executor = HttpExecutor::new(url)?;
        tracing::info!(url = %executor.invoke_url(), "forwarding invocations to executor");
        state = state.with_executor(executor);
    }
    Ok(state)
}

/// Start the server and run until Ctrl+C.
pub async fn start_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(build_state(&config)?);
    let app = router(state, &config.mount);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        mount = %config.mount,
        ws_forward = %config.ws_forward,
        "lambda inspector listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl+C, shutting down");
        return;
    }
    tracing::info!("received shutdown signal");
}
