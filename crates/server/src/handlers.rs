//! Core HTTP route handlers: health, invocation listing, invoke.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use lambda_inspector_core::{InvocationRequest, InvocationView, InvocationsResponse, Invoker};
use serde::Deserialize;

use super::json_error;
use super::state::AppState;

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "invocations": state.store.len(),
        "executor": state.invoker.is_some(),
    });
    (StatusCode::OK, Json(response))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct InvocationsQuery {
    arn: Option<String>,
    formatted: Option<String>,
}

impl InvocationsQuery {
    fn arn(&self) -> Option<&str> {
        self.arn.as_deref().filter(|arn| !arn.is_empty())
    }

    fn formatted(&self) -> bool {
        matches!(self.formatted.as_deref(), Some("true") | Some("1"))
    }
}

/// GET /invocations?arn=<arn>&formatted=<true|1>
pub(crate) async fn handle_list_invocations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<InvocationsQuery>,
) -> impl IntoResponse {
    let formatted = query.formatted();
    let invocations = state
        .store
        .list(query.arn())
        .iter()
        .map(|record| InvocationView::from_record(record, formatted))
        .collect();

    (StatusCode::OK, Json(InvocationsResponse { invocations }))
}

/// POST /invoke
pub(crate) async fn handle_invoke(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InvocationRequest>,
) -> impl IntoResponse {
    let invoker = match &state.invoker {
        Some(invoker) => invoker.clone(),
        None => {
            return json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "no executor configured (set --executor-url)",
            )
            .into_response()
        }
    };

    match invoker.invoke(&request).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            tracing::warn!(request_id = %request.invoke_id, error = %e, "invoke failed");
            json_error(StatusCode::BAD_GATEWAY, &e.to_string()).into_response()
        }
    }
}
