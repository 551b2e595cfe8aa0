// HTTP route handlers for the gateway API

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use judge_gateway::{GatewayError, SubmissionRequest, SubmissionResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::metrics;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub submissions: Vec<SubmissionRequest>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub submissions: Vec<SubmissionResponse>,
}

/// Gateway failure mapped onto a "try again later" HTTP answer
pub struct ApiError(GatewayError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = match &err {
            GatewayError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Transport(_)
            | GatewayError::Upstream { .. }
            | GatewayError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(serde_json::json!({
            "error": err.to_string(),
            "kind": err.kind(),
            "retryable": err.is_retryable(),
        }));
        let mut response = (status, body).into_response();

        if let GatewayError::Unavailable { retry_after } = err {
            // Round up so clients never retry before the cooldown ends
            let secs = retry_after.as_millis().div_ceil(1000).max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

fn failed(state: &AppState, request_id: Uuid, err: GatewayError) -> ApiError {
    metrics::SUBMISSION_ERRORS_TOTAL
        .with_label_values(&[err.kind()])
        .inc();
    metrics::observe_breaker(&state.client.breaker_snapshot());

    if err.is_unavailable() {
        warn!(request_id = %request_id, error = %err, "Judge unavailable, rejecting submission");
    } else {
        error!(request_id = %request_id, error = %err, "Judge call failed");
    }
    ApiError(err)
}

/// POST /execute - Run one submission and wait for the result
pub async fn execute(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubmissionRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    metrics::SUBMISSIONS_TOTAL.with_label_values(&["execute"]).inc();

    let response = state
        .client
        .submit_and_wait(&payload)
        .await
        .map_err(|e| failed(&state, request_id, e))?;

    metrics::observe_breaker(&state.client.breaker_snapshot());
    info!(
        request_id = %request_id,
        language_id = payload.language_id,
        status = %response.status.id,
        "Submission executed"
    );

    Ok(Json(response))
}

/// POST /execute/batch - Run several submissions, results in request order
pub async fn execute_batch(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    metrics::SUBMISSIONS_TOTAL.with_label_values(&["execute_batch"]).inc();

    let submissions = state
        .client
        .submit_batch(&payload.submissions)
        .await
        .map_err(|e| failed(&state, request_id, e))?;

    metrics::observe_breaker(&state.client.breaker_snapshot());
    let unfinished = submissions.iter().filter(|s| !s.is_finished()).count();
    info!(
        request_id = %request_id,
        count = submissions.len(),
        unfinished,
        "Batch executed"
    );

    Ok(Json(BatchResponse { submissions }))
}

/// GET /health - Reachability of the judge
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.client.is_healthy().await {
        (StatusCode::OK, Json(serde_json::json!({ "judge": "healthy" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "judge": "unhealthy" })),
        )
    }
}

/// GET /breaker - Current circuit breaker state
pub async fn breaker_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.client.breaker_snapshot();
    metrics::observe_breaker(&snapshot);
    Json(snapshot)
}

/// GET /metrics - Prometheus exposition
pub async fn metrics_export(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    metrics::observe_breaker(&state.client.breaker_snapshot());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(),
    )
}
