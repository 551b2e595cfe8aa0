mod handlers;
mod metrics;
mod routes;

use anyhow::Context;
use axum::Router;
use judge_gateway::{GatewayConfig, SubmissionClient};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub struct AppState {
    pub client: SubmissionClient,
}

fn app(state: Arc<AppState>) -> Router {
    Router::new().merge(routes::routes()).with_state(state)
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Gateway API booting...");

    let config = GatewayConfig::from_env().context("Invalid judge configuration")?;
    info!(
        judge_url = %config.base_url,
        timeout_ms = config.request_timeout.as_millis() as u64,
        api_key = config.api_key.is_some(),
        "Judge configured"
    );

    let client = SubmissionClient::from_config(&config).context("Failed to build judge client")?;
    let state = Arc::new(AppState { client });

    let addr = std::env::var("GATEWAY_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("HTTP server listening on {}", addr);
    info!("Ready to accept submissions");

    axum::serve(listener, app(state)).await.context("Server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use judge_gateway::transport::{BatchSubmitOutcome, JudgeTransport};
    use judge_gateway::types::WireSubmission;
    use judge_gateway::{CircuitBreaker, GatewayError, StatusId, SubmissionResponse};
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Judge that echoes the (still encoded) stdin back as stdout
    struct EchoJudge {
        healthy: bool,
    }

    #[async_trait]
    impl JudgeTransport for EchoJudge {
        async fn submit_wait(&self, submission: &WireSubmission) -> judge_gateway::Result<SubmissionResponse> {
            let mut response = SubmissionResponse::pending("t-1", StatusId::Accepted);
            response.stdout = submission.stdin.clone();
            Ok(response)
        }

        async fn submit_batch(&self, _submissions: &[WireSubmission]) -> BatchSubmitOutcome {
            BatchSubmitOutcome::Unsupported
        }

        async fn poll_batch(&self, _tokens: &[String]) -> judge_gateway::Result<Vec<SubmissionResponse>> {
            Err(GatewayError::Transport("not used".to_string()))
        }

        async fn system_info(&self, _timeout: Duration) -> judge_gateway::Result<()> {
            if self.healthy {
                Ok(())
            } else {
                Err(GatewayError::Transport("connection refused".to_string()))
            }
        }
    }

    fn test_state(healthy: bool) -> Arc<AppState> {
        let config = GatewayConfig::default();
        let breaker = Arc::new(CircuitBreaker::new(config.breaker));
        let client = SubmissionClient::new(Arc::new(EchoJudge { healthy }), breaker, &config);
        Arc::new(AppState { client })
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_execute_returns_decoded_output() {
        let response = app(test_state(true))
            .oneshot(post_json(
                "/execute",
                serde_json::json!({"source_code": "print(input())", "language_id": 71, "stdin": "hi"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["stdout"], "hi");
        assert_eq!(body["status"]["id"], 3);
    }

    #[tokio::test]
    async fn test_batch_falls_back_and_keeps_order() {
        let response = app(test_state(true))
            .oneshot(post_json(
                "/execute/batch",
                serde_json::json!({"submissions": [
                    {"source_code": "a", "language_id": 71, "stdin": "first"},
                    {"source_code": "b", "language_id": 71, "stdin": "second"}
                ]}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["submissions"][0]["stdout"], "first");
        assert_eq!(body["submissions"][1]["stdout"], "second");
    }

    #[tokio::test]
    async fn test_open_breaker_maps_to_503_with_retry_after() {
        let state = test_state(true);
        for _ in 0..5 {
            state.client.breaker().record_failure();
        }

        let response = app(state)
            .oneshot(post_json(
                "/execute",
                serde_json::json!({"source_code": "x", "language_id": 71}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let retry_after: u64 = response.headers()[header::RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!(retry_after > 0 && retry_after <= 30);

        let body = json_body(response).await;
        assert_eq!(body["kind"], "unavailable");
        assert_eq!(body["retryable"], true);
    }

    #[tokio::test]
    async fn test_health_reflects_judge() {
        let ok = app(test_state(true))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);

        let down = app(test_state(false))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(down.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_breaker_endpoint_reports_state() {
        let state = test_state(true);
        state.client.breaker().record_failure();

        let response = app(state)
            .oneshot(Request::get("/breaker").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = json_body(response).await;
        assert_eq!(body["state"], "closed");
        assert_eq!(body["consecutive_failures"], 1);
    }

    #[tokio::test]
    async fn test_metrics_endpoint_exposes_gauges() {
        let response = app(test_state(true))
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("gateway_breaker_open"));
    }
}
