use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/execute", post(handlers::execute))
        .route("/execute/batch", post(handlers::execute_batch))
        .route("/health", get(handlers::health_check))
        .route("/breaker", get(handlers::breaker_status))
        .route("/metrics", get(handlers::metrics_export))
}
