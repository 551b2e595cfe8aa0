// Prometheus metrics for the gateway API

use judge_gateway::{BreakerSnapshot, BreakerState};
use lazy_static::lazy_static;
use prometheus::{
    register_int_counter_vec, register_int_gauge, Encoder, IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    pub static ref SUBMISSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "gateway_submissions_total",
        "Submissions received, by endpoint",
        &["path"]
    )
    .expect("metric can be registered");
    pub static ref SUBMISSION_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "gateway_submission_errors_total",
        "Failed submissions, by error kind",
        &["kind"]
    )
    .expect("metric can be registered");
    pub static ref BREAKER_OPEN: IntGauge = register_int_gauge!(
        "gateway_breaker_open",
        "1 while the judge circuit breaker rejects calls"
    )
    .expect("metric can be registered");
    pub static ref BREAKER_FAILURES: IntGauge = register_int_gauge!(
        "gateway_breaker_consecutive_failures",
        "Consecutive judge failures counted by the circuit breaker"
    )
    .expect("metric can be registered");
}

pub fn observe_breaker(snapshot: &BreakerSnapshot) {
    BREAKER_OPEN.set(i64::from(snapshot.state == BreakerState::Open));
    BREAKER_FAILURES.set(i64::from(snapshot.consecutive_failures));
}

pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}
