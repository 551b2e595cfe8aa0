//! Reliable client for a Judge0-compatible code execution service.
//!
//! [`SubmissionClient`] is the single entry point. It guards every call with a
//! shared [`CircuitBreaker`], polls batch submissions with a bounded
//! [`RetryPolicy`], and decodes base64 output before returning it.

pub mod breaker;
pub mod client;
pub mod config;
pub mod decoder;
pub mod error;
pub mod poller;
pub mod transport;
pub mod types;

pub use breaker::{BreakerConfig, BreakerSnapshot, BreakerState, CircuitBreaker};
pub use client::SubmissionClient;
pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use poller::{BatchPoller, PollOutcome, RetryPolicy};
pub use transport::{BatchSubmitOutcome, HttpTransport, JudgeTransport};
pub use types::{Status, StatusId, SubmissionRequest, SubmissionResponse};
