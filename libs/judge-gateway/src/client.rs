/// Submission Client - the gateway's public contract
///
/// **Operations:**
/// - `submit_and_wait`: one synchronous execution, at most one attempt
/// - `submit_batch`: many executions in one call, polled collectively,
///   falling back to sequential `submit_and_wait` when the judge has no
///   batch endpoint
/// - `is_healthy`: cheap liveness check that ignores the circuit breaker
///
/// **Breaker accounting:**
/// - Every submission path asks the breaker first
/// - Transport, timeout and non-2xx failures are recorded, then returned unchanged
/// - A batch 404 is a missing capability, not an outage, and is never recorded
///
/// Results of `submit_batch` are always in request order.

use crate::breaker::{BreakerSnapshot, CircuitBreaker};
use crate::config::GatewayConfig;
use crate::decoder::{decode_response, encode_request};
use crate::error::Result;
use crate::poller::BatchPoller;
use crate::transport::{BatchSubmitOutcome, HttpTransport, JudgeTransport};
use crate::types::{SubmissionRequest, SubmissionResponse, WireSubmission};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub struct SubmissionClient {
    transport: Arc<dyn JudgeTransport>,
    breaker: Arc<CircuitBreaker>,
    poller: BatchPoller,
    health_timeout: Duration,
}

impl SubmissionClient {
    /// Client talking HTTP to the configured judge, with its own breaker
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config)?);
        let breaker = Arc::new(CircuitBreaker::new(config.breaker));
        Ok(Self::new(transport, breaker, config))
    }

    pub fn new(
        transport: Arc<dyn JudgeTransport>,
        breaker: Arc<CircuitBreaker>,
        config: &GatewayConfig,
    ) -> Self {
        Self {
            poller: BatchPoller::new(transport.clone(), config.poll),
            transport,
            breaker,
            health_timeout: config.health_timeout,
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn breaker_snapshot(&self) -> BreakerSnapshot {
        self.breaker.snapshot()
    }

    /// Submit one execution and wait for its result
    #[instrument(skip(self, request), fields(language_id = request.language_id))]
    pub async fn submit_and_wait(&self, request: &SubmissionRequest) -> Result<SubmissionResponse> {
        self.breaker.admit()?;
        self.submit_admitted(request).await
    }

    /// Run one submission whose breaker admission was already granted
    async fn submit_admitted(&self, request: &SubmissionRequest) -> Result<SubmissionResponse> {
        let wire = encode_request(request);
        match self.transport.submit_wait(&wire).await {
            Ok(response) => {
                self.breaker.record_success();
                debug!(token = ?response.token, status = %response.status.id, "Submission finished");
                Ok(decode_response(response))
            }
            Err(e) => {
                self.breaker.record_failure();
                warn!(error = %e, "Submission failed");
                Err(e)
            }
        }
    }

    /// Submit several executions; `result[i]` answers `requests[i]`
    #[instrument(skip(self, requests), fields(count = requests.len()))]
    pub async fn submit_batch(&self, requests: &[SubmissionRequest]) -> Result<Vec<SubmissionResponse>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        self.breaker.admit()?;

        let wires: Vec<WireSubmission> = requests.iter().map(encode_request).collect();
        let tokens = match self.transport.submit_batch(&wires).await {
            BatchSubmitOutcome::Accepted(tokens) => tokens,
            BatchSubmitOutcome::Unsupported => {
                warn!("Judge has no batch endpoint, submitting sequentially");
                return self.submit_sequential_admitted(requests).await;
            }
            BatchSubmitOutcome::Failed(e) => {
                self.breaker.record_failure();
                warn!(error = %e, "Batch submission failed");
                return Err(e);
            }
        };

        info!(tokens = tokens.len(), "Batch accepted, polling for results");

        match self.poller.poll(&tokens).await {
            Ok(responses) => {
                self.breaker.record_success();
                Ok(responses.into_iter().map(decode_response).collect())
            }
            Err(e) => {
                self.breaker.record_failure();
                warn!(error = %e, "Batch polling failed");
                Err(e)
            }
        }
    }

    /// One `submit_and_wait` per request, strictly in order, stopping at the
    /// first error
    pub async fn submit_sequential(&self, requests: &[SubmissionRequest]) -> Result<Vec<SubmissionResponse>> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.submit_and_wait(request).await?);
        }
        Ok(results)
    }

    /// Sequential fallback after a batch 404. The batch admission is spent on
    /// the first request, so a half-open trial slot is never consumed twice.
    async fn submit_sequential_admitted(&self, requests: &[SubmissionRequest]) -> Result<Vec<SubmissionResponse>> {
        let mut results = Vec::with_capacity(requests.len());
        for (idx, request) in requests.iter().enumerate() {
            let response = if idx == 0 {
                self.submit_admitted(request).await?
            } else {
                self.submit_and_wait(request).await?
            };
            results.push(response);
        }
        Ok(results)
    }

    /// Whether `/system_info` answers 200 within the health timeout
    pub async fn is_healthy(&self) -> bool {
        match self.transport.system_info(self.health_timeout).await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Judge health check failed");
                false
            }
        }
    }
}
