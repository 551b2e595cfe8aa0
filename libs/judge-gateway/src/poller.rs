/// Batch Poller - resolve batch tokens to finished submissions
///
/// **Policy:**
/// - Wait `interval`, query every token at once, repeat up to `max_attempts`
/// - The batch is done only when every submission is finished
/// - When the budget runs out, one last query is made and its result is
///   returned as-is, unfinished submissions included
///
/// Exhausting the budget is not an error. Callers inspect the status of each
/// submission themselves.

use crate::error::{GatewayError, Result};
use crate::transport::JudgeTransport;
use crate::types::SubmissionResponse;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            interval: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    /// The completion predicate held after `attempts` polls
    Complete { value: T, attempts: u32 },
    /// Budget exhausted; `value` is the result of the final extra poll
    Exhausted { value: T },
}

impl<T> PollOutcome<T> {
    pub fn into_value(self) -> T {
        match self {
            PollOutcome::Complete { value, .. } | PollOutcome::Exhausted { value } => value,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, PollOutcome::Complete { .. })
    }
}

impl RetryPolicy {
    /// Worst-case time spent sleeping before giving up
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts
    }

    /// Run `op` until `is_complete` accepts its value or the budget runs out.
    ///
    /// Errors from `op` end the loop immediately. The wait between attempts
    /// is a tokio sleep, never a blocking one.
    pub async fn run<T, F, Fut, P>(&self, mut op: F, is_complete: P) -> Result<PollOutcome<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&T) -> bool,
    {
        for attempt in 1..=self.max_attempts {
            tokio::time::sleep(self.interval).await;

            let value = op().await?;
            if is_complete(&value) {
                return Ok(PollOutcome::Complete {
                    value,
                    attempts: attempt,
                });
            }
            debug!(attempt, max_attempts = self.max_attempts, "Batch not finished yet");
        }

        let value = op().await?;
        Ok(PollOutcome::Exhausted { value })
    }
}

pub struct BatchPoller {
    transport: Arc<dyn JudgeTransport>,
    policy: RetryPolicy,
}

impl BatchPoller {
    pub fn new(transport: Arc<dyn JudgeTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Poll until every token is finished or the budget is spent.
    /// Results are in token order.
    pub async fn poll(&self, tokens: &[String]) -> Result<Vec<SubmissionResponse>> {
        let outcome = self
            .policy
            .run(
                || self.transport.poll_batch(tokens),
                |responses: &Vec<SubmissionResponse>| {
                    responses.len() == tokens.len()
                        && responses.iter().all(SubmissionResponse::is_finished)
                },
            )
            .await?;

        match outcome {
            PollOutcome::Complete { value, .. } => align_to_tokens(tokens, value),
            PollOutcome::Exhausted { value } => {
                warn!(
                    tokens = tokens.len(),
                    max_attempts = self.policy.max_attempts,
                    "Poll budget exhausted, returning partial results"
                );
                if value.len() != tokens.len() {
                    // Best effort: hand back whatever the last poll saw
                    warn!(
                        tokens = tokens.len(),
                        returned = value.len(),
                        "Final batch status does not cover every token"
                    );
                    return Ok(value);
                }
                align_to_tokens(tokens, value)
            }
        }
    }
}

/// Place each response at the index of its token. Falls back to positional
/// order when the judge omits tokens.
fn align_to_tokens(
    tokens: &[String],
    responses: Vec<SubmissionResponse>,
) -> Result<Vec<SubmissionResponse>> {
    if responses.len() != tokens.len() {
        return Err(GatewayError::InvalidResponse(format!(
            "batch status returned {} submissions for {} tokens",
            responses.len(),
            tokens.len()
        )));
    }

    if responses.iter().any(|r| r.token.is_none()) {
        return Ok(responses);
    }

    let mut by_token: HashMap<String, SubmissionResponse> = responses
        .into_iter()
        .filter_map(|r| r.token.clone().map(|token| (token, r)))
        .collect();

    tokens
        .iter()
        .map(|token| {
            by_token.remove(token).ok_or_else(|| {
                GatewayError::InvalidResponse(format!("batch status is missing token {}", token))
            })
        })
        .collect()
}
