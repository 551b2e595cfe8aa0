//! Wire layer for the judge's HTTP API.
//!
//! Each endpoint is one trait method so the submission logic can be driven
//! by an in-memory judge in tests. Outcomes are typed: the batch endpoint
//! reports "not supported" as its own variant instead of an error to inspect.

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::types::{BatchStatusBody, BatchSubmitBody, SubmissionResponse, TokenEntry, WireSubmission};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

/// Result of `POST /submissions/batch`
#[derive(Debug, Clone, PartialEq)]
pub enum BatchSubmitOutcome {
    /// One token per submission, in submission order
    Accepted(Vec<String>),
    /// The judge has no batch endpoint (HTTP 404)
    Unsupported,
    Failed(GatewayError),
}

#[async_trait]
pub trait JudgeTransport: Send + Sync {
    /// `POST /submissions?base64_encoded=true&wait=true`
    async fn submit_wait(&self, submission: &WireSubmission) -> Result<SubmissionResponse>;

    /// `POST /submissions/batch?base64_encoded=true`
    async fn submit_batch(&self, submissions: &[WireSubmission]) -> BatchSubmitOutcome;

    /// `GET /submissions/batch?tokens=<csv>&base64_encoded=true`
    async fn poll_batch(&self, tokens: &[String]) -> Result<Vec<SubmissionResponse>>;

    /// `GET /system_info`, succeeding only on HTTP 200
    async fn system_info(&self, timeout: Duration) -> Result<()>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    base_url: String,
    api_key: Option<(String, String)>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.clone(),
            api_key: config
                .api_key
                .as_ref()
                .map(|key| (config.api_key_header.clone(), key.clone())),
            timeout: config.request_timeout,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str, timeout: Duration) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, self.url(path))
            .header("Accept", "application/json")
            .timeout(timeout);

        if let Some((header, key)) = &self.api_key {
            builder = builder.header(header.as_str(), key.as_str());
        }
        builder
    }
}

async fn upstream_error(response: reqwest::Response) -> GatewayError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    GatewayError::Upstream { status, body }
}

#[async_trait]
impl JudgeTransport for HttpTransport {
    async fn submit_wait(&self, submission: &WireSubmission) -> Result<SubmissionResponse> {
        let response = self
            .request(
                reqwest::Method::POST,
                "/submissions?base64_encoded=true&wait=true",
                self.timeout,
            )
            .json(submission)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        Ok(response.json::<SubmissionResponse>().await?)
    }

    async fn submit_batch(&self, submissions: &[WireSubmission]) -> BatchSubmitOutcome {
        let sent = self
            .request(
                reqwest::Method::POST,
                "/submissions/batch?base64_encoded=true",
                self.timeout,
            )
            .json(&BatchSubmitBody { submissions })
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => return BatchSubmitOutcome::Failed(e.into()),
        };

        if response.status() == StatusCode::NOT_FOUND {
            return BatchSubmitOutcome::Unsupported;
        }
        if !response.status().is_success() {
            return BatchSubmitOutcome::Failed(upstream_error(response).await);
        }

        let entries: Vec<TokenEntry> = match response.json().await {
            Ok(entries) => entries,
            Err(e) => return BatchSubmitOutcome::Failed(e.into()),
        };

        if entries.is_empty() {
            return BatchSubmitOutcome::Failed(GatewayError::InvalidResponse(
                "batch submit returned no tokens".to_string(),
            ));
        }

        let tokens: Option<Vec<String>> = entries.into_iter().map(|entry| entry.token).collect();
        match tokens {
            Some(tokens) => BatchSubmitOutcome::Accepted(tokens),
            None => BatchSubmitOutcome::Failed(GatewayError::InvalidResponse(
                "batch submit rejected one or more submissions".to_string(),
            )),
        }
    }

    async fn poll_batch(&self, tokens: &[String]) -> Result<Vec<SubmissionResponse>> {
        let path = format!("/submissions/batch?tokens={}&base64_encoded=true", tokens.join(","));
        let response = self
            .request(reqwest::Method::GET, &path, self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let body: BatchStatusBody = response.json().await?;
        Ok(body.submissions)
    }

    async fn system_info(&self, timeout: Duration) -> Result<()> {
        let response = self
            .request(reqwest::Method::GET, "/system_info", timeout)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(upstream_error(response).await);
        }
        Ok(())
    }
}
