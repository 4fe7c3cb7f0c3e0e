//! HTTP client for the sequencer's `/rpc` endpoint.
//!
//! `GET <base>/rpc` returns a state snapshot; `POST <base>/rpc` submits a
//! signed transaction. Snapshot reads are retried with backoff on transient
//! failures. Submissions are never retried: a transport failure leaves the
//! outcome unknown and the caller decides what to do.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::debug;

use crate::error::RpcError;
use crate::types::{SignedTransaction, StateSnapshot};

/// Retry configuration for snapshot reads.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of retries.
    pub max_retries: u32,
    /// Initial delay in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    /// Fail on the first error.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// Acknowledgement for an accepted submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// HTTP status returned by the sequencer (always 2xx).
    pub status: u16,
    /// Response body, verbatim. Sequencer revisions differ in what they send.
    pub body: String,
}

/// Low-level HTTP client for the sequencer.
pub struct RpcClient {
    url: String,
    client: reqwest::Client,
    retry_config: RetryConfig,
}

impl RpcClient {
    /// Create a client for the sequencer at `base_url`.
    ///
    /// The endpoint is `<base_url>/rpc`.
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self::with_retry_config(base_url, RetryConfig::default())
    }

    /// Create a client with custom retry configuration.
    pub fn with_retry_config(base_url: impl AsRef<str>, retry_config: RetryConfig) -> Self {
        Self {
            url: endpoint(base_url.as_ref()),
            client: reqwest::Client::new(),
            retry_config,
        }
    }

    /// The full `/rpc` endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the current state snapshot, retrying transient failures.
    pub async fn fetch_state(&self) -> Result<StateSnapshot, RpcError> {
        let total_attempts = self.retry_config.max_retries + 1;

        for attempt in 0..total_attempts {
            match self.try_fetch_state().await {
                Ok(snapshot) => return Ok(snapshot),
                Err(e) if e.is_retryable() && attempt < total_attempts - 1 => {
                    let delay = std::cmp::min(
                        self.retry_config.initial_delay_ms * 2u64.pow(attempt),
                        self.retry_config.max_delay_ms,
                    );
                    debug!(attempt, delay_ms = delay, error = %e, "retrying state fetch");
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(RpcError::Timeout(total_attempts))
    }

    async fn try_fetch_state(&self) -> Result<StateSnapshot, RpcError> {
        debug!(url = %self.url, "fetching state");
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(classify_status(status, body));
        }

        if body.trim().is_empty() {
            return Err(RpcError::InvalidResponse("empty state body".to_string()));
        }
        serde_json::from_str(&body).map_err(RpcError::Json)
    }

    /// Submit a signed transaction. Never retried.
    pub async fn submit(&self, tx: &SignedTransaction) -> Result<Receipt, RpcError> {
        debug!(
            url = %self.url,
            from = %tx.pub_key,
            kind = %tx.tx.data.kind(),
            nonce = tx.tx.nonce,
            "submitting transaction"
        );

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(tx)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(classify_status(status, body));
        }

        Ok(Receipt {
            status: status.as_u16(),
            body,
        })
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("url", &self.url)
            .field("retry_config", &self.retry_config)
            .finish()
    }
}

fn endpoint(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/rpc") {
        base.to_string()
    } else {
        format!("{base}/rpc")
    }
}

/// Map a non-2xx response to an error.
fn classify_status(status: StatusCode, body: String) -> RpcError {
    match status.as_u16() {
        400 => RpcError::Malformed(body),
        409 => RpcError::Conflict(body),
        503 => RpcError::Unavailable(body),
        code => RpcError::network(
            format!("HTTP {}: {}", status, body),
            Some(code),
            is_retryable_status(code),
        ),
    }
}

/// Check if an HTTP status code is retryable.
fn is_retryable_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..600).contains(&status)
}
