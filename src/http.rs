// Outbound HTTP with a fixed retry policy. Requests are blocking; callers run
// them on worker threads.

use std::thread;
use std::time::Duration;

use log::{debug, warn};
use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::StatusCode;
use serde::Serialize;

use crate::error::{Error, Result};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each following one.
    pub backoff_factor: Duration,
    pub max_backoff: Duration,
    pub retry_statuses: Vec<StatusCode>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: Duration::from_millis(500),
            max_backoff: Duration::from_secs(120),
            retry_statuses: vec![
                StatusCode::INTERNAL_SERVER_ERROR,
                StatusCode::BAD_GATEWAY,
                StatusCode::SERVICE_UNAVAILABLE,
                StatusCode::GATEWAY_TIMEOUT,
            ],
        }
    }
}

impl RetryPolicy {
    pub fn is_retryable(&self, status: StatusCode) -> bool {
        self.retry_statuses.contains(&status)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.backoff_factor
            .saturating_mul(1_u32 << exponent)
            .min(self.max_backoff)
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    policy: RetryPolicy,
}

impl HttpClient {
    pub fn new(policy: RetryPolicy) -> Result<Self> {
        Self::with_timeout(policy, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(policy: RetryPolicy, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// POSTs `body` as JSON, retrying transient failures per the policy.
    ///
    /// Once retries are exhausted on a retryable status, the last response is
    /// returned as-is so the caller can report its status.
    pub fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<Response> {
        let payload =
            serde_json::to_vec(body).map_err(|e| Error::Http(format!("encoding body: {e}")))?;

        let mut retry = 0;
        loop {
            let attempt = self
                .client
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .body(payload.clone())
                .send();
            let retries_left = retry < self.policy.max_retries;

            match attempt {
                Ok(resp) if retries_left && self.policy.is_retryable(resp.status()) => {
                    retry += 1;
                    let delay = self.delay_for(retry, &resp);
                    warn!(
                        "POST {} returned {}; retry {}/{} in {:?}",
                        url,
                        resp.status(),
                        retry,
                        self.policy.max_retries,
                        delay
                    );
                    thread::sleep(delay);
                }
                Ok(resp) => {
                    debug!("POST {} -> {}", url, resp.status());
                    return Ok(resp);
                }
                Err(err) if retries_left && !err.is_builder() => {
                    retry += 1;
                    let delay = self.policy.backoff(retry);
                    warn!(
                        "POST {} failed: {}; retry {}/{} in {:?}",
                        url, err, retry, self.policy.max_retries, delay
                    );
                    thread::sleep(delay);
                }
                Err(err) => return Err(Error::Http(err.to_string())),
            }
        }
    }

    fn delay_for(&self, retry: u32, resp: &Response) -> Duration {
        if resp.status() == StatusCode::SERVICE_UNAVAILABLE {
            if let Some(secs) = retry_after_secs(resp) {
                return Duration::from_secs(secs).min(self.policy.max_backoff);
            }
        }
        self.policy.backoff(retry)
    }
}

fn retry_after_secs(resp: &Response) -> Option<u64> {
    resp.headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
