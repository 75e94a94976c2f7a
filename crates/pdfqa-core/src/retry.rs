//! Timeout and bounded retry for calls into external capabilities.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CapabilityError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure.
    pub max_retries: u32,
    /// Base delay; the n-th retry waits `n * backoff_ms`.
    pub backoff_ms: u64,
    /// Budget for a single attempt.
    pub timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 1, backoff_ms: 250, timeout_ms: 30_000 }
    }
}

impl RetryPolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

/// Runs `call` under the policy's timeout, retrying failed attempts.
///
/// Every failure kind, timeouts included, is retried; the last error is
/// returned once the retries are spent.
pub async fn call_with_retry<T, F, Fut>(
    operation: &str,
    policy: &RetryPolicy,
    mut call: F,
) -> Result<T, CapabilityError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CapabilityError>>,
{
    let mut attempt = 0u32;
    loop {
        let outcome = match tokio::time::timeout(policy.timeout(), call()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(CapabilityError::Timeout(policy.timeout())),
        };
        match outcome {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_retries => {
                attempt += 1;
                tracing::warn!(operation, attempt, error = %err, "capability call failed, retrying");
                tokio::time::sleep(policy.backoff(attempt)).await;
            }
            Err(err) => return Err(err),
        }
    }
}
