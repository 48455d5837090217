// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bounded retries for ledger reads.
//!
//! Each attempt is wrapped in a timeout; timeouts and transport failures are
//! retried with exponential backoff, every other error is returned at once.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::client::LedgerError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Upper bound for a single attempt.
    pub attempt_timeout: Duration,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(5),
            base_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            attempt_timeout,
            ..Self::default()
        }
    }

    /// Backoff before retry number `attempt + 1` (0-indexed).
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run
    /// out.
    pub async fn run<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T, LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.attempt_timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(LedgerError::Timeout {
                    operation: operation_name.to_string(),
                    timeout_ms: self.attempt_timeout.as_millis() as u64,
                }),
            };

            let err = match result {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(
                            operation = operation_name,
                            attempts = attempt + 1,
                            "Ledger call succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            attempt += 1;
            if !err.is_retryable() || attempt >= self.max_attempts {
                warn!(
                    operation = operation_name,
                    attempts = attempt,
                    error = %err,
                    "Ledger call failed"
                );
                return Err(err);
            }

            let delay = self.backoff(attempt - 1);
            debug!(
                operation = operation_name,
                attempt,
                backoff_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying ledger call"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
