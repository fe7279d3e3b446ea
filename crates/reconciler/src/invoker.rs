//! Driver invocation boundary
//!
//! The only place device calls are timed out and retried. Stores and the
//! allocator are never retried.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use l2net_core::{DeviceOutcome, DeviceState, ReconcileError, Result, SwitchDriver};
use l2net_shared_types::DeviceOperation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvokePolicy {
    /// Deadline for one attempt
    pub timeout: Duration,
    /// Extra attempts after a transient failure
    pub max_retries: u32,
    /// First retry delay, doubled on each further retry
    pub backoff: Duration,
}

impl Default for InvokePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 2,
            backoff: Duration::from_millis(200),
        }
    }
}

impl InvokePolicy {
    fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(1u32 << attempt.min(16))
    }
}

pub struct DriverInvoker {
    driver: Arc<dyn SwitchDriver>,
    policy: InvokePolicy,
}

impl DriverInvoker {
    pub fn new(driver: Arc<dyn SwitchDriver>, policy: InvokePolicy) -> Self {
        Self { driver, policy }
    }

    pub fn device(&self) -> &str {
        self.driver.device()
    }

    pub fn policy(&self) -> InvokePolicy {
        self.policy
    }

    pub async fn execute(&self, operation: &DeviceOperation) -> Result<DeviceOutcome> {
        let label = operation.to_string();
        let outcome = self.call(&label, || self.driver.execute(operation)).await?;
        debug!("{} on {}: {:?}", label, self.driver.device(), outcome);
        Ok(outcome)
    }

    pub async fn query_state(&self) -> Result<DeviceState> {
        self.call("query_state", || self.driver.query_state()).await
    }

    async fn call<T, F, Fut>(&self, label: &str, mut attempt_fn: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.policy.timeout, attempt_fn()).await {
                Ok(result) => result,
                Err(_) => Err(ReconcileError::DeviceTimeout {
                    device: self.driver.device().to_string(),
                    operation: label.to_string(),
                    timeout_ms: self.policy.timeout.as_millis() as u64,
                }),
            };

            match result {
                Err(err) if err.is_transient() && attempt < self.policy.max_retries => {
                    let delay = self.policy.delay(attempt);
                    attempt += 1;
                    warn!(
                        "{} failed ({}), retry {}/{} in {:?}",
                        label, err, attempt, self.policy.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}
