//! Retry with backoff for idempotent gateway calls

use crate::provider::PaymentGateway;
use crate::types::*;
use async_trait::async_trait;
use donation_core::{PaymentError, PaymentResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy for transient gateway failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Backoff multiplier
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff
    pub fn exponential(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            multiplier: 2.0,
        }
    }

    /// Never retry
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Delay before retry number `attempt` (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt as i32);
        let millis = (self.initial_delay.as_millis() as f64 * factor) as u64;
        Duration::from_millis(millis).min(self.max_delay)
    }

    /// Whether a failed attempt should be retried
    pub fn should_retry(&self, attempt: u32, error: &PaymentError) -> bool {
        attempt < self.max_retries && error.is_transient()
    }

    /// Delay requested by the error itself, falling back to the backoff
    fn delay_after(&self, attempt: u32, error: &PaymentError) -> Duration {
        match error {
            PaymentError::RateLimited(secs) => {
                Duration::from_secs(u64::from(*secs)).min(self.max_delay)
            }
            _ => self.delay_for_attempt(attempt),
        }
    }

    /// Run `op`, retrying transient failures
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> PaymentResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PaymentResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if self.should_retry(attempt, &err) => {
                    let delay = self.delay_after(attempt, &err);
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying gateway call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Gateway decorator that retries the idempotent operations.
///
/// Charge initialization and transfer initiation are passed through once:
/// repeating them could open a second checkout or move money twice.
pub struct Retrying<G> {
    inner: G,
    policy: RetryPolicy,
}

impl<G: PaymentGateway> Retrying<G> {
    pub fn new(inner: G, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

#[async_trait]
impl<G: PaymentGateway> PaymentGateway for Retrying<G> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn initialize_charge(&self, request: ChargeRequest) -> PaymentResult<Checkout> {
        self.inner.initialize_charge(request).await
    }

    async fn list_banks(&self) -> PaymentResult<Vec<Bank>> {
        self.policy
            .run("list_banks", || self.inner.list_banks())
            .await
    }

    async fn resolve_account(
        &self,
        account_number: &str,
        bank_code: &str,
    ) -> PaymentResult<ResolvedAccount> {
        self.policy
            .run("resolve_account", || {
                self.inner.resolve_account(account_number, bank_code)
            })
            .await
    }

    async fn create_transfer_recipient(
        &self,
        request: RecipientRequest,
    ) -> PaymentResult<TransferRecipient> {
        self.policy
            .run("create_transfer_recipient", || {
                self.inner.create_transfer_recipient(request.clone())
            })
            .await
    }

    async fn initiate_transfer(&self, request: TransferRequest) -> PaymentResult<Transfer> {
        self.inner.initiate_transfer(request).await
    }
}
