//! Exponential backoff for rate-limited HTTP calls.
//!
//! Only failures that signal a rate limit are retried; any other error is
//! returned from the first call. Delays grow geometrically without jitter and
//! the attempts are bounded both in count and in total wall-clock time.

use backoff::{backoff::Backoff, ExponentialBackoff, ExponentialBackoffBuilder};
use payment_attestation::AttestationError;
use payment_config::RetryConfig;
use payment_order::OrderServiceError;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

const RATE_LIMIT_MARKERS: [&str; 2] = ["Too Many Requests", "limit of requests"];

/// Whether an error message carries one of the rate-limit markers services use.
pub fn is_rate_limit_message(message: &str) -> bool {
	RATE_LIMIT_MARKERS
		.iter()
		.any(|marker| message.contains(marker))
}

/// Errors that can tell whether they were caused by a rate limit.
pub trait RateLimitSignal {
	fn is_rate_limited(&self) -> bool;
}

impl RateLimitSignal for AttestationError {
	fn is_rate_limited(&self) -> bool {
		match self {
			AttestationError::RateLimited(_) => true,
			AttestationError::Http { status: 429, .. } => true,
			other => is_rate_limit_message(&other.to_string()),
		}
	}
}

impl RateLimitSignal for OrderServiceError {
	fn is_rate_limited(&self) -> bool {
		match self {
			OrderServiceError::RateLimited(_) => true,
			OrderServiceError::Http { status: 429, .. } => true,
			other => is_rate_limit_message(&other.to_string()),
		}
	}
}

/// Retry parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
	/// Total calls, including the first.
	pub max_attempts: u32,
	pub initial_delay: Duration,
	pub backoff_factor: f64,
	pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self::from(&RetryConfig::default())
	}
}

impl From<&RetryConfig> for RetryPolicy {
	fn from(config: &RetryConfig) -> Self {
		Self {
			max_attempts: config.max_attempts.max(1),
			initial_delay: Duration::from_millis(config.initial_delay_ms),
			backoff_factor: config.backoff_factor,
			max_elapsed: Duration::from_secs(config.max_elapsed_seconds),
		}
	}
}

impl RetryPolicy {
	fn backoff(&self) -> ExponentialBackoff {
		let mut backoff = ExponentialBackoffBuilder::new()
			.with_initial_interval(self.initial_delay)
			.with_multiplier(self.backoff_factor)
			.with_randomization_factor(0.0)
			.with_max_interval(self.max_elapsed)
			.with_max_elapsed_time(Some(self.max_elapsed))
			.build();
		backoff.reset();
		backoff
	}
}

/// Runs `operation`, retrying it while it fails with a rate limit.
///
/// The last error is returned once `max_attempts` calls have been made or the
/// elapsed-time bound is reached.
pub async fn with_retry<T, E, F, Fut>(
	policy: &RetryPolicy,
	operation_name: &str,
	mut operation: F,
) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: RateLimitSignal + Display,
{
	let max_attempts = policy.max_attempts.max(1);
	let mut attempt = 0u32;

	let call = || {
		attempt += 1;
		let current = attempt;
		let fut = operation();
		async move {
			match fut.await {
				Ok(value) => Ok(value),
				Err(e) if e.is_rate_limited() && current < max_attempts => {
					Err(backoff::Error::transient(e))
				},
				Err(e) => Err(backoff::Error::permanent(e)),
			}
		}
	};

	let notify = |err: E, delay: Duration| {
		tracing::warn!(
			operation = operation_name,
			delay_ms = delay.as_millis() as u64,
			error = %err,
			"Rate limited, retrying"
		);
	};

	backoff::future::retry_notify(policy.backoff(), call, notify).await
}
