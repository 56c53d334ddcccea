use std::future::Future;
use std::time::Duration;

use procure_config::RetryPolicy;
use rand::Rng;
use tracing::warn;

use crate::error::{Error, Result};

/// Exponential backoff with full jitter: base doubled per attempt, capped at
/// `max_backoff_ms`, with per-call jitter so the embedding/chat providers
/// don't retry in synchronized storms across workers.
fn backoff_for_attempt(policy: &RetryPolicy, attempt: u32) -> Duration {
	let exp = attempt.saturating_sub(1).min(6);
	let base = policy.base_backoff_ms.saturating_mul(1u64 << exp);
	let capped = base.min(policy.max_backoff_ms);
	let jittered = rand::thread_rng().gen_range(0..=capped.max(1));

	Duration::from_millis(jittered)
}

/// Retries `call` up to `policy.max_attempts` times, backing off between
/// attempts. `Error::InvalidConfig` is a caller bug, not a transient upstream
/// failure, so it fails immediately; every other error variant is retried.
pub async fn with_retry<T, F, Fut>(provider: &str, policy: &RetryPolicy, mut call: F) -> Result<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T>>,
{
	let mut attempt = 0;

	loop {
		attempt += 1;

		match call().await {
			Ok(value) => return Ok(value),
			Err(err) if attempt < policy.max_attempts && is_transient(&err) => {
				let delay = backoff_for_attempt(policy, attempt);

				warn!(provider, attempt, delay_ms = delay.as_millis() as u64, error = %err, "Retrying after transient failure.");
				tokio::time::sleep(delay).await;
			}
			Err(err) if is_transient(&err) => {
				return Err(Error::RetryExhausted {
					provider: provider.to_string(),
					attempts: attempt,
					source: Box::new(err),
				});
			}
			Err(err) => return Err(err),
		}
	}
}

fn is_transient(err: &Error) -> bool {
	!matches!(err, Error::InvalidConfig { .. })
}

#[cfg(test)]
mod tests {
	use super::*;

	fn policy() -> RetryPolicy {
		RetryPolicy { max_attempts: 3, base_backoff_ms: 10, max_backoff_ms: 100 }
	}

	#[test]
	fn backoff_never_exceeds_configured_ceiling() {
		let policy = policy();

		for attempt in 1..10 {
			let delay = backoff_for_attempt(&policy, attempt);

			assert!(delay.as_millis() as u64 <= policy.max_backoff_ms);
		}
	}

	#[tokio::test]
	async fn non_transient_errors_are_not_retried() {
		let mut calls = 0;
		let result: Result<()> = with_retry("test-provider", &policy(), || {
			calls += 1;
			async { Err(Error::InvalidConfig { message: "bad config".to_string() }) }
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls, 1);
	}

	#[tokio::test]
	async fn succeeds_after_transient_failures() {
		let mut calls = 0;
		let result = with_retry("test-provider", &policy(), || {
			calls += 1;
			async move {
				if calls < 2 {
					Err(Error::InvalidResponse { message: "simulated".to_string() })
				} else {
					Ok(42)
				}
			}
		})
		.await;

		assert_eq!(result.unwrap(), 42);
		assert_eq!(calls, 2);
	}
}
