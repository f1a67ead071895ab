//! RetryPolicyCalculator: pure, stateless retry-eligibility and backoff math.

use rand::Rng;

use super::model::{BackoffStrategy, RetryPolicy};

/// `shouldRetry(policy, retryCount, maxRetries, handlerSaysRetryable)`.
///
/// True iff retries are enabled, the handler marked the failure retryable,
/// and the job hasn't exhausted its retry budget.
pub fn should_retry(
    policy: &RetryPolicy,
    retry_count: u32,
    max_retries: u32,
    handler_says_retryable: bool,
) -> bool {
    policy.enabled && handler_says_retryable && retry_count < max_retries
}

/// `computeDelayMs(policy, retryCount)`.
///
/// Cap is applied before jitter so the jitter is interpretable as a
/// percentage of the capped delay. `retryCount >= 31` short-circuits
/// exponential growth straight to `maxDelayMs` to avoid overflow.
pub fn compute_delay_ms(policy: &RetryPolicy, retry_count: u32) -> u64 {
    let base = policy.base_delay_ms;
    let raw = match policy.backoff_strategy {
        BackoffStrategy::Constant => base,
        BackoffStrategy::Linear => base.saturating_mul(retry_count as u64 + 1),
        BackoffStrategy::Exponential => {
            if retry_count >= 31 {
                policy.max_delay_ms
            } else {
                // widened u128 domain to avoid overflow before the cap below
                let factor: u128 = 1u128 << retry_count;
                let value = (base as u128).saturating_mul(factor);
                value.min(u64::MAX as u128) as u64
            }
        }
    };

    let capped = raw.min(policy.max_delay_ms);
    apply_jitter(capped, policy.min_jitter_factor, policy.max_jitter_factor)
}

fn apply_jitter(capped_delay_ms: u64, min_jitter_factor: f64, max_jitter_factor: f64) -> u64 {
    let jitter_factor = if (max_jitter_factor - min_jitter_factor).abs() < f64::EPSILON {
        min_jitter_factor
    } else {
        rand::thread_rng().gen_range(min_jitter_factor..max_jitter_factor)
    };
    let multiplier = 1.0 + jitter_factor;
    let jittered = (capped_delay_ms as f64) * multiplier;
    jittered.floor().max(0.0) as u64
}
