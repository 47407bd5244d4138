//! Retry policy for provider calls: exponential backoff with jitter.

use std::time::Duration;
use axum::http::StatusCode;
use rand::Rng;

use crate::config::GenerationConfig;

fn capped_delay_ms(attempt: u32, base_ms: u64, max_ms: u64) -> u64 {
    base_ms
        .saturating_mul(2u64.saturating_pow(attempt - 1))
        .min(max_ms)
}

/// Delay before attempt `attempt + 1`, with up to 10% added jitter.
pub fn backoff_delay(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let capped = capped_delay_ms(attempt, base_ms, max_ms);
    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}

/// Longest a single `generate` call can take: every attempt running to its
/// timeout plus the largest backoff between them.
pub fn retry_budget(config: &GenerationConfig) -> Duration {
    let attempts = config.max_attempts.max(1);
    let calls = Duration::from_secs(config.request_timeout_secs).saturating_mul(attempts);
    let backoff_ms: u64 = (1..attempts)
        .map(|attempt| {
            let capped = capped_delay_ms(attempt, config.base_delay_ms, config.max_delay_ms);
            capped + capped / 10
        })
        .sum();
    calls + Duration::from_millis(backoff_ms)
}

/// Provider statuses worth another attempt.
pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}
