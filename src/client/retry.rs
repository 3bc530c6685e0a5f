use std::time::Duration;

/// HTTP statuses that are expected to resolve themselves on retry.
const TRANSIENT_STATUSES: [u16; 4] = [429, 502, 503, 504];

/// Bounded exponential-backoff policy for transient request failures.
///
/// Kept separate from the client so the classification and backoff schedule
/// are testable without any network.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first (not "retries after").
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the attempt after `attempt` (0-based): `base * 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff * 2u32.saturating_pow(attempt)
    }

    pub fn retryable_status(&self, status: u16) -> bool {
        TRANSIENT_STATUSES.contains(&status)
    }

    /// Connection and timeout failures count as transient; everything else a
    /// reqwest error can represent (bad URL, body decode) does not.
    pub fn retryable_error(&self, err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_backoff: Duration::from_millis(500),
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(500));
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
    }

    #[test]
    fn transient_statuses_are_retryable() {
        let policy = RetryPolicy::default();
        for status in [429, 502, 503, 504] {
            assert!(policy.retryable_status(status), "{status}");
        }
    }

    #[test]
    fn client_errors_and_plain_500_are_not() {
        let policy = RetryPolicy::default();
        for status in [400, 401, 403, 404, 422, 500] {
            assert!(!policy.retryable_status(status), "{status}");
        }
    }
}
