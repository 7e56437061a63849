use market_core::ErrorKind;
use std::collections::BTreeSet;
use std::time::Duration;

/// One backoff policy shared by every provider.
///
/// Auth and NotFound are never retried. Malformed responses get a single
/// retry. Every other kind in `retryable` gets up to `max_retries` retries,
/// sleeping `base_delay * 2^retry` before each one.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub retryable: BTreeSet<ErrorKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            retryable: [ErrorKind::RateLimit, ErrorKind::Transient, ErrorKind::Malformed]
                .into_iter()
                .collect(),
        }
    }

    pub fn with_retryable(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.retryable = kinds.into_iter().collect();
        self
    }

    /// Retries allowed for one provider after a failure of `kind`.
    pub fn retry_limit(&self, kind: ErrorKind) -> u32 {
        if !self.retryable.contains(&kind) {
            return 0;
        }
        match kind {
            ErrorKind::Auth | ErrorKind::NotFound => 0,
            ErrorKind::Malformed => self.max_retries.min(1),
            ErrorKind::RateLimit | ErrorKind::Transient => self.max_retries,
        }
    }

    /// Sleep before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_limits() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.retry_limit(ErrorKind::Auth), 0);
        assert_eq!(policy.retry_limit(ErrorKind::NotFound), 0);
        assert_eq!(policy.retry_limit(ErrorKind::RateLimit), 3);
        assert_eq!(policy.retry_limit(ErrorKind::Transient), 3);
        assert_eq!(policy.retry_limit(ErrorKind::Malformed), 1);

        let none = RetryPolicy::new(0, Duration::from_millis(100));
        assert_eq!(none.retry_limit(ErrorKind::Malformed), 0);
    }

    #[test]
    fn test_exponential_delay() {
        let policy = RetryPolicy::new(3, Duration::from_secs(2));
        assert_eq!(policy.delay_for(0), Duration::from_secs(2));
        assert_eq!(policy.delay_for(1), Duration::from_secs(4));
        assert_eq!(policy.delay_for(2), Duration::from_secs(8));
        assert!(policy.delay_for(64) >= policy.delay_for(31));
    }

    #[test]
    fn test_retryable_set_is_configurable() {
        let policy = RetryPolicy::default().with_retryable([ErrorKind::Transient]);
        assert_eq!(policy.retry_limit(ErrorKind::RateLimit), 0);
        assert_eq!(policy.retry_limit(ErrorKind::Transient), 3);

        // Auth stays terminal even if listed
        let policy = RetryPolicy::default().with_retryable([ErrorKind::Auth]);
        assert_eq!(policy.retry_limit(ErrorKind::Auth), 0);
    }
}
