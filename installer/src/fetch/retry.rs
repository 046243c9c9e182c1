//! Bounded retry with exponential backoff for transient fetch failures.

use super::{ArchiveFetcher, FetchError};
use crate::spec::SourceUrl;
use std::time::Duration;

/// How many times to try a fetch and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Never less than one.
    pub attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// A policy that tries `attempts` times without sleeping. Used in tests.
    #[must_use]
    pub const fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay to wait before retry number `retry` (0-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        retry_delay(retry, self.base_delay).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

/// Calculate the delay before a retry attempt using exponential backoff.
///
/// The delay is `base * 2^retry`, saturating rather than overflowing.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use venvpin_installer::fetch::retry_delay;
///
/// let base = Duration::from_millis(100);
/// assert_eq!(retry_delay(0, base), Duration::from_millis(100));
/// assert_eq!(retry_delay(2, base), Duration::from_millis(400));
/// ```
#[must_use]
pub fn retry_delay(retry: u32, base: Duration) -> Duration {
    base.saturating_mul(2_u32.saturating_pow(retry))
}

/// Wraps a fetcher and retries transient failures.
///
/// Permanent failures (such as HTTP 404) are returned after the first
/// attempt. When the budget runs out the final error is wrapped in
/// [`FetchError::Exhausted`].
#[derive(Debug)]
pub struct RetryingFetcher<F> {
    inner: F,
    policy: RetryPolicy,
}

impl<F: ArchiveFetcher> RetryingFetcher<F> {
    /// Wrap `inner` with `policy`.
    #[must_use]
    pub fn new(inner: F, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// The policy in force.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

impl<F: ArchiveFetcher> ArchiveFetcher for RetryingFetcher<F> {
    fn fetch(&self, url: &SourceUrl) -> Result<Vec<u8>, FetchError> {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.inner.fetch(url) {
                Ok(bytes) => return Ok(bytes),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) if attempt >= attempts => {
                    return Err(FetchError::Exhausted {
                        attempts,
                        last: Box::new(err),
                    });
                }
                Err(err) => {
                    let delay = self.policy.delay_for(attempt - 1);
                    log::warn!(
                        "attempt {attempt}/{attempts} for {url} failed: {err}; retrying in {delay:?}"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }

    fn discard(&self, url: &SourceUrl) -> Result<(), FetchError> {
        self.inner.discard(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MockArchiveFetcher;
    use mockall::Sequence;
    use rstest::{fixture, rstest};

    #[fixture]
    fn url() -> SourceUrl {
        SourceUrl::try_from("https://x.test/six-1.16.0.tar.gz").expect("valid URL")
    }

    fn server_error() -> FetchError {
        FetchError::Status {
            url: "https://x.test/six-1.16.0.tar.gz".to_owned(),
            status: 503,
        }
    }

    #[rstest]
    #[case(0, 100)]
    #[case(1, 200)]
    #[case(3, 800)]
    fn delay_doubles(#[case] retry: u32, #[case] millis: u64) {
        assert_eq!(
            retry_delay(retry, Duration::from_millis(100)),
            Duration::from_millis(millis)
        );
    }

    #[test]
    fn delay_saturates_instead_of_overflowing() {
        assert_eq!(retry_delay(64, Duration::MAX), Duration::MAX);
    }

    #[test]
    fn policy_caps_delay() {
        let policy = RetryPolicy {
            attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(3),
        };
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(3));
        assert_eq!(policy.delay_for(10), Duration::from_secs(3));
    }

    #[rstest]
    fn transient_failure_then_success(url: SourceUrl) {
        let mut inner = MockArchiveFetcher::new();
        let mut seq = Sequence::new();
        inner
            .expect_fetch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(server_error()));
        inner
            .expect_fetch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(b"archive".to_vec()));

        let fetcher = RetryingFetcher::new(inner, RetryPolicy::immediate(3));
        assert_eq!(fetcher.fetch(&url), Ok(b"archive".to_vec()));
    }

    #[rstest]
    fn permanent_failure_is_not_retried(url: SourceUrl) {
        let mut inner = MockArchiveFetcher::new();
        inner.expect_fetch().times(1).returning(|u| {
            Err(FetchError::Status {
                url: u.to_string(),
                status: 404,
            })
        });

        let fetcher = RetryingFetcher::new(inner, RetryPolicy::immediate(3));
        let err = fetcher.fetch(&url).expect_err("404");
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[rstest]
    fn budget_exhaustion_wraps_last_error(url: SourceUrl) {
        let mut inner = MockArchiveFetcher::new();
        inner
            .expect_fetch()
            .times(3)
            .returning(|_| Err(server_error()));

        let fetcher = RetryingFetcher::new(inner, RetryPolicy::immediate(3));
        let err = fetcher.fetch(&url).expect_err("exhausted");
        assert_eq!(
            err,
            FetchError::Exhausted {
                attempts: 3,
                last: Box::new(server_error())
            }
        );
    }

    #[rstest]
    fn zero_attempts_still_tries_once(url: SourceUrl) {
        let mut inner = MockArchiveFetcher::new();
        inner
            .expect_fetch()
            .times(1)
            .returning(|_| Ok(Vec::new()));

        let fetcher = RetryingFetcher::new(inner, RetryPolicy::immediate(0));
        assert!(fetcher.fetch(&url).is_ok());
    }

    #[rstest]
    fn discard_is_forwarded(url: SourceUrl) {
        let mut inner = MockArchiveFetcher::new();
        inner.expect_discard().times(1).returning(|_| Ok(()));
        let fetcher = RetryingFetcher::new(inner, RetryPolicy::default());
        assert!(fetcher.discard(&url).is_ok());
    }
}
