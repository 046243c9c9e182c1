//! Errors arising from archive fetching.

use camino::Utf8PathBuf;

/// Errors arising from archive fetch operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The server answered with a non-success status code.
    #[error("GET {url} returned HTTP {status}")]
    Status {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The request failed before a response was received, or the body
    /// could not be read.
    #[error("download failed for {url}: {reason}")]
    Transport {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The request cannot succeed as written: a malformed URL, a redirect
    /// loop, or a rejected TLS certificate.
    #[error("request to {url} cannot succeed: {reason}")]
    Request {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The body ended before the advertised `Content-Length`.
    #[error("truncated transfer from {url}: received {received} of {expected} bytes")]
    Truncated {
        /// The URL that was requested.
        url: String,
        /// The advertised length.
        expected: u64,
        /// The number of bytes actually received.
        received: u64,
    },

    /// The download cache could not be read or written.
    #[error("download cache error at {path}: {reason}")]
    Cache {
        /// The cache entry involved.
        path: Utf8PathBuf,
        /// Description of the I/O failure.
        reason: String,
    },

    /// Every attempt allowed by the retry policy failed.
    #[error("giving up after {attempts} attempts: {last}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The error from the final attempt.
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Return true when retrying the same request might succeed.
    ///
    /// Connection failures, timeouts, truncated bodies, server errors, and
    /// rate limiting are transient. Other client errors (including 404) are
    /// permanent, as are rejected requests, cache failures, and exhausted
    /// retry budgets.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Truncated { .. } => true,
            Self::Status { status, .. } => *status >= 500 || matches!(status, 408 | 429),
            Self::Request { .. } | Self::Cache { .. } | Self::Exhausted { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn status(status: u16) -> FetchError {
        FetchError::Status {
            url: "https://x.test/a.tar.gz".to_owned(),
            status,
        }
    }

    #[rstest]
    #[case::server_error(500, true)]
    #[case::bad_gateway(502, true)]
    #[case::rate_limited(429, true)]
    #[case::request_timeout(408, true)]
    #[case::not_found(404, false)]
    #[case::forbidden(403, false)]
    #[case::gone(410, false)]
    fn classifies_status_codes(#[case] code: u16, #[case] transient: bool) {
        assert_eq!(status(code).is_transient(), transient);
    }

    #[test]
    fn transport_and_truncation_are_transient() {
        let transport = FetchError::Transport {
            url: "https://x.test".to_owned(),
            reason: "connection refused".to_owned(),
        };
        let truncated = FetchError::Truncated {
            url: "https://x.test".to_owned(),
            expected: 10,
            received: 4,
        };
        assert!(transport.is_transient());
        assert!(truncated.is_transient());
    }

    #[test]
    fn rejected_request_is_permanent() {
        let err = FetchError::Request {
            url: "https://x.test".to_owned(),
            reason: "too many redirects".to_owned(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn exhausted_keeps_last_error_as_source() {
        let err = FetchError::Exhausted {
            attempts: 3,
            last: Box::new(status(503)),
        };
        assert!(!err.is_transient());
        assert!(err.to_string().contains("3 attempts"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
