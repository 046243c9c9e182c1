//! HTTP archive download using `ureq`.

use super::{ArchiveFetcher, FetchError};
use crate::spec::SourceUrl;
use std::io::{self, Read};
use std::time::Duration;
use ureq::http::StatusCode;
use ureq::http::header::{CONTENT_ENCODING, CONTENT_LENGTH};

/// Network timeout applied to each request unless configured otherwise.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP-based fetcher over a `ureq` agent.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use venvpin_installer::fetch::HttpFetcher;
///
/// let fetcher = HttpFetcher::new(Duration::from_secs(10));
/// // Use fetcher.fetch(&url) in production
/// # let _ = fetcher;
/// ```
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher").finish_non_exhaustive()
    }
}

impl HttpFetcher {
    /// Build a fetcher whose requests time out after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_DOWNLOAD_TIMEOUT)
    }
}

impl ArchiveFetcher for HttpFetcher {
    fn fetch(&self, url: &SourceUrl) -> Result<Vec<u8>, FetchError> {
        let url = url.as_str();
        log::debug!("GET {url}");
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        check_status(url, response.status())?;

        let headers = response.headers();
        let advertised = if headers.contains_key(CONTENT_ENCODING) {
            None
        } else {
            headers
                .get(CONTENT_LENGTH)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
        };

        let mut bytes = Vec::new();
        response
            .into_body()
            .as_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| FetchError::Transport {
                url: url.to_owned(),
                reason: e.to_string(),
            })?;

        check_length(url, advertised, bytes.len())?;
        log::debug!("received {} bytes from {url}", bytes.len());
        Ok(bytes)
    }
}

/// Fail on any status outside 2xx, including redirects ureq did not follow.
fn check_status(url: &str, status: StatusCode) -> Result<(), FetchError> {
    if status.is_success() {
        return Ok(());
    }
    Err(FetchError::Status {
        url: url.to_owned(),
        status: status.as_u16(),
    })
}

/// Fail when fewer bytes arrived than the server advertised.
fn check_length(url: &str, advertised: Option<u64>, received: usize) -> Result<(), FetchError> {
    let received = u64::try_from(received).unwrap_or(u64::MAX);
    match advertised {
        Some(expected) if received < expected => Err(FetchError::Truncated {
            url: url.to_owned(),
            expected,
            received,
        }),
        _ => Ok(()),
    }
}

/// Map a ureq error to a [`FetchError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> FetchError {
    match err {
        ureq::Error::StatusCode(status) => FetchError::Status {
            url: url.to_owned(),
            status: *status,
        },
        ureq::Error::BadUri(_)
        | ureq::Error::Http(_)
        | ureq::Error::RedirectFailed
        | ureq::Error::TooManyRedirects
        | ureq::Error::InvalidProxyUrl
        | ureq::Error::BodyExceedsLimit(_) => FetchError::Request {
            url: url.to_owned(),
            reason: err.to_string(),
        },
        // rustls surfaces certificate rejections as `InvalidData`.
        ureq::Error::Io(source) if source.kind() == io::ErrorKind::InvalidData => FetchError::Request {
            url: url.to_owned(),
            reason: err.to_string(),
        },
        other => FetchError::Transport {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;

    const URL: &str = "https://x.test/pkg.tar.gz";

    /// Serve one canned HTTP response on a loopback port and return the
    /// archive URL pointing at it.
    fn serve_once(response: &'static [u8]) -> SourceUrl {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        thread::spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let mut request = Vec::new();
            let mut chunk = [0_u8; 512];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&chunk[..n]),
                }
            }
            let _ = stream.write_all(response);
            let _ = stream.flush();
        });
        SourceUrl::try_from(format!("http://{addr}/packages/six-1.16.0.tar.gz"))
            .expect("valid URL")
    }

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5))
    }

    #[test]
    fn fetch_returns_body_on_success() {
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Length: 7\r\nConnection: close\r\n\r\narchive",
        );
        assert_eq!(fetcher().fetch(&url), Ok(b"archive".to_vec()));
    }

    #[test]
    fn fetch_maps_not_found_to_permanent_status() {
        let url = serve_once(
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        let err = fetcher().fetch(&url).expect_err("404 must fail");
        assert_eq!(
            err,
            FetchError::Status {
                url: url.to_string(),
                status: 404
            }
        );
        assert!(!err.is_transient());
    }

    #[test]
    fn fetch_reports_short_body_as_transient() {
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\nshort",
        );
        let err = fetcher().fetch(&url).expect_err("short body must fail");
        assert!(
            matches!(err, FetchError::Truncated { .. } | FetchError::Transport { .. }),
            "unexpected error: {err:?}"
        );
        assert!(err.is_transient());
    }

    #[rstest]
    #[case::ok(StatusCode::OK, true)]
    #[case::partial(StatusCode::PARTIAL_CONTENT, true)]
    #[case::not_modified(StatusCode::NOT_MODIFIED, false)]
    #[case::found(StatusCode::FOUND, false)]
    fn check_status_accepts_only_success(#[case] status: StatusCode, #[case] accepted: bool) {
        let result = check_status(URL, status);
        assert_eq!(result.is_ok(), accepted);
        if let Err(err) = result {
            assert_eq!(
                err,
                FetchError::Status {
                    url: URL.to_owned(),
                    status: status.as_u16()
                }
            );
        }
    }

    #[rstest]
    #[case::bad_uri(ureq::Error::BadUri("no host".to_owned()))]
    #[case::redirect_loop(ureq::Error::TooManyRedirects)]
    #[case::redirect_failed(ureq::Error::RedirectFailed)]
    #[case::certificate(ureq::Error::Io(io::Error::new(
        io::ErrorKind::InvalidData,
        "invalid peer certificate: UnknownIssuer"
    )))]
    fn map_ureq_error_treats_rejected_requests_as_permanent(#[case] err: ureq::Error) {
        let mapped = map_ureq_error(URL, &err);
        assert!(matches!(mapped, FetchError::Request { .. }), "got {mapped:?}");
        assert!(!mapped.is_transient());
    }

    #[test]
    fn map_ureq_error_keeps_status_code() {
        let mapped = map_ureq_error(URL, &ureq::Error::StatusCode(404));
        assert_eq!(
            mapped,
            FetchError::Status {
                url: URL.to_owned(),
                status: 404
            }
        );
        assert!(!mapped.is_transient());
    }

    #[test]
    fn map_ureq_error_maps_server_error_to_transient_status() {
        let mapped = map_ureq_error(URL, &ureq::Error::StatusCode(503));
        assert!(mapped.is_transient());
    }

    #[test]
    fn map_ureq_error_maps_io_to_transport() {
        let err = ureq::Error::Io(io::Error::other("reset by peer"));
        let mapped = map_ureq_error(URL, &err);
        assert!(matches!(mapped, FetchError::Transport { .. }));
    }

    #[test]
    fn short_body_is_truncated() {
        let result = check_length(URL, Some(100), 40);
        assert_eq!(
            result,
            Err(FetchError::Truncated {
                url: URL.to_owned(),
                expected: 100,
                received: 40
            })
        );
    }

    #[test]
    fn complete_or_unadvertised_body_passes() {
        assert!(check_length(URL, Some(40), 40).is_ok());
        assert!(check_length(URL, None, 0).is_ok());
    }
}
