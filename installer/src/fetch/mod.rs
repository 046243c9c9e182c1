//! Archive fetching: HTTP download, retry with backoff, and an on-disk cache.
//!
//! The layers compose as decorators over [`ArchiveFetcher`]. The production
//! stack is `CachingFetcher<RetryingFetcher<HttpFetcher>>`, so cache hits
//! never touch the network and retries only happen on misses.

mod cache;
mod download;
mod error;
mod retry;

pub use cache::{ArchiveCache, CachingFetcher};
pub use download::{DEFAULT_DOWNLOAD_TIMEOUT, HttpFetcher};
pub use error::FetchError;
pub use retry::{RetryPolicy, RetryingFetcher, retry_delay};

use crate::spec::SourceUrl;

/// Trait for fetching archive bytes by URL.
///
/// Abstractions allow tests to script network behaviour without access to a
/// real registry.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveFetcher {
    /// Download the archive at `url`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the host is unreachable, the server
    /// answers with a non-success status, or the transfer is truncated.
    fn fetch(&self, url: &SourceUrl) -> Result<Vec<u8>, FetchError>;

    /// Forget any locally stored copy of `url`.
    ///
    /// Called after an integrity failure so a corrupt copy is never reused.
    /// Fetchers without local state have nothing to discard.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] if a stored copy exists but cannot be
    /// removed.
    fn discard(&self, url: &SourceUrl) -> Result<(), FetchError> {
        let _ = url;
        Ok(())
    }
}

impl<F: ArchiveFetcher + ?Sized> ArchiveFetcher for Box<F> {
    fn fetch(&self, url: &SourceUrl) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(url)
    }

    fn discard(&self, url: &SourceUrl) -> Result<(), FetchError> {
        (**self).discard(url)
    }
}

impl<F: ArchiveFetcher + ?Sized> ArchiveFetcher for &F {
    fn fetch(&self, url: &SourceUrl) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(url)
    }

    fn discard(&self, url: &SourceUrl) -> Result<(), FetchError> {
        (**self).discard(url)
    }
}
