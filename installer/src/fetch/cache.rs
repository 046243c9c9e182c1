//! On-disk download cache keyed by source URL.

use super::{ArchiveFetcher, FetchError};
use crate::spec::SourceUrl;
use crate::verify::compute_sha256;
use camino::{Utf8Path, Utf8PathBuf};
use std::io::{self, Write};

const DOWNLOADS_DIR: &str = "downloads";
const KEY_LEN: usize = 16;
const FALLBACK_FILE_NAME: &str = "archive";

/// Directory of cached archives, one file per URL.
///
/// Entries live at `<cache_dir>/downloads/<key>--<file name>`, where `key`
/// is the first 16 hex characters of the URL's SHA-256. Writes go through a
/// temporary file in the same directory and are renamed into place, so a
/// reader never sees a partial entry.
#[derive(Debug, Clone)]
pub struct ArchiveCache {
    dir: Utf8PathBuf,
}

impl ArchiveCache {
    /// Create a cache rooted at `cache_dir`.
    #[must_use]
    pub fn new(cache_dir: &Utf8Path) -> Self {
        Self {
            dir: cache_dir.join(DOWNLOADS_DIR),
        }
    }

    /// Directory holding the cached archives.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Path of the cache entry for `url`, whether or not it exists.
    #[must_use]
    pub fn entry_path(&self, url: &SourceUrl) -> Utf8PathBuf {
        let digest = compute_sha256(url.as_str().as_bytes());
        let key = &digest.as_str()[..KEY_LEN];
        let file_name = url.file_name().unwrap_or(FALLBACK_FILE_NAME);
        self.dir.join(format!("{key}--{file_name}"))
    }

    /// Read the cached archive for `url`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Cache`] if the entry exists but cannot be read.
    pub fn get(&self, url: &SourceUrl) -> Result<Option<Vec<u8>>, FetchError> {
        let path = self.entry_path(url);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(cache_error(path, &e)),
        }
    }

    /// Store `bytes` as the cached archive for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Cache`] if the directory or entry cannot be
    /// written.
    pub fn put(&self, url: &SourceUrl, bytes: &[u8]) -> Result<(), FetchError> {
        let path = self.entry_path(url);
        std::fs::create_dir_all(&self.dir).map_err(|e| cache_error(self.dir.clone(), &e))?;

        let mut temp =
            tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| cache_error(path.clone(), &e))?;
        temp.write_all(bytes)
            .and_then(|()| temp.flush())
            .map_err(|e| cache_error(path.clone(), &e))?;
        temp.persist(&path)
            .map_err(|e| cache_error(path.clone(), &e.error))?;
        Ok(())
    }

    /// Delete the cached archive for `url`. Returns true if one existed.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Cache`] if the entry exists but cannot be
    /// removed.
    pub fn remove(&self, url: &SourceUrl) -> Result<bool, FetchError> {
        let path = self.entry_path(url);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(cache_error(path, &e)),
        }
    }
}

fn cache_error(path: Utf8PathBuf, err: &io::Error) -> FetchError {
    FetchError::Cache {
        path,
        reason: err.to_string(),
    }
}

/// Serves archives from an [`ArchiveCache`], falling back to an inner
/// fetcher on a miss and storing what it returns.
#[derive(Debug)]
pub struct CachingFetcher<F> {
    inner: F,
    cache: ArchiveCache,
}

impl<F: ArchiveFetcher> CachingFetcher<F> {
    /// Wrap `inner` with `cache`.
    #[must_use]
    pub fn new(inner: F, cache: ArchiveCache) -> Self {
        Self { inner, cache }
    }

    /// The underlying cache.
    #[must_use]
    pub fn cache(&self) -> &ArchiveCache {
        &self.cache
    }
}

impl<F: ArchiveFetcher> ArchiveFetcher for CachingFetcher<F> {
    fn fetch(&self, url: &SourceUrl) -> Result<Vec<u8>, FetchError> {
        match self.cache.get(url) {
            Ok(Some(bytes)) => {
                log::debug!("cache hit for {url}");
                return Ok(bytes);
            }
            Ok(None) => log::debug!("cache miss for {url}"),
            Err(err) => log::warn!("ignoring unreadable cache entry for {url}: {err}"),
        }
        let bytes = self.inner.fetch(url)?;
        if let Err(err) = self.cache.put(url, &bytes) {
            log::warn!("not caching {url}: {err}");
        }
        Ok(bytes)
    }

    fn discard(&self, url: &SourceUrl) -> Result<(), FetchError> {
        if self.cache.remove(url)? {
            log::info!("discarded cached copy of {url}");
        }
        self.inner.discard(url)
    }
}
