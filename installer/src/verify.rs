//! SHA-256 integrity verification of fetched archives.
//!
//! A mismatch is always an error value, never a boolean the caller might
//! forget to check. Integrity failures are fatal and never retried.

use crate::spec::Sha256Digest;
use sha2::{Digest, Sha256};

/// The digest of an archive did not match the pinned value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("SHA-256 mismatch: expected {expected}, got {actual}")]
pub struct IntegrityError {
    /// The digest declared in the plan.
    pub expected: Sha256Digest,
    /// The digest of the bytes actually fetched.
    pub actual: Sha256Digest,
}

/// Compute the lowercase hex SHA-256 digest of `bytes`.
///
/// # Examples
///
/// ```
/// use venvpin_installer::verify::compute_sha256;
///
/// let digest = compute_sha256(b"");
/// assert_eq!(
///     digest.as_str(),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn compute_sha256(bytes: &[u8]) -> Sha256Digest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Sha256Digest::from_hasher_hex(format!("{:x}", hasher.finalize()))
}

/// Return true when `bytes` hash to `expected`.
#[must_use]
pub fn digest_matches(bytes: &[u8], expected: &Sha256Digest) -> bool {
    compute_sha256(bytes) == *expected
}

/// Verifies fetched bytes against a pinned digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Verifier;

impl Sha256Verifier {
    /// Hash `bytes` and compare against `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrityError`] carrying both digests when they differ.
    pub fn verify(&self, bytes: &[u8], expected: &Sha256Digest) -> Result<(), IntegrityError> {
        let actual = compute_sha256(bytes);
        if actual == *expected {
            log::trace!("digest {actual} verified");
            return Ok(());
        }
        Err(IntegrityError {
            expected: expected.clone(),
            actual,
        })
    }
}
