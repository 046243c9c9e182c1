//! The immutable record describing one pinned package.

use super::package_name::PackageName;
use super::sha256_digest::Sha256Digest;
use super::source_url::SourceUrl;
use std::fmt;

/// Whether a spec is the plan's top-level package or one of its resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageRole {
    /// The tool being installed.
    Primary,
    /// A transitive dependency declared with its own source and digest.
    Resource,
}

impl PackageRole {
    /// Return the lowercase label used in receipts and output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Resource => "resource",
        }
    }
}

impl fmt::Display for PackageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pinned package: its name, where to fetch it, and the digest it must
/// hash to.
///
/// All three fields are validated at construction, so a `DependencySpec`
/// value is always well formed.
///
/// # Examples
///
/// ```
/// use venvpin_installer::spec::{DependencySpec, PackageName, Sha256Digest, SourceUrl};
///
/// let spec = DependencySpec::new(
///     PackageName::try_from("six").expect("valid name"),
///     SourceUrl::try_from("https://x.test/six-1.16.0.tar.gz").expect("valid URL"),
///     Sha256Digest::try_from("b".repeat(64)).expect("valid digest"),
/// );
/// assert_eq!(spec.name().as_str(), "six");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencySpec {
    name: PackageName,
    url: SourceUrl,
    sha256: Sha256Digest,
}

impl DependencySpec {
    /// Create a spec from validated parts.
    #[must_use]
    pub fn new(name: PackageName, url: SourceUrl, sha256: Sha256Digest) -> Self {
        Self { name, url, sha256 }
    }

    /// The package name.
    #[must_use]
    pub fn name(&self) -> &PackageName {
        &self.name
    }

    /// The archive source.
    #[must_use]
    pub fn url(&self) -> &SourceUrl {
        &self.url
    }

    /// The expected archive digest.
    #[must_use]
    pub fn sha256(&self) -> &Sha256Digest {
        &self.sha256
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}
