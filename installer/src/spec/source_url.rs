//! Validated archive source URLs.

use super::error::{Result, SpecError};
use std::fmt;
use url::Url;

/// An absolute `http` or `https` URL pointing at a downloadable archive.
///
/// # Examples
///
/// ```
/// use venvpin_installer::spec::SourceUrl;
///
/// let url = SourceUrl::try_from("https://files.example.test/pkg/six-1.16.0.tar.gz")
///     .expect("valid URL");
/// assert_eq!(url.file_name(), Some("six-1.16.0.tar.gz"));
/// assert!(SourceUrl::try_from("ftp://example.test/six.tar.gz").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceUrl {
    raw: String,
    parsed: Url,
}

impl SourceUrl {
    /// Return the URL exactly as it was declared.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Return the host component.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.parsed.host_str()
    }

    /// Return the last non-empty path segment, if any.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
    }
}

impl TryFrom<&str> for SourceUrl {
    type Error = SpecError;

    fn try_from(value: &str) -> Result<Self> {
        let invalid = |reason: String| SpecError::InvalidUrl {
            value: value.to_owned(),
            reason,
        };

        let parsed = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!(
                "unsupported scheme `{}`; expected http or https",
                parsed.scheme()
            )));
        }
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(invalid("URL has no host".to_owned()));
        }
        Ok(Self {
            raw: value.to_owned(),
            parsed,
        })
    }
}

impl TryFrom<String> for SourceUrl {
    type Error = SpecError;

    fn try_from(value: String) -> Result<Self> {
        Self::try_from(value.as_str())
    }
}

impl AsRef<str> for SourceUrl {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
