//! Error types for plan loading and spec validation.
//!
//! Every variant is a flavour of malformed input: the installer reports them
//! before any network activity takes place.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors arising from malformed dependency specs or install plans.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    /// A package name is empty or contains characters outside the allowed set.
    #[error("invalid package name \"{value}\": {reason}")]
    InvalidName {
        /// The rejected name.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// A source URL could not be parsed or uses an unsupported scheme.
    #[error("invalid source URL \"{value}\": {reason}")]
    InvalidUrl {
        /// The rejected URL string.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// A SHA-256 digest is not a valid 64-character lowercase hex string.
    #[error("invalid SHA-256 digest: {reason}")]
    InvalidSha256Digest {
        /// Description of the validation failure.
        reason: String,
    },

    /// A runtime version string could not be parsed.
    #[error("invalid runtime version \"{value}\"")]
    InvalidRuntimeVersion {
        /// The rejected version string.
        value: String,
    },

    /// A plan entry is missing one of `name`, `url`, or `sha256`.
    #[error("{entry}: missing required field `{field}`")]
    MissingField {
        /// Location of the entry (`package` or `resource[N]`).
        entry: String,
        /// The absent field.
        field: &'static str,
    },

    /// A plan entry has a field that failed validation.
    #[error("{entry}: {source}")]
    InvalidEntry {
        /// Location of the entry (`package` or `resource[N]`).
        entry: String,
        /// The underlying validation failure.
        #[source]
        source: Box<SpecError>,
    },

    /// Two plan entries share the same normalized package name.
    #[error("duplicate package name \"{name}\" in {first} and {second}")]
    DuplicateName {
        /// The duplicated name as written in the second entry.
        name: String,
        /// Location of the first entry.
        first: String,
        /// Location of the second entry.
        second: String,
    },

    /// The plan does not declare a primary `[package]` table.
    #[error("plan has no [package] table")]
    MissingPrimary,

    /// The plan source is not valid TOML or has unknown keys.
    #[error("plan could not be parsed: {reason}")]
    Parse {
        /// The parser's description of the problem.
        reason: String,
    },

    /// The plan could not be rendered back to TOML.
    #[error("plan could not be serialized: {reason}")]
    Serialize {
        /// The serializer's description of the problem.
        reason: String,
    },

    /// The plan file could not be read.
    #[error("failed to read plan {path}: {reason}")]
    Read {
        /// Path of the plan file.
        path: Utf8PathBuf,
        /// Description of the I/O failure.
        reason: String,
    },
}

impl SpecError {
    /// Attach an entry location to a field validation failure.
    pub(crate) fn in_entry(self, entry: &str) -> Self {
        Self::InvalidEntry {
            entry: entry.to_owned(),
            source: Box::new(self),
        }
    }
}

/// Result type alias using [`SpecError`].
pub type Result<T> = std::result::Result<T, SpecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_names_entry_and_field() {
        let err = SpecError::MissingField {
            entry: "resource[2]".to_owned(),
            field: "sha256",
        };
        let msg = err.to_string();
        assert!(msg.contains("resource[2]"));
        assert!(msg.contains("sha256"));
    }

    #[test]
    fn in_entry_preserves_source() {
        let err = SpecError::InvalidSha256Digest {
            reason: "too short".to_owned(),
        }
        .in_entry("package");
        assert!(err.to_string().starts_with("package: invalid SHA-256 digest"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
