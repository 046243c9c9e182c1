//! Error types for the venvpin installer.
//!
//! [`InstallerError`] is the single error surfaced to the orchestrator and
//! the CLI. Each variant belongs to one [`ErrorKind`], which is what failure
//! reports name.

use crate::environment::ExtractionError;
use crate::fetch::FetchError;
use crate::spec::{RuntimeVersion, SpecError};
use crate::verify::IntegrityError;
use camino::Utf8PathBuf;
use std::fmt;
use thiserror::Error;

/// Errors that can occur while loading, fetching, verifying, or installing.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The plan is malformed. Reported before any network activity.
    #[error(transparent)]
    MalformedSpec(#[from] SpecError),

    /// An archive could not be fetched after the retry budget was spent.
    #[error(transparent)]
    Network(#[from] FetchError),

    /// A fetched archive does not hash to its pinned digest.
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// An archive could not be unpacked into the install root.
    #[error("failed to unpack {package}: {source}")]
    Extraction {
        /// The package being unpacked.
        package: String,
        /// The underlying extraction failure.
        #[source]
        source: ExtractionError,
    },

    /// The unpacked archive has no build metadata or the package installer
    /// rejected it.
    #[error("failed to install {package}: {reason}")]
    Install {
        /// The package being installed.
        package: String,
        /// Description of the failure, including installer output.
        reason: String,
    },

    /// The interpreter is older than the plan requires, or a package
    /// declares it does not support it.
    #[error("incompatible runtime: requires {required}, found {found}")]
    IncompatibleRuntime {
        /// The minimum supported version.
        required: String,
        /// The interpreter version found.
        found: RuntimeVersion,
    },

    /// The isolation facility is unavailable or the root cannot be prepared.
    #[error("environment unavailable: {reason}")]
    Environment {
        /// Description of why the environment could not be created.
        reason: String,
    },

    /// Another installation holds the lock on the install root.
    #[error("install root {path} is locked by another installation")]
    RootLocked {
        /// The contested install root.
        path: Utf8PathBuf,
    },

    /// The installation was cancelled before the named package started.
    #[error("installation cancelled before {package}")]
    Cancelled {
        /// The first package that was not started.
        package: String,
    },

    /// The configuration file is unreadable or invalid.
    #[error("invalid configuration {path}: {reason}")]
    Config {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// Description of the problem.
        reason: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to write output.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },
}

impl InstallerError {
    /// The failure category this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedSpec(_) => ErrorKind::MalformedSpec,
            Self::Network(_) => ErrorKind::Network,
            Self::Integrity(_) => ErrorKind::Integrity,
            Self::Extraction { .. } | Self::Install { .. } | Self::IncompatibleRuntime { .. } => {
                ErrorKind::Install
            }
            Self::Environment { .. } | Self::RootLocked { .. } => ErrorKind::Environment,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Config { .. } => ErrorKind::Config,
            Self::Io(_) | Self::WriteFailed { .. } => ErrorKind::Io,
        }
    }
}

/// Failure categories named in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The plan is malformed.
    MalformedSpec,
    /// Fetching failed after retries.
    Network,
    /// A digest did not match.
    Integrity,
    /// Unpacking or installing a package failed.
    Install,
    /// The isolated environment could not be created.
    Environment,
    /// The run was cancelled.
    Cancelled,
    /// The configuration is invalid.
    Config,
    /// A local I/O operation failed.
    Io,
}

impl ErrorKind {
    /// The report name of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedSpec => "MalformedSpecError",
            Self::Network => "NetworkError",
            Self::Integrity => "IntegrityError",
            Self::Install => "InstallError",
            Self::Environment => "EnvironmentError",
            Self::Cancelled => "Cancelled",
            Self::Config => "ConfigError",
            Self::Io => "IoError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias using [`InstallerError`].
pub type Result<T> = std::result::Result<T, InstallerError>;
