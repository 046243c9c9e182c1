//! The JSON receipt written into a completed install root.

use crate::error::Result;
use crate::spec::{InstallPlan, RuntimeVersion};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// File name of the receipt inside an install root.
pub const RECEIPT_FILE: &str = "INSTALL_RECEIPT.json";

/// Record of what was installed into a root, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReceipt {
    /// Name of the primary package.
    pub formula: String,
    /// Completion time in seconds since the Unix epoch.
    pub installed_at: u64,
    /// Interpreter version the environment was built with.
    pub runtime_version: String,
    /// Every installed package, in install order.
    pub packages: Vec<ReceiptPackage>,
}

/// One installed package in an [`InstallReceipt`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptPackage {
    /// Package name as declared.
    pub name: String,
    /// Source URL the archive was fetched from.
    pub url: String,
    /// Verified SHA-256 digest of the archive.
    pub sha256: String,
    /// `primary` or `resource`.
    pub role: String,
}

impl InstallReceipt {
    /// Describe a completed installation of `plan`.
    #[must_use]
    pub fn for_plan(plan: &InstallPlan, runtime: RuntimeVersion, installed_at: SystemTime) -> Self {
        Self {
            formula: plan.name().to_string(),
            installed_at: installed_at
                .duration_since(UNIX_EPOCH)
                .map_or(0, |elapsed| elapsed.as_secs()),
            runtime_version: runtime.to_string(),
            packages: plan
                .specs()
                .map(|(role, spec)| ReceiptPackage {
                    name: spec.name().to_string(),
                    url: spec.url().to_string(),
                    sha256: spec.sha256().to_string(),
                    role: role.to_string(),
                })
                .collect(),
        }
    }

    /// Write the receipt into `root` and return its path.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::InstallerError::Io`] if serialization or the
    /// write fails.
    pub fn write_to(&self, root: &Utf8Path) -> Result<Utf8PathBuf> {
        let path = root.join(RECEIPT_FILE);
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(&path, json + "\n")?;
        Ok(path)
    }

    /// Read the receipt from `root`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::InstallerError::Io`] if the receipt is
    /// missing or not valid JSON.
    pub fn read_from(root: &Utf8Path) -> Result<Self> {
        let json = std::fs::read_to_string(root.join(RECEIPT_FILE))?;
        Ok(serde_json::from_str(&json).map_err(std::io::Error::other)?)
    }
}
