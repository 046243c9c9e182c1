//! Exclusive ownership and state tracking of an install root.

use crate::error::{InstallerError, Result};
use crate::spec::RuntimeVersion;
use camino::{Utf8Path, Utf8PathBuf};
use fs2::FileExt;
use std::fmt;
use std::fs;
use std::io;

/// Name of the marker file recording a root's [`RootState`].
pub const STATE_MARKER: &str = ".venvpin-state";

const BUILD_DIR: &str = "build";

/// Lifecycle of an install root, as recorded in its state marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootState {
    /// An installation is in progress or was interrupted.
    Installing,
    /// Every package was installed.
    Done,
    /// The installation stopped on an error; the root is incomplete.
    Failed,
}

impl RootState {
    /// The marker file contents for this state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Installing => "installing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "installing" => Some(Self::Installing),
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for RootState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An install root owned by one plan execution.
///
/// Ownership is an exclusive advisory lock on the sibling file
/// `<parent>/.<root name>.lock`, held for the lifetime of this value. The
/// lock lives outside the root so clearing or recreating the root cannot
/// release it.
#[derive(Debug)]
pub struct InstallRoot {
    path: Utf8PathBuf,
    runtime: RuntimeVersion,
    _lock: fs::File,
}

impl InstallRoot {
    /// Lock `path`, clear anything a previous run left behind, and mark it
    /// as installing.
    ///
    /// A non-empty directory is only cleared if it carries a state marker,
    /// so an unrelated directory is never wiped.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::RootLocked`] if another execution holds the
    /// lock, and [`InstallerError::Environment`] if the path is unusable or
    /// holds foreign content.
    pub fn acquire(path: &Utf8Path, runtime: RuntimeVersion) -> Result<Self> {
        let lock_path = lock_path(path)?;
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| environment(path, &e))?;
        }
        let lock = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| environment(path, &e))?;
        if let Err(e) = lock.try_lock_exclusive() {
            if e.kind() == fs2::lock_contended_error().kind() {
                return Err(InstallerError::RootLocked {
                    path: path.to_owned(),
                });
            }
            return Err(environment(path, &e));
        }
        log::debug!("locked install root {path} via {lock_path}");

        clear_previous(path)?;
        fs::create_dir_all(path).map_err(|e| environment(path, &e))?;

        let root = Self {
            path: path.to_owned(),
            runtime,
            _lock: lock,
        };
        root.mark(RootState::Installing)?;
        Ok(root)
    }

    /// The root directory.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// The interpreter version the root was created with.
    #[must_use]
    pub fn runtime(&self) -> RuntimeVersion {
        self.runtime
    }

    /// The environment's own interpreter.
    #[must_use]
    pub fn python(&self) -> Utf8PathBuf {
        if cfg!(windows) {
            self.path.join("Scripts").join("python.exe")
        } else {
            self.path.join("bin").join("python")
        }
    }

    /// Scratch directory where archives are unpacked before installation.
    #[must_use]
    pub fn build_dir(&self) -> Utf8PathBuf {
        self.path.join(BUILD_DIR)
    }

    /// Read the state marker.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Io`] if the marker cannot be read.
    pub fn state(&self) -> Result<Option<RootState>> {
        read_state(&self.path)
    }

    /// Record `state` in the marker file.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Io`] if the marker cannot be written.
    pub fn mark(&self, state: RootState) -> Result<()> {
        fs::write(self.path.join(STATE_MARKER), state.as_str())?;
        log::debug!("install root {} marked {state}", self.path);
        Ok(())
    }

    /// Mark the root complete.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Io`] if the marker cannot be written.
    pub fn mark_done(&self) -> Result<()> {
        self.mark(RootState::Done)
    }

    /// Mark the root as left behind by a failed installation.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Io`] if the marker cannot be written.
    pub fn mark_failed(&self) -> Result<()> {
        self.mark(RootState::Failed)
    }
}

/// Read the state marker of the root at `path`, if it has one.
///
/// # Errors
///
/// Returns [`InstallerError::Io`] if the marker exists but cannot be read.
pub fn read_state(path: &Utf8Path) -> Result<Option<RootState>> {
    match fs::read_to_string(path.join(STATE_MARKER)) {
        Ok(contents) => Ok(RootState::parse(&contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn lock_path(path: &Utf8Path) -> Result<Utf8PathBuf> {
    sibling(path, "lock")
}

/// Where a previous root is moved before it is deleted.
fn stale_path(path: &Utf8Path) -> Result<Utf8PathBuf> {
    sibling(path, "stale")
}

fn sibling(path: &Utf8Path, suffix: &str) -> Result<Utf8PathBuf> {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return Err(InstallerError::Environment {
            reason: format!("{path} cannot be used as an install root"),
        });
    };
    Ok(parent.join(format!(".{name}.{suffix}")))
}

/// Empty `path` if a previous run left it behind.
///
/// The old root is renamed aside in one step and deleted from there, so an
/// interrupted wipe never leaves a partial root without its state marker.
/// Leftovers from such an interruption are removed first.
fn clear_previous(path: &Utf8Path) -> Result<()> {
    let stale = stale_path(path)?;
    if stale.exists() {
        log::info!("removing leftovers of an interrupted clear at {stale}");
        fs::remove_dir_all(&stale).map_err(|e| environment(path, &e))?;
    }

    let mut entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(environment(path, &e)),
    };
    if entries.next().is_none() {
        return Ok(());
    }
    if !path.join(STATE_MARKER).is_file() {
        return Err(InstallerError::Environment {
            reason: format!("{path} is not empty and was not created by venvpin"),
        });
    }
    log::info!("clearing previous install root {path}");
    fs::rename(path, &stale).map_err(|e| environment(path, &e))?;
    fs::remove_dir_all(&stale).map_err(|e| environment(path, &e))
}

fn environment(path: &Utf8Path, err: &io::Error) -> InstallerError {
    InstallerError::Environment {
        reason: format!("cannot prepare install root {path}: {err}"),
    }
}
