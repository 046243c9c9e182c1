//! Building a Python virtual environment and installing archives into it.

use super::extraction::{
    ArchiveFormat, ExtractionError, SDIST_METADATA_FILES, find_sdist_project, has_wheel_metadata,
    unpack,
};
use super::root::InstallRoot;
use super::runtime::probe_runtime;
use crate::error::{InstallerError, Result};
use crate::exec::{CommandExecutor, stderr_tail};
use crate::spec::{DependencySpec, FormulaMetadata, RuntimeVersion};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::process::Output;

const STDERR_TAIL_LINES: usize = 5;

/// Creates isolated install roots and installs verified archives into them.
#[cfg_attr(test, mockall::automock)]
pub trait EnvironmentBuilder {
    /// Allocate a fresh, exclusively owned install root.
    ///
    /// # Errors
    ///
    /// Returns an `EnvironmentError`-kind [`InstallerError`] if the
    /// isolation facility is unavailable or the root is in use, and
    /// [`InstallerError::IncompatibleRuntime`] if the interpreter is too old.
    fn create_root(&self) -> Result<InstallRoot>;

    /// Unpack `archive` and install it into `root`.
    ///
    /// # Errors
    ///
    /// Returns an `InstallError`-kind [`InstallerError`] on unpack failure,
    /// missing build metadata, or an incompatible runtime.
    fn install(&self, root: &InstallRoot, archive: &[u8], spec: &DependencySpec) -> Result<()>;
}

/// [`EnvironmentBuilder`] backed by `python -m venv` and `pip`.
pub struct VirtualenvBuilder<'a> {
    executor: &'a dyn CommandExecutor,
    root: Utf8PathBuf,
    python: String,
    min_runtime: RuntimeVersion,
}

impl<'a> VirtualenvBuilder<'a> {
    /// Build environments at `root` with the interpreter and minimum
    /// version `metadata` names.
    #[must_use]
    pub fn new(
        executor: &'a dyn CommandExecutor,
        root: &Utf8Path,
        metadata: &FormulaMetadata,
    ) -> Self {
        Self {
            executor,
            root: root.to_owned(),
            python: metadata.runtime().to_owned(),
            min_runtime: metadata.min_runtime_version(),
        }
    }

    /// Use a specific interpreter instead of the one the plan names.
    #[must_use]
    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    /// The interpreter used to create environments.
    #[must_use]
    pub fn python(&self) -> &str {
        &self.python
    }

    fn create_venv(&self, root: &InstallRoot) -> Result<()> {
        let output = self
            .executor
            .run(&self.python, &["-m", "venv", root.path().as_str()])
            .map_err(|e| InstallerError::Environment {
                reason: format!("failed to run `{} -m venv`: {e}", self.python),
            })?;
        if !output.status.success() {
            return Err(InstallerError::Environment {
                reason: format!(
                    "`{} -m venv` failed: {}",
                    self.python,
                    stderr_tail(&output, STDERR_TAIL_LINES)
                ),
            });
        }
        Ok(())
    }

    fn prepare_target(
        &self,
        root: &InstallRoot,
        archive: &[u8],
        spec: &DependencySpec,
    ) -> Result<Utf8PathBuf> {
        let package = spec.name().to_string();
        let extraction = |source: ExtractionError| InstallerError::Extraction {
            package: package.clone(),
            source,
        };

        let file_name = spec.url().file_name().unwrap_or_default();
        let format = ArchiveFormat::require(file_name).map_err(extraction)?;

        let build_dir = root.build_dir();
        let unpack_dir = build_dir.join(spec.name().as_str());
        if unpack_dir.exists() {
            fs::remove_dir_all(&unpack_dir)?;
        }
        unpack(format, archive, unpack_dir.as_std_path()).map_err(extraction)?;
        log::debug!("unpacked {package} into {unpack_dir}");

        if format == ArchiveFormat::Wheel {
            if !has_wheel_metadata(unpack_dir.as_std_path())? {
                return Err(InstallerError::Install {
                    package,
                    reason: "wheel has no *.dist-info/METADATA".to_owned(),
                });
            }
            let wheel = build_dir.join(file_name);
            fs::write(&wheel, archive)?;
            return Ok(wheel);
        }

        let project = find_sdist_project(unpack_dir.as_std_path())?.ok_or_else(|| {
            InstallerError::Install {
                package: package.clone(),
                reason: format!(
                    "no build metadata ({}) in source archive",
                    SDIST_METADATA_FILES.join(", ")
                ),
            }
        })?;
        Utf8PathBuf::try_from(project).map_err(|e| InstallerError::Install {
            package,
            reason: format!("unpacked path is not UTF-8: {e}"),
        })
    }

    fn pip_install(&self, root: &InstallRoot, target: &Utf8Path, spec: &DependencySpec) -> Result<()> {
        let python = root.python();
        let output = self
            .executor
            .run(
                python.as_str(),
                &[
                    "-m",
                    "pip",
                    "install",
                    "--no-deps",
                    "--ignore-installed",
                    "--no-input",
                    target.as_str(),
                ],
            )
            .map_err(|e| InstallerError::Install {
                package: spec.name().to_string(),
                reason: format!("failed to run pip: {e}"),
            })?;

        if output.status.success() {
            return Ok(());
        }
        Err(pip_failure(&output, root.runtime(), spec))
    }
}

impl EnvironmentBuilder for VirtualenvBuilder<'_> {
    fn create_root(&self) -> Result<InstallRoot> {
        let found = probe_runtime(self.executor, &self.python)?;
        if !found.satisfies(&self.min_runtime) {
            return Err(InstallerError::IncompatibleRuntime {
                required: format!(">={}", self.min_runtime),
                found,
            });
        }
        log::info!("using {} {found}", self.python);

        let root = InstallRoot::acquire(&self.root, found)?;
        if let Err(err) = self.create_venv(&root) {
            root.mark_failed()?;
            return Err(err);
        }
        log::info!("created virtual environment at {}", root.path());
        Ok(root)
    }

    fn install(&self, root: &InstallRoot, archive: &[u8], spec: &DependencySpec) -> Result<()> {
        let target = self.prepare_target(root, archive, spec)?;
        self.pip_install(root, &target, spec)?;
        log::debug!("pip installed {} from {target}", spec.name());
        Ok(())
    }
}

fn pip_failure(output: &Output, runtime: RuntimeVersion, spec: &DependencySpec) -> InstallerError {
    let combined = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    if mentions_requires_python(&combined) {
        return InstallerError::IncompatibleRuntime {
            required: required_python(&combined)
                .unwrap_or_else(|| format!("the Requires-Python of {}", spec.name())),
            found: runtime,
        };
    }
    InstallerError::Install {
        package: spec.name().to_string(),
        reason: format!(
            "pip exited with {}: {}",
            output.status,
            stderr_tail(output, STDERR_TAIL_LINES)
        ),
    }
}

fn mentions_requires_python(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.contains("requires-python") || lower.contains("requires a different python")
}

/// Extract the specifier from pip's `... not in '>=3.8'` phrasing.
fn required_python(text: &str) -> Option<String> {
    let (_, rest) = text.split_once("not in")?;
    let rest = rest.trim_start_matches([':', ' ']);
    let quote = rest.chars().next().filter(|c| matches!(c, '\'' | '"'))?;
    let inner = &rest[quote.len_utf8()..];
    let end = inner.find(quote)?;
    Some(inner[..end].to_owned())
}

#[cfg(test)]
#[path = "virtualenv_tests.rs"]
mod tests;
