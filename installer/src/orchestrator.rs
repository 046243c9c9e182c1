//! Sequencing of fetch, verify, and install across an install plan.
//!
//! Each spec moves through `Pending → Fetching → Verifying → Installing →
//! Done`. The first error moves that spec to `Failed`, aborts the rest of the
//! plan, and leaves the install root marked failed. There is no rollback.
//!
//! Network failures are retried inside the fetcher; by the time an error
//! reaches the orchestrator it is final.

use crate::environment::{EnvironmentBuilder, InstallRoot};
use crate::error::{ErrorKind, InstallerError};
use crate::fetch::ArchiveFetcher;
use crate::output::write_stderr_line;
use crate::receipt::InstallReceipt;
use crate::spec::{DependencySpec, InstallPlan};
use crate::verify::Sha256Verifier;
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

/// Where a spec is in its fetch-verify-install lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallState {
    /// Not started.
    Pending,
    /// Downloading the archive.
    Fetching,
    /// Checking the archive digest.
    Verifying,
    /// Unpacking and installing into the root.
    Installing,
    /// Finished successfully.
    Done,
    /// Stopped on an error.
    Failed,
}

impl InstallState {
    /// Return true for `Done` and `Failed`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Verifying => "verifying",
            Self::Installing => "installing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// A shared flag that stops an installation before its next spec.
///
/// Clones share the flag, so one clone can be handed to a signal handler
/// while the orchestrator holds another.
///
/// # Examples
///
/// ```
/// use venvpin_installer::orchestrator::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create an unset token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Return true once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One recorded state change of one spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The spec's package name.
    pub package: String,
    /// State before the change.
    pub from: InstallState,
    /// State after the change.
    pub to: InstallState,
}

/// Why a plan stopped.
#[derive(Debug)]
pub struct PlanFailure {
    /// The failing spec, or `None` when the failure was not tied to one
    /// (such as the root not being creatable).
    pub package: Option<String>,
    /// The state the failing spec (or the plan) was in.
    pub state: InstallState,
    /// The underlying error.
    pub error: InstallerError,
}

impl PlanFailure {
    /// The failure category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

impl fmt::Display for PlanFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.package {
            Some(package) => write!(
                f,
                "{package} failed while {}: {}: {}",
                self.state,
                self.kind(),
                self.error
            ),
            None => write!(f, "{}: {}", self.kind(), self.error),
        }
    }
}

/// The aggregate result of running a plan.
#[derive(Debug)]
pub enum InstallOutcome {
    /// Every spec reached `Done`.
    Done {
        /// The populated install root; `None` for fetch-only runs.
        root: Option<Utf8PathBuf>,
        /// Package names in the order they completed.
        installed: Vec<String>,
    },
    /// The plan stopped at the first failure.
    Failed(PlanFailure),
}

/// Outcome plus the full transition history of a run.
#[derive(Debug)]
pub struct InstallReport {
    /// How the run ended.
    pub outcome: InstallOutcome,
    /// Every state change, in order.
    pub transitions: Vec<Transition>,
}

impl InstallReport {
    /// Return true if every spec reached `Done`.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self.outcome, InstallOutcome::Done { .. })
    }

    /// The failure, if the run failed.
    #[must_use]
    pub fn failure(&self) -> Option<&PlanFailure> {
        match &self.outcome {
            InstallOutcome::Failed(failure) => Some(failure),
            InstallOutcome::Done { .. } => None,
        }
    }

    /// The populated install root of a successful install run.
    #[must_use]
    pub fn root(&self) -> Option<&Utf8Path> {
        match &self.outcome {
            InstallOutcome::Done { root, .. } => root.as_deref(),
            InstallOutcome::Failed(_) => None,
        }
    }

    /// Packages that reached `Done`, in order.
    #[must_use]
    pub fn completed(&self) -> Vec<&str> {
        self.transitions
            .iter()
            .filter(|t| t.to == InstallState::Done)
            .map(|t| t.package.as_str())
            .collect()
    }

    /// States `package` passed through, in order, excluding `Pending`.
    #[must_use]
    pub fn states_of(&self, package: &str) -> Vec<InstallState> {
        self.transitions
            .iter()
            .filter(|t| t.package == package)
            .map(|t| t.to)
            .collect()
    }

    /// Process exit code: 0 on success, 1 on failure.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.is_done())
    }
}

/// Runs install plans against a fetcher and an environment builder.
pub struct InstallOrchestrator<'a> {
    fetcher: &'a dyn ArchiveFetcher,
    builder: &'a dyn EnvironmentBuilder,
    verifier: Sha256Verifier,
    cancellation: CancellationToken,
    quiet: bool,
}

impl<'a> InstallOrchestrator<'a> {
    /// Create an orchestrator over the given collaborators.
    #[must_use]
    pub fn new(fetcher: &'a dyn ArchiveFetcher, builder: &'a dyn EnvironmentBuilder) -> Self {
        Self {
            fetcher,
            builder,
            verifier: Sha256Verifier,
            cancellation: CancellationToken::new(),
            quiet: false,
        }
    }

    /// Create an orchestrator for [`Self::fetch_only`] runs.
    ///
    /// [`Self::install`] on the result fails with an environment error.
    #[must_use]
    pub fn without_environment(fetcher: &'a dyn ArchiveFetcher) -> Self {
        Self::new(fetcher, &NoEnvironment)
    }

    /// Observe `token` before each spec's fetch.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Suppress progress lines.
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Fetch, verify, and install every spec of `plan` into a fresh root.
    ///
    /// Progress lines go to `stderr` unless quiet. On success the receipt
    /// is written and the root marked done; on failure the root (if one was
    /// created) is marked failed.
    pub fn install(&self, plan: &InstallPlan, stderr: &mut dyn Write) -> InstallReport {
        let mut run = Run::new(self.quiet, stderr);

        let root = match self.builder.create_root() {
            Ok(root) => root,
            Err(error) => {
                return run.finish(Err(PlanFailure {
                    package: None,
                    state: InstallState::Pending,
                    error,
                }));
            }
        };

        let result = self
            .process_all(plan, Some(&root), &mut run)
            .and_then(|installed| finalize(plan, &root, installed));

        if let Err(failure) = &result {
            log::error!("installation into {} failed: {failure}", root.path());
            if let Err(err) = root.mark_failed() {
                log::warn!("could not mark {} failed: {err}", root.path());
            }
        }
        run.finish(result)
    }

    /// Fetch and verify every spec of `plan` without creating a root.
    pub fn fetch_only(&self, plan: &InstallPlan, stderr: &mut dyn Write) -> InstallReport {
        let mut run = Run::new(self.quiet, stderr);
        let result = self
            .process_all(plan, None, &mut run)
            .map(|installed| (None, installed));
        if let Err(failure) = &result {
            log::error!("fetch failed: {failure}");
        }
        run.finish(result)
    }

    fn process_all(
        &self,
        plan: &InstallPlan,
        root: Option<&InstallRoot>,
        run: &mut Run<'_>,
    ) -> Result<Vec<String>, PlanFailure> {
        let mut completed = Vec::with_capacity(plan.len());
        for (role, spec) in plan.specs() {
            log::debug!("processing {role} {spec}");
            self.process(spec, root, run)?;
            completed.push(spec.name().to_string());
        }
        Ok(completed)
    }

    fn process(
        &self,
        spec: &DependencySpec,
        root: Option<&InstallRoot>,
        run: &mut Run<'_>,
    ) -> Result<(), PlanFailure> {
        let package = spec.name().to_string();
        let mut state = InstallState::Pending;

        if self.cancellation.is_cancelled() {
            let error = InstallerError::Cancelled {
                package: package.clone(),
            };
            return Err(run.fail(&package, state, error));
        }

        state = run.transition(&package, state, InstallState::Fetching);
        run.progress(format!("Fetching {package}..."));
        let bytes = match self.fetcher.fetch(spec.url()) {
            Ok(bytes) => bytes,
            Err(err) => return Err(run.fail(&package, state, err.into())),
        };

        state = run.transition(&package, state, InstallState::Verifying);
        if let Err(err) = self.verifier.verify(&bytes, spec.sha256()) {
            if let Err(discard) = self.fetcher.discard(spec.url()) {
                log::warn!("could not discard cached {}: {discard}", spec.url());
            }
            return Err(run.fail(&package, state, err.into()));
        }

        if let Some(root) = root {
            state = run.transition(&package, state, InstallState::Installing);
            run.progress(format!("Installing {package}..."));
            if let Err(err) = self.builder.install(root, &bytes, spec) {
                return Err(run.fail(&package, state, err));
            }
        }

        run.transition(&package, state, InstallState::Done);
        log::info!("{package} {}", if root.is_some() { "installed" } else { "verified" });
        Ok(())
    }
}

struct NoEnvironment;

impl EnvironmentBuilder for NoEnvironment {
    fn create_root(&self) -> crate::error::Result<InstallRoot> {
        Err(no_environment())
    }

    fn install(
        &self,
        _root: &InstallRoot,
        _archive: &[u8],
        _spec: &DependencySpec,
    ) -> crate::error::Result<()> {
        Err(no_environment())
    }
}

fn no_environment() -> InstallerError {
    InstallerError::Environment {
        reason: "no environment builder configured".to_owned(),
    }
}

fn finalize(
    plan: &InstallPlan,
    root: &InstallRoot,
    installed: Vec<String>,
) -> Result<(Option<Utf8PathBuf>, Vec<String>), PlanFailure> {
    let plan_failure = |error| PlanFailure {
        package: None,
        state: InstallState::Done,
        error,
    };
    let receipt = InstallReceipt::for_plan(plan, root.runtime(), SystemTime::now());
    let receipt_path = receipt.write_to(root.path()).map_err(plan_failure)?;
    root.mark_done().map_err(plan_failure)?;
    log::info!("wrote {receipt_path}");
    Ok((Some(root.path().to_owned()), installed))
}

/// Mutable bookkeeping for one run.
struct Run<'w> {
    quiet: bool,
    stderr: &'w mut dyn Write,
    transitions: Vec<Transition>,
}

impl<'w> Run<'w> {
    fn new(quiet: bool, stderr: &'w mut dyn Write) -> Self {
        Self {
            quiet,
            stderr,
            transitions: Vec::new(),
        }
    }

    fn transition(&mut self, package: &str, from: InstallState, to: InstallState) -> InstallState {
        log::debug!("{package}: {from} -> {to}");
        self.transitions.push(Transition {
            package: package.to_owned(),
            from,
            to,
        });
        to
    }

    fn fail(&mut self, package: &str, state: InstallState, error: InstallerError) -> PlanFailure {
        self.transition(package, state, InstallState::Failed);
        PlanFailure {
            package: Some(package.to_owned()),
            state,
            error,
        }
    }

    fn progress(&mut self, message: String) {
        if !self.quiet {
            write_stderr_line(self.stderr, message);
        }
    }

    fn finish(
        self,
        result: Result<(Option<Utf8PathBuf>, Vec<String>), PlanFailure>,
    ) -> InstallReport {
        let outcome = match result {
            Ok((root, installed)) => InstallOutcome::Done { root, installed },
            Err(failure) => InstallOutcome::Failed(failure),
        };
        InstallReport {
            outcome,
            transitions: self.transitions,
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
