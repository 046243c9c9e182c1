//! Output formatting for the installer CLI.
//!
//! Progress lines, the success summary, failure reports, and dry-run
//! information all go to stderr. Only `venvpin show` writes to stdout.

use crate::orchestrator::{InstallReport, PlanFailure};
use crate::spec::InstallPlan;
use camino::Utf8Path;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; a closed stderr must not abort the install.
    }
}

/// Format a success message after installation.
///
/// # Example
///
/// ```
/// use camino::Utf8Path;
/// use venvpin_installer::output::success_message;
///
/// let message = success_message(15, Utf8Path::new("/opt/airiam/libexec"));
/// assert_eq!(message, "Successfully installed 15 packages to /opt/airiam/libexec");
/// ```
#[must_use]
pub fn success_message(count: usize, root: &Utf8Path) -> String {
    let plural = if count == 1 { "package" } else { "packages" };
    format!("Successfully installed {count} {plural} to {root}")
}

/// Format a success message after a fetch-only run.
#[must_use]
pub fn fetched_message(count: usize) -> String {
    let plural = if count == 1 { "archive" } else { "archives" };
    format!("Fetched and verified {count} {plural}")
}

/// Format the error line printed when a plan fails.
#[must_use]
pub fn failure_message(failure: &PlanFailure) -> String {
    format!("Error: {failure}")
}

/// Print the final summary of a run and return its exit code.
pub fn report_outcome(report: &InstallReport, quiet: bool, stderr: &mut dyn Write) -> i32 {
    match report.failure() {
        Some(failure) => write_stderr_line(stderr, failure_message(failure)),
        None if quiet => {}
        None => {
            let count = report.completed().len();
            match report.root() {
                Some(root) => write_stderr_line(stderr, success_message(count, root)),
                None => write_stderr_line(stderr, fetched_message(count)),
            }
        }
    }
    report.exit_code()
}

/// Settings shown by `--dry-run`.
///
/// # Example
///
/// ```
/// use camino::Utf8Path;
/// use venvpin_installer::formula::builtin_plan;
/// use venvpin_installer::output::DryRunInfo;
///
/// let plan = builtin_plan().expect("built-in formula");
/// let info = DryRunInfo {
///     plan: &plan,
///     root: Utf8Path::new("/opt/airiam/libexec"),
///     cache_dir: None,
///     python: "python3",
///     attempts: 3,
///     quiet: false,
/// };
///
/// let output = info.display_text();
/// assert!(output.contains("Dry run"));
/// assert!(output.contains("boto3"));
/// ```
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// The plan that would be installed.
    pub plan: &'a InstallPlan,
    /// The install root that would be created.
    pub root: &'a Utf8Path,
    /// The download cache, or `None` when caching is off.
    pub cache_dir: Option<&'a Utf8Path>,
    /// The interpreter that would create the environment.
    pub python: &'a str,
    /// Fetch attempts per archive.
    pub attempts: u32,
    /// Whether quiet mode is enabled.
    pub quiet: bool,
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let metadata = self.plan.metadata();
        let mut lines = vec![
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Formula: {}", self.plan.name()),
        ];
        if let Some(description) = metadata.description() {
            lines.push(format!("Description: {description}"));
        }
        lines.extend([
            format!("Install root: {}", self.root),
            format!(
                "Interpreter: {} (>= {})",
                self.python,
                metadata.min_runtime_version()
            ),
            format!(
                "Download cache: {}",
                self.cache_dir.map_or("disabled".to_owned(), ToString::to_string)
            ),
            format!("Fetch attempts: {}", self.attempts),
            format!("Quiet: {}", self.quiet),
            String::new(),
            format!("Packages to install ({}):", self.plan.len()),
        ]);
        for (role, spec) in self.plan.specs() {
            lines.push(format!("  - {} [{role}] sha256:{}", spec.name(), spec.sha256()));
        }

        lines.join("\n")
    }
}
