//! Interpreter discovery.

use crate::error::{InstallerError, Result};
use crate::exec::{CommandExecutor, stderr_tail};
use crate::spec::RuntimeVersion;
use std::io;

/// Run `<python> --version` and parse the reported version.
///
/// # Errors
///
/// Returns [`InstallerError::Environment`] if the interpreter cannot be
/// started, exits unsuccessfully, or prints something that is not a
/// version.
pub fn probe_runtime(executor: &dyn CommandExecutor, python: &str) -> Result<RuntimeVersion> {
    let output = executor.run(python, &["--version"]).map_err(|e| {
        let reason = if e.kind() == io::ErrorKind::NotFound {
            format!("interpreter `{python}` not found")
        } else {
            format!("failed to run `{python} --version`: {e}")
        };
        InstallerError::Environment { reason }
    })?;

    if !output.status.success() {
        return Err(InstallerError::Environment {
            reason: format!(
                "`{python} --version` failed: {}",
                stderr_tail(&output, 3)
            ),
        });
    }

    // Interpreters before 3.4 print the banner to stderr.
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    parse_version_banner(&stdout)
        .or_else(|| parse_version_banner(&stderr))
        .ok_or_else(|| InstallerError::Environment {
            reason: format!(
                "could not read a version from `{python} --version`: {}",
                stdout.trim()
            ),
        })
}

/// Parse a `Python X.Y.Z` banner.
///
/// # Examples
///
/// ```
/// use venvpin_installer::environment::parse_version_banner;
/// use venvpin_installer::spec::RuntimeVersion;
///
/// assert_eq!(
///     parse_version_banner("Python 3.11.4\n"),
///     Some(RuntimeVersion::new(3, 11, 4))
/// );
/// assert_eq!(parse_version_banner("bash: python3: not found"), None);
/// ```
#[must_use]
pub fn parse_version_banner(banner: &str) -> Option<RuntimeVersion> {
    banner.lines().find_map(|line| {
        let version = line.trim().strip_prefix("Python ")?;
        version.split_whitespace().next()?.parse().ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ExpectedCall, StubExecutor, failure_output, output_with_stdout};
    use rstest::rstest;

    #[rstest]
    #[case("Python 3.7.17", Some(RuntimeVersion::new(3, 7, 17)))]
    #[case("Python 3.13.0rc1\n", Some(RuntimeVersion::new(3, 13, 0)))]
    #[case("Python 3.12.1 (main, Jan  1 2024)", Some(RuntimeVersion::new(3, 12, 1)))]
    #[case("", None)]
    #[case("Python", None)]
    #[case("PyPy 7.3", None)]
    fn parses_banners(#[case] banner: &str, #[case] expected: Option<RuntimeVersion>) {
        assert_eq!(parse_version_banner(banner), expected);
    }

    #[test]
    fn probe_reads_stdout() {
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "python3",
            &["--version"],
            Ok(output_with_stdout("Python 3.10.12\n")),
        )]);
        let version = probe_runtime(&executor, "python3").expect("probe");
        assert_eq!(version, RuntimeVersion::new(3, 10, 12));
        executor.assert_finished();
    }

    #[test]
    fn probe_falls_back_to_stderr_banner() {
        let mut output = output_with_stdout("");
        output.stderr = b"Python 2.7.18\n".to_vec();
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "python",
            &["--version"],
            Ok(output),
        )]);
        let version = probe_runtime(&executor, "python").expect("probe");
        assert_eq!(version, RuntimeVersion::new(2, 7, 18));
    }

    #[test]
    fn missing_interpreter_is_environment_error() {
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "python3",
            &["--version"],
            Err(io::Error::from(io::ErrorKind::NotFound)),
        )]);
        let err = probe_runtime(&executor, "python3").expect_err("missing");
        assert!(matches!(err, InstallerError::Environment { .. }));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn failing_interpreter_is_environment_error() {
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "python3",
            &["--version"],
            Ok(failure_output("broken install")),
        )]);
        let err = probe_runtime(&executor, "python3").expect_err("failed");
        assert!(err.to_string().contains("broken install"));
    }
}
