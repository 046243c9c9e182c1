//! Shared test utilities for the installer crate.

use crate::environment::{EnvironmentBuilder, InstallRoot};
use crate::error::{InstallerError, Result};
use crate::exec::CommandExecutor;
use crate::fetch::{ArchiveFetcher, FetchError};
use crate::spec::{DependencySpec, RuntimeVersion, SourceUrl};
use crate::verify::compute_sha256;
use camino::Utf8PathBuf;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::{self, Write};
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
pub fn success_output() -> Output {
    output_with_stdout("")
}

/// Creates a successful command `Output` with the given stdout.
pub fn output_with_stdout(stdout: &str) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The command to execute (e.g., "python3").
    pub cmd: String,
    /// The arguments to pass to the command.
    pub args: Vec<String>,
    /// The result to return when this command is invoked.
    pub result: io::Result<Output>,
}

impl ExpectedCall {
    /// Expect `cmd` to be run with exactly `args`.
    pub fn new(cmd: impl Into<String>, args: &[&str], result: io::Result<Output>) -> Self {
        Self {
            cmd: cmd.into(),
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
            result,
        }
    }
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify command execution without side effects.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output> {
        let mut expected = self.expected.borrow_mut();
        let call = expected
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected command invocation: {cmd} {args:?}"));

        assert_eq!(call.cmd, cmd);
        assert_eq!(call.args, args);

        call.result
    }
}

/// An `ArchiveFetcher` that replays scripted responses per URL and records
/// every call.
///
/// URLs without a script fail with HTTP 404.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    scripts: RefCell<HashMap<String, VecDeque<std::result::Result<Vec<u8>, FetchError>>>>,
    fetched: RefCell<Vec<String>>,
    discarded: RefCell<Vec<String>>,
}

impl ScriptedFetcher {
    /// Create a fetcher with no scripts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next fetch of `url`.
    pub fn respond(&self, url: &str, response: std::result::Result<Vec<u8>, FetchError>) {
        self.scripts
            .borrow_mut()
            .entry(url.to_owned())
            .or_default()
            .push_back(response);
    }

    /// Every URL fetched, in call order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.borrow().clone()
    }

    /// How many times `url` was fetched.
    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetched.borrow().iter().filter(|u| *u == url).count()
    }

    /// Every URL discarded, in call order.
    pub fn discarded(&self) -> Vec<String> {
        self.discarded.borrow().clone()
    }
}

impl ArchiveFetcher for ScriptedFetcher {
    fn fetch(&self, url: &SourceUrl) -> std::result::Result<Vec<u8>, FetchError> {
        self.fetched.borrow_mut().push(url.to_string());
        self.scripts
            .borrow_mut()
            .get_mut(url.as_str())
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                })
            })
    }

    fn discard(&self, url: &SourceUrl) -> std::result::Result<(), FetchError> {
        self.discarded.borrow_mut().push(url.to_string());
        Ok(())
    }
}

/// An `EnvironmentBuilder` that locks a real root but runs no interpreter,
/// recording the packages it is asked to install.
#[derive(Debug)]
pub struct RecordingBuilder {
    root: Utf8PathBuf,
    runtime: RuntimeVersion,
    fail_on: Option<String>,
    installed: RefCell<Vec<String>>,
}

impl RecordingBuilder {
    /// Create roots at `root`.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            runtime: RuntimeVersion::new(3, 11, 4),
            fail_on: None,
            installed: RefCell::new(Vec::new()),
        }
    }

    /// Fail with an install error when asked to install `package`.
    #[must_use]
    pub fn failing_on(mut self, package: &str) -> Self {
        self.fail_on = Some(package.to_owned());
        self
    }

    /// Packages installed so far, in call order.
    pub fn installed(&self) -> Vec<String> {
        self.installed.borrow().clone()
    }
}

impl EnvironmentBuilder for RecordingBuilder {
    fn create_root(&self) -> Result<InstallRoot> {
        InstallRoot::acquire(&self.root, self.runtime)
    }

    fn install(&self, _root: &InstallRoot, _archive: &[u8], spec: &DependencySpec) -> Result<()> {
        let name = spec.name().to_string();
        if self.fail_on.as_deref() == Some(name.as_str()) {
            return Err(InstallerError::Install {
                package: name,
                reason: "scripted failure".to_owned(),
            });
        }
        self.installed.borrow_mut().push(name);
        Ok(())
    }
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    compute_sha256(bytes).into_inner()
}

/// The URL [`plan_toml`] assigns to a package.
pub fn package_url(name: &str) -> String {
    format!("https://files.example.test/packages/{name}-1.0.tar.gz")
}

/// Render a plan whose first entry is the primary package and whose
/// digests are those of the given archive contents.
pub fn plan_toml(entries: &[(&str, &[u8])]) -> String {
    let mut source = String::new();
    for (index, (name, bytes)) in entries.iter().enumerate() {
        let table = if index == 0 { "[package]" } else { "[[resource]]" };
        source.push_str(&format!(
            "{table}\nname = \"{name}\"\nurl = \"{}\"\nsha256 = \"{}\"\n\n",
            package_url(name),
            sha256_hex(bytes)
        ));
    }
    source
}

/// Build an in-memory `.tar.gz` holding `files`.
///
/// # Panics
///
/// Panics if the archive cannot be assembled.
pub fn tar_gz_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, *contents)
            .expect("append tar entry");
    }
    builder
        .into_inner()
        .expect("finish tar")
        .finish()
        .expect("finish gzip")
}

/// Build an in-memory `.zip` (or wheel) holding `files`.
///
/// # Panics
///
/// Panics if the archive cannot be assembled.
pub fn zip_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (path, contents) in files {
        writer.start_file(*path, options).expect("start zip entry");
        writer.write_all(contents).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}
