//! End-to-end CLI behaviour tests for `venvpin`.
//!
//! These scenarios invoke the binary with an isolated home directory and
//! validate output and exit codes for paths that need no network access.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliWorld {
    home: TempDir,
    args: Vec<String>,
    plan: Option<PathBuf>,
    output: Option<Output>,
}

impl Default for CliWorld {
    fn default() -> Self {
        Self {
            home: TempDir::new().expect("failed to create temp dir"),
            args: Vec::new(),
            plan: None,
            output: None,
        }
    }
}

impl CliWorld {
    fn output(&self) -> &Output {
        self.output.as_ref().expect("venvpin has run")
    }
}

#[fixture]
fn cli_world() -> CliWorld {
    CliWorld::default()
}

// ---------------------------------------------------------------------------
// Step definitions
// ---------------------------------------------------------------------------

#[given("the venvpin command \"{args}\"")]
fn given_command(cli_world: &mut CliWorld, args: String) {
    cli_world.args = args.split_whitespace().map(str::to_owned).collect();
}

#[given("a plan file with a short digest")]
fn given_short_digest_plan(cli_world: &mut CliWorld) {
    let path = cli_world.home.path().join("plan.toml");
    std::fs::write(
        &path,
        concat!(
            "[package]\n",
            "name = \"airiam\"\n",
            "url = \"https://files.example.test/airiam-0.1.49.tar.gz\"\n",
            "sha256 = \"abc123\"\n",
        ),
    )
    .expect("write plan file");
    cli_world.plan = Some(path);
}

#[when("venvpin runs")]
fn when_venvpin_runs(cli_world: &mut CliWorld) {
    let home = cli_world.home.path();
    let mut command = Command::new(env!("CARGO_BIN_EXE_venvpin"));
    command
        .args(&cli_world.args)
        .env_remove("VENVPIN_CONFIG")
        .env_remove("RUST_LOG")
        .env("HOME", home)
        .env("XDG_CACHE_HOME", home.join("cache"))
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"));
    if let Some(plan) = &cli_world.plan {
        command.arg("--plan").arg(plan);
    }
    cli_world.output = Some(command.output().expect("failed to run venvpin"));
}

#[then("venvpin exits successfully")]
fn then_exits_successfully(cli_world: &mut CliWorld) {
    let output = cli_world.output();
    assert!(
        output.status.success(),
        "venvpin failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[then("venvpin exits with code {code}")]
fn then_exits_with_code(cli_world: &mut CliWorld, code: i32) {
    assert_eq!(cli_world.output().status.code(), Some(code));
}

#[then("stdout contains \"{text}\"")]
fn then_stdout_contains(cli_world: &mut CliWorld, text: String) {
    let stdout = String::from_utf8_lossy(&cli_world.output().stdout);
    assert!(stdout.contains(&text), "stdout was:\n{stdout}");
}

#[then("stderr contains \"{text}\"")]
fn then_stderr_contains(cli_world: &mut CliWorld, text: String) {
    let stderr = String::from_utf8_lossy(&cli_world.output().stderr);
    assert!(stderr.contains(&text), "stderr was:\n{stderr}");
}

#[then("no install root was created")]
fn then_no_root(cli_world: &mut CliWorld) {
    assert!(!cli_world.home.path().join("data").exists());
}

// ---------------------------------------------------------------------------
// Scenario bindings
// ---------------------------------------------------------------------------

#[scenario(
    path = "tests/features/cli.feature",
    name = "Show prints the built-in formula"
)]
fn scenario_show_builtin(cli_world: CliWorld) {
    let _ = cli_world;
}

#[scenario(
    path = "tests/features/cli.feature",
    name = "Dry run describes the plan without installing"
)]
fn scenario_dry_run(cli_world: CliWorld) {
    let _ = cli_world;
}

#[scenario(
    path = "tests/features/cli.feature",
    name = "Malformed plan file is reported before any download"
)]
fn scenario_malformed_plan(cli_world: CliWorld) {
    let _ = cli_world;
}

#[scenario(
    path = "tests/features/cli.feature",
    name = "Missing configuration file is reported"
)]
fn scenario_missing_config(cli_world: CliWorld) {
    let _ = cli_world;
}
