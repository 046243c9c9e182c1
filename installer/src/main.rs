//! venvpin CLI entrypoint.
//!
//! This binary fetches, verifies, and installs a pinned install plan into an
//! isolated virtual environment, or fetches and prints plans without
//! installing.

use clap::Parser;
use std::io::Write;
use venvpin_installer::cli::{Cli, Command, FetchArgs, InstallArgs, ShowArgs};
use venvpin_installer::config::{InstallerConfig, load_config};
use venvpin_installer::dirs::{BaseDirs, SystemBaseDirs};
use venvpin_installer::environment::VirtualenvBuilder;
use venvpin_installer::error::{InstallerError, Result};
use venvpin_installer::exec::SystemCommandExecutor;
use venvpin_installer::orchestrator::{CancellationToken, InstallOrchestrator};
use venvpin_installer::output::{DryRunInfo, report_outcome, write_stderr_line};
use venvpin_installer::setup::{build_fetcher, resolve_cache_dir, resolve_plan, resolve_root};

fn main() {
    let cli = Cli::parse();
    let (verbosity, _) = cli.verbosity();
    init_logging(verbosity);

    let cancellation = CancellationToken::new();
    install_interrupt_handler(&cancellation);

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &SystemBaseDirs, &cancellation, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Install the `env_logger` backend; `RUST_LOG` overrides the `-v` level.
fn init_logging(verbosity: u8) {
    let env = env_logger::Env::default().default_filter_or(log_level(verbosity));
    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .init();
}

/// Cancel the run on the first Ctrl-C and exit immediately on the second.
///
/// A cancelled run stops before the next package's fetch and leaves the
/// install root marked failed.
fn install_interrupt_handler(cancellation: &CancellationToken) {
    let token = cancellation.clone();
    let installed = ctrlc::set_handler(move || {
        if token.is_cancelled() {
            std::process::exit(130);
        }
        log::warn!("interrupted; stopping before the next package");
        token.cancel();
    });
    if let Err(err) = installed {
        log::warn!("could not install Ctrl-C handler: {err}");
    }
}

fn log_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Dispatch the active command and return the process exit code.
fn run(
    cli: &Cli,
    dirs: &dyn BaseDirs,
    cancellation: &CancellationToken,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<i32> {
    match &cli.command {
        Some(Command::Show(args)) => run_show(args, stdout),
        Some(Command::Fetch(args)) => run_fetch(args, dirs, cancellation, stderr),
        Some(Command::Install(args)) => run_install(args, dirs, cancellation, stderr),
        None => run_install(&cli.install, dirs, cancellation, stderr),
    }
}

/// Prints the canonical plan to stdout.
fn run_show(args: &ShowArgs, stdout: &mut dyn Write) -> Result<i32> {
    let plan = resolve_plan(args.plan.as_deref())?;
    let rendered = plan.to_toml()?;
    stdout
        .write_all(rendered.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(|source| InstallerError::WriteFailed { source })?;
    Ok(0)
}

/// Fetches and verifies every archive without creating a root.
fn run_fetch(
    args: &FetchArgs,
    dirs: &dyn BaseDirs,
    cancellation: &CancellationToken,
    stderr: &mut dyn Write,
) -> Result<i32> {
    let shared = &args.shared;
    let plan = resolve_plan(shared.plan())?;
    let config = load_config(shared.config.as_deref(), dirs)?.with_overrides(&shared.overrides());
    let cache_dir = resolve_cache_dir(&config, dirs)?;
    let fetcher = build_fetcher(&config, cache_dir.as_deref());

    let report = InstallOrchestrator::without_environment(fetcher.as_ref())
        .with_cancellation(cancellation.clone())
        .quiet(shared.quiet)
        .fetch_only(&plan, stderr);
    Ok(report_outcome(&report, shared.quiet, stderr))
}

/// Fetches, verifies, and installs the plan, or describes it for `--dry-run`.
fn run_install(
    args: &InstallArgs,
    dirs: &dyn BaseDirs,
    cancellation: &CancellationToken,
    stderr: &mut dyn Write,
) -> Result<i32> {
    let shared = &args.shared;
    let plan = resolve_plan(shared.plan())?;
    let config = load_config(shared.config.as_deref(), dirs)?.with_overrides(&args.overrides());
    let root = resolve_root(args.root.as_deref(), dirs, &plan)?;
    let cache_dir = resolve_cache_dir(&config, dirs)?;
    let python = interpreter(&config, plan.metadata().runtime());

    if args.dry_run {
        let info = DryRunInfo {
            plan: &plan,
            root: &root,
            cache_dir: cache_dir.as_deref(),
            python,
            attempts: config.retry.attempts,
            quiet: shared.quiet,
        };
        write_stderr_line(stderr, info.display_text());
        return Ok(0);
    }

    let fetcher = build_fetcher(&config, cache_dir.as_deref());
    let executor = SystemCommandExecutor::new(config.command_timeout());
    let builder = VirtualenvBuilder::new(&executor, &root, plan.metadata()).with_python(python);

    if !shared.quiet {
        write_stderr_line(
            stderr,
            format!("Installing {} ({} packages) into {root}...", plan.name(), plan.len()),
        );
    }

    let report = InstallOrchestrator::new(fetcher.as_ref(), &builder)
        .with_cancellation(cancellation.clone())
        .quiet(shared.quiet)
        .install(&plan, stderr);
    Ok(report_outcome(&report, shared.quiet, stderr))
}

fn interpreter<'a>(config: &'a InstallerConfig, runtime: &'a str) -> &'a str {
    config.python.as_deref().unwrap_or(runtime)
}

fn exit_code_for_run_result(result: Result<i32>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(code) => code,
        Err(err) => {
            write_stderr_line(stderr, format!("Error: {}: {err}", err.kind()));
            1
        }
    }
}
