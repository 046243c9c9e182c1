//! CLI argument definitions for venvpin.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::config::ConfigOverrides;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};

/// Install a pinned Python tool into an isolated virtual environment.
#[derive(Parser, Debug)]
#[command(name = "venvpin")]
#[command(version, about)]
#[command(long_about = concat!(
    "Install a pinned Python tool into an isolated virtual environment.\n\n",
    "venvpin downloads every archive named by an install plan, checks each ",
    "against its pinned SHA-256 digest, and installs it into a fresh virtual ",
    "environment. The first failure stops the run; nothing is installed from ",
    "an archive whose digest does not match.\n\n",
    "Without --plan the built-in AirIAM formula is used.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Install the built-in formula:\n",
    "    $ venvpin\n\n",
    "  Install from a plan file into a chosen root:\n",
    "    $ venvpin install --plan tool.toml --root /opt/tool/libexec\n\n",
    "  Download and verify without installing:\n",
    "    $ venvpin fetch\n\n",
    "  Print the built-in plan:\n",
    "    $ venvpin show\n\n",
    "  Preview without installing:\n",
    "    $ venvpin --dry-run",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Install arguments (used when no subcommand is given).
    #[command(flatten)]
    pub install: InstallArgs,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch, verify, and install the plan (default when no subcommand given).
    Install(InstallArgs),

    /// Fetch and verify every archive without installing.
    Fetch(FetchArgs),

    /// Print the plan in canonical TOML form.
    Show(ShowArgs),
}

/// Options shared by commands that download archives.
#[derive(Args, Debug, Clone, Default)]
pub struct SharedArgs {
    /// Plan file [default: built-in AirIAM formula].
    #[arg(short, long, value_name = "FILE")]
    pub plan: Option<Utf8PathBuf>,

    /// Configuration file [default: platform configuration directory].
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Download cache directory [default: platform cache directory].
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<Utf8PathBuf>,

    /// Always download; neither read nor fill the cache.
    #[arg(long, conflicts_with = "cache_dir")]
    pub no_cache: bool,

    /// Fetch attempts per archive, including the first.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub retries: Option<u32>,

    /// Increase log output (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

/// Arguments for the install command.
#[derive(Parser, Debug, Clone, Default)]
pub struct InstallArgs {
    /// Options shared with `fetch`.
    #[command(flatten)]
    pub shared: SharedArgs,

    /// Install root [default: <data dir>/venvpin/<formula>/libexec].
    #[arg(short, long, value_name = "DIR")]
    pub root: Option<Utf8PathBuf>,

    /// Interpreter used to create the environment [default: plan runtime].
    #[arg(long, value_name = "PATH")]
    pub python: Option<String>,

    /// Show the plan and resolved settings, then exit.
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the fetch command.
#[derive(Parser, Debug, Clone, Default)]
pub struct FetchArgs {
    /// Options shared with `install`.
    #[command(flatten)]
    pub shared: SharedArgs,
}

/// Arguments for the show command.
#[derive(Parser, Debug, Clone, Default)]
pub struct ShowArgs {
    /// Plan file [default: built-in AirIAM formula].
    #[arg(short, long, value_name = "FILE")]
    pub plan: Option<Utf8PathBuf>,
}

impl SharedArgs {
    /// Configuration values set by these flags.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            python: None,
            cache_dir: self.cache_dir.clone(),
            no_cache: self.no_cache,
            retries: self.retries,
        }
    }

    /// The plan file, if one was given.
    #[must_use]
    pub fn plan(&self) -> Option<&Utf8Path> {
        self.plan.as_deref()
    }
}

impl InstallArgs {
    /// Configuration values set by these flags.
    ///
    /// # Examples
    ///
    /// ```
    /// use venvpin_installer::cli::InstallArgs;
    ///
    /// let mut args = InstallArgs::default();
    /// args.python = Some("python3.12".to_owned());
    /// args.shared.no_cache = true;
    ///
    /// let overrides = args.overrides();
    /// assert_eq!(overrides.python.as_deref(), Some("python3.12"));
    /// assert!(overrides.no_cache);
    /// ```
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            python: self.python.clone(),
            ..self.shared.overrides()
        }
    }
}

impl Cli {
    /// Returns the effective install arguments.
    ///
    /// If an `Install` subcommand was provided, returns those arguments.
    /// Otherwise returns the flattened install arguments.
    ///
    /// # Note
    ///
    /// When `Fetch` or `Show` is active this returns the flattened defaults;
    /// callers should match on `self.command` first.
    #[must_use]
    pub fn install_args(&self) -> &InstallArgs {
        match &self.command {
            Some(Command::Install(args)) => args,
            Some(Command::Fetch(_) | Command::Show(_)) | None => &self.install,
        }
    }

    /// Verbosity and quiet flags of whichever command is active.
    #[must_use]
    pub fn verbosity(&self) -> (u8, bool) {
        let shared = match &self.command {
            Some(Command::Fetch(args)) => &args.shared,
            Some(Command::Show(_)) => return (0, false),
            Some(Command::Install(_)) | None => &self.install_args().shared,
        };
        (shared.verbosity, shared.quiet)
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
