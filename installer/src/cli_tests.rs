//! Tests for CLI parsing and default behaviours.

use super::*;
use rstest::rstest;

#[test]
fn cli_parses_defaults() {
    let cli = Cli::parse_from(["venvpin"]);
    assert!(cli.command.is_none());
    assert!(cli.install.root.is_none());
    assert!(cli.install.python.is_none());
    assert!(!cli.install.dry_run);
    assert!(cli.install.shared.plan.is_none());
    assert!(cli.install.shared.config.is_none());
    assert!(cli.install.shared.cache_dir.is_none());
    assert!(!cli.install.shared.no_cache);
    assert!(cli.install.shared.retries.is_none());
    assert_eq!(cli.install.shared.verbosity, 0);
    assert!(!cli.install.shared.quiet);
}

#[test]
fn cli_parses_paths() {
    let cli = Cli::parse_from([
        "venvpin",
        "-p",
        "tool.toml",
        "-r",
        "/opt/tool/libexec",
        "-c",
        "/etc/venvpin.toml",
        "--cache-dir",
        "/var/cache/venvpin",
    ]);
    assert_eq!(cli.install.shared.plan(), Some(Utf8Path::new("tool.toml")));
    assert_eq!(
        cli.install.root,
        Some(Utf8PathBuf::from("/opt/tool/libexec"))
    );
    assert_eq!(
        cli.install.shared.config,
        Some(Utf8PathBuf::from("/etc/venvpin.toml"))
    );
    assert_eq!(
        cli.install.shared.cache_dir,
        Some(Utf8PathBuf::from("/var/cache/venvpin"))
    );
}

#[test]
fn cli_parses_install_subcommand() {
    let cli = Cli::parse_from(["venvpin", "install", "--python", "python3.11"]);
    match cli.command {
        Some(Command::Install(args)) => {
            assert_eq!(args.python.as_deref(), Some("python3.11"));
        }
        _ => panic!("expected Install command"),
    }
}

#[test]
fn cli_parses_fetch_subcommand() {
    let cli = Cli::parse_from(["venvpin", "fetch", "--no-cache", "--retries", "5", "-q"]);
    match cli.command {
        Some(Command::Fetch(args)) => {
            assert!(args.shared.no_cache);
            assert_eq!(args.shared.retries, Some(5));
            assert!(args.shared.quiet);
        }
        _ => panic!("expected Fetch command"),
    }
}

#[test]
fn cli_parses_show_subcommand() {
    let cli = Cli::parse_from(["venvpin", "show", "--plan", "tool.toml"]);
    match cli.command {
        Some(Command::Show(args)) => {
            assert_eq!(args.plan, Some(Utf8PathBuf::from("tool.toml")));
        }
        _ => panic!("expected Show command"),
    }
}

/// Parameterised tests for boolean CLI flags.
#[rstest]
#[case::dry_run(&["venvpin", "--dry-run"], |cli: &Cli| cli.install.dry_run)]
#[case::no_cache(&["venvpin", "--no-cache"], |cli: &Cli| cli.install.shared.no_cache)]
#[case::verbose(&["venvpin", "-v"], |cli: &Cli| cli.install.shared.verbosity > 0)]
#[case::quiet(&["venvpin", "-q"], |cli: &Cli| cli.install.shared.quiet)]
fn cli_parses_boolean_flags(#[case] args: &[&str], #[case] check: fn(&Cli) -> bool) {
    let cli = Cli::parse_from(args);
    assert!(check(&cli));
}

/// Parameterised tests for repeatable verbosity flags.
#[rstest]
#[case::double_short(&["venvpin", "-vv"], 2)]
#[case::triple_short(&["venvpin", "-vvv"], 3)]
#[case::double_long(&["venvpin", "--verbose", "--verbose"], 2)]
fn cli_parses_repeatable_verbosity_flags(#[case] args: &[&str], #[case] expected: u8) {
    let cli = Cli::parse_from(args);
    assert_eq!(cli.install.shared.verbosity, expected);
}

#[rstest]
#[case::verbose_with_quiet(&["venvpin", "--verbose", "--quiet"])]
#[case::no_cache_with_cache_dir(&["venvpin", "--no-cache", "--cache-dir", "/tmp/c"])]
#[case::zero_retries(&["venvpin", "--retries", "0"])]
#[case::non_numeric_retries(&["venvpin", "--retries", "many"])]
#[case::show_rejects_root(&["venvpin", "show", "--root", "/tmp/r"])]
fn cli_rejects_invalid_flags(#[case] args: &[&str]) {
    Cli::try_parse_from(args).expect_err("expected clap to reject the arguments");
}

#[test]
fn install_overrides_carry_every_flag() {
    let cli = Cli::parse_from([
        "venvpin",
        "--python",
        "/usr/bin/python3.12",
        "--cache-dir",
        "/tmp/cache",
        "--retries",
        "2",
    ]);

    let overrides = cli.install_args().overrides();

    assert_eq!(overrides.python.as_deref(), Some("/usr/bin/python3.12"));
    assert_eq!(overrides.cache_dir, Some(Utf8PathBuf::from("/tmp/cache")));
    assert!(!overrides.no_cache);
    assert_eq!(overrides.retries, Some(2));
}

#[test]
fn install_args_returns_flattened_when_no_subcommand() {
    let cli = Cli::parse_from(["venvpin", "--dry-run"]);
    assert!(cli.install_args().dry_run);
}

#[test]
fn install_args_returns_subcommand_args_when_present() {
    let cli = Cli::parse_from(["venvpin", "install", "--dry-run"]);
    assert!(cli.install_args().dry_run);
}

#[rstest]
#[case::flattened(&["venvpin", "-vv"], (2, false))]
#[case::install(&["venvpin", "install", "-q"], (0, true))]
#[case::fetch(&["venvpin", "fetch", "-v"], (1, false))]
#[case::show(&["venvpin", "show"], (0, false))]
fn verbosity_follows_active_command(#[case] args: &[&str], #[case] expected: (u8, bool)) {
    let cli = Cli::parse_from(args);
    assert_eq!(cli.verbosity(), expected);
}
