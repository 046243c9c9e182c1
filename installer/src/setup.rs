//! Resolution of the plan, paths, and collaborators a run needs.
//!
//! These helpers turn CLI flags, configuration, and platform directories
//! into the concrete values `main` hands to the orchestrator.

use crate::config::InstallerConfig;
use crate::dirs::BaseDirs;
use crate::error::{InstallerError, Result};
use crate::fetch::{
    ArchiveCache, ArchiveFetcher, CachingFetcher, HttpFetcher, RetryingFetcher,
};
use crate::formula::builtin_plan;
use crate::spec::{InstallPlan, load_plan_file};
use camino::{Utf8Path, Utf8PathBuf};
use std::path::PathBuf;

/// Directory name of the install root inside a formula's data directory.
pub const ROOT_DIR_NAME: &str = "libexec";

/// Load the plan at `path`, or the built-in formula when `None`.
///
/// # Errors
///
/// Returns [`InstallerError::MalformedSpec`] if the plan is unreadable or
/// invalid.
pub fn resolve_plan(path: Option<&Utf8Path>) -> Result<InstallPlan> {
    let plan = match path {
        Some(path) => {
            log::debug!("loading plan from {path}");
            load_plan_file(path)?
        }
        None => builtin_plan()?,
    };
    log::debug!("plan {} has {} specs", plan.name(), plan.len());
    Ok(plan)
}

/// The install root: `explicit` if given, else
/// `<data dir>/<formula>/libexec`.
///
/// # Errors
///
/// Returns [`InstallerError::Environment`] if no data directory can be
/// determined or it is not valid UTF-8.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use venvpin_installer::dirs::SystemBaseDirs;
/// use venvpin_installer::formula::builtin_plan;
/// use venvpin_installer::setup::resolve_root;
///
/// let plan = builtin_plan().expect("built-in formula");
/// let root = resolve_root(Some(Utf8Path::new("/opt/airiam")), &SystemBaseDirs, &plan)
///     .expect("explicit root");
/// assert_eq!(root, "/opt/airiam");
/// ```
pub fn resolve_root(
    explicit: Option<&Utf8Path>,
    dirs: &dyn BaseDirs,
    plan: &InstallPlan,
) -> Result<Utf8PathBuf> {
    if let Some(root) = explicit {
        return Ok(root.to_owned());
    }
    let data_dir = dirs
        .venvpin_data_dir()
        .ok_or_else(|| InstallerError::Environment {
            reason: "could not determine data directory; pass --root".to_owned(),
        })?;
    Ok(utf8_dir(data_dir, "data")?
        .join(plan.name().as_str())
        .join(ROOT_DIR_NAME))
}

/// The download cache directory, or `None` when caching is disabled or no
/// cache location is known.
///
/// # Errors
///
/// Returns [`InstallerError::Environment`] if the platform cache directory
/// is not valid UTF-8.
pub fn resolve_cache_dir(
    config: &InstallerConfig,
    dirs: &dyn BaseDirs,
) -> Result<Option<Utf8PathBuf>> {
    if !config.use_cache {
        return Ok(None);
    }
    if let Some(dir) = &config.cache_dir {
        return Ok(Some(dir.clone()));
    }
    match dirs.venvpin_cache_dir() {
        Some(dir) => Ok(Some(utf8_dir(dir, "cache")?)),
        None => {
            log::warn!("could not determine cache directory; downloads will not be cached");
            Ok(None)
        }
    }
}

/// Assemble the fetcher stack: HTTP, wrapped in retries, wrapped in the
/// cache when `cache_dir` is set.
#[must_use]
pub fn build_fetcher(
    config: &InstallerConfig,
    cache_dir: Option<&Utf8Path>,
) -> Box<dyn ArchiveFetcher> {
    let http = HttpFetcher::new(config.download_timeout());
    let retrying = RetryingFetcher::new(http, config.retry_policy());
    match cache_dir {
        Some(dir) => {
            let cache = ArchiveCache::new(dir);
            log::debug!("caching downloads in {}", cache.dir());
            Box::new(CachingFetcher::new(retrying, cache))
        }
        None => Box::new(retrying),
    }
}

fn utf8_dir(dir: PathBuf, label: &str) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(dir).map_err(|dir| InstallerError::Environment {
        reason: format!("{label} directory {} is not valid UTF-8", dir.display()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirs::MockBaseDirs;
    use crate::error::ErrorKind;
    use crate::spec::parse_plan;
    use crate::test_utils::plan_toml;
    use rstest::{fixture, rstest};

    #[fixture]
    fn plan() -> InstallPlan {
        parse_plan(&plan_toml(&[("airiam", b"a")])).expect("plan")
    }

    #[test]
    fn builtin_plan_is_used_without_a_path() {
        let plan = resolve_plan(None).expect("built-in plan");
        assert_eq!(plan.name().as_str(), "airiam");
    }

    #[test]
    fn missing_plan_file_is_malformed_spec() {
        let err = resolve_plan(Some(Utf8Path::new("/nonexistent/plan.toml")))
            .expect_err("missing plan");
        assert_eq!(err.kind(), ErrorKind::MalformedSpec);
    }

    #[rstest]
    fn default_root_is_under_data_dir(plan: InstallPlan) {
        let mut dirs = MockBaseDirs::new();
        dirs.expect_venvpin_data_dir()
            .returning(|| Some(PathBuf::from("/home/test/.local/share/venvpin")));

        let root = resolve_root(None, &dirs, &plan).expect("root");

        assert_eq!(root, "/home/test/.local/share/venvpin/airiam/libexec");
    }

    #[rstest]
    fn explicit_root_skips_data_dir(plan: InstallPlan) {
        let mut dirs = MockBaseDirs::new();
        dirs.expect_venvpin_data_dir().never();

        let root = resolve_root(Some(Utf8Path::new("/opt/root")), &dirs, &plan).expect("root");

        assert_eq!(root, "/opt/root");
    }

    #[rstest]
    fn unknown_data_dir_is_environment_error(plan: InstallPlan) {
        let mut dirs = MockBaseDirs::new();
        dirs.expect_venvpin_data_dir().returning(|| None);

        let err = resolve_root(None, &dirs, &plan).expect_err("no data dir");

        assert_eq!(err.kind(), ErrorKind::Environment);
        assert!(err.to_string().contains("--root"));
    }

    #[rstest]
    #[case::disabled(false, None, Some("/cache"), None)]
    #[case::configured(true, Some("/configured"), Some("/cache"), Some("/configured"))]
    #[case::platform(true, None, Some("/cache"), Some("/cache"))]
    #[case::unknown(true, None, None, None)]
    fn cache_dir_resolution(
        #[case] use_cache: bool,
        #[case] configured: Option<&str>,
        #[case] platform: Option<&'static str>,
        #[case] expected: Option<&str>,
    ) {
        let config = InstallerConfig {
            use_cache,
            cache_dir: configured.map(Utf8PathBuf::from),
            ..InstallerConfig::default()
        };
        let mut dirs = MockBaseDirs::new();
        dirs.expect_venvpin_cache_dir()
            .returning(move || platform.map(PathBuf::from));

        let dir = resolve_cache_dir(&config, &dirs).expect("cache dir");

        assert_eq!(dir.as_deref().map(Utf8Path::as_str), expected);
    }
}
