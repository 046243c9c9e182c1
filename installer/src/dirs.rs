//! Platform directory resolution.
//!
//! The [`BaseDirs`] trait lets tests substitute fixed paths for the user's
//! real cache, data, and configuration directories.

use std::path::PathBuf;

/// Directory name used under each platform base directory.
pub const APP_DIR: &str = "venvpin";

/// Source of the base directories venvpin stores state in.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// Directory for downloaded archives, e.g. `~/.cache/venvpin`.
    fn venvpin_cache_dir(&self) -> Option<PathBuf>;

    /// Directory install roots are created under, e.g.
    /// `~/.local/share/venvpin`.
    fn venvpin_data_dir(&self) -> Option<PathBuf>;

    /// Directory holding `config.toml`, e.g. `~/.config/venvpin`.
    fn venvpin_config_dir(&self) -> Option<PathBuf>;
}

/// [`BaseDirs`] backed by the platform conventions of `directories-next`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBaseDirs;

impl SystemBaseDirs {
    fn base() -> Option<directories_next::BaseDirs> {
        directories_next::BaseDirs::new()
    }
}

impl BaseDirs for SystemBaseDirs {
    fn venvpin_cache_dir(&self) -> Option<PathBuf> {
        Self::base().map(|dirs| dirs.cache_dir().join(APP_DIR))
    }

    fn venvpin_data_dir(&self) -> Option<PathBuf> {
        Self::base().map(|dirs| dirs.data_dir().join(APP_DIR))
    }

    fn venvpin_config_dir(&self) -> Option<PathBuf> {
        Self::base().map(|dirs| dirs.config_dir().join(APP_DIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_dirs_end_in_app_dir_when_home_is_known() {
        if directories_next::BaseDirs::new().is_none() {
            return;
        }
        let dirs = SystemBaseDirs;
        for dir in [
            dirs.venvpin_cache_dir(),
            dirs.venvpin_data_dir(),
            dirs.venvpin_config_dir(),
        ] {
            let dir = dir.expect("base dirs available");
            assert!(dir.ends_with(APP_DIR), "{}", dir.display());
        }
    }
}
