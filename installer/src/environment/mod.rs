//! Isolated install roots and the builder that populates them.

mod extraction;
mod root;
mod runtime;
mod virtualenv;

pub use extraction::{
    ArchiveFormat, ExtractionError, SDIST_METADATA_FILES, find_sdist_project, has_wheel_metadata,
    unpack,
};
pub use root::{InstallRoot, RootState, STATE_MARKER, read_state};
pub use runtime::{parse_version_banner, probe_runtime};
pub use virtualenv::{EnvironmentBuilder, VirtualenvBuilder};

#[cfg(test)]
pub use virtualenv::MockEnvironmentBuilder;
