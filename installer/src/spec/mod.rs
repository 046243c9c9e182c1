//! Pinned dependency specs and install plans.
//!
//! Everything here is pure data and validation: parsing a plan never touches
//! the network or the filesystem beyond reading the plan file itself.

mod dependency;
mod error;
mod package_name;
mod plan;
mod runtime_version;
mod sha256_digest;
mod source_url;

pub use dependency::{DependencySpec, PackageRole};
pub use error::{Result, SpecError};
pub use package_name::PackageName;
pub use plan::{
    DEFAULT_MIN_RUNTIME_VERSION, DEFAULT_RUNTIME, FormulaMetadata, InstallPlan, load_plan_file,
    parse_plan,
};
pub use runtime_version::RuntimeVersion;
pub use sha256_digest::{DIGEST_HEX_LEN, Sha256Digest};
pub use source_url::SourceUrl;
