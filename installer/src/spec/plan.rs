//! Install plans and the TOML loader that produces them.
//!
//! A plan is written the way a formula declares its sources: one primary
//! `[package]` table and any number of `[[resource]]` tables, each carrying a
//! `name`, `url`, and `sha256`. An optional `[formula]` table describes the
//! tool and the interpreter it needs.
//!
//! ```toml
//! [formula]
//! description = "Least privilege AWS IAM Terraformer"
//! runtime = "python3"
//! min_runtime_version = "3.7"
//!
//! [package]
//! name = "airiam"
//! url = "https://files.pythonhosted.org/.../airiam-0.1.49.tar.gz"
//! sha256 = "f5a94667..."
//!
//! [[resource]]
//! name = "boto3"
//! url = "https://files.pythonhosted.org/.../boto3-1.17.86.tar.gz"
//! sha256 = "4f158677..."
//! ```
//!
//! Loading never touches the network; every validation failure is a
//! [`SpecError`].

use super::dependency::{DependencySpec, PackageRole};
use super::error::{Result, SpecError};
use super::package_name::PackageName;
use super::runtime_version::RuntimeVersion;
use super::sha256_digest::Sha256Digest;
use super::source_url::SourceUrl;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Interpreter used when a plan does not name one.
pub const DEFAULT_RUNTIME: &str = "python3";

/// Oldest interpreter accepted when a plan does not say otherwise.
pub const DEFAULT_MIN_RUNTIME_VERSION: RuntimeVersion = RuntimeVersion::new(3, 7, 0);

const PRIMARY_ENTRY: &str = "package";

/// Descriptive metadata and runtime requirements of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaMetadata {
    description: Option<String>,
    homepage: Option<String>,
    runtime: String,
    min_runtime_version: RuntimeVersion,
}

impl FormulaMetadata {
    /// One-line description of the tool.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Project homepage.
    #[must_use]
    pub fn homepage(&self) -> Option<&str> {
        self.homepage.as_deref()
    }

    /// Interpreter command the environment is built with (e.g. `python3`).
    #[must_use]
    pub fn runtime(&self) -> &str {
        &self.runtime
    }

    /// Oldest interpreter version the tool supports.
    #[must_use]
    pub fn min_runtime_version(&self) -> RuntimeVersion {
        self.min_runtime_version
    }
}

impl Default for FormulaMetadata {
    fn default() -> Self {
        Self {
            description: None,
            homepage: None,
            runtime: DEFAULT_RUNTIME.to_owned(),
            min_runtime_version: DEFAULT_MIN_RUNTIME_VERSION,
        }
    }
}

/// An ordered set of specs installed together: the primary package first,
/// then its resources in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    metadata: FormulaMetadata,
    primary: DependencySpec,
    resources: Vec<DependencySpec>,
}

impl InstallPlan {
    /// Build a plan from a primary spec and its resources.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::DuplicateName`] if two specs share a normalized
    /// name.
    pub fn new(primary: DependencySpec, resources: Vec<DependencySpec>) -> Result<Self> {
        let plan = Self {
            metadata: FormulaMetadata::default(),
            primary,
            resources,
        };
        plan.check_unique_names()?;
        Ok(plan)
    }

    /// Replace the plan's metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: FormulaMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The plan's metadata.
    #[must_use]
    pub fn metadata(&self) -> &FormulaMetadata {
        &self.metadata
    }

    /// Name of the tool being installed (the primary package's name).
    #[must_use]
    pub fn name(&self) -> &PackageName {
        self.primary.name()
    }

    /// The top-level package.
    #[must_use]
    pub fn primary(&self) -> &DependencySpec {
        &self.primary
    }

    /// The transitive dependencies, in declaration order.
    #[must_use]
    pub fn resources(&self) -> &[DependencySpec] {
        &self.resources
    }

    /// Number of specs, including the primary.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len() + 1
    }

    /// Always false: a plan has at least its primary package.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate specs in install order, tagged with their role.
    pub fn specs(&self) -> impl Iterator<Item = (PackageRole, &DependencySpec)> {
        std::iter::once((PackageRole::Primary, &self.primary))
            .chain(self.resources.iter().map(|r| (PackageRole::Resource, r)))
    }

    /// Render the plan in the same TOML format [`parse_plan`] reads.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::Serialize`] if the TOML writer fails.
    pub fn to_toml(&self) -> Result<String> {
        let document = PlanDocument {
            formula: FormulaDocument {
                description: self.metadata.description(),
                homepage: self.metadata.homepage(),
                runtime: self.metadata.runtime(),
                min_runtime_version: self.metadata.min_runtime_version().to_string(),
            },
            package: EntryDocument::from(&self.primary),
            resource: self.resources.iter().map(EntryDocument::from).collect(),
        };
        toml::to_string(&document).map_err(|e| SpecError::Serialize {
            reason: e.to_string(),
        })
    }

    fn check_unique_names(&self) -> Result<()> {
        let mut seen: HashMap<String, String> = HashMap::new();
        for (index, (_, spec)) in self.specs().enumerate() {
            let location = entry_location(index);
            if let Some(first) = seen.insert(spec.name().normalized(), location.clone()) {
                return Err(SpecError::DuplicateName {
                    name: spec.name().to_string(),
                    first,
                    second: location,
                });
            }
        }
        Ok(())
    }
}

/// Parse a plan from TOML source.
///
/// # Errors
///
/// Returns a [`SpecError`] describing the first malformed entry: invalid
/// TOML, unknown keys, a missing `[package]` table, a missing or invalid
/// field, or a duplicate name.
///
/// # Examples
///
/// ```
/// use venvpin_installer::spec::parse_plan;
///
/// let source = format!(
///     "[package]\nname = \"pkg\"\nurl = \"https://x.test/pkg.tar.gz\"\nsha256 = \"{}\"\n",
///     "c".repeat(64),
/// );
/// let plan = parse_plan(&source).expect("valid plan");
/// assert_eq!(plan.len(), 1);
/// assert_eq!(plan.name().as_str(), "pkg");
/// ```
pub fn parse_plan(source: &str) -> Result<InstallPlan> {
    let raw: RawPlan = toml::from_str(source).map_err(|e| SpecError::Parse {
        reason: e.to_string().trim().to_owned(),
    })?;

    let metadata = raw.formula.map(RawFormula::validate).transpose()?;
    let primary = raw
        .package
        .ok_or(SpecError::MissingPrimary)?
        .validate(PRIMARY_ENTRY)?;
    let resources = raw
        .resource
        .into_iter()
        .enumerate()
        .map(|(index, entry)| entry.validate(&entry_location(index + 1)))
        .collect::<Result<Vec<_>>>()?;

    let plan = InstallPlan::new(primary, resources)?;
    Ok(match metadata {
        Some(metadata) => plan.with_metadata(metadata),
        None => plan,
    })
}

/// Read and parse a plan file.
///
/// # Errors
///
/// Returns [`SpecError::Read`] if the file cannot be read, or any error
/// from [`parse_plan`].
pub fn load_plan_file(path: &Utf8Path) -> Result<InstallPlan> {
    let source = std::fs::read_to_string(path).map_err(|e| SpecError::Read {
        path: path.to_owned(),
        reason: e.to_string(),
    })?;
    parse_plan(&source)
}

/// Location label for the spec at `index` in install order.
fn entry_location(index: usize) -> String {
    match index.checked_sub(1) {
        None => PRIMARY_ENTRY.to_owned(),
        Some(resource_index) => format!("resource[{resource_index}]"),
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPlan {
    formula: Option<RawFormula>,
    package: Option<RawEntry>,
    #[serde(default)]
    resource: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFormula {
    description: Option<String>,
    homepage: Option<String>,
    runtime: Option<String>,
    min_runtime_version: Option<String>,
}

impl RawFormula {
    fn validate(self) -> Result<FormulaMetadata> {
        let min_runtime_version = self
            .min_runtime_version
            .as_deref()
            .map(str::parse::<RuntimeVersion>)
            .transpose()
            .map_err(|e| e.in_entry("formula"))?
            .unwrap_or(DEFAULT_MIN_RUNTIME_VERSION);
        Ok(FormulaMetadata {
            description: self.description,
            homepage: self.homepage,
            runtime: self
                .runtime
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_RUNTIME.to_owned()),
            min_runtime_version,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    name: Option<String>,
    url: Option<String>,
    sha256: Option<String>,
}

impl RawEntry {
    fn validate(self, entry: &str) -> Result<DependencySpec> {
        let missing = |field| SpecError::MissingField {
            entry: entry.to_owned(),
            field,
        };
        let name = self.name.ok_or_else(|| missing("name"))?;
        let url = self.url.ok_or_else(|| missing("url"))?;
        let sha256 = self.sha256.ok_or_else(|| missing("sha256"))?;

        Ok(DependencySpec::new(
            PackageName::try_from(name).map_err(|e| e.in_entry(entry))?,
            SourceUrl::try_from(url).map_err(|e| e.in_entry(entry))?,
            Sha256Digest::try_from(sha256).map_err(|e| e.in_entry(entry))?,
        ))
    }
}

#[derive(Serialize)]
struct PlanDocument<'a> {
    formula: FormulaDocument<'a>,
    package: EntryDocument<'a>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    resource: Vec<EntryDocument<'a>>,
}

#[derive(Serialize)]
struct FormulaDocument<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    homepage: Option<&'a str>,
    runtime: &'a str,
    min_runtime_version: String,
}

#[derive(Serialize)]
struct EntryDocument<'a> {
    name: &'a str,
    url: &'a str,
    sha256: &'a str,
}

impl<'a> From<&'a DependencySpec> for EntryDocument<'a> {
    fn from(spec: &'a DependencySpec) -> Self {
        Self {
            name: spec.name().as_str(),
            url: spec.url().as_str(),
            sha256: spec.sha256().as_str(),
        }
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
