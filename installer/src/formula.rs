//! The built-in AirIAM formula.
//!
//! The plan is compiled into the binary so `venvpin` works without any
//! input files. `venvpin show` prints it back in canonical form.

use crate::spec::{InstallPlan, Result, parse_plan};

/// TOML source of the built-in formula.
pub const AIRIAM_FORMULA: &str = include_str!("../formula/airiam.toml");

/// Parse the built-in formula.
///
/// # Errors
///
/// Returns a [`crate::spec::SpecError`] only if the embedded source is
/// malformed, which the test suite guards against.
///
/// # Examples
///
/// ```
/// use venvpin_installer::formula::builtin_plan;
///
/// let plan = builtin_plan().expect("built-in formula parses");
/// assert_eq!(plan.name().as_str(), "airiam");
/// ```
pub fn builtin_plan() -> Result<InstallPlan> {
    parse_plan(AIRIAM_FORMULA)
}
