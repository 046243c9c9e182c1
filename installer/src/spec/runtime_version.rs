//! Interpreter version numbers.

use super::error::{Result, SpecError};
use std::fmt;
use std::str::FromStr;

/// A `major.minor.patch` interpreter version.
///
/// Parsing accepts one to three numeric components (`3`, `3.7`, `3.11.4`)
/// and ignores a trailing pre-release tag on the last component, so
/// `3.13.0rc1` parses as `3.13.0`.
///
/// # Examples
///
/// ```
/// use venvpin_installer::spec::RuntimeVersion;
///
/// let found: RuntimeVersion = "3.11.4".parse().expect("valid version");
/// let minimum: RuntimeVersion = "3.7".parse().expect("valid version");
/// assert!(found.satisfies(&minimum));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuntimeVersion {
    major: u32,
    minor: u32,
    patch: u32,
}

impl RuntimeVersion {
    /// Create a version from its components.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Return the major component.
    #[must_use]
    pub const fn major(&self) -> u32 {
        self.major
    }

    /// Return the minor component.
    #[must_use]
    pub const fn minor(&self) -> u32 {
        self.minor
    }

    /// Return true when this version is at least `minimum`.
    #[must_use]
    pub fn satisfies(&self, minimum: &Self) -> bool {
        self >= minimum
    }
}

impl FromStr for RuntimeVersion {
    type Err = SpecError;

    fn from_str(value: &str) -> Result<Self> {
        let invalid = || SpecError::InvalidRuntimeVersion {
            value: value.to_owned(),
        };

        let parts: Vec<&str> = value.trim().split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(invalid());
        }

        let mut numbers = [0_u32; 3];
        let last_index = parts.len() - 1;
        for (index, (part, slot)) in parts.iter().zip(numbers.iter_mut()).enumerate() {
            let digits = if index == last_index {
                leading_digits(part)
            } else {
                part
            };
            *slot = digits.parse().map_err(|_| invalid())?;
        }

        let [major, minor, patch] = numbers;
        Ok(Self::new(major, minor, patch))
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

fn leading_digits(part: &str) -> &str {
    let end = part
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(part.len(), |(i, _)| i);
    &part[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("3", RuntimeVersion::new(3, 0, 0))]
    #[case("3.7", RuntimeVersion::new(3, 7, 0))]
    #[case("3.11.4", RuntimeVersion::new(3, 11, 4))]
    #[case("3.13.0rc1", RuntimeVersion::new(3, 13, 0))]
    #[case(" 3.9.1 ", RuntimeVersion::new(3, 9, 1))]
    fn parses_versions(#[case] raw: &str, #[case] expected: RuntimeVersion) {
        assert_eq!(raw.parse::<RuntimeVersion>(), Ok(expected));
    }

    #[rstest]
    #[case::empty("")]
    #[case::word("three")]
    #[case::too_many("3.1.2.3")]
    #[case::tag_in_middle("3rc.1")]
    fn rejects_garbage(#[case] raw: &str) {
        assert!(raw.parse::<RuntimeVersion>().is_err());
    }

    #[rstest]
    #[case("3.7.0", "3.7", true)]
    #[case("3.12.1", "3.7", true)]
    #[case("3.6.15", "3.7", false)]
    #[case("2.7.18", "3", false)]
    fn compares_against_minimum(#[case] found: &str, #[case] min: &str, #[case] ok: bool) {
        let found: RuntimeVersion = found.parse().expect("valid");
        let min: RuntimeVersion = min.parse().expect("valid");
        assert_eq!(found.satisfies(&min), ok);
    }
}
