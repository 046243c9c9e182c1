//! Semantic wrapper for package names.
//!
//! This module provides the [`PackageName`] newtype so that names are
//! validated once, at load time, and passed explicitly everywhere else.

use super::error::{Result, SpecError};
use std::fmt;

/// A validated package name such as `boto3` or `python-dateutil`.
///
/// Names must be non-empty ASCII, made of alphanumerics, `-`, `_`, and `.`,
/// and must start and end with an alphanumeric character.
///
/// # Examples
///
/// ```
/// use venvpin_installer::spec::PackageName;
///
/// let name = PackageName::try_from("python-dateutil").expect("valid name");
/// assert_eq!(name.as_str(), "python-dateutil");
/// assert!(PackageName::try_from("-leading").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageName(String);

impl PackageName {
    /// Get the package name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Return the normalized form used for duplicate detection.
    ///
    /// Lowercases the name and folds runs of `-`, `_`, and `.` into a single
    /// `-`, so `Python_DateUtil` and `python-dateutil` compare equal.
    ///
    /// # Examples
    ///
    /// ```
    /// use venvpin_installer::spec::PackageName;
    ///
    /// let name = PackageName::try_from("Python_Date.Util").expect("valid name");
    /// assert_eq!(name.normalized(), "python-date-util");
    /// ```
    #[must_use]
    pub fn normalized(&self) -> String {
        let mut out = String::with_capacity(self.0.len());
        let mut previous_was_separator = false;
        for c in self.0.chars() {
            if is_separator(c) {
                if !previous_was_separator {
                    out.push('-');
                }
                previous_was_separator = true;
            } else {
                out.push(c.to_ascii_lowercase());
                previous_was_separator = false;
            }
        }
        out
    }
}

impl TryFrom<&str> for PackageName {
    type Error = SpecError;

    fn try_from(value: &str) -> Result<Self> {
        validate_name(value)?;
        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for PackageName {
    type Error = SpecError;

    fn try_from(value: String) -> Result<Self> {
        validate_name(&value)?;
        Ok(Self(value))
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn is_separator(c: char) -> bool {
    matches!(c, '-' | '_' | '.')
}

fn validate_name(value: &str) -> Result<()> {
    let invalid = |reason: &str| SpecError::InvalidName {
        value: value.to_owned(),
        reason: reason.to_owned(),
    };

    let (Some(first), Some(last)) = (value.chars().next(), value.chars().last()) else {
        return Err(invalid("name must not be empty"));
    };
    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || is_separator(*c)))
    {
        return Err(invalid(&format!("unexpected character '{bad}'")));
    }
    if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
        return Err(invalid("name must start and end with a letter or digit"));
    }
    Ok(())
}
