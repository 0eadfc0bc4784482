//! Composable path validation rules
//!
//! A [`RuleValidator`] holds an ordered list of [`ValidationRule`]s and
//! reports every failing rule for a path. The [`rules`] module provides the
//! built-in catalogue; the free functions below run a single built-in rule
//! without building a validator.

mod report;
mod rule;
pub mod rules;
mod validator;

use std::ffi::OsStr;

use pathsafe_utils::error::ValidationError;

pub use report::ValidationReport;
pub use rule::ValidationRule;
pub use validator::RuleValidator;

use rules::{ExistsRule, ExtensionRule, ReadableRule, WritableRule};

fn run_one(rule: &dyn ValidationRule, path: &OsStr) -> Result<(), ValidationError> {
    rule.validate(path)
        .map_err(|v| ValidationError::from_violation(path.to_string_lossy(), rule.name(), &v))
}

/// Fails unless `path` exists.
///
/// # Errors
///
/// A [`ValidationError`] from the `exists` rule.
pub fn validate_exists(path: impl AsRef<OsStr>) -> Result<(), ValidationError> {
    run_one(&ExistsRule, path.as_ref())
}

/// Fails unless `path` can be opened for reading.
///
/// # Errors
///
/// A [`ValidationError`] from the `readable` rule.
pub fn validate_readable(path: impl AsRef<OsStr>) -> Result<(), ValidationError> {
    run_one(&ReadableRule, path.as_ref())
}

/// Fails unless `path` (or, when missing, its parent directory) is writable.
///
/// # Errors
///
/// A [`ValidationError`] from the `writable` rule.
pub fn validate_writable(path: impl AsRef<OsStr>) -> Result<(), ValidationError> {
    run_one(&WritableRule, path.as_ref())
}

/// Fails unless `path` has one of `extensions`.
///
/// ```rust
/// use pathsafe_validation::validate_extension;
///
/// assert!(validate_extension("report.PDF", ["pdf"]).is_ok());
/// assert!(validate_extension("report.docx", [".pdf", ".txt"]).is_err());
/// ```
///
/// # Errors
///
/// A [`ValidationError`] from the `extension` rule.
pub fn validate_extension<I, S>(path: impl AsRef<OsStr>, extensions: I) -> Result<(), ValidationError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    run_one(&ExtensionRule::new(extensions), path.as_ref())
}

/// Run `validator` against `path`.
pub fn validate(path: impl AsRef<OsStr>, validator: &RuleValidator) -> Vec<ValidationError> {
    validator.validate(path)
}

#[must_use]
pub fn is_valid(path: impl AsRef<OsStr>, validator: &RuleValidator) -> bool {
    validator.is_valid(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathsafe_utils::test_support::Sandbox;

    #[test]
    fn test_validate_exists() {
        let sandbox = Sandbox::new();
        let file = sandbox.file("here.txt", "x");
        assert!(validate_exists(&file).is_ok());

        let err = validate_exists(sandbox.path("gone.txt")).unwrap_err();
        assert_eq!(err.rule, "exists");
        assert_eq!(err.code, "PATH_NOT_FOUND");
        assert!(err.path.ends_with("gone.txt"));
    }

    #[test]
    fn test_validate_readable_and_writable() {
        let sandbox = Sandbox::new();
        let file = sandbox.file("rw.txt", "x");
        assert!(validate_readable(&file).is_ok());
        assert!(validate_writable(&file).is_ok());
        assert!(validate_writable(sandbox.path("fresh.txt")).is_ok());

        let err = validate_readable("../../etc/passwd").unwrap_err();
        assert_eq!(err.code, "PATH_TRAVERSAL");
    }

    #[test]
    fn test_validate_extension() {
        assert!(validate_extension("a/b.TXT", ["txt"]).is_ok());
        let err = validate_extension("a/b.exe", ["txt", "md"]).unwrap_err();
        assert_eq!(err.rule, "extension");
        assert_eq!(err.message, r#"path must have one of the required extensions: ["txt", "md"]"#);
    }

    #[test]
    fn test_injected_validator_functions() {
        let validator = RuleValidator::new();
        validator.require_relative();
        assert!(is_valid("relative/path", &validator));
        assert!(validate("relative/path", &validator).is_empty());
        assert_eq!(validate("/abs", &validator).len(), 1);
    }
}
