use std::ffi::OsStr;

use pathsafe_utils::error::RuleViolation;
use pathsafe_utils::paths::SafePath;

/// A named, stateless predicate over a path.
///
/// Rules are shared between validators behind `Arc` and may be evaluated
/// from several threads at once, so they must not hold mutable state.
///
/// # Example
///
/// ```rust
/// use pathsafe_utils::error::RuleViolation;
/// use pathsafe_validation::ValidationRule;
/// use std::ffi::OsStr;
///
/// struct NoSpaces;
///
/// impl ValidationRule for NoSpaces {
///     fn name(&self) -> &str {
///         "no-spaces"
///     }
///
///     fn description(&self) -> &str {
///         "path must not contain spaces"
///     }
///
///     fn validate(&self, path: &OsStr) -> Result<(), RuleViolation> {
///         if path.as_encoded_bytes().contains(&b' ') {
///             return Err(RuleViolation::ForbiddenPattern {
///                 pattern: " ".to_string(),
///             });
///         }
///         Ok(())
///     }
/// }
///
/// assert!(NoSpaces.validate(OsStr::new("a b")).is_err());
/// ```
pub trait ValidationRule: Send + Sync {
    /// Name reported in every failure. Must be non-empty to be registered.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Judge a raw path.
    ///
    /// # Errors
    ///
    /// The [`RuleViolation`] describing why the path fails this rule.
    fn validate(&self, path: &OsStr) -> Result<(), RuleViolation>;

    /// Judge a constructed path. Defaults to the normalized form.
    ///
    /// # Errors
    ///
    /// The [`RuleViolation`] describing why the path fails this rule.
    fn validate_path(&self, path: &SafePath) -> Result<(), RuleViolation> {
        self.validate(path.normalized().as_os_str())
    }
}

impl std::fmt::Debug for dyn ValidationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationRule")
            .field("name", &self.name())
            .finish()
    }
}
