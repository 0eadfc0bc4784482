use serde::{Deserialize, Serialize};

use pathsafe_utils::error::ValidationError;

/// Outcome of validating one path, in a form suitable for JSON output.
///
/// ```rust
/// use pathsafe_validation::RuleValidator;
///
/// let validator = RuleValidator::secure();
/// let report = validator.report("CON.txt");
/// assert!(!report.is_valid());
/// assert_eq!(report.rules_failed(), vec!["no-windows-reserved"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub path: String,
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    #[must_use]
    pub fn new(path: impl Into<String>, errors: Vec<ValidationError>) -> Self {
        Self {
            path: path.into(),
            valid: errors.is_empty(),
            errors,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Names of the failing rules, in registration order.
    #[must_use]
    pub fn rules_failed(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.rule.as_str()).collect()
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Propagates serialization failures from `serde_json`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
