use std::ffi::OsStr;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace, warn};

use pathsafe_config::RulesConfig;
use pathsafe_utils::error::{ConfigError, PathSafeError, ValidationError, ValidatorError};
use pathsafe_utils::logging::validation_span;
use pathsafe_utils::paths::SafePath;
use pathsafe_utils::types::RuleKind;

use crate::report::ValidationReport;
use crate::rule::ValidationRule;
use crate::rules::{ExtensionRule, MaxLengthRule, PatternRule, builtin_rule, secure_rules};

/// Ordered collection of rules evaluated against paths.
///
/// Every registered rule runs on every path (no short-circuit) and failures
/// are reported in registration order. The rule list sits behind a
/// read/write lock: validations take a snapshot under the read lock and run
/// the rules without holding it, so mutations never wait on a slow
/// filesystem.
///
/// Builder methods take `&self` and return `&Self`, so they chain or can be
/// called one at a time.
///
/// # Example
///
/// ```rust
/// use pathsafe_validation::RuleValidator;
///
/// let validator = RuleValidator::new();
/// validator.require_relative().require_secure();
///
/// assert!(validator.is_valid("relative/path"));
///
/// let errors = validator.validate("CON.txt");
/// assert!(errors.iter().any(|e| e.rule == "no-windows-reserved"));
/// ```
#[derive(Default)]
pub struct RuleValidator {
    rules: RwLock<Vec<Arc<dyn ValidationRule>>>,
}

impl std::fmt::Debug for RuleValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.read().iter().map(|r| r.name().to_string()).collect();
        f.debug_struct("RuleValidator").field("rules", &names).finish()
    }
}

impl Clone for RuleValidator {
    fn clone(&self) -> Self {
        Self {
            rules: RwLock::new(self.rules()),
        }
    }
}

impl RuleValidator {
    /// Validator with no rules; every path passes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validator with the seven security rules registered.
    #[must_use]
    pub fn secure() -> Self {
        let validator = Self::new();
        validator.require_secure();
        validator
    }

    /// Validator wired from a `[rules]` configuration section.
    ///
    /// Registration order: security rules (when `secure`), `require` in list
    /// order, extensions, max length, required patterns, forbidden patterns.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] for an unknown rule name, or for a rule
    /// in `require` that needs an argument.
    pub fn from_config(config: &RulesConfig) -> Result<Self, PathSafeError> {
        let validator = Self::new();

        if config.secure {
            validator.require_secure();
        }

        for name in &config.require {
            let invalid = |value: String| {
                PathSafeError::from(ConfigError::InvalidValue {
                    key: "rules.require".to_string(),
                    value,
                })
            };
            let kind = RuleKind::from_str(name).map_err(|_| invalid(format!("unknown rule {name:?}")))?;
            let rule = builtin_rule(kind)
                .ok_or_else(|| invalid(format!("rule {name:?} needs an argument and has its own key")))?;
            validator.add_rule(rule)?;
        }

        if !config.extensions.is_empty() {
            validator.require_extension(config.extensions.iter().cloned());
        }
        if let Some(max_length) = config.max_length {
            validator.require_max_length(max_length);
        }
        for pattern in &config.require_patterns {
            validator.require_pattern(pattern.clone());
        }
        for pattern in &config.forbid_patterns {
            validator.forbid_pattern(pattern.clone());
        }

        Ok(validator)
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Arc<dyn ValidationRule>>> {
        self.rules.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Arc<dyn ValidationRule>>> {
        self.rules.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------

    /// Append a rule.
    ///
    /// # Errors
    ///
    /// [`ValidatorError::RuleCannotBeNil`] when the rule has an empty name.
    pub fn add_rule(&self, rule: Arc<dyn ValidationRule>) -> Result<(), ValidatorError> {
        if rule.name().is_empty() {
            return Err(ValidatorError::RuleCannotBeNil);
        }
        debug!(rule = rule.name(), "registering validation rule");
        self.write().push(rule);
        Ok(())
    }

    /// Remove the first rule with exactly this name.
    ///
    /// # Errors
    ///
    /// [`ValidatorError::RuleNotFound`] when no rule has that name.
    pub fn remove_rule(&self, name: &str) -> Result<(), ValidatorError> {
        let mut rules = self.write();
        let index = rules
            .iter()
            .position(|r| r.name() == name)
            .ok_or_else(|| ValidatorError::RuleNotFound { name: name.to_string() })?;
        rules.remove(index);
        debug!(rule = name, "removed validation rule");
        Ok(())
    }

    pub fn clear_rules(&self) {
        self.write().clear();
        debug!("cleared validation rules");
    }

    /// Snapshot of the registered rules, in registration order.
    #[must_use]
    pub fn rules(&self) -> Vec<Arc<dyn ValidationRule>> {
        self.read().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    /// Run every rule against a raw path.
    ///
    /// Returns one [`ValidationError`] per failing rule, in registration
    /// order; an empty list means every rule passed.
    pub fn validate(&self, path: impl AsRef<OsStr>) -> Vec<ValidationError> {
        let path = path.as_ref();
        let display = path.to_string_lossy();
        let _span = validation_span(Path::new(path)).entered();
        self.run(&display, |rule| rule.validate(path))
    }

    /// Run every rule against a constructed path.
    ///
    /// Each rule decides which rendering it judges; see
    /// [`ValidationRule::validate_path`].
    pub fn validate_path(&self, path: &SafePath) -> Vec<ValidationError> {
        let display = path.display_string();
        let _span = validation_span(path.normalized()).entered();
        self.run(&display, |rule| rule.validate_path(path))
    }

    fn run<F>(&self, display: &str, check: F) -> Vec<ValidationError>
    where
        F: Fn(&dyn ValidationRule) -> Result<(), pathsafe_utils::error::RuleViolation>,
    {
        let rules = self.rules();
        let mut errors = Vec::new();

        for rule in &rules {
            trace!(rule = rule.name(), "evaluating rule");
            if let Err(violation) = check(rule.as_ref()) {
                debug!(
                    rule = rule.name(),
                    code = violation.code(),
                    reason = %violation,
                    "rule failed"
                );
                errors.push(ValidationError::from_violation(display, rule.name(), &violation));
            }
        }

        errors
    }

    #[must_use]
    pub fn is_valid(&self, path: impl AsRef<OsStr>) -> bool {
        self.validate(path).is_empty()
    }

    #[must_use]
    pub fn is_valid_path(&self, path: &SafePath) -> bool {
        self.validate_path(path).is_empty()
    }

    /// [`validate`](Self::validate) wrapped in a serializable report.
    #[must_use]
    pub fn report(&self, path: impl AsRef<OsStr>) -> ValidationReport {
        let path = path.as_ref();
        ValidationReport::new(path.to_string_lossy(), self.validate(path))
    }

    /// [`validate_path`](Self::validate_path) wrapped in a serializable report.
    #[must_use]
    pub fn report_path(&self, path: &SafePath) -> ValidationReport {
        ValidationReport::new(path.display_string(), self.validate_path(path))
    }

    // ------------------------------------------------------------------
    // Fluent builders
    // ------------------------------------------------------------------

    fn register(&self, rule: Arc<dyn ValidationRule>) -> &Self {
        let name = rule.name().to_string();
        if let Err(e) = self.add_rule(rule) {
            warn!(rule = %name, error = %e, "failed to add built-in rule");
        }
        self
    }

    fn register_kind(&self, kind: RuleKind) -> &Self {
        match builtin_rule(kind) {
            Some(rule) => self.register(rule),
            None => {
                warn!(rule = %kind, "built-in rule needs an argument");
                self
            }
        }
    }

    pub fn require_absolute(&self) -> &Self {
        self.register_kind(RuleKind::AbsolutePath)
    }

    pub fn require_relative(&self) -> &Self {
        self.register_kind(RuleKind::RelativePath)
    }

    pub fn require_exists(&self) -> &Self {
        self.register_kind(RuleKind::Exists)
    }

    pub fn require_not_exists(&self) -> &Self {
        self.register_kind(RuleKind::NotExists)
    }

    pub fn require_readable(&self) -> &Self {
        self.register_kind(RuleKind::Readable)
    }

    pub fn require_writable(&self) -> &Self {
        self.register_kind(RuleKind::Writable)
    }

    pub fn require_executable(&self) -> &Self {
        self.register_kind(RuleKind::Executable)
    }

    pub fn require_directory(&self) -> &Self {
        self.register_kind(RuleKind::Directory)
    }

    pub fn require_file(&self) -> &Self {
        self.register_kind(RuleKind::File)
    }

    /// Require one of `extensions` (dot optional, case-insensitive).
    pub fn require_extension<I, S>(&self, extensions: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register(Arc::new(ExtensionRule::new(extensions)))
    }

    /// Bound the original path length, in bytes.
    pub fn require_max_length(&self, max_length: usize) -> &Self {
        self.register(Arc::new(MaxLengthRule::new(max_length)))
    }

    pub fn require_pattern(&self, pattern: impl Into<String>) -> &Self {
        self.register(Arc::new(PatternRule::required(pattern)))
    }

    pub fn forbid_pattern(&self, pattern: impl Into<String>) -> &Self {
        self.register(Arc::new(PatternRule::forbidden(pattern)))
    }

    /// Register, in order: no-path-traversal, no-null-bytes,
    /// no-control-chars, no-windows-reserved, no-unc-paths, no-drive-paths,
    /// valid-utf8.
    pub fn require_secure(&self) -> &Self {
        for rule in secure_rules() {
            self.register(rule);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathsafe_utils::error::RuleViolation;

    struct Unnamed;

    impl ValidationRule for Unnamed {
        fn name(&self) -> &str {
            ""
        }

        fn description(&self) -> &str {
            "has no name"
        }

        fn validate(&self, _path: &OsStr) -> Result<(), RuleViolation> {
            Ok(())
        }
    }

    fn names(validator: &RuleValidator) -> Vec<String> {
        validator.rules().iter().map(|r| r.name().to_string()).collect()
    }

    #[test]
    fn test_add_rule_rejects_unnamed() {
        let validator = RuleValidator::new();
        assert_eq!(
            validator.add_rule(Arc::new(Unnamed)),
            Err(ValidatorError::RuleCannotBeNil)
        );
        assert!(validator.is_empty());
    }

    #[test]
    fn test_remove_rule_first_match_only() {
        let validator = RuleValidator::new();
        validator.require_relative().require_file().require_relative();

        validator.remove_rule("relative-path").unwrap();
        assert_eq!(names(&validator), vec!["file", "relative-path"]);

        assert_eq!(
            validator.remove_rule("absolute-path"),
            Err(ValidatorError::RuleNotFound {
                name: "absolute-path".to_string()
            })
        );
    }

    #[test]
    fn test_clear_rules() {
        let validator = RuleValidator::secure();
        assert_eq!(validator.len(), 7);
        validator.clear_rules();
        assert!(validator.is_empty());
        assert!(validator.is_valid("../anything"));
    }

    #[test]
    fn test_rules_is_a_snapshot() {
        let validator = RuleValidator::new();
        validator.require_relative();
        let snapshot = validator.rules();
        validator.require_absolute();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(validator.len(), 2);
    }

    #[test]
    fn test_no_short_circuit_and_order() {
        let validator = RuleValidator::new();
        validator
            .require_absolute()
            .require_max_length(3)
            .forbid_pattern("secret");

        let errors = validator.validate("my/secret/path");
        let rules: Vec<&str> = errors.iter().map(|e| e.rule.as_str()).collect();
        assert_eq!(rules, vec!["absolute-path", "max-length", "forbid-pattern"]);
        assert!(errors.iter().all(|e| e.path == "my/secret/path"));
        assert_eq!(errors[0].code, "PATH_NOT_ABSOLUTE");
    }

    #[test]
    fn test_builders_work_standalone() {
        let validator = RuleValidator::new();
        validator.require_relative();
        validator.require_extension(["txt"]);
        assert!(validator.is_valid("notes/today.txt"));
        assert!(!validator.is_valid("notes/today.md"));
    }

    #[test]
    fn test_require_secure_order() {
        let validator = RuleValidator::new();
        validator.require_secure();
        assert_eq!(
            names(&validator),
            vec![
                "no-path-traversal",
                "no-null-bytes",
                "no-control-chars",
                "no-windows-reserved",
                "no-unc-paths",
                "no-drive-paths",
                "valid-utf8",
            ]
        );
    }

    #[test]
    fn test_secure_reports_reserved_name() {
        let validator = RuleValidator::secure();
        let errors = validator.validate("CON.txt");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule, "no-windows-reserved");
        assert_eq!(errors[0].code, "WINDOWS_RESERVED_NAME");
    }

    #[test]
    fn test_validate_path_judges_original_for_security_rules() {
        let validator = RuleValidator::secure();
        let path = SafePath::new("a/b/../c");
        let errors = validator.validate_path(&path);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule, "no-path-traversal");
        assert_eq!(errors[0].path, path.display_string());
    }

    #[test]
    fn test_from_config_order() {
        let config = RulesConfig {
            secure: true,
            require: vec!["relative-path".to_string()],
            extensions: vec!["txt".to_string()],
            max_length: Some(64),
            require_patterns: vec!["^docs/".to_string()],
            forbid_patterns: vec![r"\.\.".to_string()],
        };
        let validator = RuleValidator::from_config(&config).unwrap();
        let names = names(&validator);
        assert_eq!(names.len(), 12);
        assert_eq!(names[0], "no-path-traversal");
        assert_eq!(
            &names[7..],
            &["relative-path", "extension", "max-length", "require-pattern", "forbid-pattern"]
        );
        assert!(validator.is_valid("docs/readme.txt"));
        assert!(!validator.is_valid("src/readme.txt"));
    }

    #[test]
    fn test_from_config_rejects_unknown_rule() {
        let config = RulesConfig {
            require: vec!["sparkly".to_string()],
            ..RulesConfig::default()
        };
        assert!(RuleValidator::from_config(&config).is_err());

        let config = RulesConfig {
            require: vec!["extension".to_string()],
            ..RulesConfig::default()
        };
        assert!(RuleValidator::from_config(&config).is_err());
    }

    #[test]
    fn test_concurrent_validation() {
        let validator = Arc::new(RuleValidator::secure());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let validator = Arc::clone(&validator);
                std::thread::spawn(move || {
                    if i % 2 == 0 {
                        validator.require_relative();
                    }
                    validator.validate("../escape").len()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap() >= 1);
        }
        assert_eq!(validator.len(), 7 + 4);
    }

    #[test]
    fn test_clone_copies_rules() {
        let validator = RuleValidator::secure();
        let copy = validator.clone();
        validator.clear_rules();
        assert_eq!(copy.len(), 7);
    }
}
