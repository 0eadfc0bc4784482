//! pathsafe - reject dangerous filesystem paths before they are used
//!
//! Two complementary gates for untrusted path strings, such as archive entry
//! names or user-supplied file names:
//!
//! - [`PathSafetyChecker`] answers a single yes/no question: can this path be
//!   used without risking traversal, encoding bypass, platform-specific
//!   injection or symlink escape?
//! - [`RuleValidator`] evaluates an ordered list of named rules and reports
//!   every failing rule as a [`ValidationError`].
//!
//! # Quick Start
//!
//! ```rust
//! use pathsafe::{PathOptions, PathSafetyChecker, RuleValidator, SafePath};
//!
//! let checker = PathSafetyChecker::new();
//! assert!(!checker.is_safe_str("../../../etc/passwd"));
//! assert!(checker.is_safe_str("safe/file.txt"));
//!
//! let entry = SafePath::with_options(
//!     "uploads/report.txt",
//!     PathOptions::default().max_length(255),
//! );
//! assert!(checker.is_safe(&entry));
//!
//! let validator = RuleValidator::new();
//! validator.require_relative().require_secure();
//! assert!(validator.validate("CON.txt").iter().any(|e| e.rule == "no-windows-reserved"));
//! ```
//!
//! # Configuration
//!
//! [`Config`] loads `.pathsafe/config.toml` (discovered upward from a start
//! directory), `PATHSAFE_*` environment variables and programmatic values
//! from [`ConfigBuilder`], and wires both gates:
//!
//! ```rust
//! use pathsafe::Config;
//!
//! let config = Config::builder()
//!     .checker_max_length(1024)
//!     .secure_rules(true)
//!     .build()
//!     .expect("valid config");
//!
//! let checker = pathsafe::checker_from_config(&config);
//! let validator = pathsafe::validator_from_config(&config).expect("known rules");
//! assert_eq!(checker.max_length(), 1024);
//! assert_eq!(validator.len(), 7);
//! ```
//!
//! # Time of check
//!
//! Both gates describe the filesystem at the moment they run. They are
//! decision functions, not atomic guards: callers that need hard guarantees
//! must open files with no-follow semantics or re-verify after opening.

use tracing::debug;

// ============================================================================
// Stable Public API - covered by semver guarantees for 1.x
// ============================================================================

pub use pathsafe_safety::{Detector, PathForm, PathSafetyChecker, SafetyViolation};

pub use pathsafe_validation::{
    RuleValidator, ValidationReport, ValidationRule, is_valid, validate, validate_exists,
    validate_extension, validate_readable, validate_writable,
};

pub use pathsafe_utils::paths::{PathOptions, SafePath, normalize, relative_path};

pub use pathsafe_utils::error::{
    ConfigError, ErrorCategory, PathError, PathSafeError, RuleViolation, UserFriendlyError,
    ValidationError, ValidatorError,
};

pub use pathsafe_utils::types::{ConfigSource, RuleKind};

/// Configuration for both gates, with precedence
/// programmatic > env > file > defaults.
pub use pathsafe_config::{Config, ConfigBuilder, RulesConfig};

/// Checker using the configured detector length bound.
#[must_use]
pub fn checker_from_config(config: &Config) -> PathSafetyChecker {
    PathSafetyChecker::with_max_length(config.checker.max_length)
}

/// Validator wired from the configured `[rules]` section.
///
/// # Errors
///
/// Unknown rule names, or argument-taking rules listed under `require`.
pub fn validator_from_config(config: &Config) -> Result<RuleValidator, PathSafeError> {
    let validator = RuleValidator::from_config(&config.rules)?;
    debug!(rules = validator.len(), "validator built from config");
    Ok(validator)
}

/// Wrap `path` with the configured [`PathOptions`].
#[must_use]
pub fn safe_path(path: impl AsRef<std::ffi::OsStr>, config: &Config) -> SafePath {
    SafePath::with_options(path, config.options.clone())
}

// ============================================================================
// Component crates - accessible but not stable
// ============================================================================

#[cfg(any(test, feature = "test-utils"))]
#[doc(hidden)]
pub use pathsafe_utils::test_support;

#[doc(hidden)]
pub use pathsafe_utils::{error, logging, paths, types};

#[doc(hidden)]
pub use pathsafe_safety::{checker, containment, detectors};

#[doc(hidden)]
pub use pathsafe_validation::rules;

#[doc(hidden)]
pub use pathsafe_config as config;
