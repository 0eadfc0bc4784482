use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Library-level error type with rich context and user-friendly reporting.
///
/// `PathSafeError` covers the *configuration* and *environment* error classes.
/// Validation outcomes are never errors of this type: a failing rule produces a
/// [`ValidationError`] record, and a safety verdict is a plain `bool`.
///
/// # Error Categories
///
/// | Category | Description |
/// |----------|-------------|
/// | `Config` | Configuration file or programmatic option errors |
/// | `Validator` | Misuse of the rule registry (unnamed rule, unknown rule name) |
/// | `Path` | Paths that cannot be related or made absolute |
/// | `Io` | Filesystem failures outside of rule evaluation |
///
/// # Example
///
/// ```rust
/// use pathsafe_utils::error::{PathSafeError, UserFriendlyError, ValidatorError};
///
/// let err = PathSafeError::from(ValidatorError::RuleNotFound {
///     name: "exists".to_string(),
/// });
/// assert!(err.user_message().contains("exists"));
/// ```
#[derive(Error, Debug)]
pub enum PathSafeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validator error: {0}")]
    Validator(#[from] ValidatorError),

    #[error("Path error: {0}")]
    Path(#[from] PathError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration value for '{key}': {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),
}

/// Errors returned by the rule registry of a validator.
///
/// These are configuration mistakes made by the caller, returned immediately
/// and never raised while a path is being validated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidatorError {
    /// The rule has no name, so it can neither be reported nor removed.
    #[error("rule cannot be nil")]
    RuleCannotBeNil,

    #[error("rule not found: {name:?}")]
    RuleNotFound { name: String },
}

/// Errors from lexical path computations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("cannot make {target} relative to {base}")]
    NotRelatable { base: String, target: String },

    #[error("failed to resolve absolute path for '{path}': {reason}")]
    AbsoluteFailed { path: String, reason: String },
}

/// Why a single validation rule rejected a path.
///
/// The `Display` text is the human-readable message placed in
/// [`ValidationError::message`]; [`code`](Self::code) is the stable
/// machine-readable code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleViolation {
    #[error("path must be absolute")]
    MustBeAbsolute,

    #[error("path must be relative")]
    MustBeRelative,

    #[error("path does not exist")]
    DoesNotExist,

    #[error("path already exists")]
    AlreadyExists,

    #[error("invalid path: path traversal detected")]
    TraversalDetected,

    #[error("path is not readable: {reason}")]
    NotReadable { reason: String },

    #[error("path is not writable: {reason}")]
    NotWritable { reason: String },

    #[error("path is not executable")]
    NotExecutable,

    #[error("path cannot be inspected: {reason}")]
    Inaccessible { reason: String },

    #[error("path is not a directory")]
    NotDirectory,

    #[error("path is not a file")]
    NotFile,

    #[error("path must have one of the required extensions: {allowed:?}")]
    InvalidExtension { allowed: Vec<String> },

    #[error("path exceeds maximum length: {actual} exceeds maximum {max}")]
    TooLong { actual: usize, max: usize },

    #[error("path does not match required pattern: {pattern}")]
    PatternMismatch { pattern: String },

    #[error("path matches forbidden pattern: {pattern}")]
    ForbiddenPattern { pattern: String },

    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("path contains null byte")]
    NullByte,

    #[error("path contains control character")]
    ControlCharacter,

    #[error("path uses Windows reserved device name")]
    WindowsReservedName,

    #[error("UNC paths not allowed")]
    UncPath,

    #[error("windows drive paths not allowed")]
    DrivePath,

    #[error("path contains invalid UTF-8 bytes")]
    InvalidUtf8Bytes,

    #[error("path contains overlong UTF-8 sequence")]
    OverlongUtf8,

    #[error("path contains invalid UTF-8 continuation byte")]
    InvalidUtf8Continuation,
}

impl RuleViolation {
    /// Stable, machine-readable code for this violation.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MustBeAbsolute => "PATH_NOT_ABSOLUTE",
            Self::MustBeRelative => "PATH_NOT_RELATIVE",
            Self::DoesNotExist => "PATH_NOT_FOUND",
            Self::AlreadyExists => "PATH_EXISTS",
            Self::TraversalDetected => "PATH_TRAVERSAL",
            Self::NotReadable { .. } => "PATH_NOT_READABLE",
            Self::NotWritable { .. } => "PATH_NOT_WRITABLE",
            Self::NotExecutable => "PATH_NOT_EXECUTABLE",
            Self::Inaccessible { .. } => "PATH_INACCESSIBLE",
            Self::NotDirectory => "PATH_NOT_DIRECTORY",
            Self::NotFile => "PATH_NOT_FILE",
            Self::InvalidExtension { .. } => "INVALID_EXTENSION",
            Self::TooLong { .. } => "PATH_TOO_LONG",
            Self::PatternMismatch { .. } => "PATTERN_MISMATCH",
            Self::ForbiddenPattern { .. } => "FORBIDDEN_PATTERN",
            Self::InvalidPattern { .. } => "INVALID_PATTERN",
            Self::NullByte => "NULL_BYTE",
            Self::ControlCharacter => "CONTROL_CHARACTER",
            Self::WindowsReservedName => "WINDOWS_RESERVED_NAME",
            Self::UncPath => "UNC_PATH",
            Self::DrivePath => "DRIVE_PATH",
            Self::InvalidUtf8Bytes => "INVALID_UTF8",
            Self::OverlongUtf8 => "OVERLONG_UTF8",
            Self::InvalidUtf8Continuation => "INVALID_UTF8_CONTINUATION",
        }
    }
}

/// One failed rule, as reported by a validator.
///
/// Pure data: produced per failing rule and returned in a list, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// The offending path, rendered lossily when it is not valid UTF-8
    pub path: String,
    /// Name of the rule that failed
    pub rule: String,
    /// Human-readable reason
    pub message: String,
    /// Machine-readable code
    pub code: String,
}

impl ValidationError {
    /// Build a record from a rule violation.
    #[must_use]
    pub fn from_violation(path: impl Into<String>, rule: impl Into<String>, v: &RuleViolation) -> Self {
        Self {
            path: path.into(),
            rule: rule.into(),
            message: v.to_string(),
            code: v.code().to_string(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "path validation error")
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    RuleRegistry,
    PathResolution,
    FileSystem,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::RuleRegistry => write!(f, "Rule Registry"),
            Self::PathResolution => write!(f, "Path Resolution"),
            Self::FileSystem => write!(f, "File System"),
        }
    }
}

impl UserFriendlyError for PathSafeError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(ConfigError::InvalidValue { key, value }) => {
                format!("Configuration value '{key}' is invalid: {value}")
            }
            Self::Config(ConfigError::InvalidFile(msg)) => {
                format!("Configuration file could not be used: {msg}")
            }
            Self::Validator(ValidatorError::RuleCannotBeNil) => {
                "Cannot register a validation rule without a name".to_string()
            }
            Self::Validator(ValidatorError::RuleNotFound { name }) => {
                format!("No validation rule named '{name}' is registered")
            }
            Self::Path(PathError::NotRelatable { base, target }) => {
                format!("'{target}' cannot be expressed relative to '{base}'")
            }
            Self::Path(PathError::AbsoluteFailed { path, reason }) => {
                format!("Could not resolve '{path}' to an absolute path: {reason}")
            }
            Self::Io(io_err) => format!("File system operation failed: {io_err}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(_) => Some(
                "Configuration is read from .pathsafe/config.toml, PATHSAFE_* environment variables and the builder API"
                    .to_string(),
            ),
            Self::Validator(ValidatorError::RuleNotFound { .. }) => {
                Some("Rules are matched by their exact name".to_string())
            }
            Self::Path(PathError::NotRelatable { .. }) => Some(
                "Both paths must be absolute (or both relative) and on the same volume".to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(_) => vec![
                "Check the [options], [checker] and [rules] sections of .pathsafe/config.toml"
                    .to_string(),
                "Set PATHSAFE_CONFIG to point at an explicit configuration file".to_string(),
            ],
            Self::Validator(ValidatorError::RuleCannotBeNil) => {
                vec!["Give the rule a non-empty name() before adding it".to_string()]
            }
            Self::Validator(ValidatorError::RuleNotFound { .. }) => vec![
                "List registered rules with RuleValidator::rules()".to_string(),
                "Built-in rule names are kebab-case, e.g. 'no-path-traversal'".to_string(),
            ],
            Self::Path(_) => vec!["Pass absolute paths for both the base and the candidate".to_string()],
            Self::Io(_) => vec!["Check that the path exists and permissions allow access".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Configuration,
            Self::Validator(_) => ErrorCategory::RuleRegistry,
            Self::Path(_) => ErrorCategory::PathResolution,
            Self::Io(_) => ErrorCategory::FileSystem,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_violation_messages_and_codes() {
        let v = RuleViolation::ForbiddenPattern {
            pattern: r"\.\.".to_string(),
        };
        assert_eq!(v.to_string(), r"path matches forbidden pattern: \.\.");
        assert_eq!(v.code(), "FORBIDDEN_PATTERN");

        assert_eq!(RuleViolation::MustBeAbsolute.to_string(), "path must be absolute");
        assert_eq!(
            RuleViolation::TooLong { actual: 12, max: 10 }.to_string(),
            "path exceeds maximum length: 12 exceeds maximum 10"
        );
    }

    #[test]
    fn test_validation_error_from_violation() {
        let err = ValidationError::from_violation("CON.txt", "no-windows-reserved", &RuleViolation::WindowsReservedName);
        assert_eq!(err.path, "CON.txt");
        assert_eq!(err.rule, "no-windows-reserved");
        assert_eq!(err.code, "WINDOWS_RESERVED_NAME");
        assert_eq!(err.to_string(), "path uses Windows reserved device name");
    }

    #[test]
    fn test_validation_error_empty_message_display() {
        let err = ValidationError {
            path: "x".to_string(),
            rule: "r".to_string(),
            message: String::new(),
            code: "VALIDATION_FAILED".to_string(),
        };
        assert_eq!(err.to_string(), "path validation error");
    }

    #[test]
    fn test_user_friendly_validator_errors() {
        let err = PathSafeError::from(ValidatorError::RuleCannotBeNil);
        assert_eq!(err.category(), ErrorCategory::RuleRegistry);
        assert!(!err.suggestions().is_empty());

        let err = PathSafeError::from(ValidatorError::RuleNotFound {
            name: "missing".to_string(),
        });
        assert!(err.user_message().contains("missing"));
        assert!(err.context().is_some());
    }

    #[test]
    fn test_config_error_category() {
        let err = PathSafeError::from(ConfigError::InvalidValue {
            key: "checker.max_length".to_string(),
            value: "must be greater than 0".to_string(),
        });
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(err.to_string().contains("checker.max_length"));
    }
}
