use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr, VariantNames};

/// Source of a configuration value.
///
/// Indicates where a configuration value originated from in the precedence chain:
/// programmatic overrides > environment > config file > built-in defaults.
///
/// # Serialization
///
/// Serializes to lowercase strings: `"programmatic"`, `"env"`, `"config"`, `"default"`.
///
/// # Example
///
/// ```rust
/// use pathsafe_utils::types::ConfigSource;
///
/// let source = ConfigSource::Env;
/// let json = serde_json::to_string(&source).unwrap();
/// assert_eq!(json, r#""env""#);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Value provided programmatically (e.g., `Config::builder()`).
    Programmatic,
    /// Value read from a `PATHSAFE_*` environment variable.
    Env,
    /// Value loaded from configuration file.
    Config,
    /// Built-in default value (lowest precedence).
    Default,
}

/// Names of the built-in validation rules.
///
/// The string form is the name the rule reports in every
/// `ValidationError`, so configuration files and error reports agree.
///
/// ```rust
/// use pathsafe_utils::types::RuleKind;
/// use std::str::FromStr;
///
/// assert_eq!(RuleKind::NoPathTraversal.to_string(), "no-path-traversal");
/// assert_eq!(RuleKind::from_str("valid-utf8").unwrap(), RuleKind::ValidUtf8);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    IntoStaticStr,
    VariantNames,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    AbsolutePath,
    RelativePath,
    Exists,
    NotExists,
    Readable,
    Writable,
    Executable,
    Directory,
    File,
    Extension,
    MaxLength,
    RequirePattern,
    ForbidPattern,
    NoPathTraversal,
    NoNullBytes,
    NoControlChars,
    NoWindowsReserved,
    NoUncPaths,
    NoDrivePaths,
    #[strum(serialize = "valid-utf8")]
    #[serde(rename = "valid-utf8")]
    ValidUtf8,
}

impl RuleKind {
    /// The security rules wired by `require_secure()`, in registration order.
    pub const SECURE: [RuleKind; 7] = [
        RuleKind::NoPathTraversal,
        RuleKind::NoNullBytes,
        RuleKind::NoControlChars,
        RuleKind::NoWindowsReserved,
        RuleKind::NoUncPaths,
        RuleKind::NoDrivePaths,
        RuleKind::ValidUtf8,
    ];

    /// Whether the rule needs an argument (extensions, a bound or a pattern).
    #[must_use]
    pub fn takes_argument(self) -> bool {
        matches!(
            self,
            Self::Extension | Self::MaxLength | Self::RequirePattern | Self::ForbidPattern
        )
    }
}
