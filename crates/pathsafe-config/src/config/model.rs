use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use pathsafe_utils::paths::PathOptions;
use pathsafe_utils::types::ConfigSource;

/// Default detector length bound, in bytes.
pub const DEFAULT_CHECKER_MAX_LENGTH: usize = 4096;

/// Largest accepted detector length bound.
pub const MAX_CHECKER_MAX_LENGTH: usize = 32_768;

/// Name of the directory that holds `config.toml`.
pub const CONFIG_DIR_NAME: &str = ".pathsafe";

/// Main configuration structure
///
/// Produced by [`Config::builder`] or by discovery, with precedence:
/// programmatic > environment > config file > defaults.
///
/// # Example config.toml
///
/// ```toml
/// [options]
/// max_length = 1024
/// restrict_to_base = "/srv/uploads"
/// follow_symlinks = false
///
/// [checker]
/// max_length = 4096
///
/// [rules]
/// secure = true
/// require = ["relative-path", "file"]
/// extensions = ["txt", ".md"]
/// forbid_patterns = ['\.\.']
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Options attached to every path judged with this configuration.
    pub options: PathOptions,
    /// Safety checker settings.
    pub checker: CheckerConfig,
    /// Rules wired into a validator built from this configuration.
    pub rules: RulesConfig,
    /// Source attribution for each setting.
    pub source_attribution: HashMap<String, ConfigSource>,
}

impl Default for Config {
    fn default() -> Self {
        let source_attribution = [
            "options.max_length",
            "options.restrict_to_base",
            "options.follow_symlinks",
            "options.allow_unsafe",
            "checker.max_length",
            "rules",
        ]
        .into_iter()
        .map(|key| (key.to_string(), ConfigSource::Default))
        .collect();

        Self {
            options: PathOptions::default(),
            checker: CheckerConfig::default(),
            rules: RulesConfig::default(),
            source_attribution,
        }
    }
}

impl Config {
    /// Where the value for `key` came from.
    #[must_use]
    pub fn source_of(&self, key: &str) -> Option<&ConfigSource> {
        self.source_attribution.get(key)
    }
}

/// `[checker]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CheckerConfig {
    /// Length bound used by the length detector when a path carries none.
    pub max_length: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_CHECKER_MAX_LENGTH,
        }
    }
}

/// `[rules]` section
///
/// Rules are registered in this order: the security set (when `secure`),
/// then `require` in list order, then `extensions`, `max_length`,
/// `require_patterns` and `forbid_patterns`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Register the seven security rules.
    pub secure: bool,
    /// Names of argument-less built-in rules, e.g. `"relative-path"`.
    pub require: Vec<String>,
    /// Allowed extensions; empty means no extension rule.
    pub extensions: Vec<String>,
    /// Bound for the `max-length` rule.
    pub max_length: Option<usize>,
    pub require_patterns: Vec<String>,
    pub forbid_patterns: Vec<String>,
}

/// `[options]` section as written in the file; every key is optional so
/// that only present keys override lower layers.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FileOptions {
    pub max_length: Option<usize>,
    pub restrict_to_base: Option<PathBuf>,
    pub follow_symlinks: Option<bool>,
    pub allow_unsafe: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FileChecker {
    pub max_length: Option<usize>,
}

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TomlConfig {
    pub options: Option<FileOptions>,
    pub checker: Option<FileChecker>,
    pub rules: Option<RulesConfig>,
}

/// Values set in code. These win over every other layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Explicit config file; disables discovery and `PATHSAFE_CONFIG`.
    pub config_path: Option<PathBuf>,
    pub max_length: Option<usize>,
    pub restrict_to_base: Option<PathBuf>,
    pub follow_symlinks: Option<bool>,
    pub allow_unsafe: Option<bool>,
    pub checker_max_length: Option<usize>,
    pub rules: Option<RulesConfig>,
}
