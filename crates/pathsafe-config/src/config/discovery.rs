use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use pathsafe_utils::error::ConfigError;

use super::model::TomlConfig;
use super::{CONFIG_DIR_NAME, Config, ConfigOverrides, ConfigSource};

/// Explicit configuration file path.
pub const ENV_CONFIG: &str = "PATHSAFE_CONFIG";
/// Overrides `[options].max_length`.
pub const ENV_MAX_LENGTH: &str = "PATHSAFE_MAX_LENGTH";
/// Overrides `[options].restrict_to_base`.
pub const ENV_RESTRICT_TO_BASE: &str = "PATHSAFE_RESTRICT_TO_BASE";
/// Overrides `[options].follow_symlinks`.
pub const ENV_FOLLOW_SYMLINKS: &str = "PATHSAFE_FOLLOW_SYMLINKS";

fn parse_env_usize(key: &str, value: &str) -> Result<usize> {
    value.trim().parse::<usize>().map_err(|e| {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: format!("{value:?} is not a non-negative integer: {e}"),
        }
        .into()
    })
}

fn parse_env_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: format!("{value:?} is not a boolean"),
        }
        .into()),
    }
}

impl Config {
    /// Discover and load configuration from the current directory.
    ///
    /// Precedence: programmatic (`overrides`) > env > file > defaults.
    ///
    /// # Errors
    ///
    /// Fails when the current directory is unknown, a config file cannot be
    /// read or parsed, an environment value is malformed, or the result does
    /// not validate.
    pub fn discover(overrides: &ConfigOverrides) -> Result<Self> {
        let start_dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&start_dir, overrides)
    }

    /// Discover and load configuration starting from a specific directory,
    /// reading `PATHSAFE_*` variables from the process environment.
    ///
    /// # Errors
    ///
    /// See [`Config::discover`].
    pub fn discover_from(start_dir: &Path, overrides: &ConfigOverrides) -> Result<Self> {
        Self::discover_from_with_env(start_dir, overrides, |key| std::env::var(key).ok())
    }

    /// Path-driven variant with an injected environment lookup, so tests can
    /// avoid mutating process-global state.
    ///
    /// # Errors
    ///
    /// See [`Config::discover`].
    pub fn discover_from_with_env<F>(start_dir: &Path, overrides: &ConfigOverrides, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // File layer
        let config_path = match &overrides.config_path {
            Some(explicit) => Some(explicit.clone()),
            None => match env(ENV_CONFIG).filter(|v| !v.is_empty()) {
                Some(from_env) => Some(PathBuf::from(from_env)),
                None => Self::discover_config_file_from(start_dir)?,
            },
        };

        if let Some(path) = &config_path {
            debug!(path = %path.display(), "loading config file");
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            config.apply_file(file_config);
        }

        // Environment layer
        if let Some(value) = env(ENV_MAX_LENGTH) {
            config.options.max_length = parse_env_usize(ENV_MAX_LENGTH, &value)?;
            config.attribute("options.max_length", ConfigSource::Env);
        }
        if let Some(value) = env(ENV_RESTRICT_TO_BASE) {
            config.options.restrict_to_base = Some(PathBuf::from(value));
            config.attribute("options.restrict_to_base", ConfigSource::Env);
        }
        if let Some(value) = env(ENV_FOLLOW_SYMLINKS) {
            config.options.follow_symlinks = parse_env_bool(ENV_FOLLOW_SYMLINKS, &value)?;
            config.attribute("options.follow_symlinks", ConfigSource::Env);
        }

        // Programmatic layer
        config.apply_overrides(overrides);

        config.validate()?;
        Ok(config)
    }

    /// Discover config file by searching upward from a given directory.
    ///
    /// Walks up the directory tree looking for `.pathsafe/config.toml`,
    /// stopping at repository root markers (.git, .hg, .svn) or the
    /// filesystem root.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` leaves room for directory probes
    /// that can fail.
    pub fn discover_config_file_from(start_dir: &Path) -> Result<Option<PathBuf>> {
        let mut current_dir = start_dir.to_path_buf();

        loop {
            let config_path = current_dir.join(CONFIG_DIR_NAME).join("config.toml");
            if config_path.is_file() {
                return Ok(Some(config_path));
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                break;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(None)
    }

    /// Load configuration from TOML file
    pub(crate) fn load_config_file(path: &Path) -> Result<TomlConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::InvalidFile(e.to_string()))
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;
        Ok(config)
    }

    pub(crate) fn attribute(&mut self, key: &str, source: ConfigSource) {
        self.source_attribution.insert(key.to_string(), source);
    }

    fn apply_file(&mut self, file: TomlConfig) {
        let source = ConfigSource::Config;

        if let Some(options) = file.options {
            if let Some(max_length) = options.max_length {
                self.options.max_length = max_length;
                self.attribute("options.max_length", source.clone());
            }
            if let Some(base) = options.restrict_to_base {
                self.options.restrict_to_base = Some(base);
                self.attribute("options.restrict_to_base", source.clone());
            }
            if let Some(follow) = options.follow_symlinks {
                self.options.follow_symlinks = follow;
                self.attribute("options.follow_symlinks", source.clone());
            }
            if let Some(allow) = options.allow_unsafe {
                self.options.allow_unsafe = allow;
                self.attribute("options.allow_unsafe", source.clone());
            }
        }

        if let Some(checker) = file.checker
            && let Some(max_length) = checker.max_length
        {
            self.checker.max_length = max_length;
            self.attribute("checker.max_length", source.clone());
        }

        if let Some(rules) = file.rules {
            self.rules = rules;
            self.attribute("rules", source);
        }
    }

    pub(crate) fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        let source = ConfigSource::Programmatic;

        if let Some(max_length) = overrides.max_length {
            self.options.max_length = max_length;
            self.attribute("options.max_length", source.clone());
        }
        if let Some(base) = &overrides.restrict_to_base {
            self.options.restrict_to_base = Some(base.clone());
            self.attribute("options.restrict_to_base", source.clone());
        }
        if let Some(follow) = overrides.follow_symlinks {
            self.options.follow_symlinks = follow;
            self.attribute("options.follow_symlinks", source.clone());
        }
        if let Some(allow) = overrides.allow_unsafe {
            self.options.allow_unsafe = allow;
            self.attribute("options.allow_unsafe", source.clone());
        }
        if let Some(max_length) = overrides.checker_max_length {
            self.checker.max_length = max_length;
            self.attribute("checker.max_length", source.clone());
        }
        if let Some(rules) = &overrides.rules {
            self.rules = rules.clone();
            self.attribute("rules", source);
        }
    }
}
