use std::path::PathBuf;

use pathsafe_utils::error::PathSafeError;

use super::{Config, ConfigOverrides, RulesConfig};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use pathsafe_config::Config;
    ///
    /// let config = Config::builder()
    ///     .restrict_to_base("/srv/uploads")
    ///     .max_length(1024)
    ///     .secure_rules(true)
    ///     .build()
    ///     .expect("valid config");
    /// assert_eq!(config.options.max_length, 1024);
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for programmatic configuration.
///
/// [`build`](Self::build) layers the values over built-in defaults only;
/// [`discover_from`](Self::discover_from) layers them over the environment
/// and a discovered config file as well.
///
/// # Source Attribution
///
/// All values set via the builder are attributed to
/// `ConfigSource::Programmatic`.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    overrides: ConfigOverrides,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load this file instead of discovering one.
    #[must_use]
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.overrides.config_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.overrides.max_length = Some(max_length);
        self
    }

    #[must_use]
    pub fn restrict_to_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.overrides.restrict_to_base = Some(base.into());
        self
    }

    #[must_use]
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.overrides.follow_symlinks = Some(follow);
        self
    }

    #[must_use]
    pub fn allow_unsafe(mut self, allow: bool) -> Self {
        self.overrides.allow_unsafe = Some(allow);
        self
    }

    #[must_use]
    pub fn checker_max_length(mut self, max_length: usize) -> Self {
        self.overrides.checker_max_length = Some(max_length);
        self
    }

    /// Replace the whole `[rules]` section.
    #[must_use]
    pub fn rules(mut self, rules: RulesConfig) -> Self {
        self.overrides.rules = Some(rules);
        self
    }

    /// Toggle the security rule set, keeping other rule settings.
    #[must_use]
    pub fn secure_rules(mut self, secure: bool) -> Self {
        self.overrides.rules.get_or_insert_with(RulesConfig::default).secure = secure;
        self
    }

    /// Append an argument-less rule by name.
    #[must_use]
    pub fn require_rule(mut self, name: impl Into<String>) -> Self {
        self.overrides
            .rules
            .get_or_insert_with(RulesConfig::default)
            .require
            .push(name.into());
        self
    }

    #[must_use]
    pub fn overrides(&self) -> &ConfigOverrides {
        &self.overrides
    }

    /// Build from defaults plus the values set on this builder.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the result does not validate.
    pub fn build(self) -> Result<Config, PathSafeError> {
        let mut config = Config::default();
        config.apply_overrides(&self.overrides);
        config.validate()?;
        Ok(config)
    }

    /// Discover env and file layers from `start_dir`, then apply the values
    /// set on this builder on top.
    ///
    /// # Errors
    ///
    /// See [`Config::discover`].
    pub fn discover_from(self, start_dir: &std::path::Path) -> anyhow::Result<Config> {
        Config::discover_from(start_dir, &self.overrides)
    }
}
