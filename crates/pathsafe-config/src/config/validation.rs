use std::str::FromStr;

use pathsafe_utils::error::{ConfigError, PathSafeError};
use pathsafe_utils::types::RuleKind;

use super::{Config, MAX_CHECKER_MAX_LENGTH};

fn invalid(key: &str, value: impl Into<String>) -> PathSafeError {
    PathSafeError::Config(ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    })
}

impl Config {
    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] naming the first offending key.
    pub fn validate(&self) -> Result<(), PathSafeError> {
        if self.checker.max_length == 0 {
            return Err(invalid("checker.max_length", "must be greater than 0"));
        }
        if self.checker.max_length > MAX_CHECKER_MAX_LENGTH {
            return Err(invalid(
                "checker.max_length",
                format!("exceeds maximum limit of {MAX_CHECKER_MAX_LENGTH}"),
            ));
        }

        if let Some(base) = &self.options.restrict_to_base
            && base.as_os_str().is_empty()
        {
            return Err(invalid("options.restrict_to_base", "must not be empty"));
        }

        if self.rules.max_length == Some(0) {
            return Err(invalid("rules.max_length", "must be greater than 0"));
        }

        for name in &self.rules.require {
            let kind = RuleKind::from_str(name)
                .map_err(|_| invalid("rules.require", format!("unknown rule {name:?}")))?;
            if kind.takes_argument() {
                return Err(invalid(
                    "rules.require",
                    format!("rule {name:?} needs an argument and has its own key"),
                ));
            }
        }

        if self.rules.extensions.iter().any(|ext| ext.trim_start_matches('.').is_empty()) {
            return Err(invalid("rules.extensions", "extensions must not be empty"));
        }

        Ok(())
    }
}
