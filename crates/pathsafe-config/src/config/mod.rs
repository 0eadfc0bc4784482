//! Configuration management for pathsafe
//!
//! Hierarchical configuration with discovery and precedence:
//! programmatic > env > file > defaults. Configuration files are TOML with
//! `[options]`, `[checker]` and `[rules]` sections, found at
//! `.pathsafe/config.toml`.

mod builder;
mod discovery;
mod model;
mod validation;

pub use builder::ConfigBuilder;
pub use discovery::{ENV_CONFIG, ENV_FOLLOW_SYMLINKS, ENV_MAX_LENGTH, ENV_RESTRICT_TO_BASE};
pub use model::*;
pub use pathsafe_utils::types::ConfigSource;
