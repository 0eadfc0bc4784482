//! Attack-pattern detectors exposed as validation rules.
//!
//! Each rule judges the original path first and then the normalized one, so
//! a pattern removed by cleaning is still reported.

use std::ffi::OsStr;

use pathsafe_safety::detectors::{
    self, Utf8Issue, is_control_char_safe, is_drive_safe, is_null_byte_safe, is_traversal_safe,
    is_unc_safe, is_windows_reserved_safe,
};
use pathsafe_utils::error::RuleViolation;
use pathsafe_utils::paths::SafePath;
use pathsafe_utils::types::RuleKind;

use super::builtin::rule_name;
use crate::rule::ValidationRule;

fn original_then_normalized<R: ValidationRule + ?Sized>(
    rule: &R,
    path: &SafePath,
) -> Result<(), RuleViolation> {
    rule.validate(path.original())?;
    rule.validate(path.normalized().as_os_str())
}

macro_rules! detector_rule {
    ($(#[$meta:meta])* $ty:ident, $kind:expr, $description:literal, $detector:path, $violation:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $ty;

        impl ValidationRule for $ty {
            fn name(&self) -> &str {
                rule_name($kind)
            }

            fn description(&self) -> &str {
                $description
            }

            fn validate(&self, path: &OsStr) -> Result<(), RuleViolation> {
                if $detector(path.as_encoded_bytes()) {
                    Ok(())
                } else {
                    Err($violation)
                }
            }

            fn validate_path(&self, path: &SafePath) -> Result<(), RuleViolation> {
                original_then_normalized(self, path)
            }
        }
    };
}

detector_rule!(
    /// Literal `..` or an encoded spelling of it.
    PathTraversalRule,
    RuleKind::NoPathTraversal,
    "path must not contain path traversal patterns",
    is_traversal_safe,
    RuleViolation::TraversalDetected
);

detector_rule!(
    /// Raw NUL or `%00`.
    NullByteRule,
    RuleKind::NoNullBytes,
    "path must not contain null bytes",
    is_null_byte_safe,
    RuleViolation::NullByte
);

detector_rule!(
    ControlCharacterRule,
    RuleKind::NoControlChars,
    "path must not contain control characters",
    is_control_char_safe,
    RuleViolation::ControlCharacter
);

detector_rule!(
    /// `CON`, `NUL`, `COM1` and friends, with or without extension.
    WindowsReservedRule,
    RuleKind::NoWindowsReserved,
    "path must not use Windows reserved device names",
    is_windows_reserved_safe,
    RuleViolation::WindowsReservedName
);

detector_rule!(
    UncPathRule,
    RuleKind::NoUncPaths,
    "path must not use UNC paths",
    is_unc_safe,
    RuleViolation::UncPath
);

detector_rule!(
    DrivePathRule,
    RuleKind::NoDrivePaths,
    "path must not use Windows drive paths",
    is_drive_safe,
    RuleViolation::DrivePath
);

/// Path bytes must be well-formed UTF-8.
///
/// The violation tells overlong sequences, stray continuation bytes and
/// other invalid bytes apart.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidUtf8Rule;

impl ValidationRule for ValidUtf8Rule {
    fn name(&self) -> &str {
        rule_name(RuleKind::ValidUtf8)
    }

    fn description(&self) -> &str {
        "path must contain valid UTF-8"
    }

    fn validate(&self, path: &OsStr) -> Result<(), RuleViolation> {
        match detectors::utf8_issue(path.as_encoded_bytes()) {
            None => Ok(()),
            Some(Utf8Issue::Overlong) => Err(RuleViolation::OverlongUtf8),
            Some(Utf8Issue::StrayContinuation) => Err(RuleViolation::InvalidUtf8Continuation),
            Some(Utf8Issue::InvalidBytes) => Err(RuleViolation::InvalidUtf8Bytes),
        }
    }

    fn validate_path(&self, path: &SafePath) -> Result<(), RuleViolation> {
        original_then_normalized(self, path)
    }
}
