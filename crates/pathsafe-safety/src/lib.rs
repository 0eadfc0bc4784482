//! Attack-pattern detection and containment checks for untrusted paths.
//!
//! [`PathSafetyChecker`] combines the byte-level [`detectors`] with the
//! filesystem-aware [`containment`] checks into a single verdict.

pub mod checker;
pub mod containment;
pub mod detectors;

use strum::{Display, IntoStaticStr};
use thiserror::Error;

pub use checker::PathSafetyChecker;
pub use detectors::{DEFAULT_MAX_PATH_LENGTH, Detector, WINDOWS_RESERVED_NAMES};

/// Which rendering of a path a detector rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum PathForm {
    Original,
    Normalized,
}

/// Reason a path was judged unsafe.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SafetyViolation {
    #[error("path is empty")]
    Empty,

    #[error("{form} path rejected by the {detector} detector")]
    Detector { detector: Detector, form: PathForm },

    #[error("symlink not allowed: {path}")]
    SymlinkNotAllowed { path: String },

    #[error("symlink {path} escapes base {base}: {reason}")]
    SymlinkEscape { path: String, base: String, reason: String },

    #[error("path {path} is outside of base {base}")]
    OutsideBase { path: String, base: String },

    #[error("cannot inspect {path}: {reason}")]
    FilesystemError { path: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_messages() {
        let v = SafetyViolation::Detector {
            detector: Detector::WindowsReservedName,
            form: PathForm::Normalized,
        };
        assert_eq!(
            v.to_string(),
            "normalized path rejected by the windows-reserved-name detector"
        );
        assert_eq!(SafetyViolation::Empty.to_string(), "path is empty");
    }
}
