use std::ffi::OsStr;
use std::io::ErrorKind;
use tracing::debug;

use pathsafe_utils::paths::SafePath;

use crate::containment::{ensure_link_within_base, ensure_resolved_within_base, ensure_within_base};
use crate::detectors::{DEFAULT_MAX_PATH_LENGTH, Detector};
use crate::{PathForm, SafetyViolation};

/// Quick boolean gate: can this path be used without risking traversal,
/// encoding bypass, platform injection or symlink escape?
///
/// The procedure, in order:
///
/// 1. Every detector runs against the original text (when non-empty).
/// 2. The detectors that stay meaningful after cleaning run against the
///    normalized form.
/// 3. If the entry exists and is a symlink: rejected outright unless
///    `follow_symlinks` is set; otherwise, with a restricted base, the link
///    target must resolve inside the base.
/// 4. With a restricted base, the path itself must lie inside the base,
///    both lexically and after resolving every symlink along it, so a
///    linked ancestor directory or a chain of links cannot leave the base.
///
/// Any filesystem error other than "not found" while inspecting the entry
/// or resolving its links is a rejection.
///
/// # Time of check
///
/// The verdict describes the filesystem at the moment of the call. A symlink
/// swapped in between this check and the caller's own open is not detected.
/// Callers that need a hard guarantee must open with `O_NOFOLLOW` semantics
/// or re-verify the opened handle.
///
/// # Example
///
/// ```rust
/// use pathsafe_safety::PathSafetyChecker;
///
/// let checker = PathSafetyChecker::new();
/// assert!(!checker.is_safe_str("../../../etc/passwd"));
/// assert!(checker.is_safe_str("safe/file.txt"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSafetyChecker {
    max_length: usize,
}

impl Default for PathSafetyChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl PathSafetyChecker {
    /// Checker with the default length bound of 4096 bytes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_length: DEFAULT_MAX_PATH_LENGTH,
        }
    }

    /// Checker with a custom default length bound.
    ///
    /// A non-zero `PathOptions::max_length` on the judged path still wins.
    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self { max_length }
    }

    #[must_use]
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Verdict for `path`.
    #[must_use]
    pub fn is_safe(&self, path: &SafePath) -> bool {
        self.check(path).is_ok()
    }

    /// Verdict for a raw path string with default options.
    #[must_use]
    pub fn is_safe_str(&self, path: impl AsRef<OsStr>) -> bool {
        self.is_safe(&SafePath::new(path))
    }

    /// Like [`is_safe`](Self::is_safe), but reports why a path was rejected.
    ///
    /// # Errors
    ///
    /// The first [`SafetyViolation`] found.
    pub fn check(&self, path: &SafePath) -> Result<(), SafetyViolation> {
        let result = self.run_checks(path);
        if let Err(violation) = &result {
            debug!(
                path = %path.original().to_string_lossy(),
                violation = %violation,
                "path rejected"
            );
        }
        result
    }

    fn length_bound(&self, path: &SafePath) -> usize {
        match path.options().max_length {
            0 => self.max_length,
            n => n,
        }
    }

    fn run_checks(&self, path: &SafePath) -> Result<(), SafetyViolation> {
        let max_length = self.length_bound(path);

        if path.original().is_empty() {
            return Err(SafetyViolation::Empty);
        }

        if let Some(detector) = Detector::first_violation(path.original_bytes(), max_length, &Detector::ALL) {
            return Err(SafetyViolation::Detector {
                detector,
                form: PathForm::Original,
            });
        }

        if let Some(detector) =
            Detector::first_violation(path.normalized_bytes(), max_length, &Detector::NORMALIZED)
        {
            return Err(SafetyViolation::Detector {
                detector,
                form: PathForm::Normalized,
            });
        }

        self.check_symlink(path)?;

        if let Some(base) = &path.options().restrict_to_base {
            ensure_within_base(path.normalized(), base)?;
            ensure_resolved_within_base(path.normalized(), base)?;
        }

        Ok(())
    }

    fn check_symlink(&self, path: &SafePath) -> Result<(), SafetyViolation> {
        let entry = path.normalized();
        let metadata = match entry.symlink_metadata() {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(SafetyViolation::FilesystemError {
                    path: entry.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };

        if !metadata.file_type().is_symlink() {
            return Ok(());
        }

        if !path.options().follow_symlinks {
            return Err(SafetyViolation::SymlinkNotAllowed {
                path: entry.display().to_string(),
            });
        }

        match &path.options().restrict_to_base {
            Some(base) => ensure_link_within_base(entry, base),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathsafe_utils::paths::PathOptions;
    use pathsafe_utils::test_support::Sandbox;

    #[test]
    fn test_classic_traversal_is_unsafe() {
        let checker = PathSafetyChecker::new();
        assert!(!checker.is_safe_str("../../../etc/passwd"));
        assert!(matches!(
            checker.check(&SafePath::new("../../../etc/passwd")),
            Err(SafetyViolation::Detector {
                detector: Detector::Traversal,
                form: PathForm::Original
            })
        ));
    }

    #[test]
    fn test_plain_relative_path_is_safe() {
        let checker = PathSafetyChecker::new();
        assert!(checker.is_safe_str("safe/file.txt"));
        assert!(checker.is_safe_str(".hidden"));
    }

    #[test]
    fn test_traversal_hidden_by_normalization_is_caught() {
        // "a/b/../c" cleans to "a/c", but the original still carries "..".
        let checker = PathSafetyChecker::new();
        assert!(!checker.is_safe_str("a/b/../c"));
    }

    #[test]
    fn test_empty_path_is_unsafe() {
        let checker = PathSafetyChecker::new();
        assert_eq!(checker.check(&SafePath::new("")), Err(SafetyViolation::Empty));
    }

    #[test]
    fn test_trailing_dot_only_checked_on_original() {
        let checker = PathSafetyChecker::new();
        assert!(!checker.is_safe_str("file."));
        assert!(checker.is_safe_str("./file"));
    }

    #[test]
    fn test_length_bound_from_options_wins() {
        let checker = PathSafetyChecker::new();
        let long = "a".repeat(100);
        assert!(checker.is_safe_str(&long));
        let limited = SafePath::with_options(&long, PathOptions::default().max_length(50));
        assert!(!checker.is_safe(&limited));

        let tight = PathSafetyChecker::with_max_length(10);
        assert!(!tight.is_safe_str(&long));
        assert_eq!(tight.max_length(), 10);
    }

    #[test]
    fn test_very_long_path_is_rejected_not_panicking() {
        let checker = PathSafetyChecker::new();
        assert!(!checker.is_safe_str("A".repeat(10_000)));
    }

    #[test]
    fn test_restrict_to_base() {
        let sandbox = Sandbox::new();
        let opts = PathOptions::default().restrict_to_base(sandbox.root());
        let checker = PathSafetyChecker::new();

        let inside = SafePath::with_options(sandbox.path("sub/file.txt"), opts.clone());
        let outside = SafePath::with_options(sandbox.root().parent().unwrap().join("x.txt"), opts);

        // Absolute Windows paths carry a drive letter and are rejected regardless.
        if cfg!(unix) {
            assert!(checker.is_safe(&inside));
        }
        assert!(!checker.is_safe(&outside));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_rejected_when_not_following() {
        let sandbox = Sandbox::new();
        let real = sandbox.file("real.txt", "x");
        let link = sandbox.symlink("link", &real);

        let checker = PathSafetyChecker::new();
        let path = SafePath::new(&link);
        assert!(matches!(
            checker.check(&path),
            Err(SafetyViolation::SymlinkNotAllowed { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_followed_inside_base() {
        let sandbox = Sandbox::new();
        let real = sandbox.file("real.txt", "x");
        let link = sandbox.symlink("link", &real);

        let opts = PathOptions::default()
            .restrict_to_base(sandbox.root())
            .follow_symlinks(true);
        assert!(PathSafetyChecker::new().is_safe(&SafePath::with_options(&link, opts)));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escaping_base_is_unsafe() {
        let sandbox = Sandbox::new();
        let link = sandbox.symlink("link", "/etc/passwd");

        let opts = PathOptions::default()
            .restrict_to_base(sandbox.root())
            .follow_symlinks(true);
        let verdict = PathSafetyChecker::new().check(&SafePath::with_options(&link, opts));
        assert!(matches!(verdict, Err(SafetyViolation::SymlinkEscape { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_linked_ancestor_escaping_base_is_unsafe() {
        let sandbox = Sandbox::new();
        sandbox.symlink("dirlink", "/etc");

        let opts = PathOptions::default()
            .restrict_to_base(sandbox.root())
            .follow_symlinks(true);
        let path = SafePath::with_options(sandbox.path("dirlink/passwd"), opts);
        let verdict = PathSafetyChecker::new().check(&path);
        assert!(matches!(verdict, Err(SafetyViolation::SymlinkEscape { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_followed_without_base_is_safe() {
        let sandbox = Sandbox::new();
        let link = sandbox.symlink("link", "/etc/passwd");
        let opts = PathOptions::default().follow_symlinks(true);
        assert!(PathSafetyChecker::new().is_safe(&SafePath::with_options(&link, opts)));
    }

    #[test]
    fn test_allow_unsafe_is_not_honoured() {
        let opts = PathOptions::default().allow_unsafe(true);
        let path = SafePath::with_options("../escape", opts);
        assert!(!PathSafetyChecker::new().is_safe(&path));
    }
}
