//! Filesystem and shape rules: absolute/relative, existence, access,
//! entry type, extension, length and regex patterns.

use regex::Regex;
use std::ffi::OsStr;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Component, Path};
use tempfile::NamedTempFile;

use pathsafe_utils::error::RuleViolation;
use pathsafe_utils::paths::{SafePath, normalize};
use pathsafe_utils::types::RuleKind;

use crate::rule::ValidationRule;

/// Patterns that attackers try to hide behind path cleaning. A pattern rule
/// using one of these also judges the original, uncleaned path.
const TRAVERSAL_PATTERNS: [&str; 6] = [r"\.\.", r"\.\./", r"/\.\./", "%2e%2e", "%252e", r"\x2e\x2e"];

pub(crate) fn rule_name(kind: RuleKind) -> &'static str {
    kind.into()
}

fn has_parent_component(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir))
}

/// Clean `path` and refuse it when `..` survives cleaning.
fn cleaned(path: &OsStr) -> Result<std::path::PathBuf, RuleViolation> {
    let clean = normalize(Path::new(path));
    if has_parent_component(&clean) {
        return Err(RuleViolation::TraversalDetected);
    }
    Ok(clean)
}

fn inaccessible(e: &std::io::Error) -> RuleViolation {
    RuleViolation::Inaccessible { reason: e.to_string() }
}

/// Metadata of the entry, following symlinks. "Not found" is reported as
/// [`RuleViolation::DoesNotExist`]; any other failure as inaccessible.
fn entry_metadata(path: &Path) -> Result<fs::Metadata, RuleViolation> {
    fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => RuleViolation::DoesNotExist,
        _ => inaccessible(&e),
    })
}

// ============================================================================
// Absolute / relative
// ============================================================================

/// Path must be platform-absolute.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbsolutePathRule;

impl ValidationRule for AbsolutePathRule {
    fn name(&self) -> &str {
        rule_name(RuleKind::AbsolutePath)
    }

    fn description(&self) -> &str {
        "path must be absolute"
    }

    fn validate(&self, path: &OsStr) -> Result<(), RuleViolation> {
        if Path::new(path).is_absolute() {
            Ok(())
        } else {
            Err(RuleViolation::MustBeAbsolute)
        }
    }
}

/// Path must not be platform-absolute. Exact complement of [`AbsolutePathRule`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RelativePathRule;

impl ValidationRule for RelativePathRule {
    fn name(&self) -> &str {
        rule_name(RuleKind::RelativePath)
    }

    fn description(&self) -> &str {
        "path must be relative"
    }

    fn validate(&self, path: &OsStr) -> Result<(), RuleViolation> {
        if Path::new(path).is_absolute() {
            Err(RuleViolation::MustBeRelative)
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// Existence
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct ExistsRule;

impl ValidationRule for ExistsRule {
    fn name(&self) -> &str {
        rule_name(RuleKind::Exists)
    }

    fn description(&self) -> &str {
        "path must exist"
    }

    fn validate(&self, path: &OsStr) -> Result<(), RuleViolation> {
        match Path::new(path).try_exists() {
            Ok(true) => Ok(()),
            Ok(false) => Err(RuleViolation::DoesNotExist),
            Err(e) => Err(inaccessible(&e)),
        }
    }
}

/// Path must not exist. An entry whose existence cannot be determined fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotExistsRule;

impl ValidationRule for NotExistsRule {
    fn name(&self) -> &str {
        rule_name(RuleKind::NotExists)
    }

    fn description(&self) -> &str {
        "path must not exist"
    }

    fn validate(&self, path: &OsStr) -> Result<(), RuleViolation> {
        match Path::new(path).try_exists() {
            Ok(false) => Ok(()),
            Ok(true) => Err(RuleViolation::AlreadyExists),
            Err(e) => Err(inaccessible(&e)),
        }
    }
}

// ============================================================================
// Access
// ============================================================================

/// Entry can be opened for reading (files) or listed (directories).
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadableRule;

impl ValidationRule for ReadableRule {
    fn name(&self) -> &str {
        rule_name(RuleKind::Readable)
    }

    fn description(&self) -> &str {
        "path must be readable"
    }

    fn validate(&self, path: &OsStr) -> Result<(), RuleViolation> {
        let clean = cleaned(path)?;
        let not_readable = |e: std::io::Error| RuleViolation::NotReadable { reason: e.to_string() };

        if clean.is_dir() {
            fs::read_dir(&clean).map_err(not_readable)?;
        } else {
            fs::File::open(&clean).map_err(not_readable)?;
        }
        Ok(())
    }
}

/// Entry can be written. For a directory, or a missing entry's parent
/// directory, a temporary file is created and removed inside it.
#[derive(Debug, Clone, Copy, Default)]
pub struct WritableRule;

impl WritableRule {
    fn check_dir_writable(dir: &Path) -> Result<(), RuleViolation> {
        NamedTempFile::new_in(dir)
            .map(drop)
            .map_err(|e| RuleViolation::NotWritable {
                reason: format!("directory {} is not writable: {e}", dir.display()),
            })
    }
}

impl ValidationRule for WritableRule {
    fn name(&self) -> &str {
        rule_name(RuleKind::Writable)
    }

    fn description(&self) -> &str {
        "path must be writable"
    }

    fn validate(&self, path: &OsStr) -> Result<(), RuleViolation> {
        let clean = cleaned(path)?;

        let metadata = match fs::metadata(&clean) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let parent = match clean.parent() {
                    Some(p) if !p.as_os_str().is_empty() => p,
                    _ => Path::new("."),
                };
                return Self::check_dir_writable(parent);
            }
            Err(e) => return Err(RuleViolation::NotWritable { reason: e.to_string() }),
        };

        if metadata.is_dir() {
            return Self::check_dir_writable(&clean);
        }

        OpenOptions::new()
            .write(true)
            .open(&clean)
            .map(drop)
            .map_err(|e| RuleViolation::NotWritable { reason: e.to_string() })
    }
}

/// Entry has an execute permission bit set (Unix), or an executable
/// extension (elsewhere).
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutableRule;

impl ValidationRule for ExecutableRule {
    fn name(&self) -> &str {
        rule_name(RuleKind::Executable)
    }

    fn description(&self) -> &str {
        "path must be executable"
    }

    fn validate(&self, path: &OsStr) -> Result<(), RuleViolation> {
        let metadata = entry_metadata(Path::new(path))?;

        #[cfg(unix)]
        let executable = {
            use std::os::unix::fs::PermissionsExt;
            metadata.permissions().mode() & 0o111 != 0
        };

        #[cfg(not(unix))]
        let executable = metadata.is_file()
            && Path::new(path)
                .extension()
                .map(|ext| {
                    let ext = ext.to_string_lossy().to_ascii_lowercase();
                    matches!(ext.as_str(), "exe" | "bat" | "cmd" | "com")
                })
                .unwrap_or(false);

        if executable {
            Ok(())
        } else {
            Err(RuleViolation::NotExecutable)
        }
    }
}

// ============================================================================
// Entry type
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryRule;

impl ValidationRule for DirectoryRule {
    fn name(&self) -> &str {
        rule_name(RuleKind::Directory)
    }

    fn description(&self) -> &str {
        "path must be a directory"
    }

    fn validate(&self, path: &OsStr) -> Result<(), RuleViolation> {
        if entry_metadata(Path::new(path))?.is_dir() {
            Ok(())
        } else {
            Err(RuleViolation::NotDirectory)
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FileRule;

impl ValidationRule for FileRule {
    fn name(&self) -> &str {
        rule_name(RuleKind::File)
    }

    fn description(&self) -> &str {
        "path must be a file"
    }

    fn validate(&self, path: &OsStr) -> Result<(), RuleViolation> {
        if entry_metadata(Path::new(path))?.is_file() {
            Ok(())
        } else {
            Err(RuleViolation::NotFile)
        }
    }
}

// ============================================================================
// Extension
// ============================================================================

/// Extension must be one of an allow-list.
///
/// Entries may be written with or without the leading dot. Matching is
/// case-insensitive using full Unicode lowercasing. A path without an
/// extension (including dotfiles such as `.bashrc`) never matches.
#[derive(Debug, Clone, Default)]
pub struct ExtensionRule {
    allowed: Vec<String>,
}

impl ExtensionRule {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: extensions.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    fn matches(&self, path: &Path) -> bool {
        let Some(ext) = path.extension() else {
            return false;
        };
        let ext = ext.to_string_lossy().to_lowercase();
        self.allowed
            .iter()
            .any(|allowed| allowed.strip_prefix('.').unwrap_or(allowed).to_lowercase() == ext)
    }
}

impl ValidationRule for ExtensionRule {
    fn name(&self) -> &str {
        rule_name(RuleKind::Extension)
    }

    fn description(&self) -> &str {
        "path must have one of the allowed extensions"
    }

    fn validate(&self, path: &OsStr) -> Result<(), RuleViolation> {
        if self.matches(Path::new(path)) {
            Ok(())
        } else {
            Err(RuleViolation::InvalidExtension {
                allowed: self.allowed.clone(),
            })
        }
    }
}

// ============================================================================
// Length
// ============================================================================

/// Length bound in bytes, measured on the original path so that cleaning
/// cannot be used to slip past it.
#[derive(Debug, Clone, Copy)]
pub struct MaxLengthRule {
    max_length: usize,
}

impl MaxLengthRule {
    #[must_use]
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    #[must_use]
    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

impl ValidationRule for MaxLengthRule {
    fn name(&self) -> &str {
        rule_name(RuleKind::MaxLength)
    }

    fn description(&self) -> &str {
        "path must not exceed maximum length"
    }

    fn validate(&self, path: &OsStr) -> Result<(), RuleViolation> {
        let actual = path.len();
        if actual > self.max_length {
            return Err(RuleViolation::TooLong {
                actual,
                max: self.max_length,
            });
        }
        Ok(())
    }

    fn validate_path(&self, path: &SafePath) -> Result<(), RuleViolation> {
        self.validate(path.original())
    }
}

// ============================================================================
// Patterns
// ============================================================================

/// Regex that the path must match (`require-pattern`) or must not match
/// (`forbid-pattern`).
///
/// The pattern is compiled once. An invalid pattern does not panic: every
/// evaluation fails with [`RuleViolation::InvalidPattern`]. Non-UTF-8 paths
/// are matched against their lossy rendering.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pattern: String,
    compiled: Result<Regex, String>,
    required: bool,
}

impl PatternRule {
    pub fn required(pattern: impl Into<String>) -> Self {
        Self::build(pattern.into(), true)
    }

    pub fn forbidden(pattern: impl Into<String>) -> Self {
        Self::build(pattern.into(), false)
    }

    fn build(pattern: String, required: bool) -> Self {
        let compiled = Regex::new(&pattern).map_err(|e| e.to_string());
        Self {
            pattern,
            compiled,
            required,
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    fn is_traversal_pattern(&self) -> bool {
        TRAVERSAL_PATTERNS.contains(&self.pattern.as_str())
    }
}

impl ValidationRule for PatternRule {
    fn name(&self) -> &str {
        if self.required {
            rule_name(RuleKind::RequirePattern)
        } else {
            rule_name(RuleKind::ForbidPattern)
        }
    }

    fn description(&self) -> &str {
        if self.required {
            "path must match pattern"
        } else {
            "path must not match pattern"
        }
    }

    fn validate(&self, path: &OsStr) -> Result<(), RuleViolation> {
        let regex = self.compiled.as_ref().map_err(|reason| RuleViolation::InvalidPattern {
            pattern: self.pattern.clone(),
            reason: reason.clone(),
        })?;

        let matched = regex.is_match(&path.to_string_lossy());
        match (self.required, matched) {
            (true, false) => Err(RuleViolation::PatternMismatch {
                pattern: self.pattern.clone(),
            }),
            (false, true) => Err(RuleViolation::ForbiddenPattern {
                pattern: self.pattern.clone(),
            }),
            _ => Ok(()),
        }
    }

    fn validate_path(&self, path: &SafePath) -> Result<(), RuleViolation> {
        if self.is_traversal_pattern() {
            self.validate(path.original())?;
        }
        self.validate(path.normalized().as_os_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathsafe_utils::test_support::Sandbox;

    fn os(s: &str) -> &OsStr {
        OsStr::new(s)
    }

    #[test]
    fn test_absolute_and_relative_are_complements() {
        let abs = AbsolutePathRule;
        let rel = RelativePathRule;
        for p in ["relative/path", "", ".", "..", "/etc/passwd", "C:\\Windows", "\\\\server\\share"] {
            assert_ne!(abs.validate(os(p)).is_ok(), rel.validate(os(p)).is_ok(), "{p:?}");
        }
        assert_eq!(rel.validate(os("/abs")).unwrap_err(), RuleViolation::MustBeRelative);
    }

    #[test]
    fn test_exists_and_not_exists() {
        let sandbox = Sandbox::new();
        let file = sandbox.file("present.txt", "x");
        let missing = sandbox.path("missing.txt");

        assert!(ExistsRule.validate(file.as_os_str()).is_ok());
        assert_eq!(
            ExistsRule.validate(missing.as_os_str()).unwrap_err(),
            RuleViolation::DoesNotExist
        );
        assert!(NotExistsRule.validate(missing.as_os_str()).is_ok());
        assert_eq!(
            NotExistsRule.validate(file.as_os_str()).unwrap_err(),
            RuleViolation::AlreadyExists
        );
    }

    #[test]
    fn test_readable() {
        let sandbox = Sandbox::new();
        let file = sandbox.file("r.txt", "x");
        assert!(ReadableRule.validate(file.as_os_str()).is_ok());
        assert!(ReadableRule.validate(sandbox.root().as_os_str()).is_ok());
        assert!(matches!(
            ReadableRule.validate(sandbox.path("nope").as_os_str()),
            Err(RuleViolation::NotReadable { .. })
        ));
        assert_eq!(
            ReadableRule.validate(os("../outside")).unwrap_err(),
            RuleViolation::TraversalDetected
        );
    }

    #[test]
    fn test_writable_existing_and_missing() {
        let sandbox = Sandbox::new();
        let file = sandbox.file("w.txt", "x");
        assert!(WritableRule.validate(file.as_os_str()).is_ok());
        assert!(WritableRule.validate(sandbox.root().as_os_str()).is_ok());
        // Missing entry: its parent directory decides.
        assert!(WritableRule.validate(sandbox.path("new.txt").as_os_str()).is_ok());
        assert!(matches!(
            WritableRule.validate(sandbox.path("no/such/dir/new.txt").as_os_str()),
            Err(RuleViolation::NotWritable { .. })
        ));
        // The probe leaves nothing behind.
        assert_eq!(fs::read_dir(sandbox.root()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_writable_read_only_dir() {
        use pathsafe_utils::test_support::{permissions_enforced, set_mode};
        if !permissions_enforced() {
            return;
        }
        let sandbox = Sandbox::new();
        let dir = sandbox.dir("ro");
        set_mode(&dir, 0o500);
        let verdict = WritableRule.validate(dir.join("new.txt").as_os_str());
        set_mode(&dir, 0o700);
        assert!(matches!(verdict, Err(RuleViolation::NotWritable { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_executable() {
        use pathsafe_utils::test_support::set_mode;
        let sandbox = Sandbox::new();
        let script = sandbox.file("run.sh", "#!/bin/sh\n");
        set_mode(&script, 0o644);
        assert_eq!(
            ExecutableRule.validate(script.as_os_str()).unwrap_err(),
            RuleViolation::NotExecutable
        );
        set_mode(&script, 0o755);
        assert!(ExecutableRule.validate(script.as_os_str()).is_ok());
        assert_eq!(
            ExecutableRule.validate(sandbox.path("gone").as_os_str()).unwrap_err(),
            RuleViolation::DoesNotExist
        );
    }

    #[test]
    fn test_directory_and_file() {
        let sandbox = Sandbox::new();
        let file = sandbox.file("f.txt", "x");
        let dir = sandbox.dir("d");

        assert!(DirectoryRule.validate(dir.as_os_str()).is_ok());
        assert_eq!(DirectoryRule.validate(file.as_os_str()).unwrap_err(), RuleViolation::NotDirectory);
        assert!(FileRule.validate(file.as_os_str()).is_ok());
        assert_eq!(FileRule.validate(dir.as_os_str()).unwrap_err(), RuleViolation::NotFile);
        assert_eq!(
            FileRule.validate(sandbox.path("gone").as_os_str()).unwrap_err(),
            RuleViolation::DoesNotExist
        );
    }

    #[test]
    fn test_extension_matching() {
        let rule = ExtensionRule::new(["txt", ".MD"]);
        assert!(rule.validate(os("notes.txt")).is_ok());
        assert!(rule.validate(os("NOTES.TXT")).is_ok());
        assert!(rule.validate(os("readme.md")).is_ok());
        assert!(rule.validate(os("archive.tar.gz")).is_err());
        assert!(rule.validate(os("noext")).is_err());
        assert!(rule.validate(os(".txt")).is_err());

        let unicode = ExtensionRule::new(["ÄÖ"]);
        assert!(unicode.validate(os("file.äö")).is_ok());

        let empty = ExtensionRule::default();
        assert_eq!(
            empty.validate(os("a.txt")).unwrap_err(),
            RuleViolation::InvalidExtension { allowed: vec![] }
        );
    }

    #[test]
    fn test_max_length_uses_original() {
        let rule = MaxLengthRule::new(10);
        // Normalizes to "a/b" but the original is 15 bytes.
        let path = SafePath::new("a/./././././/b");
        assert!(rule.validate(path.normalized().as_os_str()).is_ok());
        assert_eq!(
            rule.validate_path(&path).unwrap_err(),
            RuleViolation::TooLong { actual: 14, max: 10 }
        );
        assert!(rule.validate_path(&SafePath::new("short")).is_ok());
    }

    #[test]
    fn test_pattern_rules() {
        let require = PatternRule::required(r"^[a-z/]+\.txt$");
        assert_eq!(require.name(), "require-pattern");
        assert!(require.validate(os("docs/a.txt")).is_ok());
        assert!(matches!(
            require.validate(os("docs/A.TXT")),
            Err(RuleViolation::PatternMismatch { .. })
        ));

        let forbid = PatternRule::forbidden("secret");
        assert_eq!(forbid.name(), "forbid-pattern");
        assert!(matches!(
            forbid.validate(os("my/secret/file")),
            Err(RuleViolation::ForbiddenPattern { .. })
        ));
        assert!(forbid.validate(os("public/file")).is_ok());
    }

    #[test]
    fn test_invalid_pattern_is_a_rule_failure() {
        let rule = PatternRule::forbidden("(unclosed");
        let err = rule.validate(os("anything")).unwrap_err();
        assert_eq!(err.code(), "INVALID_PATTERN");
    }

    #[test]
    fn test_traversal_pattern_checks_original() {
        let rule = PatternRule::forbidden(r"\.\.");
        // "a/b/../c" normalizes to "a/c", which no longer matches.
        let path = SafePath::new("a/b/../c");
        assert!(rule.validate(path.normalized().as_os_str()).is_ok());
        assert!(matches!(
            rule.validate_path(&path),
            Err(RuleViolation::ForbiddenPattern { .. })
        ));

        let plain = PatternRule::forbidden("b/");
        assert!(plain.validate_path(&path).is_ok());
    }
}
