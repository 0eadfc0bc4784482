use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};
use tracing::warn;

use crate::error::{PathError, ValidationError};

// ============================================================================
// Path Options
// ============================================================================

/// Options recognised when judging a path.
///
/// Immutable once attached to a [`SafePath`]; build a new `SafePath` to use
/// different options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathOptions {
    /// Maximum path length in bytes (0 = unset)
    pub max_length: usize,
    /// Directory the path must stay inside (None = unrestricted)
    pub restrict_to_base: Option<PathBuf>,
    /// Whether a symlink may be followed at all
    pub follow_symlinks: bool,
    /// Skip the `..` check in [`SafePath::validate`]. Never honoured by the safety checker.
    pub allow_unsafe: bool,
}

impl PathOptions {
    #[must_use]
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Restrict paths to `base`. An empty path clears the restriction.
    #[must_use]
    pub fn restrict_to_base(mut self, base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        self.restrict_to_base = if base.as_os_str().is_empty() {
            None
        } else {
            Some(base)
        };
        self
    }

    #[must_use]
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    #[must_use]
    pub fn allow_unsafe(mut self, allow: bool) -> Self {
        self.allow_unsafe = allow;
        self
    }
}

// ============================================================================
// Lexical normalization
// ============================================================================

/// Lexically clean a path.
///
/// Collapses repeated separators, drops `.` components, resolves `name/..`
/// pairs and drops `..` directly after the root. Leading `..` of a relative
/// path is kept. The empty result is `.`. Never touches the filesystem and
/// is idempotent.
#[must_use]
pub fn normalize(path: impl AsRef<Path>) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for component in path.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) => {}
                _ => out.push(component),
            },
            _ => out.push(component),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Make a path absolute against the current directory, then normalize it.
pub fn absolute_normalized(path: impl AsRef<Path>) -> Result<PathBuf, PathError> {
    let path = path.as_ref();
    let abs = std::path::absolute(path).map_err(|e| PathError::AbsoluteFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(normalize(abs))
}

/// Compute `target` relative to `base`, lexically.
///
/// # Errors
///
/// Returns [`PathError::NotRelatable`] when one path is absolute and the other
/// is not, when their prefixes (Windows volumes) differ, or when `base` keeps
/// `..` components that cannot be walked back.
pub fn relative_path(base: impl AsRef<Path>, target: impl AsRef<Path>) -> Result<PathBuf, PathError> {
    let base = normalize(base);
    let target = normalize(target);
    let not_relatable = || PathError::NotRelatable {
        base: base.display().to_string(),
        target: target.display().to_string(),
    };

    if base.has_root() != target.has_root() {
        return Err(not_relatable());
    }

    let base_parts: Vec<Component<'_>> = base.components().filter(|c| *c != Component::CurDir).collect();
    let target_parts: Vec<Component<'_>> =
        target.components().filter(|c| *c != Component::CurDir).collect();

    let base_prefix = base_parts.iter().find(|c| matches!(c, Component::Prefix(_)));
    let target_prefix = target_parts.iter().find(|c| matches!(c, Component::Prefix(_)));
    if base_prefix != target_prefix {
        return Err(not_relatable());
    }

    let common = base_parts
        .iter()
        .zip(target_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let remaining_base = &base_parts[common..];
    if remaining_base.contains(&Component::ParentDir) {
        return Err(not_relatable());
    }

    let mut rel = PathBuf::new();
    for _ in remaining_base {
        rel.push("..");
    }
    for part in &target_parts[common..] {
        rel.push(part.as_os_str());
    }

    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    Ok(rel)
}

/// True when `candidate` is not `base` or a descendant of it.
///
/// Both sides are made absolute and normalized first. Anything that cannot be
/// related counts as escaping.
#[must_use]
pub fn escapes_base(candidate: impl AsRef<Path>, base: impl AsRef<Path>) -> bool {
    let (Ok(candidate), Ok(base)) = (absolute_normalized(candidate), absolute_normalized(base)) else {
        return true;
    };

    match relative_path(&base, &candidate) {
        Ok(rel) => matches!(rel.components().next(), Some(Component::ParentDir)),
        Err(_) => true,
    }
}

fn has_parent_component(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir))
}

// ============================================================================
// SafePath - a caller-supplied path plus its normalized form
// ============================================================================

/// A caller-supplied path kept in both its received and normalized forms.
///
/// Normalization can hide or reshape attack strings, so the `original` text
/// is retained unchanged for judgement. Neither form changes after
/// construction.
///
/// # Example
///
/// ```rust
/// use pathsafe_utils::paths::{PathOptions, SafePath};
/// use std::path::Path;
///
/// let path = SafePath::with_options(
///     "uploads/./report.txt",
///     PathOptions::default().restrict_to_base("/srv"),
/// );
/// assert_eq!(path.normalized(), Path::new("uploads/report.txt"));
/// assert_eq!(path.original(), "uploads/./report.txt");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafePath {
    /// Lexically cleaned form
    normalized: PathBuf,
    /// Exactly what the caller supplied
    original: OsString,
    options: PathOptions,
}

impl SafePath {
    /// Wrap a path with default options.
    pub fn new(path: impl AsRef<OsStr>) -> Self {
        Self::with_options(path, PathOptions::default())
    }

    /// Wrap a path with explicit options.
    pub fn with_options(path: impl AsRef<OsStr>, options: PathOptions) -> Self {
        let original = path.as_ref().to_os_string();
        let normalized = normalize(Path::new(&original));

        if has_parent_component(&normalized) {
            warn!(path = %Path::new(&original).display(), "path contains '..' elements");
        }

        Self {
            normalized,
            original,
            options,
        }
    }

    /// The normalized path.
    #[must_use]
    pub fn normalized(&self) -> &Path {
        &self.normalized
    }

    /// The path exactly as the caller supplied it.
    #[must_use]
    pub fn original(&self) -> &OsStr {
        &self.original
    }

    /// Raw bytes of the original path (WTF-8 on Windows).
    #[must_use]
    pub fn original_bytes(&self) -> &[u8] {
        self.original.as_encoded_bytes()
    }

    /// Raw bytes of the normalized path.
    #[must_use]
    pub fn normalized_bytes(&self) -> &[u8] {
        self.normalized.as_os_str().as_encoded_bytes()
    }

    #[must_use]
    pub fn options(&self) -> &PathOptions {
        &self.options
    }

    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.normalized
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.normalized.exists()
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.normalized.is_dir()
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.normalized.is_file()
    }

    /// Whether the entry itself (not its target) is a symlink.
    #[must_use]
    pub fn is_symlink(&self) -> bool {
        self.normalized
            .symlink_metadata()
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }

    /// Permission bits, when the platform exposes them.
    #[must_use]
    pub fn mode(&self) -> Option<u32> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            self.normalized.metadata().ok().map(|m| m.permissions().mode())
        }
        #[cfg(not(unix))]
        {
            None
        }
    }

    /// Read the target of a symlink without resolving it.
    pub fn read_link(&self) -> std::io::Result<PathBuf> {
        std::fs::read_link(&self.normalized)
    }

    /// Check the path against its own options.
    ///
    /// This honours [`PathOptions::allow_unsafe`], unlike the safety checker.
    ///
    /// # Errors
    ///
    /// Returns the first failure among `EMPTY_PATH`, `UNSAFE_PATH`,
    /// `PATH_TOO_LONG` and `OUTSIDE_BASE_PATH`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let display = self.normalized.display().to_string();
        let failure = |rule: &str, message: String, code: &str| ValidationError {
            path: display.clone(),
            rule: rule.to_string(),
            message,
            code: code.to_string(),
        };

        if self.original.is_empty() {
            return Err(failure("non-empty", "path cannot be empty".to_string(), "EMPTY_PATH"));
        }

        if !self.options.allow_unsafe && has_parent_component(&self.normalized) {
            return Err(failure(
                "safe-path",
                "path contains unsafe '..' component".to_string(),
                "UNSAFE_PATH",
            ));
        }

        let max = self.options.max_length;
        if max > 0 && self.normalized_bytes().len() > max {
            return Err(failure(
                "max-length",
                format!("path exceeds maximum length of {max}"),
                "PATH_TOO_LONG",
            ));
        }

        if let Some(base) = &self.options.restrict_to_base
            && escapes_base(&self.normalized, base)
        {
            return Err(failure(
                "base-path",
                format!("path is outside of base path {}", base.display()),
                "OUTSIDE_BASE_PATH",
            ));
        }

        Ok(())
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Lossy rendering of the normalized path, for reports.
    #[must_use]
    pub fn display_string(&self) -> String {
        self.normalized.to_string_lossy().into_owned()
    }
}

impl AsRef<Path> for SafePath {
    fn as_ref(&self) -> &Path {
        &self.normalized
    }
}

impl From<&str> for SafePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

// ============================================================================
// Tests
// ============================================================================
