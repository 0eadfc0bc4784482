//! Filesystem fixtures shared by unit and integration tests.
//!
//! Test helper: not part of public API stability guarantees.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary sandbox directory with a canonical root path.
///
/// The root is canonicalized so that containment checks agree with the
/// paths the tests build (e.g. macOS `/var` -> `/private/var`).
pub struct Sandbox {
    _temp: TempDir,
    root: PathBuf,
}

impl Sandbox {
    /// Create an empty sandbox under the system temp dir.
    #[must_use]
    pub fn new() -> Self {
        let temp = TempDir::new().expect("create sandbox temp dir");
        let root = temp.path().canonicalize().expect("canonicalize sandbox root");
        Self { _temp: temp, root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `rel` inside the sandbox (not created).
    #[must_use]
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Create a file (and its parents) with the given contents.
    pub fn file(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, contents).expect("write fixture file");
        path
    }

    /// Create a directory (and its parents).
    pub fn dir(&self, rel: &str) -> PathBuf {
        let path = self.path(rel);
        std::fs::create_dir_all(&path).expect("create fixture dir");
        path
    }

    /// Create a symlink at `rel` pointing at `target` (stored verbatim).
    #[cfg(unix)]
    pub fn symlink(&self, rel: &str, target: impl AsRef<Path>) -> PathBuf {
        let link = self.path(rel);
        std::os::unix::fs::symlink(target.as_ref(), &link).expect("create symlink");
        link
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

/// Set Unix permission bits on a path.
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).expect("set permissions");
}

/// Whether permission bits are actually enforced for the current user.
///
/// Root (and some CI containers) bypass them, so permission-denied tests
/// skip themselves when this returns false.
#[cfg(unix)]
#[must_use]
pub fn permissions_enforced() -> bool {
    let temp = TempDir::new().expect("probe dir");
    let dir = temp.path().join("ro");
    std::fs::create_dir(&dir).expect("probe subdir");
    set_mode(&dir, 0o500);
    let writable = std::fs::write(dir.join("probe"), "x").is_ok();
    set_mode(&dir, 0o700);
    !writable
}
