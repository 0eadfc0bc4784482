//! Containment resolver
//!
//! Decides whether a path, or the target of a symlink, lies inside a base
//! directory. Two checks apply. The lexical one makes both sides absolute,
//! computes the path from `base` to the candidate and rejects it when that
//! computation fails or starts with `..`. The physical one resolves every
//! symlink along both paths, including chains and links on ancestor
//! directories, and requires the resolved candidate to start with the
//! resolved base.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use pathsafe_utils::paths::{absolute_normalized, escapes_base, normalize};

use crate::SafetyViolation;

/// Upper bound on links followed while resolving one path. Matches the
/// Linux `MAXSYMLINKS` value.
pub const MAX_LINK_HOPS: usize = 40;

/// Verify that `candidate` is `base` or lies below it.
///
/// # Errors
///
/// [`SafetyViolation::OutsideBase`] when the candidate escapes the base or
/// either side cannot be made absolute.
pub fn ensure_within_base(candidate: &Path, base: &Path) -> Result<(), SafetyViolation> {
    if escapes_base(candidate, base) {
        debug!(
            candidate = %candidate.display(),
            base = %base.display(),
            "path escapes restricted base"
        );
        return Err(SafetyViolation::OutsideBase {
            path: candidate.display().to_string(),
            base: base.display().to_string(),
        });
    }
    Ok(())
}

/// Resolve the target of the symlink at `link` without following any
/// further links.
///
/// A relative target is resolved against the link's own parent directory,
/// then the result is normalized.
///
/// # Errors
///
/// Propagates the `read_link` failure.
pub fn resolve_link_target(link: &Path) -> std::io::Result<PathBuf> {
    let target = std::fs::read_link(link)?;
    let resolved = if target.is_absolute() {
        target
    } else {
        match link.parent() {
            Some(parent) => parent.join(target),
            None => target,
        }
    };
    Ok(normalize(resolved))
}

/// Verify that the target of the symlink at `link` lies inside `base`.
///
/// # Errors
///
/// [`SafetyViolation::SymlinkEscape`] when the target escapes the base, or
/// when the link cannot be read or its target cannot be made absolute.
pub fn ensure_link_within_base(link: &Path, base: &Path) -> Result<(), SafetyViolation> {
    let escape = |reason: String| SafetyViolation::SymlinkEscape {
        path: link.display().to_string(),
        base: base.display().to_string(),
        reason,
    };

    let target = resolve_link_target(link).map_err(|e| escape(format!("unreadable link: {e}")))?;
    let target = absolute_normalized(&target).map_err(|e| escape(e.to_string()))?;

    if escapes_base(&target, base) {
        debug!(
            link = %link.display(),
            target = %target.display(),
            base = %base.display(),
            "symlink target escapes restricted base"
        );
        return Err(escape(format!("target {} is outside the base", target.display())));
    }
    Ok(())
}

enum Step {
    Prefix(OsString),
    Root,
    Parent,
    Name(OsString),
}

fn push_steps(queue: &mut VecDeque<Step>, path: &Path) {
    let steps: Vec<Step> = path
        .components()
        .filter_map(|component| match component {
            Component::Prefix(prefix) => Some(Step::Prefix(prefix.as_os_str().to_os_string())),
            Component::RootDir => Some(Step::Root),
            Component::CurDir => None,
            Component::ParentDir => Some(Step::Parent),
            Component::Normal(name) => Some(Step::Name(name.to_os_string())),
        })
        .collect();
    for step in steps.into_iter().rev() {
        queue.push_front(step);
    }
}

/// Resolve `path` against the filesystem, following every symlink met on
/// the way, the final component included.
///
/// Components that do not exist are appended as written, so a path that is
/// about to be created still resolves. A dangling link resolves to the path
/// it names. `..` is applied after the component before it was resolved.
///
/// # Errors
///
/// Any filesystem error other than "not found", an unreadable link, or more
/// than [`MAX_LINK_HOPS`] links.
pub fn resolve_physical(path: &Path) -> io::Result<PathBuf> {
    let mut queue = VecDeque::new();
    push_steps(&mut queue, &std::path::absolute(path)?);

    let mut resolved = PathBuf::new();
    let mut hops = 0;
    let mut missing = false;

    while let Some(step) = queue.pop_front() {
        match step {
            Step::Prefix(prefix) => {
                resolved = PathBuf::from(prefix);
                missing = false;
            }
            Step::Root => {
                resolved.push(Component::RootDir);
                missing = false;
            }
            Step::Parent => {
                resolved.pop();
                missing = false;
            }
            Step::Name(name) => {
                let next = resolved.join(&name);
                if missing {
                    resolved = next;
                    continue;
                }
                match next.symlink_metadata() {
                    Ok(metadata) if metadata.file_type().is_symlink() => {
                        hops += 1;
                        if hops > MAX_LINK_HOPS {
                            return Err(io::Error::other(format!(
                                "too many levels of symbolic links at {}",
                                next.display()
                            )));
                        }
                        let target = std::fs::read_link(&next)?;
                        if target.is_absolute() {
                            resolved = PathBuf::new();
                        }
                        push_steps(&mut queue, &target);
                    }
                    Ok(_) => resolved = next,
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        missing = true;
                        resolved = next;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }

    Ok(resolved)
}

/// Verify that `candidate` stays inside `base` once every symlink on both
/// paths is resolved.
///
/// # Errors
///
/// [`SafetyViolation::SymlinkEscape`] when the resolved candidate leaves the
/// resolved base, or when either side cannot be resolved.
pub fn ensure_resolved_within_base(candidate: &Path, base: &Path) -> Result<(), SafetyViolation> {
    let escape = |reason: String| SafetyViolation::SymlinkEscape {
        path: candidate.display().to_string(),
        base: base.display().to_string(),
        reason,
    };

    let resolved_base = resolve_physical(base).map_err(|e| escape(format!("unresolvable base: {e}")))?;
    let resolved = resolve_physical(candidate).map_err(|e| escape(format!("unresolvable path: {e}")))?;

    if !resolved.starts_with(&resolved_base) {
        debug!(
            candidate = %candidate.display(),
            resolved = %resolved.display(),
            base = %resolved_base.display(),
            "resolved path escapes restricted base"
        );
        return Err(escape(format!("resolves to {} outside the base", resolved.display())));
    }
    Ok(())
}
