//! Built-in rule catalogue

mod builtin;
mod security;

use std::sync::Arc;

use pathsafe_utils::types::RuleKind;

use crate::rule::ValidationRule;

pub use builtin::{
    AbsolutePathRule, DirectoryRule, ExecutableRule, ExistsRule, ExtensionRule, FileRule,
    MaxLengthRule, NotExistsRule, PatternRule, ReadableRule, RelativePathRule, WritableRule,
};
pub use security::{
    ControlCharacterRule, DrivePathRule, NullByteRule, PathTraversalRule, UncPathRule,
    ValidUtf8Rule, WindowsReservedRule,
};

/// Instantiate a built-in rule that needs no argument.
///
/// Returns `None` for `extension`, `max-length`, `require-pattern` and
/// `forbid-pattern`, which cannot be built from a name alone.
#[must_use]
pub fn builtin_rule(kind: RuleKind) -> Option<Arc<dyn ValidationRule>> {
    let rule: Arc<dyn ValidationRule> = match kind {
        RuleKind::AbsolutePath => Arc::new(AbsolutePathRule),
        RuleKind::RelativePath => Arc::new(RelativePathRule),
        RuleKind::Exists => Arc::new(ExistsRule),
        RuleKind::NotExists => Arc::new(NotExistsRule),
        RuleKind::Readable => Arc::new(ReadableRule),
        RuleKind::Writable => Arc::new(WritableRule),
        RuleKind::Executable => Arc::new(ExecutableRule),
        RuleKind::Directory => Arc::new(DirectoryRule),
        RuleKind::File => Arc::new(FileRule),
        RuleKind::NoPathTraversal => Arc::new(PathTraversalRule),
        RuleKind::NoNullBytes => Arc::new(NullByteRule),
        RuleKind::NoControlChars => Arc::new(ControlCharacterRule),
        RuleKind::NoWindowsReserved => Arc::new(WindowsReservedRule),
        RuleKind::NoUncPaths => Arc::new(UncPathRule),
        RuleKind::NoDrivePaths => Arc::new(DrivePathRule),
        RuleKind::ValidUtf8 => Arc::new(ValidUtf8Rule),
        RuleKind::Extension | RuleKind::MaxLength | RuleKind::RequirePattern | RuleKind::ForbidPattern => {
            return None;
        }
    };
    Some(rule)
}

/// The seven security rules, in the order `require_secure()` registers them.
#[must_use]
pub fn secure_rules() -> Vec<Arc<dyn ValidationRule>> {
    RuleKind::SECURE.iter().filter_map(|kind| builtin_rule(*kind)).collect()
}
