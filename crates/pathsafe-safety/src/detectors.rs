//! Attack-pattern detectors
//!
//! Every detector is a stateless predicate over the raw bytes of a path and
//! returns `true` when the bytes are safe. They never touch the filesystem.
//! Raw bytes are used (rather than `&str`) so that invalid and overlong UTF-8
//! can be judged instead of being rejected before a detector ever sees them.

use strum::{Display, EnumString, IntoStaticStr};

/// Default upper bound on path length, in bytes.
pub const DEFAULT_MAX_PATH_LENGTH: usize = 4096;

/// Windows device names, reserved regardless of extension.
pub const WINDOWS_RESERVED_NAMES: [&str; 24] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9", "CONIN$",
    "CONOUT$",
];

/// Look-alikes of `/`, `\` and `.` (UTF-8 encoded).
const CONFUSABLES: [&[u8]; 9] = [
    "\u{2044}".as_bytes(), // fraction slash
    "\u{2215}".as_bytes(), // division slash
    "\u{2216}".as_bytes(), // set minus
    "\u{29F8}".as_bytes(), // big solidus
    "\u{FF0F}".as_bytes(), // fullwidth solidus
    "\u{FF3C}".as_bytes(), // fullwidth reverse solidus
    "\u{FE68}".as_bytes(), // small reverse solidus
    "\u{2024}".as_bytes(), // one dot leader
    "\u{FF0E}".as_bytes(), // fullwidth full stop
];

/// Encoded or escaped spellings of `..`.
const TRAVERSAL_ENCODINGS: [&[u8]; 6] = [
    b"%2e%2e",
    b"%252e%252e",
    b".%2e",
    b"%2e.",
    b"\\u002e\\u002e",
    b"\\x2e\\x2e",
];

/// One independent attack-pattern check.
///
/// The string form is kebab-case (`"windows-reserved-name"`), used in logs
/// and violation messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Detector {
    Length,
    NullByte,
    ControlCharacter,
    Traversal,
    EncodedSequence,
    SuspiciousOsPath,
    UncPath,
    DrivePath,
    AlternateDataStream,
    TrailingDotOrSpace,
    WindowsReservedName,
    OverlongUtf8,
    InvalidUtf8,
    UnicodeConfusable,
}

impl Detector {
    /// Every detector, cheapest scans first.
    pub const ALL: [Detector; 14] = [
        Detector::Length,
        Detector::NullByte,
        Detector::ControlCharacter,
        Detector::Traversal,
        Detector::EncodedSequence,
        Detector::SuspiciousOsPath,
        Detector::UncPath,
        Detector::DrivePath,
        Detector::AlternateDataStream,
        Detector::TrailingDotOrSpace,
        Detector::WindowsReservedName,
        Detector::OverlongUtf8,
        Detector::InvalidUtf8,
        Detector::UnicodeConfusable,
    ];

    /// Detectors that stay meaningful on a normalized path.
    ///
    /// Cleaning turns `a/..` or the empty string into `.`, so the trailing
    /// dot check only applies to what the caller sent.
    pub const NORMALIZED: [Detector; 13] = [
        Detector::Length,
        Detector::NullByte,
        Detector::ControlCharacter,
        Detector::Traversal,
        Detector::EncodedSequence,
        Detector::SuspiciousOsPath,
        Detector::UncPath,
        Detector::DrivePath,
        Detector::AlternateDataStream,
        Detector::WindowsReservedName,
        Detector::OverlongUtf8,
        Detector::InvalidUtf8,
        Detector::UnicodeConfusable,
    ];

    /// Run this detector. `max_length` is only used by [`Detector::Length`].
    #[must_use]
    pub fn is_safe(self, path: &[u8], max_length: usize) -> bool {
        match self {
            Self::Length => is_length_safe(path, max_length),
            Self::NullByte => is_null_byte_safe(path),
            Self::ControlCharacter => is_control_char_safe(path),
            Self::Traversal => is_traversal_safe(path),
            Self::EncodedSequence => is_encoding_safe(path),
            Self::SuspiciousOsPath => is_os_path_safe(path),
            Self::UncPath => is_unc_safe(path),
            Self::DrivePath => is_drive_safe(path),
            Self::AlternateDataStream => is_ads_safe(path),
            Self::TrailingDotOrSpace => is_trailing_safe(path),
            Self::WindowsReservedName => is_windows_reserved_safe(path),
            Self::OverlongUtf8 => is_overlong_safe(path),
            Self::InvalidUtf8 => is_utf8_safe(path),
            Self::UnicodeConfusable => is_confusable_safe(path),
        }
    }

    /// First detector in `detectors` that rejects `path`, if any.
    #[must_use]
    pub fn first_violation(path: &[u8], max_length: usize, detectors: &[Detector]) -> Option<Detector> {
        detectors.iter().copied().find(|d| !d.is_safe(path, max_length))
    }
}

// ============================================================================
// Byte helpers
// ============================================================================

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty()
        && haystack.len() >= needle.len()
        && haystack.windows(needle.len()).any(|w| w == needle)
}

fn contains_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty()
        && haystack.len() >= needle.len()
        && haystack
            .windows(needle.len())
            .any(|w| w.eq_ignore_ascii_case(needle))
}

fn is_separator(b: u8) -> bool {
    b == b'/' || b == b'\\'
}

/// Final path element, ignoring trailing separators. Both `/` and `\` count
/// as separators on every platform.
#[must_use]
pub fn base_name(path: &[u8]) -> &[u8] {
    let end = path
        .iter()
        .rposition(|&b| !is_separator(b))
        .map_or(0, |i| i + 1);
    let trimmed = &path[..end];
    let start = trimmed
        .iter()
        .rposition(|&b| is_separator(b))
        .map_or(0, |i| i + 1);
    &trimmed[start..]
}

// ============================================================================
// Detectors
// ============================================================================

/// Literal `..`, or any percent/escape encoding of it.
#[must_use]
pub fn is_traversal_safe(path: &[u8]) -> bool {
    if contains(path, b"..") {
        return false;
    }
    !TRAVERSAL_ENCODINGS
        .iter()
        .any(|enc| contains_ignore_ascii_case(path, enc))
}

/// Single-encoded `.`, `/`, `\`, textual `\u` / `\x` escapes and the
/// Windows extended-length prefix `\\?\`.
#[must_use]
pub fn is_encoding_safe(path: &[u8]) -> bool {
    if [b"%2e", b"%2f", b"%5c"]
        .iter()
        .any(|enc| contains_ignore_ascii_case(path, *enc))
    {
        return false;
    }
    !(contains(path, b"\\u") || contains(path, b"\\x") || contains(path, b"\\\\?\\"))
}

/// `/proc/` or `/dev/` anywhere in the path.
#[must_use]
pub fn is_os_path_safe(path: &[u8]) -> bool {
    !(contains(path, b"/proc/") || contains(path, b"/dev/"))
}

/// Raw NUL or `%00`.
#[must_use]
pub fn is_null_byte_safe(path: &[u8]) -> bool {
    !(path.contains(&0) || contains(path, b"%00"))
}

/// Any byte below 0x20 other than tab.
#[must_use]
pub fn is_control_char_safe(path: &[u8]) -> bool {
    !path.iter().any(|&b| b < 0x20 && b != b'\t')
}

/// `0xC0` / `0xC1` lead bytes, which only ever start overlong encodings
/// (`\xc0\xaf` is an overlong `/`).
#[must_use]
pub fn is_overlong_safe(path: &[u8]) -> bool {
    !path.iter().any(|&b| b == 0xc0 || b == 0xc1)
}

/// Whole path is valid UTF-8.
#[must_use]
pub fn is_utf8_safe(path: &[u8]) -> bool {
    std::str::from_utf8(path).is_ok()
}

/// Unicode look-alikes of path separators and dots.
#[must_use]
pub fn is_confusable_safe(path: &[u8]) -> bool {
    !CONFUSABLES.iter().any(|c| contains(path, c))
}

/// Leading or embedded `\\`.
#[must_use]
pub fn is_unc_safe(path: &[u8]) -> bool {
    !contains(path, b"\\\\")
}

/// Second byte is `:` (`C:...`).
#[must_use]
pub fn is_drive_safe(path: &[u8]) -> bool {
    !(path.len() > 1 && path[1] == b':')
}

/// `:$DATA`, or `:` together with `$`.
#[must_use]
pub fn is_ads_safe(path: &[u8]) -> bool {
    if contains_ignore_ascii_case(path, b":$DATA") {
        return false;
    }
    !(path.contains(&b':') && path.contains(&b'$'))
}

/// Base name is a Windows device name, with or without extension.
///
/// The stem is everything before the *first* dot, so `CON.tar.gz` is caught.
#[must_use]
pub fn is_windows_reserved_safe(path: &[u8]) -> bool {
    let base = base_name(path).to_ascii_uppercase();
    if base.is_empty() {
        return true;
    }
    let stem = match base.iter().position(|&b| b == b'.') {
        Some(idx) if idx > 0 => &base[..idx],
        _ => &base[..],
    };
    !WINDOWS_RESERVED_NAMES
        .iter()
        .any(|name| stem == name.as_bytes() || base == name.as_bytes())
}

/// Ends with `.` or a space.
#[must_use]
pub fn is_trailing_safe(path: &[u8]) -> bool {
    !matches!(path.last(), Some(b'.') | Some(b' '))
}

/// Length within `max_length` bytes.
#[must_use]
pub fn is_length_safe(path: &[u8], max_length: usize) -> bool {
    path.len() <= max_length
}

/// Classification of a UTF-8 problem, for precise rule messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utf8Issue {
    /// `0xC0`/`0xC1` lead byte
    Overlong,
    /// Continuation byte with no lead byte before it
    StrayContinuation,
    /// Any other invalid sequence (`0xFE`, `0xFF`, truncated sequences, ...)
    InvalidBytes,
}

/// Find the first UTF-8 problem in `path`.
#[must_use]
pub fn utf8_issue(path: &[u8]) -> Option<Utf8Issue> {
    if !is_overlong_safe(path) {
        return Some(Utf8Issue::Overlong);
    }
    match std::str::from_utf8(path) {
        Ok(_) => None,
        Err(e) => {
            let bad = path[e.valid_up_to()];
            if (0x80..=0xbf).contains(&bad) {
                Some(Utf8Issue::StrayContinuation)
            } else {
                Some(Utf8Issue::InvalidBytes)
            }
        }
    }
}
