//! End-to-end rejection of hostile path strings through the public API.
//!
//! Covers literal and encoded traversal, platform-specific injection and the
//! agreement between the safety checker and the secure rule set.

use pathsafe::{
    Detector, PathForm, PathOptions, PathSafetyChecker, RuleValidator, SafePath, SafetyViolation,
};

const TRAVERSAL_PAYLOADS: &[&str] = &[
    "../../../etc/passwd",
    "..\\..\\..\\windows\\system32",
    "uploads/../../secret",
    "a/b/../../..",
    "%2e%2e/etc/passwd",
    "%2E%2E%2Fetc%2Fpasswd",
    "%252e%252e%252fetc",
    "\\x2e\\x2e/etc",
    "\\u002e\\u002e/etc",
];

#[test]
fn test_traversal_payloads_are_unsafe() {
    let checker = PathSafetyChecker::new();
    for payload in TRAVERSAL_PAYLOADS {
        assert!(!checker.is_safe_str(payload), "accepted {payload:?}");
    }
}

#[test]
fn test_traversal_payloads_fail_secure_rules() {
    let validator = RuleValidator::secure();
    for payload in TRAVERSAL_PAYLOADS {
        let errors = validator.validate(payload);
        assert!(
            errors.iter().any(|e| e.rule == "no-path-traversal"),
            "{payload:?} passed no-path-traversal: {errors:?}"
        );
    }
}

#[test]
fn test_benign_paths_are_safe() {
    let checker = PathSafetyChecker::new();
    for path in [
        "safe/file.txt",
        "README.md",
        "docs/guide/intro.md",
        "data/2024-01-01.csv",
        "/srv/app/uploads/avatar.png",
        "name with spaces/file.txt",
        "tab\tseparated.txt",
    ] {
        assert!(checker.is_safe_str(path), "rejected {path:?}");
    }
}

#[test]
fn test_platform_injection_is_unsafe() {
    let checker = PathSafetyChecker::new();
    let cases: &[(&str, Detector)] = &[
        ("file\0.txt", Detector::NullByte),
        ("file%00.txt", Detector::NullByte),
        ("file\n.txt", Detector::ControlCharacter),
        ("/proc/self/environ", Detector::SuspiciousOsPath),
        ("/dev/sda", Detector::SuspiciousOsPath),
        ("\\\\server\\share\\file", Detector::UncPath),
        ("C:\\Windows\\system32", Detector::DrivePath),
        ("file.txt:$DATA", Detector::AlternateDataStream),
        ("dir/CON", Detector::WindowsReservedName),
        ("lpt1.tar.gz", Detector::WindowsReservedName),
        ("\u{2215}etc\u{2215}passwd", Detector::UnicodeConfusable),
    ];
    for (path, expected) in cases {
        let err = checker.check(&SafePath::new(path)).unwrap_err();
        assert_eq!(
            err,
            SafetyViolation::Detector {
                detector: *expected,
                form: PathForm::Original,
            },
            "wrong verdict for {path:?}"
        );
    }
}

#[test]
fn test_trailing_dot_and_space_are_unsafe() {
    let checker = PathSafetyChecker::new();
    assert!(!checker.is_safe_str("report.txt."));
    assert!(!checker.is_safe_str("report.txt "));
    assert!(!checker.is_safe_str("."));
}

#[cfg(unix)]
#[test]
fn test_invalid_utf8_is_unsafe() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let checker = PathSafetyChecker::new();
    let overlong = OsStr::from_bytes(b"a\xc0\xafetc");
    let stray = OsStr::from_bytes(b"a\x80b");

    assert_eq!(
        checker.check(&SafePath::new(overlong)).unwrap_err(),
        SafetyViolation::Detector {
            detector: Detector::OverlongUtf8,
            form: PathForm::Original,
        }
    );
    assert!(!checker.is_safe_str(stray));

    let validator = RuleValidator::secure();
    let codes: Vec<String> = validator
        .validate(overlong)
        .into_iter()
        .map(|e| e.code)
        .collect();
    assert_eq!(codes, vec!["OVERLONG_UTF8".to_string()]);
}

#[test]
fn test_empty_path_is_unsafe() {
    let checker = PathSafetyChecker::new();
    assert_eq!(checker.check(&SafePath::new("")), Err(SafetyViolation::Empty));
}

#[test]
fn test_length_bound_from_options_wins() {
    let checker = PathSafetyChecker::new();
    let path = "a".repeat(64);

    assert!(checker.is_safe_str(&path));
    let bounded = SafePath::with_options(&path, PathOptions::default().max_length(32));
    assert_eq!(
        checker.check(&bounded).unwrap_err(),
        SafetyViolation::Detector {
            detector: Detector::Length,
            form: PathForm::Original,
        }
    );

    let tight = PathSafetyChecker::with_max_length(16);
    assert!(!tight.is_safe_str(&path));
}

#[test]
fn test_allow_unsafe_does_not_weaken_checker() {
    let checker = PathSafetyChecker::new();
    let path = SafePath::with_options("../../etc/passwd", PathOptions::default().allow_unsafe(true));
    assert!(!checker.is_safe(&path));
}

#[test]
fn test_huge_input_is_judged_not_panicked() {
    let checker = PathSafetyChecker::new();
    let huge = "a/".repeat(5_000);
    assert!(!checker.is_safe_str(&huge));

    let validator = RuleValidator::secure();
    assert!(validator.validate(&huge).is_empty());
}
