//! Path-shaped value checks: traversal, absolute paths, sensitive files.
//!
//! Values are inspected in raw form and after one and two rounds of
//! percent-decoding, so `%2e%2e` and `%252e%252e` are caught as well as
//! `..`.

use std::borrow::Cow;

use super::verdict::{RejectKind, Rejection};

/// Percent-decoding rounds applied before path and URL checks.
pub const DECODE_LEVELS: usize = 2;

/// File names whose contents are credentials or secrets.
const SENSITIVE_FILES: &[&str] = &[
    ".env",
    ".netrc",
    ".pgpass",
    ".npmrc",
    ".pypirc",
    ".git-credentials",
    ".htpasswd",
    "id_rsa",
    "id_dsa",
    "id_ecdsa",
    "id_ed25519",
    "authorized_keys",
    "known_hosts",
    "shadow",
    "gshadow",
    "sudoers",
    "credentials",
];

/// Directories whose contents are credentials or secrets.
const SENSITIVE_DIRS: &[&str] = &[".ssh", ".aws", ".gnupg", ".kube", ".docker"];

/// The raw value followed by each distinct percent-decoded form.
pub fn decoded_forms(value: &str) -> Vec<String> {
    let mut forms = vec![value.to_string()];
    let mut current = value.to_string();
    for _ in 0..DECODE_LEVELS {
        if !current.contains('%') {
            break;
        }
        let bytes = urlencoding::decode_binary(current.as_bytes());
        let next = String::from_utf8_lossy(&bytes).into_owned();
        if next == current {
            break;
        }
        forms.push(next.clone());
        current = next;
    }
    forms
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\'])
}

/// True if any `/`- or `\`-separated segment is exactly `..`.
pub fn has_traversal(path: &str) -> bool {
    segments(path).any(|s| s == "..")
}

/// Absolute POSIX, home-relative, UNC or drive-letter path.
pub fn is_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    if path.starts_with('/') || path.starts_with('\\') || path.starts_with('~') {
        return true;
    }
    bytes.len() >= 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes.len() == 2 || bytes[2] == b'\\' || bytes[2] == b'/')
}

/// Name of the sensitive file or directory the path refers to, if any.
pub fn sensitive_component(path: &str) -> Option<&'static str> {
    for segment in segments(path) {
        let lower: Cow<'_, str> = if segment.bytes().any(|b| b.is_ascii_uppercase()) {
            Cow::Owned(segment.to_ascii_lowercase())
        } else {
            Cow::Borrowed(segment)
        };
        if let Some(dir) = SENSITIVE_DIRS.iter().find(|d| **d == lower) {
            return Some(*dir);
        }
        if let Some(file) = SENSITIVE_FILES.iter().find(|f| **f == lower) {
            return Some(*file);
        }
        if lower.starts_with(".env.") {
            return Some(".env");
        }
    }
    None
}

/// Traversal and, unless `allow_absolute`, absolute-path checks over every
/// decoded form of `value`.
pub fn check_path(value: &str, forms: &[String], allow_absolute: bool) -> Result<(), Rejection> {
    for form in forms {
        if has_traversal(form) {
            return Err(Rejection::new(
                RejectKind::PathTraversal,
                describe("'..' segment", value, form),
            ));
        }
    }
    if allow_absolute {
        return Ok(());
    }
    for form in forms {
        if is_absolute(form) {
            return Err(Rejection::new(
                RejectKind::AbsolutePath,
                describe("absolute paths are not allowed for local execution", value, form),
            ));
        }
    }
    for form in forms {
        if let Some(name) = sensitive_component(form) {
            return Err(Rejection::new(
                RejectKind::SensitiveFile,
                format!("'{}' is a sensitive file", name),
            ));
        }
    }
    Ok(())
}

fn describe(reason: &str, raw: &str, form: &str) -> String {
    if raw == form {
        reason.to_string()
    } else {
        format!("{} (after percent-decoding)", reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoded_forms_two_levels() {
        assert_eq!(decoded_forms("abc"), vec!["abc"]);
        assert_eq!(decoded_forms("%2e%2e"), vec!["%2e%2e", ".."]);
        assert_eq!(decoded_forms("%252e%252e"), vec!["%252e%252e", "%2e%2e", ".."]);
        // A third level is not decoded.
        assert_eq!(decoded_forms("%25252e").len(), 3);
    }

    #[test]
    fn test_traversal_segments() {
        assert!(has_traversal(".."));
        assert!(has_traversal("../foo"));
        assert!(has_traversal("foo/../bar"));
        assert!(has_traversal("foo\\..\\bar"));
        assert!(has_traversal("foo/.."));
        assert!(!has_traversal("wait..."));
        assert!(!has_traversal("foo..bar/baz"));
    }

    #[test]
    fn test_absolute_paths() {
        assert!(is_absolute("/etc/passwd"));
        assert!(is_absolute("C:\\Windows"));
        assert!(is_absolute("c:/windows"));
        assert!(is_absolute("\\\\server\\share"));
        assert!(is_absolute("~/.bashrc"));
        assert!(!is_absolute("relative/path"));
        assert!(!is_absolute("a:b"));
    }

    #[test]
    fn test_check_path_encodings() {
        for v in ["..", "../foo", "%2e%2e", "%252e%252e", "%2e%2e%2fsecret"] {
            let err = check_path(v, &decoded_forms(v), true).unwrap_err();
            assert!(err.detail.contains("path traversal attempt detected"), "{v}");
        }
    }

    #[test]
    fn test_check_path_absolute_relaxed_for_container() {
        let forms = decoded_forms("/etc/passwd");
        let err = check_path("/etc/passwd", &forms, false).unwrap_err();
        assert!(err.detail.contains("absolute path detected"));
        assert!(check_path("/etc/passwd", &forms, true).is_ok());
    }

    #[test]
    fn test_sensitive_files() {
        let err = check_path(".env", &decoded_forms(".env"), false).unwrap_err();
        assert!(err.detail.contains("sensitive file"));
        assert!(check_path("config/.ssh/id_rsa", &decoded_forms("config/.ssh/id_rsa"), false).is_err());
        assert!(check_path(".env.production", &decoded_forms(".env.production"), false).is_err());
        assert!(check_path("notes/environment.txt", &decoded_forms("notes/environment.txt"), false).is_ok());
    }
}
