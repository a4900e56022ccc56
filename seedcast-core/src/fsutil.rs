//! Filesystem naming helpers.
//!
//! `sanitize_path` turns an arbitrary untrusted string into a token that is
//! safe to use as a file name or SQL identifier. The output alphabet is the
//! input alphabet minus path separators, traversal components, and shell
//! punctuation, all of which collapse to `_`.

/// Characters rewritten to `_` after the base normalization pass.
const REPLACED: &[char] = &[
    ' ', '/', '\\', '.', '-', ',', ':', ';', '(', ')', '[', ']', '{', '}', '<', '>', '?', '!',
    '@', '#', '$', '%', '^', '&', '*', '+', '=', '|', '~', '`', '\'', '"', '\t', '\n', '\r',
];

/// Sanitizes an arbitrary string into a filesystem-safe token.
///
/// Never fails; returns an empty string for inputs with no usable content.
/// Deterministic and free of I/O, so results are stable across calls.
///
/// The trailing-underscore strip and the underscore-run collapse only apply
/// while the result is longer than 4 characters. The collapse re-checks the
/// length after every pass, so very short results may keep an incomplete
/// collapse.
pub fn sanitize_path(raw: &str) -> String {
    // Base path-safety pass: drop NUL bytes, discard `.`/`..` traversal
    // components, and strip leading/trailing separators.
    let base: Vec<&str> = raw
        .split(['/', '\\'])
        .filter(|component| {
            !component.is_empty()
                && *component != "."
                && *component != ".."
                && !component.chars().all(|c| c == '\0')
        })
        .collect();
    let base = base.join("/").replace('\0', "");

    let mut out: String = base
        .chars()
        .map(|c| if REPLACED.contains(&c) { '_' } else { c })
        .collect();

    while out.chars().count() > 4 && out.ends_with('_') {
        out.pop();
    }
    while out.chars().count() > 4 && out.contains("__") {
        out = out.replace("__", "_");
    }
    out
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_spaces_and_punctuation_collapse() {
        assert_eq!(sanitize_path("My Movie (2024).mp4"), "My_Movie_2024_mp4");
    }

    #[test]
    fn test_traversal_components_removed() {
        assert_eq!(sanitize_path("../../etc/passwd"), "etc_passwd");
    }

    #[test]
    fn test_leading_and_trailing_separators_stripped() {
        assert_eq!(sanitize_path("/videos/raw/"), "videos_raw");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(sanitize_path(""), "");
    }

    #[test]
    fn test_short_result_keeps_trailing_underscore() {
        // The strip only runs while the result is longer than 4 chars.
        assert_eq!(sanitize_path("ab__"), "ab__");
    }

    #[test]
    fn test_long_result_strips_and_collapses() {
        assert_eq!(sanitize_path("a  b  c"), "a_b_c");
        assert_eq!(sanitize_path("movie...."), "movie");
    }

    proptest! {
        #[test]
        fn prop_no_trailing_underscore_when_long(raw in ".*") {
            let out = sanitize_path(&raw);
            if out.chars().count() > 4 {
                prop_assert!(!out.ends_with('_'));
            }
        }

        #[test]
        fn prop_no_double_underscore_when_long(raw in ".*") {
            let out = sanitize_path(&raw);
            if out.chars().count() > 4 {
                prop_assert!(!out.contains("__"));
            }
        }

        #[test]
        fn prop_idempotent(raw in ".*") {
            let once = sanitize_path(&raw);
            prop_assert_eq!(sanitize_path(&once), once.clone());
        }

        #[test]
        fn prop_no_separators_or_replaced_chars(raw in ".*") {
            let out = sanitize_path(&raw);
            prop_assert!(!out.contains('/'));
            prop_assert!(!out.contains('\\'));
            prop_assert!(!out.contains('.'));
            prop_assert!(!out.contains(' '));
        }
    }
}
