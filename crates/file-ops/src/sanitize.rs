//! Filename sanitizing for hostile remote names.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Fallback name when sanitizing leaves nothing usable.
const FALLBACK_NAME: &str = "unnamed_file";

/// Maps a remote filename to a filesystem-safe ASCII name.
///
/// Accented characters are transliterated by decomposing to NFD and
/// dropping the combining marks (`é` → `e`). Everything outside the
/// allow-list `a-z A-Z 0-9 _ , space ( ) @ . - [ ]` becomes `_`, leading
/// and trailing spaces and dots are trimmed, and runs of underscores are
/// collapsed. Returns `unnamed_file` when the input is empty or nothing
/// but underscores survives.
pub fn sanitize_filename(name: &str) -> String {
    if name.is_empty() {
        return FALLBACK_NAME.to_string();
    }

    // Decompose, drop combining marks, recompose.
    let normalized: String = name
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .nfc()
        .collect();

    let mut sanitized: String = normalized
        .chars()
        .map(|c| if is_allowed(c) { c } else { '_' })
        .collect();

    sanitized = sanitized
        .trim_matches(|c| c == ' ' || c == '.')
        .to_string();

    // Collapse underscore runs to a fixpoint.
    while sanitized.contains("__") {
        sanitized = sanitized.replace("__", "_");
    }

    if sanitized.is_empty() || sanitized.trim_matches('_').is_empty() {
        return FALLBACK_NAME.to_string();
    }

    sanitized
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '_' | ',' | ' ' | '(' | ')' | '@' | '.' | '-' | '[' | ']'
        )
}
