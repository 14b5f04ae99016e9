//! Sanitization of untrusted file names and of failure messages stored on
//! job records.

use std::path::Path;

use crate::error::CoreError;

/// Upper bound on a stored failure message, in characters.
pub const MAX_ERROR_MESSAGE_CHARS: usize = 300;

/// Upper bound on a stored upload file name, in characters.
pub const MAX_FILENAME_CHARS: usize = 128;

/// Replacement for redacted workspace paths.
pub const WORKSPACE_PLACEHOLDER: &str = "<workspace>";

/// Fallback when sanitization leaves nothing behind.
const EMPTY_MESSAGE: &str = "Unexpected error";

/// Prepare a raw failure message for storage on a job record.
///
/// - every path in `redact` is replaced by [`WORKSPACE_PLACEHOLDER`];
/// - only the first non-blank line is kept (drops chained causes and
///   backtraces);
/// - control characters are stripped;
/// - the result is cut to [`MAX_ERROR_MESSAGE_CHARS`] on a char boundary.
pub fn sanitize_message(raw: &str, redact: &[&Path]) -> String {
    let mut text = raw.to_string();
    for path in redact {
        let needle = path.to_string_lossy();
        if !needle.is_empty() {
            text = text.replace(needle.as_ref(), WORKSPACE_PLACEHOLDER);
        }
    }

    let first_line = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");

    let cleaned: String = first_line.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return EMPTY_MESSAGE.to_string();
    }

    truncate_chars(cleaned, MAX_ERROR_MESSAGE_CHARS).to_string()
}

/// Reduce a client-supplied file name to a safe single path component.
///
/// Directory parts (either separator) are discarded. Characters outside
/// `[alnum . - _ space]` become `_`. Leading dots and surrounding
/// whitespace are trimmed so `.`/`..` and hidden names cannot survive.
/// Overlong names keep their extension.
pub fn sanitize_filename(raw: &str) -> Result<String, CoreError> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or("");

    let mapped: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = mapped
        .trim()
        .trim_start_matches('.')
        .trim_end_matches(['.', ' '])
        .trim_start();

    if trimmed.is_empty() || trimmed.chars().all(|c| c == '_') {
        return Err(CoreError::Validation(format!(
            "Invalid upload file name '{}'",
            truncate_chars(raw, MAX_FILENAME_CHARS)
        )));
    }

    if trimmed.chars().count() <= MAX_FILENAME_CHARS {
        return Ok(trimmed.to_string());
    }

    // Keep the extension (engine output depends on the base name, clients
    // care about the type) and shorten the stem.
    match trimmed.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.chars().count() < 16 => {
            let budget = MAX_FILENAME_CHARS - ext.chars().count() - 1;
            Ok(format!("{}.{ext}", truncate_chars(stem, budget)))
        }
        _ => Ok(truncate_chars(trimmed, MAX_FILENAME_CHARS).to_string()),
    }
}

/// Cut `s` to at most `max` characters without splitting a code point.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
