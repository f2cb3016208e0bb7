//! Log-line previews of command text.
//!
//! Commands can be long heredocs. Log fields carry a bounded, single-line
//! preview; the full command is still what gets executed and shown in prompts.

/// Maximum characters of a command kept in a log preview.
pub const PREVIEW_MAX_CHARS: usize = 120;

/// Truncate by characters and append `suffix` when truncation occurs.
pub fn truncate_with_suffix_by_chars(text: &str, max_chars: usize, suffix: &str) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let prefix: String = text.chars().take(max_chars).collect();
    format!("{prefix}{suffix}")
}

/// Single-line, bounded form of `command` for structured log fields.
pub fn command_preview(command: &str) -> String {
    let flattened = command.trim().replace(['\n', '\r'], " ⏎ ");
    truncate_with_suffix_by_chars(&flattened, PREVIEW_MAX_CHARS, "…")
}
