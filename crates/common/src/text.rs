//! Whitespace helpers shared by the dump pipeline and command parsing.

/// Returns `true` when `text` is empty or contains only whitespace.
#[must_use]
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Split `text` on whitespace, dropping empty pieces.
///
/// This is the line-cleaning step used before tokens enter a dump buffer and
/// when splitting a chat command into its arguments.
#[must_use]
pub fn cleaned_splits(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_owned).collect()
}

/// Number of Unicode scalar values in `text`; chat limits count characters.
#[must_use]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
