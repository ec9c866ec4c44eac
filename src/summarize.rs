//! Summary by truncation.
//!
//! There is no language model behind this: the summary is the head of the
//! extracted text, cut at a character budget.

/// Default character budget of a summary.
pub const DEFAULT_SUMMARY_LIMIT: usize = 500;

/// Marker appended to a truncated summary.
pub const ELLIPSIS: &str = "...";

/// Return `text` unchanged if it has at most `limit` characters, otherwise its
/// first `limit` characters followed by [`ELLIPSIS`].
///
/// Counts Unicode scalar values, so multi-byte text is never split inside a
/// character.
pub fn summarize(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        None => text.to_string(),
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + ELLIPSIS.len());
            out.push_str(&text[..cut]);
            out.push_str(ELLIPSIS);
            out
        }
    }
}
