//! Post-processing: deterministic cleanup of recognised text.
//!
//! OCR engines hand back text with engine-specific noise: form feeds at the
//! end of Tesseract output, CRLF line endings, trailing spaces, zero-width
//! characters, long runs of blank lines where the page had whitespace, and
//! (from vision models) an occasional code fence around the whole answer.
//! Each rule is a pure `&str → String` pass, applied in a fixed order.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to raw OCR output.
///
/// Rules (applied in order):
/// 1. Strip an outer code fence
/// 2. Normalise line endings (CRLF/CR → LF) and form feeds (→ LF)
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 4. Trim trailing whitespace per line
/// 5. Collapse 3+ consecutive newlines down to 2
/// 6. Trim leading and trailing blank space of the whole text
pub fn clean_ocr_text(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-z]*\n(.*)\n```\s*$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

fn normalise_line_endings(input: &str) -> String {
    input
        .replace("\r\n", "\n")
        .replace(['\r', '\u{000C}'], "\n")
}

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| {
            !matches!(
                c,
                '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}'
            )
        })
        .collect()
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_RUN.replace_all(input, "\n\n").into_owned()
}
