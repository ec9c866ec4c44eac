//! Prompt for vision-model OCR.
//!
//! The vision backend is asked to behave like a plain OCR engine: return the
//! words on the page and nothing else. Its output goes through the same
//! cleanup as Tesseract output, so the prompt only has to keep the model
//! from adding commentary or markup.

/// System prompt for transcribing a page image. `{language}` is replaced
/// with the language name by [`transcription_prompt`].
pub const TRANSCRIPTION_PROMPT: &str = r#"You are an OCR engine. The image is one page of a scanned document written in {language}.

Transcribe every piece of legible text on the page:
- Keep the reading order a human would use
- Put each line of the page on its own line
- Keep numbers, currency symbols and punctuation exactly as printed
- Do not correct spelling or grammar

Output ONLY the transcribed text.
Do NOT use Markdown, code fences or any other markup.
Do NOT describe images, layout or handwriting style.
If the page has no legible text, output nothing."#;

/// Language name for a Tesseract-style code. Unknown codes pass through.
pub fn language_name(code: &str) -> &str {
    match code {
        "eng" => "English",
        "deu" => "German",
        "fra" => "French",
        "spa" => "Spanish",
        "ita" => "Italian",
        "por" => "Portuguese",
        "nld" => "Dutch",
        "pol" => "Polish",
        "rus" => "Russian",
        "jpn" => "Japanese",
        "chi_sim" => "Simplified Chinese",
        "chi_tra" => "Traditional Chinese",
        "kor" => "Korean",
        "ara" => "Arabic",
        other => other,
    }
}

/// Fill the language into [`TRANSCRIPTION_PROMPT`].
pub fn transcription_prompt(language: &str) -> String {
    TRANSCRIPTION_PROMPT.replace("{language}", language_name(language))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_the_language() {
        let p = transcription_prompt("deu");
        assert!(p.contains("written in German."));
        assert!(!p.contains("{language}"));
    }

    #[test]
    fn unknown_codes_pass_through() {
        assert_eq!(language_name("tha"), "tha");
        assert!(transcription_prompt("tha").contains("written in tha."));
    }
}
