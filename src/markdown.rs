//! Markdown cleanup for generated text.
//!
//! Gemini likes to decorate answers with bold markers, headings and bullet
//! lists. The frontend renders plain text and the TTS engine reads every
//! asterisk aloud, so every text field leaving the service goes through
//! [`clean`].

use std::sync::LazyLock;

use regex::Regex;

static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*#+[ \t]*").unwrap());
static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[-*+][ \t]+").unwrap());
static STAR_EMPHASIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*\n]+)\*").unwrap());
static UNDERSCORE_EMPHASIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_([^_\n]+)_").unwrap());

/// Strip markdown markers and collapse blank lines.
///
/// The cleanup pass is repeated until the text stops changing, so nested
/// markers like `***x***` are fully unwrapped and `clean(clean(x)) == clean(x)`.
pub fn clean(text: &str) -> String {
    let mut current = clean_pass(text);
    loop {
        // A pass only ever deletes characters, so this reaches a fixed point.
        let next = clean_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_pass(text: &str) -> String {
    let text = HEADING.replace_all(text, "");
    let text = BULLET.replace_all(&text, "");
    let text = STAR_EMPHASIS.replace_all(&text, "$1");
    let text = UNDERSCORE_EMPHASIS.replace_all(&text, "$1");

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// First `max_chars` characters of `text`, for log previews.
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_bold_and_italic() {
        assert_eq!(clean("**Obviously** you *tried*."), "Obviously you tried.");
        assert_eq!(clean("that was _bold_ of you"), "that was bold of you");
        assert_eq!(clean("***triple***"), "triple");
    }

    #[test]
    fn test_strips_headings_and_bullets() {
        let input = "## Verdict\n- you are slow\n* you are late\n+ you are you";
        assert_eq!(clean(input), "Verdict\nyou are slow\nyou are late\nyou are you");
    }

    #[test]
    fn test_collapses_blank_lines() {
        assert_eq!(clean("one\n\n\n  \ntwo\r\n\r\nthree\n"), "one\ntwo\nthree");
    }

    #[test]
    fn test_keeps_plain_text() {
        assert_eq!(clean("just a sentence."), "just a sentence.");
        assert_eq!(clean("-5 degrees outside"), "-5 degrees outside");
        assert_eq!(clean(""), "");
    }

    #[test]
    fn test_emphasis_does_not_span_lines() {
        assert_eq!(clean("a * b\nc * d"), "a * b\nc * d");
    }

    #[test]
    fn test_idempotent_on_samples() {
        let samples = [
            "**bold** and *it* and _u_",
            "# Title\n\n- item\n- *item*\n",
            "*a*b*",
            "  # \n - \n* * *",
            "__dunder__ name",
            "**\n**",
            "line\r\n\r\n## h\r\n",
        ];
        for sample in samples {
            let once = clean(sample);
            assert_eq!(clean(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_idempotent_exhaustive_short_strings() {
        let alphabet = ['*', '_', '#', '-', ' ', '\n', 'a'];
        let mut inputs = vec![String::new()];
        for _ in 0..5 {
            let mut next = Vec::new();
            for prefix in &inputs {
                for c in alphabet {
                    let mut s = prefix.clone();
                    s.push(c);
                    next.push(s);
                }
            }
            for s in &next {
                let once = clean(s);
                assert_eq!(clean(&once), once, "not idempotent for {s:?}");
            }
            inputs = next;
        }
    }

    #[test]
    fn test_preview_is_char_safe() {
        assert_eq!(preview("नमस्ते दुनिया", 3), "नमस");
        assert_eq!(preview("hi", 50), "hi");
    }
}
