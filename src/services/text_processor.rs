// Text Processing Service
// Paragraph segmentation, lexical tokenization and truncation helpers

use regex::Regex;
use std::sync::OnceLock;

use crate::models::Paragraph;

fn smart_quote_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\u{2018}\u{2019}\u{201b}\u{2032}]").expect("valid regex"))
}

/// Split article or transcript text into paragraphs, one per non-blank line.
///
/// Lines are trimmed and blank lines dropped; input order is kept because results are
/// reported positionally.
pub fn segment_paragraphs(text: &str) -> Vec<Paragraph> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    text.split(|c: char| c == '\n' || c == '\r')
        .filter_map(Paragraph::new)
        .collect()
}

/// Fold typographic apostrophes and dashes into ASCII
pub fn normalize_punctuation(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let s = smart_quote_re().replace_all(text, "'");
    s.replace(|c: char| c == '\u{2014}' || c == '\u{2013}', " ")
}

/// Lowercased words with surrounding punctuation stripped.
///
/// Inner apostrophes and hyphens survive ("don't", "far-left"); tokens with no letters or
/// digits are dropped.
pub fn lexical_words(text: &str) -> Vec<String> {
    normalize_punctuation(text)
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '\'' || *c == '-')
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|w| w.chars().any(|c| c.is_alphanumeric()))
        .collect()
}

/// Keep at most `max_words` whitespace-separated words.
pub fn truncate_words(text: &str, max_words: usize) -> String {
    let mut words = text.split_whitespace();
    let kept: Vec<&str> = words.by_ref().take(max_words).collect();
    if words.next().is_none() {
        return text.trim().to_string();
    }
    kept.join(" ")
}

/// Keep at most `max_chars` characters (Unicode scalars, never splitting a code point).
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_drops_blank_lines_and_trims() {
        let text = "  First paragraph.  \n\n\t\nSecond paragraph.\r\nThird.\r";
        let paragraphs = segment_paragraphs(text);
        let texts: Vec<&str> = paragraphs.iter().map(|p| p.text()).collect();
        assert_eq!(texts, vec!["First paragraph.", "Second paragraph.", "Third."]);
    }

    #[test]
    fn test_segment_whitespace_only_is_empty() {
        assert!(segment_paragraphs("").is_empty());
        assert!(segment_paragraphs(" \n\t\r\n  \n").is_empty());
    }

    #[test]
    fn test_segment_never_yields_blank_paragraph() {
        let inputs = ["a\n\nb", "\n\n\nx", "   y   ", "z\n \n \n", "\u{a0}\n w"];
        for input in inputs {
            for p in segment_paragraphs(input) {
                assert!(!p.text().trim().is_empty(), "blank paragraph from {:?}", input);
            }
        }
    }

    #[test]
    fn test_segment_preserves_order() {
        let lines: Vec<String> = (0..20).map(|i| format!("Line number {}", i)).collect();
        let text = lines.join("\n\n");
        let paragraphs = segment_paragraphs(&text);
        assert_eq!(paragraphs.len(), 20);
        for (i, p) in paragraphs.iter().enumerate() {
            assert_eq!(p.text(), lines[i]);
        }
    }

    #[test]
    fn test_lexical_words() {
        let words = lexical_words("Crisis! \u{201c}They\u{2019}re destroying EVERYTHING,\u{201d} he said\u{2014}again.");
        assert_eq!(
            words,
            vec!["crisis", "they're", "destroying", "everything", "he", "said", "again"]
        );
        assert_eq!(lexical_words("0.3% -- ..."), vec!["03"]);
    }

    #[test]
    fn test_truncate_words() {
        assert_eq!(truncate_words("one two three", 5), "one two three");
        assert_eq!(truncate_words("one two three four", 2), "one two");
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 800), "short");
    }
}
