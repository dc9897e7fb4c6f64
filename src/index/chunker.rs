//! Paragraph-aware text splitter

use once_cell::sync::Lazy;
use regex::Regex;

/// Default maximum chunk size, in characters
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 1500;

static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r?\n[ \t]*\r?\n").expect("paragraph regex is valid"));

const PARAGRAPH_JOIN: &str = "\n\n";

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Paragraphs (separated by blank lines) are packed greedily into a chunk
/// while it fits; a paragraph longer than the limit is cut, preferring the
/// last whitespace inside the window. Whitespace-only input yields nothing.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for paragraph in PARAGRAPH_BREAK.split(text) {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        for piece in split_long(paragraph, max_chars) {
            let piece_len = piece.chars().count();
            if current.is_empty() {
                current = piece;
                current_len = piece_len;
            } else if current_len + PARAGRAPH_JOIN.len() + piece_len <= max_chars {
                current.push_str(PARAGRAPH_JOIN);
                current.push_str(&piece);
                current_len += PARAGRAPH_JOIN.len() + piece_len;
            } else {
                chunks.push(std::mem::replace(&mut current, piece));
                current_len = piece_len;
            }
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Cut one paragraph into pieces of at most `max_chars` characters
fn split_long(paragraph: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = paragraph.chars().collect();
    if chars.len() <= max_chars {
        return vec![paragraph.to_string()];
    }

    let mut pieces = Vec::new();
    let mut start = 0usize;
    while start < chars.len() {
        let mut end = (start + max_chars).min(chars.len());
        if end < chars.len() {
            if let Some(offset) = chars[start..end].iter().rposition(|c| c.is_whitespace()) {
                if offset > 0 {
                    end = start + offset;
                }
            }
        }

        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }

        start = end;
        while start < chars.len() && chars[start].is_whitespace() {
            start += 1;
        }
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn without_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(chunk_text("", 100).is_empty());
        assert!(chunk_text("  \n\n \n", 100).is_empty());
    }

    #[test]
    fn test_small_paragraphs_are_packed() {
        let text = "Primeiro parágrafo.\n\nSegundo parágrafo.\n\nTerceiro.";
        let chunks = chunk_text(text, 1500);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text);
    }

    #[test]
    fn test_paragraph_boundary_respected() {
        let a = "a".repeat(60);
        let b = "b".repeat(60);
        let text = format!("{}\n\n{}", a, b);
        let chunks = chunk_text(&text, 100);
        assert_eq!(chunks, vec![a, b]);
    }

    #[test]
    fn test_long_paragraph_prefers_whitespace_cut() {
        let text = "palavra ".repeat(50);
        let chunks = chunk_text(&text, 30);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(!chunk.starts_with(' ') && !chunk.ends_with(' '));
            assert!(chunk.split(' ').all(|w| w == "palavra"));
        }
    }

    #[rstest]
    #[case(10)]
    #[case(64)]
    #[case(200)]
    #[case(DEFAULT_MAX_CHUNK_CHARS)]
    fn test_chunks_bounded_and_content_preserved(#[case] max: usize) {
        let text = format!(
            "Boas Práticas de Fabricação (BPF) exigem validação.\n\n{}\n\nRDC 658/2022 da ANVISA.\r\n\r\n{}",
            "estabilidade ".repeat(40),
            "x".repeat(max * 3 + 7)
        );

        let chunks = chunk_text(&text, max);
        assert!(chunks.iter().all(|c| c.chars().count() <= max));
        assert_eq!(without_whitespace(&chunks.concat()), without_whitespace(&text));
    }

    #[test]
    fn test_multibyte_characters_counted_as_chars() {
        let text = "ação".repeat(10);
        let chunks = chunk_text(&text, 8);
        assert!(chunks.iter().all(|c| c.chars().count() <= 8));
        assert_eq!(chunks.concat(), text);
    }
}
