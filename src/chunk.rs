//! Splits long replies into chat-sized messages.

const PARAGRAPH_SEP: &str = "\n\n";
const SENTENCE_SEP: &str = ". ";

/// Split `text` into chunks of at most `max` characters.
///
/// Paragraphs (blank-line separated) are packed greedily. A paragraph that
/// is too long on its own is packed sentence by sentence, and a sentence
/// that is still too long is hard-wrapped.
pub fn chunk(text: &str, max: usize) -> Vec<String> {
    let max = max.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split(PARAGRAPH_SEP) {
        if char_len(paragraph) <= max {
            push_unit(&mut chunks, &mut current, paragraph, PARAGRAPH_SEP, max);
            continue;
        }

        for (i, sentence) in paragraph.split(SENTENCE_SEP).enumerate() {
            let sep = if i == 0 { PARAGRAPH_SEP } else { SENTENCE_SEP };
            if char_len(sentence) <= max {
                push_unit(&mut chunks, &mut current, sentence, sep, max);
            } else {
                for piece in hard_wrap(sentence, max) {
                    push_unit(&mut chunks, &mut current, piece, sep, max);
                }
            }
        }
    }

    flush(&mut chunks, &mut current);
    chunks
}

/// Prefix each chunk with a "Part i/N" header when there is more than one.
pub fn label_parts(chunks: Vec<String>) -> Vec<String> {
    let total = chunks.len();
    if total <= 1 {
        return chunks;
    }
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| format!("**Part {}/{}**\n{}", i + 1, total, chunk))
        .collect()
}

fn push_unit(chunks: &mut Vec<String>, current: &mut String, unit: &str, sep: &str, max: usize) {
    if current.is_empty() {
        current.push_str(unit);
        return;
    }
    if char_len(current) + char_len(sep) + char_len(unit) <= max {
        current.push_str(sep);
        current.push_str(unit);
    } else {
        flush(chunks, current);
        current.push_str(unit);
    }
}

fn flush(chunks: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
    current.clear();
}

/// Cut `s` into pieces of at most `max` chars, preferring whitespace.
fn hard_wrap(s: &str, max: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = s;

    while char_len(rest) > max {
        let limit = rest
            .char_indices()
            .nth(max)
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        let split_at = rest[..limit]
            .rfind(char::is_whitespace)
            .filter(|&idx| idx > 0)
            .unwrap_or(limit);
        let (head, tail) = rest.split_at(split_at);
        pieces.push(head);
        rest = tail.trim_start();
    }
    if !rest.is_empty() {
        pieces.push(rest);
    }
    pieces
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(chunk("hello world", 100), vec!["hello world"]);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(chunk("", 100).is_empty());
        assert!(chunk("\n\n\n\n", 100).is_empty());
    }

    #[test]
    fn paragraphs_are_packed_until_full() {
        let text = "aaaa\n\nbbbb\n\ncccc";
        // "aaaa\n\nbbbb" is 10 chars
        assert_eq!(chunk(text, 10), vec!["aaaa\n\nbbbb", "cccc"]);
    }

    #[test]
    fn long_paragraph_splits_on_sentences() {
        let text = "One two. Three four. Five six.";
        let chunks = chunk(text, 12);
        assert_eq!(chunks, vec!["One two", "Three four", "Five six."]);
    }

    #[test]
    fn no_chunk_exceeds_max() {
        let sentence = "The quick brown fox jumps over the lazy dog";
        let paragraph = vec![sentence; 30].join(". ");
        let text = vec![paragraph.as_str(); 5].join("\n\n");

        let chunks = chunk(&text, 200);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 200, "chunk too long: {}", c.len());
            assert!(!c.is_empty());
        }
    }

    #[test]
    fn overlong_sentence_is_hard_wrapped() {
        let word = "word ";
        let text = word.repeat(100);
        let chunks = chunk(text.trim(), 42);
        for c in &chunks {
            assert!(c.chars().count() <= 42);
        }
        let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.split_whitespace()).collect();
        assert_eq!(rejoined.len(), 100);
    }

    #[test]
    fn unbroken_run_is_cut_at_max() {
        let text = "x".repeat(25);
        let chunks = chunk(&text, 10);
        assert_eq!(chunks, vec!["x".repeat(10), "x".repeat(10), "x".repeat(5)]);
    }

    #[test]
    fn multibyte_text_counts_chars() {
        let text = "é".repeat(30);
        let chunks = chunk(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() == 10));
    }

    #[test]
    fn content_survives_rejoining() {
        let paragraphs: Vec<String> = (0..40)
            .map(|i| format!("Paragraph {i} has some words in it"))
            .collect();
        let text = paragraphs.join("\n\n");

        let chunks = chunk(&text, 120);
        let rejoined = chunks.join("\n\n");
        assert_eq!(rejoined, text);
    }

    /// Walk `text` chunk by chunk, allowing exactly one separator at each cut.
    fn rejoins(chunks: &[String], text: &str) -> bool {
        let mut rest = text;
        for (i, c) in chunks.iter().enumerate() {
            if i > 0 {
                let Some(r) = rest
                    .strip_prefix(PARAGRAPH_SEP)
                    .or_else(|| rest.strip_prefix(SENTENCE_SEP))
                else {
                    return false;
                };
                rest = r;
            }
            let Some(r) = rest.strip_prefix(c.as_str()) else {
                return false;
            };
            rest = r;
        }
        rest.is_empty()
    }

    fn sentences(prefix: &str, n: usize) -> String {
        (0..n)
            .map(|i| format!("{prefix} sentence {i} goes here"))
            .collect::<Vec<_>>()
            .join(". ")
    }

    #[test]
    fn chunks_rejoin_to_the_original() {
        let long_a = sentences("Alpha", 12);
        let long_b = sentences("Beta", 9);
        let cases: Vec<(String, usize)> = vec![
            (long_a.clone(), 60),
            (format!("{long_a}."), 60),
            (format!("Intro line.\n\n{long_a}\n\nShort end."), 60),
            (format!("{long_a}\n\n{long_b}"), 70),
            (format!("Start.\n\n{long_b}\n\nMiddle.\n\n{long_a}\n\nEnd."), 80),
            (format!("{long_b}\n\ntail"), 200),
        ];

        for (text, max) in cases {
            let chunks = chunk(&text, max);
            assert!(chunks.len() > 1, "expected a split for {text:?}");
            for c in &chunks {
                assert!(!c.is_empty());
                assert!(c.chars().count() <= max, "chunk over {max}: {c:?}");
            }
            assert!(rejoins(&chunks, &text), "lost content at max {max}: {chunks:?}");
        }
    }

    #[test]
    fn short_trailing_paragraph_is_packed() {
        let text = format!("{}\n\nShort end.", sentences("Alpha", 11));
        let chunks = chunk(&text, 60);
        let last = chunks.last().unwrap();
        assert!(last.ends_with("\n\nShort end."), "{last:?}");
        assert!(last.chars().count() <= 60);
    }

    #[test]
    fn label_parts_single_chunk_unlabeled() {
        assert_eq!(label_parts(vec!["only".to_string()]), vec!["only"]);
    }

    #[test]
    fn label_parts_numbers_each_chunk() {
        let labeled = label_parts(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(labeled, vec!["**Part 1/2**\na", "**Part 2/2**\nb"]);
    }
}
