//! Sentence segmentation.
//!
//! [`SentenceSegmenter`] is the seam for swapping in a smarter strategy
//! without touching the chunk builder. The default
//! [`PunctuationSegmenter`] splits after `.`, `!` or `?` when followed by
//! whitespace.
//!
//! # Known limitations
//!
//! No abbreviation, decimal, or quotation handling: `"Dr. Smith"` becomes
//! two sentences, while `"3.14"` stays intact only because no whitespace
//! follows the period.

/// Splits cleaned text into an ordered sequence of sentences.
pub trait SentenceSegmenter: Send + Sync {
    /// Sentences in original order, each trimmed and non-empty.
    fn segment(&self, text: &str) -> Vec<String>;
}

/// Boundary = terminal punctuation followed by a run of whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct PunctuationSegmenter;

impl SentenceSegmenter for PunctuationSegmenter {
    fn segment(&self, text: &str) -> Vec<String> {
        split_sentences(text)
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

/// Borrowing form of [`PunctuationSegmenter::segment`].
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let Some(&(boundary, next)) = chars.peek() else {
            break;
        };
        if !next.is_whitespace() {
            continue;
        }

        pieces.push(&text[start..boundary]);

        // Consume the whole whitespace run; the next sentence starts after it.
        start = text.len();
        while let Some(&(i, w)) = chars.peek() {
            if w.is_whitespace() {
                chars.next();
            } else {
                start = i;
                break;
            }
        }
    }

    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_sentences() {
        let s = split_sentences(
            "The deployment is delayed due to a config issue. We expect it resolved by Friday.",
        );
        assert_eq!(
            s,
            vec![
                "The deployment is delayed due to a config issue.",
                "We expect it resolved by Friday."
            ]
        );
    }

    #[test]
    fn test_all_terminators() {
        let s = split_sentences("Really?  Yes! Done.");
        assert_eq!(s, vec!["Really?", "Yes!", "Done."]);
    }

    #[test]
    fn test_no_terminator() {
        assert_eq!(split_sentences("no punctuation here"), vec!["no punctuation here"]);
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("   \n\t ").is_empty());
    }

    #[test]
    fn test_decimal_not_split() {
        assert_eq!(split_sentences("Pi is 3.14 today."), vec!["Pi is 3.14 today."]);
    }

    #[test]
    fn test_abbreviation_is_split() {
        assert_eq!(split_sentences("Ask Dr. Smith."), vec!["Ask Dr.", "Smith."]);
    }

    #[test]
    fn test_trailing_whitespace_after_last_sentence() {
        assert_eq!(split_sentences("One. Two.   "), vec!["One.", "Two."]);
    }

    #[test]
    fn test_multibyte_text() {
        assert_eq!(
            split_sentences("Café fermé. Ça va? Oui!"),
            vec!["Café fermé.", "Ça va?", "Oui!"]
        );
    }

    #[test]
    fn test_segmenter_trait_object() {
        let seg: Box<dyn SentenceSegmenter> = Box::new(PunctuationSegmenter);
        assert_eq!(seg.segment("A. B."), vec!["A.".to_string(), "B.".to_string()]);
    }
}
