use serde::{Deserialize, Serialize};

/// One identified retrieval unit of a reference document.
///
/// The id is `{filename}_{index}` where `index` is the zero-based window
/// position within the document, so re-chunking identical text always
/// reproduces the same ids in the same order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
}

/// Split `text` into non-overlapping windows of `window` whitespace-delimited
/// words. The final window may be shorter; empty input yields no windows.
///
/// Chunk `i` covers words `[i * window, (i + 1) * window)` of the document,
/// joined with single spaces.
pub fn chunk(text: &str, window: usize) -> Vec<String> {
    if window == 0 {
        return Vec::new();
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(window)
        .map(|group| group.join(" "))
        .collect()
}

/// Chunk a named document into identified windows.
pub fn chunk_document(filename: &str, text: &str, window: usize) -> Vec<DocumentChunk> {
    chunk(text, window)
        .into_iter()
        .enumerate()
        .map(|(index, text)| DocumentChunk {
            id: format!("{filename}_{index}"),
            text,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk("", 400).is_empty());
        assert!(chunk("   \n\t ", 400).is_empty());
        assert!(chunk_document("spec.pdf", "", 400).is_empty());
    }

    #[test]
    fn final_window_may_be_shorter() {
        let text = "a b c d e f g";
        let chunks = chunk(text, 3);
        assert_eq!(chunks, vec!["a b c", "d e f", "g"]);
    }

    #[test]
    fn chunk_count_is_ceil_of_word_count_over_window() {
        let text: String = (0..1000).map(|i| format!("w{i} ")).collect();
        for window in [1usize, 7, 400, 999, 1000, 5000] {
            let expected = 1000usize.div_ceil(window);
            assert_eq!(chunk(&text, window).len(), expected, "window {window}");
        }
    }

    #[test]
    fn reassembly_reproduces_normalized_token_sequence() {
        let text = "  alpha\tbeta \n gamma  delta epsilon ";
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        for window in [1usize, 2, 3, 100] {
            let rejoined = chunk(text, window).join(" ");
            assert_eq!(rejoined, normalized, "window {window}");
        }
    }

    #[test]
    fn document_chunks_carry_stable_ids() {
        let text = "one two three four five";
        let chunks = chunk_document("offer.pdf", text, 2);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].id, "offer.pdf_0");
        assert_eq!(chunks[1].id, "offer.pdf_1");
        assert_eq!(chunks[2].id, "offer.pdf_2");
        assert_eq!(chunks[2].text, "five");

        // Deterministic across runs.
        assert_eq!(chunks, chunk_document("offer.pdf", text, 2));
    }
}
