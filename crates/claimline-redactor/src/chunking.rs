//! Overlapping text chunking for bounded detectors

/// A chunk of text and where it starts in the original
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Character offset of the chunk's first character in the original text
    pub start: usize,
    /// Chunk contents
    pub text: String,
}

/// Splits text into fixed-size, overlapping character windows
///
/// The overlap guarantees that an entity shorter than the overlap, lying
/// across a window boundary, appears whole in at least one window.
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker
    ///
    /// The overlap is clamped below the chunk size so chunking always
    /// advances.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    /// Chunk the given text
    ///
    /// Offsets and sizes are in characters, never splitting a code point.
    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = boundaries.len() - 1;

        if total <= self.chunk_size {
            return vec![TextChunk {
                start: 0,
                text: text.to_string(),
            }];
        }

        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = std::cmp::min(start + self.chunk_size, total);
            chunks.push(TextChunk {
                start,
                text: text[boundaries[start]..boundaries[end]].to_string(),
            });
            if end == total {
                break;
            }
            start = end - self.overlap;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_chunking_needed_for_small_text() {
        let chunker = TextChunker::new(100, 10);
        let chunks = chunker.chunk("Short text here.");
        assert_eq!(chunks, vec![TextChunk { start: 0, text: "Short text here.".into() }]);
    }

    #[test]
    fn test_empty_text() {
        let chunks = TextChunker::new(100, 10).chunk("");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "");
    }

    #[test]
    fn test_windows_overlap() {
        let text: String = ('a'..='z').collect();
        let chunks = TextChunker::new(10, 3).chunk(&text);

        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[0].text, "abcdefghij");
        assert_eq!(chunks[1].start, 7);
        assert_eq!(chunks[1].text, "hijklmnopq");
        assert_eq!(chunks.last().unwrap().text.chars().last(), Some('z'));
    }

    #[test]
    fn test_chunks_cover_the_text() {
        let text = "0123456789".repeat(7);
        let chunks = TextChunker::new(16, 4).chunk(&text);

        for chunk in &chunks {
            let expected: String = text.chars().skip(chunk.start).take(chunk.text.chars().count()).collect();
            assert_eq!(chunk.text, expected);
        }
        let last = chunks.last().unwrap();
        assert_eq!(last.start + last.text.chars().count(), text.chars().count());
    }

    #[test]
    fn test_multibyte_characters_are_not_split() {
        let text = "£".repeat(25);
        let chunks = TextChunker::new(10, 2).chunk(&text);

        assert!(chunks.len() > 1);
        for chunk in chunks {
            assert!(chunk.text.chars().all(|c| c == '£'));
            assert!(chunk.text.chars().count() <= 10);
        }
    }

    #[test]
    fn test_overlap_clamped_below_chunk_size() {
        let chunks = TextChunker::new(4, 10).chunk("abcdefgh");
        assert!(chunks.len() >= 2);
        assert!(chunks.windows(2).all(|w| w[1].start > w[0].start));
    }
}
