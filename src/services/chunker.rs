use serde::Serialize;

/// Errors raised before any chunking work starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    #[error("Invalid chunking configuration: {0}")]
    Configuration(String),
}

/// One window of the overlapping partition. `start` counts characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub index: usize,
    pub start: usize,
    pub text: String,
}

impl Chunk {
    /// Length of the chunk in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingPolicy {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl ChunkingPolicy {
    pub fn validate(&self) -> Result<(), ChunkError> {
        if self.chunk_size == 0 {
            return Err(ChunkError::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_size <= self.overlap {
            return Err(ChunkError::Configuration(format!(
                "chunk_size ({}) must be greater than overlap ({})",
                self.chunk_size, self.overlap
            )));
        }
        Ok(())
    }

    /// Distance between consecutive chunk starts. Only meaningful once validated.
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

/// A validated chunking policy. Construction fails on a policy that could not
/// make forward progress, so `split` on a `Chunker` never errors.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    policy: ChunkingPolicy,
}

impl Chunker {
    pub fn new(policy: ChunkingPolicy) -> Result<Self, ChunkError> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> ChunkingPolicy {
        self.policy
    }

    pub fn split(&self, text: &str) -> Vec<Chunk> {
        split_unchecked(text, self.policy.chunk_size, self.policy.stride())
    }
}

/// Split text into overlapping character windows of `chunk_size`, each
/// starting `chunk_size - overlap` characters after the previous one.
pub fn split(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>, ChunkError> {
    let policy = ChunkingPolicy {
        chunk_size,
        overlap,
    };
    policy.validate()?;
    Ok(split_unchecked(text, chunk_size, policy.stride()))
}

fn split_unchecked(text: &str, chunk_size: usize, stride: usize) -> Vec<Chunk> {
    if text.is_empty() {
        return Vec::new();
    }

    // Byte offset of every char boundary, plus the end of the string.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = boundaries.len() - 1;

    let mut chunks = Vec::with_capacity(len.div_ceil(stride));
    let mut start = 0;

    while start < len {
        let end = (start + chunk_size).min(len);
        chunks.push(Chunk {
            index: chunks.len(),
            start,
            text: text[boundaries[start]..boundaries[end]].to_string(),
        });
        start += stride;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_split_worked_example() {
        let chunks = split("abcdef", 4, 2).unwrap();
        assert_eq!(texts(&chunks), vec!["abcd", "cdef", "ef"]);
        assert_eq!(
            chunks.iter().map(|c| c.start).collect::<Vec<_>>(),
            vec![0, 2, 4]
        );
        assert_eq!(
            chunks.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_split_empty() {
        assert!(split("", 2000, 200).unwrap().is_empty());
    }

    #[test]
    fn test_split_rejects_non_positive_stride() {
        assert!(matches!(
            split("some text", 100, 100),
            Err(ChunkError::Configuration(_))
        ));
        assert!(matches!(
            split("some text", 100, 150),
            Err(ChunkError::Configuration(_))
        ));
        assert!(matches!(split("", 0, 0), Err(ChunkError::Configuration(_))));
    }

    #[test]
    fn test_chunker_new_validates() {
        assert!(Chunker::new(ChunkingPolicy { chunk_size: 10, overlap: 10 }).is_err());
        let chunker = Chunker::new(ChunkingPolicy { chunk_size: 10, overlap: 3 }).unwrap();
        assert_eq!(chunker.policy().stride(), 7);
    }

    #[test]
    fn test_split_short_text_is_single_chunk() {
        let chunks = split("hello world", 2000, 200).unwrap();
        assert_eq!(texts(&chunks), vec!["hello world"]);
        assert_eq!(chunks[0].start, 0);

        let exact = split("abcd", 4, 1).unwrap();
        assert_eq!(texts(&exact), vec!["abcd", "d"]);
    }

    #[test]
    fn test_split_zero_overlap_is_contiguous() {
        let text = "abcdefghij";
        let chunks = split(text, 3, 0).unwrap();
        assert_eq!(texts(&chunks), vec!["abc", "def", "ghi", "j"]);
        assert_eq!(chunks.iter().map(|c| c.text.as_str()).collect::<String>(), text);
    }

    #[test]
    fn test_split_covers_text_without_gaps() {
        let text: String = (0..997).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        for (chunk_size, overlap) in [(10, 1), (64, 63), (100, 30), (500, 499), (2000, 200)] {
            let chunks = split(&text, chunk_size, overlap).unwrap();
            let stride = chunk_size - overlap;

            assert_eq!(chunks[0].start, 0);
            for pair in chunks.windows(2) {
                assert_eq!(pair[1].start - pair[0].start, stride);
                // Each span reaches at least the next start, so there are no gaps.
                assert!(pair[0].start + pair[0].char_len() >= pair[1].start);
            }
            let last = chunks.last().unwrap();
            assert_eq!(last.start + last.char_len(), text.len());
            assert!(chunks.iter().all(|c| c.char_len() <= chunk_size));
        }
    }

    #[test]
    fn test_split_counts_characters_not_bytes() {
        let text = "héllo wörld ✓✓";
        let chunks = split(text, 5, 1).unwrap();
        assert_eq!(texts(&chunks), vec!["héllo", "o wör", "rld ✓", "✓✓"]);
        assert_eq!(
            chunks.iter().map(|c| c.start).collect::<Vec<_>>(),
            vec![0, 4, 8, 12]
        );
    }

    #[test]
    fn test_split_is_deterministic() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(40);
        assert_eq!(split(&text, 128, 16).unwrap(), split(&text, 128, 16).unwrap());
    }

    #[test]
    fn test_split_alphabet_document() {
        let text: String = "abcdefghijklmnopqrstuvwxyz".chars().cycle().take(5000).collect();
        let chunks = split(&text, 2000, 200).unwrap();
        assert_eq!(
            chunks.iter().map(|c| c.start).collect::<Vec<_>>(),
            vec![0, 1800, 3600]
        );
        assert_eq!(
            chunks.iter().map(Chunk::char_len).collect::<Vec<_>>(),
            vec![2000, 2000, 1400]
        );
    }
}
