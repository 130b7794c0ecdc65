//! Document chunking: overlapping windows over extracted text
//!
//! Splits full document text into fixed-size character windows, each
//! overlapping its successor, preferring natural boundaries (paragraph
//! break, line break, sentence end, whitespace) over hard cuts so words
//! survive chunking intact. Output is a lazy, restartable iterator of
//! chunks with monotonically increasing positions.

use serde::{Deserialize, Serialize};

use crate::errors::{RagError, Result};
use crate::store::types::{Chunk, ChunkSource};

/// Chunking configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

/// Document text splitter
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Create a chunker, validating the configuration.
    ///
    /// `overlap >= chunk_size` would never advance the window, and a zero
    /// chunk size emits nothing; both are `InvalidConfiguration`.
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(RagError::InvalidConfiguration(
                "chunk_size must be > 0".to_string(),
            ));
        }
        if config.overlap >= config.chunk_size {
            return Err(RagError::InvalidConfiguration(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                config.overlap, config.chunk_size
            )));
        }
        Ok(Self { config })
    }

    /// Split a document into chunks. The iterator is lazy and finite;
    /// calling this again restarts from the beginning.
    pub fn chunk(&self, document_id: &str, source: ChunkSource, text: &str) -> ChunkIter {
        ChunkIter {
            chars: text.chars().collect(),
            config: self.config,
            document_id: document_id.to_string(),
            source,
            start: 0,
            position: 0,
            done: false,
        }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }
}

/// Lazy iterator over a single document's chunks
pub struct ChunkIter {
    chars: Vec<char>,
    config: ChunkerConfig,
    document_id: String,
    source: ChunkSource,
    start: usize,
    position: usize,
    done: bool,
}

impl ChunkIter {
    /// Pick the cut point for a window starting at `start`.
    ///
    /// `limit` is the hard cut (start + chunk_size, clamped to the text).
    /// Natural boundaries are tried in priority order; a candidate must
    /// land past `start + overlap` so the next window makes progress.
    fn find_cut(&self, start: usize, limit: usize) -> usize {
        let min_cut = start + self.config.overlap + 1;
        let chars = &self.chars;

        // Paragraph break: cut after a blank line
        for i in (start + 1..limit).rev() {
            if chars[i] == '\n' && chars[i - 1] == '\n' && i + 1 >= min_cut {
                return i + 1;
            }
        }

        // Line break
        for i in (start..limit).rev() {
            if chars[i] == '\n' && i + 1 >= min_cut {
                return i + 1;
            }
        }

        // Sentence end: terminator followed by whitespace
        for i in (start..limit - 1).rev() {
            if matches!(chars[i], '.' | '!' | '?') && chars[i + 1].is_whitespace() && i + 1 >= min_cut
            {
                return i + 1;
            }
        }

        // Any whitespace
        for i in (start..limit).rev() {
            if chars[i].is_whitespace() && i + 1 >= min_cut {
                return i + 1;
            }
        }

        limit
    }
}

impl Iterator for ChunkIter {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.done || self.start >= self.chars.len() {
            return None;
        }

        let len = self.chars.len();
        let end = if self.start + self.config.chunk_size >= len {
            self.done = true;
            len
        } else {
            self.find_cut(self.start, self.start + self.config.chunk_size)
        };

        let text: String = self.chars[self.start..end].iter().collect();
        let chunk = Chunk::new(
            self.document_id.as_str(),
            self.position,
            text,
            self.source.clone(),
        );

        self.position += 1;
        if !self.done {
            self.start = end - self.config.overlap;
        }

        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    fn source() -> ChunkSource {
        ChunkSource::new("notes", "md", "general")
    }

    fn chunk_all(config: ChunkerConfig, text: &str) -> Vec<Chunk> {
        let chunker = Chunker::new(config).unwrap();
        chunker.chunk("doc-1", source(), text).collect()
    }

    /// Concatenate chunks minus their leading overlaps
    fn reconstruct(chunks: &[Chunk], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(&chunk.text);
            } else {
                out.extend(chunk.text.chars().skip(overlap));
            }
        }
        out
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        let err = Chunker::new(ChunkerConfig {
            chunk_size: 0,
            overlap: 0,
        })
        .unwrap_err();
        assert!(matches!(err, RagError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        let err = Chunker::new(ChunkerConfig {
            chunk_size: 10,
            overlap: 10,
        })
        .unwrap_err();
        assert!(matches!(err, RagError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_all(ChunkerConfig::default(), "just a note");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "just a note");
        assert_eq!(chunks[0].position, 0);
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        let chunks = chunk_all(ChunkerConfig::default(), "");
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_positions_are_monotonic_from_zero() {
        let text = "word ".repeat(200);
        let chunks = chunk_all(
            ChunkerConfig {
                chunk_size: 100,
                overlap: 20,
            },
            &text,
        );
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.position, i);
        }
    }

    #[test]
    fn test_consecutive_chunks_share_overlap() {
        let text = "alpha beta gamma delta ".repeat(30);
        let overlap = 15;
        let chunks = chunk_all(
            ChunkerConfig {
                chunk_size: 80,
                overlap,
            },
            &text,
        );
        for pair in chunks.windows(2) {
            let tail: String = pair[0].text.chars().rev().take(overlap).collect::<Vec<_>>()
                .into_iter().rev().collect();
            let head: String = pair[1].text.chars().take(overlap).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn test_prefers_whitespace_over_severing_words() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa ".repeat(5);
        let chunks = chunk_all(
            ChunkerConfig {
                chunk_size: 30,
                overlap: 5,
            },
            &text,
        );
        // Every non-final chunk should end at whitespace, not mid-word
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(
                chunk.text.ends_with(char::is_whitespace),
                "chunk severed a word: {:?}",
                chunk.text
            );
        }
    }

    #[test]
    fn test_prefers_paragraph_break() {
        let text = format!("{}\n\n{}", "a".repeat(40), "b".repeat(40));
        let chunks = chunk_all(
            ChunkerConfig {
                chunk_size: 60,
                overlap: 4,
            },
            &text,
        );
        assert!(chunks[0].text.ends_with("\n\n"));
    }

    #[test]
    fn test_hard_cut_when_no_boundary_exists() {
        let text = "x".repeat(250);
        let chunks = chunk_all(
            ChunkerConfig {
                chunk_size: 100,
                overlap: 10,
            },
            &text,
        );
        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].char_count, 100);
        assert_eq!(reconstruct(&chunks, 10), text);
    }

    #[test]
    fn test_reconstruction_multibyte_text() {
        let text = "héllo wörld. ".repeat(40);
        let overlap = 8;
        let chunks = chunk_all(
            ChunkerConfig {
                chunk_size: 50,
                overlap,
            },
            &text,
        );
        assert_eq!(reconstruct(&chunks, overlap), text);
    }

    #[quickcheck]
    fn prop_chunks_reconstruct_original(text: String, size: u8, overlap: u8) -> TestResult {
        let chunk_size = (size as usize % 120) + 1;
        let overlap = overlap as usize % 120;
        if overlap >= chunk_size {
            return TestResult::discard();
        }

        let chunks = chunk_all(
            ChunkerConfig {
                chunk_size,
                overlap,
            },
            &text,
        );
        TestResult::from_bool(reconstruct(&chunks, overlap) == text)
    }
}
