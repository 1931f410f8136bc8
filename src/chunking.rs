use crate::error::{RagError, Result};

/// Default chunk size in characters
pub const DEFAULT_CHUNK_SIZE: usize = 500;
/// Default overlap between consecutive chunks, in characters
pub const DEFAULT_OVERLAP: usize = 50;

/// Splits cleaned document text into overlapping windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Chunker {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl Chunker {
    /// Create a chunker, rejecting sizes that could never make progress
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(RagError::InvalidChunking {
                chunk_size,
                overlap,
            });
        }
        Ok(Chunker {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split text into chunks of at most `chunk_size` characters.
    ///
    /// A window that does not reach the end of the text is cut right after the
    /// last period in its second half, so sentences are kept whole where
    /// possible. Each next window starts `overlap` characters before the
    /// previous one ended.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();

        if len <= self.chunk_size {
            return vec![text.trim().to_string()];
        }

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < len {
            let mut end = start + self.chunk_size;

            if end < len {
                // Look for a sentence end near the window boundary
                if let Some(period) = chars[start..end].iter().rposition(|&c| c == '.') {
                    let period = start + period;
                    if period > start + self.chunk_size / 2 {
                        end = period + 1;
                    }
                }
            }

            let window: String = chars[start..end.min(len)].iter().collect();
            let chunk = window.trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }

            // end - start > chunk_size / 2, but a large overlap could still move us backwards
            start = (end - self.overlap).max(start + 1);
        }

        chunks
    }
}

/// Split text with the default chunk size and overlap
pub fn split_into_chunks(text: &str) -> Vec<String> {
    Chunker::default().chunk(text)
}
