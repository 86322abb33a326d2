use async_trait::async_trait;

use crate::application::ports::{TextSplitter, TextSplitterError};
use crate::domain::{Chunk, DocumentId, Page};

/// Fixed-size character windows with overlap, computed page by page so every
/// chunk keeps its page number.
pub struct FixedSizeSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    fn step(&self) -> usize {
        if self.chunk_size > self.chunk_overlap {
            self.chunk_size - self.chunk_overlap
        } else {
            self.chunk_size
        }
    }

    fn split_page(&self, page: &Page, document_id: DocumentId, out: &mut Vec<Chunk>) {
        let chars: Vec<char> = page.text.chars().collect();
        let total_len = chars.len();
        let step = self.step();

        let mut offset = 0;
        while offset < total_len {
            let end = (offset + self.chunk_size).min(total_len);
            let chunk_text: String = chars[offset..end].iter().collect();

            if !chunk_text.trim().is_empty() {
                out.push(Chunk::new(chunk_text, document_id, Some(page.number), offset));
            }

            if end == total_len {
                break;
            }
            offset += step;
        }
    }
}

#[async_trait]
impl TextSplitter for FixedSizeSplitter {
    async fn split(
        &self,
        pages: &[Page],
        document_id: DocumentId,
    ) -> Result<Vec<Chunk>, TextSplitterError> {
        if self.chunk_size == 0 {
            return Err(TextSplitterError::InvalidParameters(
                "chunk_size must be positive".to_string(),
            ));
        }

        let mut chunks = Vec::new();
        for page in pages {
            self.split_page(page, document_id, &mut chunks);
        }

        tracing::debug!(
            pages = pages.len(),
            chunks = chunks.len(),
            chunk_size = self.chunk_size,
            chunk_overlap = self.chunk_overlap,
            "Split document into chunks"
        );

        Ok(chunks)
    }
}
