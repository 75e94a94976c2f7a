//! Fixed-size sliding-window chunking over characters.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Chunk, Document};

pub const DEFAULT_CHUNK_SIZE: usize = 200;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Validated window parameters: `chunk_size > 0` and `chunk_overlap < chunk_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkParams {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkParams {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::config("chunk_size must be greater than 0"));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::config(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    pub fn chunk_size(&self) -> usize { self.chunk_size }
    pub fn chunk_overlap(&self) -> usize { self.chunk_overlap }
    pub fn step(&self) -> usize { self.chunk_size - self.chunk_overlap }

    /// Number of chunks a text of `len` characters splits into.
    pub fn expected_chunks(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else if len <= self.chunk_size {
            1
        } else {
            1 + (len - self.chunk_size).div_ceil(self.step())
        }
    }
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, chunk_overlap: DEFAULT_CHUNK_OVERLAP }
    }
}

/// Splits `document` into windows of `chunk_size` characters advancing by
/// `chunk_size - chunk_overlap`. The last window may be shorter.
pub fn split(document: &Document, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<Chunk>> {
    let params = ChunkParams::new(chunk_size, chunk_overlap)?;
    Ok(Chunker::new(params).split(document))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Chunker {
    params: ChunkParams,
}

impl Chunker {
    pub fn new(params: ChunkParams) -> Self { Self { params } }

    pub fn params(&self) -> ChunkParams { self.params }

    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        let text = document.text.as_str();
        // Byte position of every char plus the end, so windows slice on char boundaries.
        let bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        let total = bounds.len() - 1;
        let mut chunks = Vec::with_capacity(self.params.expected_chunks(total));
        let mut start = 0usize;
        while start < total {
            let end = (start + self.params.chunk_size).min(total);
            chunks.push(Chunk {
                text: text[bounds[start]..bounds[end]].to_string(),
                source: document.source.clone(),
                page: document.page,
                offset: start,
                length: end - start,
                index: chunks.len(),
            });
            if end == total {
                break;
            }
            start += self.params.step();
        }
        chunks
    }

    /// Splits every document, keeping document order.
    pub fn split_all<'a, I>(&self, documents: I) -> Vec<Chunk>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        documents.into_iter().flat_map(|doc| self.split(doc)).collect()
    }
}
