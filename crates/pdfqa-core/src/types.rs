//! Domain types shared by the loader, chunker, index and orchestrator.

use serde::{Deserialize, Serialize};

/// Text of one extracted page together with where it came from.
///
/// - `source`: path of the originating file
/// - `page`: zero-based page index, `None` for sources without pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub source: String,
    pub page: Option<usize>,
}

impl Document {
    pub fn new(text: impl Into<String>, source: impl Into<String>, page: Option<usize>) -> Self {
        Self { text: text.into(), source: source.into(), page }
    }

    /// Stable identity of the document, `path#p<page>` for paged sources.
    pub fn id(&self) -> String {
        match self.page {
            Some(page) => format!("{}#p{}", self.source, page),
            None => self.source.clone(),
        }
    }

    /// Length of the text in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A contiguous slice of a [`Document`], the unit of retrieval.
///
/// `offset` and `length` count characters, not bytes, so that
/// `doc.text.chars().skip(offset).take(length)` reproduces `text`.
/// `index` is the position of the chunk within its document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    pub page: Option<usize>,
    pub offset: usize,
    pub length: usize,
    pub index: usize,
}

impl Chunk {
    pub fn document_id(&self) -> String {
        match self.page {
            Some(page) => format!("{}#p{}", self.source, page),
            None => self.source.clone(),
        }
    }
}

/// A retrieved chunk with its similarity to the query. Higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f64,
}

/// Chunks ranked by descending similarity, at most `top_k` long.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub hits: Vec<ScoredChunk>,
}

impl RetrievalResult {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.hits.iter().map(|h| &h.chunk)
    }
}
