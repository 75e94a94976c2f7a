//! Optional content-addressed cache of built indexes.
//!
//! Keyed by the corpus fingerprint, the chunking parameters and the embedder
//! id, so a hit is only possible when re-embedding would produce the same
//! vectors.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use pdfqa_core::chunker::ChunkParams;
use pdfqa_core::types::Document;

use crate::index::VectorIndex;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub corpus: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedder_id: String,
}

impl CacheKey {
    pub fn new(documents: &[Document], params: ChunkParams, embedder_id: &str) -> Self {
        Self {
            corpus: corpus_fingerprint(documents),
            chunk_size: params.chunk_size(),
            chunk_overlap: params.chunk_overlap(),
            embedder_id: embedder_id.to_string(),
        }
    }
}

/// blake3 over every document's source, page and text, in order.
pub fn corpus_fingerprint(documents: &[Document]) -> String {
    let mut hasher = blake3::Hasher::new();
    for doc in documents {
        hasher.update(doc.source.as_bytes());
        hasher.update(&[0]);
        hasher.update(&doc.page.map_or(u64::MAX, |p| p as u64).to_le_bytes());
        hasher.update(&(doc.text.len() as u64).to_le_bytes());
        hasher.update(doc.text.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

#[derive(Default)]
pub struct IndexCache {
    entries: Mutex<HashMap<CacheKey, Arc<VectorIndex>>>,
}

impl IndexCache {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<VectorIndex>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    pub fn insert(&self, key: CacheKey, index: Arc<VectorIndex>) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).insert(key, index);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
