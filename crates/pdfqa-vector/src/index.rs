//! In-memory vector index over chunk embeddings.
//!
//! Built once per query session and immutable afterwards. Building either
//! embeds every chunk or fails as a whole; there is no partially built index.

use futures::{StreamExt, TryStreamExt};

use pdfqa_core::config::RuntimeConfig;
use pdfqa_core::retry::{call_with_retry, RetryPolicy};
use pdfqa_core::traits::Embedder;
use pdfqa_core::types::{Chunk, RetrievalResult, ScoredChunk};
use pdfqa_core::{CapabilityError, Error, Result};

use crate::similarity::Metric;

#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    pub batch_size: usize,
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::from(&RuntimeConfig::default())
    }
}

impl From<&RuntimeConfig> for BuildOptions {
    fn from(rt: &RuntimeConfig) -> Self {
        Self { batch_size: rt.embed_batch_size, concurrency: rt.embed_concurrency, retry: rt.retry }
    }
}

#[derive(Debug, Clone)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    embedder_id: String,
    dim: usize,
    retry: RetryPolicy,
}

impl VectorIndex {
    /// Embeds `chunks` in batches, several batches in flight, and keeps the
    /// entries in chunk order.
    pub async fn build(chunks: Vec<Chunk>, embedder: &dyn Embedder, options: &BuildOptions) -> Result<Self> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let retry = options.retry;
        let batches: Vec<Vec<Vec<f32>>> = futures::stream::iter(texts.chunks(options.batch_size.max(1)).enumerate())
            .map(move |(n, batch)| async move {
                let vectors = call_with_retry("embed_batch", &retry, || embedder.embed_batch(batch)).await?;
                if vectors.len() != batch.len() {
                    return Err(CapabilityError::InvalidResponse(format!(
                        "batch {n}: expected {} vectors, got {}",
                        batch.len(),
                        vectors.len()
                    )));
                }
                tracing::debug!(batch = n, size = batch.len(), "embedded batch");
                Ok(vectors)
            })
            .buffered(options.concurrency.max(1))
            .try_collect()
            .await
            .map_err(Error::Embedding)?;

        let dim = embedder.dim();
        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(batches.into_iter().flatten())
            .map(|(chunk, vector)| IndexEntry { chunk, vector })
            .collect();
        if let Some(bad) = entries.iter().find(|e| e.vector.len() != dim) {
            return Err(Error::Embedding(CapabilityError::InvalidResponse(format!(
                "dimension mismatch: got {} expected {}",
                bad.vector.len(),
                dim
            ))));
        }
        tracing::info!(entries = entries.len(), dim, embedder = embedder.id(), "index built");
        Ok(Self { entries, embedder_id: embedder.id().to_string(), dim, retry })
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
    pub fn dim(&self) -> usize { self.dim }
    pub fn embedder_id(&self) -> &str { &self.embedder_id }
    pub fn entries(&self) -> &[IndexEntry] { &self.entries }

    /// Embeds `question` and returns the `top_k` most similar chunks by cosine.
    pub async fn query(&self, question: &str, embedder: &dyn Embedder, top_k: usize) -> Result<RetrievalResult> {
        self.query_with_metric(question, embedder, top_k, Metric::Cosine).await
    }

    pub async fn query_with_metric(
        &self,
        question: &str,
        embedder: &dyn Embedder,
        top_k: usize,
        metric: Metric,
    ) -> Result<RetrievalResult> {
        if top_k == 0 {
            return Err(Error::config("top_k must be at least 1"));
        }
        if embedder.id() != self.embedder_id {
            return Err(Error::config(format!(
                "index was built with embedder '{}' but queried with '{}'",
                self.embedder_id,
                embedder.id()
            )));
        }
        let query_vec = call_with_retry("embed_query", &self.retry, || embedder.embed(question))
            .await
            .map_err(Error::Embedding)?;
        if query_vec.len() != self.dim {
            return Err(Error::Embedding(CapabilityError::InvalidResponse(format!(
                "query dimension {} does not match index dimension {}",
                query_vec.len(),
                self.dim
            ))));
        }
        Ok(self.search_vec(&query_vec, top_k, metric))
    }

    /// Ranks every entry against `query_vec`. Ties keep chunk order.
    pub fn search_vec(&self, query_vec: &[f32], top_k: usize, metric: Metric) -> RetrievalResult {
        let mut scored: Vec<(usize, f64)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, metric.score(query_vec, &e.vector)))
            .collect();
        // sort_by is stable, so equal scores stay in insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);
        RetrievalResult {
            hits: scored
                .into_iter()
                .map(|(i, score)| ScoredChunk { chunk: self.entries[i].chunk.clone(), score })
                .collect(),
        }
    }
}
