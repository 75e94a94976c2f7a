//! pdfqa-vector
//!
//! Embedding-backed retrieval: build an in-memory index from chunks, rank it
//! against a question, and optionally reuse built indexes across queries.

pub mod cache;
pub mod index;
pub mod similarity;

pub use cache::{corpus_fingerprint, CacheKey, IndexCache};
pub use index::{BuildOptions, IndexEntry, VectorIndex};
pub use similarity::{cosine_similarity, euclidean_distance, Metric};
