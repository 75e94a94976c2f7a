//! Deterministic offline embedder.
//!
//! Every distinct lowercase alphanumeric token of the input is hashed with
//! xxHash64 into one of `dim` buckets and the result is L2-normalized, so the
//! cosine between two texts grows with the share of words they have in
//! common. Used for tests, demos and offline development.

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use twox_hash::XxHash64;

use pdfqa_core::traits::Embedder;
use pdfqa_core::CapabilityError;

pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self { dim, id: format!("hash:xxh64:d{dim}") }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in tokens(text) {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let idx = usize::try_from(hasher.finish() % self.dim as u64).unwrap_or(0);
            v[idx] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v { *x /= norm; }
        }
        v
    }
}

fn tokens(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
