//! pdfqa-providers
//!
//! Concrete adapters for the `Embedder` and `Generator` capabilities and the
//! factories that pick one from configuration.

use std::sync::Arc;

use pdfqa_core::config::{current_env, is_production, EmbedderKind, ProviderConfig};
use pdfqa_core::traits::{Embedder, Generator};
use pdfqa_core::{Error, Result};

pub mod hash;
pub mod openai;

pub use hash::HashEmbedder;
pub use openai::{OpenAiChat, OpenAiEmbedder};

/// `APP_USE_FAKE_EMBEDDINGS=1` forces the hash embedder regardless of config.
pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// API key from config, falling back to `OPENAI_API_KEY` and then `OPENAI`.
pub fn resolve_api_key(config: &ProviderConfig) -> Result<String> {
    config
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .or_else(|| std::env::var("OPENAI").ok())
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| Error::config("OpenAI API key is missing; set provider.api_key or OPENAI_API_KEY"))
}

pub fn embedder_from_config(config: &ProviderConfig) -> Result<Arc<dyn Embedder>> {
    embedder_for_env(config, &current_env(), use_fake_embeddings())
}

/// Builds the embedder for `env`; the hash embedder is refused in production,
/// whether it comes from config or from `force_hash`.
pub fn embedder_for_env(config: &ProviderConfig, env: &str, force_hash: bool) -> Result<Arc<dyn Embedder>> {
    if force_hash || config.embedder == EmbedderKind::Hash {
        if is_production(env) {
            return Err(Error::config("the hash embedder is for development only; unset APP_USE_FAKE_EMBEDDINGS and use provider.embedder = \"openai\""));
        }
        tracing::info!(dim = config.hash_dim, "using hash embedder");
        return Ok(Arc::new(HashEmbedder::new(config.hash_dim)));
    }
    let dim = openai::known_embedding_dim(&config.embedding_model).ok_or_else(|| {
        Error::config(format!("unknown embedding model '{}'", config.embedding_model))
    })?;
    let key = resolve_api_key(config)?;
    Ok(Arc::new(OpenAiEmbedder::new(&config.base_url, key, &config.embedding_model, dim)))
}

pub fn generator_from_config(config: &ProviderConfig) -> Result<Arc<dyn Generator>> {
    let key = resolve_api_key(config)?;
    Ok(Arc::new(OpenAiChat::new(&config.base_url, key, &config.chat_model, config.temperature)))
}
