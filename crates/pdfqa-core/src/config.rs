//! Layered configuration and path helpers.
//!
//! Uses Figment to merge built-in defaults, `config.toml`, `config.<env>.toml`
//! and `APP_*` env vars (nested keys separated by `__`, e.g.
//! `APP_QUERY__TOP_K=6`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::{ChunkParams, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

pub const DEFAULT_TOP_K: usize = 4;

/// Per-query knobs exposed to the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, chunk_overlap: DEFAULT_CHUNK_OVERLAP, top_k: DEFAULT_TOP_K }
    }
}

impl QueryConfig {
    /// Checks every parameter without touching the filesystem or providers.
    pub fn validate(&self) -> Result<ChunkParams> {
        let params = ChunkParams::new(self.chunk_size, self.chunk_overlap)?;
        if self.top_k == 0 {
            return Err(Error::config("top_k must be at least 1"));
        }
        Ok(params)
    }
}

/// Pipeline tuning that front-ends normally leave alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub embed_batch_size: usize,
    pub embed_concurrency: usize,
    pub load_concurrency: usize,
    pub max_context_chars: usize,
    pub cache_indexes: bool,
    pub retry: RetryPolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            embed_batch_size: 64,
            embed_concurrency: 4,
            load_concurrency: 4,
            max_context_chars: 4000,
            cache_indexes: false,
            retry: RetryPolicy::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.embed_batch_size == 0 {
            return Err(Error::config("runtime.embed_batch_size must be at least 1"));
        }
        if self.embed_concurrency == 0 || self.load_concurrency == 0 {
            return Err(Error::config("runtime concurrency limits must be at least 1"));
        }
        if self.max_context_chars == 0 {
            return Err(Error::config("runtime.max_context_chars must be at least 1"));
        }
        if self.retry.timeout_ms == 0 {
            return Err(Error::config("runtime.retry.timeout_ms must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    OpenAi,
    Hash,
}

/// Which capability adapters to construct and how to reach them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub embedder: EmbedderKind,
    pub hash_dim: usize,
    pub api_key: Option<String>,
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub temperature: f32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            embedder: EmbedderKind::OpenAi,
            hash_dim: 1024,
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub corpus_dir: Option<String>,
    pub query: QueryConfig,
    pub runtime: RuntimeConfig,
    pub provider: ProviderConfig,
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = current_env();

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    /// Wraps an already assembled figment, e.g. one built in tests.
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> Result<Settings> {
        self.figment.extract().map_err(|e| Error::config(e.to_string()))
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        let settings = self.settings()?;
        settings.runtime.validate()?;
        if is_production(env) && settings.provider.embedder == EmbedderKind::Hash {
            anyhow::bail!("the hash embedder is for development only; set provider.embedder = \"openai\"");
        }
        Ok(())
    }
}

/// `RUST_ENV` value, `dev` when unset.
pub fn current_env() -> String {
    env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string())
}

pub fn is_production(env: &str) -> bool {
    matches!(env, "prod" | "production")
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
