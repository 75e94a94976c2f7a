//! Query orchestration: Loader → Chunker → Index → Retriever → Synthesizer.
//!
//! Each call to [`Pipeline::run`] walks the stages once, in order, and either
//! reaches `Done` or stops in `Failed` with the stage that failed. Nothing
//! built during a run is reused by the next one unless an [`IndexCache`] is
//! attached.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use pdfqa_core::chunker::{ChunkParams, Chunker};
use pdfqa_core::config::{QueryConfig, RuntimeConfig};
use pdfqa_core::loader::{LoadReport, PdfLoader, PdfPageExtractor};
use pdfqa_core::traits::{Embedder, Generator, PageExtractor};
use pdfqa_core::types::{Chunk, Document, RetrievalResult};
use pdfqa_core::{DocumentParseError, Error, Result};
use pdfqa_vector::{BuildOptions, CacheKey, IndexCache, VectorIndex};

use crate::synthesizer::Synthesizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Idle,
    Loading,
    Chunking,
    Indexing,
    Retrieving,
    Synthesizing,
    Done,
    Failed,
}

impl Stage {
    /// The stage a successful step leads to; `None` for terminal stages.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Idle => Some(Stage::Loading),
            Stage::Loading => Some(Stage::Chunking),
            Stage::Chunking => Some(Stage::Indexing),
            Stage::Indexing => Some(Stage::Retrieving),
            Stage::Retrieving => Some(Stage::Synthesizing),
            Stage::Synthesizing => Some(Stage::Done),
            Stage::Done | Stage::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Loading => "loading",
            Stage::Chunking => "chunking",
            Stage::Indexing => "indexing",
            Stage::Retrieving => "retrieving",
            Stage::Synthesizing => "synthesizing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A query that stopped in `Failed`, with the stage it was in.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{stage} stage failed: {error}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub error: Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Stage(Stage),
    DocumentSkipped(DocumentParseError),
    Finished,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub files_loaded: usize,
    pub files_failed: usize,
    pub documents: usize,
    pub chunks: usize,
    pub index_cached: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    pub answer: String,
    pub retrieval: RetrievalResult,
    pub warnings: Vec<DocumentParseError>,
    pub stats: PipelineStats,
}

/// State of one run. Transitions only move forward or into `Failed`.
struct Run<'a> {
    stage: Stage,
    events: Option<&'a UnboundedSender<PipelineEvent>>,
}

impl<'a> Run<'a> {
    fn new(events: Option<&'a UnboundedSender<PipelineEvent>>) -> Self {
        Self { stage: Stage::Idle, events }
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = self.events {
            // A dropped receiver only means nobody is watching.
            let _ = tx.send(event);
        }
    }

    fn advance(&mut self) {
        if let Some(next) = self.stage.next() {
            self.stage = next;
            tracing::debug!(stage = %next, "entering stage");
            self.emit(PipelineEvent::Stage(next));
        }
    }

    fn fail(&mut self, error: Error) -> PipelineError {
        let stage = self.stage;
        tracing::error!(%stage, %error, "query failed");
        self.stage = Stage::Failed;
        self.emit(PipelineEvent::Stage(Stage::Failed));
        PipelineError { stage, error }
    }
}

pub struct Pipeline {
    embedder: Arc<dyn Embedder>,
    synthesizer: Synthesizer,
    extractor: Arc<dyn PageExtractor>,
    runtime: RuntimeConfig,
    cache: Option<Arc<IndexCache>>,
    events: Option<UnboundedSender<PipelineEvent>>,
}

impl Pipeline {
    pub fn new(embedder: Arc<dyn Embedder>, generator: Arc<dyn Generator>) -> Self {
        let runtime = RuntimeConfig::default();
        Self {
            embedder,
            synthesizer: Synthesizer::new(generator, runtime.max_context_chars, runtime.retry),
            extractor: Arc::new(PdfPageExtractor),
            runtime,
            cache: None,
            events: None,
        }
    }

    /// Applies tuning; `cache_indexes = true` attaches a fresh cache.
    pub fn with_runtime(mut self, runtime: RuntimeConfig) -> Self {
        self.synthesizer = self.synthesizer.with_limits(runtime.max_context_chars, runtime.retry);
        if runtime.cache_indexes && self.cache.is_none() {
            self.cache = Some(Arc::new(IndexCache::new()));
        }
        self.runtime = runtime;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn PageExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_cache(mut self, cache: Arc<IndexCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Result<Self> {
        self.synthesizer = self.synthesizer.with_template(template)?;
        Ok(self)
    }

    /// Stage transitions and skipped documents are sent to `events`.
    pub fn with_events(mut self, events: UnboundedSender<PipelineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn runtime(&self) -> &RuntimeConfig { &self.runtime }

    /// Synchronous entry point for front-ends. Called from inside a tokio
    /// runtime it fails in `Idle`; async callers use [`Pipeline::run`].
    pub fn answer_question(
        &self,
        directory: impl AsRef<Path>,
        question: &str,
        config: &QueryConfig,
    ) -> std::result::Result<QueryResponse, PipelineError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(PipelineError {
                stage: Stage::Idle,
                error: Error::config("answer_question cannot block inside an async runtime; await Pipeline::run instead"),
            });
        }
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| PipelineError { stage: Stage::Idle, error: Error::config(format!("failed to start runtime: {e}")) })?;
        rt.block_on(self.run(directory.as_ref(), question, config))
    }

    #[tracing::instrument(skip(self, directory, question, config), fields(dir = %directory.display(), top_k = config.top_k))]
    pub async fn run(
        &self,
        directory: &Path,
        question: &str,
        config: &QueryConfig,
    ) -> std::result::Result<QueryResponse, PipelineError> {
        let mut run = Run::new(self.events.as_ref());

        let params = self.validate(question, config).map_err(|e| run.fail(e))?;

        run.advance();
        let report = self.load(directory).await.map_err(|e| run.fail(e))?;
        for failure in &report.failures {
            run.emit(PipelineEvent::DocumentSkipped(failure.clone()));
        }
        if report.documents.is_empty() {
            let msg = format!(
                "no extractable text under {} ({} files read, {} unreadable)",
                directory.display(),
                report.files_loaded,
                report.failures.len()
            );
            return Err(run.fail(Error::ingest(msg)));
        }

        run.advance();
        let chunks = Chunker::new(params).split_all(&report.documents);
        if chunks.is_empty() {
            return Err(run.fail(Error::ingest("documents produced no chunks")));
        }
        let mut stats = PipelineStats {
            files_loaded: report.files_loaded,
            files_failed: report.failures.len(),
            documents: report.documents.len(),
            chunks: chunks.len(),
            index_cached: false,
        };
        tracing::info!(documents = stats.documents, chunks = stats.chunks, "documents chunked");

        run.advance();
        let (index, cached) = self.index(&report.documents, params, chunks).await.map_err(|e| run.fail(e))?;
        stats.index_cached = cached;

        run.advance();
        let retrieval = index
            .query(question, self.embedder.as_ref(), config.top_k)
            .await
            .map_err(|e| run.fail(e))?;
        tracing::info!(hits = retrieval.len(), "context retrieved");

        run.advance();
        let answer = self.synthesizer.answer(question, &retrieval.hits).await.map_err(|e| run.fail(e))?;

        run.advance();
        run.emit(PipelineEvent::Finished);
        Ok(QueryResponse { answer, retrieval, warnings: report.failures, stats })
    }

    fn validate(&self, question: &str, config: &QueryConfig) -> Result<ChunkParams> {
        let params = config.validate()?;
        self.runtime.validate()?;
        if question.trim().is_empty() {
            return Err(Error::config("question must not be empty"));
        }
        Ok(params)
    }

    /// Extracts files on the blocking pool, several at a time, keeping
    /// discovery order in the report.
    async fn load(&self, directory: &Path) -> Result<LoadReport> {
        let loader = Arc::new(PdfLoader::new(directory, Arc::clone(&self.extractor)));
        let files = loader.discover()?;
        let outcomes: Vec<std::result::Result<Vec<Document>, DocumentParseError>> = futures::stream::iter(files)
            .map(|path| {
                let loader = Arc::clone(&loader);
                async move {
                    let task_path = path.clone();
                    tokio::task::spawn_blocking(move || loader.load_file(&task_path))
                        .await
                        .unwrap_or_else(|e| Err(DocumentParseError::new(path, format!("extraction task failed: {e}"))))
                }
            })
            .buffered(self.runtime.load_concurrency.max(1))
            .collect()
            .await;

        let mut report = LoadReport::default();
        for outcome in outcomes {
            report.record(outcome);
        }
        report.log_summary();
        Ok(report)
    }

    async fn index(&self, documents: &[Document], params: ChunkParams, chunks: Vec<Chunk>) -> Result<(Arc<VectorIndex>, bool)> {
        let options = BuildOptions::from(&self.runtime);
        let Some(cache) = &self.cache else {
            let index = VectorIndex::build(chunks, self.embedder.as_ref(), &options).await?;
            return Ok((Arc::new(index), false));
        };
        let key = CacheKey::new(documents, params, self.embedder.id());
        if let Some(hit) = cache.get(&key) {
            tracing::info!(entries = hit.len(), "reusing cached index");
            return Ok((hit, true));
        }
        let index = Arc::new(VectorIndex::build(chunks, self.embedder.as_ref(), &options).await?);
        cache.insert(key, Arc::clone(&index));
        Ok((index, false))
    }
}
