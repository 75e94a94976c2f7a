use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

use pdfqa_core::chunker::Chunker;
use pdfqa_core::config::{resolve_with_base, Config, QueryConfig, Settings};
use pdfqa_core::loader::PdfLoader;
use pdfqa_providers::{embedder_from_config, generator_from_config};
use pdfqa_rag::{Pipeline, PipelineEvent, QueryResponse, Stage};

#[derive(Parser)]
#[command(name = "pdfqa", about = "Ask questions about a folder of PDFs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a question from the PDFs in a directory or a set of files
    Ask(AskArgs),
    /// Load and chunk a directory without calling any provider
    Chunks(ChunksArgs),
}

#[derive(Args)]
struct AskArgs {
    /// Directory searched recursively for PDFs (defaults to `corpus_dir` from config)
    #[arg(long, conflicts_with = "file")]
    dir: Option<PathBuf>,
    /// Individual PDF files; may be repeated
    #[arg(long)]
    file: Vec<PathBuf>,
    #[arg(long, short)]
    question: String,
    #[arg(long)]
    chunk_size: Option<usize>,
    #[arg(long)]
    chunk_overlap: Option<usize>,
    #[arg(long)]
    top_k: Option<usize>,
    /// Print the retrieved passages under the answer
    #[arg(long)]
    sources: bool,
    /// Print the whole response as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ChunksArgs {
    #[arg(long)]
    dir: Option<PathBuf>,
    #[arg(long)]
    chunk_size: Option<usize>,
    #[arg(long)]
    chunk_overlap: Option<usize>,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;

    match cli.command {
        Command::Ask(args) => ask(&settings, args).await,
        Command::Chunks(args) => chunks(&settings, &args),
    }
}

fn query_config(settings: &Settings, chunk_size: Option<usize>, chunk_overlap: Option<usize>, top_k: Option<usize>) -> QueryConfig {
    QueryConfig {
        chunk_size: chunk_size.unwrap_or(settings.query.chunk_size),
        chunk_overlap: chunk_overlap.unwrap_or(settings.query.chunk_overlap),
        top_k: top_k.unwrap_or(settings.query.top_k),
    }
}

fn corpus_dir(settings: &Settings, dir: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(dir) = dir {
        return Ok(dir);
    }
    match &settings.corpus_dir {
        Some(configured) => Ok(resolve_with_base(&std::env::current_dir()?, configured)),
        None => bail!("no corpus given; pass --dir or set corpus_dir in config.toml"),
    }
}

/// Copies the given files into a fresh temporary directory.
fn stage_files(files: &[PathBuf]) -> anyhow::Result<tempfile::TempDir> {
    let staging = tempfile::Builder::new().prefix("pdfqa-").tempdir()?;
    for (i, file) in files.iter().enumerate() {
        let name = file
            .file_name()
            .with_context(|| format!("{} is not a file path", file.display()))?;
        // Prefix keeps two uploads with the same name apart and preserves argument order.
        let target = staging.path().join(format!("{i:03}-{}", name.to_string_lossy()));
        std::fs::copy(file, &target).with_context(|| format!("failed to stage {}", file.display()))?;
    }
    tracing::debug!(files = files.len(), dir = %staging.path().display(), "staged input files");
    Ok(staging)
}

fn spinner(hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

async fn follow_progress(pb: ProgressBar, mut events: UnboundedReceiver<PipelineEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            PipelineEvent::Stage(Stage::Failed) => pb.abandon_with_message("❌ Failed"),
            PipelineEvent::Stage(stage) => pb.set_message(format!("{stage}…")),
            PipelineEvent::DocumentSkipped(e) => pb.println(format!("⚠️  Skipped {}: {}", e.path.display(), e.reason)),
            PipelineEvent::Finished => pb.finish_and_clear(),
        }
    }
}

async fn ask(settings: &Settings, args: AskArgs) -> anyhow::Result<()> {
    let query = query_config(settings, args.chunk_size, args.chunk_overlap, args.top_k);
    let staged = if args.file.is_empty() { None } else { Some(stage_files(&args.file)?) };
    let dir = match &staged {
        Some(staging) => staging.path().to_path_buf(),
        None => corpus_dir(settings, args.dir)?,
    };

    let embedder = embedder_from_config(&settings.provider)?;
    let generator = generator_from_config(&settings.provider)?;
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let pipeline = Pipeline::new(embedder, generator).with_runtime(settings.runtime).with_events(tx);

    let progress = tokio::spawn(follow_progress(spinner(args.json), rx));
    let outcome = pipeline.run(&dir, &args.question, &query).await;
    // Dropping the pipeline closes the channel so the progress task ends.
    drop(pipeline);
    let _ = progress.await;
    let response = outcome?;

    if args.json {
        print_json(&response)?;
    } else {
        print_answer(&response, args.sources, staged.as_ref().map(|s| s.path()));
    }
    Ok(())
}

fn display_source(source: &str, staging: Option<&Path>) -> String {
    match staging.and_then(|root| Path::new(source).strip_prefix(root).ok()) {
        Some(rel) => rel.display().to_string(),
        None => source.to_string(),
    }
}

fn print_answer(response: &QueryResponse, show_sources: bool, staging: Option<&Path>) {
    println!("\n💬 {}", response.answer);
    for warning in &response.warnings {
        println!("⚠️  Skipped {}: {}", display_source(&warning.path.to_string_lossy(), staging), warning.reason);
    }
    if show_sources {
        println!("\n📚 Sources ({} passages)", response.retrieval.len());
        for (i, hit) in response.retrieval.hits.iter().enumerate() {
            let chunk = &hit.chunk;
            let page = chunk.page.map_or_else(|| "-".to_string(), |p| (p + 1).to_string());
            println!(
                "\n  {}. score={:.4}  {}  page={}  offset={}",
                i + 1,
                hit.score,
                display_source(&chunk.source, staging),
                page,
                chunk.offset
            );
            println!("     📝 {}", chunk.text.replace('\n', " "));
        }
    }
    let stats = &response.stats;
    println!(
        "\n📊 {} files, {} pages, {} chunks{}",
        stats.files_loaded,
        stats.documents,
        stats.chunks,
        if stats.index_cached { " (cached index)" } else { "" }
    );
}

fn print_json(response: &QueryResponse) -> anyhow::Result<()> {
    let warnings: Vec<_> = response
        .warnings
        .iter()
        .map(|w| serde_json::json!({ "path": w.path.to_string_lossy(), "reason": w.reason }))
        .collect();
    let body = serde_json::json!({
        "answer": response.answer,
        "sources": response.retrieval.hits,
        "warnings": warnings,
        "stats": response.stats,
    });
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

fn chunks(settings: &Settings, args: &ChunksArgs) -> anyhow::Result<()> {
    let query = query_config(settings, args.chunk_size, args.chunk_overlap, None);
    let params = query.validate()?;
    let dir = corpus_dir(settings, args.dir.clone())?;
    println!("📂 {} (chunk_size={}, chunk_overlap={})", dir.display(), params.chunk_size(), params.chunk_overlap());

    let report = PdfLoader::pdf(&dir).load()?;
    let chunker = Chunker::new(params);
    let mut per_file: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for doc in &report.documents {
        let entry = per_file.entry(doc.source.as_str()).or_default();
        entry.0 += 1;
        entry.1 += chunker.split(doc).len();
    }
    for (source, (pages, chunks)) in &per_file {
        println!("  {source}: {pages} pages, {chunks} chunks");
    }
    for failure in &report.failures {
        println!("  ⚠️  {}: {}", failure.path.display(), failure.reason);
    }
    let total: usize = per_file.values().map(|(_, c)| c).sum();
    println!("\n✅ {} files, {} chunks ({} skipped)", report.files_loaded, total, report.failures.len());
    Ok(())
}
