//! Directory walking and page-level text extraction.
//!
//! Files are discovered recursively and sorted by path so that every run over
//! the same corpus yields documents in the same order. A file that fails to
//! parse is reported and skipped; it never aborts the load.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{DocumentParseError, Error, Result};
use crate::traits::PageExtractor;
use crate::types::Document;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf"];

/// Page extraction backed by `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfPageExtractor;

impl PageExtractor for PdfPageExtractor {
    fn extract_pages(&self, path: &Path) -> anyhow::Result<Vec<String>> {
        let bytes = std::fs::read(path)?;
        // pdf-extract panics on some malformed inputs instead of erroring.
        match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(&bytes)) {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => Err(anyhow::anyhow!("PDF extraction error: {}", e)),
            Err(_) => Err(anyhow::anyhow!("PDF extractor panicked on malformed input")),
        }
    }
}

/// Everything a completed load produced.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    pub failures: Vec<DocumentParseError>,
    pub files_loaded: usize,
}

impl LoadReport {
    /// Adds the outcome of loading one file, in discovery order.
    pub fn record(&mut self, outcome: std::result::Result<Vec<Document>, DocumentParseError>) {
        match outcome {
            Ok(docs) => {
                self.files_loaded += 1;
                self.documents.extend(docs);
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable document");
                self.failures.push(e);
            }
        }
    }

    pub fn log_summary(&self) {
        tracing::info!(
            files = self.files_loaded,
            pages = self.documents.len(),
            failed = self.failures.len(),
            "documents loaded"
        );
    }
}

pub struct PdfLoader {
    root: PathBuf,
    extractor: Arc<dyn PageExtractor>,
}

impl PdfLoader {
    pub fn new(root: impl Into<PathBuf>, extractor: Arc<dyn PageExtractor>) -> Self {
        Self { root: root.into(), extractor }
    }

    /// Loader using the bundled PDF extractor.
    pub fn pdf(root: impl Into<PathBuf>) -> Self {
        Self::new(root, Arc::new(PdfPageExtractor))
    }

    pub fn root(&self) -> &Path { &self.root }

    /// All supported files under the root, sorted by path.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            return Err(Error::ingest(format!("directory {} does not exist", self.root.display())));
        }
        if !self.root.is_dir() {
            return Err(Error::ingest(format!("{} is not a directory", self.root.display())));
        }
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_supported(e.path()))
            .map(|e| e.into_path())
            .collect();
        if files.is_empty() {
            return Err(Error::ingest(format!("no PDF files found under {}", self.root.display())));
        }
        files.sort();
        tracing::debug!(root = %self.root.display(), files = files.len(), "discovered source files");
        Ok(files)
    }

    /// Extracts one file into one document per non-empty page.
    pub fn load_file(&self, path: &Path) -> std::result::Result<Vec<Document>, DocumentParseError> {
        load_with(self.extractor.as_ref(), path)
    }

    /// Lazily yields documents in canonical order; extraction happens as the
    /// iterator advances.
    pub fn documents(&self) -> Result<Documents> {
        let files = self.discover()?;
        Ok(Documents { extractor: Arc::clone(&self.extractor), files: files.into(), pending: VecDeque::new() })
    }

    pub fn load(&self) -> Result<LoadReport> {
        let files = self.discover()?;
        let mut report = LoadReport::default();
        for path in &files {
            report.record(self.load_file(path));
        }
        report.log_summary();
        Ok(report)
    }
}

/// Iterator returned by [`PdfLoader::documents`].
pub struct Documents {
    extractor: Arc<dyn PageExtractor>,
    files: VecDeque<PathBuf>,
    pending: VecDeque<Document>,
}

impl Iterator for Documents {
    type Item = std::result::Result<Document, DocumentParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(doc) = self.pending.pop_front() {
                return Some(Ok(doc));
            }
            let path = self.files.pop_front()?;
            match load_with(self.extractor.as_ref(), &path) {
                Ok(docs) => self.pending.extend(docs),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

fn load_with(extractor: &dyn PageExtractor, path: &Path) -> std::result::Result<Vec<Document>, DocumentParseError> {
    let pages = extractor.extract_pages(path).map_err(|e| DocumentParseError::new(path, format!("{e:#}")))?;
    let source = path.to_string_lossy().to_string();
    Ok(pages
        .iter()
        .enumerate()
        .filter_map(|(page, raw)| {
            let text = normalize_page_text(raw);
            (!text.is_empty()).then(|| Document::new(text, source.clone(), Some(page)))
        })
        .collect())
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.iter().any(|s| ext.eq_ignore_ascii_case(s)))
}

/// Cleans extractor output: drops NULs, collapses whitespace runs inside a
/// line, keeps at most one blank line between paragraphs and trims the ends.
pub fn normalize_page_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blank_run = false;
    for line in raw.split('\n') {
        let line = line.trim_matches(|c: char| c.is_whitespace() || c == '\0');
        if line.is_empty() {
            blank_run = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run { "\n\n" } else { "\n" });
        }
        blank_run = false;
        let mut prev_space = false;
        for ch in line.chars().filter(|&c| c != '\0') {
            if ch.is_whitespace() {
                if !prev_space {
                    out.push(' ');
                }
                prev_space = true;
            } else {
                out.push(ch);
                prev_space = false;
            }
        }
    }
    out
}
