//! pdfqa-rag
//!
//! Ties the pieces together: a [`Pipeline`] loads a directory of PDFs, chunks
//! and embeds it, retrieves the passages closest to a question and hands them
//! to a [`Synthesizer`] for the final answer.

pub mod pipeline;
pub mod synthesizer;

pub use pipeline::{Pipeline, PipelineError, PipelineEvent, PipelineStats, QueryResponse, Stage};
pub use synthesizer::{assemble_context, Synthesizer, CONTEXT_SEPARATOR, DEFAULT_PROMPT_TEMPLATE};
