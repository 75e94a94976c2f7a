//! Prompt assembly and answer generation.

use std::sync::Arc;

use pdfqa_core::retry::{call_with_retry, RetryPolicy};
use pdfqa_core::traits::Generator;
use pdfqa_core::types::ScoredChunk;
use pdfqa_core::{CapabilityError, Error, Result};

/// "Stuff" question-answering prompt: every retrieved passage goes into one prompt.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n\
{context}\n\n\
Question: {question}\n\
Helpful Answer:";

pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Joins chunk texts in ranked order and cuts the result at `max_chars` characters.
pub fn assemble_context(hits: &[ScoredChunk], max_chars: usize) -> String {
    let joined = hits.iter().map(|h| h.chunk.text.as_str()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR);
    match joined.char_indices().nth(max_chars) {
        Some((cut, _)) => joined[..cut].to_string(),
        None => joined,
    }
}

pub struct Synthesizer {
    generator: Arc<dyn Generator>,
    template: String,
    max_context_chars: usize,
    retry: RetryPolicy,
}

impl Synthesizer {
    pub fn new(generator: Arc<dyn Generator>, max_context_chars: usize, retry: RetryPolicy) -> Self {
        Self { generator, template: DEFAULT_PROMPT_TEMPLATE.to_string(), max_context_chars, retry }
    }

    /// Replaces the prompt template; it must contain `{context}` and `{question}`.
    pub fn with_template(mut self, template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        for placeholder in ["{context}", "{question}"] {
            if !template.contains(placeholder) {
                return Err(Error::config(format!("prompt template is missing {placeholder}")));
            }
        }
        self.template = template;
        Ok(self)
    }

    /// Same generator and template with new context and retry limits.
    pub fn with_limits(self, max_context_chars: usize, retry: RetryPolicy) -> Self {
        Self { max_context_chars, retry, ..self }
    }

    pub fn generator_id(&self) -> &str { self.generator.id() }

    pub fn build_prompt(&self, question: &str, hits: &[ScoredChunk]) -> String {
        let context = assemble_context(hits, self.max_context_chars);
        // Placeholders are substituted in the template text only, never inside inserted passages.
        match self.template.split_once("{context}") {
            Some((head, tail)) => format!(
                "{}{}{}",
                head.replace("{question}", question),
                context,
                tail.replace("{question}", question)
            ),
            None => self.template.replace("{question}", question),
        }
    }

    pub async fn answer(&self, question: &str, hits: &[ScoredChunk]) -> Result<String> {
        let prompt = self.build_prompt(question, hits);
        tracing::debug!(prompt_chars = prompt.chars().count(), passages = hits.len(), "prompt assembled");
        let (generator, prompt) = (&self.generator, prompt.as_str());
        let answer = call_with_retry("generate", &self.retry, || async move {
            let text = generator.generate(prompt).await?;
            if text.trim().is_empty() {
                return Err(CapabilityError::InvalidResponse("empty completion".to_string()));
            }
            Ok(text)
        })
        .await
        .map_err(Error::Synthesis)?;
        Ok(answer.trim().to_string())
    }
}
