//! Adapters for OpenAI-compatible `/embeddings` and `/chat/completions` APIs.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use pdfqa_core::traits::{Embedder, Generator};
use pdfqa_core::CapabilityError;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

/// Body of a `/embeddings` response.
#[derive(Debug, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingData {
    #[serde(default)]
    pub index: usize,
    pub embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Body of a `/chat/completions` response.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

/// Maps a non-success HTTP status to a capability error; 429 is `RateLimited`.
pub fn status_error(status: StatusCode, body: &str) -> Option<CapabilityError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Some(CapabilityError::RateLimited);
    }
    (!status.is_success()).then(|| CapabilityError::Request(format!("HTTP {status}: {body}")))
}

async fn check_status(response: Response) -> Result<Response, CapabilityError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body).unwrap_or_else(|| CapabilityError::Request(format!("HTTP {status}"))))
}

/// Restores request order from `index` and checks the batch size and the
/// dimension of every vector.
pub fn decode_embeddings(mut body: EmbeddingResponse, expected: usize, dim: usize) -> Result<Vec<Vec<f32>>, CapabilityError> {
    body.data.sort_by_key(|d| d.index);
    if body.data.len() != expected {
        return Err(CapabilityError::InvalidResponse(format!(
            "expected {expected} embeddings, got {}",
            body.data.len()
        )));
    }
    if let Some(bad) = body.data.iter().find(|d| d.embedding.len() != dim) {
        return Err(CapabilityError::InvalidResponse(format!(
            "dimension mismatch: got {} expected {dim}",
            bad.embedding.len()
        )));
    }
    Ok(body.data.into_iter().map(|d| d.embedding).collect())
}

/// Text of the first choice.
pub fn decode_completion(body: ChatCompletionResponse) -> Result<String, CapabilityError> {
    body.choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| CapabilityError::InvalidResponse("no choices in completion".to_string()))
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

pub struct OpenAiEmbedder {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dim: usize,
    id: String,
}

impl OpenAiEmbedder {
    /// `dim` is the vector size the model is known to return; it is checked
    /// against every response.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>, dim: usize) -> Self {
        let model = model.into();
        let base_url = base_url.into();
        let id = format!("openai:{model}:d{dim}@{base_url}");
        Self { client: Client::new(), base_url, api_key: api_key.into(), model, dim, id }
    }
}

/// Output size of the well-known OpenAI embedding models.
pub fn known_embedding_dim(model: &str) -> Option<usize> {
    match model {
        "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        _ => None,
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }

    #[tracing::instrument(skip(self, texts), fields(model = %self.model, batch = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "embeddings"))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest { input: texts, model: &self.model })
            .send()
            .await
            .map_err(|e| CapabilityError::Request(e.to_string()))?;
        let body: EmbeddingResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| CapabilityError::InvalidResponse(e.to_string()))?;
        decode_embeddings(body, texts.len(), self.dim)
    }
}

pub struct OpenAiChat {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    id: String,
}

impl OpenAiChat {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>, temperature: f32) -> Self {
        let model = model.into();
        let id = format!("openai-chat:{model}");
        Self { client: Client::new(), base_url: base_url.into(), api_key: api_key.into(), model, temperature, id }
    }
}

#[async_trait]
impl Generator for OpenAiChat {
    fn id(&self) -> &str { &self.id }

    #[tracing::instrument(skip(self, prompt), fields(model = %self.model, prompt_chars = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String, CapabilityError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user".to_string(), content: prompt.to_string() }],
            temperature: self.temperature,
        };
        let response = self
            .client
            .post(endpoint(&self.base_url, "chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CapabilityError::Request(e.to_string()))?;
        let body: ChatCompletionResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| CapabilityError::InvalidResponse(e.to_string()))?;
        decode_completion(body)
    }
}
