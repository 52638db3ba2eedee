//! Embedding generation for semantic search.
//!
//! Supports API-backed embedding providers, with a hashed-token fallback
//! when no API key is available. The fallback is lexical rather than
//! semantic, but deterministic and good enough for offline use and tests.

use std::hash::Hasher;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use twox_hash::XxHash64;

use crate::error::{MemoryError, Result};

/// Environment variable for OpenAI API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable for OpenRouter API key (fallback).
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Default embedding model.
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Dimension of [`DEFAULT_MODEL`] vectors.
pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

/// Dimension used by the hashed-token fallback.
pub const HASHED_EMBEDDING_DIM: usize = 384;

/// Seed of the token hash behind [`hashed_token_embedding`].
const TOKEN_HASH_SEED: u64 = 0;

/// Per-request timeout for embedding calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const OPENAI_API_URL: &str = "https://api.openai.com/v1/embeddings";
const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/embeddings";

/// Maps text to fixed-length vectors.
///
/// Every corpus in one index must be embedded by the same model, otherwise
/// distances between query and documents are meaningless.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Length of every produced vector.
    fn dimension(&self) -> usize;

    /// Identifier of the underlying model.
    fn model_id(&self) -> String;
}

/// Embedding provider configuration.
#[derive(Debug, Clone)]
pub enum EmbeddingProvider {
    /// Use OpenAI API directly.
    OpenAI { api_key: String, model: String },
    /// Use OpenRouter API.
    OpenRouter { api_key: String, model: String },
    /// Hashed bag-of-words vectors, computed locally.
    HashedTokens { dimension: usize },
}

impl EmbeddingProvider {
    /// Create provider from environment variables.
    ///
    /// Priority:
    /// 1. OPENAI_API_KEY -> OpenAI
    /// 2. OPENROUTER_API_KEY -> OpenRouter
    /// 3. None -> HashedTokens fallback
    pub fn from_env() -> Self {
        if let Ok(api_key) = std::env::var(OPENAI_API_KEY_ENV) {
            debug!("Using OpenAI embedding provider");
            return Self::OpenAI {
                api_key,
                model: DEFAULT_MODEL.to_string(),
            };
        }

        if let Ok(api_key) = std::env::var(OPENROUTER_API_KEY_ENV) {
            debug!("Using OpenRouter embedding provider");
            return Self::OpenRouter {
                api_key,
                model: format!("openai/{}", DEFAULT_MODEL),
            };
        }

        warn!("No embedding API key found, using hashed-token embeddings");
        Self::HashedTokens {
            dimension: HASHED_EMBEDDING_DIM,
        }
    }

    /// Check if this provider calls a remote model.
    pub fn is_remote(&self) -> bool {
        !matches!(self, Self::HashedTokens { .. })
    }

    /// Get the embedding dimension for this provider.
    pub fn dimension(&self) -> usize {
        match self {
            Self::OpenAI { .. } | Self::OpenRouter { .. } => DEFAULT_EMBEDDING_DIM,
            Self::HashedTokens { dimension } => *dimension,
        }
    }

    fn model_id(&self) -> String {
        match self {
            Self::OpenAI { model, .. } | Self::OpenRouter { model, .. } => model.clone(),
            Self::HashedTokens { dimension } => format!("hashed-tokens-{}", dimension),
        }
    }
}

/// Generate embeddings through the configured provider.
#[derive(Clone)]
pub struct EmbeddingGenerator {
    provider: EmbeddingProvider,
    client: reqwest::Client,
}

impl EmbeddingGenerator {
    /// Create a new embedding generator with the given provider.
    pub fn new(provider: EmbeddingProvider) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { provider, client }
    }

    /// Create a generator from environment variables.
    pub fn from_env() -> Self {
        Self::new(EmbeddingProvider::from_env())
    }

    /// Create a local hashed-token generator.
    pub fn hashed(dimension: usize) -> Self {
        Self::new(EmbeddingProvider::HashedTokens { dimension })
    }

    /// Check if using a remote model.
    pub fn is_remote(&self) -> bool {
        self.provider.is_remote()
    }

    async fn request(
        &self,
        url: &str,
        api_key: &str,
        model: &str,
        input: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({
                "model": model,
                "input": input
            }))
            .send()
            .await
            .map_err(|e| MemoryError::EmbeddingError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(MemoryError::EmbeddingError(format!(
                "embedding API error {}: {}",
                status, text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| MemoryError::EmbeddingError(e.to_string()))
    }

    fn endpoint(&self) -> Option<(&'static str, &str, &str)> {
        match &self.provider {
            EmbeddingProvider::OpenAI { api_key, model } => Some((OPENAI_API_URL, api_key, model)),
            EmbeddingProvider::OpenRouter { api_key, model } => {
                Some((OPENROUTER_API_URL, api_key, model))
            }
            EmbeddingProvider::HashedTokens { .. } => None,
        }
    }
}

#[async_trait]
impl Embedder for EmbeddingGenerator {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match self.endpoint() {
            Some((url, api_key, model)) => {
                let json = self.request(url, api_key, model, text.into()).await?;
                let mut vectors = parse_embedding_response(&json)?;
                if vectors.len() != 1 {
                    return Err(MemoryError::EmbeddingError(format!(
                        "expected 1 embedding, got {}",
                        vectors.len()
                    )));
                }
                Ok(vectors.remove(0))
            }
            None => Ok(hashed_token_embedding(text, self.dimension())),
        }
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        match self.endpoint() {
            Some((url, api_key, model)) => {
                let json = self
                    .request(url, api_key, model, serde_json::json!(texts))
                    .await?;
                let vectors = parse_embedding_response(&json)?;
                if vectors.len() != texts.len() {
                    return Err(MemoryError::EmbeddingError(format!(
                        "expected {} embeddings, got {}",
                        texts.len(),
                        vectors.len()
                    )));
                }
                Ok(vectors)
            }
            None => Ok(texts
                .iter()
                .map(|t| hashed_token_embedding(t, self.dimension()))
                .collect()),
        }
    }

    fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    fn model_id(&self) -> String {
        self.provider.model_id()
    }
}

/// Parse an OpenAI-style embeddings response, ordering by `index`.
fn parse_embedding_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json["data"]
        .as_array()
        .ok_or_else(|| MemoryError::EmbeddingError("Invalid response format".to_string()))?;

    let mut indexed = data
        .iter()
        .enumerate()
        .map(|(pos, item)| {
            let index = item["index"].as_u64().map_or(pos, |i| i as usize);
            let embedding = item["embedding"]
                .as_array()
                .ok_or_else(|| MemoryError::EmbeddingError("Invalid embedding format".to_string()))?
                .iter()
                .map(|v| {
                    v.as_f64().map(|f| f as f32).ok_or_else(|| {
                        MemoryError::EmbeddingError("Invalid embedding value".to_string())
                    })
                })
                .collect::<Result<Vec<f32>>>()?;
            Ok((index, embedding))
        })
        .collect::<Result<Vec<(usize, Vec<f32>)>>>()?;

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, e)| e).collect())
}

/// Hashed bag-of-words embedding.
///
/// Each lowercase alphanumeric token adds 1.0 to the bucket given by
/// [`token_bucket`]; the result is normalized to unit length. Components are
/// never negative, so the cosine distance between two such vectors stays in
/// `[0, 1]`.
pub fn hashed_token_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut embedding = vec![0.0f32; dimension];
    if dimension == 0 {
        return embedding;
    }

    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        embedding[token_bucket(token, dimension)] += 1.0;
    }

    let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for x in &mut embedding {
            *x /= magnitude;
        }
    }

    embedding
}

/// Bucket of a token in a hashed embedding of `dimension` components.
///
/// XXH64 with a fixed seed over the lowercase UTF-8 bytes. Stored vectors
/// depend on this mapping, so it must not change between builds.
pub fn token_bucket(token: &str, dimension: usize) -> usize {
    let mut hasher = XxHash64::with_seed(TOKEN_HASH_SEED);
    hasher.write(token.to_lowercase().as_bytes());
    (hasher.finish() % dimension.max(1) as u64) as usize
}

/// Calculate cosine similarity between two embeddings.
///
/// Returns 0.0 for vectors of different length or zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}
