use crate::error::{Result, VectorIndexError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_DIMENSION: usize = 768;
const HASH_DIMENSION: usize = 384;
const MAX_EMBED_RETRIES: usize = 4;

/// Maps text to fixed-length vectors.
///
/// Implementations must be deterministic for identical input and return
/// vectors of a fixed dimensionality across calls. Vectors are L2-normalized
/// on the way out so cosine similarity reduces to a dot product.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum EmbeddingMode {
    Api,
    Hash,
}

impl EmbeddingMode {
    fn from_env() -> Result<Self> {
        let raw = env::var("DOSSIER_EMBEDDING_MODE")
            .unwrap_or_else(|_| "api".to_string())
            .to_ascii_lowercase();
        match raw.as_str() {
            "api" => Ok(Self::Api),
            "hash" => Ok(Self::Hash),
            other => Err(VectorIndexError::EmbeddingError(format!(
                "Unsupported DOSSIER_EMBEDDING_MODE '{other}' (expected 'api' or 'hash')"
            ))),
        }
    }
}

/// Build the embedding provider selected by the process environment.
///
/// `DOSSIER_EMBEDDING_MODE=hash` selects the deterministic offline backend;
/// the default `api` mode requires `DOSSIER_API_KEY` (or `GEMINI_API_KEY`).
pub fn embedder_from_env() -> Result<Arc<dyn EmbeddingProvider>> {
    match EmbeddingMode::from_env()? {
        EmbeddingMode::Hash => Ok(Arc::new(HashEmbedder::new(HASH_DIMENSION))),
        EmbeddingMode::Api => {
            let api_key = env::var("DOSSIER_API_KEY")
                .or_else(|_| env::var("GEMINI_API_KEY"))
                .map_err(|_| {
                    VectorIndexError::EmbeddingError(
                        "DOSSIER_API_KEY is not set (required for DOSSIER_EMBEDDING_MODE=api)"
                            .to_string(),
                    )
                })?;
            let base_url =
                env::var("DOSSIER_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
            let model = env::var("DOSSIER_EMBEDDING_MODEL")
                .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string());
            Ok(Arc::new(ApiEmbedder::new(
                api_key,
                base_url,
                model,
                DEFAULT_DIMENSION,
            )?))
        }
    }
}

/// Remote embedding client against a Gemini-style `embedContent` endpoint.
pub struct ApiEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    dimension: usize,
}

impl ApiEmbedder {
    pub fn new(api_key: String, base_url: String, model: String, dimension: usize) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(VectorIndexError::EmbeddingError(
                "missing embedding API key".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                VectorIndexError::EmbeddingError(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            dimension,
        })
    }

    async fn request_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!(
            "{}/models/{}:batchEmbedContents?key={}",
            self.base_url, self.model, self.api_key
        );
        let model_path = format!("models/{}", self.model);
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: &model_path,
                    content: Content {
                        parts: vec![Part { text }],
                    },
                })
                .collect(),
        };

        let mut attempt = 0usize;
        loop {
            let response = self.client.post(&url).json(&request).send().await;
            match response {
                Ok(resp) if resp.status().is_success() => {
                    let parsed: BatchEmbedResponse = resp.json().await.map_err(|e| {
                        VectorIndexError::EmbeddingError(format!(
                            "failed to parse embedding response: {e}"
                        ))
                    })?;
                    if parsed.embeddings.len() != texts.len() {
                        return Err(VectorIndexError::EmbeddingError(format!(
                            "provider returned {} embeddings for {} inputs",
                            parsed.embeddings.len(),
                            texts.len()
                        )));
                    }
                    return parsed
                        .embeddings
                        .into_iter()
                        .map(|entry| {
                            let mut vector = entry.values;
                            ensure_dimension(&vector, self.dimension)?;
                            normalize(&mut vector);
                            Ok(vector)
                        })
                        .collect();
                }
                Ok(resp) => {
                    let status = resp.status();
                    let retryable = status.as_u16() == 429 || status.is_server_error();
                    let body = resp.text().await.unwrap_or_default();
                    if retryable && attempt + 1 < MAX_EMBED_RETRIES {
                        attempt += 1;
                        let delay = retry_backoff(attempt);
                        log::warn!("embedding request got {status}, retrying in {delay:?}");
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(VectorIndexError::EmbeddingError(format!(
                        "embedding request failed ({status}): {body}"
                    )));
                }
                Err(err) => {
                    let retryable = err.is_timeout() || err.is_connect() || err.is_request();
                    if retryable && attempt + 1 < MAX_EMBED_RETRIES {
                        attempt += 1;
                        let delay = retry_backoff(attempt);
                        log::warn!("embedding request error '{err}', retrying in {delay:?}");
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(VectorIndexError::EmbeddingError(format!(
                        "embedding request failed: {err}"
                    )));
                }
            }
        }
    }
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}

#[async_trait]
impl EmbeddingProvider for ApiEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| VectorIndexError::EmbeddingError("empty embedding result".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        // The batch endpoint caps request size; 100 is well inside it.
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(100) {
            out.extend(self.request_batch(batch).await?);
        }
        Ok(out)
    }
}

/// Deterministic offline embedding backend.
///
/// Seeds a per-text splitmix64 stream with an FNV-1a hash of the input and
/// emits a normalized pseudo-random unit vector. Identical input always maps
/// to an identical vector, which is all retrieval tests need.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        hash_embed(text, self.dimension)
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(HASH_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(hash_embed(text, self.dimension))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| hash_embed(text, self.dimension))
            .collect())
    }
}

fn hash_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

pub(crate) fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

pub(crate) fn ensure_dimension(vec: &[f32], expected: usize) -> Result<()> {
    if vec.len() != expected {
        return Err(VectorIndexError::InvalidDimension {
            expected,
            actual: vec.len(),
        });
    }
    Ok(())
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}
