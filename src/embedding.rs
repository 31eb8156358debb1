//! Embedding provider capability trait and adapters.

use rayon::prelude::*;

use crate::error::EmbeddingError;

/// Narrow capability for turning text into fixed-dimension vectors,
/// analogous to the `EmbeddingModel` protocol the semantic stage depends on
/// upstream of this crate.
pub trait EmbeddingProvider: Send + Sync {
    /// Encode `texts` into one vector per input, in order. When `normalize`
    /// is true each output vector has unit L2 norm.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying model/service fails or returns a
    /// mismatched number of vectors.
    fn encode(
        &self,
        texts: &[String],
        batch_size: usize,
        normalize: bool,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

fn normalize_vec(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// A deterministic, in-process provider for tests and fixtures. Any segment
/// containing one of the configured marker substrings maps to a fixed unit
/// vector; everything else maps to the zero vector. Mirrors the `FakeModel`
/// test double the job-description-extraction behavior was validated
/// against upstream of this crate.
#[derive(Debug, Clone, Default)]
pub struct FakeEmbeddingProvider {
    pub markers: Vec<String>,
    pub dim: usize,
}

impl FakeEmbeddingProvider {
    pub fn new(markers: Vec<String>, dim: usize) -> Self {
        Self { markers, dim }
    }

    fn encode_one(&self, text: &str) -> Vec<f32> {
        let dim = self.dim.max(1);
        let mut v = vec![0.0; dim];
        if self.markers.iter().any(|m| text.contains(m.as_str())) {
            v[0] = 1.0;
        }
        v
    }
}

impl EmbeddingProvider for FakeEmbeddingProvider {
    fn encode(
        &self,
        texts: &[String],
        batch_size: usize,
        normalize: bool,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let batch_size = batch_size.max(1);
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(batch_size) {
            let mut encoded: Vec<Vec<f32>> = chunk.par_iter().map(|t| self.encode_one(t)).collect();
            if normalize {
                for v in &mut encoded {
                    normalize_vec(v);
                }
            }
            out.extend(encoded);
        }
        Ok(out)
    }
}

/// HTTP-backed adapter for a real model-serving endpoint, built against a
/// blocking `reqwest` client with explicit timeouts — the same construction
/// shape used for this crate's other outbound HTTP collaborator calls.
pub struct HttpEmbeddingProvider {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: Option<String>,
    device: Option<String>,
}

#[derive(serde::Serialize)]
struct EncodeRequest<'a> {
    texts: &'a [String],
    normalize: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: &'a Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device: &'a Option<String>,
}

#[derive(serde::Deserialize)]
struct EncodeResponse {
    embeddings: Vec<Vec<f32>>,
}

impl HttpEmbeddingProvider {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, EmbeddingError> {
        Self::with_model(endpoint, timeout_secs, None, None)
    }

    /// Like [`HttpEmbeddingProvider::new`], additionally selecting which
    /// model and device the serving endpoint should use for this provider's
    /// requests (the `SEMANTIC_MODEL`/`SEMANTIC_DEVICE` overrides).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_model(
        endpoint: impl Into<String>,
        timeout_secs: u64,
        model: Option<String>,
        device: Option<String>,
    ) -> Result<Self, EmbeddingError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .connect_timeout(std::time::Duration::from_secs(timeout_secs.min(10)))
            .build()
            .map_err(|e| EmbeddingError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model,
            device,
        })
    }
}

impl EmbeddingProvider for HttpEmbeddingProvider {
    fn encode(
        &self,
        texts: &[String],
        batch_size: usize,
        normalize: bool,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let batch_size = batch_size.max(1);
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(batch_size) {
            let response = self
                .client
                .post(&self.endpoint)
                .json(&EncodeRequest {
                    texts: chunk,
                    normalize,
                    model: &self.model,
                    device: &self.device,
                })
                .send()
                .map_err(|e| EmbeddingError::Request(e.to_string()))?;
            let parsed: EncodeResponse = response
                .json()
                .map_err(|e| EmbeddingError::Request(e.to_string()))?;
            if parsed.embeddings.len() != chunk.len() {
                return Err(EmbeddingError::ShapeMismatch {
                    expected: chunk.len(),
                    got: parsed.embeddings.len(),
                });
            }
            out.extend(parsed.embeddings);
        }
        Ok(out)
    }
}
