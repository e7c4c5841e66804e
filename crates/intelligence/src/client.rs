//! HTTP embedder client.
//!
//! Talks to an Ollama-compatible endpoint:
//!
//! ```text
//! POST {base}/api/embeddings  {"model": "...", "prompt": "..."}
//! → {"embedding": [f32, ...]}
//! ```

use std::time::Duration;
use tracing::debug;

/// Errors from the embedding endpoint.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    /// The collaborator is configured off.
    #[error("embedding support is disabled")]
    Disabled,

    /// Request could not be sent or the endpoint is unreachable.
    #[error("network error: {0}")]
    Network(String),

    /// The endpoint answered with something other than an embedding.
    #[error("parse error: {0}")]
    Parse(String),

    /// Text rejected before any request was made.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Longest text accepted for embedding.
const MAX_EMBED_LEN: usize = 10_000;

/// Client for the embedding endpoint. Cheap to clone-by-handle via the
/// owning [`crate::EmbeddingStore`]; holds the ureq agent and model
/// settings.
pub struct EmbeddingClient {
    enabled: bool,
    base_url: String,
    model: String,
    agent: ureq::Agent,
}

impl EmbeddingClient {
    pub fn new(enabled: bool, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(30)))
            .build();
        EmbeddingClient {
            enabled,
            base_url: base_url.into(),
            model: model.into(),
            agent: ureq::Agent::new_with_config(config),
        }
    }

    /// A permanently-disabled client (embedding support off).
    pub fn disabled() -> Self {
        EmbeddingClient::new(false, "", "")
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Embed one text. Validates locally, then round-trips the endpoint.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if !self.enabled {
            return Err(EmbeddingError::Disabled);
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(EmbeddingError::InvalidInput("empty text".to_string()));
        }
        if trimmed.len() > MAX_EMBED_LEN {
            return Err(EmbeddingError::InvalidInput(format!(
                "text too long: {} characters",
                trimmed.len()
            )));
        }

        let url = format!("{}/api/embeddings", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "prompt": trimmed,
        });
        let body_bytes = serde_json::to_vec(&body)
            .map_err(|e| EmbeddingError::Parse(format!("failed to serialize request: {}", e)))?;

        debug!(target: "grove::embed", model = %self.model, chars = trimmed.len(), "requesting embedding");

        let mut response = self
            .agent
            .post(&url)
            .header("Content-Type", "application/json")
            .send(&body_bytes[..])
            .map_err(|e| EmbeddingError::Network(e.to_string()))?;

        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| EmbeddingError::Network(format!("failed to read response: {}", e)))?;

        let json: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| EmbeddingError::Parse(format!("invalid JSON response: {}", e)))?;

        let embedding = json
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| {
                EmbeddingError::Parse("response is missing the embedding field".to_string())
            })?;

        embedding
            .iter()
            .map(|v| {
                v.as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| EmbeddingError::Parse("non-numeric embedding element".to_string()))
            })
            .collect()
    }
}

/// Cosine similarity of two vectors; 0.0 for mismatched or zero-norm
/// inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
