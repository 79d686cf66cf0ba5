use std::time::Duration;

use tracing::{debug, warn};

use quay_core::{DenseVector, Embedder, QuayError, QuayResult, SupportStatus};

use crate::config::{EmbeddingConfig, DEFAULT_BATCH_SIZE, DEFAULT_MODEL};
use crate::protocol::{EmbedData, EmbedRequest, EmbedResponse};

const EMBEDDINGS_PATH: &str = "/v1/embeddings";

/// Client for a BGE model served behind an OpenAI-compatible embeddings API.
pub struct BgeEmbedder {
    config: EmbeddingConfig,
    endpoint: String,
    agent: ureq::Agent,
}

impl BgeEmbedder {
    pub fn new(mut config: EmbeddingConfig) -> QuayResult<Self> {
        if config.api_key.is_empty() {
            return Err(QuayError::Config("BGE API key is required".into()));
        }
        if config.base_url.is_empty() {
            return Err(QuayError::Config("BGE base URL is required".into()));
        }
        if config.model.is_empty() {
            config.model = DEFAULT_MODEL.into();
        }
        if config.batch_size == 0 {
            config.batch_size = DEFAULT_BATCH_SIZE;
        }

        let endpoint = format!("{}{EMBEDDINGS_PATH}", config.base_url.trim_end_matches('/'));
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();

        Ok(Self {
            config,
            endpoint,
            agent,
        })
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    fn embed_batch(&self, texts: &[String]) -> QuayResult<Vec<DenseVector>> {
        let request = EmbedRequest {
            input: texts,
            model: &self.config.model,
        };

        let response = match self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json")
            .set("Authorization", &format!("Bearer {}", self.config.api_key))
            .send_json(&request)
        {
            Ok(resp) => resp,
            Err(ureq::Error::Status(status, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                return Err(QuayError::Embedding(format!(
                    "BGE API returned status {status}: {body}"
                )));
            }
            Err(e) => {
                return Err(QuayError::Embedding(format!("failed to send request: {e}")));
            }
        };

        // Only a plain 200 carries a usable body.
        let status = response.status();
        if status != 200 {
            let body = response.into_string().unwrap_or_default();
            return Err(QuayError::Embedding(format!(
                "BGE API returned status {status}: {body}"
            )));
        }

        // `into_string` caps bodies at 10 MB; large batches go past that.
        let parsed: EmbedResponse = serde_json::from_reader(response.into_reader())
            .map_err(|e| QuayError::Embedding(format!("failed to unmarshal response: {e}")))?;
        debug!(
            model = %parsed.model,
            total_tokens = parsed.usage.total_tokens,
            "embedded {} texts",
            texts.len()
        );

        assemble_batch(texts.len(), parsed.data)
    }
}

/// Place each returned vector at its `index`. The service may answer out of
/// order; indices past the batch are dropped and gaps are an error.
pub fn assemble_batch(len: usize, data: Vec<EmbedData>) -> QuayResult<Vec<DenseVector>> {
    let mut slots: Vec<Option<DenseVector>> = vec![None; len];
    for item in data {
        match slots.get_mut(item.index) {
            Some(slot) => *slot = Some(item.embedding),
            None => warn!(index = item.index, len, "ignoring out-of-range embedding index"),
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| {
            slot.ok_or_else(|| {
                QuayError::Embedding(format!("response has no embedding for input {i}"))
            })
        })
        .collect()
}

impl Embedder for BgeEmbedder {
    fn embed_strings(&self, texts: &[String]) -> QuayResult<Vec<DenseVector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(texts.len());
        for (batch, chunk) in texts.chunks(self.config.batch_size).enumerate() {
            let vectors = self.embed_batch(chunk).map_err(|e| QuayError::Batch {
                batch,
                source: Box::new(e),
            })?;
            results.extend(vectors);
        }
        Ok(results)
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn support_status(&self) -> SupportStatus {
        SupportStatus::Dense
    }
}
