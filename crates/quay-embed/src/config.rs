use serde::Deserialize;

pub const DEFAULT_MODEL: &str = "bge-small-zh-v1.5";
pub const DEFAULT_BATCH_SIZE: usize = 32;
/// Output width of the BGE small zh model.
pub const DEFAULT_DIMENSIONS: usize = 512;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Remote embedding service settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub api_key: String,
    /// Service root; `/v1/embeddings` is appended.
    pub base_url: String,
    pub model: String,
    /// Texts per request. 0 falls back to the default.
    pub batch_size: usize,
    pub dimensions: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: String::new(),
            model: DEFAULT_MODEL.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            dimensions: DEFAULT_DIMENSIONS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl EmbeddingConfig {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}
