use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuayError {
    #[error("config error: {0}")]
    Config(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("failed to embed batch {batch}: {source}")]
    Batch {
        batch: usize,
        #[source]
        source: Box<QuayError>,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("missing request context: {0}")]
    MissingContext(&'static str),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type QuayResult<T> = Result<T, QuayError>;
