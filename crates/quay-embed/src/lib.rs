pub mod bge;
pub mod config;
pub mod protocol;

pub use bge::BgeEmbedder;
pub use config::EmbeddingConfig;
