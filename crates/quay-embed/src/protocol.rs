//! Wire types for the OpenAI-compatible `/v1/embeddings` endpoint.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct EmbedRequest<'a> {
    pub input: &'a [String],
    pub model: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmbedResponse {
    pub object: String,
    pub data: Vec<EmbedData>,
    pub model: String,
    pub usage: Usage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmbedData {
    pub object: String,
    pub embedding: Vec<f64>,
    pub index: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub total_tokens: u64,
}
