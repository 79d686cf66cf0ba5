use std::collections::HashMap;

use crate::error::QuayResult;

/// One dense embedding, as returned by the remote model.
pub type DenseVector = Vec<f64>;

/// Sparse embedding keyed by token id.
pub type SparseVector = HashMap<usize, f64>;

/// Which vector kinds an embedder can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportStatus {
    Dense,
    DenseAndSparse,
}

impl SupportStatus {
    pub fn supports_sparse(self) -> bool {
        matches!(self, Self::DenseAndSparse)
    }
}

pub trait Embedder: Send + Sync {
    /// Embed every text, returning one vector per input in input order.
    fn embed_strings(&self, texts: &[String]) -> QuayResult<Vec<DenseVector>>;

    /// Dense and sparse vectors together. Dense-only embedders get an empty
    /// sparse map per text.
    fn embed_strings_hybrid(
        &self,
        texts: &[String],
    ) -> QuayResult<(Vec<DenseVector>, Vec<SparseVector>)> {
        let dense = self.embed_strings(texts)?;
        let sparse = vec![SparseVector::new(); dense.len()];
        Ok((dense, sparse))
    }

    fn dimensions(&self) -> usize;

    fn support_status(&self) -> SupportStatus {
        SupportStatus::Dense
    }
}
