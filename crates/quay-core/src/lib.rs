pub mod context;
pub mod embedder;
pub mod error;
pub mod imagex;
pub mod storage;

pub use context::RequestContext;
pub use embedder::{DenseVector, Embedder, SparseVector, SupportStatus};
pub use error::{QuayError, QuayResult};
pub use imagex::{ImageHost, ResourceUrl, SecurityToken, APPLY_UPLOAD_ACTION_URI};
pub use storage::Storage;
