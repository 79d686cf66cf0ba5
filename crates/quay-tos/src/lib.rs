pub mod backend;
pub mod client;
pub mod config;
pub mod proxy;
pub mod s3;

pub use backend::{BackendError, ObjectBackend};
pub use client::TosClient;
pub use config::TosConfig;
pub use s3::S3Backend;
