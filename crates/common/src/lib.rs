//! Ragline Common Library
//!
//! Query-time retrieval-augmented generation:
//! - Embedding client abstraction
//! - Read-only vector index
//! - Context assembly
//! - Completion client abstraction
//! - Query orchestration with stage-tagged errors
//! - Configuration, metrics and tracing setup

pub mod completion;
pub mod config;
pub mod context;
pub mod embeddings;
pub mod errors;
pub mod index;
pub mod metrics;
pub mod pipeline;
pub mod telemetry;

// Re-export commonly used types
pub use completion::{Answer, Generator};
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use errors::{AppError, QueryError, Result};
pub use index::VectorStore;
pub use pipeline::{QueryPipeline, QueryResponse};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-nomic-embed-text-v1.5";

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 768;

/// Default chat model
pub const DEFAULT_GENERATION_MODEL: &str = "phi-4-mini-reasoning-mlx";
