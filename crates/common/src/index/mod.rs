//! Vector index
//!
//! Read-only similarity search over documents written by the ingestion
//! pipeline. The query path only ever calls `search`.

mod distance;
mod memory;

pub use distance::Metric;
pub use memory::{IndexSnapshot, MemoryIndex, StoredDocument};

use crate::config::IndexConfig;
use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Scalar metadata value attached to a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// A retrievable passage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier assigned at ingestion
    pub id: String,

    /// Passage text
    pub text: String,

    /// Source, page and similar attributes
    #[serde(default)]
    pub metadata: BTreeMap<String, MetadataValue>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Document returned from a search, with its score and 1-based rank
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document: Arc<Document>,

    /// Similarity score; higher is more relevant
    pub score: f32,

    pub rank: usize,
}

/// Common trait for vector stores
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Return at most `k` documents by descending score.
    ///
    /// Ties keep insertion order. Fails with a dimension error when the query
    /// vector's length differs from `dimension()`.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredDocument>>;

    /// Fixed vector dimension of this index
    fn dimension(&self) -> usize;

    /// Number of stored documents
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Open the index described by configuration
pub fn open_index(config: &IndexConfig) -> Result<Arc<dyn VectorStore>> {
    Ok(Arc::new(MemoryIndex::load_or_empty(config)?))
}
