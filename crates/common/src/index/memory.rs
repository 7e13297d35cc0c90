//! In-memory brute-force index loaded from a JSON snapshot
//!
//! The ingestion pipeline writes `IndexSnapshot` files; the query service
//! loads one at startup and then only reads from it.

use super::{Document, Metric, ScoredDocument, VectorStore};
use crate::config::IndexConfig;
use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// On-disk snapshot format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub dimension: usize,
    #[serde(default)]
    pub metric: Metric,
    pub documents: Vec<StoredDocument>,
}

/// A document together with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    #[serde(flatten)]
    pub document: Document,
    pub embedding: Vec<f32>,
}

/// Exhaustive-scan vector index
#[derive(Debug)]
pub struct MemoryIndex {
    dimension: usize,
    metric: Metric,
    documents: Vec<Arc<Document>>,
    vectors: Vec<Vec<f32>>,
}

impl MemoryIndex {
    /// Create an empty index
    pub fn new(dimension: usize, metric: Metric) -> Self {
        Self {
            dimension,
            metric,
            documents: Vec::new(),
            vectors: Vec::new(),
        }
    }

    /// Build an index from a snapshot, checking every vector's length
    pub fn from_snapshot(snapshot: IndexSnapshot) -> Result<Self> {
        let mut index = Self::new(snapshot.dimension, snapshot.metric);
        for stored in snapshot.documents {
            index.insert(stored.document, stored.embedding)?;
        }
        Ok(index)
    }

    /// Add a document. Only used while building; the query path never writes.
    pub fn insert(&mut self, document: Document, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(AppError::Dimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        self.documents.push(Arc::new(document));
        self.vectors.push(vector);
        Ok(())
    }

    /// Read a snapshot file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let snapshot: IndexSnapshot = serde_json::from_str(&raw)?;
        Self::from_snapshot(snapshot)
    }

    /// Load the configured snapshot, or start empty if none has been written yet
    pub fn load_or_empty(config: &IndexConfig) -> Result<Self> {
        let path = Path::new(&config.path);
        if !path.exists() {
            tracing::warn!(
                path = %config.path,
                "Index snapshot not found, starting with an empty index"
            );
            return Ok(Self::new(config.dimension, config.metric));
        }

        let index = Self::load(path)?;
        if index.dimension != config.dimension {
            return Err(AppError::Configuration {
                message: format!(
                    "index snapshot {} has dimension {}, configuration expects {}",
                    config.path, index.dimension, config.dimension
                ),
            });
        }

        tracing::info!(
            path = %config.path,
            documents = index.documents.len(),
            dimension = index.dimension,
            metric = ?index.metric,
            "Index loaded"
        );
        Ok(index)
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Synchronous search used by the `VectorStore` impl
    pub fn search_sync(&self, query: &[f32], k: usize) -> Result<Vec<ScoredDocument>> {
        if k == 0 {
            return Err(AppError::Validation {
                message: "k must be positive".to_string(),
            });
        }
        if query.len() != self.dimension {
            return Err(AppError::Dimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let score = self.metric.similarity(query, v);
                (i, if score.is_nan() { f32::NEG_INFINITY } else { score })
            })
            .collect();

        // Stable: equal scores keep insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(rank, (i, score))| ScoredDocument {
                document: Arc::clone(&self.documents[i]),
                score,
                rank: rank + 1,
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl VectorStore for MemoryIndex {
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredDocument>> {
        self.search_sync(query, k)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.documents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MetadataValue;

    fn index_with(vectors: &[(&str, [f32; 2])]) -> MemoryIndex {
        let mut index = MemoryIndex::new(2, Metric::Cosine);
        for (text, v) in vectors {
            index.insert(Document::new(*text, *text), v.to_vec()).unwrap();
        }
        index
    }

    /// Unique path under the system temp dir
    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("ragline-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = MemoryIndex::new(3, Metric::Cosine);
        let results = index.search_sync(&[1.0, 0.0, 0.0], 4).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_results_bounded_and_sorted() {
        let index = index_with(&[
            ("east", [1.0, 0.0]),
            ("north", [0.0, 1.0]),
            ("north-east", [1.0, 1.0]),
            ("west", [-1.0, 0.0]),
            ("mostly-east", [1.0, 0.2]),
        ]);

        let results = index.search_sync(&[1.0, 0.0], 3).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].document.text, "east");
        assert_eq!(results[1].document.text, "mostly-east");
        assert_eq!(results[2].document.text, "north-east");
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(
            results.iter().map(|r| r.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_fewer_documents_than_k() {
        let index = index_with(&[("a", [1.0, 0.0]), ("b", [0.0, 1.0])]);
        let results = index.search_sync(&[1.0, 1.0], 4).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = index_with(&[
            ("first", [1.0, 0.0]),
            ("second", [2.0, 0.0]),
            ("third", [3.0, 0.0]),
        ]);

        // Cosine ignores magnitude, so all three tie
        let results = index.search_sync(&[1.0, 0.0], 3).unwrap();
        let texts: Vec<_> = results.iter().map(|r| r.document.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let index = index_with(&[("a", [1.0, 0.0])]);
        let err = index.search_sync(&[1.0, 0.0, 0.0], 1).unwrap_err();
        assert!(matches!(err, AppError::Dimension { expected: 2, actual: 3 }));
    }

    #[test]
    fn test_zero_k_rejected() {
        let index = index_with(&[("a", [1.0, 0.0])]);
        assert!(matches!(
            index.search_sync(&[1.0, 0.0], 0),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_insert_checks_dimension() {
        let mut index = MemoryIndex::new(2, Metric::Cosine);
        let err = index.insert(Document::new("a", "a"), vec![1.0]).unwrap_err();
        assert!(matches!(err, AppError::Dimension { .. }));
        assert!(index.is_empty());
    }

    #[test]
    fn test_load_snapshot() {
        let path = temp_path("snapshot");
        let snapshot = IndexSnapshot {
            dimension: 2,
            metric: Metric::InnerProduct,
            documents: vec![StoredDocument {
                document: Document::new("p1", "Paris is the capital of France.")
                    .with_metadata("source", MetadataValue::Text("atlas.txt".into()))
                    .with_metadata("page", MetadataValue::Number(3.0)),
                embedding: vec![0.5, 0.5],
            }],
        };
        std::fs::write(&path, serde_json::to_string(&snapshot).unwrap()).unwrap();

        let config = IndexConfig {
            path: path.to_string_lossy().into_owned(),
            dimension: 2,
            metric: Metric::Cosine,
        };
        let index = MemoryIndex::load_or_empty(&config).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(index.len(), 1);
        assert_eq!(index.metric(), Metric::InnerProduct);
        let results = index.search_sync(&[1.0, 1.0], 4).unwrap();
        assert_eq!(
            results[0].document.metadata.get("page"),
            Some(&MetadataValue::Number(3.0))
        );
    }

    #[test]
    fn test_snapshot_dimension_must_match_config() {
        let path = temp_path("mismatch");
        let snapshot = IndexSnapshot {
            dimension: 2,
            metric: Metric::Cosine,
            documents: Vec::new(),
        };
        std::fs::write(&path, serde_json::to_string(&snapshot).unwrap()).unwrap();

        let config = IndexConfig {
            path: path.to_string_lossy().into_owned(),
            dimension: 768,
            metric: Metric::Cosine,
        };
        let result = MemoryIndex::load_or_empty(&config);
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(AppError::Configuration { .. })));
    }

    #[test]
    fn test_missing_snapshot_gives_empty_index() {
        let config = IndexConfig {
            path: temp_path("does-not-exist").to_string_lossy().into_owned(),
            dimension: 4,
            metric: Metric::Cosine,
        };
        let index = MemoryIndex::load_or_empty(&config).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.dimension(), 4);
    }
}
