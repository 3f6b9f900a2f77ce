//! Vector store backed by PostgreSQL with pgvector
//!
//! Persists content chunks with dense or sparse embeddings and answers
//! similarity queries combined with metadata filters. Nearest-neighbour
//! search and indexing are delegated to pgvector.

pub mod config;
pub mod error;
pub mod filter;
pub mod pgvector;
pub mod sql;
pub mod traits;

// Re-exports
pub use config::{ConnectionConfig, SimilarityMetric, SslMode, VectorStoreConfig};
pub use error::VectorStoreError;
pub use filter::{
    FilterCondition, FilterNode, FilterOperator, FilterValue, MetadataFilter, MetadataFilters,
};
pub use pgvector::PgVectorBackend;
pub use traits::VectorStoreBackend;

use crate::embeddings::Embedding;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Content stored alongside an embedding
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk type, persisted under the `type` metadata key
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl Chunk {
    pub fn new(kind: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            content: content.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Unit of storage; `id` is generated when absent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: Option<String>,
    pub embedding: Embedding,
    pub chunk: Chunk,
}

impl Entry {
    pub fn new(embedding: Embedding, chunk: Chunk) -> Self {
        Self {
            id: None,
            embedding,
            chunk,
        }
    }

    pub fn with_id(id: impl Into<String>, embedding: Embedding, chunk: Chunk) -> Self {
        Self {
            id: Some(id.into()),
            embedding,
            chunk,
        }
    }
}

/// A query result row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    /// Stored embedding. For sparse stores `indices` are the present
    /// positions; the complement comes from [`SparseVector::implicit_zeros`].
    ///
    /// [`SparseVector::implicit_zeros`]: crate::embeddings::SparseVector::implicit_zeros
    pub embedding: Embedding,
    pub chunk: Chunk,
    /// `1 - distance`, or 0.0 when the query had no embedding
    pub similarity_score: f64,
}

/// Parameters of a query
///
/// With an embedding, results are ranked by similarity. With filters, rows
/// must satisfy the compiled predicate. `top_k` overrides the store default;
/// negative means unlimited and 0 is rejected.
#[derive(Debug, Clone, Default)]
pub struct QuerySpec {
    pub embedding: Option<Embedding>,
    pub filters: Option<FilterNode>,
    pub top_k: Option<i64>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_embedding(mut self, embedding: impl Into<Embedding>) -> Self {
        self.embedding = Some(embedding.into());
        self
    }

    pub fn with_filters(mut self, filters: impl Into<FilterNode>) -> Self {
        self.filters = Some(filters.into());
        self
    }

    pub fn with_top_k(mut self, top_k: i64) -> Self {
        self.top_k = Some(top_k);
        self
    }
}

/// Vector store with swappable backend
///
/// This is the main entry point for vector operations.
/// It wraps a backend implementation and provides a unified API.
#[derive(Clone)]
pub struct VectorStore {
    backend: Arc<dyn VectorStoreBackend>,
}

impl VectorStore {
    /// Connect to PostgreSQL and bootstrap the table
    ///
    /// A failed bootstrap is logged and does not fail construction.
    pub async fn connect(config: VectorStoreConfig) -> Result<Self, VectorStoreError> {
        let backend = PgVectorBackend::new(config).await?;
        Ok(Self::with_backend(Arc::new(backend)))
    }

    /// Wrap an existing backend
    pub fn with_backend(backend: Arc<dyn VectorStoreBackend>) -> Self {
        Self { backend }
    }

    /// Insert entries with their embeddings
    pub async fn add(&self, entries: Vec<Entry>) -> Result<(), VectorStoreError> {
        self.backend.add(entries).await
    }

    /// Delete an entry by id
    pub async fn delete(&self, id: &str) -> Result<(), VectorStoreError> {
        self.backend.delete(id).await
    }

    /// Delete entries by id
    pub async fn delete_many(&self, ids: &[String]) -> Result<(), VectorStoreError> {
        self.backend.delete_many(ids).await
    }

    /// Query by embedding similarity and/or metadata filters
    pub async fn query(&self, spec: QuerySpec) -> Result<Vec<Match>, VectorStoreError> {
        self.backend.query(spec).await
    }

    /// Get the total number of entries in the store
    pub async fn count(&self) -> Result<usize, VectorStoreError> {
        self.backend.count().await
    }

    /// Check if the backend is healthy/connected
    pub async fn health_check(&self) -> Result<(), VectorStoreError> {
        self.backend.health_check().await
    }
}
