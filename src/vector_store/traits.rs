//! Vector store backend trait definition
//!
//! Defines the interface that storage backends implement.

use async_trait::async_trait;

use super::error::VectorStoreError;
use super::{Entry, Match, QuerySpec};

/// Trait for vector storage backends
///
/// Implementations must be Send + Sync for use with async runtimes.
/// Each call issues at most one statement and is never retried.
#[async_trait]
pub trait VectorStoreBackend: Send + Sync {
    /// Insert entries as one batch; an empty batch is a no-op
    async fn add(&self, entries: Vec<Entry>) -> Result<(), VectorStoreError>;

    /// Delete a single entry; missing ids are not an error
    async fn delete(&self, id: &str) -> Result<(), VectorStoreError>;

    /// Delete several entries in one statement
    async fn delete_many(&self, ids: &[String]) -> Result<(), VectorStoreError>;

    /// Run a similarity and/or filter query
    async fn query(&self, spec: QuerySpec) -> Result<Vec<Match>, VectorStoreError>;

    /// Get the total number of stored entries
    async fn count(&self) -> Result<usize, VectorStoreError>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> Result<(), VectorStoreError>;
}
