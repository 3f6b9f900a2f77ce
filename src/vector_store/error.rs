//! Vector store error types
//!
//! Every backend failure is caught at the operation boundary and re-wrapped
//! with a short context message before it reaches the caller.

use thiserror::Error;

/// Errors that can occur during vector store operations
#[derive(Error, Debug)]
pub enum VectorStoreError {
    /// Store could not be constructed (pool or connection setup)
    #[error("Construction failed: {0}")]
    Construction(String),

    /// Input rejected before any backend round-trip
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Insert or delete statement rejected by the backend
    #[error("Mutation failed: {0}")]
    Mutation(String),

    /// Query rejected, or a result row could not be decoded
    #[error("Query failed: {0}")]
    Query(String),

    /// Backend unreachable
    #[error("Connection failed: {0}")]
    Connection(String),
}

impl VectorStoreError {
    /// Create a construction error
    pub fn construction(msg: impl Into<String>) -> Self {
        Self::Construction(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a mutation error
    pub fn mutation(msg: impl Into<String>) -> Self {
        Self::Mutation(msg.into())
    }

    /// Create a query error
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
