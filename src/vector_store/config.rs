//! Store configuration
//!
//! Connection parameters are handed to the sqlx driver as-is; the remaining
//! fields are fixed for the lifetime of a store.

use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::error::VectorStoreError;
use crate::embeddings::EmbeddingType;

/// Largest dimension pgvector accepts for a `sparsevec` column
pub const MAX_SPARSE_DIMENSION: usize = 1_000_000_000;

/// Largest dimension pgvector accepts for a `vector` column
pub const MAX_DENSE_DIMENSION: usize = 16_000;

/// Widest `vector` column an HNSW index can serve
pub const HNSW_MAX_DENSE_DIMENSION: usize = 2_000;

/// Distance function used to rank stored embeddings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    Euclidean,
    Manhattan,
}

impl SimilarityMetric {
    /// pgvector distance operator
    pub fn operator(&self) -> &'static str {
        match self {
            SimilarityMetric::Cosine => "<=>",
            SimilarityMetric::Euclidean => "<->",
            SimilarityMetric::Manhattan => "<#>",
        }
    }

    /// Operator class for the similarity index, matching [`Self::operator`]
    pub fn ops_class(&self, kind: EmbeddingType) -> String {
        let suffix = match self {
            SimilarityMetric::Cosine => "cosine_ops",
            SimilarityMetric::Euclidean => "l2_ops",
            SimilarityMetric::Manhattan => "ip_ops",
        };
        format!("{}_{}", kind.pg_type(), suffix)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityMetric::Cosine => "cosine",
            SimilarityMetric::Euclidean => "euclidean",
            SimilarityMetric::Manhattan => "manhattan",
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimilarityMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(SimilarityMetric::Cosine),
            "euclidean" | "l2" => Ok(SimilarityMetric::Euclidean),
            "manhattan" | "l1" => Ok(SimilarityMetric::Manhattan),
            other => Err(format!("unknown similarity metric: {}", other)),
        }
    }
}

/// Transport security for the backend connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    Disable,
    #[default]
    Prefer,
    Require,
}

impl SslMode {
    fn to_pg(self) -> PgSslMode {
        match self {
            SslMode::Disable => PgSslMode::Disable,
            SslMode::Prefer => PgSslMode::Prefer,
            SslMode::Require => PgSslMode::Require,
        }
    }
}

impl FromStr for SslMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disable" | "off" | "false" => Ok(SslMode::Disable),
            "prefer" => Ok(SslMode::Prefer),
            "require" | "on" | "true" => Ok(SslMode::Require),
            other => Err(format!("unknown ssl mode: {}", other)),
        }
    }
}

/// Connection and pool settings, passed through to the driver
#[derive(Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub ssl_mode: SslMode,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            database: "postgres".to_string(),
            ssl_mode: SslMode::default(),
            max_connections: 5,
            acquire_timeout_secs: 10,
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("ssl_mode", &self.ssl_mode)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .finish()
    }
}

impl ConnectionConfig {
    /// Driver options for this connection
    pub fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.database)
            .ssl_mode(self.ssl_mode.to_pg());

        if self.password.is_empty() {
            options
        } else {
            options.password(&self.password)
        }
    }

    pub(crate) fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

/// Configuration for a single store bound to one table
#[derive(Debug, Clone)]
pub struct VectorStoreConfig {
    pub connection: ConnectionConfig,
    pub table_name: String,
    /// Fixed embedding width
    pub vector_dimension: usize,
    pub embedding_type: EmbeddingType,
    pub similarity_metric: SimilarityMetric,
    /// Default result limit; negative means unlimited
    pub top_k: i64,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            table_name: "embeddings".to_string(),
            vector_dimension: 384,
            embedding_type: EmbeddingType::Dense,
            similarity_metric: SimilarityMetric::Cosine,
            top_k: 10,
        }
    }
}

impl VectorStoreConfig {
    pub fn new(
        connection: ConnectionConfig,
        table_name: impl Into<String>,
        vector_dimension: usize,
        embedding_type: EmbeddingType,
        similarity_metric: SimilarityMetric,
        top_k: i64,
    ) -> Self {
        Self {
            connection,
            table_name: table_name.into(),
            vector_dimension,
            embedding_type,
            similarity_metric,
            top_k,
        }
    }

    /// Reject settings the backend could never satisfy
    pub fn validate(&self) -> Result<(), VectorStoreError> {
        if self.table_name.trim().is_empty() {
            return Err(VectorStoreError::validation("table name must not be empty"));
        }
        if self.vector_dimension == 0 {
            return Err(VectorStoreError::validation(
                "vector dimension must be greater than 0",
            ));
        }
        let max = match self.embedding_type {
            EmbeddingType::Dense => MAX_DENSE_DIMENSION,
            EmbeddingType::Sparse => MAX_SPARSE_DIMENSION,
        };
        if self.vector_dimension > max {
            return Err(VectorStoreError::validation(format!(
                "{} vector dimension {} exceeds the maximum of {}",
                self.embedding_type, self.vector_dimension, max
            )));
        }
        if self.top_k == 0 {
            return Err(VectorStoreError::validation("topK must not be 0"));
        }
        Ok(())
    }
}
