//! Configuration management with environment variable support
//!
//! Builds a [`VectorStoreConfig`] from `PGVECTOR_*` environment variables.

use std::env;

use crate::embeddings::EmbeddingType;
use crate::vector_store::{ConnectionConfig, SimilarityMetric, SslMode, VectorStoreConfig};

/// Process configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub table_name: String,
    pub vector_dimension: usize,
    pub embedding_type: EmbeddingType,
    pub similarity_metric: SimilarityMetric,
    /// Default result limit (negative = unlimited)
    pub top_k: i64,
}

impl Default for Config {
    fn default() -> Self {
        let store = VectorStoreConfig::default();
        Self {
            connection: store.connection,
            table_name: store.table_name,
            vector_dimension: store.vector_dimension,
            embedding_type: store.embedding_type,
            similarity_metric: store.similarity_metric,
            top_k: store.top_k,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - PGVECTOR_HOST: database host (default: localhost)
    /// - PGVECTOR_PORT: database port (default: 5432)
    /// - PGVECTOR_USER: database user (default: postgres)
    /// - PGVECTOR_PASSWORD: database password (default: empty)
    /// - PGVECTOR_DATABASE: database name (default: postgres)
    /// - PGVECTOR_SSL_MODE: disable | prefer | require (default: prefer)
    /// - PGVECTOR_MAX_CONNECTIONS: pool size (default: 5)
    /// - PGVECTOR_TABLE: table name (default: embeddings)
    /// - PGVECTOR_DIMENSION: vector dimension (default: 384)
    /// - PGVECTOR_EMBEDDING_TYPE: dense | sparse (default: dense)
    /// - PGVECTOR_METRIC: cosine | euclidean | manhattan (default: cosine)
    /// - PGVECTOR_TOP_K: default result limit, -1 for unlimited (default: 10)
    ///
    /// Values that fail to parse keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = env::var("PGVECTOR_HOST") {
            config.connection.host = host;
        }

        if let Some(port) = parsed_var::<u16>("PGVECTOR_PORT") {
            config.connection.port = port;
        }

        if let Ok(user) = env::var("PGVECTOR_USER") {
            config.connection.user = user;
        }

        if let Ok(password) = env::var("PGVECTOR_PASSWORD") {
            config.connection.password = password;
        }

        if let Ok(database) = env::var("PGVECTOR_DATABASE") {
            config.connection.database = database;
        }

        if let Some(mode) = parsed_var::<SslMode>("PGVECTOR_SSL_MODE") {
            config.connection.ssl_mode = mode;
        }

        if let Some(size) = parsed_var::<u32>("PGVECTOR_MAX_CONNECTIONS") {
            config.connection.max_connections = size;
        }

        if let Ok(table) = env::var("PGVECTOR_TABLE") {
            config.table_name = table;
        }

        if let Some(dimension) = parsed_var::<usize>("PGVECTOR_DIMENSION") {
            config.vector_dimension = dimension;
        }

        if let Some(kind) = parsed_var::<EmbeddingType>("PGVECTOR_EMBEDDING_TYPE") {
            config.embedding_type = kind;
        }

        if let Some(metric) = parsed_var::<SimilarityMetric>("PGVECTOR_METRIC") {
            config.similarity_metric = metric;
        }

        if let Some(top_k) = parsed_var::<i64>("PGVECTOR_TOP_K") {
            config.top_k = top_k;
        }

        config
    }

    /// Store configuration for the configured table
    pub fn store_config(&self) -> VectorStoreConfig {
        VectorStoreConfig::new(
            self.connection.clone(),
            self.table_name.clone(),
            self.vector_dimension,
            self.embedding_type,
            self.similarity_metric,
            self.top_k,
        )
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("\n=== Configuration ===");
        println!(
            "Database:        {}@{}:{}/{}",
            self.connection.user, self.connection.host, self.connection.port, self.connection.database
        );
        println!(
            "Password:        {}",
            if self.connection.password.is_empty() { "(none)" } else { "***" }
        );
        println!("SSL Mode:        {:?}", self.connection.ssl_mode);
        println!("Pool Size:       {}", self.connection.max_connections);
        println!("Table:           {}", self.table_name);
        println!("Dimension:       {}", self.vector_dimension);
        println!("Embedding Type:  {}", self.embedding_type);
        println!("Metric:          {}", self.similarity_metric);
        println!(
            "Top K:           {}",
            if self.top_k < 0 { "unlimited".to_string() } else { self.top_k.to_string() }
        );
        println!("====================\n");
    }
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|value| value.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.connection.host, "localhost");
        assert_eq!(config.connection.port, 5432);
        assert_eq!(config.table_name, "embeddings");
        assert_eq!(config.vector_dimension, 384);
        assert_eq!(config.embedding_type, EmbeddingType::Dense);
        assert_eq!(config.top_k, 10);
    }

    #[test]
    fn test_store_config_is_valid() {
        let store = Config::default().store_config();
        assert!(store.validate().is_ok());
        assert_eq!(store.similarity_metric, SimilarityMetric::Cosine);
    }

    #[test]
    fn test_from_env() {
        // Set environment variables
        unsafe {
            env::set_var("PGVECTOR_HOST", "db.internal");
            env::set_var("PGVECTOR_PORT", "6543");
            env::set_var("PGVECTOR_TABLE", "chunks");
            env::set_var("PGVECTOR_DIMENSION", "200");
            env::set_var("PGVECTOR_EMBEDDING_TYPE", "sparse");
            env::set_var("PGVECTOR_METRIC", "euclidean");
            env::set_var("PGVECTOR_TOP_K", "-1");
            env::set_var("PGVECTOR_MAX_CONNECTIONS", "not-a-number");
        }

        let config = Config::from_env();
        assert_eq!(config.connection.host, "db.internal");
        assert_eq!(config.connection.port, 6543);
        assert_eq!(config.table_name, "chunks");
        assert_eq!(config.vector_dimension, 200);
        assert_eq!(config.embedding_type, EmbeddingType::Sparse);
        assert_eq!(config.similarity_metric, SimilarityMetric::Euclidean);
        assert_eq!(config.top_k, -1);
        assert_eq!(config.connection.max_connections, 5);

        // Clean up
        unsafe {
            env::remove_var("PGVECTOR_HOST");
            env::remove_var("PGVECTOR_PORT");
            env::remove_var("PGVECTOR_TABLE");
            env::remove_var("PGVECTOR_DIMENSION");
            env::remove_var("PGVECTOR_EMBEDDING_TYPE");
            env::remove_var("PGVECTOR_METRIC");
            env::remove_var("PGVECTOR_TOP_K");
            env::remove_var("PGVECTOR_MAX_CONNECTIONS");
        }
    }
}
