//! PostgreSQL + pgvector backend
//!
//! One store is bound to one table with a fixed dimension, embedding kind
//! and similarity metric. Operations on the same instance are serialized;
//! separate instances pointed at the same table are not coordinated.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::config::{VectorStoreConfig, HNSW_MAX_DENSE_DIMENSION};
use super::error::VectorStoreError;
use super::filter;
use super::sql::{StatementBuilder, TYPE_KEY};
use super::traits::VectorStoreBackend;
use super::{Chunk, Entry, Match, QuerySpec};
use crate::embeddings::{codec, CodecError, Embedding, EmbeddingType};

/// pgvector backend over a sqlx connection pool
pub struct PgVectorBackend {
    pool: PgPool,
    config: VectorStoreConfig,
    statements: StatementBuilder,
    /// Held across statement build and execution
    op_lock: Mutex<()>,
}

impl PgVectorBackend {
    /// Connect, then bootstrap the table and index
    ///
    /// Connection failures abort construction. Bootstrap failures are logged
    /// and the store is returned anyway, on the assumption that the table is
    /// provisioned elsewhere.
    pub async fn new(config: VectorStoreConfig) -> Result<Self, VectorStoreError> {
        config.validate()?;

        let pool = PgPoolOptions::new()
            .max_connections(config.connection.max_connections)
            .acquire_timeout(config.connection.acquire_timeout())
            .connect_with(config.connection.connect_options())
            .await
            .map_err(|e| {
                VectorStoreError::construction(format!(
                    "failed to connect to {}:{}: {}",
                    config.connection.host, config.connection.port, e
                ))
            })?;

        info!(
            "Created pgvector connection pool (size={}) for table {}",
            config.connection.max_connections, config.table_name
        );

        let backend = Self::with_pool(config, pool)?;
        if let Err(e) = backend.bootstrap().await {
            warn!(
                "Schema bootstrap for {} failed, continuing with existing schema: {}",
                backend.config.table_name, e
            );
        }

        Ok(backend)
    }

    /// Build on an existing pool without bootstrapping
    pub fn with_pool(config: VectorStoreConfig, pool: PgPool) -> Result<Self, VectorStoreError> {
        config.validate()?;
        let statements = StatementBuilder::new(&config);
        Ok(Self {
            pool,
            config,
            statements,
            op_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &VectorStoreConfig {
        &self.config
    }

    /// Ensure the extension, table and similarity index exist
    pub async fn bootstrap(&self) -> Result<(), VectorStoreError> {
        if !self.statements.indexable() {
            warn!(
                "{} has {} dimensions, above the {} an HNSW index supports; skipping the similarity index",
                self.config.table_name, self.config.vector_dimension, HNSW_MAX_DENSE_DIMENSION
            );
        }

        for statement in self.statements.bootstrap() {
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .map_err(|e| VectorStoreError::construction(format!("{}: {}", statement, e)))?;
        }

        info!(
            "Bootstrapped {} ({}, {} dimensions, {} similarity)",
            self.config.table_name,
            self.config.embedding_type.column_type(self.config.vector_dimension),
            self.config.vector_dimension,
            self.config.similarity_metric
        );
        Ok(())
    }

    /// Reject embeddings of the wrong kind or width
    fn check_embedding(&self, embedding: &Embedding) -> Result<(), VectorStoreError> {
        if embedding.kind() != self.config.embedding_type {
            return Err(VectorStoreError::validation(format!(
                "{} embedding given to a {} store",
                embedding.kind(),
                self.config.embedding_type
            )));
        }
        embedding
            .check_dimension(self.config.vector_dimension)
            .map_err(VectorStoreError::validation)
    }

    /// Validate a query and render its statement
    ///
    /// Returns the SQL and whether it projects a similarity column.
    fn prepare_query(&self, spec: &QuerySpec) -> Result<(String, bool), VectorStoreError> {
        let top_k = spec.top_k.unwrap_or(self.config.top_k);
        if top_k == 0 {
            return Err(VectorStoreError::validation("topK must not be 0"));
        }
        if let Some(embedding) = &spec.embedding {
            self.check_embedding(embedding)?;
        }

        let predicate = spec.filters.as_ref().map(filter::compile).unwrap_or_default();
        let sql = self
            .statements
            .select(spec.embedding.as_ref(), &predicate, top_k);
        Ok((sql, spec.embedding.is_some()))
    }

    fn row_to_match(&self, row: &PgRow, scored: bool) -> Result<Match, RowError> {
        let id: String = row.try_get("id")?;
        let content: Option<String> = row.try_get("content")?;
        let embedding: Option<String> = row.try_get("embedding")?;
        let metadata: Option<String> = row.try_get("metadata")?;
        let similarity: Option<f64> = if scored {
            row.try_get("similarity")?
        } else {
            None
        };

        decode_row(
            RawRow {
                id,
                content,
                embedding,
                metadata,
                similarity,
            },
            self.config.embedding_type,
            self.config.vector_dimension,
        )
    }
}

/// Text columns of one result row
#[derive(Debug, Clone, Default)]
pub(crate) struct RawRow {
    pub id: String,
    pub content: Option<String>,
    pub embedding: Option<String>,
    pub metadata: Option<String>,
    pub similarity: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum RowError {
    #[error("column error: {0}")]
    Column(#[from] sqlx::Error),
    #[error("row {id}: {source}")]
    Embedding { id: String, source: CodecError },
    #[error("row {id}: embedding is null")]
    MissingEmbedding { id: String },
    #[error("row {id}: invalid metadata: {source}")]
    Metadata {
        id: String,
        source: serde_json::Error,
    },
}

/// Turn a result row back into a [`Match`]
///
/// Missing content becomes an empty string, the chunk type is read from the
/// `type` metadata key, and a missing similarity becomes 0.0.
pub(crate) fn decode_row(
    row: RawRow,
    kind: EmbeddingType,
    dimension: usize,
) -> Result<Match, RowError> {
    let text = row
        .embedding
        .as_deref()
        .ok_or_else(|| RowError::MissingEmbedding { id: row.id.clone() })?;
    let embedding = codec::deserialize(kind, text, dimension).map_err(|source| {
        RowError::Embedding {
            id: row.id.clone(),
            source,
        }
    })?;

    let metadata: Option<Map<String, Value>> = match row.metadata.as_deref() {
        Some(json) => Some(serde_json::from_str(json).map_err(|source| RowError::Metadata {
            id: row.id.clone(),
            source,
        })?),
        None => None,
    };

    let chunk_kind = metadata
        .as_ref()
        .and_then(|m| m.get(TYPE_KEY))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(Match {
        id: row.id,
        embedding,
        chunk: Chunk {
            kind: chunk_kind,
            content: row.content.unwrap_or_default(),
            metadata,
        },
        similarity_score: row.similarity.unwrap_or(0.0),
    })
}

#[async_trait]
impl VectorStoreBackend for PgVectorBackend {
    async fn add(&self, entries: Vec<Entry>) -> Result<(), VectorStoreError> {
        if entries.is_empty() {
            return Ok(());
        }

        for entry in &entries {
            self.check_embedding(&entry.embedding)?;
        }

        let _guard = self.op_lock.lock().await;
        let Some(sql) = self.statements.insert(&entries)? else {
            return Ok(());
        };

        let result = sqlx::query(&sql).execute(&self.pool).await.map_err(|e| {
            VectorStoreError::mutation(format!("failed to add to the vector store: {}", e))
        })?;

        debug!(
            "Inserted {} rows into {}",
            result.rows_affected(),
            self.config.table_name
        );
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), VectorStoreError> {
        let _guard = self.op_lock.lock().await;
        let sql = self.statements.delete_one(id);

        let result = sqlx::query(&sql).execute(&self.pool).await.map_err(|e| {
            VectorStoreError::mutation(format!("failed to delete from the vector store: {}", e))
        })?;

        debug!("Deleted {} rows for id {}", result.rows_affected(), id);
        Ok(())
    }

    async fn delete_many(&self, ids: &[String]) -> Result<(), VectorStoreError> {
        let _guard = self.op_lock.lock().await;
        let Some(sql) = self.statements.delete_many(ids) else {
            return Ok(());
        };

        let result = sqlx::query(&sql).execute(&self.pool).await.map_err(|e| {
            VectorStoreError::mutation(format!("failed to delete from the vector store: {}", e))
        })?;

        debug!(
            "Deleted {} rows for {} ids",
            result.rows_affected(),
            ids.len()
        );
        Ok(())
    }

    async fn query(&self, spec: QuerySpec) -> Result<Vec<Match>, VectorStoreError> {
        let (sql, scored) = self.prepare_query(&spec)?;

        let _guard = self.op_lock.lock().await;
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                VectorStoreError::query(format!("failed to query the vector store: {}", e))
            })?;

        let matches = rows
            .iter()
            .map(|row| self.row_to_match(row, scored))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                VectorStoreError::query(format!("failed to query the vector store: {}", e))
            })?;

        debug!(
            "Query on {} returned {} matches",
            self.config.table_name,
            matches.len()
        );
        Ok(matches)
    }

    async fn count(&self) -> Result<usize, VectorStoreError> {
        let _guard = self.op_lock.lock().await;
        let count: i64 = sqlx::query_scalar(&self.statements.count())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| VectorStoreError::query(format!("failed to count rows: {}", e)))?;

        Ok(count.max(0) as usize)
    }

    async fn health_check(&self) -> Result<(), VectorStoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| VectorStoreError::connection(format!("Health check failed: {}", e)))?;

        Ok(())
    }
}
