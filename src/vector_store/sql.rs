//! Statement builders for the pgvector backend
//!
//! Every identifier and literal interpolated into a statement goes through
//! [`sanitize`], the same routine that quotes the table name.

use serde_json::{Map, Value};

use super::config::{SimilarityMetric, VectorStoreConfig, HNSW_MAX_DENSE_DIMENSION};
use super::error::VectorStoreError;
use super::Entry;
use crate::embeddings::{codec, Embedding, EmbeddingType};

/// Columns that exist on every store table
pub const ID_COLUMN: &str = "id";
pub const CONTENT_COLUMN: &str = "content";
pub const EMBEDDING_COLUMN: &str = "embedding";
pub const METADATA_COLUMN: &str = "metadata";

/// Metadata key the store injects with the chunk type
pub const TYPE_KEY: &str = "type";

/// Strip NUL bytes and double every `quote` character, then wrap in `quote`
pub fn sanitize(raw: &str, quote: char) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push(quote);
    for c in raw.chars() {
        match c {
            '\0' => {}
            c if c == quote => {
                out.push(c);
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Quote a string literal: `it's` becomes `'it''s'`
pub fn escape_literal(raw: &str) -> String {
    sanitize(raw, '\'')
}

/// Quote a possibly schema-qualified identifier: `public.items` becomes `"public"."items"`
pub fn quote_identifier(raw: &str) -> String {
    raw.split('.')
        .map(|part| sanitize(part, '"'))
        .collect::<Vec<_>>()
        .join(".")
}

/// Builds every statement a store issues against its table
#[derive(Debug, Clone)]
pub struct StatementBuilder {
    table: String,
    index_name: String,
    dimension: usize,
    embedding_type: EmbeddingType,
    metric: SimilarityMetric,
}

impl StatementBuilder {
    pub fn new(config: &VectorStoreConfig) -> Self {
        let index_base: String = config
            .table_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();

        Self {
            table: quote_identifier(&config.table_name),
            index_name: quote_identifier(&format!("{}_{}_idx", index_base, EMBEDDING_COLUMN)),
            dimension: config.vector_dimension,
            embedding_type: config.embedding_type,
            metric: config.similarity_metric,
        }
    }

    /// Whether the column is narrow enough for an HNSW index
    pub fn indexable(&self) -> bool {
        match self.embedding_type {
            EmbeddingType::Dense => self.dimension <= HNSW_MAX_DENSE_DIMENSION,
            EmbeddingType::Sparse => true,
        }
    }

    /// Idempotent schema bootstrap: extension, table, similarity index
    ///
    /// The index is left out when the column is not [`Self::indexable`].
    pub fn bootstrap(&self) -> Vec<String> {
        let mut statements = vec![
            "CREATE EXTENSION IF NOT EXISTS vector".to_string(),
            format!(
                "CREATE TABLE IF NOT EXISTS {} ({} TEXT PRIMARY KEY, {} TEXT, {} {}, {} JSONB)",
                self.table,
                ID_COLUMN,
                CONTENT_COLUMN,
                EMBEDDING_COLUMN,
                self.embedding_type.column_type(self.dimension),
                METADATA_COLUMN,
            ),
        ];

        if self.indexable() {
            statements.push(format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} USING hnsw ({} {})",
                self.index_name,
                self.table,
                EMBEDDING_COLUMN,
                self.metric.ops_class(self.embedding_type),
            ));
        }
        statements
    }

    /// Render an embedding as a typed literal, e.g. `'[1,2]'::vector`
    pub fn embedding_literal(&self, embedding: &Embedding) -> String {
        format!(
            "{}::{}",
            escape_literal(&codec::serialize(embedding, self.dimension)),
            embedding.kind().pg_type()
        )
    }

    /// One multi-row insert covering every entry
    ///
    /// Entries without an id get a random UUID. Returns `None` for an empty batch.
    pub fn insert(&self, entries: &[Entry]) -> Result<Option<String>, VectorStoreError> {
        if entries.is_empty() {
            return Ok(None);
        }

        let rows = entries
            .iter()
            .map(|entry| self.insert_row(entry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(format!(
            "INSERT INTO {} ({}, {}, {}, {}) VALUES {}",
            self.table,
            ID_COLUMN,
            CONTENT_COLUMN,
            EMBEDDING_COLUMN,
            METADATA_COLUMN,
            rows.join(", ")
        )))
    }

    fn insert_row(&self, entry: &Entry) -> Result<String, VectorStoreError> {
        let id = entry
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let metadata = merged_metadata(entry.chunk.metadata.as_ref(), &entry.chunk.kind);
        let metadata_json = serde_json::to_string(&metadata).map_err(|e| {
            VectorStoreError::mutation(format!("failed to serialize metadata for {}: {}", id, e))
        })?;

        Ok(format!(
            "({}, {}, {}, {}::jsonb)",
            escape_literal(&id),
            escape_literal(&entry.chunk.content),
            self.embedding_literal(&entry.embedding),
            escape_literal(&metadata_json),
        ))
    }

    pub fn delete_one(&self, id: &str) -> String {
        format!(
            "DELETE FROM {} WHERE {} = {}",
            self.table,
            ID_COLUMN,
            escape_literal(id)
        )
    }

    /// Batch delete; `None` when there is nothing to delete
    pub fn delete_many(&self, ids: &[String]) -> Option<String> {
        if ids.is_empty() {
            return None;
        }
        let list: Vec<String> = ids.iter().map(|id| escape_literal(id)).collect();
        Some(format!(
            "DELETE FROM {} WHERE {} IN ({})",
            self.table,
            ID_COLUMN,
            list.join(", ")
        ))
    }

    pub fn count(&self) -> String {
        format!("SELECT COUNT(*) AS count FROM {}", self.table)
    }

    /// Select statement for one of the four query shapes
    ///
    /// `predicate` is a compiled filter, empty when there is none.
    /// A negative `top_k` means no limit.
    pub fn select(&self, embedding: Option<&Embedding>, predicate: &str, top_k: i64) -> String {
        let columns = format!(
            "{id}, {content}, {emb}::text AS {emb}, {meta}::text AS {meta}",
            id = ID_COLUMN,
            content = CONTENT_COLUMN,
            emb = EMBEDDING_COLUMN,
            meta = METADATA_COLUMN,
        );

        let mut sql = match embedding {
            None => {
                let mut sql = format!("SELECT {} FROM {}", columns, self.table);
                if !predicate.is_empty() {
                    sql.push_str(&format!(" WHERE {}", predicate));
                }
                sql
            }
            Some(embedding) => {
                let similarity = format!(
                    "1 - ({} {} {})",
                    EMBEDDING_COLUMN,
                    self.metric.operator(),
                    self.embedding_literal(embedding)
                );
                match self.embedding_type {
                    EmbeddingType::Dense => {
                        let mut sql = format!(
                            "SELECT {}, {} AS similarity FROM {} WHERE ({sim}) IS NOT NULL AND ({sim}) != 'NaN'",
                            columns,
                            similarity,
                            self.table,
                            sim = similarity,
                        );
                        if !predicate.is_empty() {
                            sql.push_str(&format!(" AND ({})", predicate));
                        }
                        sql.push_str(" ORDER BY similarity DESC");
                        sql
                    }
                    EmbeddingType::Sparse => {
                        let mut inner = format!(
                            "SELECT {}, {} AS similarity FROM {}",
                            columns, similarity, self.table
                        );
                        if !predicate.is_empty() {
                            inner.push_str(&format!(" WHERE {}", predicate));
                        }
                        format!(
                            "SELECT * FROM ({}) AS scored WHERE similarity IS NOT NULL AND similarity != 'NaN' ORDER BY similarity DESC",
                            inner
                        )
                    }
                }
            }
        };

        if top_k > -1 {
            sql.push_str(&format!(" LIMIT {}", top_k));
        }
        sql
    }
}

/// Chunk metadata with the chunk type injected under [`TYPE_KEY`]
pub fn merged_metadata(metadata: Option<&Map<String, Value>>, kind: &str) -> Map<String, Value> {
    let mut merged = metadata.cloned().unwrap_or_default();
    merged.insert(TYPE_KEY.to_string(), Value::String(kind.to_string()));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::SparseVector;
    use crate::vector_store::Chunk;
    use serde_json::json;

    fn builder(kind: EmbeddingType, dimension: usize) -> StatementBuilder {
        StatementBuilder::new(&VectorStoreConfig {
            table_name: "items".to_string(),
            vector_dimension: dimension,
            embedding_type: kind,
            ..Default::default()
        })
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(escape_literal("it's"), "'it''s'");
        assert_eq!(escape_literal("a\0b"), "'ab'");
        assert_eq!(quote_identifier("my\"table"), "\"my\"\"table\"");
        assert_eq!(quote_identifier("public.items"), "\"public\".\"items\"");
    }

    #[test]
    fn test_bootstrap_dense() {
        let statements = builder(EmbeddingType::Dense, 3).bootstrap();
        assert_eq!(statements[0], "CREATE EXTENSION IF NOT EXISTS vector");
        assert_eq!(
            statements[1],
            "CREATE TABLE IF NOT EXISTS \"items\" (id TEXT PRIMARY KEY, content TEXT, embedding vector(3), metadata JSONB)"
        );
        assert_eq!(
            statements[2],
            "CREATE INDEX IF NOT EXISTS \"items_embedding_idx\" ON \"items\" USING hnsw (embedding vector_cosine_ops)"
        );
    }

    #[test]
    fn test_bootstrap_sparse_uses_matching_ops() {
        let statements = builder(EmbeddingType::Sparse, 200).bootstrap();
        assert!(statements[1].contains("embedding sparsevec(200)"));
        assert!(statements[2].contains("sparsevec_cosine_ops"));
    }

    #[test]
    fn test_bootstrap_skips_index_for_wide_dense_columns() {
        let wide = builder(EmbeddingType::Dense, HNSW_MAX_DENSE_DIMENSION + 1);
        assert!(!wide.indexable());
        let statements = wide.bootstrap();
        assert_eq!(statements.len(), 2);
        assert!(statements[1].contains("vector(2001)"));

        let widest = builder(EmbeddingType::Dense, HNSW_MAX_DENSE_DIMENSION);
        assert_eq!(widest.bootstrap().len(), 3);

        let sparse = builder(EmbeddingType::Sparse, 100_000);
        assert!(sparse.indexable());
        assert_eq!(sparse.bootstrap().len(), 3);
    }

    #[test]
    fn test_insert_empty_is_none() {
        assert!(builder(EmbeddingType::Dense, 3).insert(&[]).unwrap().is_none());
    }

    #[test]
    fn test_insert_single_row() {
        let entry = Entry {
            id: Some("a".to_string()),
            embedding: Embedding::Dense(vec![0.0, 0.5, 0.25]),
            chunk: Chunk::new("text", "c"),
        };
        let sql = builder(EmbeddingType::Dense, 3).insert(&[entry]).unwrap().unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"items\" (id, content, embedding, metadata) VALUES \
             ('a', 'c', '[0,0.5,0.25]'::vector, '{\"type\":\"text\"}'::jsonb)"
        );
    }

    #[test]
    fn test_insert_batches_rows_and_generates_ids() {
        let entries = vec![
            Entry::new(Embedding::Dense(vec![1.0]), Chunk::new("text", "one")),
            Entry::with_id("b", Embedding::Dense(vec![2.0]), Chunk::new("text", "two")),
        ];
        let sql = builder(EmbeddingType::Dense, 1).insert(&entries).unwrap().unwrap();
        assert_eq!(sql.matches("::vector").count(), 2);
        assert!(sql.contains("('b', 'two', '[2]'::vector"));
        assert!(sql.starts_with("INSERT INTO \"items\""));
    }

    #[test]
    fn test_insert_escapes_content_and_metadata() {
        let mut metadata = Map::new();
        metadata.insert("author".to_string(), json!("O'Brien"));
        let entry = Entry::with_id(
            "x'y",
            Embedding::Sparse(SparseVector::new(vec![0, 2], vec![0.5, 1.0])),
            Chunk::new("note", "don't").with_metadata(metadata),
        );
        let sql = builder(EmbeddingType::Sparse, 200).insert(&[entry]).unwrap().unwrap();
        assert!(sql.contains("'x''y'"));
        assert!(sql.contains("'don''t'"));
        assert!(sql.contains("'{1:0.5,3:1}/200'::sparsevec"));
        assert!(sql.contains("O''Brien"));
    }

    #[test]
    fn test_merged_metadata_overwrites_type() {
        let mut metadata = Map::new();
        metadata.insert("type".to_string(), json!("stale"));
        metadata.insert("page".to_string(), json!(3));
        let merged = merged_metadata(Some(&metadata), "text");
        assert_eq!(merged["type"], json!("text"));
        assert_eq!(merged["page"], json!(3));

        let bare = merged_metadata(None, "image");
        assert_eq!(bare.len(), 1);
    }

    #[test]
    fn test_delete_statements() {
        let b = builder(EmbeddingType::Dense, 3);
        assert_eq!(b.delete_one("a"), "DELETE FROM \"items\" WHERE id = 'a'");
        assert_eq!(
            b.delete_many(&["a".to_string(), "b'c".to_string()]).unwrap(),
            "DELETE FROM \"items\" WHERE id IN ('a', 'b''c')"
        );
        assert!(b.delete_many(&[]).is_none());
    }

    #[test]
    fn test_select_without_embedding() {
        let b = builder(EmbeddingType::Dense, 3);
        let columns = "id, content, embedding::text AS embedding, metadata::text AS metadata";

        assert_eq!(
            b.select(None, "", -1),
            format!("SELECT {} FROM \"items\"", columns)
        );
        assert_eq!(
            b.select(None, "", 5),
            format!("SELECT {} FROM \"items\" LIMIT 5", columns)
        );
        assert_eq!(
            b.select(None, "id = 'a'", -3),
            format!("SELECT {} FROM \"items\" WHERE id = 'a'", columns)
        );
    }

    #[test]
    fn test_select_dense_similarity() {
        let b = builder(EmbeddingType::Dense, 3);
        let query = Embedding::Dense(vec![0.0, 0.5, 0.25]);
        let sql = b.select(Some(&query), "\"id\" = 'a'", 10);

        let sim = "1 - (embedding <=> '[0,0.5,0.25]'::vector)";
        assert_eq!(
            sql,
            format!(
                "SELECT id, content, embedding::text AS embedding, metadata::text AS metadata, \
                 {sim} AS similarity FROM \"items\" WHERE ({sim}) IS NOT NULL AND ({sim}) != 'NaN' \
                 AND (\"id\" = 'a') ORDER BY similarity DESC LIMIT 10"
            )
        );
    }

    #[test]
    fn test_select_sparse_uses_two_stages() {
        let b = builder(EmbeddingType::Sparse, 200);
        let query = Embedding::Sparse(SparseVector::new(vec![0, 2], vec![1.0, 1.0]));
        let sql = b.select(Some(&query), "", 1);

        assert!(sql.starts_with("SELECT * FROM (SELECT id, content"));
        assert!(sql.contains("1 - (embedding <=> '{1:1,3:1}/200'::sparsevec) AS similarity FROM \"items\")"));
        assert!(sql.ends_with(
            "AS scored WHERE similarity IS NOT NULL AND similarity != 'NaN' ORDER BY similarity DESC LIMIT 1"
        ));
    }

    #[test]
    fn test_select_sparse_filter_goes_inside() {
        let b = builder(EmbeddingType::Sparse, 10);
        let query = Embedding::Sparse(SparseVector::new(vec![1], vec![1.0]));
        let sql = b.select(Some(&query), "metadata->>'lang' = 'en'", -1);
        assert!(sql.contains("FROM \"items\" WHERE metadata->>'lang' = 'en') AS scored"));
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn test_select_uses_configured_metric() {
        let b = StatementBuilder::new(&VectorStoreConfig {
            table_name: "items".to_string(),
            vector_dimension: 2,
            similarity_metric: SimilarityMetric::Euclidean,
            ..Default::default()
        });
        let sql = b.select(Some(&Embedding::Dense(vec![1.0, 2.0])), "", 3);
        assert!(sql.contains("embedding <-> '[1,2]'::vector"));
    }
}
