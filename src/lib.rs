//! pgvector store - similarity search over PostgreSQL
//!
//! Library modules for the vector store adapter

pub mod config;
pub mod embeddings;
pub mod vector_store;

pub use embeddings::{Embedding, EmbeddingType, SparseVector};
pub use vector_store::{
    Chunk, Entry, Match, QuerySpec, VectorStore, VectorStoreConfig, VectorStoreError,
};
