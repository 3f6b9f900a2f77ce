//! Embedding representations
//!
//! A store holds either dense or sparse embeddings, never both. The kind is
//! fixed when the store is configured and drives the column type, the
//! operator class of the similarity index and the text codec used on the wire.

pub mod codec;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

pub use codec::CodecError;

/// A sparse vector: explicitly present positions paired with their values
///
/// `indices` are zero-based and must lie within the store's dimension.
/// `values[i]` belongs to `indices[i]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseVector {
    pub fn new(indices: Vec<u32>, values: Vec<f32>) -> Self {
        Self { indices, values }
    }

    /// Number of explicitly present positions
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Positions in `[0, dimension)` that are not explicitly present, ascending
    ///
    /// Walks the range lazily against the sorted present indices, so only
    /// `nnz` positions are buffered.
    pub fn implicit_zeros(&self, dimension: usize) -> impl Iterator<Item = u32> {
        let mut present: Vec<u32> = self
            .indices
            .iter()
            .copied()
            .filter(|&idx| (idx as usize) < dimension)
            .collect();
        present.sort_unstable();
        present.dedup();

        let mut present = present.into_iter().peekable();
        let upper = u32::try_from(dimension).unwrap_or(u32::MAX);
        (0..upper).filter(move |idx| present.next_if_eq(idx).is_none())
    }
}

/// An embedding submitted to or returned from the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum Embedding {
    Dense(Vec<f32>),
    Sparse(SparseVector),
}

impl Embedding {
    pub fn kind(&self) -> EmbeddingType {
        match self {
            Embedding::Dense(_) => EmbeddingType::Dense,
            Embedding::Sparse(_) => EmbeddingType::Sparse,
        }
    }

    /// Check the embedding against a store's dimension
    ///
    /// Returns a human-readable reason on failure.
    pub fn check_dimension(&self, dimension: usize) -> Result<(), String> {
        match self {
            Embedding::Dense(values) => {
                if values.len() != dimension {
                    return Err(format!(
                        "dense embedding has {} components, expected {}",
                        values.len(),
                        dimension
                    ));
                }
            }
            Embedding::Sparse(sparse) => {
                if sparse.indices.len() != sparse.values.len() {
                    return Err(format!(
                        "sparse embedding has {} indices but {} values",
                        sparse.indices.len(),
                        sparse.values.len()
                    ));
                }
                let mut seen = HashSet::with_capacity(sparse.indices.len());
                for &idx in &sparse.indices {
                    if idx as usize >= dimension {
                        return Err(format!(
                            "sparse index {} is outside [0, {})",
                            idx, dimension
                        ));
                    }
                    if !seen.insert(idx) {
                        return Err(format!("sparse index {} is repeated", idx));
                    }
                }
            }
        }
        Ok(())
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Embedding::Dense(values)
    }
}

impl From<SparseVector> for Embedding {
    fn from(sparse: SparseVector) -> Self {
        Embedding::Sparse(sparse)
    }
}

/// Embedding kind a store is configured for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingType {
    #[default]
    Dense,
    Sparse,
}

impl EmbeddingType {
    /// pgvector column type name
    pub fn pg_type(&self) -> &'static str {
        match self {
            EmbeddingType::Dense => "vector",
            EmbeddingType::Sparse => "sparsevec",
        }
    }

    /// Column type with its fixed width, e.g. `vector(384)`
    pub fn column_type(&self, dimension: usize) -> String {
        format!("{}({})", self.pg_type(), dimension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingType::Dense => "dense",
            EmbeddingType::Sparse => "sparse",
        }
    }
}

impl fmt::Display for EmbeddingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dense" | "vector" => Ok(EmbeddingType::Dense),
            "sparse" | "sparsevec" => Ok(EmbeddingType::Sparse),
            other => Err(format!("unknown embedding type: {}", other)),
        }
    }
}
