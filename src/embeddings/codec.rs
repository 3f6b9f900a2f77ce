//! Text codecs for pgvector values
//!
//! Dense vectors travel as `[0.1,0.2,0.3]`. Sparse vectors travel as
//! `{1:0.3,5:1.2}/200`: one-based `index:value` pairs followed by the full
//! dimension.

use thiserror::Error;

use super::{Embedding, EmbeddingType, SparseVector};

/// Errors raised while decoding vector text
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("malformed {kind} vector text: {text:?}")]
    Malformed { kind: &'static str, text: String },

    #[error("invalid number {0:?}")]
    ParseError(String),

    #[error("sparse index {index} is outside [1, {dimension}]")]
    IndexOutOfRange { index: u64, dimension: usize },

    #[error("vector text declares dimension {found}, expected {expected}")]
    DimensionMismatch { expected: usize, found: usize },
}

/// Encode a dense vector, e.g. `[0,0.5,0.25]`
pub fn serialize_dense(values: &[f32]) -> String {
    let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

/// Decode a dense vector from its text form
pub fn deserialize_dense(text: &str, dimension: usize) -> Result<Vec<f32>, CodecError> {
    let inner = text
        .trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| CodecError::Malformed {
            kind: "dense",
            text: text.to_string(),
        })?;

    if inner.trim().is_empty() {
        return check_dense_len(Vec::new(), dimension);
    }

    let values = inner
        .split(',')
        .map(parse_number)
        .collect::<Result<Vec<f32>, _>>()?;

    check_dense_len(values, dimension)
}

fn check_dense_len(values: Vec<f32>, dimension: usize) -> Result<Vec<f32>, CodecError> {
    if values.len() != dimension {
        return Err(CodecError::DimensionMismatch {
            expected: dimension,
            found: values.len(),
        });
    }
    Ok(values)
}

/// Encode a sparse vector, e.g. `{1:0.3,3:1.2}/200`
///
/// Pairs are emitted in the order of `sparse.indices`, shifted to one-based.
pub fn serialize_sparse(sparse: &SparseVector, dimension: usize) -> String {
    let pairs: Vec<String> = sparse
        .indices
        .iter()
        .zip(sparse.values.iter())
        .map(|(idx, value)| format!("{}:{}", u64::from(*idx) + 1, value))
        .collect();
    format!("{{{}}}/{}", pairs.join(","), dimension)
}

/// Decode a sparse vector from its text form
///
/// Returns the explicitly listed positions (zero-based) paired with their
/// values, in text order. Positions not listed are implicit zeros, see
/// [`SparseVector::implicit_zeros`].
pub fn deserialize_sparse(text: &str, dimension: usize) -> Result<SparseVector, CodecError> {
    let malformed = || CodecError::Malformed {
        kind: "sparse",
        text: text.to_string(),
    };

    let trimmed = text.trim();
    let (body, declared) = match trimmed.rsplit_once('/') {
        Some((body, dim)) => (body, Some(dim)),
        None => (trimmed, None),
    };

    if let Some(dim) = declared {
        let found: usize = dim
            .trim()
            .parse()
            .map_err(|_| CodecError::ParseError(dim.trim().to_string()))?;
        if found != dimension {
            return Err(CodecError::DimensionMismatch {
                expected: dimension,
                found,
            });
        }
    }

    let inner = body
        .trim()
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or_else(malformed)?;

    let mut sparse = SparseVector::default();
    if inner.trim().is_empty() {
        return Ok(sparse);
    }

    for pair in inner.split(',') {
        let (idx, value) = pair.split_once(':').ok_or_else(malformed)?;
        let one_based: u64 = idx
            .trim()
            .parse()
            .map_err(|_| CodecError::ParseError(idx.trim().to_string()))?;
        if one_based == 0 || one_based > dimension as u64 {
            return Err(CodecError::IndexOutOfRange {
                index: one_based,
                dimension,
            });
        }
        sparse.indices.push((one_based - 1) as u32);
        sparse.values.push(parse_number(value)?);
    }

    Ok(sparse)
}

/// Encode any embedding with the codec matching its kind
pub fn serialize(embedding: &Embedding, dimension: usize) -> String {
    match embedding {
        Embedding::Dense(values) => serialize_dense(values),
        Embedding::Sparse(sparse) => serialize_sparse(sparse, dimension),
    }
}

/// Decode embedding text produced by a column of the given kind
pub fn deserialize(
    kind: EmbeddingType,
    text: &str,
    dimension: usize,
) -> Result<Embedding, CodecError> {
    match kind {
        EmbeddingType::Dense => deserialize_dense(text, dimension).map(Embedding::Dense),
        EmbeddingType::Sparse => deserialize_sparse(text, dimension).map(Embedding::Sparse),
    }
}

fn parse_number(token: &str) -> Result<f32, CodecError> {
    let token = token.trim();
    token
        .parse::<f32>()
        .map_err(|_| CodecError::ParseError(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_dense() {
        assert_eq!(serialize_dense(&[0.0, 0.5, 0.25]), "[0,0.5,0.25]");
        assert_eq!(serialize_dense(&[]), "[]");
    }

    #[test]
    fn test_deserialize_dense() {
        let values = deserialize_dense("[0,0.5,0.25]", 3).unwrap();
        assert_eq!(values, vec![0.0, 0.5, 0.25]);

        let spaced = deserialize_dense(" [1, -2.5, 3e-2] ", 3).unwrap();
        assert_eq!(spaced, vec![1.0, -2.5, 0.03]);
    }

    #[test]
    fn test_deserialize_dense_errors() {
        assert!(matches!(
            deserialize_dense("0,1", 2),
            Err(CodecError::Malformed { .. })
        ));
        assert_eq!(
            deserialize_dense("[0,abc]", 2),
            Err(CodecError::ParseError("abc".to_string()))
        );
        assert_eq!(
            deserialize_dense("[0,1]", 3),
            Err(CodecError::DimensionMismatch {
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn test_serialize_sparse_is_one_based() {
        let sparse = SparseVector::new(vec![0, 4], vec![0.3, 1.2]);
        assert_eq!(serialize_sparse(&sparse, 200), "{1:0.3,5:1.2}/200");
    }

    #[test]
    fn test_serialize_sparse_keeps_given_order() {
        let sparse = SparseVector::new(vec![9, 2], vec![1.0, 2.0]);
        assert_eq!(serialize_sparse(&sparse, 10), "{10:1,3:2}/10");
    }

    #[test]
    fn test_serialize_empty_sparse() {
        assert_eq!(serialize_sparse(&SparseVector::default(), 7), "{}/7");
    }

    #[test]
    fn test_sparse_round_trip_keeps_listed_pairs() {
        let original = SparseVector::new(vec![0, 2], vec![0.5, 0.25]);
        let text = serialize_sparse(&original, 200);
        let decoded = deserialize_sparse(&text, 200).unwrap();

        assert_eq!(decoded, original);
        let zeros: Vec<u32> = decoded.implicit_zeros(200).collect();
        assert_eq!(zeros.len(), 198);
        assert!(!zeros.contains(&0));
        assert!(!zeros.contains(&2));
    }

    #[test]
    fn test_deserialize_sparse_without_suffix() {
        let decoded = deserialize_sparse("{2:1.5}", 4).unwrap();
        assert_eq!(decoded.indices, vec![1]);
        assert_eq!(decoded.values, vec![1.5]);
    }

    #[test]
    fn test_deserialize_sparse_errors() {
        assert_eq!(
            deserialize_sparse("{1:x}/3", 3),
            Err(CodecError::ParseError("x".to_string()))
        );
        assert_eq!(
            deserialize_sparse("{a:1}/3", 3),
            Err(CodecError::ParseError("a".to_string()))
        );
        assert_eq!(
            deserialize_sparse("{0:1}/3", 3),
            Err(CodecError::IndexOutOfRange {
                index: 0,
                dimension: 3
            })
        );
        assert_eq!(
            deserialize_sparse("{4:1}/3", 3),
            Err(CodecError::IndexOutOfRange {
                index: 4,
                dimension: 3
            })
        );
        assert_eq!(
            deserialize_sparse("{1:1}/5", 3),
            Err(CodecError::DimensionMismatch {
                expected: 3,
                found: 5
            })
        );
        assert!(matches!(
            deserialize_sparse("1:1/3", 3),
            Err(CodecError::Malformed { .. })
        ));
    }

    #[test]
    fn test_dispatch_by_kind() {
        let dense = deserialize(EmbeddingType::Dense, "[1,2]", 2).unwrap();
        assert_eq!(dense, Embedding::Dense(vec![1.0, 2.0]));

        let sparse = deserialize(EmbeddingType::Sparse, "{2:3}/4", 4).unwrap();
        assert_eq!(sparse, Embedding::Sparse(SparseVector::new(vec![1], vec![3.0])));

        assert_eq!(serialize(&dense, 2), "[1,2]");
        assert_eq!(serialize(&sparse, 4), "{2:3}/4");
    }
}
