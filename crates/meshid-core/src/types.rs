use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque identity key. Orders ties in identification results.
pub type IdentityId = i64;

/// Two non-degenerate embeddings of different length were compared.
///
/// Meshes share a fixed topology, so this always indicates a caller bug.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("embedding dimension mismatch: {left} vs {right}")]
pub struct DimensionMismatchError {
    pub left: usize,
    pub right: usize,
}

/// Mesh embedding: a unit-length vector of `3 * N` values (vertex-major,
/// xyz-interleaved), or the degenerate sentinel.
///
/// Serializes as a plain numeric array. The degenerate embedding is `[]`;
/// deserializing an empty, all-zero, or non-finite array yields it.
///
/// Build from raw values with `Embedding::from(Vec<f32>)`, which applies
/// those rules. `Embedding::Vector` can be constructed directly, but a zero
/// or non-finite vector built that way is still treated as degenerate by
/// [`is_degenerate`](Self::is_degenerate) and [`similarity`](Self::similarity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<f32>", into = "Vec<f32>")]
pub enum Embedding {
    Vector(Vec<f32>),
    /// Produced when the source mesh was degenerate or malformed.
    /// Never matches anything.
    Degenerate,
}

impl Embedding {
    /// True for the sentinel, and for a zero or non-finite vector built
    /// directly as [`Embedding::Vector`].
    pub fn is_degenerate(&self) -> bool {
        match self {
            Embedding::Vector(values) => {
                values.iter().all(|&v| v == 0.0) || values.iter().any(|v| !v.is_finite())
            }
            Embedding::Degenerate => true,
        }
    }

    /// Raw values; empty for the degenerate embedding.
    pub fn values(&self) -> &[f32] {
        match self {
            Embedding::Vector(values) => values,
            Embedding::Degenerate => &[],
        }
    }

    pub fn dim(&self) -> usize {
        self.values().len()
    }

    /// L2 norm of the values (0.0 when degenerate).
    pub fn norm(&self) -> f32 {
        self.values()
            .iter()
            .map(|&v| f64::from(v) * f64::from(v))
            .sum::<f64>()
            .sqrt() as f32
    }

    /// Compute cosine similarity between two embeddings.
    ///
    /// Returns a value in [-1, 1]. Higher = more similar. A degenerate
    /// embedding on either side scores exactly 0.0, whatever the other
    /// side's length. Accumulates in f64 and always processes all dimensions.
    pub fn similarity(&self, other: &Embedding) -> Result<f32, DimensionMismatchError> {
        if self.is_degenerate() || other.is_degenerate() {
            return Ok(0.0);
        }
        let (a, b) = (self.values(), other.values());
        if a.len() != b.len() {
            return Err(DimensionMismatchError {
                left: a.len(),
                right: b.len(),
            });
        }

        let mut dot = 0.0f64;
        let mut norm_a = 0.0f64;
        let mut norm_b = 0.0f64;

        for (&x, &y) in a.iter().zip(b.iter()) {
            let (x, y) = (f64::from(x), f64::from(y));
            dot += x * y;
            norm_a += x * x;
            norm_b += y * y;
        }

        // sqrt(|a|² |b|²) rather than |a| * |b|, so self-similarity is exactly 1.
        let denom = (norm_a * norm_b).sqrt();
        if denom > 0.0 {
            Ok((dot / denom).clamp(-1.0, 1.0) as f32)
        } else {
            Ok(0.0)
        }
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        let zero = values.iter().all(|&v| v == 0.0);
        let malformed = values.iter().any(|v| !v.is_finite());
        if zero || malformed {
            Embedding::Degenerate
        } else {
            Embedding::Vector(values)
        }
    }
}

impl From<Embedding> for Vec<f32> {
    fn from(embedding: Embedding) -> Self {
        match embedding {
            Embedding::Vector(values) => values,
            Embedding::Degenerate => Vec::new(),
        }
    }
}

/// Cosine similarity between two embeddings. See [`Embedding::similarity`].
pub fn similarity(a: &Embedding, b: &Embedding) -> Result<f32, DimensionMismatchError> {
    a.similarity(b)
}

/// A stored identity: who the embedding belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id: IdentityId,
    pub name: String,
    pub embedding: Embedding,
    /// RFC 3339 registration time, assigned by the store.
    pub created_at: String,
}

/// Result of comparing a probe against a single reference embedding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchResult {
    /// Cosine similarity [-1, 1].
    pub similarity: f32,
    pub matched: bool,
}

/// One ranked entry of an identification result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub id: IdentityId,
    pub name: String,
    pub similarity: f32,
    /// Whether `similarity` clears the match threshold.
    pub matched: bool,
}
