//! Vector index abstraction for Course TA.
//!
//! The [`VectorIndex`] trait defines the storage operations needed by the
//! indexer and retriever, enabling pluggable backends (SQLite, in-memory).
//! Every operation is scoped to a named index so a new generation can be
//! built next to an old one.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embedding::is_finite;
use crate::models::{IndexEntry, IndexHit};

/// Errors raised by vector index backends.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The named index does not exist (never built, or mid-rebuild).
    #[error("index '{0}' not found")]
    Missing(String),

    /// A vector's length does not match the index generation's dimensionality.
    #[error("dimension mismatch for index '{index}': expected {expected}, got {actual}")]
    DimensionMismatch {
        index: String,
        expected: usize,
        actual: usize,
    },

    /// A vector contains NaN or an infinity.
    #[error("non-finite vector value for index '{0}'")]
    NonFinite(String),

    /// The spec handed to `reset` cannot describe a usable index.
    #[error("invalid index spec: {0}")]
    InvalidSpec(String),

    /// Any failure of the underlying storage engine.
    #[error("index backend error: {0}")]
    Backend(String),
}

/// Embedding model and dimensionality an index generation was built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub model: String,
    pub dims: usize,
}

/// Check a stored or query vector against the index generation.
pub fn check_vector(index: &str, spec: &IndexSpec, vector: &[f32]) -> Result<(), IndexError> {
    if vector.len() != spec.dims {
        return Err(IndexError::DimensionMismatch {
            index: index.to_string(),
            expected: spec.dims,
            actual: vector.len(),
        });
    }
    if !is_finite(vector) {
        return Err(IndexError::NonFinite(index.to_string()));
    }
    Ok(())
}

/// Abstract nearest-neighbor store.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`reset`](VectorIndex::reset) | Drop the named index and create it empty |
/// | [`add`](VectorIndex::add) | Insert one entry |
/// | [`search`](VectorIndex::search) | Top-k entries by cosine similarity |
/// | [`count`](VectorIndex::count) | Number of entries |
/// | [`describe`](VectorIndex::describe) | Spec of the current generation |
///
/// `search` must return hits with non-increasing scores, breaking ties by
/// insertion order. `add` and `search` reject vectors that fail
/// [`check_vector`].
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Drop `name` if it exists and create it empty with `spec`.
    async fn reset(&self, name: &str, spec: &IndexSpec) -> Result<(), IndexError>;

    /// Insert an entry. The vector must have `spec.dims` finite components.
    async fn add(&self, name: &str, entry: IndexEntry) -> Result<(), IndexError>;

    /// Return at most `k` entries nearest to `vector`.
    async fn search(&self, name: &str, vector: &[f32], k: usize)
        -> Result<Vec<IndexHit>, IndexError>;

    /// Number of entries in `name`.
    async fn count(&self, name: &str) -> Result<usize, IndexError>;

    /// Spec of `name`, or `None` when the index does not exist.
    async fn describe(&self, name: &str) -> Result<Option<IndexSpec>, IndexError>;
}
