//! Nearest-neighbor retrieval over a named [`VectorIndex`].
//!
//! The retriever delegates scoring to the index (cosine similarity, fixed
//! at build time) and guarantees the [`QueryResult`] invariants: scores are
//! non-increasing, ties keep index order, and the length never exceeds `k`.

use std::sync::Arc;

use crate::models::QueryResult;
use crate::store::{IndexError, VectorIndex};

/// Number of passages retrieved per question.
pub const DEFAULT_TOP_K: usize = 3;

/// Reads ranked passages from one named index.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    index_name: String,
}

impl Retriever {
    pub fn new(index: Arc<dyn VectorIndex>, index_name: impl Into<String>) -> Self {
        Self {
            index,
            index_name: index_name.into(),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Fetch the `k` documents nearest to `query_vector`.
    ///
    /// A missing index yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DimensionMismatch`] when the query vector was
    /// produced by a model other than the one the index was built with, and
    /// [`IndexError::Backend`] for storage failures.
    pub async fn search(&self, query_vector: &[f32], k: usize) -> Result<QueryResult, IndexError> {
        if k == 0 {
            return Ok(QueryResult::empty());
        }
        match self.index.search(&self.index_name, query_vector, k).await {
            Ok(hits) => {
                let result = QueryResult::ranked(hits, k);
                tracing::debug!(index = %self.index_name, hits = result.len(), "retrieved");
                Ok(result)
            }
            Err(IndexError::Missing(name)) => {
                tracing::debug!(index = %name, "index missing, treating as empty");
                Ok(QueryResult::empty())
            }
            Err(e) => Err(e),
        }
    }
}
