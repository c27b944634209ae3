//! In-memory [`VectorIndex`] implementation for testing and embedding in
//! other processes.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock` for thread safety.
//! Search is brute-force cosine similarity over all stored vectors.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{by_score, IndexEntry, IndexHit};

use super::{check_vector, IndexError, IndexSpec, VectorIndex};

struct Collection {
    spec: IndexSpec,
    /// Entries in insertion order.
    entries: Vec<IndexEntry>,
}

/// In-memory vector index.
pub struct InMemoryIndex {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> IndexError {
    IndexError::Backend(e.to_string())
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn reset(&self, name: &str, spec: &IndexSpec) -> Result<(), IndexError> {
        if spec.dims == 0 {
            return Err(IndexError::InvalidSpec("dims must be > 0".to_string()));
        }
        let mut cols = self.collections.write().map_err(poisoned)?;
        cols.insert(
            name.to_string(),
            Collection {
                spec: spec.clone(),
                entries: Vec::new(),
            },
        );
        Ok(())
    }

    async fn add(&self, name: &str, entry: IndexEntry) -> Result<(), IndexError> {
        let mut cols = self.collections.write().map_err(poisoned)?;
        let col = cols
            .get_mut(name)
            .ok_or_else(|| IndexError::Missing(name.to_string()))?;
        check_vector(name, &col.spec, &entry.vector)?;
        col.entries.retain(|e| e.id != entry.id);
        col.entries.push(entry);
        Ok(())
    }

    async fn search(
        &self,
        name: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<IndexHit>, IndexError> {
        let cols = self.collections.read().map_err(poisoned)?;
        let col = cols
            .get(name)
            .ok_or_else(|| IndexError::Missing(name.to_string()))?;
        check_vector(name, &col.spec, vector)?;

        let mut hits: Vec<IndexHit> = col
            .entries
            .iter()
            .map(|e| IndexHit {
                id: e.id.clone(),
                body: e.body.clone(),
                metadata: e.metadata.clone(),
                score: cosine_similarity(vector, &e.vector),
            })
            .collect();
        // sort_by is stable: equal scores keep insertion order.
        hits.sort_by(by_score);
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self, name: &str) -> Result<usize, IndexError> {
        let cols = self.collections.read().map_err(poisoned)?;
        cols.get(name)
            .map(|c| c.entries.len())
            .ok_or_else(|| IndexError::Missing(name.to_string()))
    }

    async fn describe(&self, name: &str) -> Result<Option<IndexSpec>, IndexError> {
        let cols = self.collections.read().map_err(poisoned)?;
        Ok(cols.get(name).map(|c| c.spec.clone()))
    }
}
