//! Full-rebuild indexing.
//!
//! [`Indexer::rebuild`] drops the named index, then normalizes, embeds, and
//! inserts every record in input order. Per-record failures are counted in
//! [`IndexStats`] and never abort the batch; only failing to reset the index
//! is fatal.
//!
//! While a rebuild runs, the index is missing or partially populated.
//! Readers treat that as an empty result.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::embedding::{is_finite, EmbeddingProvider};
use crate::models::{IndexEntry, IndexStats, RawRecord, Source};
use crate::normalize::{normalize_with, MIN_LENGTH};
use crate::store::{IndexError, IndexSpec, VectorIndex};

/// Outcome of indexing one record, reported to an [`IndexProgress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Indexed,
    /// Empty or too-short body.
    Rejected,
    /// Embedding or insert failure, with a short reason.
    Failed(String),
}

/// A single progress event during a rebuild.
#[derive(Debug, Clone)]
pub enum IndexEvent {
    /// The index was reset and `total` records are about to be processed.
    Started { index: String, total: usize },
    /// Record `n` (1-based) of `total` was processed.
    Record {
        n: usize,
        total: usize,
        title: String,
        outcome: RecordOutcome,
    },
    /// The rebuild is complete.
    Finished { stats: IndexStats },
}

/// Receives rebuild progress. Implementations must not block for long.
pub trait IndexProgress: Send + Sync {
    fn report(&self, event: IndexEvent);
}

/// Reporter that discards every event.
pub struct NoProgress;

impl IndexProgress for NoProgress {
    fn report(&self, _event: IndexEvent) {}
}

/// Stable document id: `{source}-{sequence:05}-{sha256(title)[..8]}`.
///
/// Uniqueness within a rebuild comes from the sequence index; the title
/// hash only makes ids readable across runs.
pub fn document_id(source: &Source, sequence: usize, title: &str) -> String {
    let digest = Sha256::digest(title.as_bytes());
    let hash = hex::encode(digest);
    format!("{}-{:05}-{}", source, sequence, &hash[..8])
}

/// Drives normalization and embedding to populate a [`VectorIndex`].
pub struct Indexer {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    min_length: usize,
}

impl Indexer {
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            index,
            embedder,
            min_length: MIN_LENGTH,
        }
    }

    /// Override the minimum normalized body length (default [`MIN_LENGTH`]).
    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    /// Rebuild `index_name` from `records`, discarding the previous generation.
    pub async fn rebuild(
        &self,
        index_name: &str,
        records: &[RawRecord],
    ) -> Result<IndexStats, IndexError> {
        self.rebuild_with_progress(index_name, records, &NoProgress)
            .await
    }

    /// Like [`rebuild`](Self::rebuild), reporting each record to `progress`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the embedding provider reports zero
    /// dimensions or the index cannot be reset.
    pub async fn rebuild_with_progress(
        &self,
        index_name: &str,
        records: &[RawRecord],
        progress: &dyn IndexProgress,
    ) -> Result<IndexStats, IndexError> {
        let spec = IndexSpec {
            model: self.embedder.model_name().to_string(),
            dims: self.embedder.dims(),
        };
        if spec.dims == 0 {
            return Err(IndexError::InvalidSpec(format!(
                "embedding model '{}' reports 0 dimensions",
                spec.model
            )));
        }

        self.index.reset(index_name, &spec).await?;
        tracing::info!(
            index = index_name,
            model = %spec.model,
            dims = spec.dims,
            records = records.len(),
            "index reset, rebuilding"
        );

        let total = records.len();
        progress.report(IndexEvent::Started {
            index: index_name.to_string(),
            total,
        });

        let mut stats = IndexStats::default();
        for (seq, record) in records.iter().enumerate() {
            stats.attempted += 1;
            let outcome = self.index_one(index_name, &spec, seq, record).await;
            match &outcome {
                RecordOutcome::Indexed => stats.indexed += 1,
                RecordOutcome::Rejected => stats.rejected += 1,
                RecordOutcome::Failed(reason) => {
                    tracing::warn!(doc = seq, error = %reason, "skipping document");
                    stats.failed += 1;
                }
            }
            progress.report(IndexEvent::Record {
                n: seq + 1,
                total,
                title: record.title.clone().unwrap_or_default(),
                outcome,
            });
        }
        stats.skipped = stats.rejected + stats.failed;

        tracing::info!(
            index = index_name,
            attempted = stats.attempted,
            indexed = stats.indexed,
            skipped = stats.skipped,
            "rebuild finished"
        );
        progress.report(IndexEvent::Finished { stats });
        Ok(stats)
    }

    async fn index_one(
        &self,
        index_name: &str,
        spec: &IndexSpec,
        seq: usize,
        record: &RawRecord,
    ) -> RecordOutcome {
        let Some(body) = normalize_with(record.body(), self.min_length) else {
            tracing::debug!(doc = seq, "body empty or too short");
            return RecordOutcome::Rejected;
        };

        let vector = match self.embedder.embed(&body).await {
            Ok(v) => v,
            Err(e) => return RecordOutcome::Failed(format!("embedding failed: {e}")),
        };
        if vector.len() != spec.dims {
            return RecordOutcome::Failed(format!(
                "embedding has {} dimensions, expected {}",
                vector.len(),
                spec.dims
            ));
        }
        if !is_finite(&vector) {
            return RecordOutcome::Failed("embedding contains non-finite values".to_string());
        }

        let metadata = record.metadata();
        let id = document_id(&metadata.source, seq, &metadata.title);
        tracing::debug!(doc = seq, id = %id, "indexing");
        let entry = IndexEntry {
            id,
            vector,
            body,
            metadata,
        };
        match self.index.add(index_name, entry).await {
            Ok(()) => RecordOutcome::Indexed,
            Err(e) => RecordOutcome::Failed(format!("insert failed: {e}")),
        }
    }
}
