//! Deadline and retry decorators for the external services.
//!
//! The pipeline in `course-ta-core` calls its embedding, generation, and
//! index services without bounds. These wrappers add them:
//!
//! | Wrapper | Deadline | Retries |
//! |---------|----------|---------|
//! | [`TimedEmbedder`] | `embedding.timeout_secs` | one, when `retrieval.retry_reads` |
//! | [`TimedIndex`] (search only) | `retrieval.timeout_secs` | one, when `retrieval.retry_reads` |
//! | [`TimedGenerator`] | `generation.timeout_secs` | none |
//!
//! Generation is never repeated: a second completion may differ from the
//! first and costs tokens.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use course_ta_core::embedding::EmbeddingProvider;
use course_ta_core::generation::{GenerationProvider, GenerationRequest};
use course_ta_core::models::{IndexEntry, IndexHit};
use course_ta_core::store::{IndexError, IndexSpec, VectorIndex};

const RETRY_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{service} did not respond within {secs}s")]
    Timeout { service: &'static str, secs: u64 },
}

/// Run `call` under `deadline`, retrying once on error or timeout when
/// `retry` is set.
async fn bounded<T, E, F, Fut>(
    service: &'static str,
    deadline: Duration,
    retry: bool,
    mut call: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<GatewayError> + std::fmt::Display,
{
    let attempts = if retry { 2 } else { 1 };
    let mut attempt = 0;
    loop {
        attempt += 1;
        let result = match tokio::time::timeout(deadline, call()).await {
            Ok(result) => result,
            Err(_) => Err(E::from(GatewayError::Timeout {
                service,
                secs: deadline.as_secs(),
            })),
        };
        match result {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                tracing::warn!(service, error = %e, "call failed, retrying once");
                tokio::time::sleep(RETRY_DELAY).await;
            }
            Err(e) => return Err(e),
        }
    }
}

impl From<GatewayError> for IndexError {
    fn from(e: GatewayError) -> Self {
        IndexError::Backend(e.to_string())
    }
}

/// [`EmbeddingProvider`] with a deadline and an optional single retry.
pub struct TimedEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    deadline: Duration,
    retry: bool,
}

impl TimedEmbedder {
    pub fn new(inner: Arc<dyn EmbeddingProvider>, deadline: Duration, retry: bool) -> Self {
        Self {
            inner,
            deadline,
            retry,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for TimedEmbedder {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
    fn dims(&self) -> usize {
        self.inner.dims()
    }
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        bounded("embedding service", self.deadline, self.retry, || {
            self.inner.embed(text)
        })
        .await
    }
}

/// [`GenerationProvider`] with a deadline. Never retried.
pub struct TimedGenerator {
    inner: Arc<dyn GenerationProvider>,
    deadline: Duration,
}

impl TimedGenerator {
    pub fn new(inner: Arc<dyn GenerationProvider>, deadline: Duration) -> Self {
        Self { inner, deadline }
    }
}

#[async_trait]
impl GenerationProvider for TimedGenerator {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String> {
        bounded("generation service", self.deadline, false, || {
            self.inner.generate(request)
        })
        .await
    }
}

/// [`VectorIndex`] whose searches are bounded. Writes pass through.
pub struct TimedIndex {
    inner: Arc<dyn VectorIndex>,
    deadline: Duration,
    retry: bool,
}

impl TimedIndex {
    pub fn new(inner: Arc<dyn VectorIndex>, deadline: Duration, retry: bool) -> Self {
        Self {
            inner,
            deadline,
            retry,
        }
    }
}

#[async_trait]
impl VectorIndex for TimedIndex {
    async fn reset(&self, name: &str, spec: &IndexSpec) -> Result<(), IndexError> {
        self.inner.reset(name, spec).await
    }

    async fn add(&self, name: &str, entry: IndexEntry) -> Result<(), IndexError> {
        self.inner.add(name, entry).await
    }

    async fn search(
        &self,
        name: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<IndexHit>, IndexError> {
        bounded("vector index", self.deadline, self.retry, || async move {
            match self.inner.search(name, vector, k).await {
                // Deterministic failures are not worth a second attempt.
                Err(
                    e @ (IndexError::Missing(_)
                    | IndexError::DimensionMismatch { .. }
                    | IndexError::NonFinite(_)),
                ) => {
                    Ok(Err(e))
                }
                other => other.map(Ok),
            }
        })
        .await?
    }

    async fn count(&self, name: &str) -> Result<usize, IndexError> {
        self.inner.count(name).await
    }

    async fn describe(&self, name: &str) -> Result<Option<IndexSpec>, IndexError> {
        self.inner.describe(name).await
    }
}
