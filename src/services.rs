//! Service handles shared by every command.
//!
//! [`Services`] is built once at startup from the [`Config`]: it opens the
//! vector index, creates the embedding and generation providers, wraps them
//! in the [`gateway`](crate::gateway) deadline decorators, and hands out the
//! core pipeline objects. Nothing here is global; tests assemble a
//! `Services` around in-memory fakes with [`Services::assemble`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use course_ta_core::embedding::EmbeddingProvider;
use course_ta_core::generation::GenerationProvider;
use course_ta_core::indexer::Indexer;
use course_ta_core::orchestrator::AnswerOrchestrator;
use course_ta_core::retriever::Retriever;
use course_ta_core::store::{IndexSpec, VectorIndex};

use crate::config::Config;
use crate::embedding::create_provider;
use crate::gateway::{TimedEmbedder, TimedGenerator, TimedIndex};
use crate::generation::create_generator;
use crate::sqlite_index::SqliteIndex;

pub struct Services {
    config: Config,
    /// Unbounded index handle used for writes and stats.
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    orchestrator: Arc<AnswerOrchestrator>,
    sqlite: Option<Arc<SqliteIndex>>,
}

impl Services {
    /// Open the SQLite index and build the configured providers.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let sqlite = Arc::new(SqliteIndex::open(config).await?);
        let embedder = create_provider(&config.embedding)?;
        let generator = create_generator(&config.generation)?;
        tracing::debug!(
            db = %config.db.path.display(),
            embedding = embedder.model_name(),
            generation = generator.model_name(),
            "services ready"
        );

        let mut services = Self::assemble(config.clone(), sqlite.clone(), embedder, generator);
        services.sqlite = Some(sqlite);
        Ok(services)
    }

    /// Wire caller-supplied backends together with the configured deadlines.
    pub fn assemble(
        config: Config,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Self {
        let retry = config.retrieval.retry_reads;
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(TimedEmbedder::new(
            embedder,
            Duration::from_secs(config.embedding.timeout_secs),
            retry,
        ));
        let generator: Arc<dyn GenerationProvider> = Arc::new(TimedGenerator::new(
            generator,
            Duration::from_secs(config.generation.timeout_secs),
        ));
        let read_index: Arc<dyn VectorIndex> = Arc::new(TimedIndex::new(
            index.clone(),
            Duration::from_secs(config.retrieval.timeout_secs),
            retry,
        ));

        let retriever = Retriever::new(read_index, config.index.name.clone());
        let orchestrator = Arc::new(AnswerOrchestrator::new(
            embedder.clone(),
            retriever,
            generator,
            config.answer_settings(),
        ));

        Self {
            config,
            index,
            embedder,
            orchestrator,
            sqlite: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn index(&self) -> Arc<dyn VectorIndex> {
        self.index.clone()
    }

    pub fn embedder(&self) -> Arc<dyn EmbeddingProvider> {
        self.embedder.clone()
    }

    pub fn orchestrator(&self) -> Arc<AnswerOrchestrator> {
        self.orchestrator.clone()
    }

    pub fn indexer(&self) -> Indexer {
        Indexer::new(self.index.clone(), self.embedder.clone())
            .with_min_length(self.config.index.min_length)
    }

    /// Compare the built index with the configured embedding model.
    ///
    /// Logs a warning when the index is missing or was built with a
    /// different model or dimensionality; queries would then return the
    /// canned empty answer or a degraded error answer.
    pub async fn check_index(&self) -> Result<Option<IndexSpec>> {
        let name = &self.config.index.name;
        let spec = self.index.describe(name).await?;
        match &spec {
            None => {
                tracing::warn!(index = %name, "index has not been built yet; run `course-ta index`")
            }
            Some(built) => {
                if built.model != self.embedder.model_name() || built.dims != self.embedder.dims() {
                    tracing::warn!(
                        index = %name,
                        built_model = %built.model,
                        built_dims = built.dims,
                        configured_model = self.embedder.model_name(),
                        configured_dims = self.embedder.dims(),
                        "index was built with a different embedding model; rebuild it"
                    );
                } else {
                    tracing::info!(index = %name, model = %built.model, dims = built.dims, "index ok");
                }
            }
        }
        Ok(spec)
    }

    /// Close the database pool, if one was opened.
    pub async fn shutdown(&self) {
        if let Some(sqlite) = &self.sqlite {
            sqlite.close().await;
        }
    }
}
