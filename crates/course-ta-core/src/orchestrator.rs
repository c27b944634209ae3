//! End-to-end question answering.
//!
//! [`AnswerOrchestrator::answer`] runs embed → retrieve → compose →
//! generate and maps every failure to a well-formed [`Answer`]. It holds no
//! state between calls beyond its service handles, so one instance can
//! serve any number of concurrent questions.

use std::sync::Arc;

use crate::context::{compose, render_prompt, ContextBundle, DEFAULT_ROLE, SYSTEM_PROMPT};
use crate::embedding::{is_finite, EmbeddingProvider};
use crate::generation::{GenerationProvider, GenerationRequest};
use crate::models::Answer;
use crate::retriever::{Retriever, DEFAULT_TOP_K};

/// Returned when retrieval finds nothing.
pub const NO_INFORMATION_ANSWER: &str =
    "I could not find any relevant information to answer your question.";

/// Returned for a blank question.
pub const EMPTY_QUESTION_ANSWER: &str = "Please ask a question.";

fn error_answer(details: impl std::fmt::Display) -> Answer {
    Answer::degraded(format!(
        "Sorry, an error occurred. Please try again. Details: {}",
        details
    ))
}

/// Tuning for answer generation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerSettings {
    pub top_k: usize,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Completes "You are ..." in the prompt preamble.
    pub role: String,
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            max_tokens: 400,
            temperature: 0.0,
            role: DEFAULT_ROLE.to_string(),
        }
    }
}

/// Which path a question took through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Answered,
    EmptyQuestion,
    NoResults,
    EmbeddingFailed,
    RetrievalFailed,
    GenerationFailed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Answered => "answered",
            Outcome::EmptyQuestion => "empty_question",
            Outcome::NoResults => "no_results",
            Outcome::EmbeddingFailed => "embedding_failed",
            Outcome::RetrievalFailed => "retrieval_failed",
            Outcome::GenerationFailed => "generation_failed",
        }
    }
}

/// An [`Answer`] together with how it was produced.
#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub answer: Answer,
    pub outcome: Outcome,
    /// The context handed to generation, when retrieval found something.
    pub context: Option<ContextBundle>,
}

impl AnswerOutcome {
    fn short(answer: Answer, outcome: Outcome) -> Self {
        Self {
            answer,
            outcome,
            context: None,
        }
    }
}

/// Coordinates the embedding service, retriever, and generation service.
pub struct AnswerOrchestrator {
    embedder: Arc<dyn EmbeddingProvider>,
    retriever: Retriever,
    generator: Arc<dyn GenerationProvider>,
    settings: AnswerSettings,
}

impl AnswerOrchestrator {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        retriever: Retriever,
        generator: Arc<dyn GenerationProvider>,
        settings: AnswerSettings,
    ) -> Self {
        Self {
            embedder,
            retriever,
            generator,
            settings,
        }
    }

    pub fn settings(&self) -> &AnswerSettings {
        &self.settings
    }

    /// Answer a question. Never fails.
    pub async fn answer(&self, question: &str) -> Answer {
        self.answer_detailed(question).await.answer
    }

    /// Answer a question and report the path taken and the context used.
    pub async fn answer_detailed(&self, question: &str) -> AnswerOutcome {
        let outcome = self.run(question).await;
        tracing::info!(
            outcome = outcome.outcome.as_str(),
            citations = outcome.answer.citations.len(),
            "question handled"
        );
        outcome
    }

    async fn run(&self, question: &str) -> AnswerOutcome {
        let question = question.trim();
        if question.is_empty() {
            return AnswerOutcome::short(
                Answer::degraded(EMPTY_QUESTION_ANSWER),
                Outcome::EmptyQuestion,
            );
        }

        let query_vector = match self.embedder.embed(question).await {
            Ok(v) if is_finite(&v) => v,
            Ok(_) => {
                tracing::warn!("question embedding contains non-finite values");
                return AnswerOutcome::short(
                    error_answer("the embedding service returned an invalid vector"),
                    Outcome::EmbeddingFailed,
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "question embedding failed");
                return AnswerOutcome::short(error_answer(e), Outcome::EmbeddingFailed);
            }
        };

        let result = match self
            .retriever
            .search(&query_vector, self.settings.top_k)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    index = self.retriever.index_name(),
                    error = %e,
                    "retrieval failed"
                );
                return AnswerOutcome::short(error_answer(e), Outcome::RetrievalFailed);
            }
        };
        if result.is_empty() {
            return AnswerOutcome::short(
                Answer::degraded(NO_INFORMATION_ANSWER),
                Outcome::NoResults,
            );
        }

        let bundle = compose(&result);
        let prompt = render_prompt(&bundle, question, &self.settings.role);
        let request = GenerationRequest {
            system_prompt: SYSTEM_PROMPT,
            user_prompt: &prompt,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let generated = match self.generator.generate(&request).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!(model = self.generator.model_name(), "empty generation");
                return AnswerOutcome {
                    answer: error_answer("the generation service returned an empty answer"),
                    outcome: Outcome::GenerationFailed,
                    context: Some(bundle),
                };
            }
            Err(e) => {
                tracing::warn!(model = self.generator.model_name(), error = %e, "generation failed");
                return AnswerOutcome {
                    answer: error_answer(e),
                    outcome: Outcome::GenerationFailed,
                    context: Some(bundle),
                };
            }
        };

        AnswerOutcome {
            answer: Answer {
                text: generated.trim().to_string(),
                citations: bundle.citations.clone(),
            },
            outcome: Outcome::Answered,
            context: Some(bundle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentMetadata, IndexEntry, Source};
    use crate::store::memory::InMemoryIndex;
    use crate::store::{IndexSpec, VectorIndex};
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ConstEmbedder(Option<Vec<f32>>);

    #[async_trait]
    impl EmbeddingProvider for ConstEmbedder {
        fn model_name(&self) -> &str {
            "const"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            match &self.0 {
                Some(v) => Ok(v.clone()),
                None => bail!("embedding service unreachable"),
            }
        }
    }

    #[derive(Default)]
    struct ScriptedGenerator {
        reply: Option<String>,
        calls: AtomicUsize,
        last: Mutex<Option<(String, String, u32, f32)>>,
    }

    #[async_trait]
    impl GenerationProvider for ScriptedGenerator {
        fn model_name(&self) -> &str {
            "scripted"
        }
        async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some((
                request.system_prompt.to_string(),
                request.user_prompt.to_string(),
                request.max_tokens,
                request.temperature,
            ));
            match &self.reply {
                Some(r) => Ok(r.clone()),
                None => bail!("model overloaded"),
            }
        }
    }

    async fn index_with(docs: &[(&str, &str, [f32; 2])]) -> Arc<InMemoryIndex> {
        let index = Arc::new(InMemoryIndex::new());
        index
            .reset(
                "kb",
                &IndexSpec {
                    model: "const".to_string(),
                    dims: 2,
                },
            )
            .await
            .unwrap();
        for (i, (body, url, v)) in docs.iter().enumerate() {
            index
                .add(
                    "kb",
                    IndexEntry {
                        id: i.to_string(),
                        vector: v.to_vec(),
                        body: body.to_string(),
                        metadata: DocumentMetadata::new(Source::Course, format!("T{}", i), *url),
                    },
                )
                .await
                .unwrap();
        }
        index
    }

    fn orchestrator(
        index: Arc<InMemoryIndex>,
        embedder: ConstEmbedder,
        generator: Arc<ScriptedGenerator>,
    ) -> AnswerOrchestrator {
        AnswerOrchestrator::new(
            Arc::new(embedder),
            Retriever::new(index, "kb"),
            generator,
            AnswerSettings::default(),
        )
    }

    #[tokio::test]
    async fn answers_with_citations_and_bounded_sampling() {
        let index = index_with(&[
            ("best passage", "http://x/a", [1.0, 0.0]),
            ("other passage", "http://x/b", [0.5, 0.5]),
        ])
        .await;
        let generator = Arc::new(ScriptedGenerator {
            reply: Some("  Due Sunday.\n".to_string()),
            ..Default::default()
        });
        let orch = orchestrator(index, ConstEmbedder(Some(vec![1.0, 0.0])), generator.clone());

        let out = orch.answer_detailed("When?").await;
        assert_eq!(out.outcome, Outcome::Answered);
        assert_eq!(out.answer.text, "Due Sunday.");
        assert_eq!(out.answer.citations.len(), 2);
        assert_eq!(out.answer.citations[0].url, "http://x/a");

        let (system, user, max_tokens, temperature) =
            generator.last.lock().unwrap().clone().unwrap();
        assert_eq!(system, SYSTEM_PROMPT);
        assert!(user.contains("### PRIMARY CONTEXT (Most Important):\nbest passage"));
        assert!(user.contains("### ADDITIONAL CONTEXT:\nother passage"));
        assert_eq!(max_tokens, 400);
        assert_eq!(temperature, 0.0);
    }

    #[tokio::test]
    async fn empty_index_short_circuits() {
        let index = index_with(&[]).await;
        let generator = Arc::new(ScriptedGenerator::default());
        let orch = orchestrator(index, ConstEmbedder(Some(vec![1.0, 0.0])), generator.clone());

        let answer = orch.answer("anything").await;
        assert_eq!(answer.text, NO_INFORMATION_ANSWER);
        assert!(answer.citations.is_empty());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn embedding_failure_degrades() {
        let index = index_with(&[("p", "u", [1.0, 0.0])]).await;
        let generator = Arc::new(ScriptedGenerator::default());
        let orch = orchestrator(index, ConstEmbedder(None), generator.clone());

        let out = orch.answer_detailed("anything").await;
        assert_eq!(out.outcome, Outcome::EmbeddingFailed);
        assert!(out.answer.text.contains("embedding service unreachable"));
        assert!(out.answer.citations.is_empty());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_finite_question_vector_degrades() {
        let index = index_with(&[("p", "u", [1.0, 0.0])]).await;
        let generator = Arc::new(ScriptedGenerator::default());
        let orch = orchestrator(
            index,
            ConstEmbedder(Some(vec![f32::NAN, 0.0])),
            generator.clone(),
        );

        let out = orch.answer_detailed("anything").await;
        assert_eq!(out.outcome, Outcome::EmbeddingFailed);
        assert!(out.answer.text.starts_with("Sorry, an error occurred."));
        assert!(out.answer.citations.is_empty());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dimension_mismatch_degrades() {
        let index = index_with(&[("p", "u", [1.0, 0.0])]).await;
        let orch = orchestrator(
            index,
            ConstEmbedder(Some(vec![1.0, 0.0, 0.0])),
            Arc::new(ScriptedGenerator::default()),
        );
        let out = orch.answer_detailed("anything").await;
        assert_eq!(out.outcome, Outcome::RetrievalFailed);
        assert!(out.answer.text.contains("dimension mismatch"));
    }

    #[tokio::test]
    async fn generation_failure_degrades() {
        let index = index_with(&[("p", "http://x/p", [1.0, 0.0])]).await;
        let orch = orchestrator(
            index,
            ConstEmbedder(Some(vec![1.0, 0.0])),
            Arc::new(ScriptedGenerator::default()),
        );
        let out = orch.answer_detailed("anything").await;
        assert_eq!(out.outcome, Outcome::GenerationFailed);
        assert!(out.answer.text.starts_with("Sorry, an error occurred."));
        assert!(out.answer.text.contains("model overloaded"));
        assert!(out.answer.citations.is_empty());
        assert!(out.context.is_some());
    }

    #[tokio::test]
    async fn blank_generation_is_a_failure() {
        let index = index_with(&[("p", "http://x/p", [1.0, 0.0])]).await;
        let generator = Arc::new(ScriptedGenerator {
            reply: Some("   ".to_string()),
            ..Default::default()
        });
        let orch = orchestrator(index, ConstEmbedder(Some(vec![1.0, 0.0])), generator);
        let answer = orch.answer("anything").await;
        assert!(!answer.text.trim().is_empty());
        assert!(answer.citations.is_empty());
    }

    #[tokio::test]
    async fn blank_question_skips_pipeline() {
        let generator = Arc::new(ScriptedGenerator::default());
        let orch = orchestrator(index_with(&[]).await, ConstEmbedder(None), generator.clone());
        let out = orch.answer_detailed("   ").await;
        assert_eq!(out.outcome, Outcome::EmptyQuestion);
        assert_eq!(out.answer.text, EMPTY_QUESTION_ANSWER);
    }
}
