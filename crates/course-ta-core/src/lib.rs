//! # Course TA Core
//!
//! Runtime-agnostic retrieval-and-grounding pipeline for Course TA:
//! content normalization, the vector index abstraction, the indexer,
//! the retriever, context composition, and answer orchestration.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem I/O. The
//! embedding service, the generation service, and the vector index are
//! reached only through the [`embedding::EmbeddingProvider`],
//! [`generation::GenerationProvider`], and [`store::VectorIndex`] traits;
//! concrete implementations live in the `course-ta` app crate.

pub mod context;
pub mod embedding;
pub mod generation;
pub mod indexer;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod retriever;
pub mod store;
