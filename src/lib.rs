//! # Course TA
//!
//! A retrieval-grounded teaching assistant for an online course.
//!
//! Scraped course pages and forum posts are normalized, embedded, and
//! stored in a vector index. Questions are embedded the same way; the
//! nearest passages are split into a primary and secondary context tier
//! and handed to a generation model, and the answer is returned with
//! source links.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────┐
//! │ JSON records │──▶│   Indexer    │──▶│  SQLite   │
//! │ course/forum │   │ norm + embed │   │  vectors  │
//! └──────────────┘   └──────────────┘   └─────┬─────┘
//!                                             │
//!                 ┌───────────────────────────┤
//!                 ▼                           ▼
//!           ┌──────────┐  compose + generate ┌──────────┐
//!           │   CLI    │◀────────────────────│   HTTP   │
//!           │  (ask)   │                     │ (/api/)  │
//!           └──────────┘                     └──────────┘
//! ```
//!
//! The pipeline itself (normalizer, indexer, retriever, context composer,
//! orchestrator) lives in the runtime-agnostic `course-ta-core` crate. This
//! crate supplies the I/O around it.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`embedding`] | Embedding providers (OpenAI-compatible, Ollama, local) |
//! | [`generation`] | Chat completion providers |
//! | [`gateway`] | Deadlines and read retries around providers and the index |
//! | [`sqlite_index`] | Persistent vector index |
//! | [`services`] | Service handles built at startup |
//! | [`ingest`] | Record loading and the `index` command |
//! | [`progress`] | Rebuild progress reporters |
//! | [`ask`] | The `ask` command |
//! | [`stats`] | The `stats` command |
//! | [`server`] | HTTP query endpoint |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |

pub mod ask;
pub mod config;
pub mod db;
pub mod embedding;
pub mod gateway;
pub mod generation;
pub mod ingest;
pub mod migrate;
pub mod progress;
pub mod server;
pub mod services;
pub mod sqlite_index;
pub mod stats;
