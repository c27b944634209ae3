//! Shared fakes for integration tests.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Mutex;

use course_ta_core::embedding::EmbeddingProvider;
use course_ta_core::generation::{GenerationProvider, GenerationRequest};
use course_ta_core::models::RawRecord;

pub const DIMS: usize = 256;

/// Bag-of-words embedder: each lowercased word (trailing `s` dropped)
/// increments one hashed bucket. Deterministic and offline.
pub struct WordEmbedder;

fn bucket(word: &str) -> usize {
    let mut h: u32 = 2166136261;
    for b in word.bytes() {
        h ^= b as u32;
        h = h.wrapping_mul(16777619);
    }
    h as usize % DIMS
}

#[async_trait]
impl EmbeddingProvider for WordEmbedder {
    fn model_name(&self) -> &str {
        "bag-of-words"
    }
    fn dims(&self) -> usize {
        DIMS
    }
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; DIMS];
        for raw in text.split_whitespace() {
            let word: String = raw
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(|c| c.to_lowercase())
                .collect();
            let word = word.strip_suffix('s').unwrap_or(&word);
            if !word.is_empty() {
                v[bucket(word)] += 1.0;
            }
        }
        Ok(v)
    }
}

/// Replies with a fixed text and records every user prompt.
pub struct RecordingGenerator {
    reply: String,
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl GenerationProvider for RecordingGenerator {
    fn model_name(&self) -> &str {
        "recording"
    }
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String> {
        self.prompts
            .lock()
            .unwrap()
            .push(request.user_prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Fails on every call.
pub struct BrokenGenerator;

#[async_trait]
impl GenerationProvider for BrokenGenerator {
    fn model_name(&self) -> &str {
        "broken"
    }
    async fn generate(&self, _request: &GenerationRequest<'_>) -> Result<String> {
        bail!("upstream returned 503")
    }
}

pub fn record(title: &str, url: &str, content: &str) -> RawRecord {
    RawRecord {
        title: Some(title.to_string()),
        url: Some(url.to_string()),
        content: Some(content.to_string()),
        ..Default::default()
    }
}

/// A small course corpus; every body is long enough to be indexed.
pub fn corpus() -> Vec<RawRecord> {
    vec![
        record(
            "Graded Assignments",
            "https://course/ga",
            "Graded assignments are due every Sunday at 23:59 IST and are submitted on the portal.",
        ),
        record(
            "Project 1",
            "https://course/p1",
            "Project 1 asks you to build a data sourcing pipeline and deploy it to a public server.",
        ),
        record(
            "Exam Schedule",
            "https://course/exam",
            "The end term exam is held in person at the allotted centre; bring your hall ticket and ID.",
        ),
        record(
            "GA5 model choice",
            "https://forum/t/ga5",
            "Use gpt-3.5-turbo-0125 through the course proxy for GA5 even if the question mentions another model.",
        ),
    ]
}
