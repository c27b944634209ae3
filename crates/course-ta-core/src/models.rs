//! Core data models used throughout Course TA.
//!
//! These types represent the raw records, indexed documents, retrieval
//! results, and answers that flow through the indexing and query pipeline.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Title stored for records that carry none.
pub const UNTITLED: &str = "Untitled";

/// Origin of an indexed document.
///
/// Serialized as a bare string. Tags other than `course` and
/// `discourse` are kept verbatim in [`Source::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Source {
    /// Course pages (notes, assignments, schedules).
    Course,
    /// Forum topics scraped from Discourse.
    Discourse,
    Other(String),
}

impl Source {
    pub fn as_str(&self) -> &str {
        match self {
            Source::Course => "course",
            Source::Discourse => "discourse",
            Source::Other(tag) => tag,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Source {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "course" => Source::Course,
            "discourse" => Source::Discourse,
            _ => Source::Other(tag),
        }
    }
}

impl From<&str> for Source {
    fn from(tag: &str) -> Self {
        Source::from(tag.to_string())
    }
}

impl From<Source> for String {
    fn from(source: Source) -> Self {
        match source {
            Source::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

/// Raw record produced by the scrapers, before normalization.
///
/// Course pages carry `title`, `url`, and `content`. Forum topics also
/// carry `full_content` (untruncated body), `author`, `date`, `replies`
/// and similar fields, all of which are optional here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub full_content: Option<String>,
    /// Explicit source tag; inferred from `author` when absent.
    #[serde(default)]
    pub source: Option<Source>,
    #[serde(default)]
    pub author: Option<String>,
    /// Any other fields (`date`, `replies`, `category`, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl RawRecord {
    /// Text to index: `full_content` when non-empty, else `content`.
    pub fn body(&self) -> Option<&str> {
        match self.full_content.as_deref() {
            Some(full) if !full.is_empty() => Some(full),
            _ => self.content.as_deref(),
        }
    }

    /// Explicit source, or `Discourse` when an author is present.
    pub fn source(&self) -> Source {
        match (&self.source, &self.author) {
            (Some(source), _) => source.clone(),
            (None, Some(_)) => Source::Discourse,
            (None, None) => Source::Course,
        }
    }

    /// Build the stored metadata for this record.
    pub fn metadata(&self) -> DocumentMetadata {
        let mut extra: BTreeMap<String, serde_json::Value> = self
            .extra
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(author) = &self.author {
            extra.insert("author".to_string(), serde_json::Value::from(author.clone()));
        }

        DocumentMetadata {
            source: self.source(),
            title: self.title.clone().unwrap_or_else(|| UNTITLED.to_string()),
            url: self.url.clone().unwrap_or_default(),
            extra,
        }
    }
}

/// Metadata stored alongside every indexed document.
///
/// `source`, `title`, and `url` are always present. Source-specific fields
/// live in `extra` and are never required by retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source: Source,
    pub title: String,
    pub url: String,
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl DocumentMetadata {
    pub fn new(source: Source, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            source,
            title: title.into(),
            url: url.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// A document ready for insertion into a vector index.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    /// Normalized body text.
    pub body: String,
    pub metadata: DocumentMetadata,
}

/// A single nearest-neighbor hit.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub id: String,
    pub body: String,
    pub metadata: DocumentMetadata,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f32,
}

/// Order hits by descending score, NaN scores last. Equal scores compare
/// equal, so a stable sort keeps their existing order.
pub fn by_score(a: &IndexHit, b: &IndexHit) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a.score.is_nan(), b.score.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal),
    }
}

/// Ranked hits for one query vector.
///
/// Scores are non-increasing in list order. Hits with equal scores keep the
/// order in which the index returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    hits: Vec<IndexHit>,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self { hits: Vec::new() }
    }

    /// Rank `hits` by score (stable) and keep at most `k`.
    pub fn ranked(mut hits: Vec<IndexHit>, k: usize) -> Self {
        hits.sort_by(by_score);
        hits.truncate(k);
        Self { hits }
    }

    pub fn hits(&self) -> &[IndexHit] {
        &self.hits
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IndexHit> {
        self.hits.iter()
    }
}

/// A source link shown next to an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub url: String,
    pub title: String,
}

/// The response returned to a caller for one question.
///
/// Always produced. On failure `text` explains what went wrong and
/// `citations` is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<Citation>,
}

impl Answer {
    /// An answer with no citations.
    pub fn degraded(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            citations: Vec::new(),
        }
    }
}

/// Aggregate counts from one index rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Records seen.
    pub attempted: usize,
    /// Records inserted into the index.
    pub indexed: usize,
    /// Records not inserted (`rejected + failed`).
    pub skipped: usize,
    /// Records whose body was empty or too short.
    pub rejected: usize,
    /// Records dropped by an embedding or insert failure.
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, score: f32) -> IndexHit {
        IndexHit {
            id: id.to_string(),
            body: String::new(),
            metadata: DocumentMetadata::new(Source::Course, id, ""),
            score,
        }
    }

    #[test]
    fn body_prefers_full_content() {
        let rec = RawRecord {
            content: Some("short".to_string()),
            full_content: Some("the whole thing".to_string()),
            ..Default::default()
        };
        assert_eq!(rec.body(), Some("the whole thing"));
    }

    #[test]
    fn body_falls_back_when_full_content_empty() {
        let rec = RawRecord {
            content: Some("short".to_string()),
            full_content: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(rec.body(), Some("short"));
    }

    #[test]
    fn source_inferred_from_author() {
        let mut rec = RawRecord::default();
        assert_eq!(rec.source(), Source::Course);
        rec.author = Some("alice".to_string());
        assert_eq!(rec.source(), Source::Discourse);
        rec.source = Some(Source::Course);
        assert_eq!(rec.source(), Source::Course);
    }

    #[test]
    fn forum_record_deserializes_with_extra_fields() {
        let json = r#"{
            "title": "GA1 doubt",
            "url": "https://forum/t/ga1/1",
            "content": "short",
            "full_content": "long body",
            "author": "bob",
            "date": "2025-01-02T00:00:00Z",
            "replies": 4,
            "category": null
        }"#;
        let rec: RawRecord = serde_json::from_str(json).unwrap();
        let meta = rec.metadata();
        assert_eq!(meta.source, Source::Discourse);
        assert_eq!(meta.title, "GA1 doubt");
        assert_eq!(meta.extra.get("author"), Some(&serde_json::json!("bob")));
        assert_eq!(meta.extra.get("replies"), Some(&serde_json::json!(4)));
        assert!(!meta.extra.contains_key("category"));
    }

    #[test]
    fn metadata_defaults_title_and_url() {
        let meta = RawRecord::default().metadata();
        assert_eq!(meta.title, UNTITLED);
        assert_eq!(meta.url, "");
    }

    #[test]
    fn metadata_json_shape_is_flat() {
        let mut meta = DocumentMetadata::new(Source::Discourse, "t", "u");
        meta.extra.insert("replies".to_string(), serde_json::json!(2));
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"source": "discourse", "title": "t", "url": "u", "replies": 2})
        );
        let back: DocumentMetadata = serde_json::from_value(value).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn unknown_source_tags_are_kept() {
        let rec: RawRecord =
            serde_json::from_str(r#"{"title": "Live session", "source": "youtube"}"#).unwrap();
        assert_eq!(rec.source(), Source::Other("youtube".to_string()));

        let meta = rec.metadata();
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["source"], "youtube");
        let back: DocumentMetadata = serde_json::from_value(value).unwrap();
        assert_eq!(back.source, Source::from("youtube"));

        let rec: RawRecord = serde_json::from_str(r#"{"source": "course"}"#).unwrap();
        assert_eq!(rec.source(), Source::Course);
    }

    #[test]
    fn nan_scores_rank_last() {
        let result = QueryResult::ranked(
            vec![
                hit("zero", 0.0),
                hit("nan", f32::NAN),
                hit("exact", 1.0),
                hit("close", 0.707),
            ],
            4,
        );
        let ids: Vec<&str> = result.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "close", "zero", "nan"]);
        let finite: Vec<f32> = result
            .iter()
            .map(|h| h.score)
            .filter(|s| !s.is_nan())
            .collect();
        assert!(finite.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn ranked_is_stable_and_truncated() {
        let result = QueryResult::ranked(
            vec![hit("a", 0.5), hit("b", 0.9), hit("c", 0.5), hit("d", 0.1)],
            3,
        );
        let ids: Vec<&str> = result.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }
}
