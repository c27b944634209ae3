//! Record loading and the `index` command.
//!
//! Scraper output is JSON: each file holds either an array of records or a
//! single record object. Records are concatenated in file order and handed
//! to the core [`Indexer`](course_ta_core::indexer::Indexer) for a full
//! rebuild.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use course_ta_core::indexer::IndexProgress;
use course_ta_core::models::RawRecord;
use course_ta_core::normalize::normalize_with;

use crate::services::Services;

/// Records read from one or more files.
#[derive(Debug, Default)]
pub struct LoadedRecords {
    pub records: Vec<RawRecord>,
    /// Array elements that were not objects of the expected shape.
    pub unreadable: usize,
}

/// Parse one JSON file of records.
pub fn load_file(path: &Path) -> Result<LoadedRecords> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read records file: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON in {}", path.display()))?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        obj @ serde_json::Value::Object(_) => vec![obj],
        _ => bail!(
            "{}: expected an array of records or a single record object",
            path.display()
        ),
    };

    let mut loaded = LoadedRecords::default();
    for (i, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<RawRecord>(item) {
            Ok(record) => loaded.records.push(record),
            Err(e) => {
                tracing::warn!(file = %path.display(), item = i, error = %e, "unreadable record");
                loaded.unreadable += 1;
            }
        }
    }
    Ok(loaded)
}

/// Load every file in order.
pub fn load_records(paths: &[PathBuf]) -> Result<LoadedRecords> {
    let mut all = LoadedRecords::default();
    for path in paths {
        let loaded = load_file(path)?;
        tracing::info!(
            file = %path.display(),
            records = loaded.records.len(),
            "loaded records"
        );
        all.records.extend(loaded.records);
        all.unreadable += loaded.unreadable;
    }
    Ok(all)
}

/// Count records that would be indexed and rejected, without embedding.
pub fn preview(records: &[RawRecord], min_length: usize) -> (usize, usize) {
    let accepted = records
        .iter()
        .filter(|r| normalize_with(r.body(), min_length).is_some())
        .count();
    (accepted, records.len() - accepted)
}

/// Run the `index` command.
pub async fn run_index(
    services: &Services,
    files: &[PathBuf],
    name: Option<&str>,
    dry_run: bool,
    progress: &dyn IndexProgress,
) -> Result<()> {
    let config = services.config();
    let files: &[PathBuf] = if files.is_empty() {
        &config.index.sources
    } else {
        files
    };
    if files.is_empty() {
        bail!("No record files given and [index].sources is empty");
    }
    let name = name.unwrap_or(&config.index.name);

    let loaded = load_records(files)?;

    if dry_run {
        let (accepted, rejected) = preview(&loaded.records, config.index.min_length);
        println!("index {} (dry-run)", name);
        println!("  files: {}", files.len());
        println!("  records: {}", loaded.records.len());
        println!("  would index: {}", accepted);
        println!("  would reject: {}", rejected);
        if loaded.unreadable > 0 {
            println!("  unreadable: {}", loaded.unreadable);
        }
        return Ok(());
    }

    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled; set [embedding] provider to index records");
    }

    let stats = services
        .indexer()
        .rebuild_with_progress(name, &loaded.records, progress)
        .await?;

    println!("index {}", name);
    println!("  model: {}", services.embedder().model_name());
    println!("  attempted: {}", stats.attempted);
    println!("  indexed: {}", stats.indexed);
    println!("  skipped: {}", stats.skipped);
    println!("    rejected: {}", stats.rejected);
    println!("    failed: {}", stats.failed);
    if loaded.unreadable > 0 {
        println!("  unreadable: {}", loaded.unreadable);
    }
    println!("ok");

    Ok(())
}
