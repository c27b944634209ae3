//! Index overview.
//!
//! Used by `course-ta stats` to show which embedding model built the
//! index, when, and how many documents each source contributed.

use anyhow::Result;

use course_ta_core::store::VectorIndex;

use crate::config::Config;
use crate::sqlite_index::SqliteIndex;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let index = SqliteIndex::open(config).await?;
    let name = &config.index.name;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Course TA: Index Stats");
    println!("=======================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!("  Index:       {}", name);

    let Some(spec) = index.describe(name).await? else {
        println!();
        println!("  Not built yet. Run `course-ta index`.");
        println!();
        index.close().await;
        return Ok(());
    };

    let documents = index.count(name).await?;
    let built = index
        .created_at(name)
        .await?
        .map(format_ts_relative)
        .unwrap_or_else(|| "unknown".to_string());

    println!("  Model:       {} ({} dims)", spec.model, spec.dims);
    println!("  Built:       {}", built);
    println!("  Documents:   {}", documents);

    if config.embedding.is_enabled()
        && config.embedding.model.as_deref() != Some(spec.model.as_str())
    {
        println!(
            "  Warning:     configured model is {}; rebuild before serving",
            config.embedding.model.as_deref().unwrap_or("none")
        );
    }

    let by_source = index.source_counts(name).await?;
    if !by_source.is_empty() {
        println!();
        println!("  By source:");
        println!("  {:<16} {:>8}", "SOURCE", "DOCS");
        println!("  {}", "-".repeat(25));
        for (source, n) in &by_source {
            println!("  {:<16} {:>8}", source, n);
        }
    }

    println!();

    index.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;

    if delta < 0 {
        format_ts_iso(ts)
    } else if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        plural(delta / 60, "min")
    } else if delta < 86400 {
        plural(delta / 3600, "hour")
    } else if delta < 86400 * 30 {
        plural(delta / 86400, "day")
    } else {
        format_ts_iso(ts)
    }
}

fn plural(n: i64, unit: &str) -> String {
    format!("{} {}{} ago", n, unit, if n == 1 { "" } else { "s" })
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_are_humanized() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn relative_times() {
        let now = chrono::Utc::now().timestamp();
        assert_eq!(format_ts_relative(now), "just now");
        assert_eq!(format_ts_relative(now - 3600), "1 hour ago");
        assert_eq!(format_ts_relative(now - 3 * 86400), "3 days ago");
        assert_eq!(format_ts_relative(0), "1970-01-01 00:00");
    }
}
