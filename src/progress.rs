//! Index rebuild progress reporting.
//!
//! Reports what `course-ta index` is doing so users see how many records
//! are left and which ones were skipped. Progress is emitted on **stderr**
//! so stdout remains parseable for scripts.

use std::io::Write;

use course_ta_core::indexer::{IndexEvent, IndexProgress, NoProgress, RecordOutcome};

/// Human-friendly progress on stderr: "index kb  1,234 / 5,000 records".
pub struct StderrProgress;

impl IndexProgress for StderrProgress {
    fn report(&self, event: IndexEvent) {
        let line = match &event {
            IndexEvent::Started { index, total } => format!(
                "index {}  rebuilding from {} records\n",
                index,
                format_number(*total)
            ),
            IndexEvent::Record {
                n,
                total,
                title,
                outcome,
            } => {
                let position = format!("{} / {}", format_number(*n), format_number(*total));
                match outcome {
                    RecordOutcome::Indexed => format!("  {} records\n", position),
                    RecordOutcome::Rejected => {
                        format!("  {}  rejected (too short): {}\n", position, title)
                    }
                    RecordOutcome::Failed(reason) => {
                        format!("  {}  failed: {}: {}\n", position, title, reason)
                    }
                }
            }
            IndexEvent::Finished { stats } => format!(
                "index done  {} indexed, {} skipped\n",
                format_number(stats.indexed),
                format_number(stats.skipped)
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl IndexProgress for JsonProgress {
    fn report(&self, event: IndexEvent) {
        let obj = event_json(&event);
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

fn event_json(event: &IndexEvent) -> serde_json::Value {
    match event {
        IndexEvent::Started { index, total } => serde_json::json!({
            "event": "started",
            "index": index,
            "total": total
        }),
        IndexEvent::Record {
            n,
            total,
            title,
            outcome,
        } => {
            let (status, reason) = match outcome {
                RecordOutcome::Indexed => ("indexed", None),
                RecordOutcome::Rejected => ("rejected", None),
                RecordOutcome::Failed(reason) => ("failed", Some(reason.as_str())),
            };
            serde_json::json!({
                "event": "record",
                "n": n,
                "total": total,
                "title": title,
                "status": status,
                "reason": reason
            })
        }
        IndexEvent::Finished { stats } => serde_json::json!({
            "event": "finished",
            "stats": stats
        }),
    }
}

fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn IndexProgress> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
