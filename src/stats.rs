//! Statistics and reporting sink
//!
//! The scheduler forwards every task outcome and alert here; the sink is
//! append-only and never read back by the core. The JSONL writer produces
//! one line per event so external tooling can tail a live session.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::tasks::ActionOutcome;

/// One recorded task outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionEvent {
    pub timestamp: DateTime<Utc>,
    pub task: String,
    pub outcome: ActionOutcome,
}

impl ActionEvent {
    pub fn now(task: &str, outcome: ActionOutcome) -> Self {
        Self {
            timestamp: Utc::now(),
            task: task.to_string(),
            outcome,
        }
    }
}

/// Receives outcome events and operator alerts
pub trait StatsSink {
    fn record(&mut self, event: ActionEvent);
    fn alert(&mut self, message: &str);
}

#[derive(Serialize)]
struct AlertLine<'a> {
    timestamp: DateTime<Utc>,
    alert: &'a str,
}

/// Appends events as JSON lines to a per-session file
pub struct JsonlSink {
    writer: BufWriter<File>,
    path: PathBuf,
    total: u64,
    failed: u64,
}

impl JsonlSink {
    /// Create a new session log under `dir`
    pub fn create(dir: &Path) -> std::io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!(
            "session_{}.jsonl",
            Utc::now().format("%Y%m%d_%H%M%S")
        ));
        let file = File::create(&path)?;
        log::info!("Session log: {}", path.display());
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            total: 0,
            failed: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line<T: Serialize>(&mut self, value: &T) {
        match serde_json::to_string(value) {
            Ok(line) => {
                if let Err(e) = writeln!(self.writer, "{line}").and_then(|_| self.writer.flush()) {
                    log::warn!("Failed to write stats line: {e}");
                }
            }
            Err(e) => log::warn!("Failed to serialize stats line: {e}"),
        }
    }
}

impl StatsSink for JsonlSink {
    fn record(&mut self, event: ActionEvent) {
        self.total += 1;
        if matches!(event.outcome, ActionOutcome::Failed(_)) {
            self.failed += 1;
        }
        self.write_line(&event);
    }

    fn alert(&mut self, message: &str) {
        log::warn!("ALERT: {message}");
        self.write_line(&AlertLine {
            timestamp: Utc::now(),
            alert: message,
        });
    }
}

impl Drop for JsonlSink {
    fn drop(&mut self) {
        log::info!(
            "Session summary: {} actions recorded, {} failed",
            self.total,
            self.failed
        );
    }
}

/// Collects events in memory; used by tests and dry runs
#[derive(Debug, Default)]
pub struct MemorySink {
    pub events: Vec<ActionEvent>,
    pub alerts: Vec<String>,
}

impl StatsSink for MemorySink {
    fn record(&mut self, event: ActionEvent) {
        self.events.push(event);
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }
}

/// Discards everything
pub struct NullSink;

impl StatsSink for NullSink {
    fn record(&mut self, _event: ActionEvent) {}
    fn alert(&mut self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jsonl_sink_writes_events() {
        let dir = std::env::temp_dir().join(format!("rok-warden-stats-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);

        let path = {
            let mut sink = JsonlSink::create(&dir).unwrap();
            sink.record(ActionEvent::now("gather", ActionOutcome::Success));
            sink.record(ActionEvent::now(
                "train",
                ActionOutcome::Failed("template_not_found:barracks".into()),
            ));
            sink.alert("too many consecutive failures");
            sink.path().to_path_buf()
        };

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("\"task\":\"gather\""));
        assert!(lines[1].contains("template_not_found:barracks"));
        assert!(lines[2].contains("consecutive failures"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_memory_sink_collects() {
        let mut sink = MemorySink::default();
        sink.record(ActionEvent::now("heal", ActionOutcome::NotApplicable));
        sink.alert("paused");
        assert_eq!(sink.events.len(), 1);
        assert_eq!(sink.alerts, vec!["paused"]);
    }
}
