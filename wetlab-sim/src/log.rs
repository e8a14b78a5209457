//! # Execution Log
//!
//! Ordered, append-only record of every command a session issued, and the
//! sinks it is persisted to. The artifact is
//! `{"protocol_start_time": ..., "steps": [Command, ...]}`, indented by four
//! spaces, and is what the downstream scheduler consumes.

use crate::command::Command;
use crate::error::{self, Error, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub protocol_start_time: NaiveDateTime,
    pub steps: Vec<Command>,
}

impl Default for ExecutionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionLog {
    /// Empty log stamped with the current local time
    pub fn new() -> Self {
        Self::started_at(chrono::Local::now().naive_local())
    }

    pub fn started_at(protocol_start_time: NaiveDateTime) -> Self {
        Self {
            protocol_start_time,
            steps: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, command: Command) {
        self.steps.push(command);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.steps.iter()
    }

    /// Command with sequence id `id`
    pub fn get(&self, id: u64) -> Option<&Command> {
        self.steps.iter().find(|c| c.id == id)
    }

    /// Check that the k-th command carries id k
    pub fn verify_sequence(&self) -> Result<()> {
        for (pos, command) in self.steps.iter().enumerate() {
            let expected = pos as u64 + 1;
            if command.id != expected {
                return Err(error::replay_diverged(
                    pos + 1,
                    format!("step {} has id {}, expected {}", pos + 1, command.id, expected),
                ));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)
            .map_err(|e| error::serialization_error(e.to_string()).set_source(e))?;
        String::from_utf8(buf).map_err(|e| error::serialization_error(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            error::parse_error(format!("invalid execution log: {}", e))
                .with_operation("log::parse")
                .set_source(e)
        })
    }

    /// Read a persisted artifact back
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::from(e)
                .with_operation("log::load")
                .with_context("path", path.display().to_string())
        })?;
        Self::from_json(&content)
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Destination a finished session's log is flushed to
pub trait LogSink: Send + Sync {
    fn persist(&self, log: &ExecutionLog) -> Result<()>;

    /// Where the log ends up, for messages
    fn location(&self) -> String;
}

/// Writes the artifact to a file, creating parent directories as needed
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn persist(&self, log: &ExecutionLog) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| error::io_error(format!("Failed to create log dir {}: {}", parent.display(), e)))?;
        }
        let content = log.to_json()?;
        std::fs::write(&self.path, content)
            .map_err(|e| error::io_error(format!("Failed to write {}: {}", self.path.display(), e)))?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Keeps persisted logs in memory. Clones share the same store, so a test
/// can hand one clone to a session and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    persisted: Arc<RwLock<Vec<ExecutionLog>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently persisted log
    pub fn last(&self) -> Option<ExecutionLog> {
        self.persisted.read().ok().and_then(|logs| logs.last().cloned())
    }

    pub fn count(&self) -> usize {
        self.persisted.read().map(|logs| logs.len()).unwrap_or(0)
    }
}

impl LogSink for MemorySink {
    fn persist(&self, log: &ExecutionLog) -> Result<()> {
        let mut logs = self
            .persisted
            .write()
            .map_err(|_| error::storage_failed("memory sink lock poisoned"))?;
        logs.push(log.clone());
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Action;
    use crate::container::{ContainerId, ContainerType};
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn sample_log() -> ExecutionLog {
        let start = chrono::NaiveDate::from_ymd_opt(2024, 5, 17)
            .and_then(|d| d.and_hms_micro_opt(9, 30, 0, 250))
            .unwrap();
        let mut log = ExecutionLog::started_at(start);
        log.push(Command {
            id: 1,
            action: Action::ContainerAllocate {
                container_index: ContainerId(1000),
                container_label: "A".into(),
            },
            container_type: Some(ContainerType::P200),
            placement: None,
        });
        log.push(Command {
            id: 2,
            action: Action::TimerWait { time: 30 },
            container_type: None,
            placement: None,
        });
        log
    }

    #[test]
    fn test_artifact_shape() {
        let json = sample_log().to_json().unwrap();
        assert!(json.starts_with("{\n    \"protocol_start_time\": \"2024-05-17T09:30:00.000250\""));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["steps"][0]["action"], "container_allocate");
        assert_eq!(value["steps"][1]["parameters"]["time"], 30);
        assert_eq!(value["steps"][1]["parameters"]["container_type"], "Unknown");
    }

    #[test]
    fn test_file_sink_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("protocol_flow.json");
        let sink = FileSink::new(&path);

        let log = sample_log();
        sink.persist(&log).unwrap();

        let loaded = ExecutionLog::load(&path).unwrap();
        assert_eq!(loaded, log);
        assert!(sink.location().ends_with("protocol_flow.json"));
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = ExecutionLog::load(temp.path().join("nope.json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        assert_eq!(err.operation(), "log::load");
    }

    #[test]
    fn test_memory_sink_shares_store() {
        let sink = MemorySink::new();
        let handle = sink.clone();
        sink.persist(&sample_log()).unwrap();

        assert_eq!(handle.count(), 1);
        assert_eq!(handle.last().unwrap().len(), 2);
    }

    #[test]
    fn test_verify_sequence() {
        let mut log = sample_log();
        assert!(log.verify_sequence().is_ok());

        log.steps[1].id = 5;
        let err = log.verify_sequence().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReplayDiverged);
    }
}
