//! Anomaly Journal
//!
//! Append-only JSON-lines log of anomaly events. The file is opened lazily
//! on first write and kept open; nothing is ever rewritten.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::model::ScoreResult;
use crate::pipeline::Event;

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("journal write to {} failed: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("journal entry could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One persisted line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    pub src_ip: String,
    pub src_port: u16,
    pub dst_ip: String,
    pub dst_port: u16,
    pub proto: String,
    pub app_proto: Option<String>,
    pub flow_id: Option<u64>,
    pub prediction: ScoreResult,
    pub explanation: Option<String>,
}

impl From<&Event> for JournalEntry {
    fn from(event: &Event) -> Self {
        Self {
            timestamp: event.timestamp,
            src_ip: event.flow.src_ip.clone(),
            src_port: event.flow.src_port,
            dst_ip: event.flow.dst_ip.clone(),
            dst_port: event.flow.dst_port,
            proto: event.flow.proto.clone(),
            app_proto: event.flow.app_proto.clone(),
            flow_id: event.flow.flow_id,
            prediction: event.prediction.clone(),
            explanation: event.explanation.clone(),
        }
    }
}

pub struct AnomalyJournal {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl AnomalyJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event as a JSON line. The entry and its newline go out in
    /// one write. A failed open is retried on the next append.
    pub fn append(&self, event: &Event) -> Result<(), JournalError> {
        let line = encode_line(&JournalEntry::from(event))?;

        let mut guard = self.file.lock();
        if guard.is_none() {
            *guard = Some(self.open().map_err(|e| self.io_error(e))?);
        }

        if let Some(file) = guard.as_mut() {
            if let Err(e) = file.write_all(&line).and_then(|_| file.flush()) {
                *guard = None;
                return Err(self.io_error(e));
            }
        }

        Ok(())
    }

    fn open(&self) -> io::Result<File> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        log::info!("Anomaly journal opened at {}", self.path.display());
        Ok(file)
    }

    fn io_error(&self, source: io::Error) -> JournalError {
        JournalError::Io { path: self.path.clone(), source }
    }
}

fn encode_line(entry: &JournalEntry) -> Result<Vec<u8>, serde_json::Error> {
    let mut line = serde_json::to_vec(entry)?;
    line.push(b'\n');
    Ok(line)
}

/// Read every entry back, skipping lines that do not parse
pub fn read_entries(path: &Path) -> io::Result<Vec<JournalEntry>> {
    let content = fs::read_to_string(path)?;
    Ok(content.lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}
