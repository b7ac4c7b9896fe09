//! JSON-lines capture source
//!
//! One JSON object per line. Tail mode follows a growing file (Suricata
//! `eve.json`) from its current end; replay mode reads a file or stdin once.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::Value;

use crate::constants::CAPTURE_POLL_INTERVAL_MS;
use crate::features::{FlowRecord, RawSchema};
use super::{CaptureError, FlowSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Start at the end, wait for new lines forever
    Tail,
    /// Read from the start, end of stream at EOF
    Replay,
}

pub struct JsonLineSource {
    reader: Box<dyn BufRead + Send>,
    schema: RawSchema,
    mode: ReadMode,
    pending: Vec<u8>,
    skipped: u64,
    stop: Option<Arc<AtomicBool>>,
}

impl JsonLineSource {
    pub fn open(path: &Path, schema: RawSchema, mode: ReadMode) -> Result<Self, CaptureError> {
        let open_error = |source| CaptureError::Open { path: path.to_path_buf(), source };

        let mut file = File::open(path).map_err(open_error)?;
        if mode == ReadMode::Tail {
            file.seek(SeekFrom::End(0)).map_err(open_error)?;
        }

        log::info!("Monitoring {} ({}, {:?})", path.display(), schema, mode);
        Ok(Self::from_reader(BufReader::new(file), schema, mode))
    }

    pub fn stdin(schema: RawSchema) -> Self {
        log::info!("Reading {} flows from stdin", schema);
        Self::from_reader(BufReader::new(io::stdin()), schema, ReadMode::Replay)
    }

    pub fn from_reader<R: BufRead + Send + 'static>(reader: R, schema: RawSchema, mode: ReadMode) -> Self {
        Self {
            reader: Box::new(reader),
            schema,
            mode,
            pending: Vec::new(),
            skipped: 0,
            stop: None,
        }
    }

    /// Tail mode returns end of stream once the flag is set
    pub fn with_stop(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Lines dropped as undecodable so far
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn stopped(&self) -> bool {
        self.stop.as_ref().is_some_and(|s| s.load(Ordering::Relaxed))
    }

    /// Next complete raw line, or None at end of stream. Only I/O errors
    /// are returned; content is checked by `decode`.
    fn next_line(&mut self) -> Result<Option<Vec<u8>>, CaptureError> {
        loop {
            if self.stopped() {
                return Ok(None);
            }

            let read = self.reader.read_until(b'\n', &mut self.pending)?;
            if self.pending.last() == Some(&b'\n') {
                return Ok(Some(std::mem::take(&mut self.pending)));
            }

            if read == 0 {
                match self.mode {
                    ReadMode::Replay if self.pending.is_empty() => return Ok(None),
                    ReadMode::Replay => return Ok(Some(std::mem::take(&mut self.pending))),
                    // Writer may be mid-line; keep the partial line
                    ReadMode::Tail => thread::sleep(Duration::from_millis(CAPTURE_POLL_INTERVAL_MS)),
                }
            }
        }
    }

    fn decode(&mut self, raw: &[u8]) -> Option<FlowRecord> {
        let Ok(line) = std::str::from_utf8(raw) else {
            self.skip("not UTF-8");
            return None;
        };
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => {
                self.skip("not an object");
                return None;
            }
            Err(_) => {
                self.skip("invalid JSON");
                return None;
            }
        };

        if self.schema == RawSchema::Eve && value.get("event_type").and_then(Value::as_str) != Some("flow") {
            return None;
        }

        Some(FlowRecord::from_json(self.schema, value))
    }

    fn skip(&mut self, reason: &str) {
        self.skipped += 1;
        log::debug!("Skipping capture line: {} ({} so far)", reason, self.skipped);
    }
}

impl FlowSource for JsonLineSource {
    fn next_record(&mut self) -> Result<Option<FlowRecord>, CaptureError> {
        while let Some(line) = self.next_line()? {
            if let Some(record) = self.decode(&line) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}
