//! Capture Module - Raw flow record sources
//!
//! The pipeline pulls records through `FlowSource`; how they are captured
//! (log tailing, replay, in-memory) is the source's business.

pub mod lines;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::config::CaptureConfig;
use crate::features::FlowRecord;

pub use lines::{JsonLineSource, ReadMode};

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to open capture source {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("capture read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Uniform pull interface. `Ok(None)` is end of stream.
pub trait FlowSource: Send {
    fn next_record(&mut self) -> Result<Option<FlowRecord>, CaptureError>;
}

/// Wraps any iterator of records
pub struct IterSource<I> {
    iter: I,
}

impl<I> IterSource<I>
where
    I: Iterator<Item = FlowRecord> + Send,
{
    pub fn new<T>(records: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self { iter: records.into_iter() }
    }
}

impl<I> FlowSource for IterSource<I>
where
    I: Iterator<Item = FlowRecord> + Send,
{
    fn next_record(&mut self) -> Result<Option<FlowRecord>, CaptureError> {
        Ok(self.iter.next())
    }
}

/// Source described by the capture configuration, if one is configured.
/// Setting `stop` ends a tailing source at its next idle poll.
pub fn from_config(config: &CaptureConfig, stop: Arc<AtomicBool>) -> Result<Option<Box<dyn FlowSource>>, CaptureError> {
    let Some(path) = config.source.as_ref() else {
        return Ok(None);
    };

    if path.as_os_str() == "-" {
        return Ok(Some(Box::new(JsonLineSource::stdin(config.schema).with_stop(stop))));
    }

    let mode = if config.from_start { ReadMode::Replay } else { ReadMode::Tail };
    let source = JsonLineSource::open(path, config.schema, mode)?.with_stop(stop);
    Ok(Some(Box::new(source)))
}
