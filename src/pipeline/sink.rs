//! Progress and result sinks.

use std::path::PathBuf;

use crossbeam_channel::{Receiver, Sender};

use super::report::RunResult;
use super::stage::{ProgressEvent, Stage};
use crate::error::Result;
use crate::render::{write_json, JsonFormat};

/// Receives a progress event on every stage transition.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: &ProgressEvent);
}

/// Logs progress through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn emit(&self, event: &ProgressEvent) {
        match event.stage {
            Stage::Error => log::error!("[{}] {}: {}", event.run_id, event.stage, event.message),
            Stage::Cancelled => log::warn!("[{}] {}: {}", event.run_id, event.stage, event.message),
            _ => log::info!(
                "[{}] {} ({}%): {}",
                event.run_id,
                event.stage,
                event.percent,
                event.message
            ),
        }
    }
}

/// Forwards progress events to a channel.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    sender: Sender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new(sender: Sender<ProgressEvent>) -> Self {
        Self { sender }
    }

    /// Create a sink with its receiving end.
    pub fn unbounded() -> (Self, Receiver<ProgressEvent>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self::new(sender), receiver)
    }
}

impl ProgressSink for ChannelProgress {
    fn emit(&self, event: &ProgressEvent) {
        // A dropped receiver only means nobody is listening.
        let _ = self.sender.send(event.clone());
    }
}

/// Discards progress events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn emit(&self, _event: &ProgressEvent) {}
}

/// Receives the result of a completed run.
///
/// A delivery failure fails the run.
pub trait ResultSink: Send + Sync {
    fn deliver(&self, result: &RunResult) -> Result<()>;
}

/// Writes each result to `<dir>/<run_id>.json`.
#[derive(Debug, Clone)]
pub struct JsonDirSink {
    dir: PathBuf,
    format: JsonFormat,
}

impl JsonDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            format: JsonFormat::Pretty,
        }
    }

    pub fn with_format(mut self, format: JsonFormat) -> Self {
        self.format = format;
        self
    }

    /// Path a run's result is written to.
    pub fn path_for(&self, result: &RunResult) -> PathBuf {
        self.dir.join(format!("{}.json", result.run_id))
    }
}

impl ResultSink for JsonDirSink {
    fn deliver(&self, result: &RunResult) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(result);
        write_json(result, &path, self.format)?;
        log::debug!("Wrote run result to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_channel_progress() {
        let (sink, rx) = ChannelProgress::unbounded();
        let run_id = Uuid::new_v4();
        sink.emit(&ProgressEvent::new(run_id, Stage::Parsing, 10, "parsing 2 documents"));
        let event = rx.try_recv().unwrap();
        assert_eq!(event.stage, Stage::Parsing);
        assert_eq!(event.run_id, run_id);
    }

    #[test]
    fn test_channel_progress_without_receiver() {
        let (sink, rx) = ChannelProgress::unbounded();
        drop(rx);
        sink.emit(&ProgressEvent::new(Uuid::new_v4(), Stage::Queued, 0, "queued"));
    }
}
