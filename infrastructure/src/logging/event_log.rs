//! JSONL file writer for pipeline events.
//!
//! Each [`PipelineEvent`] is serialized as a single JSON line (it already
//! carries its `type` tag and `timestamp`) and appended to
//! `<root>/<session_id>/events.jsonl`. Gateway events without a session id
//! go to the file of the most recent session seen, or `<root>/events.jsonl`
//! before any session has started.

use aigenflow_domain::PipelineEvent;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::warn;

/// File name of the per-session event log
pub const EVENT_LOG_FILE: &str = "events.jsonl";

#[derive(Default)]
struct Writers {
    files: HashMap<PathBuf, BufWriter<File>>,
    current_session: Option<String>,
}

/// JSONL event logger that writes one JSON object per line.
///
/// Thread-safe via `Mutex`. Flushes after every line and on `Drop`.
pub struct JsonlEventLogger {
    root: PathBuf,
    writers: Mutex<Writers>,
}

impl JsonlEventLogger {
    /// Create a logger writing below `root`. Files are opened lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            writers: Mutex::new(Writers::default()),
        }
    }

    /// Path of the event log for `session_id`
    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.root.join(session_id).join(EVENT_LOG_FILE)
    }

    /// Append one event. Failures are logged, never propagated.
    pub fn log(&self, event: &PipelineEvent) {
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                warn!("Could not serialize {} event: {}", event.event_type(), e);
                return;
            }
        };
        let mut writers = self
            .writers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(id) = event.session_id() {
            writers.current_session = Some(id.to_string());
        }
        let path = match &writers.current_session {
            Some(id) => self.path_for(id),
            None => self.root.join(EVENT_LOG_FILE),
        };

        if !writers.files.contains_key(&path) {
            match open_append(&path) {
                Some(file) => {
                    writers.files.insert(path.clone(), BufWriter::new(file));
                }
                None => return,
            }
        }
        let Some(writer) = writers.files.get_mut(&path) else {
            return;
        };
        // JSONL is append-only; flush each line so a crash loses nothing
        if let Err(e) = writeln!(writer, "{}", line).and_then(|()| writer.flush()) {
            warn!("Could not write event log {}: {}", path.display(), e);
            // Reopen on the next event
            writers.files.remove(&path);
        }
    }

    #[cfg(test)]
    fn open_files(&self) -> usize {
        self.writers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .files
            .len()
    }

    /// Consume `events` until every sender is dropped.
    pub fn spawn(self, mut events: UnboundedReceiver<PipelineEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                self.log(&event);
            }
        })
    }
}

fn open_append(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        warn!(
            "Could not create event log directory {}: {}",
            parent.display(),
            e
        );
        return None;
    }
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(file),
        Err(e) => {
            warn!("Could not open event log file {}: {}", path.display(), e);
            None
        }
    }
}

impl Drop for JsonlEventLogger {
    fn drop(&mut self) {
        if let Ok(mut writers) = self.writers.lock() {
            for (path, writer) in writers.files.iter_mut() {
                if let Err(e) = writer.flush() {
                    warn!("Could not flush event log {}: {}", path.display(), e);
                }
            }
        }
    }
}
