//! Saved event state.
//!
//! The state is stored as a versioned JSON envelope. Loading never hands a
//! broken snapshot to the calculators: anything unreadable or inconsistent
//! is logged and replaced with an empty state. Only malformed JSON is
//! deleted from disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::engine::{InvariantViolation, WarikanState};
use crate::validation::Limits;

pub const STORAGE_VERSION: &str = "1.0.0";

/// Errors that can occur when reading or writing a snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported snapshot version '{0}'")]
    Version(String),

    #[error("inconsistent snapshot: {0}")]
    Invariant(#[from] InvariantViolation),
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: String,
    data: WarikanState,
    timestamp: DateTime<Utc>,
}

/// Read a snapshot. `Ok(None)` when there is none yet.
pub fn read(path: impl AsRef<Path>, limits: &Limits) -> Result<Option<WarikanState>, SnapshotError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let envelope: Envelope = serde_json::from_str(&raw)?;
    if envelope.version != STORAGE_VERSION {
        return Err(SnapshotError::Version(envelope.version));
    }
    envelope.data.check_invariants(limits)?;

    Ok(Some(envelope.data))
}

/// Load the saved state, falling back to an empty one.
///
/// A snapshot that is not valid JSON is removed. Other failures leave the
/// file in place; it is overwritten by the next save.
pub fn load(path: impl AsRef<Path>, limits: &Limits) -> WarikanState {
    let path = path.as_ref();
    match read(path, limits) {
        Ok(state) => state.unwrap_or_default(),
        Err(e @ SnapshotError::Json(_)) => {
            warn!(path = %path.display(), reason = %e, "removing malformed saved state");
            if let Err(e) = clear(path) {
                warn!(path = %path.display(), reason = %e, "failed to remove saved state");
            }
            WarikanState::default()
        }
        Err(e) => {
            warn!(path = %path.display(), reason = %e, "ignoring saved state");
            WarikanState::default()
        }
    }
}

/// Write the state, replacing any previous snapshot.
pub fn save(path: impl AsRef<Path>, state: &WarikanState) -> Result<(), SnapshotError> {
    let path = path.as_ref();
    let envelope = Envelope {
        version: STORAGE_VERSION.to_string(),
        data: state.clone(),
        timestamp: Utc::now(),
    };
    let json = serde_json::to_string(&envelope)?;

    // the target is only ever replaced by a complete file
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Remove the snapshot. Removing a missing snapshot is not an error.
pub fn clear(path: impl AsRef<Path>) -> Result<(), SnapshotError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug)]
enum Request {
    Store(WarikanState),
    Clear,
    Shutdown,
}

/// Cheap handle used to queue saves on a [`DebouncedSaver`].
#[derive(Debug, Clone)]
pub struct SaverHandle {
    sender: mpsc::UnboundedSender<Request>,
}

impl SaverHandle {
    /// Queue `state` to be written once no newer request arrives for the
    /// debounce period.
    pub fn schedule(&self, state: WarikanState) {
        self.send(Request::Store(state));
    }

    /// Queue removal of the snapshot.
    pub fn clear(&self) {
        self.send(Request::Clear);
    }

    fn send(&self, request: Request) {
        if self.sender.send(request).is_err() {
            warn!("snapshot saver has stopped, request dropped");
        }
    }
}

/// Background task that coalesces bursts of saves into one write.
///
/// Only the latest request within a debounce window is acted on.
pub struct DebouncedSaver {
    handle: SaverHandle,
    task: JoinHandle<()>,
}

impl DebouncedSaver {
    /// Spawn the saver on the current tokio runtime.
    pub fn spawn(path: impl Into<PathBuf>, debounce: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_saver(path.into(), debounce, receiver));
        Self {
            handle: SaverHandle { sender },
            task,
        }
    }

    pub fn handle(&self) -> SaverHandle {
        self.handle.clone()
    }

    /// Flush any pending request and stop the task.
    pub async fn shutdown(self) {
        self.handle.send(Request::Shutdown);
        if let Err(e) = self.task.await {
            warn!(reason = %e, "snapshot saver failed");
        }
    }
}

async fn run_saver(path: PathBuf, debounce: Duration, mut receiver: mpsc::UnboundedReceiver<Request>) {
    let mut pending: Option<Request> = None;

    loop {
        let next = if pending.is_some() {
            match tokio::time::timeout(debounce, receiver.recv()).await {
                Ok(next) => next,
                Err(_elapsed) => {
                    if let Some(request) = pending.take() {
                        persist(&path, request);
                    }
                    continue;
                }
            }
        } else {
            receiver.recv().await
        };

        match next {
            Some(Request::Shutdown) | None => {
                if let Some(request) = pending.take() {
                    persist(&path, request);
                }
                return;
            }
            Some(request) => pending = Some(request),
        }
    }
}

fn persist(path: &Path, request: Request) {
    let result = match &request {
        Request::Store(state) => save(path, state),
        Request::Clear => clear(path),
        Request::Shutdown => Ok(()),
    };
    match result {
        Ok(()) => debug!(path = %path.display(), "snapshot updated"),
        Err(e) => warn!(path = %path.display(), reason = %e, "failed to update snapshot"),
    }
}
