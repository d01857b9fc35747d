//! Background saving from copy-on-write snapshots.
//!
//! A snapshot clones the layer store; pixel buffers are shared until the document writes to
//! them, so an edit made while a save runs never reaches the snapshot.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::Context;

use crate::codec::document::write_document;
use crate::document::canvas::CanvasInfo;
use crate::foundation::config::EditorOpts;
use crate::foundation::error::{LayerdocError, LayerdocResult};
use crate::layers::store::LayerStore;

/// Frozen copy of a document's persistent state.
#[derive(Clone, Debug)]
pub struct DocumentSnapshot {
    canvas: CanvasInfo,
    layers: LayerStore,
    revision: u64,
}

impl DocumentSnapshot {
    pub(crate) fn new(canvas: CanvasInfo, layers: LayerStore, revision: u64) -> Self {
        Self {
            canvas,
            layers,
            revision,
        }
    }

    /// Canvas at snapshot time.
    pub fn canvas(&self) -> &CanvasInfo {
        &self.canvas
    }

    /// Layers at snapshot time.
    pub fn layers(&self) -> &LayerStore {
        &self.layers
    }

    /// Document revision the snapshot was taken at.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Serialize like [`crate::Document::to_bytes`].
    pub fn encode(&self, opts: &EditorOpts) -> LayerdocResult<Vec<u8>> {
        write_document(&self.canvas, &self.layers, opts)
    }
}

/// What an auto-save did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutosaveOutcome {
    /// The file was (re)written.
    Written {
        /// Size of the file.
        bytes: usize,
    },
    /// The encoded document matched the last written file; nothing was written.
    Unchanged,
}

/// Periodic background writer for one target file.
#[derive(Debug)]
pub struct AutoSaver {
    path: PathBuf,
    opts: EditorOpts,
    interval: Option<Duration>,
    last_start: Option<Instant>,
    last_revision: Option<u64>,
    last_hash: Arc<Mutex<Option<u64>>>,
    running: Option<JoinHandle<LayerdocResult<AutosaveOutcome>>>,
}

impl AutoSaver {
    /// Saver writing to `path` every `opts.autosave_interval_secs`.
    pub fn new(path: impl Into<PathBuf>, opts: EditorOpts) -> Self {
        let interval = opts.autosave_interval();
        Self {
            path: path.into(),
            opts,
            interval,
            last_start: None,
            last_revision: None,
            last_hash: Arc::new(Mutex::new(None)),
            running: None,
        }
    }

    /// Target file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return `true` while a background save has not been collected.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Return `true` when enabled, idle, and the interval has passed since the last start.
    pub fn is_due(&self, now: Instant) -> bool {
        let Some(interval) = self.interval else {
            return false;
        };
        self.running.is_none()
            && self
                .last_start
                .is_none_or(|t| now.saturating_duration_since(t) >= interval)
    }

    /// Start a background save when one is due and `snapshot` is newer than the last one
    /// started. Returns `true` when a save was started.
    pub fn maybe_start(&mut self, snapshot: DocumentSnapshot, now: Instant) -> LayerdocResult<bool> {
        if !self.is_due(now) || self.last_revision == Some(snapshot.revision()) {
            return Ok(false);
        }
        self.start(snapshot, now)?;
        Ok(true)
    }

    /// Start a background save of `snapshot` now.
    pub fn start(&mut self, snapshot: DocumentSnapshot, now: Instant) -> LayerdocResult<()> {
        if self.running.is_some() {
            return Err(LayerdocError::validation("an auto-save is already running"));
        }
        let path = self.path.clone();
        let opts = self.opts.clone();
        let last_hash = Arc::clone(&self.last_hash);
        self.last_revision = Some(snapshot.revision());
        let handle = std::thread::Builder::new()
            .name("layerdoc-autosave".into())
            .spawn(move || save_snapshot(&snapshot, &path, &opts, &last_hash))
            .context("spawn auto-save thread")?;
        self.last_start = Some(now);
        self.running = Some(handle);
        Ok(())
    }

    /// Collect a finished background save without blocking.
    pub fn poll(&mut self) -> Option<LayerdocResult<AutosaveOutcome>> {
        if !self.running.as_ref().is_some_and(JoinHandle::is_finished) {
            return None;
        }
        self.finish()
    }

    /// Wait for the running background save, if any.
    pub fn finish(&mut self) -> Option<LayerdocResult<AutosaveOutcome>> {
        let handle = self.running.take()?;
        Some(
            handle
                .join()
                .unwrap_or_else(|_| Err(anyhow::anyhow!("auto-save thread panicked").into())),
        )
    }

    /// Save `snapshot` on the calling thread.
    pub fn save_now(&mut self, snapshot: &DocumentSnapshot) -> LayerdocResult<AutosaveOutcome> {
        if let Some(Err(e)) = self.finish() {
            tracing::warn!(error = %e, "previous auto-save failed");
        }
        self.last_revision = Some(snapshot.revision());
        save_snapshot(snapshot, &self.path, &self.opts, &self.last_hash)
    }
}

#[tracing::instrument(skip_all, fields(path = %path.display(), revision = snapshot.revision()))]
fn save_snapshot(
    snapshot: &DocumentSnapshot,
    path: &Path,
    opts: &EditorOpts,
    last_hash: &Mutex<Option<u64>>,
) -> LayerdocResult<AutosaveOutcome> {
    let bytes = snapshot.encode(opts)?;
    let hash = xxhash_rust::xxh3::xxh3_64(&bytes);
    let mut last = last_hash
        .lock()
        .map_err(|_| anyhow::anyhow!("auto-save state lock poisoned"))?;
    if *last == Some(hash) {
        tracing::debug!("auto-save skipped, content unchanged");
        return Ok(AutosaveOutcome::Unchanged);
    }
    write_atomically(path, &bytes)?;
    *last = Some(hash);
    tracing::info!(bytes = bytes.len(), "auto-saved");
    Ok(AutosaveOutcome::Written { bytes: bytes.len() })
}

/// Write `bytes` next to `path` and rename over it, so readers see the old or the new file.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> LayerdocResult<()> {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, bytes).with_context(|| format!("write {}", tmp.display()))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(anyhow::Error::new(e)
            .context(format!("replace {}", path.display()))
            .into());
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/document/autosave.rs"]
mod tests;
