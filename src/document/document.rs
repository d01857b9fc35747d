use std::path::Path;

use anyhow::Context;

use crate::codec::document::{LoadReport, LoadedDocument, read_document, write_document};
use crate::codec::image::{ImagePixels, fit_within};
use crate::document::autosave::{DocumentSnapshot, write_atomically};
use crate::document::canvas::{CanvasInfo, CanvasMeta, DocumentSpec};
use crate::document::observer::CanvasObserver;
use crate::foundation::config::EditorOpts;
use crate::foundation::core::PixelRect;
use crate::foundation::error::{LayerdocError, LayerdocResult};
use crate::history::command::Command;
use crate::history::log::HistoryLog;
use crate::history::patch::{RegionMut, RegionPatch};
use crate::layers::layer::{LayerFlags, LayerId, LayerParams, NewLayer};
use crate::layers::mirror::FocalMirror;
use crate::layers::store::LayerStore;

/// An open document: canvas, layers, history and selection.
///
/// Every mutating operation goes through here so that it is recorded in the history log and
/// the touched canvas rectangle is reported to the observer.
pub struct Document {
    canvas: CanvasInfo,
    layers: LayerStore,
    history: HistoryLog,
    opts: EditorOpts,
    active_layer: Option<LayerId>,
    active_group: Option<LayerId>,
    revision: u64,
    saved_revision: u64,
    observer: Option<Box<dyn CanvasObserver + Send>>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("canvas", &self.canvas)
            .field("layers", &self.layers.len())
            .field("history", &self.history.state())
            .field("active_layer", &self.active_layer)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

impl Document {
    /// New document with one transparent raster layer covering the canvas.
    pub fn new(spec: &DocumentSpec, opts: EditorOpts) -> LayerdocResult<Self> {
        opts.validate()?;
        let canvas = CanvasInfo::new(spec)?;
        let mut layers = LayerStore::new();
        let first = NewLayer::empty_raster(
            spec.first_layer.clone(),
            PixelRect::from_size(canvas.width(), canvas.height()),
            4,
        )?;
        layers.create_layer(first, None)?;
        Self::assemble(canvas, layers, opts)
    }

    fn assemble(canvas: CanvasInfo, layers: LayerStore, opts: EditorOpts) -> LayerdocResult<Self> {
        let history = HistoryLog::new(opts.history_capacity)?;
        let mut doc = Self {
            canvas,
            layers,
            history,
            opts,
            active_layer: None,
            active_group: None,
            revision: 0,
            saved_revision: 0,
            observer: None,
        };
        doc.fix_active();
        Ok(doc)
    }

    /// Canvas state.
    pub fn canvas(&self) -> &CanvasInfo {
        &self.canvas
    }

    /// Chunk metadata; edits to it are not recorded in history.
    pub fn meta_mut(&mut self) -> &mut CanvasMeta {
        self.touch();
        &mut self.canvas.meta
    }

    /// Layer hierarchy.
    pub fn layers(&self) -> &LayerStore {
        &self.layers
    }

    /// Undo/redo log.
    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Options the document was opened with.
    pub fn opts(&self) -> &EditorOpts {
        &self.opts
    }

    /// Selected layer.
    pub fn active_layer(&self) -> Option<LayerId> {
        self.active_layer
    }

    /// Group enclosing the selected layer.
    pub fn active_group(&self) -> Option<LayerId> {
        self.active_group
    }

    /// Counter bumped by every change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Return `true` when there are changes since the last save or load.
    pub fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    /// Install the change observer, replacing any previous one.
    pub fn set_observer(&mut self, observer: impl CanvasObserver + Send + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Remove the change observer.
    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    /// Select a layer; its enclosing group becomes the active group.
    pub fn set_active(&mut self, id: LayerId) -> LayerdocResult<()> {
        let parent = self.layers.layer(id)?.parent();
        self.active_layer = Some(id);
        self.active_group = parent;
        Ok(())
    }

    /// Insert a layer above `prev`, inheriting group membership, and select it.
    pub fn add_layer(&mut self, spec: NewLayer, prev: Option<LayerId>) -> LayerdocResult<LayerId> {
        let parent = self.layers.inherited_parent(prev);
        self.add_layer_in(spec, prev, parent)
    }

    /// Insert a layer above `prev` into `parent` and select it.
    pub fn add_layer_in(
        &mut self,
        spec: NewLayer,
        prev: Option<LayerId>,
        parent: Option<LayerId>,
    ) -> LayerdocResult<LayerId> {
        let entry = format!("New Layer {}", spec.name);
        let id = self.layers.create_layer_in(spec, prev, parent)?;
        let bounds = self.layers.layer(id)?.bounds();
        self.record(entry, Command::created(id), Some(bounds));
        self.set_active(id)?;
        Ok(id)
    }

    /// Delete a layer; a group's children move up to the group's parent.
    pub fn remove_layer(&mut self, id: LayerId) -> LayerdocResult<()> {
        let layer = self.layers.layer(id)?;
        let entry = format!("Delete Layer {}", layer.name());
        let bounds = layer.bounds();
        let cmd = Command::delete(&mut self.layers, id)?;
        self.record(entry, cmd, Some(bounds));
        self.fix_active();
        Ok(())
    }

    /// Move a layer (and its descendants) above `new_prev`, inheriting membership.
    pub fn move_layer(&mut self, id: LayerId, new_prev: Option<LayerId>) -> LayerdocResult<()> {
        let parent = self.layers.inherited_parent(new_prev);
        self.move_layer_in(id, new_prev, parent)
    }

    /// Move a layer (and its descendants) above `new_prev` into `parent`.
    pub fn move_layer_in(
        &mut self,
        id: LayerId,
        new_prev: Option<LayerId>,
        parent: Option<LayerId>,
    ) -> LayerdocResult<()> {
        let before = self.layers.placement(id)?;
        self.layers.change_order_in(id, new_prev, parent)?;
        let layer = self.layers.layer(id)?;
        let entry = format!("Move Layer {}", layer.name());
        let bounds = layer.bounds();
        let cmd = Command::Reorder {
            layer: id,
            placement: before,
        };
        self.record(entry, cmd, Some(bounds));
        if self.active_layer == Some(id) {
            self.active_group = self.layers.layer(id)?.parent();
        }
        Ok(())
    }

    /// Replace name, blend, opacity, flags and position of a layer.
    pub fn set_layer_params(&mut self, id: LayerId, params: LayerParams) -> LayerdocResult<()> {
        self.change_params("Layer Properties", id, params)
    }

    /// Rename a layer.
    pub fn rename_layer(&mut self, id: LayerId, name: impl Into<String>) -> LayerdocResult<()> {
        let mut params = self.layers.layer(id)?.params();
        params.name = name.into();
        self.change_params("Rename Layer", id, params)
    }

    /// Show or hide a layer.
    pub fn set_visible(&mut self, id: LayerId, visible: bool) -> LayerdocResult<()> {
        let mut params = self.layers.layer(id)?.params();
        params.flags.set(LayerFlags::HIDDEN, !visible);
        self.change_params("Layer Visibility", id, params)
    }

    fn change_params(&mut self, entry: &str, id: LayerId, params: LayerParams) -> LayerdocResult<()> {
        let before = self.layers.layer(id)?.bounds();
        let old = self.layers.set_params(id, params)?;
        let after = self.layers.layer(id)?.bounds();
        let cmd = Command::ParameterChange {
            layer: id,
            params: old,
        };
        self.record(entry, cmd, Some(before.union(after)));
        Ok(())
    }

    /// Edit a rectangle (layer-local) of a raster layer.
    ///
    /// The rectangle is clamped to the layer first. Returns `false` without recording anything
    /// when nothing of it overlaps the layer. When `edit` fails the pixels are put back.
    pub fn edit_region<F>(
        &mut self,
        id: LayerId,
        rect: PixelRect,
        name: impl Into<String>,
        edit: F,
    ) -> LayerdocResult<bool>
    where
        F: FnOnce(&mut RegionMut<'_>) -> LayerdocResult<()>,
    {
        let layer = self.layers.layer_mut(id)?;
        let bounds = layer.bounds();
        let px = layer
            .pixels_mut()
            .ok_or_else(|| LayerdocError::validation(format!("layer {id} is not a raster layer")))?;
        let Some(mut patch) = RegionPatch::capture(id, px, rect) else {
            return Ok(false);
        };
        let clamped = patch.rect();
        if let Err(e) = edit(&mut RegionMut::new(px, clamped)) {
            patch.swap(px)?;
            return Err(e);
        }
        let damage = clamped.translate(bounds.x, bounds.y);
        self.record(name, Command::RegionPatch(patch), Some(damage));
        Ok(true)
    }

    /// Revert the newest edit. Returns its name, `None` when there was nothing to undo.
    #[tracing::instrument(skip(self))]
    pub fn undo(&mut self) -> LayerdocResult<Option<String>> {
        let Some(done) = self.history.undo(&mut self.layers)? else {
            return Ok(None);
        };
        self.after_replay(done.damage);
        Ok(Some(done.name))
    }

    /// Re-apply the newest undone edit. Returns its name, `None` when there was nothing to redo.
    #[tracing::instrument(skip(self))]
    pub fn redo(&mut self) -> LayerdocResult<Option<String>> {
        let Some(done) = self.history.redo(&mut self.layers)? else {
            return Ok(None);
        };
        self.after_replay(done.damage);
        Ok(Some(done.name))
    }

    /// Copy mirrored layers back into the document.
    ///
    /// Mirror edits bypass the history log, so recorded entries are dropped.
    pub fn apply_mirror(&mut self, mirror: &FocalMirror) -> LayerdocResult<()> {
        mirror.push_to_source(&mut self.layers)?;
        self.history.clear();
        tracing::debug!("history cleared after mirror write-back");
        let full = PixelRect::from_size(self.canvas.width(), self.canvas.height());
        self.touch();
        self.notify(Some(full));
        Ok(())
    }

    /// Store a downscaled thumbnail of `composite`; a zero thumbnail size removes it.
    pub fn update_thumbnail(&mut self, composite: &ImagePixels) -> LayerdocResult<()> {
        self.canvas.thumbnail = match self.opts.thumbnail_max_side {
            0 => None,
            side => Some(fit_within(composite, side)?),
        };
        self.touch();
        Ok(())
    }

    /// Copy-on-write snapshot for background saving.
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot::new(self.canvas.clone(), self.layers.clone(), self.revision)
    }

    /// Serialize to the document format.
    pub fn to_bytes(&self) -> LayerdocResult<Vec<u8>> {
        write_document(&self.canvas, &self.layers, &self.opts)
    }

    /// Parse a document; see [`LoadReport`] for what was repaired.
    pub fn from_bytes(bytes: &[u8], opts: EditorOpts) -> LayerdocResult<(Self, LoadReport)> {
        opts.validate()?;
        let LoadedDocument {
            canvas,
            layers,
            report,
        } = read_document(bytes)?;
        Ok((Self::assemble(canvas, layers, opts)?, report))
    }

    /// Write the document to `path`; the file is replaced only once fully written.
    #[tracing::instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn save(&mut self, path: impl AsRef<Path>) -> LayerdocResult<()> {
        let bytes = self.to_bytes()?;
        write_atomically(path.as_ref(), &bytes)?;
        self.saved_revision = self.revision;
        tracing::info!(bytes = bytes.len(), "document saved");
        Ok(())
    }

    /// Read a document from `path`.
    #[tracing::instrument(skip(path, opts), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>, opts: EditorOpts) -> LayerdocResult<(Self, LoadReport)> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        let (doc, report) = Self::from_bytes(&bytes, opts)?;
        if !report.is_clean() {
            tracing::warn!(?report, "document repaired while loading");
        }
        Ok((doc, report))
    }

    fn record(&mut self, name: impl Into<String>, cmd: Command, damage: Option<PixelRect>) {
        self.history.append(name, cmd);
        self.touch();
        self.notify(damage);
    }

    fn after_replay(&mut self, damage: Option<PixelRect>) {
        self.touch();
        self.fix_active();
        self.notify(damage);
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn notify(&mut self, damage: Option<PixelRect>) {
        if let (Some(obs), Some(rect)) = (self.observer.as_mut(), damage) {
            obs.region_changed(rect);
        }
    }

    // Keep the selection on a linked layer after structural changes.
    fn fix_active(&mut self) {
        let id = match self.active_layer {
            Some(id) if self.layers.contains(id) => id,
            _ => match self.layers.top() {
                Some(top) => top,
                None => {
                    self.active_layer = None;
                    self.active_group = None;
                    return;
                }
            },
        };
        self.active_layer = Some(id);
        self.active_group = self.layers.get(id).and_then(|l| l.parent());
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/document.rs"]
mod tests;
