//! layerdoc is the document model of a layered raster/vector image editor.
//!
//! It owns the layer stack, undo/redo history and the chunked binary file format.
//!
//! # Overview
//!
//! 1. **Layers**: [`LayerStore`] keeps layers in bottom-to-top order in an arena addressed by
//!    stable [`LayerId`] handles. A group layer is followed by the contiguous block of its
//!    descendants.
//! 2. **History**: [`HistoryLog`] is a fixed-capacity ring of [`Command`]s. Pixel edits are
//!    captured as [`RegionPatch`]es whose single swap handler both undoes and redoes.
//! 3. **Codec**: [`write_document`] / [`read_document`] serialize a document. The reader
//!    substitutes placeholder layers for damaged records and reports the repair in a
//!    [`LoadReport`].
//! 4. **Document**: [`Document`] ties everything together, notifies a [`CanvasObserver`] of every
//!    touched canvas rectangle and hands out copy-on-write [`DocumentSnapshot`]s for
//!    [`AutoSaver`].
//!
//! The key constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Single-threaded mutation**: only snapshots cross threads.
//! - **Stable identity**: layer names are display attributes; handles are never reused.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod codec;
mod document;
mod foundation;
mod history;
mod layers;

pub use codec::chunk::ChunkTag;
pub use codec::document::{
    FORMAT_VERSION, LoadReport, LoadedDocument, MAGIC, PLACEHOLDER_LAYER, RECOVERED_LAYER,
    read_document, write_document,
};
pub use codec::image::{ImagePixels, decode_pixels, encode_pixels, fit_within};
pub use codec::stream::{compress, compress_bound, decompress};
pub use document::autosave::{AutoSaver, AutosaveOutcome, DocumentSnapshot};
pub use document::canvas::{
    CanvasInfo, CanvasMeta, DocumentSpec, IccProfile, MAX_CANVAS_SIDE, PerspectiveRuler,
    RulerMode,
};
pub use document::document::Document;
pub use document::observer::{CanvasObserver, RecordingObserver};
pub use foundation::config::{EditorOpts, PngCompression};
pub use foundation::core::{ColorMode, PixelRect, Point, align4};
pub use foundation::error::{LayerdocError, LayerdocResult};
pub use history::command::{Command, LayerSnapshot};
pub use history::log::{HistoryEntry, HistoryLog, HistoryState, Replayed};
pub use history::patch::{RegionMut, RegionPatch};
pub use layers::layer::{
    Adjustment, Balloon, BalloonShape, BlendMode, ExtraBlob, Layer, LayerContent, LayerFlags,
    LayerId, LayerKind, LayerParams, MAX_EXTRA_BLOBS, MAX_EXTRA_BYTES, MAX_LAYER_SIDE, NewLayer,
    PathShape, PixelBuffer, TextLayer, VectorLayer, VectorPath, VectorPoint,
};
pub use layers::mirror::FocalMirror;
pub use layers::store::{Iter, LayerStore, Placement};
