//! Whole-document container: header, thumbnail, background, layer records, tagged chunks.
//!
//! Layout (little-endian):
//!
//! ```text
//! magic "LAYERDOC" | version u32
//! thumbnail flag u8 [| len u32 | PNG]
//! channels u8 | color mode u8 | original w,h u32 | aligned w,h u32 | layer count u32
//! background: len u32 | PNG
//! layer records bottom-to-top ("LAYR" ...)
//! "CHNK" then (tag [4], len u32, payload)* until end of file
//! ```
//!
//! Reading is forgiving past the header: a damaged layer record becomes a placeholder layer and
//! the reader resynchronizes on the next record marker.

use rayon::prelude::*;

use crate::codec::chunk::{CHUNK_MARKER, read_chunks, write_chunks};
use crate::codec::image::{ImagePixels, decode_buffer, decode_pixels, encode_buffer, encode_pixels};
use crate::codec::layer::{
    DecodedLayer, EncodeOpts, LAYER_MARKER, RecordLimits, decode_payload, encode_payload,
    raster_bound, read_base, read_record, write_record,
};
use crate::codec::wire::{ByteReader, ByteWriter, len32};
use crate::document::canvas::{CanvasInfo, CanvasMeta, check_canvas};
use crate::foundation::config::EditorOpts;
use crate::foundation::core::{ColorMode, PixelRect};
use crate::foundation::error::{LayerdocError, LayerdocResult};
use crate::layers::layer::{Layer, LayerId, LayerKind, NewLayer};
use crate::layers::store::LayerStore;

/// File signature.
pub const MAGIC: &[u8; 8] = b"LAYERDOC";

/// Layout version written by this crate. Files with another version keep their header,
/// background and chunks, but their layer records are not interpreted.
pub const FORMAT_VERSION: u32 = 1;

/// Name given to the placeholder layer of a file whose layer records were skipped or empty.
pub const PLACEHOLDER_LAYER: &str = "Layer 1";

/// Base name of layers substituted for damaged records.
pub const RECOVERED_LAYER: &str = "Damaged Layer";

/// What a load had to repair or ignore.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct LoadReport {
    /// Format version found in the header.
    pub version: u32,
    /// Names of placeholder layers inserted for damaged or missing records.
    pub recovered_layers: Vec<String>,
    /// `(stored, assigned)` names of layers renamed because the file repeated a name.
    pub renamed_layers: Vec<(String, String)>,
    /// Tags of chunks that were skipped (unknown or malformed).
    pub skipped_chunks: Vec<String>,
    /// Layer records were not read because of a version mismatch.
    pub layer_bodies_skipped: bool,
}

impl LoadReport {
    /// Return `true` when the file loaded without any repair.
    pub fn is_clean(&self) -> bool {
        self.recovered_layers.is_empty()
            && self.renamed_layers.is_empty()
            && self.skipped_chunks.is_empty()
            && !self.layer_bodies_skipped
    }
}

/// Result of [`read_document`].
#[derive(Clone, Debug)]
pub struct LoadedDocument {
    /// Canvas state.
    pub canvas: CanvasInfo,
    /// Rebuilt layer hierarchy.
    pub layers: LayerStore,
    /// Repairs applied while reading.
    pub report: LoadReport,
}

/// Serialize a document.
#[tracing::instrument(skip_all, fields(layers = layers.len(), w = canvas.width, h = canvas.height))]
pub fn write_document(
    canvas: &CanvasInfo,
    layers: &LayerStore,
    opts: &EditorOpts,
) -> LayerdocResult<Vec<u8>> {
    let enc = EncodeOpts {
        png: opts.png_compression,
        vector_level: opts.vector_compression_level,
    };
    let ordered: Vec<&Layer> = layers.iter().collect();
    let payloads: Vec<Vec<u8>> = if opts.parallel_encode {
        ordered
            .par_iter()
            .map(|l| encode_payload(l.content(), enc))
            .collect::<LayerdocResult<_>>()?
    } else {
        ordered
            .iter()
            .map(|l| encode_payload(l.content(), enc))
            .collect::<LayerdocResult<_>>()?
    };

    let body: usize = payloads.iter().map(Vec::len).sum();
    let mut w = ByteWriter::with_capacity(body + 1024);
    w.bytes(MAGIC);
    w.u32(FORMAT_VERSION);

    match &canvas.thumbnail {
        Some(t) => {
            w.u8(1);
            let png = encode_pixels(
                &t.data,
                t.width,
                t.height,
                t.stride,
                t.channels,
                opts.png_compression,
            )?;
            w.blob32(&png)?;
        }
        None => w.u8(0),
    }

    w.u8(canvas.channels);
    w.u8(canvas.color_mode.to_u8());
    w.u32(canvas.original_width);
    w.u32(canvas.original_height);
    w.u32(canvas.width);
    w.u32(canvas.height);
    w.u32(len32(ordered.len())?);
    w.blob32(&encode_buffer(&canvas.background, opts.png_compression)?)?;

    for (layer, payload) in ordered.iter().zip(&payloads) {
        let depth = u16::try_from(layers.depth(layer.id()))
            .map_err(|_| LayerdocError::validation("group nesting too deep to store"))?;
        write_record(&mut w, layer, depth, payload)?;
    }

    write_chunks(&mut w, &canvas.meta)?;
    Ok(w.into_bytes())
}

/// Parse a document, repairing what can be repaired.
///
/// Fails with [`LayerdocError::Format`] only when the header or background is unusable.
#[tracing::instrument(skip_all, fields(len = bytes.len()))]
pub fn read_document(bytes: &[u8]) -> LayerdocResult<LoadedDocument> {
    let mut r = ByteReader::new(bytes);
    let mut report = LoadReport::default();

    let magic = r
        .take(MAGIC.len())
        .map_err(|_| LayerdocError::format("file is too short to be a document"))?;
    if magic != MAGIC {
        return Err(LayerdocError::format("bad magic, not a layer document"));
    }
    let header = read_header(&mut r)?;
    report.version = header.version;
    let background = r
        .blob32(raster_bound(header.width, header.height, header.channels))
        .and_then(|png| decode_buffer(png, header.width, header.height, header.channels))
        .map_err(|e| LayerdocError::format(format!("background does not match header: {e}")))?;

    let mut canvas = CanvasInfo {
        width: header.width,
        height: header.height,
        original_width: header.original_width,
        original_height: header.original_height,
        channels: header.channels,
        color_mode: header.color_mode,
        background,
        thumbnail: header.thumbnail,
        meta: CanvasMeta::default(),
    };

    let mut layers = LayerStore::new();
    if header.version == FORMAT_VERSION {
        let pending = read_layer_table(&mut r, header.layer_count, RecordLimits::checked());
        build_hierarchy(&mut layers, pending, &canvas, &mut report)?;
    } else {
        tracing::warn!(
            found = header.version,
            expected = FORMAT_VERSION,
            "format version mismatch, layer records skipped"
        );
        report.layer_bodies_skipped = true;
    }

    if !r.at(CHUNK_MARKER) {
        match r.find_any(&[CHUNK_MARKER]) {
            Some(pos) => {
                if !report.layer_bodies_skipped {
                    tracing::warn!(offset = r.pos(), "unexpected bytes before chunk table");
                }
                r.seek(pos);
            }
            None => {
                tracing::warn!("chunk table missing");
                r.seek(bytes.len());
            }
        }
    }
    if r.at(CHUNK_MARKER) {
        r.seek(r.pos() + CHUNK_MARKER.len());
        report.skipped_chunks = read_chunks(&mut r, &mut canvas.meta)
            .into_iter()
            .map(|id| String::from_utf8_lossy(&id).into_owned())
            .collect();
    }

    if layers.is_empty() {
        let (_, name) = placeholder(&mut layers, &canvas, PLACEHOLDER_LAYER, None, None, None)?;
        report.recovered_layers.push(name);
    }

    Ok(LoadedDocument {
        canvas,
        layers,
        report,
    })
}

struct Header {
    version: u32,
    thumbnail: Option<ImagePixels>,
    channels: u8,
    color_mode: ColorMode,
    original_width: u32,
    original_height: u32,
    width: u32,
    height: u32,
    layer_count: u32,
}

fn read_header(r: &mut ByteReader<'_>) -> LayerdocResult<Header> {
    let truncated = |e: LayerdocError| LayerdocError::format(format!("truncated header: {e}"));

    let version = r.u32().map_err(truncated)?;
    let thumbnail = match r.u8().map_err(truncated)? {
        0 => None,
        _ => {
            let png = r.blob32(usize::MAX).map_err(truncated)?;
            match decode_pixels(png) {
                Ok(px) => Some(px),
                Err(e) => {
                    tracing::warn!(error = %e, "dropping unreadable thumbnail");
                    None
                }
            }
        }
    };
    let channels = r.u8().map_err(truncated)?;
    let mode_tag = r.u8().map_err(truncated)?;
    let original_width = r.u32().map_err(truncated)?;
    let original_height = r.u32().map_err(truncated)?;
    let width = r.u32().map_err(truncated)?;
    let height = r.u32().map_err(truncated)?;
    let layer_count = r.u32().map_err(truncated)?;

    let color_mode = ColorMode::from_u8(mode_tag)
        .ok_or_else(|| LayerdocError::format(format!("unknown color mode {mode_tag}")))?;
    if !(3..=4).contains(&channels) {
        return Err(LayerdocError::format(format!(
            "background channel count {channels} is not 3 or 4"
        )));
    }
    check_canvas(width, height).map_err(|e| LayerdocError::format(e.to_string()))?;

    Ok(Header {
        version,
        thumbnail,
        channels,
        color_mode,
        original_width,
        original_height,
        width,
        height,
        layer_count,
    })
}

enum Pending {
    Decoded(NewLayer),
    /// Carries the declared kind when the base record was readable.
    Damaged(Option<LayerKind>),
}

// Read up to `count` records, turning each damaged one into `Pending::Damaged`. Kind and depth
// are `None` when even the base attributes of the record are unreadable.
fn read_layer_table(
    r: &mut ByteReader<'_>,
    count: u32,
    limits: RecordLimits,
) -> Vec<(Pending, Option<u16>)> {
    let mut out = Vec::new();
    for index in 0..count {
        if r.is_empty() || r.at(CHUNK_MARKER) {
            tracing::warn!(read = index, declared = count, "layer table ends early");
            break;
        }
        let start = r.pos();
        match read_record(r, limits) {
            Ok(raw) => {
                let depth = Some(raw.base.depth);
                match decode_payload(&raw.base, raw.payload, limits) {
                    Ok(content) => {
                        let decoded = DecodedLayer {
                            name: raw.name,
                            base: raw.base,
                            content,
                            extras: raw.extras,
                        };
                        out.push((Pending::Decoded(decoded.into_new_layer()), depth));
                    }
                    Err(e) => {
                        tracing::warn!(index, name = %raw.name, error = %e, "damaged layer payload");
                        out.push((Pending::Damaged(Some(raw.base.kind)), depth));
                    }
                }
            }
            Err(e) => {
                tracing::warn!(index, offset = start, error = %e, "damaged layer record");
                r.seek(start);
                match read_base(r) {
                    Ok((_, base)) => {
                        out.push((Pending::Damaged(Some(base.kind)), Some(base.depth)));
                    }
                    Err(_) => out.push((Pending::Damaged(None), None)),
                }
                r.seek(start + 1);
                let next = r
                    .find_any(&[LAYER_MARKER, CHUNK_MARKER])
                    .unwrap_or(start + 1 + r.remaining());
                r.seek(next);
            }
        }
    }
    out
}

// Link pending layers bottom-to-top; the depth counter is treated as a stack of open groups.
// A record without a readable depth stays in the innermost open group.
fn build_hierarchy(
    store: &mut LayerStore,
    pending: Vec<(Pending, Option<u16>)>,
    canvas: &CanvasInfo,
    report: &mut LoadReport,
) -> LayerdocResult<()> {
    let mut open: Vec<LayerId> = Vec::new();
    let mut prev = None;
    for (entry, depth) in pending {
        let depth = depth.map_or(open.len(), usize::from);
        if depth > open.len() {
            tracing::warn!(depth, open = open.len(), "depth jumps past open groups");
        }
        open.truncate(depth);
        let parent = open.last().copied();

        let id = match entry {
            Pending::Decoded(mut spec) => {
                let kind = spec.content.kind();
                let stored = std::mem::take(&mut spec.name);
                let base = if stored.is_empty() { "Layer" } else { stored.as_str() };
                let assigned = store.unique_name(base);
                spec.name = assigned.clone();
                match store.create_layer_in(spec, prev, parent) {
                    Ok(id) => {
                        if assigned != stored {
                            report.renamed_layers.push((stored, assigned));
                        }
                        id
                    }
                    Err(e) => {
                        tracing::warn!(name = %stored, error = %e, "layer rejected on load");
                        let (id, name) =
                            placeholder(store, canvas, RECOVERED_LAYER, Some(kind), prev, parent)?;
                        report.recovered_layers.push(name);
                        id
                    }
                }
            }
            Pending::Damaged(kind) => {
                let (id, name) = placeholder(store, canvas, RECOVERED_LAYER, kind, prev, parent)?;
                report.recovered_layers.push(name);
                id
            }
        };

        if store.layer(id)?.kind() == LayerKind::Group {
            open.push(id);
        }
        prev = Some(id);
    }
    Ok(())
}

// Insert a transparent canvas-sized raster layer, or an empty group when the lost record was a
// group so that the records above it keep their parent.
fn placeholder(
    store: &mut LayerStore,
    canvas: &CanvasInfo,
    base: &str,
    kind: Option<LayerKind>,
    prev: Option<LayerId>,
    parent: Option<LayerId>,
) -> LayerdocResult<(LayerId, String)> {
    let name = store.unique_name(base);
    let bounds = PixelRect::from_size(canvas.width, canvas.height);
    let spec = match kind {
        Some(LayerKind::Group) => NewLayer::group(name.clone(), bounds),
        _ => NewLayer::empty_raster(name.clone(), bounds, 4)?,
    };
    let id = store.create_layer_in(spec, prev, parent)?;
    Ok((id, name))
}

#[cfg(test)]
#[path = "../../tests/unit/codec/document.rs"]
mod tests;
