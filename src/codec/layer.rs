//! Per-layer record: name, fixed base attributes, kind payload, extra blobs.
//!
//! The same record shape is written by the document codec and captured by delete-layer history
//! commands, so undoing a delete goes through exactly the decode path a load uses.

use crate::codec::image as img;
use crate::codec::stream;
use crate::codec::wire::{ByteReader, ByteWriter, len32};
use crate::foundation::config::PngCompression;
use crate::foundation::core::{PixelRect, Point};
use crate::foundation::error::{LayerdocError, LayerdocResult};
use crate::layers::layer::{
    Adjustment, Balloon, BalloonShape, BlendMode, ExtraBlob, Layer, LayerContent, LayerFlags,
    LayerKind, MAX_EXTRA_BLOBS, MAX_EXTRA_BYTES, MAX_LAYER_SIDE, NewLayer, PathShape, TextLayer,
    VectorLayer, VectorPath, VectorPoint,
};

/// Marks the start of every layer record; used to resynchronize after corruption.
pub(crate) const LAYER_MARKER: &[u8; 4] = b"LAYR";

const MAX_NAME_BYTES: usize = 1024;
const POINT_BYTES: usize = 8 + 8 + 4 + 4 + 4;
const PATH_HEADER_BYTES: usize = 1 + 1 + 4 + 4 + 4 + 4;
// origin, box size, font size, color, style, balloon shape, line width, line/fill color, tail.
const TEXT_FIXED_BYTES: usize = 16 + 16 + 4 + 4 + 1 + 1 + 4 + 4 + 4 + 16;
const ADJUSTMENT_BYTES: usize = 1 + 2 * 3;

/// Largest uncompressed vector block a record may carry.
pub(crate) const MAX_VECTOR_BYTES: usize = 256 << 20;
/// Largest text body a text record may carry.
pub(crate) const MAX_TEXT_BYTES: usize = 16 << 20;

/// Payload encoding knobs.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct EncodeOpts {
    pub(crate) png: PngCompression,
    pub(crate) vector_level: u32,
}

/// Plausibility bounds applied while decoding.
///
/// Checked limits follow the declared kind and geometry of each record; the writer refuses
/// payloads above the same caps.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RecordLimits {
    trusted: bool,
}

impl RecordLimits {
    /// Bounds for untrusted input such as files.
    pub(crate) fn checked() -> Self {
        Self { trusted: false }
    }

    /// No bound beyond what the input holds; used for records this process produced.
    pub(crate) fn trusted() -> Self {
        Self { trusted: true }
    }

    fn payload(self, base: &BaseRecord) -> usize {
        if self.trusted {
            return usize::MAX;
        }
        payload_bound(base.kind, base.bounds.width, base.bounds.height, base.channels)
    }

    fn vector_raw(self) -> usize {
        if self.trusted { usize::MAX } else { stream::compress_bound(MAX_VECTOR_BYTES) }
    }

    fn extra(self) -> usize {
        if self.trusted { usize::MAX } else { MAX_EXTRA_BYTES }
    }
}

/// Worst-case PNG size of a `width x height x channels` image: the filtered rows (one filter
/// byte each) may at most double, plus fixed slack for headers and chunk framing.
pub(crate) fn raster_bound(width: u32, height: u32, channels: u8) -> usize {
    let row = (width as usize)
        .saturating_mul(usize::from(channels))
        .saturating_add(1);
    row.saturating_mul(height as usize)
        .saturating_mul(2)
        .saturating_add(1 << 16)
}

/// Largest payload a record of `kind` with the given geometry may carry.
pub(crate) fn payload_bound(kind: LayerKind, width: u32, height: u32, channels: u8) -> usize {
    match kind {
        LayerKind::Raster => raster_bound(width, height, channels),
        LayerKind::VectorPath => 8 + stream::compress_bound(MAX_VECTOR_BYTES),
        LayerKind::Text => TEXT_FIXED_BYTES + 2 + usize::from(u16::MAX) + 4 + MAX_TEXT_BYTES,
        LayerKind::Adjustment => ADJUSTMENT_BYTES,
        LayerKind::Group => 0,
    }
}

/// Fixed base attributes of a layer record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct BaseRecord {
    pub(crate) kind: LayerKind,
    pub(crate) blend: BlendMode,
    pub(crate) bounds: PixelRect,
    pub(crate) flags: LayerFlags,
    pub(crate) opacity: u8,
    pub(crate) channels: u8,
    pub(crate) depth: u16,
}

/// A structurally parsed record whose payload has not been decoded yet.
#[derive(Clone, Debug)]
pub(crate) struct RawRecord<'a> {
    pub(crate) name: String,
    pub(crate) base: BaseRecord,
    pub(crate) payload: &'a [u8],
    pub(crate) extras: Vec<ExtraBlob>,
}

/// A fully decoded record.
#[derive(Clone, Debug)]
pub(crate) struct DecodedLayer {
    pub(crate) name: String,
    pub(crate) base: BaseRecord,
    pub(crate) content: LayerContent,
    pub(crate) extras: Vec<ExtraBlob>,
}

impl DecodedLayer {
    /// Insertion spec for a layer store.
    pub(crate) fn into_new_layer(self) -> NewLayer {
        NewLayer {
            name: self.name,
            content: self.content,
            bounds: self.base.bounds,
            blend: self.base.blend,
            opacity: self.base.opacity,
            flags: self.base.flags,
            extras: self.extras,
        }
    }
}

/// Encode the kind-specific payload of a layer.
pub(crate) fn encode_payload(content: &LayerContent, opts: EncodeOpts) -> LayerdocResult<Vec<u8>> {
    match content {
        LayerContent::Raster(px) => img::encode_buffer(px, opts.png),
        LayerContent::Vector(v) => {
            let mut w = ByteWriter::new();
            stream::write_block(&mut w, &encode_vector(v)?, opts.vector_level)?;
            Ok(w.into_bytes())
        }
        LayerContent::Text(t) => encode_text(t),
        LayerContent::Adjustment(a) => Ok(encode_adjustment(*a)),
        LayerContent::Group => Ok(Vec::new()),
    }
}

/// Decode a payload for the kind and geometry declared in `base`.
pub(crate) fn decode_payload(
    base: &BaseRecord,
    bytes: &[u8],
    limits: RecordLimits,
) -> LayerdocResult<LayerContent> {
    let mut r = ByteReader::new(bytes);
    let content = match base.kind {
        LayerKind::Raster => {
            let px = img::decode_buffer(bytes, base.bounds.width, base.bounds.height, base.channels)?;
            return Ok(LayerContent::Raster(px));
        }
        LayerKind::VectorPath => {
            let raw = stream::read_block(&mut r, limits.vector_raw())?;
            LayerContent::Vector(decode_vector(&raw)?)
        }
        LayerKind::Text => LayerContent::Text(decode_text(&mut r)?),
        LayerKind::Adjustment => LayerContent::Adjustment(decode_adjustment(&mut r)?),
        LayerKind::Group => LayerContent::Group,
    };
    if !r.is_empty() {
        return Err(LayerdocError::codec(format!(
            "{} trailing bytes after {:?} payload",
            r.remaining(),
            base.kind
        )));
    }
    Ok(content)
}

/// Write one record around an already encoded payload.
pub(crate) fn write_record(
    w: &mut ByteWriter,
    layer: &Layer,
    depth: u16,
    payload: &[u8],
) -> LayerdocResult<()> {
    w.bytes(LAYER_MARKER);
    w.str16(layer.name())?;

    let b = layer.bounds();
    w.u8(layer.kind().to_u8());
    w.u8(layer.blend().to_u8());
    w.i32(b.x);
    w.i32(b.y);
    w.u32(b.width);
    w.u32(b.height);
    w.u32(layer.flags().bits());
    w.u8(layer.opacity());
    w.u8(layer.channels());
    w.u16(depth);

    let bound = payload_bound(layer.kind(), b.width, b.height, layer.channels());
    if payload.len() > bound {
        return Err(LayerdocError::codec(format!(
            "layer '{}' payload of {} bytes exceeds the {bound}-byte record limit",
            layer.name(),
            payload.len()
        )));
    }
    w.blob32(payload)?;

    let extras = layer.extras();
    w.u16(extras.len() as u16);
    for blob in extras {
        w.str16(&blob.name)?;
        w.blob32(&blob.data)?;
    }
    Ok(())
}

/// Encode a complete record for `layer`.
pub(crate) fn encode_record(layer: &Layer, depth: u16, opts: EncodeOpts) -> LayerdocResult<Vec<u8>> {
    let payload = encode_payload(layer.content(), opts)?;
    let mut w = ByteWriter::with_capacity(payload.len() + 64);
    write_record(&mut w, layer, depth, &payload)?;
    Ok(w.into_bytes())
}

/// Parse the marker, name and base attributes of the record at the cursor.
///
/// Used on its own to learn the kind and depth of a record whose remainder is damaged.
pub(crate) fn read_base(r: &mut ByteReader<'_>) -> LayerdocResult<(String, BaseRecord)> {
    if r.tag()? != *LAYER_MARKER {
        return Err(LayerdocError::codec(format!(
            "missing layer marker at offset {}",
            r.pos() - 4
        )));
    }
    let name = r.str16()?;
    if name.len() > MAX_NAME_BYTES {
        return Err(LayerdocError::codec(format!(
            "layer name of {} bytes is implausible",
            name.len()
        )));
    }

    let kind_tag = r.u8()?;
    let kind = LayerKind::from_u8(kind_tag)
        .ok_or_else(|| LayerdocError::codec(format!("unknown layer kind {kind_tag}")))?;
    let blend_tag = r.u8()?;
    let blend = BlendMode::from_u8(blend_tag)
        .ok_or_else(|| LayerdocError::codec(format!("unknown blend mode {blend_tag}")))?;
    let bounds = PixelRect::new(r.i32()?, r.i32()?, r.u32()?, r.u32()?);
    let flags = LayerFlags::from_bits_truncate(r.u32()?);
    let opacity = r.u8()?;
    let channels = r.u8()?;
    let depth = r.u16()?;
    if opacity > 100 || !(1..=4).contains(&channels) {
        return Err(LayerdocError::codec(format!(
            "implausible base record (opacity {opacity}, channels {channels})"
        )));
    }

    Ok((
        name,
        BaseRecord {
            kind,
            blend,
            bounds,
            flags,
            opacity,
            channels,
            depth,
        },
    ))
}

/// Parse the record framing at the cursor; the payload is returned undecoded.
pub(crate) fn read_record<'a>(
    r: &mut ByteReader<'a>,
    limits: RecordLimits,
) -> LayerdocResult<RawRecord<'a>> {
    let (name, base) = read_base(r)?;
    let bounds = base.bounds;
    if !limits.trusted
        && base.kind == LayerKind::Raster
        && (bounds.width > MAX_LAYER_SIDE || bounds.height > MAX_LAYER_SIDE)
    {
        return Err(LayerdocError::codec(format!(
            "raster layer of {}x{} is implausible",
            bounds.width, bounds.height
        )));
    }

    let payload = r.blob32(limits.payload(&base))?;

    let extra_count = usize::from(r.u16()?);
    if extra_count > MAX_EXTRA_BLOBS {
        return Err(LayerdocError::codec(format!(
            "{extra_count} extra blobs exceeds {MAX_EXTRA_BLOBS}"
        )));
    }
    let mut extras = Vec::with_capacity(extra_count);
    for _ in 0..extra_count {
        let name = r.str16()?;
        let data = r.blob32(limits.extra())?.to_vec();
        extras.push(ExtraBlob { name, data });
    }

    Ok(RawRecord {
        name,
        base,
        payload,
        extras,
    })
}

/// Parse and decode one complete record.
pub(crate) fn decode_record(bytes: &[u8], limits: RecordLimits) -> LayerdocResult<DecodedLayer> {
    let mut r = ByteReader::new(bytes);
    let raw = read_record(&mut r, limits)?;
    let content = decode_payload(&raw.base, raw.payload, limits)?;
    Ok(DecodedLayer {
        name: raw.name,
        base: raw.base,
        content,
        extras: raw.extras,
    })
}

fn encode_vector(v: &VectorLayer) -> LayerdocResult<Vec<u8>> {
    let mut w = ByteWriter::new();
    w.u32(len32(v.paths.len())?);
    for path in &v.paths {
        w.u8(path.shape.to_u8());
        w.u8(path.flags);
        w.f32(path.line_width);
        w.f32(path.blur);
        w.f32(path.hardness);
        w.u32(len32(path.points.len())?);
        for p in &path.points {
            w.f64(p.pos.x);
            w.f64(p.pos.y);
            w.f32(p.pressure);
            w.f32(p.size);
            w.bytes(&p.color);
        }
    }
    let raw = w.into_bytes();
    if raw.len() > MAX_VECTOR_BYTES {
        return Err(LayerdocError::codec(format!(
            "vector paths take {} bytes, more than {MAX_VECTOR_BYTES}",
            raw.len()
        )));
    }
    Ok(raw)
}

fn decode_vector(raw: &[u8]) -> LayerdocResult<VectorLayer> {
    let mut r = ByteReader::new(raw);
    let count = r.u32()? as usize;
    if count.saturating_mul(PATH_HEADER_BYTES) > r.remaining() {
        return Err(LayerdocError::codec(format!("{count} vector paths cannot fit")));
    }
    let mut paths = Vec::with_capacity(count);
    for _ in 0..count {
        let shape_tag = r.u8()?;
        let shape = PathShape::from_u8(shape_tag)
            .ok_or_else(|| LayerdocError::codec(format!("unknown path shape {shape_tag}")))?;
        let flags = r.u8()?;
        let line_width = r.f32()?;
        let blur = r.f32()?;
        let hardness = r.f32()?;
        let n = r.u32()? as usize;
        if n.saturating_mul(POINT_BYTES) > r.remaining() {
            return Err(LayerdocError::codec(format!("{n} vector points cannot fit")));
        }
        let mut points = Vec::with_capacity(n);
        for _ in 0..n {
            let pos = Point::new(r.f64()?, r.f64()?);
            let pressure = r.f32()?;
            let size = r.f32()?;
            let mut color = [0u8; 4];
            color.copy_from_slice(r.take(4)?);
            points.push(VectorPoint {
                pos,
                pressure,
                size,
                color,
            });
        }
        paths.push(VectorPath {
            shape,
            flags,
            line_width,
            blur,
            hardness,
            points,
        });
    }
    if !r.is_empty() {
        return Err(LayerdocError::codec("trailing bytes after vector paths"));
    }
    Ok(VectorLayer { paths })
}

fn encode_text(t: &TextLayer) -> LayerdocResult<Vec<u8>> {
    if t.text.len() > MAX_TEXT_BYTES {
        return Err(LayerdocError::codec(format!(
            "text of {} bytes is longer than {MAX_TEXT_BYTES}",
            t.text.len()
        )));
    }
    let mut w = ByteWriter::new();
    w.f64(t.origin.x);
    w.f64(t.origin.y);
    w.f64(t.box_width);
    w.f64(t.box_height);
    w.f32(t.font_size);
    w.bytes(&t.color);
    w.u8(t.style);
    w.u8(t.balloon.shape.to_u8());
    w.f32(t.balloon.line_width);
    w.bytes(&t.balloon.line_color);
    w.bytes(&t.balloon.fill_color);
    w.f64(t.balloon.tail.x);
    w.f64(t.balloon.tail.y);
    w.str16(&t.font_name)?;
    w.blob32(t.text.as_bytes())?;
    Ok(w.into_bytes())
}

fn decode_text(r: &mut ByteReader<'_>) -> LayerdocResult<TextLayer> {
    let origin = Point::new(r.f64()?, r.f64()?);
    let box_width = r.f64()?;
    let box_height = r.f64()?;
    let font_size = r.f32()?;
    let color = rgba(r)?;
    let style = r.u8()?;
    let shape_tag = r.u8()?;
    let shape = BalloonShape::from_u8(shape_tag)
        .ok_or_else(|| LayerdocError::codec(format!("unknown balloon shape {shape_tag}")))?;
    let line_width = r.f32()?;
    let line_color = rgba(r)?;
    let fill_color = rgba(r)?;
    let tail = Point::new(r.f64()?, r.f64()?);
    let font_name = r.str16()?;
    let remaining = r.remaining();
    let text = String::from_utf8(r.blob32(remaining)?.to_vec())
        .map_err(|_| LayerdocError::codec("text layer content is not UTF-8"))?;
    Ok(TextLayer {
        origin,
        box_width,
        box_height,
        font_size,
        color,
        style,
        balloon: Balloon {
            shape,
            line_width,
            line_color,
            fill_color,
            tail,
        },
        font_name,
        text,
    })
}

fn rgba(r: &mut ByteReader<'_>) -> LayerdocResult<[u8; 4]> {
    let mut out = [0u8; 4];
    out.copy_from_slice(r.take(4)?);
    Ok(out)
}

fn encode_adjustment(a: Adjustment) -> Vec<u8> {
    let mut w = ByteWriter::new();
    match a {
        Adjustment::BrightnessContrast {
            brightness,
            contrast,
        } => {
            w.u8(0);
            w.i16(brightness);
            w.i16(contrast);
            w.i16(0);
        }
        Adjustment::HueSaturation {
            hue,
            saturation,
            value,
        } => {
            w.u8(1);
            w.i16(hue);
            w.i16(saturation);
            w.i16(value);
        }
    }
    w.into_bytes()
}

fn decode_adjustment(r: &mut ByteReader<'_>) -> LayerdocResult<Adjustment> {
    let kind = r.u8()?;
    let (a, b, c) = (r.i16()?, r.i16()?, r.i16()?);
    match kind {
        0 => Ok(Adjustment::BrightnessContrast {
            brightness: a,
            contrast: b,
        }),
        1 => Ok(Adjustment::HueSaturation {
            hue: a,
            saturation: b,
            value: c,
        }),
        other => Err(LayerdocError::codec(format!("unknown adjustment kind {other}"))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/codec/layer.rs"]
mod tests;
