use crate::codec::wire::{ByteReader, ByteWriter, len32};
use crate::document::canvas::{CanvasMeta, IccProfile, PerspectiveRuler, RulerMode};
use crate::foundation::core::Point;
use crate::foundation::error::{LayerdocError, LayerdocResult};

/// Marks the start of the tagged chunk table.
pub(crate) const CHUNK_MARKER: &[u8; 4] = b"CHNK";

/// Chunk tags this version understands. Anything else is skipped by its length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkTag {
    /// Print resolution in DPI.
    Resolution,
    /// Secondary background color.
    SecondBackground,
    /// Embedded ICC profile bytes.
    IccEmbedded,
    /// Path of an external ICC profile.
    IccPath,
    /// Perspective ruler configuration.
    PerspectiveRuler,
}

impl ChunkTag {
    /// Four-byte on-disk id.
    pub fn id(self) -> [u8; 4] {
        *match self {
            ChunkTag::Resolution => b"RESO",
            ChunkTag::SecondBackground => b"2BGC",
            ChunkTag::IccEmbedded => b"ICCE",
            ChunkTag::IccPath => b"ICCP",
            ChunkTag::PerspectiveRuler => b"PRSP",
        }
    }

    /// Parse an on-disk id.
    pub fn from_id(id: [u8; 4]) -> Option<Self> {
        Some(match &id {
            b"RESO" => ChunkTag::Resolution,
            b"2BGC" => ChunkTag::SecondBackground,
            b"ICCE" => ChunkTag::IccEmbedded,
            b"ICCP" => ChunkTag::IccPath,
            b"PRSP" => ChunkTag::PerspectiveRuler,
            _ => return None,
        })
    }
}

/// Write the chunk table marker followed by every present chunk.
pub(crate) fn write_chunks(w: &mut ByteWriter, meta: &CanvasMeta) -> LayerdocResult<()> {
    w.bytes(CHUNK_MARKER);
    if let Some(dpi) = meta.resolution {
        write_chunk(w, ChunkTag::Resolution.id(), &dpi.to_le_bytes())?;
    }
    if let Some(rgb) = meta.second_background {
        write_chunk(w, ChunkTag::SecondBackground.id(), &rgb)?;
    }
    match &meta.icc_profile {
        Some(IccProfile::Embedded(bytes)) => write_chunk(w, ChunkTag::IccEmbedded.id(), bytes)?,
        Some(IccProfile::File(path)) => write_chunk(w, ChunkTag::IccPath.id(), path.as_bytes())?,
        None => {}
    }
    if let Some(ruler) = &meta.perspective_ruler {
        write_chunk(w, ChunkTag::PerspectiveRuler.id(), &encode_ruler(ruler))?;
    }
    Ok(())
}

/// Write one `tag, length, payload` triple.
pub(crate) fn write_chunk(w: &mut ByteWriter, tag: [u8; 4], payload: &[u8]) -> LayerdocResult<()> {
    w.bytes(&tag);
    w.u32(len32(payload.len())?);
    w.bytes(payload);
    Ok(())
}

/// Read chunks until the end of the stream.
///
/// Unknown tags and known chunks with malformed payloads are skipped by length and their ids
/// returned; a truncated table ends the read without failing the load.
pub(crate) fn read_chunks(r: &mut ByteReader<'_>, meta: &mut CanvasMeta) -> Vec<[u8; 4]> {
    let mut skipped = Vec::new();
    while !r.is_empty() {
        if r.remaining() < 8 {
            tracing::warn!(left = r.remaining(), "truncated chunk header at end of file");
            break;
        }
        let (Ok(id), Ok(len)) = (r.tag(), r.u32()) else {
            break;
        };
        let Ok(payload) = r.take(len as usize) else {
            tracing::warn!(tag = %tag_str(id), len, "chunk runs past end of file");
            break;
        };
        match ChunkTag::from_id(id) {
            Some(tag) => {
                if let Err(e) = apply_chunk(tag, payload, meta) {
                    tracing::warn!(tag = %tag_str(id), error = %e, "ignoring malformed chunk");
                    skipped.push(id);
                }
            }
            None => {
                tracing::debug!(tag = %tag_str(id), len, "skipping unknown chunk");
                skipped.push(id);
            }
        }
    }
    skipped
}

fn apply_chunk(tag: ChunkTag, payload: &[u8], meta: &mut CanvasMeta) -> LayerdocResult<()> {
    let mut r = ByteReader::new(payload);
    match tag {
        ChunkTag::Resolution => meta.resolution = Some(r.u32()?),
        ChunkTag::SecondBackground => {
            let raw = r.take(3)?;
            meta.second_background = Some([raw[0], raw[1], raw[2]]);
        }
        ChunkTag::IccEmbedded => {
            meta.icc_profile = Some(IccProfile::Embedded(payload.to_vec()));
            return Ok(());
        }
        ChunkTag::IccPath => {
            let path = String::from_utf8(payload.to_vec())
                .map_err(|_| LayerdocError::codec("ICC profile path is not UTF-8"))?;
            meta.icc_profile = Some(IccProfile::File(path));
            return Ok(());
        }
        ChunkTag::PerspectiveRuler => meta.perspective_ruler = Some(decode_ruler(&mut r)?),
    }
    if !r.is_empty() {
        return Err(LayerdocError::codec(format!(
            "{} trailing bytes in {:?} chunk",
            r.remaining(),
            tag
        )));
    }
    Ok(())
}

fn encode_ruler(ruler: &PerspectiveRuler) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.u8(ruler.mode.to_u8());
    w.u8(u8::from(ruler.active));
    for p in &ruler.points {
        w.f64(p.x);
        w.f64(p.y);
    }
    w.into_bytes()
}

fn decode_ruler(r: &mut ByteReader<'_>) -> LayerdocResult<PerspectiveRuler> {
    let mode_tag = r.u8()?;
    let mode = RulerMode::from_u8(mode_tag)
        .ok_or_else(|| LayerdocError::codec(format!("unknown ruler mode {mode_tag}")))?;
    let active = r.u8()? != 0;
    let mut points = [Point::ZERO; 3];
    for p in &mut points {
        *p = Point::new(r.f64()?, r.f64()?);
    }
    Ok(PerspectiveRuler {
        mode,
        active,
        points,
    })
}

fn tag_str(id: [u8; 4]) -> String {
    String::from_utf8_lossy(&id).into_owned()
}

#[cfg(test)]
#[path = "../../tests/unit/codec/chunk.rs"]
mod tests;
