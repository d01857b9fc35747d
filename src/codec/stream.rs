use std::io::{Read, Write};

use anyhow::Context;
use flate2::{Compression, read::ZlibDecoder, write::ZlibEncoder};

use crate::codec::wire::{ByteReader, ByteWriter, len32};
use crate::foundation::error::{LayerdocError, LayerdocResult};

/// Worst-case zlib output size for `len` input bytes (stored blocks + header + trailer).
pub fn compress_bound(len: usize) -> usize {
    len + len / 1000 + (len / 16_383 + 1) * 5 + 64
}

/// DEFLATE `bytes` (zlib framing) at `level` (0-9).
///
/// The output buffer starts at the worst-case bound of this block, so incompressible input only
/// ever grows the `Vec`, never truncates it.
pub fn compress(bytes: &[u8], level: u32) -> LayerdocResult<Vec<u8>> {
    let out = Vec::with_capacity(compress_bound(bytes.len()));
    let mut enc = ZlibEncoder::new(out, Compression::new(level.min(9)));
    enc.write_all(bytes).context("deflate block")?;
    Ok(enc.finish().context("finish deflate block")?)
}

/// Inflate a zlib block that must expand to exactly `expected_len` bytes.
pub fn decompress(bytes: &[u8], expected_len: usize) -> LayerdocResult<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len);
    ZlibDecoder::new(bytes)
        .take(expected_len as u64 + 1)
        .read_to_end(&mut out)
        .context("inflate block")?;
    if out.len() != expected_len {
        return Err(LayerdocError::codec(format!(
            "inflated {} bytes, header declared {expected_len}",
            out.len()
        )));
    }
    Ok(out)
}

/// Write `compressed size, uncompressed size, bytes`.
pub(crate) fn write_block(w: &mut ByteWriter, raw: &[u8], level: u32) -> LayerdocResult<()> {
    let packed = compress(raw, level)?;
    w.u32(len32(packed.len())?);
    w.u32(len32(raw.len())?);
    w.bytes(&packed);
    Ok(())
}

/// Read a block written by [`write_block`]; `limit` bounds both sizes.
pub(crate) fn read_block(r: &mut ByteReader<'_>, limit: usize) -> LayerdocResult<Vec<u8>> {
    let packed_len = r.u32()? as usize;
    let raw_len = r.u32()? as usize;
    if packed_len > limit || raw_len > limit {
        return Err(LayerdocError::codec(format!(
            "compressed block sizes {packed_len}/{raw_len} exceed limit {limit}"
        )));
    }
    decompress(r.take(packed_len)?, raw_len)
}

#[cfg(test)]
#[path = "../../tests/unit/codec/stream.rs"]
mod tests;
