//! Little-endian primitives shared by the document and layer codecs.

use crate::foundation::error::{LayerdocError, LayerdocResult};

/// Append-only little-endian writer.
#[derive(Debug, Default)]
pub(crate) struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub(crate) fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub(crate) fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub(crate) fn i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub(crate) fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub(crate) fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub(crate) fn f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub(crate) fn f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub(crate) fn bytes(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }

    /// `u16` length prefix + UTF-8 bytes.
    pub(crate) fn str16(&mut self, s: &str) -> LayerdocResult<()> {
        let len = u16::try_from(s.len())
            .map_err(|_| LayerdocError::codec(format!("string of {} bytes is too long", s.len())))?;
        self.u16(len);
        self.bytes(s.as_bytes());
        Ok(())
    }

    /// `u32` length prefix + bytes.
    pub(crate) fn blob32(&mut self, v: &[u8]) -> LayerdocResult<()> {
        self.u32(len32(v.len())?);
        self.bytes(v);
        Ok(())
    }
}

pub(crate) fn len32(len: usize) -> LayerdocResult<u32> {
    u32::try_from(len).map_err(|_| LayerdocError::codec(format!("block of {len} bytes is too long")))
}

/// Bounds-checked little-endian reader over a byte slice.
#[derive(Debug, Clone)]
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.buf.len());
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub(crate) fn take(&mut self, n: usize) -> LayerdocResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(LayerdocError::codec(format!(
                "unexpected end of data: need {n} bytes at offset {}, {} left",
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> LayerdocResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn tag(&mut self) -> LayerdocResult<[u8; 4]> {
        self.array()
    }

    pub(crate) fn u8(&mut self) -> LayerdocResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u16(&mut self) -> LayerdocResult<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub(crate) fn i16(&mut self) -> LayerdocResult<i16> {
        Ok(i16::from_le_bytes(self.array()?))
    }

    pub(crate) fn u32(&mut self) -> LayerdocResult<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub(crate) fn i32(&mut self) -> LayerdocResult<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    pub(crate) fn f32(&mut self) -> LayerdocResult<f32> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    pub(crate) fn f64(&mut self) -> LayerdocResult<f64> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    pub(crate) fn str16(&mut self) -> LayerdocResult<String> {
        let len = usize::from(self.u16()?);
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec())
            .map_err(|_| LayerdocError::codec(format!("invalid UTF-8 string at offset {}", self.pos)))
    }

    /// `u32` length prefix + bytes; `limit` guards against implausible lengths.
    pub(crate) fn blob32(&mut self, limit: usize) -> LayerdocResult<&'a [u8]> {
        let len = self.u32()? as usize;
        if len > limit {
            return Err(LayerdocError::codec(format!(
                "declared length {len} exceeds limit {limit}"
            )));
        }
        self.take(len)
    }

    /// Return `true` when the bytes at the cursor are `marker`.
    pub(crate) fn at(&self, marker: &[u8; 4]) -> bool {
        self.buf[self.pos..].starts_with(marker)
    }

    /// Offset of the next occurrence of any of `markers` at or after the cursor.
    pub(crate) fn find_any(&self, markers: &[&[u8; 4]]) -> Option<usize> {
        self.buf[self.pos..]
            .windows(4)
            .position(|w| markers.iter().any(|m| w == &m[..]))
            .map(|off| self.pos + off)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/codec/wire.rs"]
mod tests;
