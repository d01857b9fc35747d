use crate::foundation::core::PixelRect;
use crate::foundation::error::{LayerdocError, LayerdocResult};
use crate::layers::layer::{LayerId, PixelBuffer};

/// Saved bytes of one rectangle of one layer.
///
/// The patch is symmetric: [`RegionPatch::swap`] exchanges the saved bytes with the live ones,
/// so the same call undoes and then redoes an edit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionPatch {
    layer: LayerId,
    rect: PixelRect,
    channels: u8,
    bytes: Vec<u8>,
}

impl RegionPatch {
    /// Copy `rect` (layer-local) out of `px`. The rectangle is clamped to the buffer;
    /// `None` when nothing of it overlaps.
    pub fn capture(layer: LayerId, px: &PixelBuffer, rect: PixelRect) -> Option<Self> {
        let rect = rect.clamp_to(px.width(), px.height())?;
        let ch = usize::from(px.channels());
        let row = rect.width as usize * ch;
        let src = px.as_bytes();
        let mut bytes = Vec::with_capacity(row * rect.height as usize);
        for y in rect.y as usize..rect.bottom() as usize {
            let start = y * px.stride() + rect.x as usize * ch;
            bytes.extend_from_slice(&src[start..start + row]);
        }
        Some(Self {
            layer,
            rect,
            channels: px.channels(),
            bytes,
        })
    }

    /// Layer the patch belongs to.
    pub fn layer(&self) -> LayerId {
        self.layer
    }

    /// Clamped layer-local rectangle.
    pub fn rect(&self) -> PixelRect {
        self.rect
    }

    /// Size of the saved bytes.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Exchange saved and live bytes.
    pub fn swap(&mut self, px: &mut PixelBuffer) -> LayerdocResult<()> {
        if px.channels() != self.channels
            || self.rect.right() > i64::from(px.width())
            || self.rect.bottom() > i64::from(px.height())
        {
            return Err(LayerdocError::validation(format!(
                "patch {:?} no longer fits layer {}",
                self.rect, self.layer
            )));
        }
        let ch = usize::from(self.channels);
        let row = self.rect.width as usize * ch;
        let stride = px.stride();
        let data = px.bytes_mut();
        for (i, saved) in self.bytes.chunks_exact_mut(row).enumerate() {
            let start = (self.rect.y as usize + i) * stride + self.rect.x as usize * ch;
            data[start..start + row].swap_with_slice(saved);
        }
        Ok(())
    }
}

/// Mutable view of one rectangle of a raster layer. Coordinates are relative to the rectangle.
#[derive(Debug)]
pub struct RegionMut<'a> {
    px: &'a mut PixelBuffer,
    rect: PixelRect,
}

impl<'a> RegionMut<'a> {
    pub(crate) fn new(px: &'a mut PixelBuffer, rect: PixelRect) -> Self {
        Self { px, rect }
    }

    /// Layer-local rectangle being edited.
    pub fn rect(&self) -> PixelRect {
        self.rect
    }

    /// Region width.
    pub fn width(&self) -> u32 {
        self.rect.width
    }

    /// Region height.
    pub fn height(&self) -> u32 {
        self.rect.height
    }

    /// Components per pixel.
    pub fn channels(&self) -> u8 {
        self.px.channels()
    }

    /// One row of the region.
    pub fn row_mut(&mut self, y: u32) -> Option<&mut [u8]> {
        if y >= self.rect.height {
            return None;
        }
        let ch = usize::from(self.px.channels());
        let start = (self.rect.y as usize + y as usize) * self.px.stride() + self.rect.x as usize * ch;
        let len = self.rect.width as usize * ch;
        self.px.bytes_mut().get_mut(start..start + len)
    }

    /// Components of one pixel of the region.
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> Option<&mut [u8]> {
        if x >= self.rect.width {
            return None;
        }
        let ch = usize::from(self.px.channels());
        let row = self.row_mut(y)?;
        row.get_mut(x as usize * ch..(x as usize + 1) * ch)
    }

    /// Set every pixel of the region to `value` (one entry per channel).
    pub fn fill(&mut self, value: &[u8]) -> LayerdocResult<()> {
        if value.len() != usize::from(self.px.channels()) {
            return Err(LayerdocError::validation(format!(
                "fill pixel has {} components, expected {}",
                value.len(),
                self.px.channels()
            )));
        }
        for y in 0..self.rect.height {
            if let Some(row) = self.row_mut(y) {
                for px in row.chunks_exact_mut(value.len()) {
                    px.copy_from_slice(value);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/history/patch.rs"]
mod tests;
