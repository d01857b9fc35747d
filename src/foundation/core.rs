use crate::foundation::error::{LayerdocError, LayerdocResult};

pub use kurbo::Point;

/// Axis-aligned integer pixel rectangle.
///
/// `x`/`y` may be negative (a layer can hang off the canvas); `width`/`height` are sizes.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct PixelRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelRect {
    /// Build a rectangle from origin and size.
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle anchored at the origin.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Return `true` when the rectangle covers no pixels.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive right edge.
    pub fn right(self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    /// Intersection of two rectangles, `None` when they do not overlap.
    pub fn intersect(self, other: Self) -> Option<Self> {
        let x0 = i64::from(self.x).max(i64::from(other.x));
        let y0 = i64::from(self.y).max(i64::from(other.y));
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Self {
            x: x0 as i32,
            y: y0 as i32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }

    /// Clamp into `[0, width) x [0, height)`; `None` when nothing is left.
    pub fn clamp_to(self, width: u32, height: u32) -> Option<Self> {
        self.intersect(Self::from_size(width, height))
    }

    /// Shift the rectangle by `(dx, dy)` using saturating arithmetic.
    pub fn translate(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            ..self
        }
    }

    /// Smallest rectangle containing both inputs.
    pub fn union(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        let x0 = i64::from(self.x).min(i64::from(other.x));
        let y0 = i64::from(self.y).min(i64::from(other.y));
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        Self {
            x: x0 as i32,
            y: y0 as i32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        }
    }
}

/// Round a canvas dimension up to the next multiple of four.
pub fn align4(v: u32) -> u32 {
    v.saturating_add(3) & !3
}

/// How document colors are interpreted by the display pipeline.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum ColorMode {
    /// Red/green/blue.
    #[default]
    Rgb,
    /// Single luminance channel.
    Grayscale,
    /// Soft-proofed CMYK (pixels are still stored as RGB).
    Cmyk,
}

impl ColorMode {
    /// On-disk tag.
    pub fn to_u8(self) -> u8 {
        match self {
            ColorMode::Rgb => 0,
            ColorMode::Grayscale => 1,
            ColorMode::Cmyk => 2,
        }
    }

    /// Parse an on-disk tag.
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => ColorMode::Rgb,
            1 => ColorMode::Grayscale,
            2 => ColorMode::Cmyk,
            _ => return None,
        })
    }
}

/// Validate a channel count for pixel storage.
pub(crate) fn check_channels(channels: u8) -> LayerdocResult<u8> {
    if !(1..=4).contains(&channels) {
        return Err(LayerdocError::validation(format!(
            "channel count must be 1..=4, got {channels}"
        )));
    }
    Ok(channels)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
