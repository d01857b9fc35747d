use crate::codec::image::ImagePixels;
use crate::foundation::core::{ColorMode, Point, align4, check_channels};
use crate::foundation::error::{LayerdocError, LayerdocResult};
use crate::layers::layer::PixelBuffer;

/// Largest canvas side accepted by [`CanvasInfo::new`] and the loader.
pub const MAX_CANVAS_SIDE: u32 = 1 << 15;

/// Parameters of a new document.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DocumentSpec {
    /// Requested width; the canvas is widened to a multiple of four.
    pub width: u32,
    /// Requested height; the canvas is heightened to a multiple of four.
    pub height: u32,
    /// Background channel count (3 or 4).
    pub channels: u8,
    /// Display color mode.
    pub color_mode: ColorMode,
    /// Background fill; only the first `channels` components are used.
    pub background: [u8; 4],
    /// Name of the single raster layer every new document starts with.
    pub first_layer: String,
}

impl Default for DocumentSpec {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            channels: 4,
            color_mode: ColorMode::Rgb,
            background: [255, 255, 255, 255],
            first_layer: "Layer 1".to_string(),
        }
    }
}

/// Perspective ruler layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RulerMode {
    /// Single vanishing point.
    #[default]
    OnePoint,
    /// Two vanishing points.
    TwoPoint,
    /// Three vanishing points.
    ThreePoint,
}

impl RulerMode {
    /// On-disk tag.
    pub fn to_u8(self) -> u8 {
        match self {
            RulerMode::OnePoint => 0,
            RulerMode::TwoPoint => 1,
            RulerMode::ThreePoint => 2,
        }
    }

    /// Parse an on-disk tag.
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => RulerMode::OnePoint,
            1 => RulerMode::TwoPoint,
            2 => RulerMode::ThreePoint,
            _ => return None,
        })
    }
}

/// Perspective ruler configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PerspectiveRuler {
    /// Layout.
    pub mode: RulerMode,
    /// Ruler snapping enabled.
    pub active: bool,
    /// Vanishing points; unused ones are ignored.
    pub points: [Point; 3],
}

/// Color profile attached to a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IccProfile {
    /// Profile bytes stored in the file.
    Embedded(Vec<u8>),
    /// Path of a profile on the user's machine.
    File(String),
}

/// Optional document metadata carried in tagged chunks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CanvasMeta {
    /// Print resolution in DPI.
    pub resolution: Option<u32>,
    /// Secondary background RGB.
    pub second_background: Option<[u8; 3]>,
    /// Color profile.
    pub icc_profile: Option<IccProfile>,
    /// Perspective ruler.
    pub perspective_ruler: Option<PerspectiveRuler>,
}

/// Canvas-level state of a document: geometry, background, thumbnail and metadata.
#[derive(Clone, Debug)]
pub struct CanvasInfo {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) original_width: u32,
    pub(crate) original_height: u32,
    pub(crate) channels: u8,
    pub(crate) color_mode: ColorMode,
    pub(crate) background: PixelBuffer,
    pub(crate) thumbnail: Option<ImagePixels>,
    /// Chunk metadata.
    pub meta: CanvasMeta,
}

impl CanvasInfo {
    /// Canvas for a new document.
    pub fn new(spec: &DocumentSpec) -> LayerdocResult<Self> {
        check_canvas(spec.width, spec.height)?;
        let channels = check_channels(spec.channels)?;
        if channels < 3 {
            return Err(LayerdocError::validation(format!(
                "document background needs 3 or 4 channels, got {channels}"
            )));
        }
        let width = align4(spec.width);
        let height = align4(spec.height);
        let background = PixelBuffer::filled(
            width,
            height,
            channels,
            &spec.background[..usize::from(channels)],
        )?;
        Ok(Self {
            width,
            height,
            original_width: spec.width,
            original_height: spec.height,
            channels,
            color_mode: spec.color_mode,
            background,
            thumbnail: None,
            meta: CanvasMeta::default(),
        })
    }

    /// Aligned canvas width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Aligned canvas height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width requested at creation.
    pub fn original_width(&self) -> u32 {
        self.original_width
    }

    /// Height requested at creation.
    pub fn original_height(&self) -> u32 {
        self.original_height
    }

    /// Background channel count.
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Display color mode.
    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    /// Background pixels.
    pub fn background(&self) -> &PixelBuffer {
        &self.background
    }

    /// Stored thumbnail.
    pub fn thumbnail(&self) -> Option<&ImagePixels> {
        self.thumbnail.as_ref()
    }
}

pub(crate) fn check_canvas(width: u32, height: u32) -> LayerdocResult<()> {
    if width == 0 || height == 0 || width > MAX_CANVAS_SIDE || height > MAX_CANVAS_SIDE {
        return Err(LayerdocError::validation(format!(
            "canvas must be 1..={MAX_CANVAS_SIDE} on each side, got {width}x{height}"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/document/canvas.rs"]
mod tests;
