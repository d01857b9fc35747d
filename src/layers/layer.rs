use std::sync::Arc;

use smallvec::SmallVec;

use crate::foundation::core::{PixelRect, Point, check_channels};
use crate::foundation::error::{LayerdocError, LayerdocResult};

/// Upper bound on name-keyed extra metadata blobs per layer.
pub const MAX_EXTRA_BLOBS: usize = 8;

/// Upper bound on the size of one extra metadata blob.
pub const MAX_EXTRA_BYTES: usize = 16 << 20;

/// Upper bound on either side of a raster layer.
pub const MAX_LAYER_SIDE: u32 = 1 << 16;

/// Stable handle for a layer node.
///
/// Handles are allocated monotonically by a [`crate::LayerStore`] and never reused, so a handle
/// stays meaningful across renames, reorders and undo of a delete.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct LayerId(pub(crate) u32);

impl LayerId {
    /// Raw handle value.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind tag of a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum LayerKind {
    /// Pixel layer.
    Raster,
    /// Vector stroke layer.
    VectorPath,
    /// Text/balloon layer.
    Text,
    /// Adjustment applied to everything below.
    Adjustment,
    /// Folder containing the contiguous block of layers above it.
    Group,
}

impl LayerKind {
    /// On-disk tag.
    pub fn to_u8(self) -> u8 {
        match self {
            LayerKind::Raster => 0,
            LayerKind::VectorPath => 1,
            LayerKind::Text => 2,
            LayerKind::Adjustment => 3,
            LayerKind::Group => 4,
        }
    }

    /// Parse an on-disk tag.
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => LayerKind::Raster,
            1 => LayerKind::VectorPath,
            2 => LayerKind::Text,
            3 => LayerKind::Adjustment,
            4 => LayerKind::Group,
            _ => return None,
        })
    }
}

/// Compositing mode handed to the renderer.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum BlendMode {
    /// Source-over.
    #[default]
    Normal,
    /// Additive.
    Add,
    /// Multiply.
    Multiply,
    /// Screen.
    Screen,
    /// Overlay.
    Overlay,
    /// Lighten.
    Lighten,
    /// Darken.
    Darken,
    /// Color dodge.
    Dodge,
    /// Color burn.
    Burn,
    /// Hard light.
    HardLight,
    /// Soft light.
    SoftLight,
    /// Difference.
    Difference,
    /// Exclusion.
    Exclusion,
    /// Hue.
    Hue,
    /// Saturation.
    Saturation,
    /// Color.
    Color,
    /// Luminosity.
    Luminosity,
}

impl BlendMode {
    const ALL: [BlendMode; 17] = [
        BlendMode::Normal,
        BlendMode::Add,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Overlay,
        BlendMode::Lighten,
        BlendMode::Darken,
        BlendMode::Dodge,
        BlendMode::Burn,
        BlendMode::HardLight,
        BlendMode::SoftLight,
        BlendMode::Difference,
        BlendMode::Exclusion,
        BlendMode::Hue,
        BlendMode::Saturation,
        BlendMode::Color,
        BlendMode::Luminosity,
    ];

    /// On-disk tag.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse an on-disk tag.
    pub fn from_u8(v: u8) -> Option<Self> {
        Self::ALL.get(usize::from(v)).copied()
    }
}

bitflags::bitflags! {
    /// Per-layer state bits.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct LayerFlags: u32 {
        /// Not drawn.
        const HIDDEN = 1 << 0;
        /// Painting keeps existing alpha.
        const LOCK_OPACITY = 1 << 1;
        /// Clipped by the layer directly below.
        const MASKED_BY_BELOW = 1 << 2;
        /// Group folded in the layer panel.
        const GROUP_CLOSED = 1 << 3;
        /// Changed since the last save.
        const MODIFIED = 1 << 4;
    }
}

/// Owned pixel storage, shared copy-on-write between snapshots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: u8,
    data: Arc<Vec<u8>>,
}

impl PixelBuffer {
    /// Zero-filled buffer.
    pub fn new(width: u32, height: u32, channels: u8) -> LayerdocResult<Self> {
        let len = Self::byte_len(width, height, channels)?;
        Ok(Self {
            width,
            height,
            channels,
            data: Arc::new(vec![0; len]),
        })
    }

    /// Buffer with every pixel set to `px` (`px.len()` must equal `channels`).
    pub fn filled(width: u32, height: u32, channels: u8, px: &[u8]) -> LayerdocResult<Self> {
        if px.len() != usize::from(channels) {
            return Err(LayerdocError::validation(format!(
                "fill pixel has {} components, expected {channels}",
                px.len()
            )));
        }
        let len = Self::byte_len(width, height, channels)?;
        let data = px.iter().copied().cycle().take(len).collect();
        Ok(Self {
            width,
            height,
            channels,
            data: Arc::new(data),
        })
    }

    /// Wrap tightly packed row-major bytes.
    pub fn from_raw(width: u32, height: u32, channels: u8, data: Vec<u8>) -> LayerdocResult<Self> {
        let len = Self::byte_len(width, height, channels)?;
        if data.len() != len {
            return Err(LayerdocError::validation(format!(
                "pixel data is {} bytes, expected {len} for {width}x{height}x{channels}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data: Arc::new(data),
        })
    }

    fn byte_len(width: u32, height: u32, channels: u8) -> LayerdocResult<usize> {
        check_channels(channels)?;
        if width == 0 || height == 0 {
            return Err(LayerdocError::validation(format!(
                "pixel buffer must be non-empty, got {width}x{height}"
            )));
        }
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(usize::from(channels)))
            .ok_or_else(|| LayerdocError::validation("pixel buffer size overflows"))
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Components per pixel.
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * usize::from(self.channels)
    }

    /// Raw row-major bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable bytes; detaches from any snapshot sharing this storage.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        Arc::make_mut(&mut self.data).as_mut_slice()
    }

    /// Components of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let ch = usize::from(self.channels);
        let off = y as usize * self.stride() + x as usize * ch;
        self.data.get(off..off + ch)
    }

    /// Return `true` when both buffers point at the same storage.
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Full-buffer rectangle.
    pub fn rect(&self) -> PixelRect {
        PixelRect::from_size(self.width, self.height)
    }
}

/// Stroke interpolation of a vector path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PathShape {
    /// Straight segments between control points.
    #[default]
    Polyline,
    /// Smooth curve through control points.
    Bezier,
    /// Control points erase instead of paint.
    Eraser,
}

impl PathShape {
    /// On-disk tag.
    pub fn to_u8(self) -> u8 {
        match self {
            PathShape::Polyline => 0,
            PathShape::Bezier => 1,
            PathShape::Eraser => 2,
        }
    }

    /// Parse an on-disk tag.
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => PathShape::Polyline,
            1 => PathShape::Bezier,
            2 => PathShape::Eraser,
            _ => return None,
        })
    }
}

/// One control point of a vector path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VectorPoint {
    /// Position in layer space.
    pub pos: Point,
    /// Pen pressure in `[0, 1]`.
    pub pressure: f32,
    /// Stroke size at this point.
    pub size: f32,
    /// RGBA color at this point.
    pub color: [u8; 4],
}

/// One stroke record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VectorPath {
    /// Interpolation.
    pub shape: PathShape,
    /// Style bits (closed, anti-alias...), passed through untouched.
    pub flags: u8,
    /// Base stroke width.
    pub line_width: f32,
    /// Edge blur radius.
    pub blur: f32,
    /// Edge hardness in `[0, 1]`.
    pub hardness: f32,
    /// Control points.
    pub points: Vec<VectorPoint>,
}

/// Payload of a vector layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VectorLayer {
    /// Strokes bottom-to-top.
    pub paths: Vec<VectorPath>,
}

/// Outline drawn around a text block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BalloonShape {
    /// No balloon.
    #[default]
    None,
    /// Rectangle.
    Rect,
    /// Ellipse.
    Ellipse,
    /// Cloud outline.
    Cloud,
}

impl BalloonShape {
    /// On-disk tag.
    pub fn to_u8(self) -> u8 {
        match self {
            BalloonShape::None => 0,
            BalloonShape::Rect => 1,
            BalloonShape::Ellipse => 2,
            BalloonShape::Cloud => 3,
        }
    }

    /// Parse an on-disk tag.
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => BalloonShape::None,
            1 => BalloonShape::Rect,
            2 => BalloonShape::Ellipse,
            3 => BalloonShape::Cloud,
            _ => return None,
        })
    }
}

/// Balloon style of a text layer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Balloon {
    /// Outline shape.
    pub shape: BalloonShape,
    /// Outline width.
    pub line_width: f32,
    /// Outline RGBA.
    pub line_color: [u8; 4],
    /// Fill RGBA.
    pub fill_color: [u8; 4],
    /// Tip of the balloon tail.
    pub tail: Point,
}

/// Payload of a text layer. Shaping is done by the renderer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextLayer {
    /// Text box origin.
    pub origin: Point,
    /// Text box width.
    pub box_width: f64,
    /// Text box height.
    pub box_height: f64,
    /// Point size.
    pub font_size: f32,
    /// Text RGBA.
    pub color: [u8; 4],
    /// Style bits (bold, italic, vertical).
    pub style: u8,
    /// Balloon decoration.
    pub balloon: Balloon,
    /// Font family name.
    pub font_name: String,
    /// Text content; empty means absent.
    pub text: String,
}

/// Payload of an adjustment layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Adjustment {
    /// Brightness/contrast deltas.
    BrightnessContrast {
        /// Brightness delta.
        brightness: i16,
        /// Contrast delta.
        contrast: i16,
    },
    /// Hue/saturation/value deltas.
    HueSaturation {
        /// Hue rotation in degrees.
        hue: i16,
        /// Saturation delta.
        saturation: i16,
        /// Value delta.
        value: i16,
    },
}

/// Kind-specific payload owned by a layer.
#[derive(Clone, Debug, PartialEq)]
pub enum LayerContent {
    /// Pixels.
    Raster(PixelBuffer),
    /// Strokes.
    Vector(VectorLayer),
    /// Text.
    Text(TextLayer),
    /// Adjustment parameters.
    Adjustment(Adjustment),
    /// Group folder; children are tracked by the store.
    Group,
}

impl LayerContent {
    /// Kind tag of this payload.
    pub fn kind(&self) -> LayerKind {
        match self {
            LayerContent::Raster(_) => LayerKind::Raster,
            LayerContent::Vector(_) => LayerKind::VectorPath,
            LayerContent::Text(_) => LayerKind::Text,
            LayerContent::Adjustment(_) => LayerKind::Adjustment,
            LayerContent::Group => LayerKind::Group,
        }
    }
}

/// Named opaque metadata blob attached to a layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtraBlob {
    /// Key.
    pub name: String,
    /// Bytes.
    pub data: Vec<u8>,
}

/// Undoable per-layer parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerParams {
    /// Display name.
    pub name: String,
    /// Blend mode.
    pub blend: BlendMode,
    /// Opacity in `0..=100`.
    pub opacity: u8,
    /// State bits.
    pub flags: LayerFlags,
    /// Left edge in canvas space.
    pub x: i32,
    /// Top edge in canvas space.
    pub y: i32,
}

/// Description of a layer to insert.
#[derive(Clone, Debug)]
pub struct NewLayer {
    /// Display name (must be unique in the store).
    pub name: String,
    /// Payload.
    pub content: LayerContent,
    /// Geometry; raster layers take their size from the pixel buffer.
    pub bounds: PixelRect,
    /// Blend mode.
    pub blend: BlendMode,
    /// Opacity in `0..=100`.
    pub opacity: u8,
    /// State bits.
    pub flags: LayerFlags,
    /// Extra metadata.
    pub extras: Vec<ExtraBlob>,
}

impl NewLayer {
    /// Raster layer placed at `(x, y)`.
    pub fn raster(name: impl Into<String>, pixels: PixelBuffer, x: i32, y: i32) -> Self {
        let bounds = PixelRect::new(x, y, pixels.width(), pixels.height());
        Self::with_content(name, LayerContent::Raster(pixels), bounds)
    }

    /// Transparent raster layer covering `bounds`.
    pub fn empty_raster(
        name: impl Into<String>,
        bounds: PixelRect,
        channels: u8,
    ) -> LayerdocResult<Self> {
        let pixels = PixelBuffer::new(bounds.width, bounds.height, channels)?;
        Ok(Self::raster(name, pixels, bounds.x, bounds.y))
    }

    /// Group folder.
    pub fn group(name: impl Into<String>, bounds: PixelRect) -> Self {
        Self::with_content(name, LayerContent::Group, bounds)
    }

    /// Any payload.
    pub fn with_content(name: impl Into<String>, content: LayerContent, bounds: PixelRect) -> Self {
        Self {
            name: name.into(),
            content,
            bounds,
            blend: BlendMode::Normal,
            opacity: 100,
            flags: LayerFlags::empty(),
            extras: Vec::new(),
        }
    }

    /// Override blend mode.
    pub fn blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    /// Override opacity.
    pub fn opacity(mut self, opacity: u8) -> Self {
        self.opacity = opacity;
        self
    }

    /// Override state bits.
    pub fn flags(mut self, flags: LayerFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// One node of the layer stack.
#[derive(Clone, Debug)]
pub struct Layer {
    pub(crate) id: LayerId,
    pub(crate) name: String,
    pub(crate) content: LayerContent,
    pub(crate) bounds: PixelRect,
    pub(crate) blend: BlendMode,
    pub(crate) opacity: u8,
    pub(crate) flags: LayerFlags,
    pub(crate) channels: u8,
    pub(crate) extras: SmallVec<[ExtraBlob; 2]>,
    pub(crate) below: Option<LayerId>,
    pub(crate) above: Option<LayerId>,
    pub(crate) parent: Option<LayerId>,
}

impl Layer {
    pub(crate) fn from_new(id: LayerId, spec: NewLayer) -> LayerdocResult<Self> {
        if spec.name.is_empty() {
            return Err(LayerdocError::validation("layer name must not be empty"));
        }
        if spec.opacity > 100 {
            return Err(LayerdocError::validation(format!(
                "opacity must be 0..=100, got {}",
                spec.opacity
            )));
        }
        if spec.extras.len() > MAX_EXTRA_BLOBS {
            return Err(LayerdocError::validation(format!(
                "at most {MAX_EXTRA_BLOBS} extra blobs per layer"
            )));
        }
        if let Some(blob) = spec.extras.iter().find(|b| b.data.len() > MAX_EXTRA_BYTES) {
            return Err(LayerdocError::validation(format!(
                "extra blob '{}' is larger than {MAX_EXTRA_BYTES} bytes",
                blob.name
            )));
        }
        let mut bounds = spec.bounds;
        let channels = match &spec.content {
            LayerContent::Raster(px) => {
                if px.width() > MAX_LAYER_SIDE || px.height() > MAX_LAYER_SIDE {
                    return Err(LayerdocError::validation(format!(
                        "raster layer must be at most {MAX_LAYER_SIDE} on each side, got {}x{}",
                        px.width(),
                        px.height()
                    )));
                }
                bounds.width = px.width();
                bounds.height = px.height();
                px.channels()
            }
            _ => 4,
        };
        Ok(Self {
            id,
            name: spec.name,
            content: spec.content,
            bounds,
            blend: spec.blend,
            opacity: spec.opacity,
            flags: spec.flags,
            channels,
            extras: spec.extras.into_iter().collect(),
            below: None,
            above: None,
            parent: None,
        })
    }

    /// Stable handle.
    pub fn id(&self) -> LayerId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind tag.
    pub fn kind(&self) -> LayerKind {
        self.content.kind()
    }

    /// Payload.
    pub fn content(&self) -> &LayerContent {
        &self.content
    }

    /// Geometry in canvas space.
    pub fn bounds(&self) -> PixelRect {
        self.bounds
    }

    /// Blend mode.
    pub fn blend(&self) -> BlendMode {
        self.blend
    }

    /// Opacity in `0..=100`.
    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    /// State bits.
    pub fn flags(&self) -> LayerFlags {
        self.flags
    }

    /// Components per pixel.
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Return `true` unless the layer is hidden.
    pub fn is_visible(&self) -> bool {
        !self.flags.contains(LayerFlags::HIDDEN)
    }

    /// Layer directly below, if any.
    pub fn below(&self) -> Option<LayerId> {
        self.below
    }

    /// Layer directly above, if any.
    pub fn above(&self) -> Option<LayerId> {
        self.above
    }

    /// Enclosing group, if any.
    pub fn parent(&self) -> Option<LayerId> {
        self.parent
    }

    /// Pixel buffer of a raster layer.
    pub fn pixels(&self) -> Option<&PixelBuffer> {
        match &self.content {
            LayerContent::Raster(px) => Some(px),
            _ => None,
        }
    }

    pub(crate) fn pixels_mut(&mut self) -> Option<&mut PixelBuffer> {
        match &mut self.content {
            LayerContent::Raster(px) => Some(px),
            _ => None,
        }
    }

    /// Extra metadata blobs.
    pub fn extras(&self) -> &[ExtraBlob] {
        &self.extras
    }

    /// Look up an extra blob by name.
    pub fn extra(&self, name: &str) -> Option<&[u8]> {
        self.extras
            .iter()
            .find(|b| b.name == name)
            .map(|b| b.data.as_slice())
    }

    /// Insert or replace an extra blob.
    pub(crate) fn set_extra(
        &mut self,
        name: impl Into<String>,
        data: Vec<u8>,
    ) -> LayerdocResult<()> {
        let name = name.into();
        if data.len() > MAX_EXTRA_BYTES {
            return Err(LayerdocError::validation(format!(
                "extra blob '{name}' is larger than {MAX_EXTRA_BYTES} bytes"
            )));
        }
        if let Some(slot) = self.extras.iter_mut().find(|b| b.name == name) {
            slot.data = data;
            return Ok(());
        }
        if self.extras.len() >= MAX_EXTRA_BLOBS {
            return Err(LayerdocError::validation(format!(
                "layer '{}' already has {MAX_EXTRA_BLOBS} extra blobs",
                self.name
            )));
        }
        self.extras.push(ExtraBlob { name, data });
        Ok(())
    }

    /// Snapshot of the undoable parameters.
    pub fn params(&self) -> LayerParams {
        LayerParams {
            name: self.name.clone(),
            blend: self.blend,
            opacity: self.opacity,
            flags: self.flags,
            x: self.bounds.x,
            y: self.bounds.y,
        }
    }

    pub(crate) fn apply_params(&mut self, params: LayerParams) {
        self.name = params.name;
        self.blend = params.blend;
        self.opacity = params.opacity;
        self.flags = params.flags;
        self.bounds.x = params.x;
        self.bounds.y = params.y;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layers/layer.rs"]
mod tests;
