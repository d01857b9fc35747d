use anyhow::Context;
use image::{
    DynamicImage, ExtendedColorType, ImageBuffer, ImageEncoder, ImageFormat,
    codecs::png::{CompressionType, FilterType, PngEncoder},
    imageops,
};

use crate::foundation::config::PngCompression;
use crate::foundation::core::check_channels;
use crate::foundation::error::{LayerdocError, LayerdocResult};
use crate::layers::layer::PixelBuffer;

/// Decoded image as handed across the image codec boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImagePixels {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes per row.
    pub stride: usize,
    /// Components per pixel (1..=4).
    pub channels: u8,
    /// Row-major bytes.
    pub data: Vec<u8>,
}

impl ImagePixels {
    /// Copy out of a pixel buffer.
    pub fn from_buffer(px: &PixelBuffer) -> Self {
        Self {
            width: px.width(),
            height: px.height(),
            stride: px.stride(),
            channels: px.channels(),
            data: px.as_bytes().to_vec(),
        }
    }

    /// Convert into a tightly packed pixel buffer.
    pub fn into_buffer(self) -> LayerdocResult<PixelBuffer> {
        let row = self.width as usize * usize::from(self.channels);
        let data = if self.stride == row {
            self.data
        } else {
            repack(&self.data, self.height, self.stride, row)?
        };
        PixelBuffer::from_raw(self.width, self.height, self.channels, data)
    }
}

fn repack(data: &[u8], height: u32, stride: usize, row: usize) -> LayerdocResult<Vec<u8>> {
    if stride < row || data.len() < stride * (height as usize).saturating_sub(1) + row {
        return Err(LayerdocError::codec(format!(
            "stride {stride} cannot hold rows of {row} bytes"
        )));
    }
    let mut out = Vec::with_capacity(row * height as usize);
    for y in 0..height as usize {
        out.extend_from_slice(&data[y * stride..y * stride + row]);
    }
    Ok(out)
}

fn color_type(channels: u8) -> LayerdocResult<ExtendedColorType> {
    Ok(match check_channels(channels)? {
        1 => ExtendedColorType::L8,
        2 => ExtendedColorType::La8,
        3 => ExtendedColorType::Rgb8,
        _ => ExtendedColorType::Rgba8,
    })
}

/// PNG-encode `pixels` (`stride` bytes per row, `channels` components per pixel).
pub fn encode_pixels(
    pixels: &[u8],
    width: u32,
    height: u32,
    stride: usize,
    channels: u8,
    compression: PngCompression,
) -> LayerdocResult<Vec<u8>> {
    let ct = color_type(channels)?;
    let row = width as usize * usize::from(channels);
    let packed;
    let data = if stride == row {
        pixels
    } else {
        packed = repack(pixels, height, stride, row)?;
        &packed
    };
    if data.len() != row * height as usize {
        return Err(LayerdocError::codec(format!(
            "pixel data is {} bytes, expected {}",
            data.len(),
            row * height as usize
        )));
    }

    let compression = match compression {
        PngCompression::Fast => CompressionType::Fast,
        PngCompression::Default => CompressionType::Default,
        PngCompression::Best => CompressionType::Best,
    };
    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, compression, FilterType::Adaptive)
        .write_image(data, width, height, ct)
        .context("encode png")?;
    Ok(out)
}

/// PNG-encode a pixel buffer.
pub(crate) fn encode_buffer(px: &PixelBuffer, compression: PngCompression) -> LayerdocResult<Vec<u8>> {
    encode_pixels(
        px.as_bytes(),
        px.width(),
        px.height(),
        px.stride(),
        px.channels(),
        compression,
    )
}

/// Decode PNG bytes, keeping the stored channel layout.
pub fn decode_pixels(bytes: &[u8]) -> LayerdocResult<ImagePixels> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .context("decode png from memory")?;
    let (width, height) = (img.width(), img.height());
    let (channels, data) = match img {
        DynamicImage::ImageLuma8(b) => (1u8, b.into_raw()),
        DynamicImage::ImageLumaA8(b) => (2, b.into_raw()),
        DynamicImage::ImageRgb8(b) => (3, b.into_raw()),
        DynamicImage::ImageRgba8(b) => (4, b.into_raw()),
        other => (4, other.to_rgba8().into_raw()),
    };
    Ok(ImagePixels {
        width,
        height,
        stride: width as usize * usize::from(channels),
        channels,
        data,
    })
}

/// Decode PNG bytes into a pixel buffer that must be `width x height x channels`.
pub(crate) fn decode_buffer(
    bytes: &[u8],
    width: u32,
    height: u32,
    channels: u8,
) -> LayerdocResult<PixelBuffer> {
    let img = decode_pixels(bytes)?;
    if (img.width, img.height, img.channels) != (width, height, channels) {
        return Err(LayerdocError::codec(format!(
            "image is {}x{}x{}, expected {width}x{height}x{channels}",
            img.width, img.height, img.channels
        )));
    }
    img.into_buffer()
}

/// Uniformly downscale so the longer side is at most `max_side`; smaller images are copied.
pub fn fit_within(src: &ImagePixels, max_side: u32) -> LayerdocResult<ImagePixels> {
    let longest = src.width.max(src.height);
    if max_side == 0 || longest <= max_side {
        return Ok(src.clone());
    }
    let scale = f64::from(max_side) / f64::from(longest);
    let w = ((f64::from(src.width) * scale).round() as u32).max(1);
    let h = ((f64::from(src.height) * scale).round() as u32).max(1);

    let rgba = to_rgba(src)?;
    let small = imageops::resize(&rgba, w, h, imageops::FilterType::Triangle);
    Ok(ImagePixels {
        width: w,
        height: h,
        stride: w as usize * 4,
        channels: 4,
        data: small.into_raw(),
    })
}

fn to_rgba(src: &ImagePixels) -> LayerdocResult<image::RgbaImage> {
    let row = src.width as usize * usize::from(src.channels);
    let packed = if src.stride == row {
        src.data.clone()
    } else {
        repack(&src.data, src.height, src.stride, row)?
    };
    let (w, h) = (src.width, src.height);
    let dynamic = match src.channels {
        1 => ImageBuffer::from_raw(w, h, packed).map(DynamicImage::ImageLuma8),
        2 => ImageBuffer::from_raw(w, h, packed).map(DynamicImage::ImageLumaA8),
        3 => ImageBuffer::from_raw(w, h, packed).map(DynamicImage::ImageRgb8),
        4 => ImageBuffer::from_raw(w, h, packed).map(DynamicImage::ImageRgba8),
        n => {
            return Err(LayerdocError::codec(format!("unsupported channel count {n}")));
        }
    };
    let dynamic =
        dynamic.ok_or_else(|| LayerdocError::codec("pixel data does not match image size"))?;
    Ok(dynamic.to_rgba8())
}

#[cfg(test)]
#[path = "../../tests/unit/codec/image.rs"]
mod tests;
