//! Raster surface: the image capability the engine consumes.
//!
//! The trait works on encoded bytes end to end, so alternative backends only need to
//! speak image files. `ImageSurface` is the default backend over the `image` crate and
//! uses lossless PNG for every intermediate.

use std::io::Cursor;
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::regions::GrayRaster;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("decode failed: {0}")]
    Decode(String),

    #[error("encode failed: {0}")]
    Encode(String),

    #[error("invalid SVG overlay: {0}")]
    Svg(String),

    #[error("invalid raster dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Resampling kernels offered by the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizeKernel {
    Nearest,
    Triangle,
    CatmullRom,
    Lanczos3,
}

impl ResizeKernel {
    fn filter(self) -> FilterType {
        match self {
            ResizeKernel::Nearest => FilterType::Nearest,
            ResizeKernel::Triangle => FilterType::Triangle,
            ResizeKernel::CatmullRom => FilterType::CatmullRom,
            ResizeKernel::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Final output encoding. Fixed per run by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Png,
    Jpeg { quality: u8 },
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg { .. } => "jpg",
        }
    }

    /// Parses `png` / `jpeg` / `jpg`, attaching `quality` to JPEG.
    pub fn parse_with_quality(name: &str, quality: u8) -> Result<Self, String> {
        match name.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg {
                quality: quality.clamp(1, 100),
            }),
            other => Err(format!("unsupported output format '{other}'")),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutputFormat::parse_with_quality(s, 90)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
}

pub trait RasterSurface: Send + Sync {
    fn decode_to_grayscale_raw(&self, bytes: &[u8]) -> Result<GrayRaster, RasterError>;

    fn metadata(&self, bytes: &[u8]) -> Result<ImageMetadata, RasterError>;

    fn resize(&self, bytes: &[u8], width: u32, height: u32, kernel: ResizeKernel) -> Result<Vec<u8>, RasterError>;

    /// Alpha-blends `overlay` onto `bytes` with its top-left corner at (`left`, `top`).
    fn composite_overlay(&self, bytes: &[u8], overlay: &[u8], top: u32, left: u32) -> Result<Vec<u8>, RasterError>;

    fn encode(&self, bytes: &[u8], format: OutputFormat) -> Result<Vec<u8>, RasterError>;
}

// ────────────────────────────────────────────────────────────────────────────
// image-crate backend
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageSurface;

fn decode(bytes: &[u8]) -> Result<DynamicImage, RasterError> {
    image::load_from_memory(bytes).map_err(|e| RasterError::Decode(e.to_string()))
}

pub(crate) fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, RasterError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| RasterError::Encode(e.to_string()))?;
    Ok(buf)
}

impl RasterSurface for ImageSurface {
    fn decode_to_grayscale_raw(&self, bytes: &[u8]) -> Result<GrayRaster, RasterError> {
        let luma = decode(bytes)?.to_luma8();
        Ok(GrayRaster {
            width: luma.width(),
            height: luma.height(),
            pixels: luma.into_raw(),
        })
    }

    fn metadata(&self, bytes: &[u8]) -> Result<ImageMetadata, RasterError> {
        let (width, height) = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| RasterError::Decode(e.to_string()))?
            .into_dimensions()
            .map_err(|e| RasterError::Decode(e.to_string()))?;
        Ok(ImageMetadata { width, height })
    }

    fn resize(&self, bytes: &[u8], width: u32, height: u32, kernel: ResizeKernel) -> Result<Vec<u8>, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidDimensions { width, height });
        }
        let resized = decode(bytes)?.resize_exact(width, height, kernel.filter());
        encode_png(&resized)
    }

    fn composite_overlay(&self, bytes: &[u8], overlay: &[u8], top: u32, left: u32) -> Result<Vec<u8>, RasterError> {
        let mut base = decode(bytes)?.to_rgba8();
        let layer = decode(overlay)?.to_rgba8();
        image::imageops::overlay(&mut base, &layer, left as i64, top as i64);
        encode_png(&DynamicImage::ImageRgba8(base))
    }

    fn encode(&self, bytes: &[u8], format: OutputFormat) -> Result<Vec<u8>, RasterError> {
        let img = decode(bytes)?;
        match format {
            OutputFormat::Png => encode_png(&img),
            OutputFormat::Jpeg { quality } => {
                // JPEG has no alpha channel.
                let rgb = img.to_rgb8();
                let mut buf = Vec::new();
                JpegEncoder::new_with_quality(&mut buf, quality)
                    .encode_image(&rgb)
                    .map_err(|e| RasterError::Encode(e.to_string()))?;
                Ok(buf)
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
