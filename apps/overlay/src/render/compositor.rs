//! Composites text runs onto an image.
//!
//! Small images are supersampled first: the image is upscaled so its shorter side
//! approaches `SUPERSAMPLE_TARGET`, the overlay is rendered at that density, and the
//! result is downscaled back to the original size. Output dimensions always equal
//! input dimensions.

use std::sync::Arc;

use image::{DynamicImage, RgbaImage};
use resvg::tiny_skia;
use resvg::usvg;
use resvg::usvg::fontdb;
use tracing::{debug, warn};

use crate::layout::TextRun;
use crate::render::markup::{build_svg, TextStyle};
use crate::render::surface::{encode_png, OutputFormat, RasterError, RasterSurface, ResizeKernel};

pub const SUPERSAMPLE_TARGET: u32 = 1200;
pub const MAX_SUPERSAMPLE: f32 = 2.0;

/// Upscale factor for an image of the given size; `1.0` when no supersampling applies.
pub fn supersample_factor(width: u32, height: u32) -> f32 {
    let shorter = width.min(height);
    if shorter == 0 || shorter >= SUPERSAMPLE_TARGET {
        return 1.0;
    }
    (SUPERSAMPLE_TARGET as f32 / shorter as f32).min(MAX_SUPERSAMPLE)
}

fn scaled_dimension(value: u32, factor: f32) -> u32 {
    ((value as f32 * factor).round() as u32).max(1)
}

pub struct Compositor {
    fontdb: Arc<fontdb::Database>,
    style: TextStyle,
    format: OutputFormat,
}

fn has_family(db: &fontdb::Database, family: &str) -> bool {
    db.faces()
        .any(|face| face.families.iter().any(|(name, _)| name.eq_ignore_ascii_case(family)))
}

/// Points the generic `sans-serif` and `serif` families at installed faces when the
/// built-in defaults (Arial, Times New Roman) are missing.
///
/// Returns the family now behind `sans-serif`, or `None` for an empty database.
pub fn configure_fallback_families(db: &mut fontdb::Database) -> Option<String> {
    let mut families: Vec<&str> = db
        .faces()
        .filter_map(|face| face.families.first().map(|(name, _)| name.as_str()))
        .collect();
    families.sort_unstable();
    families.dedup();

    let sans = families
        .iter()
        .find(|name| name.contains("Sans") && !name.contains("Mono"))
        .or_else(|| families.first())?
        .to_string();
    let serif = families
        .iter()
        .find(|name| name.contains("Serif") && !name.contains("Sans"))
        .map_or_else(|| sans.clone(), |name| name.to_string());

    if !has_family(db, db.family_name(&fontdb::Family::SansSerif)) {
        db.set_sans_serif_family(sans);
    }
    if !has_family(db, db.family_name(&fontdb::Family::Serif)) {
        db.set_serif_family(serif);
    }
    Some(db.family_name(&fontdb::Family::SansSerif).to_string())
}

/// System fonts with generic families resolved to installed faces.
pub fn load_font_database() -> fontdb::Database {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    match configure_fallback_families(&mut db) {
        Some(sans_serif) => debug!(faces = db.len(), sans_serif = %sans_serif, "Loaded system fonts"),
        None => warn!("No system fonts found; text will not render"),
    }
    db
}

impl Compositor {
    /// Loads the system font database once; every render shares it.
    pub fn new(style: TextStyle, format: OutputFormat) -> Self {
        Self::with_fontdb(Arc::new(load_font_database()), style, format)
    }

    pub fn with_fontdb(fontdb: Arc<fontdb::Database>, style: TextStyle, format: OutputFormat) -> Self {
        Self { fontdb, style, format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Draws `runs` onto `image` and returns the encoded result in the configured format.
    pub fn render(&self, surface: &dyn RasterSurface, image: &[u8], runs: &[TextRun]) -> Result<Vec<u8>, RasterError> {
        let meta = surface.metadata(image)?;
        let factor = supersample_factor(meta.width, meta.height);

        let (work_width, work_height) = if factor > 1.0 {
            (scaled_dimension(meta.width, factor), scaled_dimension(meta.height, factor))
        } else {
            (meta.width, meta.height)
        };

        let upscaled;
        let (base, runs): (&[u8], Vec<TextRun>) = if factor > 1.0 {
            upscaled = surface.resize(image, work_width, work_height, ResizeKernel::Lanczos3)?;
            (upscaled.as_slice(), runs.iter().map(|r| r.scaled(factor)).collect())
        } else {
            (image, runs.to_vec())
        };

        debug!(
            width = meta.width,
            height = meta.height,
            factor,
            runs = runs.len(),
            "Compositing overlay"
        );

        let svg = build_svg(&runs, work_width, work_height, &self.style);
        let overlay = self.rasterize(&svg, work_width, work_height)?;
        let composed = surface.composite_overlay(base, &overlay, 0, 0)?;

        let restored = if factor > 1.0 {
            surface.resize(&composed, meta.width, meta.height, ResizeKernel::Lanczos3)?
        } else {
            composed
        };
        surface.encode(&restored, self.format)
    }

    /// Rasterizes SVG markup into a transparent RGBA PNG of exactly `width`×`height`.
    pub fn rasterize(&self, svg: &str, width: u32, height: u32) -> Result<Vec<u8>, RasterError> {
        let mut options = usvg::Options::default();
        options.fontdb = self.fontdb.clone();

        let tree = usvg::Tree::from_str(svg, &options).map_err(|e| RasterError::Svg(e.to_string()))?;
        let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or(RasterError::InvalidDimensions { width, height })?;
        resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());

        // tiny-skia stores premultiplied alpha.
        let rgba: Vec<u8> = pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();
        let img = RgbaImage::from_raw(width, height, rgba).ok_or(RasterError::InvalidDimensions { width, height })?;
        encode_png(&DynamicImage::ImageRgba8(img))
    }
}
