//! Per-item insertion: region → font plan → wrap → optimize → runs → composite.
//!
//! Everything here is synchronous and CPU-bound. The session calls it from
//! `tokio::task::spawn_blocking` and passes owned inputs in.

use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::OverlayError;
use crate::layout::{
    build_text_runs, optimize_layout, plan_fonts, wrap_paragraphs, FontPlan, LayoutPlan, TextRun,
    VerticalAlignment,
};
use crate::regions::{best_region, find_empty_regions, Region, RegionFinderOptions};
use crate::render::{Compositor, RasterError, RasterSurface};
use crate::text::Paragraph;

/// Knobs shared by every insertion in a run.
#[derive(Debug, Clone, Default)]
pub struct InsertionOptions {
    pub finder: RegionFinderOptions,
    /// Forces a vertical alignment instead of classifying content.
    pub alignment: Option<VerticalAlignment>,
}

/// Result of laying paragraphs into a region, before compositing.
#[derive(Debug, Clone, Serialize)]
pub struct TextLayout {
    pub font_plan: FontPlan,
    pub plan: LayoutPlan,
    pub line_count: usize,
    pub runs: Vec<TextRun>,
}

#[derive(Debug)]
pub enum InsertOutcome {
    Rendered { bytes: Vec<u8>, layout: TextLayout },
    /// Nothing to draw: every paragraph was blank.
    Empty,
}

/// Finds the best region on `image` for text. `None` means no insertion is possible.
pub fn locate_text_region(
    surface: &dyn RasterSurface,
    image: &[u8],
    options: &RegionFinderOptions,
) -> Result<Option<Region>, RasterError> {
    let raster = surface.decode_to_grayscale_raw(image)?;
    let regions = find_empty_regions(&raster, options);
    let best = best_region(&regions);
    debug!(
        width = raster.width,
        height = raster.height,
        regions = regions.len(),
        best = ?best,
        "Region search finished"
    );
    Ok(best)
}

/// Lays paragraphs into `region`. Degenerate regions fall back to a fixed font plan.
pub fn layout_text(
    paragraphs: &[Paragraph],
    region: &Region,
    alignment: Option<VerticalAlignment>,
) -> TextLayout {
    let font_plan = plan_fonts(paragraphs, region).unwrap_or_else(|e| {
        warn!(error = %e, "Font planning failed, using fallback sizes");
        FontPlan::fallback(paragraphs.len())
    });

    let lines = wrap_paragraphs(
        paragraphs,
        region,
        font_plan.normal_font_size,
        font_plan.bold_font_size,
    );
    let plan = optimize_layout(
        &lines,
        region,
        font_plan.line_height(),
        font_plan.normal_font_size,
        alignment,
    );
    let runs = build_text_runs(&lines, region, &plan);
    let line_count = lines.iter().filter(|l| !l.is_paragraph_space()).count();

    TextLayout {
        font_plan,
        plan,
        line_count,
        runs,
    }
}

/// Lays out `paragraphs` in `region` and composites them onto `image`.
pub fn insert_text(
    image: &[u8],
    region: &Region,
    paragraphs: &[Paragraph],
    surface: &dyn RasterSurface,
    compositor: &Compositor,
    options: &InsertionOptions,
) -> Result<InsertOutcome, OverlayError> {
    let layout = layout_text(paragraphs, region, options.alignment);
    if layout.runs.is_empty() {
        return Ok(InsertOutcome::Empty);
    }

    debug!(
        font_size = layout.plan.font_size,
        lines = layout.line_count,
        alignment = ?layout.plan.alignment,
        start_y = layout.plan.start_y,
        "Layout planned"
    );

    let bytes = compositor
        .render(surface, image, &layout.runs)
        .map_err(|e| match e {
            RasterError::Svg(reason) => OverlayError::Render(reason),
            other => OverlayError::Raster(other),
        })?;
    Ok(InsertOutcome::Rendered { bytes, layout })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use resvg::usvg::fontdb;

    use crate::layout::font_solver::{MAX_FONT_SIZE, MIN_FONT_SIZE};
    use crate::render::compositor::tests::{dark_pixels, system_fonts};
    use crate::render::surface::tests::solid_png;
    use crate::render::{ImageSurface, OutputFormat, TextStyle};

    fn compositor() -> Compositor {
        Compositor::with_fontdb(Arc::new(fontdb::Database::new()), TextStyle::default(), OutputFormat::Png)
    }

    fn paragraphs(texts: &[&str]) -> Vec<Paragraph> {
        texts.iter().map(|t| Paragraph::plain(*t)).collect()
    }

    // ── locate ──

    #[test]
    fn test_locate_white_image_uses_full_height() {
        let image = solid_png(300, 200, [255, 255, 255, 255]);
        let region = locate_text_region(&ImageSurface, &image, &RegionFinderOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(region, Region::new(0, 0, 300, 200));
    }

    #[test]
    fn test_locate_dark_image_finds_nothing() {
        let image = solid_png(300, 200, [0, 0, 0, 255]);
        let region = locate_text_region(&ImageSurface, &image, &RegionFinderOptions::default()).unwrap();
        assert!(region.is_none());
    }

    // ── layout ──

    #[test]
    fn test_layout_text_stays_within_bounds() {
        let region = Region::new(0, 0, 1200, 800);
        let layout = layout_text(&paragraphs(&["Hello world", "Second paragraph"]), &region, None);
        assert!(layout.font_plan.normal_font_size >= MIN_FONT_SIZE as f32);
        assert!(layout.font_plan.normal_font_size <= MAX_FONT_SIZE as f32);
        assert_eq!(layout.line_count, 2);
        assert_eq!(layout.runs.len(), 2);
        assert!(layout.runs.iter().all(|r| r.x >= 0.0 && r.x < 1200.0));
    }

    #[test]
    fn test_layout_degenerate_region_uses_fallback() {
        let region = Region { x: 0, y: 0, width: 0, height: 100 };
        let layout = layout_text(&paragraphs(&["text"]), &region, None);
        assert_eq!(layout.font_plan, FontPlan::fallback(1));
    }

    #[test]
    fn test_alignment_override_is_honored() {
        let region = Region::new(0, 0, 800, 600);
        let layout = layout_text(&paragraphs(&["short"]), &region, Some(VerticalAlignment::Bottom));
        assert_eq!(layout.plan.alignment, VerticalAlignment::Bottom);
    }

    // ── insert ──

    #[test]
    fn test_insert_text_renders_same_size_image() {
        let image = solid_png(400, 300, [255, 255, 255, 255]);
        let region = Region::new(0, 0, 400, 300);
        let outcome = insert_text(
            &image,
            &region,
            &paragraphs(&["Overlay text"]),
            &ImageSurface,
            &compositor(),
            &InsertionOptions::default(),
        )
        .unwrap();
        let InsertOutcome::Rendered { bytes, layout } = outcome else {
            panic!("expected a rendered image");
        };
        let meta = ImageSurface.metadata(&bytes).unwrap();
        assert_eq!((meta.width, meta.height), (400, 300));
        assert_eq!(layout.line_count, 1);
    }

    #[test]
    fn test_insert_text_draws_inside_located_region() {
        let Some(db) = system_fonts() else { return };
        let fonts = Compositor::with_fontdb(db, TextStyle::default(), OutputFormat::Png);

        // Dark top band; only the lower part of the image is free for text.
        let raster = image::RgbaImage::from_fn(400, 300, |_, y| {
            if y < 120 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        let mut image = Vec::new();
        raster
            .write_to(&mut std::io::Cursor::new(&mut image), image::ImageFormat::Png)
            .unwrap();

        let region = locate_text_region(&ImageSurface, &image, &RegionFinderOptions::default())
            .unwrap()
            .unwrap();
        assert!(region.y >= 120, "region {region:?} overlaps the dark band");

        let paragraphs = paragraphs(&["Overlay text"]);
        let options = InsertionOptions::default();
        let render = |c: &Compositor| match insert_text(&image, &region, &paragraphs, &ImageSurface, c, &options).unwrap() {
            InsertOutcome::Rendered { bytes, .. } => bytes,
            InsertOutcome::Empty => panic!("expected a rendered image"),
        };

        let bounds = (region.x, region.y, region.x + region.width, region.y + region.height);
        let with_text = render(&fonts);
        let without_text = render(&compositor());
        assert!(dark_pixels(&with_text, bounds) > dark_pixels(&without_text, bounds));
        assert_eq!(with_text, render(&fonts));
    }

    #[test]
    fn test_insert_text_without_paragraphs_is_empty() {
        let image = solid_png(400, 300, [255, 255, 255, 255]);
        let outcome = insert_text(
            &image,
            &Region::new(0, 0, 400, 300),
            &[],
            &ImageSurface,
            &compositor(),
            &InsertionOptions::default(),
        )
        .unwrap();
        assert!(matches!(outcome, InsertOutcome::Empty));
    }
}
