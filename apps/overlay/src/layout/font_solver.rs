//! Font-Size Solver: binary search for the largest font size whose layout fits a region.
//!
//! # Architecture
//! - `solve_font_size` is the infallible entry point. At most `MAX_ITERATIONS` trials.
//! - Each trial re-simulates the wrap at *character* granularity, which is stricter than
//!   the word-level wrap used for the final render, so the chosen size can be
//!   slightly conservative.
//! - When no trial fits, the lower bound is returned as a soft overflow.
//! - `plan_fonts` adds the degenerate-region guard; callers map its error onto
//!   `FontPlan::fallback`.
//!
//! Everything here is CPU-bound and synchronous. The pipeline calls it from inside
//! `tokio::task::spawn_blocking`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::layout::glyph_metrics::char_width;
use crate::layout::line_breaker::effective_width;
use crate::regions::Region;
use crate::text::{bold_ratio, Paragraph};

// ────────────────────────────────────────────────────────────────────────────
// Constants
// ────────────────────────────────────────────────────────────────────────────

pub const MIN_FONT_SIZE: u32 = 14;
pub const MAX_FONT_SIZE: u32 = 72;
pub const MAX_ITERATIONS: u32 = 10;
/// Bold glyphs are drawn this much larger than regular ones.
pub const BOLD_SCALE: f32 = 1.1;
/// Line height as a multiple of font size.
pub const LINE_SPACING_RATIO: f32 = 1.2;
/// Fraction of the region height available to text.
pub const HEIGHT_FILL: f32 = 0.9;
/// Extra vertical gap between paragraphs, in line heights.
pub const PARAGRAPH_GAP: f32 = 0.5;

/// Usable text height inside `region`.
#[inline]
pub fn effective_height(region: &Region) -> f32 {
    region.height as f32 * HEIGHT_FILL
}

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// Font sizing chosen for one text block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FontPlan {
    pub normal_font_size: f32,
    pub bold_font_size: f32,
    pub line_spacing_ratio: f32,
    pub estimated_line_count: usize,
}

impl FontPlan {
    fn for_size(size: u32, estimated_line_count: usize) -> Self {
        let size = size as f32;
        Self {
            normal_font_size: size,
            bold_font_size: size * BOLD_SCALE,
            line_spacing_ratio: LINE_SPACING_RATIO,
            estimated_line_count,
        }
    }

    /// Plan used when layout computation fails outright.
    pub fn fallback(paragraph_count: usize) -> Self {
        Self {
            normal_font_size: 20.0,
            bold_font_size: 22.0,
            line_spacing_ratio: LINE_SPACING_RATIO,
            estimated_line_count: paragraph_count,
        }
    }

    pub fn line_height(&self) -> f32 {
        self.normal_font_size * self.line_spacing_ratio
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("degenerate region {width}x{height}")]
    DegenerateRegion { width: u32, height: u32 },
}

/// Trace of one binary search, kept separate from the plan for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SearchOutcome {
    pub best_size: u32,
    pub line_count: usize,
    pub iterations: u32,
    pub found_fit: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Character-level simulation
// ────────────────────────────────────────────────────────────────────────────

/// Simulates a character-by-character wrap at `font_size`.
///
/// Returns the number of lines, or `None` as soon as the accumulated height exceeds
/// `max_height` (when given). `\n` forces a break. Bold characters are measured at
/// `font_size * BOLD_SCALE`.
pub fn simulate_char_wrap(
    paragraphs: &[Paragraph],
    font_size: f32,
    max_width: f32,
    max_height: Option<f32>,
) -> Option<usize> {
    let bold_size = font_size * BOLD_SCALE;
    let line_height = font_size * LINE_SPACING_RATIO;
    let limit = max_height.unwrap_or(f32::INFINITY);

    let mut total_height = 0.0_f32;
    let mut line_count = 0usize;
    let mut placed_paragraphs = 0usize;

    for paragraph in paragraphs.iter().filter(|p| p.char_count() > 0) {
        if placed_paragraphs > 0 {
            total_height += line_height * PARAGRAPH_GAP;
        }
        placed_paragraphs += 1;

        line_count += 1;
        total_height += line_height;
        if total_height > limit {
            return None;
        }

        let mut line_width = 0.0_f32;
        for (pos, c) in paragraph.text.chars().enumerate() {
            let w = if c == '\n' {
                None
            } else {
                let size = if paragraph.is_bold_at(pos) { bold_size } else { font_size };
                Some(char_width(c, size))
            };

            match w {
                Some(w) if line_width == 0.0 || line_width + w <= max_width => line_width += w,
                _ => {
                    line_count += 1;
                    total_height += line_height;
                    if total_height > limit {
                        return None;
                    }
                    line_width = w.unwrap_or(0.0);
                }
            }
        }
    }
    Some(line_count)
}

// ────────────────────────────────────────────────────────────────────────────
// Binary search
// ────────────────────────────────────────────────────────────────────────────

/// First midpoint, seeded from the region's height per paragraph and its width per glyph.
fn seed_size(paragraphs: &[Paragraph], max_width: f32, max_height: f32) -> Option<u32> {
    let by_height = max_height / (paragraphs.len() as f32 * 1.5);
    let by_width = max_width / (20.0 + bold_ratio(paragraphs) * 5.0);
    let seed = by_height.min(by_width);
    seed.is_finite()
        .then(|| seed.round().clamp(MIN_FONT_SIZE as f32, MAX_FONT_SIZE as f32) as u32)
}

pub(crate) fn search_font_size(paragraphs: &[Paragraph], region: &Region) -> SearchOutcome {
    let max_width = effective_width(region);
    let max_height = effective_height(region);

    let mut min_size = MIN_FONT_SIZE;
    let mut max_size = MAX_FONT_SIZE;
    let mut best_size = MIN_FONT_SIZE;
    let mut best_lines: Option<usize> = None;
    let mut iterations = 0u32;
    let mut next_mid = seed_size(paragraphs, max_width, max_height);

    while min_size <= max_size && iterations < MAX_ITERATIONS {
        let mid = next_mid
            .take()
            .map(|seed| seed.clamp(min_size, max_size))
            .unwrap_or((min_size + max_size) / 2);
        iterations += 1;

        match simulate_char_wrap(paragraphs, mid as f32, max_width, Some(max_height)) {
            Some(lines) => {
                best_size = mid;
                best_lines = Some(lines);
                min_size = mid + 1;
            }
            None => {
                // mid >= MIN_FONT_SIZE, so this cannot underflow.
                max_size = mid - 1;
            }
        }
    }

    let found_fit = best_lines.is_some();
    let line_count = best_lines.unwrap_or_else(|| {
        simulate_char_wrap(paragraphs, best_size as f32, max_width, None).unwrap_or(0)
    });

    SearchOutcome {
        best_size,
        line_count,
        iterations,
        found_fit,
    }
}

/// Chooses the largest font size in `[MIN_FONT_SIZE, MAX_FONT_SIZE]` that fits `region`.
///
/// Never fails. If nothing fits, the minimum size is returned and the caller accepts
/// the overflow.
pub fn solve_font_size(paragraphs: &[Paragraph], region: &Region) -> FontPlan {
    let outcome = search_font_size(paragraphs, region);
    debug!(
        size = outcome.best_size,
        lines = outcome.line_count,
        iterations = outcome.iterations,
        fits = outcome.found_fit,
        "Font size search finished"
    );
    FontPlan::for_size(outcome.best_size, outcome.line_count)
}

/// `solve_font_size` with a guard against regions no text can be laid into.
pub fn plan_fonts(paragraphs: &[Paragraph], region: &Region) -> Result<FontPlan, LayoutError> {
    if region.width == 0 || region.height == 0 {
        return Err(LayoutError::DegenerateRegion {
            width: region.width,
            height: region.height,
        });
    }
    Ok(solve_font_size(paragraphs, region))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
