//! Layout Optimizer: one-shot spacing adjustment and vertical placement of wrapped text.
//!
//! After wrapping, the block may be taller than its region (shrink) or leave a lot of
//! air (loosen). This module measures the block, picks a single spacing adjustment,
//! classifies the vertical alignment and computes where the block starts.
//!
//! # Spacing rules
//! - height ratio > 1.1          → line height ×0.9, font size ×0.95
//! - 0.95 < height ratio ≤ 1.1   → line height ×0.95
//! - height ratio < 0.7 and sparse content → line height ×1.1
//!
//! Adjustments are applied once and never re-measured.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::layout::font_solver::BOLD_SCALE;
use crate::layout::line_breaker::WrappedLine;
use crate::regions::Region;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalAlignment {
    Top,
    Center,
    Bottom,
}

impl FromStr for VerticalAlignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(VerticalAlignment::Top),
            "center" | "middle" => Ok(VerticalAlignment::Center),
            "bottom" => Ok(VerticalAlignment::Bottom),
            other => Err(format!("unknown vertical alignment '{other}'")),
        }
    }
}

/// The single spacing change applied to a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpacingAdjustment {
    /// Far too tall: tighten lines and shrink glyphs.
    Shrink,
    /// Slightly too tall: tighten lines only.
    Tighten,
    /// Short and sparse: open up the lines.
    Loosen,
    Unchanged,
}

/// Measurements of a wrapped block inside its region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContentMetrics {
    pub content_height: f32,
    pub height_ratio: f32,
    /// Average of `chars × font_size / region width` over text lines.
    pub content_density: f32,
    pub avg_chars_per_line: f32,
    pub text_line_count: usize,
    pub longest_line_chars: usize,
}

/// Final vertical layout of a block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutPlan {
    pub font_size: f32,
    pub bold_font_size: f32,
    pub line_height: f32,
    pub alignment: VerticalAlignment,
    pub adjustment: SpacingAdjustment,
    /// Top of the text block in image space.
    pub start_y: f32,
    pub content_height: f32,
}

// ────────────────────────────────────────────────────────────────────────────
// Core functions
// ────────────────────────────────────────────────────────────────────────────

/// Height of the block: one `line_height` per text line, half for paragraph spaces.
pub fn content_height(lines: &[WrappedLine], line_height: f32) -> f32 {
    lines
        .iter()
        .map(|l| if l.is_paragraph_space() { line_height * 0.5 } else { line_height })
        .sum()
}

pub fn measure_content(
    lines: &[WrappedLine],
    region: &Region,
    line_height: f32,
    font_size: f32,
) -> ContentMetrics {
    let height = content_height(lines, line_height);
    let char_counts: Vec<usize> = lines
        .iter()
        .filter(|l| !l.is_paragraph_space())
        .map(WrappedLine::char_count)
        .collect();
    let text_line_count = char_counts.len();

    let (content_density, avg_chars_per_line) = if text_line_count == 0 {
        (0.0, 0.0)
    } else {
        let n = text_line_count as f32;
        let width = region.width.max(1) as f32;
        let density: f32 = char_counts
            .iter()
            .map(|&c| c as f32 * font_size / width)
            .sum::<f32>()
            / n;
        let avg = char_counts.iter().sum::<usize>() as f32 / n;
        (density, avg)
    };

    ContentMetrics {
        content_height: height,
        height_ratio: height / region.height.max(1) as f32,
        content_density,
        avg_chars_per_line,
        text_line_count,
        longest_line_chars: char_counts.iter().copied().max().unwrap_or(0),
    }
}

pub fn classify_spacing(metrics: &ContentMetrics) -> SpacingAdjustment {
    let ratio = metrics.height_ratio;
    if ratio > 1.1 {
        SpacingAdjustment::Shrink
    } else if ratio > 0.95 {
        SpacingAdjustment::Tighten
    } else if ratio < 0.7 && metrics.content_density < 0.5 {
        SpacingAdjustment::Loosen
    } else {
        SpacingAdjustment::Unchanged
    }
}

/// Returns `(line_height, font_size)` after applying `adjustment`.
pub fn apply_spacing(adjustment: SpacingAdjustment, line_height: f32, font_size: f32) -> (f32, f32) {
    match adjustment {
        SpacingAdjustment::Shrink => (line_height * 0.9, font_size * 0.95),
        SpacingAdjustment::Tighten => (line_height * 0.95, font_size),
        SpacingAdjustment::Loosen => (line_height * 1.1, font_size),
        SpacingAdjustment::Unchanged => (line_height, font_size),
    }
}

/// Short or sparse blocks are centered; tall or long-lined blocks hug the top.
pub fn determine_vertical_alignment(metrics: &ContentMetrics) -> VerticalAlignment {
    let is_sparse = metrics.avg_chars_per_line < 30.0 && metrics.text_line_count < 5;

    if metrics.height_ratio < 0.5 || is_sparse {
        VerticalAlignment::Center
    } else if metrics.height_ratio > 0.8 || metrics.longest_line_chars > 50 {
        VerticalAlignment::Top
    } else {
        VerticalAlignment::Center
    }
}

/// Top of the block for `alignment`, clamped to keep half a line of padding.
///
/// When the block is taller than the region the lower bound wins, so text
/// overflows downward rather than above the region.
pub fn compute_start_y(
    alignment: VerticalAlignment,
    region: &Region,
    total_height: f32,
    line_height: f32,
) -> f32 {
    let top = region.y as f32;
    let height = region.height as f32;
    let padding = line_height * 0.5;

    let raw = match alignment {
        VerticalAlignment::Top => top + padding,
        VerticalAlignment::Bottom => top + height - total_height - padding,
        VerticalAlignment::Center => top + (height - total_height) / 2.0,
    };

    let lower = top + padding;
    let upper = top + height - total_height - padding;
    raw.min(upper).max(lower)
}

/// Measures, adjusts once, aligns. `alignment_override` skips the classification.
pub fn optimize_layout(
    lines: &[WrappedLine],
    region: &Region,
    line_height: f32,
    font_size: f32,
    alignment_override: Option<VerticalAlignment>,
) -> LayoutPlan {
    let metrics = measure_content(lines, region, line_height, font_size);
    let adjustment = classify_spacing(&metrics);
    let (line_height, font_size) = apply_spacing(adjustment, line_height, font_size);
    let alignment = alignment_override.unwrap_or_else(|| determine_vertical_alignment(&metrics));

    let total_height = content_height(lines, line_height);
    let start_y = compute_start_y(alignment, region, total_height, line_height);

    LayoutPlan {
        font_size,
        bold_font_size: font_size * BOLD_SCALE,
        line_height,
        alignment,
        adjustment,
        start_y,
        content_height: total_height,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
