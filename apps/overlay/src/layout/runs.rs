//! Positions wrapped lines as render-ready text runs.

use serde::{Deserialize, Serialize};

use crate::layout::glyph_metrics::{space_width, str_width};
use crate::layout::line_breaker::{effective_width, WrappedLine};
use crate::layout::optimizer::LayoutPlan;
use crate::regions::Region;
use crate::text::ColorSegment;

/// A positioned, uniformly bold-or-regular piece of one line.
///
/// `y` is the baseline. `x` comes from estimated glyph widths; markup only places
/// the first run of each line and lets the renderer advance the rest.
/// `color_segments` index characters of `text`; characters outside every segment
/// use the default fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub is_bold: bool,
    pub color_segments: Vec<ColorSegment>,
}

impl TextRun {
    /// Copy with position and size multiplied by `factor` (used when supersampling).
    pub fn scaled(&self, factor: f32) -> TextRun {
        TextRun {
            x: self.x * factor,
            y: self.y * factor,
            font_size: self.font_size * factor,
            ..self.clone()
        }
    }
}

/// Left edge of text inside `region`; the unused width is split evenly on both sides.
pub fn text_origin_x(region: &Region) -> f32 {
    region.x as f32 + (region.width as f32 - effective_width(region)) / 2.0
}

/// Turns wrapped lines into runs, grouping consecutive words of equal weight.
pub fn build_text_runs(lines: &[WrappedLine], region: &Region, plan: &LayoutPlan) -> Vec<TextRun> {
    let origin_x = text_origin_x(region);
    let space_w = space_width(plan.font_size);
    let mut runs = Vec::new();
    let mut offset = 0.0_f32;

    for line in lines {
        if line.is_paragraph_space() {
            offset += plan.line_height * 0.5;
            continue;
        }
        let baseline = plan.start_y + offset + plan.font_size;
        let mut cursor_x = origin_x;
        let mut current: Option<TextRun> = None;

        for word in line.words() {
            let size = if word.bold { plan.bold_font_size } else { plan.font_size };

            if !matches!(&current, Some(run) if run.is_bold == word.bold) {
                runs.extend(current.take());
            }
            let run = current.get_or_insert_with(|| TextRun {
                text: String::new(),
                x: cursor_x,
                y: baseline,
                font_size: size,
                is_bold: word.bold,
                color_segments: Vec::new(),
            });
            if !run.text.is_empty() {
                run.text.push(' ');
            }

            if let Some(color) = &word.color {
                run.color_segments.push(ColorSegment {
                    start: run.text.chars().count(),
                    length: word.text.chars().count(),
                    color: color.clone(),
                });
            }
            run.text.push_str(&word.text);
            cursor_x += str_width(&word.text, size) + space_w;
        }
        runs.extend(current);
        offset += plan.line_height;
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::line_breaker::StyledWord;
    use crate::layout::optimizer::{SpacingAdjustment, VerticalAlignment};

    fn word(text: &str, bold: bool, color: Option<&str>) -> StyledWord {
        StyledWord {
            text: text.to_string(),
            char_start: 0,
            bold,
            color: color.map(str::to_string),
            width: 0.0,
        }
    }

    fn plan() -> LayoutPlan {
        LayoutPlan {
            font_size: 20.0,
            bold_font_size: 22.0,
            line_height: 24.0,
            alignment: VerticalAlignment::Top,
            adjustment: SpacingAdjustment::Unchanged,
            start_y: 50.0,
            content_height: 0.0,
        }
    }

    fn text_line(words: Vec<StyledWord>) -> WrappedLine {
        WrappedLine::Text { words, total_width: 0.0 }
    }

    #[test]
    fn test_text_origin_centers_effective_width() {
        let region = Region::new(10, 0, 200, 100);
        assert!((text_origin_x(&region) - 25.0).abs() < 1e-4);
    }

    #[test]
    fn test_runs_group_by_weight_and_advance_x() {
        let region = Region::new(0, 0, 200, 100);
        let lines = vec![text_line(vec![
            word("ab", false, None),
            word("cd", false, None),
            word("EF", true, None),
        ])];
        let runs = build_text_runs(&lines, &region, &plan());
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text, "ab cd");
        assert!(!runs[0].is_bold);
        assert_eq!(runs[1].text, "EF");
        assert!(runs[1].is_bold);
        assert_eq!(runs[1].font_size, 22.0);

        // ab (22) + space (6) + cd (22) + space (6) = 56 after the 15px origin.
        assert!((runs[0].x - 15.0).abs() < 1e-4);
        assert!((runs[1].x - 71.0).abs() < 1e-4);
        assert!((runs[0].y - 70.0).abs() < 1e-4);
    }

    #[test]
    fn test_runs_carry_relative_color_segments() {
        let region = Region::new(0, 0, 400, 100);
        let lines = vec![text_line(vec![
            word("plain", false, None),
            word("red", false, Some("#FF0000")),
        ])];
        let runs = build_text_runs(&lines, &region, &plan());
        assert_eq!(runs.len(), 1);
        assert_eq!(
            runs[0].color_segments,
            vec![ColorSegment { start: 6, length: 3, color: "#FF0000".to_string() }]
        );
    }

    #[test]
    fn test_baselines_step_by_line_height_and_half_for_paragraph_space() {
        let region = Region::new(0, 0, 400, 300);
        let lines = vec![
            text_line(vec![word("one", false, None)]),
            text_line(vec![word("two", false, None)]),
            WrappedLine::ParagraphSpace,
            text_line(vec![word("three", false, None)]),
        ];
        let runs = build_text_runs(&lines, &region, &plan());
        let ys: Vec<f32> = runs.iter().map(|r| r.y).collect();
        assert_eq!(ys, vec![70.0, 94.0, 130.0]);
    }

    #[test]
    fn test_scaled_run() {
        let run = TextRun {
            text: "x".to_string(),
            x: 10.0,
            y: 20.0,
            font_size: 15.0,
            is_bold: true,
            color_segments: vec![],
        };
        let scaled = run.scaled(2.0);
        assert_eq!((scaled.x, scaled.y, scaled.font_size), (20.0, 40.0, 30.0));
        assert!(scaled.is_bold);
    }
}
