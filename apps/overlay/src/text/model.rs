//! Rich-text model: paragraphs annotated with character-range color and bold segments.
//!
//! Segment offsets count Unicode scalar values (`char`s), not bytes. Segments for the
//! same attribute are not expected to overlap, but lookups tolerate it by returning
//! the first match in enumeration order.

use serde::{Deserialize, Serialize};
use tracing::warn;

// ────────────────────────────────────────────────────────────────────────────
// Segments
// ────────────────────────────────────────────────────────────────────────────

/// A character range carrying a `#RRGGBB` color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorSegment {
    pub start: usize,
    pub length: usize,
    pub color: String,
}

/// A character range rendered in bold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoldSegment {
    pub start: usize,
    pub length: usize,
}

/// Shared range queries for both segment kinds.
pub trait Span {
    fn start(&self) -> usize;
    fn length(&self) -> usize;

    fn end(&self) -> usize {
        self.start().saturating_add(self.length())
    }

    /// True if character position `pos` falls inside this segment.
    fn contains(&self, pos: usize) -> bool {
        pos >= self.start() && pos < self.end()
    }

    /// True if the whole half-open span `[start, end)` lies inside this segment.
    fn covers(&self, start: usize, end: usize) -> bool {
        start < end && start >= self.start() && end <= self.end()
    }
}

impl Span for ColorSegment {
    fn start(&self) -> usize {
        self.start
    }
    fn length(&self) -> usize {
        self.length
    }
}

impl Span for BoldSegment {
    fn start(&self) -> usize {
        self.start
    }
    fn length(&self) -> usize {
        self.length
    }
}

/// Returns true for colors of the exact form `#RRGGBB`.
pub fn is_hex_color(color: &str) -> bool {
    let bytes = color.as_bytes();
    bytes.len() == 7 && bytes[0] == b'#' && bytes[1..].iter().all(u8::is_ascii_hexdigit)
}

// ────────────────────────────────────────────────────────────────────────────
// Rich-text block (one source row)
// ────────────────────────────────────────────────────────────────────────────

/// One row of rich text as delivered by the extraction collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichTextBlock {
    pub text: String,
    #[serde(default)]
    pub color_segments: Vec<ColorSegment>,
    #[serde(default)]
    pub bold_segments: Vec<BoldSegment>,
}

impl RichTextBlock {
    #[cfg(test)]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Splits the block into one paragraph per `\n`-separated line.
    ///
    /// Segments are clipped to each line and re-based to its first character.
    /// Whitespace-only lines are dropped. Invalid colors are discarded with a warning.
    pub fn paragraphs(&self) -> Vec<Paragraph> {
        let chars: Vec<char> = self.text.chars().collect();
        let mut paragraphs = Vec::new();
        let mut line_start = 0usize;

        for (i, &c) in chars.iter().enumerate().chain(std::iter::once((chars.len(), &'\n'))) {
            if c != '\n' {
                continue;
            }
            let mut line_end = i;
            if line_end > line_start && chars[line_end - 1] == '\r' {
                line_end -= 1;
            }
            let text: String = chars[line_start..line_end].iter().collect();
            if !text.trim().is_empty() {
                paragraphs.push(Paragraph {
                    text,
                    color_segments: self
                        .color_segments
                        .iter()
                        .filter(|s| keep_color(s))
                        .filter_map(|s| {
                            clip(s.start, s.end(), line_start, line_end).map(|(start, length)| {
                                ColorSegment {
                                    start,
                                    length,
                                    color: s.color.to_ascii_uppercase(),
                                }
                            })
                        })
                        .collect(),
                    bold_segments: self
                        .bold_segments
                        .iter()
                        .filter_map(|s| {
                            clip(s.start, s.end(), line_start, line_end)
                                .map(|(start, length)| BoldSegment { start, length })
                        })
                        .collect(),
                });
            }
            line_start = i + 1;
        }
        paragraphs
    }
}

fn keep_color(segment: &ColorSegment) -> bool {
    if is_hex_color(&segment.color) {
        true
    } else {
        warn!(color = %segment.color, "Ignoring color segment with invalid color");
        false
    }
}

/// Intersects `[seg_start, seg_end)` with `[line_start, line_end)`, re-based to `line_start`.
fn clip(seg_start: usize, seg_end: usize, line_start: usize, line_end: usize) -> Option<(usize, usize)> {
    let start = seg_start.max(line_start);
    let end = seg_end.min(line_end);
    (end > start).then(|| (start - line_start, end - start))
}

// ────────────────────────────────────────────────────────────────────────────
// Paragraph
// ────────────────────────────────────────────────────────────────────────────

/// One logical paragraph with its styling, consumed read-only by the layout passes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub text: String,
    pub color_segments: Vec<ColorSegment>,
    pub bold_segments: Vec<BoldSegment>,
}

impl Paragraph {
    #[cfg(test)]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    #[cfg(test)]
    pub fn color_at(&self, pos: usize) -> Option<&str> {
        self.color_segments
            .iter()
            .find(|s| s.contains(pos))
            .map(|s| s.color.as_str())
    }

    pub fn is_bold_at(&self, pos: usize) -> bool {
        self.bold_segments.iter().any(|s| s.contains(pos))
    }

    /// Color of the first segment fully covering `[start, end)`.
    pub fn span_color(&self, start: usize, end: usize) -> Option<&str> {
        self.color_segments
            .iter()
            .find(|s| s.covers(start, end))
            .map(|s| s.color.as_str())
    }

    /// True if one bold segment fully covers `[start, end)`.
    pub fn span_is_bold(&self, start: usize, end: usize) -> bool {
        self.bold_segments.iter().any(|s| s.covers(start, end))
    }

    pub fn bold_char_count(&self) -> usize {
        (0..self.char_count()).filter(|&i| self.is_bold_at(i)).count()
    }
}

/// Fraction of bold characters across all paragraphs (0.0 when there is no text).
pub fn bold_ratio(paragraphs: &[Paragraph]) -> f32 {
    let total: usize = paragraphs.iter().map(Paragraph::char_count).sum();
    if total == 0 {
        return 0.0;
    }
    let bold: usize = paragraphs.iter().map(Paragraph::bold_char_count).sum();
    bold as f32 / total as f32
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn styled() -> Paragraph {
        Paragraph {
            text: "Hello bold world".to_string(),
            color_segments: vec![
                ColorSegment { start: 0, length: 5, color: "#FF0000".to_string() },
                ColorSegment { start: 2, length: 8, color: "#00FF00".to_string() },
            ],
            bold_segments: vec![BoldSegment { start: 6, length: 4 }],
        }
    }

    #[test]
    fn test_color_at_returns_first_match_on_overlap() {
        let p = styled();
        assert_eq!(p.color_at(3), Some("#FF0000"));
        assert_eq!(p.color_at(7), Some("#00FF00"));
        assert_eq!(p.color_at(12), None);
    }

    #[test]
    fn test_span_color_requires_full_coverage() {
        let p = styled();
        assert_eq!(p.span_color(0, 5), Some("#FF0000"));
        // "bold" (6..10) is covered by the green segment only.
        assert_eq!(p.span_color(6, 10), Some("#00FF00"));
        // "world" (11..16) is not covered at all.
        assert_eq!(p.span_color(11, 16), None);
    }

    #[test]
    fn test_span_is_bold() {
        let p = styled();
        assert!(p.span_is_bold(6, 10));
        assert!(!p.span_is_bold(5, 10));
        assert!(!p.span_is_bold(6, 6), "empty span is never covered");
    }

    #[test]
    fn test_bold_ratio() {
        let p = styled();
        let ratio = bold_ratio(&[p]);
        assert!((ratio - 4.0 / 16.0).abs() < 1e-6, "got {ratio}");
        assert_eq!(bold_ratio(&[]), 0.0);
    }

    #[test]
    fn test_is_hex_color() {
        assert!(is_hex_color("#A1b2C3"));
        assert!(!is_hex_color("A1B2C3"));
        assert!(!is_hex_color("#A1B2C"));
        assert!(!is_hex_color("#GGGGGG"));
    }

    #[test]
    fn test_paragraphs_split_and_rebase_segments() {
        let block = RichTextBlock {
            text: "first line\r\nsecond line".to_string(),
            color_segments: vec![ColorSegment {
                start: 6,
                length: 11,
                color: "#0000ff".to_string(),
            }],
            bold_segments: vec![BoldSegment { start: 12, length: 6 }],
        };
        let paragraphs = block.paragraphs();
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[0].text, "first line");
        assert_eq!(paragraphs[1].text, "second line");

        // Color 6..17 clips to "line" in paragraph 0 and "secon" in paragraph 1.
        assert_eq!(paragraphs[0].color_segments[0].start, 6);
        assert_eq!(paragraphs[0].color_segments[0].length, 4);
        assert_eq!(paragraphs[0].color_segments[0].color, "#0000FF");
        assert_eq!(paragraphs[1].color_segments[0].start, 0);
        assert_eq!(paragraphs[1].color_segments[0].length, 5);

        // Bold 12..18 lands entirely in paragraph 1 as "second".
        assert!(paragraphs[0].bold_segments.is_empty());
        assert_eq!(paragraphs[1].bold_segments, vec![BoldSegment { start: 0, length: 6 }]);
    }

    #[test]
    fn test_paragraphs_drop_blank_lines_and_bad_colors() {
        let block = RichTextBlock {
            text: "one\n   \ntwo".to_string(),
            color_segments: vec![ColorSegment {
                start: 0,
                length: 3,
                color: "red".to_string(),
            }],
            bold_segments: vec![],
        };
        let paragraphs = block.paragraphs();
        assert_eq!(paragraphs.len(), 2);
        assert!(paragraphs[0].color_segments.is_empty());
    }

    #[test]
    fn test_block_deserializes_camel_case() {
        let json = r##"{"text":"Hi","colorSegments":[{"start":0,"length":2,"color":"#123456"}]}"##;
        let block: RichTextBlock = serde_json::from_str(json).unwrap();
        assert_eq!(block.color_segments.len(), 1);
        assert!(block.bold_segments.is_empty());
    }
}
