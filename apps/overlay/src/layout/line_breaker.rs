//! Line Breaker: greedy word wrap that keeps each word's bold/color styling intact.
//!
//! Words are the atomic styling unit: a word is bold (or colored) only when one segment
//! covers its whole character span, so no word is ever split between two styles.
//! Paragraphs are separated by a `ParagraphSpace` marker rather than a blank text line.

use serde::{Deserialize, Serialize};

use crate::layout::glyph_metrics::{space_width, str_width};
use crate::regions::Region;
use crate::text::Paragraph;

/// Fraction of the region width available to text.
pub const WIDTH_FILL: f32 = 0.85;

/// Usable text width inside `region`.
#[inline]
pub fn effective_width(region: &Region) -> f32 {
    region.width as f32 * WIDTH_FILL
}

// ────────────────────────────────────────────────────────────────────────────
// Output types
// ────────────────────────────────────────────────────────────────────────────

/// One word with the style resolved for its full span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyledWord {
    pub text: String,
    /// Character offset of the word inside its paragraph.
    pub char_start: usize,
    pub bold: bool,
    pub color: Option<String>,
    /// Estimated width at the word's own font size.
    pub width: f32,
}

/// A wrapped line, or a spacing-only marker between paragraphs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WrappedLine {
    Text {
        words: Vec<StyledWord>,
        /// Sum of word widths plus inter-word spaces.
        total_width: f32,
    },
    ParagraphSpace,
}

impl WrappedLine {
    pub fn is_paragraph_space(&self) -> bool {
        matches!(self, WrappedLine::ParagraphSpace)
    }

    pub fn words(&self) -> &[StyledWord] {
        match self {
            WrappedLine::Text { words, .. } => words,
            WrappedLine::ParagraphSpace => &[],
        }
    }

    #[cfg(test)]
    pub fn total_width(&self) -> f32 {
        match self {
            WrappedLine::Text { total_width, .. } => *total_width,
            WrappedLine::ParagraphSpace => 0.0,
        }
    }

    /// Rendered characters on the line, counting one space between words.
    pub fn char_count(&self) -> usize {
        let words = self.words();
        let letters: usize = words.iter().map(|w| w.text.chars().count()).sum();
        letters + words.len().saturating_sub(1)
    }

    /// Plain text of the line with single spaces between words.
    #[cfg(test)]
    pub fn text(&self) -> String {
        self.words()
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wrapping
// ────────────────────────────────────────────────────────────────────────────

/// Splits on whitespace, returning `(char_offset, word)` pairs.
pub fn split_words(text: &str) -> Vec<(usize, &str)> {
    let mut words = Vec::new();
    let mut start: Option<(usize, usize)> = None;

    for (char_idx, (byte_idx, c)) in text.char_indices().enumerate() {
        if c.is_whitespace() {
            if let Some((char_start, byte_start)) = start.take() {
                words.push((char_start, &text[byte_start..byte_idx]));
            }
        } else if start.is_none() {
            start = Some((char_idx, byte_idx));
        }
    }
    if let Some((char_start, byte_start)) = start {
        words.push((char_start, &text[byte_start..]));
    }
    words
}

/// Resolves each word's style and width.
pub fn styled_words(paragraph: &Paragraph, normal_size: f32, bold_size: f32) -> Vec<StyledWord> {
    split_words(&paragraph.text)
        .into_iter()
        .map(|(char_start, word)| {
            let char_end = char_start + word.chars().count();
            let bold = paragraph.span_is_bold(char_start, char_end);
            let size = if bold { bold_size } else { normal_size };
            StyledWord {
                text: word.to_string(),
                char_start,
                bold,
                color: paragraph.span_color(char_start, char_end).map(str::to_string),
                width: str_width(word, size),
            }
        })
        .collect()
}

/// Greedy word wrap of a single paragraph. Zero words produce zero lines.
///
/// A word wider than `max_width` is still placed, alone on its own line.
pub fn wrap_paragraph(
    paragraph: &Paragraph,
    max_width: f32,
    normal_size: f32,
    bold_size: f32,
) -> Vec<WrappedLine> {
    let space_w = space_width(normal_size);
    let mut lines = Vec::new();
    let mut current: Vec<StyledWord> = Vec::new();
    let mut current_width = 0.0_f32;

    for word in styled_words(paragraph, normal_size, bold_size) {
        let gap = if current.is_empty() { 0.0 } else { space_w };

        if !current.is_empty() && current_width + gap + word.width > max_width {
            // Line is full: flush and start the next one with this word.
            lines.push(WrappedLine::Text {
                words: std::mem::take(&mut current),
                total_width: current_width,
            });
            current_width = word.width;
        } else {
            current_width += gap + word.width;
        }
        current.push(word);
    }
    if !current.is_empty() {
        lines.push(WrappedLine::Text {
            words: current,
            total_width: current_width,
        });
    }
    lines
}

/// Wraps every paragraph against `region`, separating paragraphs with `ParagraphSpace`.
pub fn wrap_paragraphs(
    paragraphs: &[Paragraph],
    region: &Region,
    normal_size: f32,
    bold_size: f32,
) -> Vec<WrappedLine> {
    let max_width = effective_width(region);
    let mut lines: Vec<WrappedLine> = Vec::new();

    for paragraph in paragraphs {
        let wrapped = wrap_paragraph(paragraph, max_width, normal_size, bold_size);
        if wrapped.is_empty() {
            continue;
        }
        if !lines.is_empty() {
            lines.push(WrappedLine::ParagraphSpace);
        }
        lines.extend(wrapped);
    }
    lines
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
