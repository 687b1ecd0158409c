//! Heuristic glyph-width model used by every layout pass.
//!
//! Widths are a fixed ratio of the font size, chosen by one of four character
//! buckets. There is no kerning and no per-font table: the solver's convergence
//! is tuned to this model, so the ratios must stay stable across releases.

// ────────────────────────────────────────────────────────────────────────────
// Character buckets
// ────────────────────────────────────────────────────────────────────────────

/// Width ratio (relative to font size) for whitespace.
pub const WHITESPACE_RATIO: f32 = 0.30;
/// Width ratio for narrow punctuation and thin letters.
pub const NARROW_RATIO: f32 = 0.35;
/// Width ratio for wide capitals and symbols.
pub const WIDE_RATIO: f32 = 0.75;
/// Width ratio for everything else, including non-ASCII.
pub const DEFAULT_RATIO: f32 = 0.55;

const NARROW_CHARS: &str = "ijl,.'\"|!()[]{}/-_";
const WIDE_CHARS: &str = "mwWM@QOCDG%&#AHNUX";

/// The width bucket a character falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlyphClass {
    Whitespace,
    Narrow,
    Wide,
    Regular,
}

impl GlyphClass {
    pub fn of(c: char) -> Self {
        if c.is_whitespace() {
            GlyphClass::Whitespace
        } else if NARROW_CHARS.contains(c) {
            GlyphClass::Narrow
        } else if WIDE_CHARS.contains(c) {
            GlyphClass::Wide
        } else {
            GlyphClass::Regular
        }
    }

    pub fn ratio(self) -> f32 {
        match self {
            GlyphClass::Whitespace => WHITESPACE_RATIO,
            GlyphClass::Narrow => NARROW_RATIO,
            GlyphClass::Wide => WIDE_RATIO,
            GlyphClass::Regular => DEFAULT_RATIO,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Measurement
// ────────────────────────────────────────────────────────────────────────────

/// Estimated advance width of `c` at `font_size` pixels.
#[inline]
pub fn char_width(c: char, font_size: f32) -> f32 {
    font_size * GlyphClass::of(c).ratio()
}

/// Estimated width of a whole string at a single font size.
pub fn str_width(s: &str, font_size: f32) -> f32 {
    s.chars().map(|c| char_width(c, font_size)).sum()
}

/// Width of the inter-word space at `font_size`.
#[inline]
pub fn space_width(font_size: f32) -> f32 {
    char_width(' ', font_size)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_classification() {
        assert_eq!(GlyphClass::of(' '), GlyphClass::Whitespace);
        assert_eq!(GlyphClass::of('\t'), GlyphClass::Whitespace);
        assert_eq!(GlyphClass::of('i'), GlyphClass::Narrow);
        assert_eq!(GlyphClass::of('"'), GlyphClass::Narrow);
        assert_eq!(GlyphClass::of('_'), GlyphClass::Narrow);
        assert_eq!(GlyphClass::of('W'), GlyphClass::Wide);
        assert_eq!(GlyphClass::of('&'), GlyphClass::Wide);
        assert_eq!(GlyphClass::of('a'), GlyphClass::Regular);
        assert_eq!(GlyphClass::of('é'), GlyphClass::Regular);
    }

    #[test]
    fn test_char_width_uses_ratio() {
        assert!((char_width(' ', 20.0) - 6.0).abs() < 1e-4);
        assert!((char_width('l', 20.0) - 7.0).abs() < 1e-4);
        assert!((char_width('M', 20.0) - 15.0).abs() < 1e-4);
        assert!((char_width('e', 20.0) - 11.0).abs() < 1e-4);
    }

    #[test]
    fn test_width_monotonic_in_font_size_for_every_bucket() {
        for c in [' ', 'i', 'W', 'e'] {
            for f1 in [1.0_f32, 14.0, 30.5, 71.0] {
                let f2 = f1 + 0.5;
                assert!(
                    char_width(c, f2) > char_width(c, f1),
                    "width of {c:?} must grow from {f1} to {f2}"
                );
            }
        }
    }

    #[test]
    fn test_str_width_empty_is_zero() {
        assert_eq!(str_width("", 40.0), 0.0);
    }

    #[test]
    fn test_str_width_sums_chars() {
        // "Hi!" = H(0.75) + i(0.35) + !(0.35) = 1.45
        let width = str_width("Hi!", 10.0);
        assert!((width - 14.5).abs() < 1e-3, "got {width}");
    }

    #[test]
    fn test_measurement_is_deterministic() {
        let text = "Quarterly revenue grew 12%, beating guidance";
        assert_eq!(str_width(text, 23.0), str_width(text, 23.0));
    }
}
