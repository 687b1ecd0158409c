//! SVG markup for a set of positioned text runs.

use std::fmt::Write as _;

use crate::layout::TextRun;
use crate::text::model::Span;

/// Font family and default fill applied to every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextStyle {
    pub font_family: String,
    pub default_color: String,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "Arial, Helvetica, sans-serif".to_string(),
            default_color: "#000000".to_string(),
        }
    }
}

/// Escapes the five XML special characters.
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Splits a run's text into maximal pieces sharing one fill.
/// `None` means the piece inherits the default fill.
fn color_pieces(run: &TextRun) -> Vec<(Option<&str>, String)> {
    let mut pieces: Vec<(Option<&str>, String)> = Vec::new();
    for (pos, ch) in run.text.chars().enumerate() {
        let color = run
            .color_segments
            .iter()
            .find(|seg| seg.contains(pos))
            .map(|seg| seg.color.as_str());
        match pieces.last_mut() {
            Some((last, text)) if *last == color => text.push(ch),
            _ => pieces.push((color, ch.to_string())),
        }
    }
    pieces
}

/// Builds a transparent `width`×`height` SVG with one `<text>` element per line.
///
/// Runs sharing a baseline form one line. Only the first run's `x` is used; each
/// run is a `<tspan>` carrying its weight and size, so the renderer advances past
/// the real glyphs instead of the estimated widths.
pub fn build_svg(runs: &[TextRun], width: u32, height: u32, style: &TextStyle) -> String {
    let family = escape_xml(&style.font_family);
    let default_fill = escape_xml(&style.default_color);

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );

    let drawable: Vec<&TextRun> = runs.iter().filter(|r| !r.text.is_empty()).collect();
    for line in drawable.chunk_by(|a, b| a.y == b.y) {
        let first = line[0];
        let _ = write!(
            svg,
            r#"<text x="{:.2}" y="{:.2}" font-family="{family}" fill="{default_fill}" xml:space="preserve">"#,
            first.x, first.y
        );
        for (i, run) in line.iter().enumerate() {
            if i > 0 {
                svg.push(' ');
            }
            let weight = if run.is_bold { "bold" } else { "normal" };
            let _ = write!(svg, r#"<tspan font-size="{:.2}" font-weight="{weight}">"#, run.font_size);
            for (color, text) in color_pieces(run) {
                match color {
                    Some(color) => {
                        let _ = write!(svg, r#"<tspan fill="{}">{}</tspan>"#, escape_xml(color), escape_xml(&text));
                    }
                    None => svg.push_str(&escape_xml(&text)),
                }
            }
            svg.push_str("</tspan>");
        }
        svg.push_str("</text>");
    }

    svg.push_str("</svg>");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::ColorSegment;

    fn run(text: &str, segments: Vec<ColorSegment>) -> TextRun {
        TextRun {
            text: text.to_string(),
            x: 10.0,
            y: 30.0,
            font_size: 20.0,
            is_bold: false,
            color_segments: segments,
        }
    }

    fn unescape_xml(s: &str) -> String {
        s.replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&apos;", "'")
            .replace("&amp;", "&")
    }

    // ── escaping ──

    #[test]
    fn test_escape_all_specials() {
        assert_eq!(escape_xml(r#"a & b < c > d " e ' f"#), "a &amp; b &lt; c &gt; d &quot; e &apos; f");
        assert_eq!(escape_xml("plain"), "plain");
    }

    #[test]
    fn test_escape_round_trip_through_markup() {
        let original = r#"Tom & "Jerry" <3 'cheese'"#;
        let svg = build_svg(&[run(original, vec![])], 400, 100, &TextStyle::default());

        let marker = r#"font-weight="normal">"#;
        let open = svg.find(marker).unwrap() + marker.len();
        let close = svg[open..].find("</tspan>").unwrap() + open;
        assert_eq!(unescape_xml(&svg[open..close]), original);

        let tree = resvg::usvg::Tree::from_str(&svg, &resvg::usvg::Options::default());
        assert!(tree.is_ok());
    }

    #[test]
    fn test_font_family_attribute_is_escaped() {
        let style = TextStyle {
            font_family: r#""Open Sans", sans-serif"#.to_string(),
            default_color: "#000000".to_string(),
        };
        let svg = build_svg(&[run("x", vec![])], 10, 10, &style);
        assert!(svg.contains(r#"font-family="&quot;Open Sans&quot;, sans-serif""#));
    }

    // ── structure ──

    #[test]
    fn test_tspans_follow_color_segments() {
        let segments = vec![ColorSegment { start: 6, length: 3, color: "#FF0000".to_string() }];
        let svg = build_svg(&[run("plain red tail", segments)], 400, 100, &TextStyle::default());
        assert!(svg.contains(r##">plain <tspan fill="#FF0000">red</tspan> tail</tspan></text>"##));
    }

    #[test]
    fn test_runs_on_one_baseline_share_a_text_element() {
        let mut bold = run("B", vec![]);
        bold.is_bold = true;
        bold.x = 400.0;
        bold.font_size = 22.0;
        let mut next_line = run("c", vec![]);
        next_line.y = 60.0;

        let runs = [run("a", vec![]), bold, run("", vec![]), next_line];
        let svg = build_svg(&runs, 100, 50, &TextStyle::default());

        assert_eq!(svg.matches("<text ").count(), 2);
        assert!(svg.contains(
            r#"<tspan font-size="20.00" font-weight="normal">a</tspan> <tspan font-size="22.00" font-weight="bold">B</tspan></text>"#
        ));
        assert!(!svg.contains(r#"x="400.00""#), "only the first run of a line is positioned");
        assert!(svg.contains(r#"<text x="10.00" y="60.00""#));
        assert!(svg.contains(r#"width="100" height="50""#));
        assert!(resvg::usvg::Tree::from_str(&svg, &resvg::usvg::Options::default()).is_ok());
    }

    #[test]
    fn test_empty_runs_produce_empty_canvas() {
        let svg = build_svg(&[], 20, 20, &TextStyle::default());
        assert!(!svg.contains("<text"));
        assert!(resvg::usvg::Tree::from_str(&svg, &resvg::usvg::Options::default()).is_ok());
    }
}
