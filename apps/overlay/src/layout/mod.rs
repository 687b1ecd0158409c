// Text layout: glyph-width model, word wrap, font-size search, spacing/alignment, run positioning.
// All CPU-bound; callers run it inside tokio::task::spawn_blocking.

pub mod font_solver;
pub mod glyph_metrics;
pub mod line_breaker;
pub mod optimizer;
pub mod runs;

// Re-export the public API consumed by the pipeline.
pub use font_solver::{plan_fonts, FontPlan};
pub use line_breaker::wrap_paragraphs;
pub use optimizer::{optimize_layout, LayoutPlan, VerticalAlignment};
pub use runs::{build_text_runs, TextRun};
