// Rich-text model consumed by the layout passes, plus the loaders that produce it.

pub mod model;
pub mod source;

pub use model::{bold_ratio, ColorSegment, Paragraph, RichTextBlock};
pub use source::{JsonWorkbookSource, RichTextSource};
