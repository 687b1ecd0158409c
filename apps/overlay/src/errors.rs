use std::path::PathBuf;

use thiserror::Error;

use crate::render::RasterError;

/// Application-level error type.
///
/// Variants map onto how far a failure propagates: `Setup` and `Batch` are fatal to
/// the run, everything else is caught at the smallest unit that keeps the run moving
/// (one text block, then one image).
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("Setup error: {0}")]
    Setup(String),

    #[error("Failed to parse source {}: {reason}", path.display())]
    SourceParse { path: PathBuf, reason: String },

    #[error("Render error: {0}")]
    Render(String),

    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),

    #[error("Batch error: {0}")]
    Batch(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OverlayError {
    pub fn source_parse(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        OverlayError::SourceParse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors that must stop the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, OverlayError::Setup(_) | OverlayError::Batch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(OverlayError::Setup("missing".into()).is_fatal());
        assert!(OverlayError::Batch("panicked".into()).is_fatal());
        assert!(!OverlayError::Render("bad svg".into()).is_fatal());
        assert!(!OverlayError::source_parse("a.json", "eof").is_fatal());
    }

    #[test]
    fn test_source_parse_message_names_path() {
        let err = OverlayError::source_parse("books/a.json", "expected value");
        let msg = err.to_string();
        assert!(msg.contains("books/a.json"), "got {msg}");
        assert!(msg.contains("expected value"), "got {msg}");
    }
}
