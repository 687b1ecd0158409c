//! Rich-text sources: pluggable loaders that turn a workbook file into text blocks.
//!
//! Default: `JsonWorkbookSource`, reading workbooks already normalized to the
//! rich-text model. The session holds an `Arc<dyn RichTextSource>`, so a different
//! extraction backend can be swapped in without touching the pipeline.
//!
//! Workbook bytes come through the session's `ReadCache`: a root workbook paired
//! with many images is read from disk once per run, within the cache budget.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::errors::OverlayError;
use crate::pipeline::cache::ReadCache;
use crate::text::model::RichTextBlock;

/// File extension recognised as a workbook by discovery.
pub const WORKBOOK_EXTENSION: &str = "json";

#[async_trait]
pub trait RichTextSource: Send + Sync {
    /// Loads one text block per non-empty row of the first worksheet.
    async fn load(&self, path: &Path) -> Result<Vec<RichTextBlock>, OverlayError>;
}

/// On-disk workbook shapes: a bare row array, or a list of sheets.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WorkbookFile {
    Rows(Vec<RichTextBlock>),
    Sheets { sheets: Vec<Vec<RichTextBlock>> },
}

/// Loads JSON workbooks through a shared read cache. Only the first sheet is read.
#[derive(Debug, Clone)]
pub struct JsonWorkbookSource {
    cache: Arc<ReadCache>,
}

impl JsonWorkbookSource {
    pub fn new(cache: Arc<ReadCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl RichTextSource for JsonWorkbookSource {
    async fn load(&self, path: &Path) -> Result<Vec<RichTextBlock>, OverlayError> {
        let bytes = self.cache.read_or_load(path).await?;
        let rows = parse_workbook(&bytes).map_err(|e| OverlayError::source_parse(path, e))?;
        debug!(path = %path.display(), rows = rows.len(), "Loaded workbook");
        Ok(rows)
    }
}

/// Parses workbook bytes and drops blank rows.
pub fn parse_workbook(bytes: &[u8]) -> Result<Vec<RichTextBlock>, serde_json::Error> {
    let rows = match serde_json::from_slice::<WorkbookFile>(bytes)? {
        WorkbookFile::Rows(rows) => rows,
        WorkbookFile::Sheets { sheets } => sheets.into_iter().next().unwrap_or_default(),
    };
    Ok(rows.into_iter().filter(|row| !row.is_blank()).collect())
}
