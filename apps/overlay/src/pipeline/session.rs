//! Batch session: discovers inputs, runs images in bounded batches, reports a summary.
//!
//! # Concurrency
//! - Images run `batch_size` at a time in a `JoinSet`; each batch is joined before
//!   the next starts.
//! - Each text block of an image is its own task and writes its own output path.
//! - Region finding and compositing are CPU-bound and go through `spawn_blocking`.
//! - Images and workbooks are read through the shared `ReadCache`, so a root
//!   workbook paired with every image is read from disk once.
//!
//! Failures stay as local as possible: a bad block fails only its output, a bad
//! image skips only its blocks. A `JoinError` (panic or abort) is a `Batch` error
//! and ends the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::errors::OverlayError;
use crate::pipeline::discovery::{plan_jobs, ImageJob};
use crate::pipeline::insertion::{insert_text, locate_text_region, InsertOutcome};
use crate::regions::Region;
use crate::state::AppState;
use crate::text::{Paragraph, RichTextBlock};

// ────────────────────────────────────────────────────────────────────────────
// Summary
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    Written,
    Skipped,
    Failed,
}

/// Counts over text-block outputs. `total = succeeded + skipped + failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub images: usize,
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: BlockOutcome) {
        self.total += 1;
        match outcome {
            BlockOutcome::Written => self.succeeded += 1,
            BlockOutcome::Skipped => self.skipped += 1,
            BlockOutcome::Failed => self.failed += 1,
        }
    }

    fn skip_all(&mut self, count: usize) {
        self.total += count;
        self.skipped += count;
    }

    fn merge(&mut self, other: RunSummary) {
        self.images += other.images;
        self.total += other.total;
        self.succeeded += other.succeeded;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Session
// ────────────────────────────────────────────────────────────────────────────

pub struct BatchSession {
    state: AppState,
}

impl BatchSession {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Processes every discovered image. Only `Setup` and `Batch` errors are returned.
    pub async fn run(&self) -> Result<RunSummary, OverlayError> {
        let result = self.run_batches().await;
        self.state.cache.clear();
        result
    }

    async fn run_batches(&self) -> Result<RunSummary, OverlayError> {
        let config = &self.state.config;
        let jobs = plan_jobs(&config.images_dir, &config.workbooks_dir)?;
        if jobs.is_empty() {
            return Err(OverlayError::Setup(format!(
                "no images found under {}",
                config.images_dir.display()
            )));
        }
        if jobs.iter().all(|job| job.workbooks.is_empty()) {
            return Err(OverlayError::Setup(format!(
                "no workbooks found under {}",
                config.workbooks_dir.display()
            )));
        }

        let batch_size = config.batch_size.max(1);
        let batch_count = jobs.len().div_ceil(batch_size);
        info!(images = jobs.len(), batches = batch_count, batch_size, "Starting overlay run");

        let mut summary = RunSummary::default();
        for (index, batch) in jobs.chunks(batch_size).enumerate() {
            info!(batch = index + 1, of = batch_count, images = batch.len(), "Processing batch");

            let mut set = JoinSet::new();
            for job in batch {
                set.spawn(process_image(self.state.clone(), job.clone()));
            }

            while let Some(joined) = set.join_next().await {
                let outcome = joined
                    .map_err(|e| OverlayError::Batch(format!("image task failed: {e}")))
                    .and_then(|result| result);
                match outcome {
                    Ok(image_summary) => summary.merge(image_summary),
                    Err(e) => {
                        set.abort_all();
                        return Err(e);
                    }
                }
            }

            info!(
                batch = index + 1,
                succeeded = summary.succeeded,
                total = summary.total,
                "Batch finished"
            );
        }

        Ok(summary)
    }
}

/// Text blocks for `job`, concatenated in sorted workbook order. Unreadable
/// workbooks are skipped.
async fn load_blocks(state: &AppState, job: &ImageJob) -> Vec<RichTextBlock> {
    let mut blocks = Vec::new();
    for path in &job.workbooks {
        match state.source.load(path).await {
            Ok(rows) => blocks.extend(rows),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping workbook"),
        }
    }
    blocks
}

// ────────────────────────────────────────────────────────────────────────────
// Per-image and per-block tasks
// ────────────────────────────────────────────────────────────────────────────

fn join_failed(what: &str, e: tokio::task::JoinError) -> OverlayError {
    OverlayError::Batch(format!("spawn_blocking failed in {what}: {e}"))
}

async fn process_image(state: AppState, job: ImageJob) -> Result<RunSummary, OverlayError> {
    let mut summary = RunSummary {
        images: 1,
        ..RunSummary::default()
    };
    let blocks = load_blocks(&state, &job).await;
    if blocks.is_empty() {
        warn!(image = %job.image.display(), "No text blocks paired with image");
        return Ok(summary);
    }

    let image = match state.cache.read_or_load(&job.image).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(image = %job.image.display(), error = %e, "Skipping unreadable image");
            summary.skip_all(blocks.len());
            return Ok(summary);
        }
    };

    // CPU-bound: decode + grid scan.
    let located = {
        let surface = Arc::clone(&state.surface);
        let finder = state.insertion.finder;
        let image = image.clone();
        tokio::task::spawn_blocking(move || locate_text_region(surface.as_ref(), &image, &finder))
            .await
            .map_err(|e| join_failed("region search", e))?
    };
    let region = match located {
        Ok(Some(region)) => region,
        Ok(None) => {
            info!(image = %job.image.display(), "No empty region large enough for text, skipping");
            summary.skip_all(blocks.len());
            return Ok(summary);
        }
        Err(e) => {
            warn!(image = %job.image.display(), error = %e, "Skipping undecodable image");
            summary.skip_all(blocks.len());
            return Ok(summary);
        }
    };

    let mut set = JoinSet::new();
    for (index, block) in blocks.iter().enumerate() {
        let output = job.output_path(&state.config.output_dir, index + 1, state.compositor.format());
        set.spawn(render_block(state.clone(), image.clone(), region, block.paragraphs(), output));
    }
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(outcome)) => summary.record(outcome),
            Ok(Err(e)) => {
                set.abort_all();
                return Err(e);
            }
            Err(e) => {
                set.abort_all();
                return Err(OverlayError::Batch(format!("text block task failed: {e}")));
            }
        }
    }

    info!(
        image = %job.image.display(),
        written = summary.succeeded,
        skipped = summary.skipped,
        failed = summary.failed,
        "Image processed"
    );
    Ok(summary)
}

async fn render_block(
    state: AppState,
    image: Bytes,
    region: Region,
    paragraphs: Vec<Paragraph>,
    output: PathBuf,
) -> Result<BlockOutcome, OverlayError> {
    let rendered = tokio::task::spawn_blocking(move || {
        insert_text(
            &image,
            &region,
            &paragraphs,
            state.surface.as_ref(),
            &state.compositor,
            &state.insertion,
        )
    })
    .await
    .map_err(|e| join_failed("compositing", e))?;

    match rendered {
        Ok(InsertOutcome::Rendered { bytes, layout }) => match write_output(&output, &bytes).await {
            Ok(()) => {
                debug!(
                    output = %output.display(),
                    font_size = layout.plan.font_size,
                    lines = layout.line_count,
                    "Wrote output"
                );
                Ok(BlockOutcome::Written)
            }
            Err(e) => {
                warn!(output = %output.display(), error = %e, "Failed to write output");
                Ok(BlockOutcome::Failed)
            }
        },
        Ok(InsertOutcome::Empty) => {
            debug!(output = %output.display(), "Text block has no drawable text");
            Ok(BlockOutcome::Skipped)
        }
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(output = %output.display(), error = %e, "Text block failed");
            Ok(BlockOutcome::Failed)
        }
    }
}

async fn write_output(path: &Path, bytes: &[u8]) -> Result<(), OverlayError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
