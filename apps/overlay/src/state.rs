use std::sync::Arc;

use crate::config::Config;
use crate::pipeline::cache::ReadCache;
use crate::pipeline::insertion::InsertionOptions;
use crate::render::{Compositor, ImageSurface, RasterSurface};
use crate::text::{JsonWorkbookSource, RichTextSource};

/// Shared state for one run, cloned into every batch and text-block task.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Session-owned read cache for images and workbooks; cleared when the run ends.
    pub cache: Arc<ReadCache>,
    /// Pluggable raster backend. Default: `ImageSurface`.
    pub surface: Arc<dyn RasterSurface>,
    pub compositor: Arc<Compositor>,
    /// Pluggable rich-text loader. Default: `JsonWorkbookSource` over `cache`.
    pub source: Arc<dyn RichTextSource>,
    pub insertion: InsertionOptions,
}

impl AppState {
    /// Default backends; loads the system font database.
    pub fn from_config(config: Config) -> Self {
        let compositor = Compositor::new(config.text_style(), config.output_format);
        Self::with_compositor(config, compositor)
    }

    pub fn with_compositor(config: Config, compositor: Compositor) -> Self {
        let cache = Arc::new(ReadCache::new(config.cache_budget_bytes));
        AppState {
            source: Arc::new(JsonWorkbookSource::new(Arc::clone(&cache))),
            cache,
            surface: Arc::new(ImageSurface),
            compositor: Arc::new(compositor),
            insertion: InsertionOptions {
                alignment: config.vertical_align,
                ..InsertionOptions::default()
            },
            config,
        }
    }
}
