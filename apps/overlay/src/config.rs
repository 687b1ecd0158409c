use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::layout::VerticalAlignment;
use crate::pipeline::cache::DEFAULT_CACHE_BUDGET_BYTES;
use crate::render::{OutputFormat, TextStyle};
use crate::text::model::is_hex_color;

/// Run configuration loaded from environment variables (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub images_dir: PathBuf,
    pub workbooks_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Images processed concurrently per batch.
    pub batch_size: usize,
    pub cache_budget_bytes: usize,
    pub output_format: OutputFormat,
    pub font_family: String,
    pub text_color: String,
    /// `None` lets the optimizer classify content.
    pub vertical_align: Option<VerticalAlignment>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key → value lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key).with_context(|| format!("Required environment variable '{key}' is not set"))
        };
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let batch_size = or_default("OVERLAY_BATCH_SIZE", "4")
            .parse::<usize>()
            .context("OVERLAY_BATCH_SIZE must be a positive integer")?;
        if batch_size == 0 {
            bail!("OVERLAY_BATCH_SIZE must be at least 1");
        }

        let jpeg_quality = or_default("OVERLAY_JPEG_QUALITY", "90")
            .parse::<u8>()
            .context("OVERLAY_JPEG_QUALITY must be an integer between 1 and 100")?;
        let output_format = OutputFormat::parse_with_quality(&or_default("OVERLAY_OUTPUT_FORMAT", "jpeg"), jpeg_quality)
            .map_err(anyhow::Error::msg)
            .context("OVERLAY_OUTPUT_FORMAT must be 'jpeg' or 'png'")?;

        let text_color = or_default("OVERLAY_TEXT_COLOR", "#000000").to_uppercase();
        if !is_hex_color(&text_color) {
            bail!("OVERLAY_TEXT_COLOR must be a #RRGGBB color, got '{text_color}'");
        }

        let vertical_align = match or_default("OVERLAY_VERTICAL_ALIGN", "auto").to_lowercase().as_str() {
            "auto" | "" => None,
            other => Some(
                other
                    .parse::<VerticalAlignment>()
                    .map_err(anyhow::Error::msg)
                    .context("OVERLAY_VERTICAL_ALIGN must be auto, top, center or bottom")?,
            ),
        };

        Ok(Config {
            images_dir: PathBuf::from(require("OVERLAY_IMAGES_DIR")?),
            workbooks_dir: PathBuf::from(require("OVERLAY_WORKBOOKS_DIR")?),
            output_dir: PathBuf::from(or_default("OVERLAY_OUTPUT_DIR", "output")),
            batch_size,
            cache_budget_bytes: or_default("OVERLAY_CACHE_BUDGET_BYTES", &DEFAULT_CACHE_BUDGET_BYTES.to_string())
                .parse::<usize>()
                .context("OVERLAY_CACHE_BUDGET_BYTES must be a byte count")?,
            output_format,
            font_family: or_default("OVERLAY_FONT_FAMILY", "Arial, Helvetica, sans-serif"),
            text_color,
            vertical_align,
            rust_log: or_default("RUST_LOG", "info"),
        })
    }

    pub fn text_style(&self) -> TextStyle {
        TextStyle {
            font_family: self.font_family.clone(),
            default_color: self.text_color.clone(),
        }
    }
}
