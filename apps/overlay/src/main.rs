mod config;
mod errors;
mod layout;
mod pipeline;
mod regions;
mod render;
mod state;
mod text;

use std::process::ExitCode;

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::pipeline::BatchSession;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting overlay v{}", env!("CARGO_PKG_VERSION"));
    info!(
        images = %config.images_dir.display(),
        workbooks = %config.workbooks_dir.display(),
        output = %config.output_dir.display(),
        format = ?config.output_format,
        "Configuration loaded"
    );

    let state = AppState::from_config(config);
    match BatchSession::new(state).run().await {
        Ok(summary) => {
            info!(
                succeeded = summary.succeeded,
                total = summary.total,
                skipped = summary.skipped,
                failed = summary.failed,
                images = summary.images,
                "Overlay run complete: {}/{} outputs written",
                summary.succeeded,
                summary.total
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(error = %e, fatal = e.is_fatal(), "Overlay run aborted");
            Ok(ExitCode::FAILURE)
        }
    }
}
