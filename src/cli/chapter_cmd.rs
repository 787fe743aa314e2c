//! `quire chapter <url>` — acquire a single chapter page.

use crate::browser::chromium::ChromiumBrowser;
use crate::browser::BrowserEngine;
use crate::config::RunConfig;
use crate::pipeline::download::{HttpImageFetcher, ImageFetcher};
use crate::pipeline::{self, JobStatus, RunContext};
use crate::progress;
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::warn;

/// Run the single-chapter command.
pub async fn run(url: &str, quiet: bool) -> Result<()> {
    let cfg = RunConfig::default();

    std::fs::create_dir_all(&cfg.images_root)
        .with_context(|| format!("failed to create {}", cfg.images_root.display()))?;
    std::fs::create_dir_all(&cfg.documents_root)
        .with_context(|| format!("failed to create {}", cfg.documents_root.display()))?;

    let mut engine = ChromiumBrowser::launch()
        .await
        .context("failed to acquire a browser")?;

    let result = run_inner(&engine, cfg, url, quiet).await;

    if let Err(e) = engine.shutdown().await {
        warn!("browser shutdown failed: {e:#}");
    }
    result
}

async fn run_inner(engine: &ChromiumBrowser, cfg: RunConfig, url: &str, quiet: bool) -> Result<()> {
    let driver = engine.open_page().await?;
    let fetcher: Arc<dyn ImageFetcher> = Arc::new(HttpImageFetcher::new(cfg.fetch_timeout_ms));

    let (tx, rx) = progress::channel();
    let printer = (!quiet).then(|| super::spawn_printer(rx));

    let mut ctx = RunContext::new(driver, fetcher, cfg, Some(tx));
    let job = pipeline::process_chapter(&mut ctx, 1, url).await;

    drop(ctx);
    if let Some(handle) = printer {
        let _ = handle.await;
    }

    match job.status {
        JobStatus::Succeeded => Ok(()),
        JobStatus::SkippedNoImages => {
            println!("No images found at {url}; no document written.");
            Ok(())
        }
        _ => bail!("chapter acquisition failed after {} attempts", job.attempts),
    }
}
