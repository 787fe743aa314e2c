//! `quire run` — acquire every chapter listed in chapters.txt.

use crate::browser::chromium::ChromiumBrowser;
use crate::browser::BrowserEngine;
use crate::chapters::ChapterListStore;
use crate::config::RunConfig;
use crate::pipeline::download::{HttpImageFetcher, ImageFetcher};
use crate::pipeline::{self, JobStatus, RunContext};
use crate::progress;
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Run the batch acquisition command.
pub async fn run(quiet: bool) -> Result<()> {
    let cfg = RunConfig::default();

    let store = ChapterListStore::new(&cfg.chapter_list_path);
    let urls = store
        .load()
        .context("no chapter list found — run `quire discover <series-url>` first")?;
    if urls.is_empty() {
        bail!("chapter list {} is empty", store.path().display());
    }

    std::fs::create_dir_all(&cfg.images_root)
        .with_context(|| format!("failed to create {}", cfg.images_root.display()))?;
    std::fs::create_dir_all(&cfg.documents_root)
        .with_context(|| format!("failed to create {}", cfg.documents_root.display()))?;

    // Failure to acquire the browser is the one error fatal to the whole run.
    let mut engine = ChromiumBrowser::launch()
        .await
        .context("failed to acquire a browser")?;

    let result = run_inner(&engine, cfg, &urls, quiet).await;

    // The browser is released on every exit path, success or not.
    if let Err(e) = engine.shutdown().await {
        warn!("browser shutdown failed: {e:#}");
    }
    result
}

async fn run_inner(
    engine: &ChromiumBrowser,
    cfg: RunConfig,
    urls: &[String],
    quiet: bool,
) -> Result<()> {
    let driver = engine.open_page().await?;
    let fetcher: Arc<dyn ImageFetcher> = Arc::new(HttpImageFetcher::new(cfg.fetch_timeout_ms));

    let (tx, rx) = progress::channel();
    let printer = (!quiet).then(|| super::spawn_printer(rx));

    let mut ctx = RunContext::new(driver, fetcher, cfg, Some(tx));

    let jobs = tokio::select! {
        jobs = pipeline::run_batch(&mut ctx, urls) => Some(jobs),
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
            None
        }
    };

    // Dropping the context closes the event channel so the printer drains.
    drop(ctx);
    if let Some(handle) = printer {
        let _ = handle.await;
    }

    if let Some(jobs) = jobs {
        let succeeded = jobs
            .iter()
            .filter(|j| j.status == JobStatus::Succeeded)
            .count();
        let skipped = jobs
            .iter()
            .filter(|j| j.status == JobStatus::SkippedNoImages)
            .count();
        let failed = jobs.iter().filter(|j| j.status == JobStatus::Failed).count();
        println!("\nDone: {succeeded} succeeded, {skipped} skipped, {failed} failed.");
    }
    Ok(())
}
