//! `quire discover <series-url>` — collect chapter links into chapters.txt.

use crate::browser::chromium::ChromiumBrowser;
use crate::browser::BrowserEngine;
use crate::chapters::ChapterListStore;
use crate::config::RunConfig;
use crate::discover;
use anyhow::{Context, Result};
use tracing::warn;

/// Run the discover command.
pub async fn run(series_url: &str) -> Result<()> {
    let cfg = RunConfig::default();

    let mut engine = ChromiumBrowser::launch()
        .await
        .context("failed to acquire a browser")?;

    let result = async {
        let mut driver = engine.open_page().await?;
        Ok::<_, anyhow::Error>(
            discover::discover_chapter_links(driver.as_mut(), series_url, &cfg).await,
        )
    }
    .await;

    // The browser is released on every exit path.
    if let Err(e) = engine.shutdown().await {
        warn!("browser shutdown failed: {e:#}");
    }

    let links = result?;
    if links.is_empty() {
        // A transient failure must not wipe an existing work queue.
        println!("No chapter links found at {series_url}; nothing saved.");
        return Ok(());
    }

    let store = ChapterListStore::new(&cfg.chapter_list_path);
    store.save(&links)?;
    println!(
        "Saved {} chapter links to {}",
        links.len(),
        store.path().display()
    );
    Ok(())
}
