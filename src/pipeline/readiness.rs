//! Lazy-load readiness gate.
//!
//! Chapter pages load their images lazily as the viewport approaches them.
//! The gate scrolls the page to the bottom on a fixed schedule, waits a
//! settle delay for in-flight loads, then blocks until the image container
//! is populated or the bounded wait expires. The schedule has no early exit
//! when loading finishes sooner.

use crate::browser::PageDriver;
use crate::error::PipelineError;
use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tracing::debug;

/// Tuning for the readiness gate.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Pixels scrolled per tick.
    pub scroll_step_px: u32,
    /// Delay between scroll ticks.
    pub scroll_interval: Duration,
    /// Wait after the bottom is reached, letting in-flight loads finish.
    pub settle_delay: Duration,
    /// Hard cap on the whole scroll phase; pages that keep growing (infinite
    /// scroll, busted height reporting) proceed to the container wait anyway.
    pub scroll_budget: Duration,
    /// Bounded wait for the image container to become non-empty.
    pub container_timeout: Duration,
    /// Delay between container polls.
    pub container_poll_interval: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            scroll_step_px: 200,
            scroll_interval: Duration::from_millis(100),
            settle_delay: Duration::from_secs(2),
            scroll_budget: Duration::from_secs(20),
            container_timeout: Duration::from_secs(30),
            container_poll_interval: Duration::from_millis(250),
        }
    }
}

fn scroll_script(step_px: u32) -> String {
    format!("(() => {{ window.scrollBy(0, {step_px}); return document.body.scrollHeight; }})()")
}

fn image_count_script(content_selector: &str) -> String {
    format!(
        "(() => {{ const root = document.querySelector({content_selector:?}); \
         if (!root) return -1; \
         return root.querySelectorAll('img').length; }})()"
    )
}

/// Scroll the viewport downward one step per tick until the cumulative
/// distance covers the page's full scroll height, then settle.
///
/// The page starts in whatever scroll state the previous chapter left it;
/// a pre-scrolled position only makes the loop finish earlier, never skip
/// content.
pub async fn scroll_to_bottom(driver: &dyn PageDriver, gate: &GateConfig) -> Result<()> {
    let started = Instant::now();
    let mut scrolled: u64 = 0;
    loop {
        let value = driver
            .evaluate(&scroll_script(gate.scroll_step_px))
            .await
            .context("scroll step failed")?;
        let height = value.as_f64().unwrap_or(0.0).max(0.0) as u64;
        scrolled += u64::from(gate.scroll_step_px);
        if scrolled >= height {
            break;
        }
        if started.elapsed() >= gate.scroll_budget {
            debug!("scroll budget exhausted before reaching the page bottom");
            break;
        }
        tokio::time::sleep(gate.scroll_interval).await;
    }
    tokio::time::sleep(gate.settle_delay).await;
    Ok(())
}

/// Block until the content container holds at least one image, or fail with
/// [`PipelineError::ReadinessTimeout`] once the bounded wait expires.
///
/// A page with no container at all is treated as ready: the extractor will
/// report it as zero images, and the chapter is skipped rather than retried.
pub async fn wait_for_images(
    driver: &dyn PageDriver,
    content_selector: &str,
    gate: &GateConfig,
) -> Result<()> {
    let started = Instant::now();
    loop {
        let value = driver
            .evaluate(&image_count_script(content_selector))
            .await
            .context("image container probe failed")?;
        let count = value.as_i64().unwrap_or(0);
        if count != 0 {
            return Ok(());
        }
        if started.elapsed() >= gate.container_timeout {
            return Err(PipelineError::ReadinessTimeout {
                waited_ms: gate.container_timeout.as_millis() as u64,
            }
            .into());
        }
        tokio::time::sleep(gate.container_poll_interval).await;
    }
}
