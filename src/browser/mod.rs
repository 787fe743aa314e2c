//! Browser abstraction for driving chapter pages.
//!
//! Defines the `BrowserEngine` and `PageDriver` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide). The pipeline
//! only ever sees these traits, so tests drive it with fakes.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;

/// A browser engine that can open pages.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Open a new page (tab).
    async fn open_page(&self) -> Result<Box<dyn PageDriver>>;
    /// Shut down the browser engine and release the underlying process.
    async fn shutdown(&mut self) -> Result<()>;
}

/// A single browser page. One page is reused for the whole run; navigation
/// replaces whatever the previous chapter left behind.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to a URL and wait for the load event, bounded by `timeout_ms`.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<()>;
    /// Evaluate a script expression in the page and return its JSON value.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;
    /// Read the current document title.
    async fn title(&self) -> Result<String>;
}
