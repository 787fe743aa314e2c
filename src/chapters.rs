//! The persisted chapter work queue.
//!
//! `chapters.txt` is the sole handoff between discovery and acquisition:
//! UTF-8, one URL per line, blank lines ignored, order significant.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Loads and saves the ordered chapter URL list.
pub struct ChapterListStore {
    path: PathBuf,
}

impl ChapterListStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the list, skipping blank lines. Line order is processing order.
    pub fn load(&self) -> Result<Vec<String>> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Write the list, one URL per line.
    pub fn save(&self, urls: &[String]) -> Result<()> {
        let mut body = urls.join("\n");
        body.push('\n');
        std::fs::write(&self.path, body)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}
