//! Pipeline error taxonomy.
//!
//! Each variant carries enough context to locate the failing item (chapter
//! URL, image URL, page ordinal). Containment is decided by the orchestrator:
//! `Download`, `InvalidImageFormat`, and `Embedding` are absorbed at the
//! single-image level; `Navigation` and `ReadinessTimeout` burn one chapter
//! attempt; `AssemblyIo` fails the chapter outright.

use crate::pipeline::extract::ImageKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The chapter page failed to load.
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// The image container never became non-empty within the bounded wait.
    #[error("page content did not appear within {waited_ms}ms")]
    ReadinessTimeout { waited_ms: u64 },

    /// An image fetch returned a non-success status or a transport error.
    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    /// The payload does not start with the declared format's signature.
    #[error("{url}: payload does not match the {expected} signature")]
    InvalidImageFormat { url: String, expected: ImageKind },

    /// One image could not be transcoded or placed on a page.
    #[error("embedding page {ordinal} failed: {reason}")]
    Embedding { ordinal: usize, reason: String },

    /// The finished document could not be written.
    #[error("writing {} failed", .path.display())]
    AssemblyIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
