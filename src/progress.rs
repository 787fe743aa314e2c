// Copyright 2026 Quire Contributors
// SPDX-License-Identifier: Apache-2.0

//! Run progress events and broadcast channel.
//!
//! The pipeline emits [`RunEvent`]s through a `tokio::sync::broadcast`
//! channel; the CLI subscribes and prints. When no subscriber exists, events
//! are silently dropped. The channel is strictly observational; nothing
//! downstream may consume it.

use serde::{Deserialize, Serialize};

/// A progress event emitted while a run is executing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    /// A chapter attempt has begun (attempt is 1-based).
    ChapterStarted {
        index: usize,
        url: String,
        attempt: u32,
    },
    /// Extraction finished; `count` images will be acquired.
    ImagesFound { index: usize, count: usize },
    /// One page image was downloaded and cached.
    ImageFetched {
        index: usize,
        ordinal: usize,
        bytes: usize,
    },
    /// One page image was dropped (download, validation, or embed failure).
    ImageSkipped {
        index: usize,
        ordinal: usize,
        url: String,
        reason: String,
    },
    /// The chapter's document was serialized and persisted.
    DocumentWritten {
        index: usize,
        path: String,
        pages: usize,
    },
    /// The chapter reached a terminal state.
    ChapterFinished {
        index: usize,
        status: String,
        pages_embedded: usize,
    },
}

/// Sender handle for emitting progress events.
pub type ProgressSender = tokio::sync::broadcast::Sender<RunEvent>;

/// Receiver handle for consuming progress events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<RunEvent>;

/// Create a new progress broadcast channel with a bounded buffer.
///
/// 256 events covers a chapter's worth of per-image traffic with room to
/// spare; a lagging printer drops the oldest events rather than blocking the
/// pipeline.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(256)
}
