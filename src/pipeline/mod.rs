//! Chapter acquisition pipeline.
//!
//! The orchestrator walks the chapter list strictly in order, one chapter at
//! a time, wrapping each in a bounded-retry state machine:
//!
//! ```text
//! Pending → InProgress → { Succeeded | SkippedNoImages | Failed }
//! ```
//!
//! Navigation, readiness, and extraction errors burn one attempt (two
//! total). Zero extracted images skips the chapter immediately, without
//! retry. Once images are found, per-image download/validation/embed
//! failures are contained and the chapter still succeeds; only a failure to
//! write the finished document fails it. No chapter's terminal state aborts
//! the batch.

pub mod assemble;
pub mod download;
pub mod extract;
pub mod readiness;

use crate::browser::PageDriver;
use crate::config::RunConfig;
use crate::error::PipelineError;
use crate::naming;
use crate::progress::{ProgressSender, RunEvent};
use anyhow::{Context, Result};
use assemble::DocumentAssembler;
use download::ImageFetcher;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Terminal and transient states of one chapter's acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    InProgress,
    Succeeded,
    SkippedNoImages,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in progress"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::SkippedNoImages => write!(f, "skipped (no images)"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One chapter's processing record, owned by the orchestrator.
#[derive(Debug, Clone)]
pub struct ChapterJob {
    /// 1-based position in the chapter list.
    pub index: usize,
    pub url: String,
    /// Attempts consumed, including the one in flight.
    pub attempts: u32,
    pub status: JobStatus,
    /// Images the extractor reported on the successful attempt.
    pub images_found: usize,
    /// Pages that made it into the persisted document.
    pub pages_embedded: usize,
    /// Where the document was written, when one was.
    pub document: Option<PathBuf>,
}

impl ChapterJob {
    fn new(index: usize, url: &str) -> Self {
        Self {
            index,
            url: url.to_string(),
            attempts: 0,
            status: JobStatus::Pending,
            images_found: 0,
            pages_embedded: 0,
            document: None,
        }
    }
}

/// What one chapter attempt produced.
enum AttemptOutcome {
    /// Ran to completion; the document may have been withheld when every
    /// image failed.
    Completed {
        images_found: usize,
        pages_embedded: usize,
        document: Option<PathBuf>,
    },
    /// Extraction found nothing; skip without retry.
    NoImages,
    /// The finished document could not be written; fail without retry.
    AssemblyFailed(PipelineError),
}

/// Everything the pipeline stages share: the reused browser page, the image
/// fetcher, the configuration, and the progress sink.
pub struct RunContext {
    pub driver: Box<dyn PageDriver>,
    pub fetcher: Arc<dyn ImageFetcher>,
    pub config: RunConfig,
    pub events: Option<ProgressSender>,
}

impl RunContext {
    pub fn new(
        driver: Box<dyn PageDriver>,
        fetcher: Arc<dyn ImageFetcher>,
        config: RunConfig,
        events: Option<ProgressSender>,
    ) -> Self {
        Self {
            driver,
            fetcher,
            config,
            events,
        }
    }

    fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

/// Process every chapter in list order. Never fails as a whole: each
/// chapter's fate is recorded in its returned job.
pub async fn run_batch(ctx: &mut RunContext, urls: &[String]) -> Vec<ChapterJob> {
    let mut jobs = Vec::with_capacity(urls.len());
    for (i, url) in urls.iter().enumerate() {
        jobs.push(process_chapter(ctx, i + 1, url).await);
    }

    let succeeded = jobs
        .iter()
        .filter(|j| j.status == JobStatus::Succeeded)
        .count();
    let skipped = jobs
        .iter()
        .filter(|j| j.status == JobStatus::SkippedNoImages)
        .count();
    let failed = jobs.iter().filter(|j| j.status == JobStatus::Failed).count();
    info!("run complete: {succeeded} succeeded, {skipped} skipped, {failed} failed");

    jobs
}

/// Drive one chapter through the retry state machine to a terminal state.
pub async fn process_chapter(ctx: &mut RunContext, index: usize, url: &str) -> ChapterJob {
    let mut job = ChapterJob::new(index, url);
    job.status = JobStatus::InProgress;

    while job.attempts < ctx.config.max_attempts {
        job.attempts += 1;
        ctx.emit(RunEvent::ChapterStarted {
            index,
            url: url.to_string(),
            attempt: job.attempts,
        });

        match attempt_chapter(ctx, &job).await {
            Ok(AttemptOutcome::Completed {
                images_found,
                pages_embedded,
                document,
            }) => {
                job.images_found = images_found;
                job.pages_embedded = pages_embedded;
                job.document = document;
                job.status = JobStatus::Succeeded;
                info!(
                    "chapter {index} succeeded: {pages_embedded}/{images_found} pages embedded"
                );
                break;
            }
            Ok(AttemptOutcome::NoImages) => {
                job.status = JobStatus::SkippedNoImages;
                warn!("chapter {index} ({url}) has no images, skipping");
                break;
            }
            Ok(AttemptOutcome::AssemblyFailed(e)) => {
                job.status = JobStatus::Failed;
                warn!("chapter {index} ({url}) failed: {e}");
                break;
            }
            Err(e) => {
                if job.attempts < ctx.config.max_attempts {
                    warn!(
                        "chapter {index} ({url}) attempt {} failed, retrying: {e:#}",
                        job.attempts
                    );
                } else {
                    job.status = JobStatus::Failed;
                    warn!(
                        "chapter {index} ({url}) failed after {} attempts: {e:#}",
                        job.attempts
                    );
                }
            }
        }
    }

    ctx.emit(RunEvent::ChapterFinished {
        index,
        status: job.status.to_string(),
        pages_embedded: job.pages_embedded,
    });
    job
}

/// One full pass over a chapter: navigate, wait for readiness, extract,
/// acquire and embed each image, persist.
///
/// An `Err` here means the attempt is retryable; outcomes that must not be
/// retried come back as `Ok` variants.
async fn attempt_chapter(ctx: &mut RunContext, job: &ChapterJob) -> Result<AttemptOutcome> {
    let index = job.index;

    ctx.driver
        .navigate(&job.url, ctx.config.navigation_timeout_ms)
        .await
        .map_err(|e| PipelineError::Navigation {
            url: job.url.clone(),
            reason: format!("{e:#}"),
        })?;

    readiness::scroll_to_bottom(ctx.driver.as_ref(), &ctx.config.gate).await?;
    readiness::wait_for_images(
        ctx.driver.as_ref(),
        &ctx.config.content_selector,
        &ctx.config.gate,
    )
    .await?;

    let refs = extract::extract_image_refs(ctx.driver.as_ref(), &ctx.config).await?;
    ctx.emit(RunEvent::ImagesFound {
        index,
        count: refs.len(),
    });
    if refs.is_empty() {
        return Ok(AttemptOutcome::NoImages);
    }
    info!("chapter {index}: {} images found", refs.len());

    let title = ctx.driver.title().await.unwrap_or_default();
    let label = naming::chapter_label(&title, index);

    let chapter_dir = ctx.config.images_root.join(&label);
    std::fs::create_dir_all(&chapter_dir)
        .with_context(|| format!("failed to create {}", chapter_dir.display()))?;

    let images_found = refs.len();
    let mut assembler = DocumentAssembler::new(&label);
    for image in &refs {
        let local = match download::acquire(ctx.fetcher.as_ref(), image, &chapter_dir).await {
            Ok(local) => local,
            Err(e) => {
                warn!(
                    "chapter {index} page {} ({}) dropped: {e}",
                    image.ordinal, image.url
                );
                ctx.emit(RunEvent::ImageSkipped {
                    index,
                    ordinal: image.ordinal,
                    url: image.url.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        ctx.emit(RunEvent::ImageFetched {
            index,
            ordinal: image.ordinal,
            bytes: local.byte_length,
        });

        if let Err(e) = assembler.append_page(&local) {
            warn!("chapter {index} page {} dropped: {e}", image.ordinal);
            ctx.emit(RunEvent::ImageSkipped {
                index,
                ordinal: image.ordinal,
                url: image.url.clone(),
                reason: e.to_string(),
            });
        }
    }

    let pages_embedded = assembler.page_count();
    let document_path = ctx.config.documents_root.join(format!("{label}.pdf"));
    match assembler.finish(&document_path) {
        Ok(Some(path)) => {
            ctx.emit(RunEvent::DocumentWritten {
                index,
                path: path.display().to_string(),
                pages: pages_embedded,
            });
            Ok(AttemptOutcome::Completed {
                images_found,
                pages_embedded,
                document: Some(path),
            })
        }
        Ok(None) => {
            warn!("chapter {index}: every image failed, document withheld");
            Ok(AttemptOutcome::Completed {
                images_found,
                pages_embedded: 0,
                document: None,
            })
        }
        Err(e) => Ok(AttemptOutcome::AssemblyFailed(e)),
    }
}
