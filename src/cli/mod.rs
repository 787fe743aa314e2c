//! CLI subcommand implementations for the quire binary.

pub mod chapter_cmd;
pub mod discover_cmd;
pub mod run_cmd;

use crate::progress::{ProgressReceiver, RunEvent};
use tokio::sync::broadcast::error::RecvError;

/// Subscribe to the run's progress events and print them to stdout until the
/// channel closes.
pub(crate) fn spawn_printer(mut rx: ProgressReceiver) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn print_event(event: &RunEvent) {
    match event {
        RunEvent::ChapterStarted {
            index,
            url,
            attempt,
        } => {
            if *attempt == 1 {
                println!("\nProcessing chapter {index}: {url}");
            } else {
                println!("  retrying chapter {index} (attempt {attempt})");
            }
        }
        RunEvent::ImagesFound { count, .. } => println!("  found {count} images"),
        RunEvent::ImageFetched { ordinal, bytes, .. } => {
            println!("  page {ordinal} downloaded ({bytes} bytes)")
        }
        RunEvent::ImageSkipped {
            ordinal, reason, ..
        } => println!("  page {ordinal} skipped: {reason}"),
        RunEvent::DocumentWritten { path, pages, .. } => {
            println!("  PDF saved to {path} ({pages} pages)")
        }
        RunEvent::ChapterFinished { index, status, .. } => {
            println!("  chapter {index}: {status}")
        }
    }
}
