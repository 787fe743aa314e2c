//! Image reference extraction.
//!
//! Reads the DOM of a loaded, ready chapter page and yields the ordered
//! image source URLs found strictly inside the content container, excluding
//! anything nested under a comment section. DOM encounter order is
//! authoritative: the ordinal assigned here fixes the page order of the
//! output document.

use crate::browser::PageDriver;
use crate::config::RunConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Raster format implied by an image URL's path extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
    Unknown,
}

impl ImageKind {
    /// Classify a URL by the extension its path ends in.
    pub fn from_url(url: &str) -> Self {
        let path = path_of(url).to_ascii_lowercase();
        if path.ends_with(".jpg") || path.ends_with(".jpeg") {
            Self::Jpeg
        } else if path.ends_with(".png") {
            Self::Png
        } else if path.ends_with(".webp") {
            Self::Webp
        } else {
            Self::Unknown
        }
    }

    /// Cache file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Unknown => "bin",
        }
    }
}

impl std::fmt::Display for ImageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Jpeg => write!(f, "jpeg"),
            Self::Png => write!(f, "png"),
            Self::Webp => write!(f, "webp"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// The URL path, with query and fragment stripped.
fn path_of(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or(url)
            .to_string(),
    }
}

/// One image to acquire, in extraction order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// 1-based page order, preserved end-to-end into the document.
    pub ordinal: usize,
    pub url: String,
    pub kind: ImageKind,
}

/// Script collecting `src` attributes of images inside the content
/// container, skipping any image with an ancestor marked as a comment
/// section. The ancestor walk matters: comment widgets nest their avatars
/// several levels deep.
pub fn collection_script(content_selector: &str, comment_marker: &str) -> String {
    format!(
        "(() => {{ \
         const root = document.querySelector({content_selector:?}); \
         if (!root) return []; \
         return Array.from(root.querySelectorAll('img')).filter((img) => {{ \
           let el = img.parentElement; \
           while (el) {{ \
             if (el.getAttribute && el.getAttribute('name') === {comment_marker:?}) return false; \
             el = el.parentElement; \
           }} \
           return true; \
         }}).map((img) => img.src).filter((src) => !!src); \
         }})()"
    )
}

/// Keep only URLs whose path ends in a raster extension, numbering the
/// survivors with 1-based ordinals. Everything else is dropped silently.
pub fn filter_raster_refs(urls: Vec<String>) -> Vec<ImageRef> {
    urls.into_iter()
        .filter_map(|url| {
            let kind = ImageKind::from_url(&url);
            (kind != ImageKind::Unknown).then_some((url, kind))
        })
        .enumerate()
        .map(|(i, (url, kind))| ImageRef {
            ordinal: i + 1,
            url,
            kind,
        })
        .collect()
}

/// Extract the ordered image references of the current page.
///
/// A missing container yields an empty sequence, which the orchestrator
/// treats as "no images", not as an error.
pub async fn extract_image_refs(
    driver: &dyn PageDriver,
    cfg: &RunConfig,
) -> Result<Vec<ImageRef>> {
    let script = collection_script(&cfg.content_selector, &cfg.comment_marker);
    let value = driver
        .evaluate(&script)
        .await
        .context("image extraction script failed")?;

    let urls: Vec<String> = value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Ok(filter_raster_refs(urls))
}
