//! Image acquisition.
//!
//! Fetches one image URL at a time and writes it into the chapter's cache
//! directory. JPEG and PNG payloads are signature-checked before anything
//! touches disk; a mismatch means the server returned an error page or a
//! placeholder, not an image.

use crate::error::PipelineError;
use crate::pipeline::extract::{ImageKind, ImageRef};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// JPEG SOI marker.
pub const JPEG_MAGIC: [u8; 2] = [0xFF, 0xD8];
/// PNG file signature.
pub const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Whether `bytes` starts with the signature of `kind`.
///
/// Returns `None` for formats without an applicable check (WebP container
/// variants make the prefix ambiguous; corruption there surfaces at
/// transcode time instead).
pub fn signature_matches(kind: ImageKind, bytes: &[u8]) -> Option<bool> {
    match kind {
        ImageKind::Jpeg => Some(bytes.starts_with(&JPEG_MAGIC)),
        ImageKind::Png => Some(bytes.starts_with(&PNG_MAGIC)),
        ImageKind::Webp | ImageKind::Unknown => None,
    }
}

/// A downloaded image sitting in the chapter cache.
#[derive(Debug, Clone)]
pub struct LocalImageFile {
    pub image: ImageRef,
    pub path: PathBuf,
    pub byte_length: usize,
    /// True only when the payload matched the declared format's signature.
    pub validated: bool,
}

/// Fetches raw image bytes. The pipeline only sees this trait, so tests can
/// serve images from memory.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch one URL; non-success statuses and transport failures are
    /// [`PipelineError::Download`].
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PipelineError>;
}

/// `reqwest`-backed fetcher presenting the same desktop-Chrome user agent as
/// the rendering engine.
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(timeout_ms: u64) -> Self {
        let ua = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                  AppleWebKit/537.36 (KHTML, like Gecko) \
                  Chrome/131.0.0.0 Safari/537.36";

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(ua)
            .build()
            .unwrap_or_default();

        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PipelineError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::Download {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Download {
                url: url.to_string(),
                reason: format!("status {status}"),
            });
        }

        let bytes = response.bytes().await.map_err(|e| PipelineError::Download {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

/// Download one image into `chapter_dir` as `page_<ordinal>.<ext>`.
///
/// Nothing is written when the signature check fails. Failed ordinals leave
/// gaps in the cache numbering; the document simply lacks those pages.
pub async fn acquire(
    fetcher: &dyn ImageFetcher,
    image: &ImageRef,
    chapter_dir: &Path,
) -> Result<LocalImageFile, PipelineError> {
    let payload = fetcher.fetch(&image.url).await?;

    let validated = match signature_matches(image.kind, &payload) {
        Some(false) => {
            return Err(PipelineError::InvalidImageFormat {
                url: image.url.clone(),
                expected: image.kind,
            })
        }
        Some(true) => true,
        None => false,
    };

    let path = chapter_dir.join(format!("page_{}.{}", image.ordinal, image.kind.extension()));
    std::fs::write(&path, &payload).map_err(|e| PipelineError::Download {
        url: image.url.clone(),
        reason: format!("write to {} failed: {e}", path.display()),
    })?;

    Ok(LocalImageFile {
        image: image.clone(),
        path,
        byte_length: payload.len(),
        validated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jpeg_signature() {
        assert_eq!(
            signature_matches(ImageKind::Jpeg, &[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(true)
        );
        assert_eq!(
            signature_matches(ImageKind::Jpeg, b"<html>not an image</html>"),
            Some(false)
        );
        assert_eq!(signature_matches(ImageKind::Jpeg, &[]), Some(false));
    }

    #[test]
    fn test_png_signature() {
        let mut good = PNG_MAGIC.to_vec();
        good.extend_from_slice(&[0x00; 16]);
        assert_eq!(signature_matches(ImageKind::Png, &good), Some(true));
        assert_eq!(
            signature_matches(ImageKind::Png, &JPEG_MAGIC),
            Some(false)
        );
    }

    #[test]
    fn test_webp_has_no_applicable_check() {
        assert_eq!(signature_matches(ImageKind::Webp, b"RIFF....WEBP"), None);
        assert_eq!(signature_matches(ImageKind::Unknown, &[]), None);
    }
}
