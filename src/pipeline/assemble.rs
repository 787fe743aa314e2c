//! Incremental per-chapter document assembly.
//!
//! One PDF per chapter, one page per image, each page sized to its image's
//! pixel dimensions with the image drawn at the origin at native size. JPEG
//! and PNG embed directly; WebP is transcoded to PNG in memory first. The
//! document is serialized once, after the last image.

use crate::error::PipelineError;
use crate::pipeline::download::LocalImageFile;
use crate::pipeline::extract::ImageKind;
use anyhow::{anyhow, Context, Result};
use printpdf::{Image, ImageTransform, Mm, PdfDocument, PdfDocumentReference};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Builds one chapter's document, page by page.
pub struct DocumentAssembler {
    doc: PdfDocumentReference,
    pages: usize,
}

impl DocumentAssembler {
    pub fn new(title: &str) -> Self {
        Self {
            doc: PdfDocument::empty(title),
            pages: 0,
        }
    }

    /// Pages added so far.
    pub fn page_count(&self) -> usize {
        self.pages
    }

    /// Add one page holding `local` at its native size.
    ///
    /// Failures are per-image: the caller logs and moves on, pages already
    /// added are unaffected.
    pub fn append_page(&mut self, local: &LocalImageFile) -> Result<(), PipelineError> {
        let ordinal = local.image.ordinal;
        self.try_append(local)
            .map_err(|e| PipelineError::Embedding {
                ordinal,
                reason: format!("{e:#}"),
            })
    }

    fn try_append(&mut self, local: &LocalImageFile) -> Result<()> {
        let bytes = std::fs::read(&local.path)
            .with_context(|| format!("failed to read {}", local.path.display()))?;
        let pdf_image = embeddable_image(local.image.kind, &bytes)?;

        // Page size and draw share one dpi, so the image fills the page exactly.
        let dpi = 96.0;
        let width = Mm::from(pdf_image.image.width.into_pt(dpi));
        let height = Mm::from(pdf_image.image.height.into_pt(dpi));

        let (page, layer) =
            self.doc
                .add_page(width, height, format!("page {}", local.image.ordinal));
        pdf_image.add_to_layer(
            self.doc.get_page(page).get_layer(layer),
            ImageTransform {
                dpi: Some(dpi),
                ..Default::default()
            },
        );
        self.pages += 1;
        Ok(())
    }

    /// Serialize and persist the document.
    ///
    /// A document with zero pages is withheld rather than written; an empty
    /// document is never persisted.
    pub fn finish(self, path: &Path) -> Result<Option<PathBuf>, PipelineError> {
        if self.pages == 0 {
            return Ok(None);
        }
        let bytes = self
            .doc
            .save_to_bytes()
            .map_err(|e| PipelineError::AssemblyIo {
                path: path.to_path_buf(),
                source: std::io::Error::other(e.to_string()),
            })?;
        std::fs::write(path, bytes).map_err(|e| PipelineError::AssemblyIo {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Some(path.to_path_buf()))
    }
}

/// Decode `bytes` into a PDF-embeddable image, transcoding when the native
/// format has no direct embedding.
fn embeddable_image(kind: ImageKind, bytes: &[u8]) -> Result<Image> {
    match kind {
        ImageKind::Jpeg => {
            let decoder = image::codecs::jpeg::JpegDecoder::new(Cursor::new(bytes))
                .context("jpeg decode failed")?;
            Image::try_from(decoder).map_err(|e| anyhow!("jpeg embed failed: {e}"))
        }
        ImageKind::Png => png_image(bytes),
        ImageKind::Webp => {
            let png = webp_to_png(bytes)?;
            png_image(&png)
        }
        ImageKind::Unknown => Err(anyhow!("format has no embeddable representation")),
    }
}

fn png_image(bytes: &[u8]) -> Result<Image> {
    let decoder = image::codecs::png::PngDecoder::new(Cursor::new(bytes))
        .context("png decode failed")?;
    Image::try_from(decoder).map_err(|e| anyhow!("png embed failed: {e}"))
}

/// Re-encode a WebP payload as PNG, preserving pixel content.
pub fn webp_to_png(bytes: &[u8]) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory_with_format(bytes, image::ImageFormat::WebP)
        .context("webp decode failed")?;
    let mut out = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut out), image::ImageOutputFormat::Png)
        .context("png encode failed")?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::download::PNG_MAGIC;
    use crate::pipeline::extract::ImageRef;
    use image::{DynamicImage, Rgb, RgbImage};
    use tempfile::TempDir;

    fn solid_image(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([120, 10, 200])))
    }

    fn jpeg_bytes(w: u32, h: u32) -> Vec<u8> {
        let mut out = Vec::new();
        solid_image(w, h)
            .write_to(&mut Cursor::new(&mut out), image::ImageOutputFormat::Jpeg(90))
            .unwrap();
        out
    }

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let mut out = Vec::new();
        solid_image(w, h)
            .write_to(&mut Cursor::new(&mut out), image::ImageOutputFormat::Png)
            .unwrap();
        out
    }

    fn webp_bytes(w: u32, h: u32) -> Vec<u8> {
        let rgb = solid_image(w, h).to_rgb8();
        let mut out = Vec::new();
        image::codecs::webp::WebPEncoder::new_lossless(&mut out)
            .encode(rgb.as_raw(), w, h, image::ColorType::Rgb8)
            .unwrap();
        out
    }

    fn cached(dir: &Path, ordinal: usize, kind: ImageKind, bytes: &[u8]) -> LocalImageFile {
        let path = dir.join(format!("page_{}.{}", ordinal, kind.extension()));
        std::fs::write(&path, bytes).unwrap();
        LocalImageFile {
            image: ImageRef {
                ordinal,
                url: format!("https://c.ex/{ordinal}.{}", kind.extension()),
                kind,
            },
            path,
            byte_length: bytes.len(),
            validated: kind != ImageKind::Webp,
        }
    }

    #[test]
    fn test_one_page_per_image_across_formats() {
        let dir = TempDir::new().unwrap();
        let mut assembler = DocumentAssembler::new("chapter_1");
        assembler
            .append_page(&cached(dir.path(), 1, ImageKind::Jpeg, &jpeg_bytes(12, 8)))
            .unwrap();
        assembler
            .append_page(&cached(dir.path(), 2, ImageKind::Webp, &webp_bytes(16, 8)))
            .unwrap();
        assembler
            .append_page(&cached(dir.path(), 3, ImageKind::Png, &png_bytes(20, 8)))
            .unwrap();
        assert_eq!(assembler.page_count(), 3);

        let out = dir.path().join("chapter_1.pdf");
        let written = assembler.finish(&out).unwrap();
        assert_eq!(written.as_deref(), Some(out.as_path()));

        let bytes = std::fs::read(&out).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_webp_transcode_preserves_dimensions() {
        let png = webp_to_png(&webp_bytes(5, 4)).unwrap();
        assert!(png.starts_with(&PNG_MAGIC));
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (5, 4));
    }

    #[test]
    fn test_zero_page_document_is_not_persisted() {
        let dir = TempDir::new().unwrap();
        let assembler = DocumentAssembler::new("chapter_2");
        let out = dir.path().join("chapter_2.pdf");
        assert!(assembler.finish(&out).unwrap().is_none());
        assert!(!out.exists());
    }

    #[test]
    fn test_corrupt_payload_reports_the_ordinal() {
        let dir = TempDir::new().unwrap();
        let mut assembler = DocumentAssembler::new("chapter_3");
        let err = assembler
            .append_page(&cached(dir.path(), 7, ImageKind::Jpeg, b"not a jpeg"))
            .unwrap_err();
        match err {
            PipelineError::Embedding { ordinal, .. } => assert_eq!(ordinal, 7),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unwritable_target_is_an_assembly_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file, not a directory").unwrap();

        let mut assembler = DocumentAssembler::new("chapter_4");
        assembler
            .append_page(&cached(dir.path(), 1, ImageKind::Png, &png_bytes(4, 4)))
            .unwrap();
        let err = assembler.finish(&blocker.join("out.pdf")).unwrap_err();
        assert!(matches!(err, PipelineError::AssemblyIo { .. }));
    }
}
