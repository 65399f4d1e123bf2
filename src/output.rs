//! Output types returned by conversion and metadata requests.

use crate::format::ImageFormat;
use crate::pipeline::command::Renderer;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One rendered page.
#[derive(Debug, Clone)]
pub enum PageImage {
    /// Decoded pixels.
    Decoded(DynamicImage),
    /// Path of the file the renderer wrote (`paths_only` requests).
    Path(PathBuf),
}

impl PageImage {
    pub fn as_image(&self) -> Option<&DynamicImage> {
        match self {
            PageImage::Decoded(img) => Some(img),
            PageImage::Path(_) => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            PageImage::Decoded(_) => None,
            PageImage::Path(p) => Some(p),
        }
    }

    pub fn into_image(self) -> Option<DynamicImage> {
        match self {
            PageImage::Decoded(img) => Some(img),
            PageImage::Path(_) => None,
        }
    }
}

/// Result of a successful conversion: pages in document order.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub images: Vec<PageImage>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Summary of how a conversion was carried out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Page count reported by pdfinfo.
    pub total_pages: u32,
    /// Normalised first page rendered, `None` when nothing was selected.
    pub first_page: Option<u32>,
    /// Normalised last page rendered.
    pub last_page: Option<u32>,
    /// Number of images returned.
    pub rendered_pages: usize,
    /// Renderer processes spawned.
    pub workers: usize,
    pub renderer: Renderer,
    /// Format the renderer emitted.
    pub format: ImageFormat,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Document metadata as reported by `pdfinfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfInfo {
    /// The mandatory `Pages` field.
    pub page_count: u32,
    /// Every `key: value` line, keyed verbatim.
    pub fields: BTreeMap<String, String>,
}

impl PdfInfo {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn title(&self) -> Option<&str> {
        self.get("Title")
    }

    pub fn author(&self) -> Option<&str> {
        self.get("Author")
    }

    pub fn producer(&self) -> Option<&str> {
        self.get("Producer")
    }

    pub fn creator(&self) -> Option<&str> {
        self.get("Creator")
    }

    pub fn pdf_version(&self) -> Option<&str> {
        self.get("PDF version")
    }

    /// `Encrypted: yes (print:yes copy:no …)` counts as encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.get("Encrypted").is_some_and(|v| v.starts_with("yes"))
    }

    /// Page size in points, parsed from `612 x 792 pts (letter)`.
    pub fn page_size(&self) -> Option<(f64, f64)> {
        let value = self.get("Page size")?;
        let mut parts = value.split_whitespace();
        let width = parts.next()?.parse().ok()?;
        if parts.next()? != "x" {
            return None;
        }
        let height = parts.next()?.parse().ok()?;
        Some((width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(pairs: &[(&str, &str)]) -> PdfInfo {
        PdfInfo {
            page_count: 3,
            fields: pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    #[test]
    fn typed_accessors() {
        let i = info(&[
            ("Title", "Annual report"),
            ("Producer", "LibreOffice 7.3"),
            ("PDF version", "1.7"),
            ("Encrypted", "yes (print:yes copy:no change:no addNotes:no)"),
            ("Page size", "612 x 792 pts (letter)"),
        ]);
        assert_eq!(i.title(), Some("Annual report"));
        assert_eq!(i.producer(), Some("LibreOffice 7.3"));
        assert_eq!(i.author(), None);
        assert_eq!(i.pdf_version(), Some("1.7"));
        assert!(i.is_encrypted());
        assert_eq!(i.page_size(), Some((612.0, 792.0)));
    }

    #[test]
    fn fractional_page_size() {
        let i = info(&[("Page size", "595.276 x 841.89 pts (A4)"), ("Encrypted", "no")]);
        assert_eq!(i.page_size(), Some((595.276, 841.89)));
        assert!(!i.is_encrypted());
    }

    #[test]
    fn malformed_page_size() {
        assert_eq!(info(&[("Page size", "letter")]).page_size(), None);
        assert_eq!(info(&[]).page_size(), None);
    }

    #[test]
    fn stats_serialise_with_lowercase_names() {
        let stats = ConversionStats {
            total_pages: 14,
            first_page: Some(1),
            last_page: Some(14),
            rendered_pages: 14,
            workers: 4,
            renderer: Renderer::Pdftoppm,
            format: ImageFormat::Jpeg,
            render_duration_ms: 120,
            total_duration_ms: 150,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["renderer"], "pdftoppm");
        assert_eq!(json["format"], "jpeg");
        assert_eq!(json["workers"], 4);
    }

    #[test]
    fn info_serialises_fields() {
        let json = serde_json::to_string(&info(&[("Title", "x")])).unwrap();
        assert!(json.contains("\"page_count\":3"));
        assert!(json.contains("\"Title\":\"x\""));
    }

    #[test]
    fn page_image_accessors() {
        let p = PageImage::Path(PathBuf::from("/out/a-1.png"));
        assert_eq!(p.as_path(), Some(Path::new("/out/a-1.png")));
        assert!(p.as_image().is_none());

        let d = PageImage::Decoded(DynamicImage::new_rgb8(2, 3));
        assert!(d.as_path().is_none());
        assert_eq!(d.into_image().map(|i| (i.width(), i.height())), Some((2, 3)));
    }
}
