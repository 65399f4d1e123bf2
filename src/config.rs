//! Configuration types for PDF-to-image conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across tasks, log them, and diff two runs to
//! understand why their outputs differ. Metadata-only requests use the much
//! smaller [`InfoOptions`].

use crate::error::Pdf2ImageError;
use crate::format::ImageFormat;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a PDF-to-image conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2image::{ConversionConfig, ImageFormat};
///
/// let config = ConversionConfig::builder()
///     .dpi(150)
///     .format(ImageFormat::Png)
///     .thread_count(4)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Rendering resolution in DPI. Default: 200.
    pub dpi: u32,

    /// Write pages into this directory instead of streaming them through
    /// stdout. Default: None (in-memory).
    pub output_folder: Option<PathBuf>,

    /// First page to render (1-based). `None` or 0 means page 1.
    pub first_page: Option<u32>,

    /// Last page to render (inclusive). `None` or past the end means the
    /// last page of the document.
    pub last_page: Option<u32>,

    /// Output image format. Default: [`ImageFormat::Ppm`].
    pub format: ImageFormat,

    /// JPEG encoder options; ignored for other formats.
    pub jpegopt: Option<JpegOptions>,

    /// Maximum number of renderer processes to run at once. Default: 1.
    ///
    /// Each process renders a contiguous span of pages, so four workers on a
    /// 100-page document each take 25 pages. More workers than pages is
    /// harmless; the count is clamped to the page span.
    pub thread_count: usize,

    /// User password for encrypted documents.
    pub userpw: Option<String>,

    /// Owner password for encrypted documents.
    pub ownerpw: Option<String>,

    /// Render the crop box instead of the media box.
    pub use_cropbox: bool,

    /// Fail the request when the renderer reports a PDF syntax error.
    pub strict: bool,

    /// Transparent page background (PNG/TIFF only; selects pdftocairo).
    pub transparent: bool,

    /// Render only `first_page` into a single file named after the tag.
    pub single_file: bool,

    /// How output files are named. Default: [`OutputFileNaming::Uuid`].
    pub output_file: OutputFileNaming,

    /// Directory holding the poppler binaries. Default: search `PATH`.
    pub poppler_path: Option<PathBuf>,

    /// Render in grayscale.
    pub grayscale: bool,

    /// Scale the output to a target size.
    pub size: Option<Size>,

    /// Return file paths instead of decoded images (needs `output_folder`).
    pub paths_only: bool,

    /// Force the cairo renderer.
    pub use_pdftocairo: bool,

    /// Abort the request if any poppler process runs longer than this.
    pub timeout: Option<Duration>,

    /// Do not render annotations (pdftoppm only).
    pub hide_annotations: bool,

    /// Receives worker-level progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            output_folder: None,
            first_page: None,
            last_page: None,
            format: ImageFormat::default(),
            jpegopt: None,
            thread_count: 1,
            userpw: None,
            ownerpw: None,
            use_cropbox: false,
            strict: false,
            transparent: false,
            single_file: false,
            output_file: OutputFileNaming::default(),
            poppler_path: None,
            grayscale: false,
            size: None,
            paths_only: false,
            use_pdftocairo: false,
            timeout: None,
            hide_annotations: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("dpi", &self.dpi)
            .field("output_folder", &self.output_folder)
            .field("first_page", &self.first_page)
            .field("last_page", &self.last_page)
            .field("format", &self.format)
            .field("jpegopt", &self.jpegopt)
            .field("thread_count", &self.thread_count)
            .field("userpw", &self.userpw.as_ref().map(|_| "<redacted>"))
            .field("ownerpw", &self.ownerpw.as_ref().map(|_| "<redacted>"))
            .field("use_cropbox", &self.use_cropbox)
            .field("strict", &self.strict)
            .field("transparent", &self.transparent)
            .field("single_file", &self.single_file)
            .field("output_file", &self.output_file)
            .field("poppler_path", &self.poppler_path)
            .field("grayscale", &self.grayscale)
            .field("size", &self.size)
            .field("paths_only", &self.paths_only)
            .field("use_pdftocairo", &self.use_pdftocairo)
            .field("timeout", &self.timeout)
            .field("hide_annotations", &self.hide_annotations)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn RenderProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Check constraints the field types cannot express.
    pub fn validate(&self) -> Result<(), Pdf2ImageError> {
        if self.dpi == 0 {
            return Err(Pdf2ImageError::InvalidConfig("DPI must be ≥ 1".into()));
        }
        if let Some(ref jpeg) = self.jpegopt {
            jpeg.validate()?;
        }
        if let Some(ref size) = self.size {
            size.validate()?;
        }
        if self.paths_only && self.output_folder.is_none() {
            return Err(Pdf2ImageError::InvalidConfig(
                "paths_only requires an output_folder".into(),
            ));
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(Pdf2ImageError::InvalidConfig(
                "Timeout must be greater than zero".into(),
            ));
        }
        if let OutputFileNaming::Fixed(ref name) = self.output_file {
            if name.is_empty() || name.contains(std::path::is_separator) {
                return Err(Pdf2ImageError::InvalidConfig(format!(
                    "Output file name '{name}' must be a non-empty file name"
                )));
            }
        }
        Ok(())
    }

    /// Options for the page-count probe that precedes rendering.
    pub fn info_options(&self) -> InfoOptions {
        InfoOptions {
            userpw: self.userpw.clone(),
            ownerpw: self.ownerpw.clone(),
            poppler_path: self.poppler_path.clone(),
            timeout: self.timeout,
            ..InfoOptions::default()
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn output_folder(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_folder = Some(dir.into());
        self
    }

    pub fn first_page(mut self, page: u32) -> Self {
        self.config.first_page = Some(page);
        self
    }

    pub fn last_page(mut self, page: u32) -> Self {
        self.config.last_page = Some(page);
        self
    }

    pub fn format(mut self, format: ImageFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn jpegopt(mut self, options: JpegOptions) -> Self {
        self.config.jpegopt = Some(options);
        self
    }

    pub fn thread_count(mut self, n: usize) -> Self {
        self.config.thread_count = n.max(1);
        self
    }

    pub fn userpw(mut self, pwd: impl Into<String>) -> Self {
        self.config.userpw = Some(pwd.into());
        self
    }

    pub fn ownerpw(mut self, pwd: impl Into<String>) -> Self {
        self.config.ownerpw = Some(pwd.into());
        self
    }

    pub fn use_cropbox(mut self, v: bool) -> Self {
        self.config.use_cropbox = v;
        self
    }

    pub fn strict(mut self, v: bool) -> Self {
        self.config.strict = v;
        self
    }

    pub fn transparent(mut self, v: bool) -> Self {
        self.config.transparent = v;
        self
    }

    pub fn single_file(mut self, v: bool) -> Self {
        self.config.single_file = v;
        self
    }

    pub fn output_file(mut self, naming: OutputFileNaming) -> Self {
        self.config.output_file = naming;
        self
    }

    pub fn poppler_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.poppler_path = Some(dir.into());
        self
    }

    pub fn grayscale(mut self, v: bool) -> Self {
        self.config.grayscale = v;
        self
    }

    pub fn size(mut self, size: Size) -> Self {
        self.config.size = Some(size);
        self
    }

    pub fn paths_only(mut self, v: bool) -> Self {
        self.config.paths_only = v;
        self
    }

    pub fn use_pdftocairo(mut self, v: bool) -> Self {
        self.config.use_pdftocairo = v;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn hide_annotations(mut self, v: bool) -> Self {
        self.config.hide_annotations = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2ImageError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Option types ─────────────────────────────────────────────────────────

/// JPEG encoder settings passed through `-jpegopt`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JpegOptions {
    /// Quality 0–100.
    pub quality: Option<u8>,
    pub progressive: Option<bool>,
    pub optimize: Option<bool>,
}

impl JpegOptions {
    /// Options with only a quality set.
    pub fn quality(quality: u8) -> Self {
        Self {
            quality: Some(quality),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), Pdf2ImageError> {
        match self.quality {
            Some(q) if q > 100 => Err(Pdf2ImageError::InvalidConfig(format!(
                "JPEG quality must be 0–100, got {q}"
            ))),
            _ => Ok(()),
        }
    }

    /// `true` when no key is set and the flag would be empty.
    pub fn is_empty(&self) -> bool {
        self.quality.is_none() && self.progressive.is_none() && self.optimize.is_none()
    }

    /// Comma-joined `key=value` list, booleans as `y`/`n`.
    pub fn to_arg(&self) -> String {
        let yn = |b: bool| if b { "y" } else { "n" };
        let mut parts = Vec::with_capacity(3);
        if let Some(q) = self.quality {
            parts.push(format!("quality={q}"));
        }
        if let Some(p) = self.progressive {
            parts.push(format!("progressive={}", yn(p)));
        }
        if let Some(o) = self.optimize {
            parts.push(format!("optimize={}", yn(o)));
        }
        parts.join(",")
    }
}

/// Target output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Size {
    /// Scale so the longest side is this many pixels.
    Scale(u32),
    /// Scale to explicit dimensions; `None` keeps the aspect ratio.
    Dimensions {
        width: Option<u32>,
        height: Option<u32>,
    },
}

impl Size {
    /// Parse one value (`1000`) or a width/height pair where either side may
    /// be `none` (`none 2400`).
    pub fn parse(parts: &[&str]) -> Result<Self, Pdf2ImageError> {
        let side = |s: &str| -> Result<Option<u32>, Pdf2ImageError> {
            let s = s.trim();
            if s.eq_ignore_ascii_case("none") {
                return Ok(None);
            }
            s.parse::<u32>().map(Some).map_err(|_| {
                Pdf2ImageError::InvalidConfig(format!("Size value '{s}' is not an integer or 'none'"))
            })
        };

        let size = match parts {
            [single] => match side(single)? {
                Some(n) => Size::Scale(n),
                None => {
                    return Err(Pdf2ImageError::InvalidConfig(
                        "A single size value must be an integer".into(),
                    ))
                }
            },
            [w, h] => Size::Dimensions {
                width: side(w)?,
                height: side(h)?,
            },
            _ => {
                return Err(Pdf2ImageError::InvalidConfig(format!(
                    "Size takes one value or a width/height pair, got {} values",
                    parts.len()
                )))
            }
        };
        size.validate()?;
        Ok(size)
    }

    fn validate(&self) -> Result<(), Pdf2ImageError> {
        match self {
            Size::Dimensions {
                width: None,
                height: None,
            } => Err(Pdf2ImageError::InvalidConfig(
                "Size needs at least one of width or height".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// How renderer output files are named.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFileNaming {
    /// A fresh v4 UUID per worker. Default.
    #[default]
    Uuid,
    /// `prefix` followed by a zero-padded counter starting at 1.
    ///
    /// The counter keeps increasing across every request that uses this
    /// value or a clone of it, and tags whose files already exist in the
    /// output folder are skipped.
    Counter {
        prefix: String,
        padding: usize,
        #[serde(skip)]
        cursor: CounterCursor,
    },
    /// A fixed name; suffixed with `_<worker>` when several workers run.
    Fixed(String),
}

impl OutputFileNaming {
    /// Counter naming with the usual four-digit padding.
    pub fn counter(prefix: impl Into<String>) -> Self {
        OutputFileNaming::Counter {
            prefix: prefix.into(),
            padding: 4,
            cursor: CounterCursor::default(),
        }
    }
}

/// Position of an [`OutputFileNaming::Counter`], shared by its clones.
///
/// Two cursors are equal when they share the same count.
#[derive(Debug, Clone, Default)]
pub struct CounterCursor(Arc<AtomicUsize>);

impl CounterCursor {
    /// Claim the next counter value, starting at 1.
    pub fn advance(&self) -> usize {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Number of values claimed so far.
    pub fn issued(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

impl PartialEq for CounterCursor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for CounterCursor {}

/// Options for a `pdfinfo` call.
#[derive(Debug, Clone, Default)]
pub struct InfoOptions {
    pub userpw: Option<String>,
    pub ownerpw: Option<String>,
    pub poppler_path: Option<PathBuf>,
    /// Print dates exactly as stored in the document.
    pub rawdates: bool,
    pub timeout: Option<Duration>,
    /// Restrict per-page fields to this span.
    pub first_page: Option<u32>,
    pub last_page: Option<u32>,
}

impl InfoOptions {
    pub fn userpw(mut self, pwd: impl Into<String>) -> Self {
        self.userpw = Some(pwd.into());
        self
    }

    pub fn ownerpw(mut self, pwd: impl Into<String>) -> Self {
        self.ownerpw = Some(pwd.into());
        self
    }

    pub fn poppler_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.poppler_path = Some(dir.into());
        self
    }

    pub fn rawdates(mut self, v: bool) -> Self {
        self.rawdates = v;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn pages(mut self, first: Option<u32>, last: Option<u32>) -> Self {
        self.first_page = first;
        self.last_page = last;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_poppler_conventions() {
        let c = ConversionConfig::default();
        assert_eq!(c.dpi, 200);
        assert_eq!(c.thread_count, 1);
        assert_eq!(c.format, ImageFormat::Ppm);
        assert_eq!(c.output_file, OutputFileNaming::Uuid);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn counter_clones_share_cursor() {
        let a = OutputFileNaming::counter("p");
        let b = a.clone();
        match (&a, &b) {
            (OutputFileNaming::Counter { cursor: ca, .. }, OutputFileNaming::Counter { cursor: cb, .. }) => {
                assert_eq!(ca.advance(), 1);
                assert_eq!(cb.advance(), 2);
                assert_eq!(ca.issued(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn builder_clamps_thread_count() {
        let c = ConversionConfig::builder().thread_count(0).build().unwrap();
        assert_eq!(c.thread_count, 1);
    }

    #[test]
    fn zero_dpi_rejected() {
        let err = ConversionConfig::builder().dpi(0).build().unwrap_err();
        assert!(matches!(err, Pdf2ImageError::InvalidConfig(_)));
    }

    #[test]
    fn paths_only_needs_folder() {
        assert!(ConversionConfig::builder().paths_only(true).build().is_err());
        assert!(ConversionConfig::builder()
            .paths_only(true)
            .output_folder("/tmp/out")
            .build()
            .is_ok());
    }

    #[test]
    fn zero_timeout_rejected() {
        assert!(ConversionConfig::builder()
            .timeout(Duration::ZERO)
            .build()
            .is_err());
    }

    #[test]
    fn fixed_name_must_be_a_file_name() {
        let err = ConversionConfig::builder()
            .output_file(OutputFileNaming::Fixed("a/b".into()))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("a/b"));
    }

    #[test]
    fn jpeg_options_arg() {
        let opts = JpegOptions {
            quality: Some(90),
            progressive: Some(true),
            optimize: Some(false),
        };
        assert_eq!(opts.to_arg(), "quality=90,progressive=y,optimize=n");
        assert_eq!(JpegOptions::quality(50).to_arg(), "quality=50");
        assert!(JpegOptions::default().is_empty());
    }

    #[test]
    fn jpeg_quality_bounds() {
        let err = ConversionConfig::builder()
            .jpegopt(JpegOptions::quality(101))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("101"));
    }

    #[test]
    fn size_parsing() {
        assert_eq!(Size::parse(&["1000"]).unwrap(), Size::Scale(1000));
        assert_eq!(
            Size::parse(&["none", "2400"]).unwrap(),
            Size::Dimensions {
                width: None,
                height: Some(2400)
            }
        );
        assert_eq!(
            Size::parse(&["400", "None"]).unwrap(),
            Size::Dimensions {
                width: Some(400),
                height: None
            }
        );
        assert!(Size::parse(&["none"]).is_err());
        assert!(Size::parse(&["none", "none"]).is_err());
        assert!(Size::parse(&["big"]).is_err());
        assert!(Size::parse(&["1", "2", "3"]).is_err());
        assert!(Size::parse(&[]).is_err());
    }

    #[test]
    fn info_options_inherit_credentials() {
        let c = ConversionConfig::builder()
            .userpw("u")
            .ownerpw("o")
            .poppler_path("/opt/poppler")
            .timeout(Duration::from_secs(3))
            .build()
            .unwrap();
        let info = c.info_options();
        assert_eq!(info.userpw.as_deref(), Some("u"));
        assert_eq!(info.ownerpw.as_deref(), Some("o"));
        assert_eq!(info.timeout, Some(Duration::from_secs(3)));
        assert!(!info.rawdates);
    }

    #[test]
    fn debug_redacts_passwords() {
        let c = ConversionConfig::builder().userpw("secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
