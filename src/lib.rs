//! # edgequake-pdf2image
//!
//! Convert PDF pages to images by driving poppler's `pdftoppm`,
//! `pdftocairo` and `pdfinfo` tools.
//!
//! ## Why shell out?
//!
//! poppler is the reference PDF rasteriser on most systems and already
//! installed wherever PDFs are handled. Running its tools as subprocesses
//! keeps this crate free of C bindings, and rendering scales across cores
//! by running several renderer processes over disjoint page ranges.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     validate the path, or spill bytes to a temp file
//!  ├─ 2. Info      pdfinfo → page count
//!  ├─ 3. Partition contiguous page ranges, one per worker
//!  ├─ 4. Render    N × pdftoppm / pdftocairo, shared deadline
//!  ├─ 5. Demux     split each worker's stdout into image records
//!  └─ 6. Output    images (or paths) in document order + stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2image::{convert_from_path, ConversionConfig, ImageFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .dpi(150)
//!         .format(ImageFormat::Jpeg)
//!         .thread_count(4)
//!         .build()?;
//!     let output = convert_from_path("document.pdf", &config).await?;
//!     for page in &output.images {
//!         if let Some(img) = page.as_image() {
//!             println!("{}x{}", img.width(), img.height());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2image` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2image = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionConfig, ConversionConfigBuilder, CounterCursor, InfoOptions, JpegOptions, OutputFileNaming, Size,
};
pub use convert::{convert_from_bytes, convert_from_path, convert_sync, pdfinfo_from_bytes, pdfinfo_from_path};
pub use error::{DemuxError, ErrorKind, Pdf2ImageError};
pub use format::ImageFormat;
pub use output::{ConversionOutput, ConversionStats, PageImage, PdfInfo};
pub use pipeline::command::Renderer;
pub use pipeline::partition::PageRange;
pub use progress::{NoopProgressCallback, ProgressCallback, RenderProgressCallback};
