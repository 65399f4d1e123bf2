//! Public conversion and metadata entry points.
//!
//! Every request runs `pdfinfo` first: the page count decides how the
//! range is partitioned across renderer workers.

use crate::config::{ConversionConfig, InfoOptions};
use crate::error::Pdf2ImageError;
use crate::output::{ConversionOutput, ConversionStats, PdfInfo};
use crate::pipeline::{command, info, input, render};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Convert a PDF file into one image per selected page.
///
/// # Arguments
/// * `pdf_path` — Local path to a PDF
/// * `config` — Conversion configuration
///
/// # Returns
/// Images in document order. Selecting no pages (`first_page > last_page`)
/// yields an empty output, not an error.
///
/// # Errors
/// Any failure is fatal for the whole request:
/// - File not found / not a PDF
/// - poppler not installed
/// - page count unavailable, renderer failure or timeout
/// - malformed renderer output
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2image::{convert_from_path, ConversionConfig, ImageFormat};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ConversionConfig::builder()
///     .format(ImageFormat::Png)
///     .thread_count(4)
///     .build()?;
/// let output = convert_from_path("document.pdf", &config).await?;
/// println!("{} pages", output.len());
/// # Ok(())
/// # }
/// ```
pub async fn convert_from_path(
    pdf_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2ImageError> {
    let total_start = Instant::now();
    config.validate()?;
    let resolved = input::resolve_local(pdf_path.as_ref())?;
    convert_resolved(resolved.path(), config, total_start).await
}

/// Convert PDF bytes held in memory.
///
/// The bytes are written to a managed [`tempfile`] that is removed when
/// this function returns, on success and on error.
pub async fn convert_from_bytes(
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2ImageError> {
    let total_start = Instant::now();
    config.validate()?;
    let resolved = input::from_bytes(bytes)?;
    convert_resolved(resolved.path(), config, total_start).await
}

/// Synchronous wrapper around [`convert_from_path`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    pdf_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2ImageError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2ImageError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_from_path(pdf_path, config))
}

/// Read document metadata with `pdfinfo`.
pub async fn pdfinfo_from_path(
    pdf_path: impl AsRef<Path>,
    options: &InfoOptions,
) -> Result<PdfInfo, Pdf2ImageError> {
    let resolved = input::resolve_local(pdf_path.as_ref())?;
    info::fetch(resolved.path(), options).await
}

/// Read metadata of a PDF held in memory.
pub async fn pdfinfo_from_bytes(bytes: &[u8], options: &InfoOptions) -> Result<PdfInfo, Pdf2ImageError> {
    let resolved = input::from_bytes(bytes)?;
    info::fetch(resolved.path(), options).await
}

async fn convert_resolved(
    pdf_path: &Path,
    config: &ConversionConfig,
    total_start: Instant,
) -> Result<ConversionOutput, Pdf2ImageError> {
    info!("Starting conversion: {}", pdf_path.display());

    // Option conflicts surface before any process is spawned.
    let plan = command::plan(config)?;

    // ── Step 1: Page count ───────────────────────────────────────────────
    let pdf_info = info::fetch(pdf_path, &config.info_options()).await?;
    let total_pages = pdf_info.page_count;
    info!("PDF has {} pages", total_pages);

    // ── Step 2: Render ───────────────────────────────────────────────────
    let render_start = Instant::now();
    let rendered = render::render_pages(pdf_path, config, plan, total_pages).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    // ── Step 3: Stats ────────────────────────────────────────────────────
    let stats = ConversionStats {
        total_pages,
        first_page: rendered.ranges.first().map(|r| r.start),
        last_page: rendered.ranges.last().map(|r| r.end),
        rendered_pages: rendered.images.len(),
        workers: rendered.ranges.len(),
        renderer: rendered.plan.renderer,
        format: rendered.plan.format,
        render_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} image(s) from {} page(s), {}ms total",
        stats.rendered_pages, total_pages, stats.total_duration_ms
    );

    Ok(ConversionOutput {
        images: rendered.images,
        stats,
    })
}
