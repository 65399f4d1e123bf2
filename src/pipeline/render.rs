//! Concurrent multi-process rendering.
//!
//! The selected page span is partitioned into contiguous ranges, one
//! renderer process per range, all running at once. Each process either
//! streams its pages to stdout (pdftoppm without an output folder) or
//! writes files named `<tag>-<page>.<ext>` into a directory.
//!
//! All workers share a single deadline. The orchestrator waits for every
//! worker, whatever happens to its siblings, before it reports an error, so
//! no child process outlives the request.
//!
//! ## Why spawn_blocking for assembly?
//!
//! Demultiplexing and decoding hundreds of megabytes of pixels is CPU-bound.
//! It runs on the blocking pool so the Tokio worker threads stay free.

use crate::config::ConversionConfig;
use crate::error::Pdf2ImageError;
use crate::format::ImageFormat;
use crate::output::PageImage;
use crate::pipeline::command::{self, RenderPlan};
use crate::pipeline::demux;
use crate::pipeline::naming::TagSequence;
use crate::pipeline::partition::{self, PageRange};
use crate::pipeline::process::{self, Completion};
use crate::pipeline::version;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempDir;
use tokio::process::Child;
use tracing::{debug, info, warn};

/// Marker poppler prints on stderr for malformed content.
const SYNTAX_ERROR_MARKER: &str = "Syntax Error";

/// Pages produced by one request, in document order.
#[derive(Debug)]
pub struct RenderedPages {
    pub images: Vec<PageImage>,
    /// One range per worker that ran; empty when nothing was selected.
    pub ranges: Vec<PageRange>,
    pub plan: RenderPlan,
}

/// A spawned renderer process.
struct Worker {
    index: usize,
    range: PageRange,
    tag: String,
    child: Child,
}

/// A renderer process that has been waited for.
struct WorkerResult {
    index: usize,
    range: PageRange,
    tag: String,
    completion: Result<Completion, Pdf2ImageError>,
}

/// What the assembly step needs from one successful worker.
struct WorkerOutput {
    index: usize,
    tag: String,
    stdout: Vec<u8>,
}

/// Ranges for a request. `single_file` renders only the first page.
pub fn plan_ranges(config: &ConversionConfig, total_pages: u32) -> Vec<PageRange> {
    if config.single_file {
        return partition::page_bounds(total_pages, config.first_page, config.last_page)
            .map(|(first, _)| vec![PageRange { start: first, end: first }])
            .unwrap_or_default();
    }
    partition::partition(total_pages, config.first_page, config.last_page, config.thread_count)
}

/// Render the selected pages of a `total_pages` document according to a
/// plan from [`command::plan`].
pub async fn render_pages(
    pdf_path: &Path,
    config: &ConversionConfig,
    mut plan: RenderPlan,
    total_pages: u32,
) -> Result<RenderedPages, Pdf2ImageError> {
    let ranges = plan_ranges(config, total_pages);
    if ranges.is_empty() {
        info!(
            "No pages selected (first={:?}, last={:?}, total={})",
            config.first_page, config.last_page, total_pages
        );
        return Ok(RenderedPages {
            images: Vec::new(),
            ranges,
            plan,
        });
    }

    if plan.needs_version_probe() {
        let version = version::probe(plan.renderer.tool(), config.poppler_path.as_deref()).await;
        plan.apply_version(version);
    }

    // pdftocairo cannot stream, so without a caller folder it writes into a
    // scratch directory removed when `scratch` drops, on every exit path.
    let (scratch, output_dir): (Option<TempDir>, Option<PathBuf>) = match config.output_folder {
        Some(ref dir) => (None, Some(dir.clone())),
        None if plan.renderer.streams_to_stdout() => (None, None),
        None => {
            let tmp = tempfile::Builder::new()
                .prefix("pdf2image-")
                .tempdir()
                .map_err(|e| Pdf2ImageError::io("Failed to create scratch directory", e))?;
            let path = tmp.path().to_path_buf();
            (Some(tmp), Some(path))
        }
    };

    let selected: u32 = ranges.iter().map(PageRange::len).sum();
    info!(
        "Rendering {} page(s) {}-{} with {} {} worker(s) as {}",
        selected,
        ranges[0].start,
        ranges[ranges.len() - 1].end,
        ranges.len(),
        plan.renderer,
        plan.format
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(selected, ranges.len());
    }

    // ── Spawn ────────────────────────────────────────────────────────────
    let poppler_path = config.poppler_path.as_deref();
    let binary = poppler_locate::resolve(plan.renderer.tool(), poppler_path);
    let deadline = config.timeout.map(|t| tokio::time::Instant::now() + t);
    let mut tags = TagSequence::new(&config.output_file, ranges.len());

    let mut workers = Vec::with_capacity(ranges.len());
    for (index, range) in ranges.iter().copied().enumerate() {
        let tag = tags.next_free_tag(|tag| {
            output_dir.as_deref().is_some_and(|dir| {
                list_tagged_files(dir, tag, plan.format, config.single_file).is_ok_and(|files| !files.is_empty())
            })
        });
        let prefix = output_dir.as_ref().map(|dir| dir.join(&tag));
        let args = command::build_render_args(config, &plan, pdf_path, range, prefix.as_deref());
        // An early return drops `workers`, killing everything already spawned.
        let child = process::spawn(&binary, &args, poppler_path)?;
        if let Some(ref cb) = config.progress_callback {
            cb.on_worker_start(index, range);
        }
        workers.push(Worker {
            index,
            range,
            tag,
            child,
        });
    }

    // ── Wait ─────────────────────────────────────────────────────────────
    let render_start = Instant::now();
    let results = join_all(workers.into_iter().map(move |w| async move {
        let completion = process::collect(w.child, deadline).await;
        if let Ok(Completion::Finished(_)) = completion {
            let elapsed_ms = render_start.elapsed().as_millis() as u64;
            debug!("Worker {} (pages {}) finished in {}ms", w.index, w.range, elapsed_ms);
            if let Some(ref cb) = config.progress_callback {
                cb.on_worker_complete(w.index, w.range, elapsed_ms);
            }
        }
        WorkerResult {
            index: w.index,
            range: w.range,
            tag: w.tag,
            completion,
        }
    }))
    .await;

    let outputs = check_results(results, &plan, config)?;

    // ── Assemble ─────────────────────────────────────────────────────────
    let format = plan.format;
    let paths_only = config.paths_only;
    let single_file = config.single_file;
    let images = tokio::task::spawn_blocking(move || match output_dir {
        Some(dir) => collect_files(&dir, &outputs, format, single_file, paths_only),
        None => decode_streams(&outputs, format),
    })
    .await
    .map_err(|e| Pdf2ImageError::Internal(format!("Assembly task panicked: {e}")))??;
    // Decoded pages no longer need the files.
    drop(scratch);

    info!("Rendered {} image(s)", images.len());
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(images.len());
    }

    Ok(RenderedPages { images, ranges, plan })
}

/// Reduce joined worker results to their stdout buffers, or to the single
/// error the request reports.
///
/// Precedence: spawn/IO failure, timeout, strict syntax error, non-zero
/// exit.
fn check_results(
    results: Vec<WorkerResult>,
    plan: &RenderPlan,
    config: &ConversionConfig,
) -> Result<Vec<WorkerOutput>, Pdf2ImageError> {
    let mut finished = Vec::with_capacity(results.len());
    let mut timed_out = false;
    let mut first_error = None;

    for r in results {
        match r.completion {
            Ok(Completion::Finished(output)) => finished.push((r.index, r.range, r.tag, output)),
            Ok(Completion::TimedOut { .. }) => timed_out = true,
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }
    if timed_out {
        return Err(Pdf2ImageError::Timeout {
            binary: plan.renderer.name().to_string(),
            timeout: config.timeout.unwrap_or_default(),
        });
    }

    for (index, range, _, output) in &finished {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains(SYNTAX_ERROR_MARKER) {
            if config.strict {
                return Err(Pdf2ImageError::PdfSyntax {
                    stderr: stderr.trim().to_string(),
                });
            }
            warn!("Worker {} (pages {}) reported syntax errors: {}", index, range, stderr.trim());
        }
    }

    for (index, range, _, output) in &finished {
        if !output.status.success() {
            return Err(Pdf2ImageError::RendererFailed {
                worker: *index,
                first: range.start,
                last: range.end,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
    }

    Ok(finished
        .into_iter()
        .map(|(index, _, tag, output)| WorkerOutput {
            index,
            tag,
            stdout: output.stdout,
        })
        .collect())
}

/// Split and decode every worker's stdout, worker by worker.
fn decode_streams(outputs: &[WorkerOutput], format: ImageFormat) -> Result<Vec<PageImage>, Pdf2ImageError> {
    let mut images = Vec::new();
    for out in outputs {
        let records = format
            .demux(&out.stdout)
            .map_err(|source| Pdf2ImageError::Demux {
                worker: out.index,
                source,
            })?;
        debug!("Worker {} produced {} record(s)", out.index, records.len());
        for (n, bytes) in demux::slices(&out.stdout, &records).enumerate() {
            let img = image::load_from_memory_with_format(bytes, format.image_format()).map_err(|e| {
                Pdf2ImageError::ImageDecode {
                    origin: format!("worker {} record {}", out.index, n),
                    detail: e.to_string(),
                }
            })?;
            images.push(PageImage::Decoded(img));
        }
    }
    Ok(images)
}

/// Files in `dir` written for `tag`, sorted by name.
///
/// Other files in the directory, including other requests' output, are
/// ignored.
pub fn list_tagged_files(
    dir: &Path,
    tag: &str,
    format: ImageFormat,
    single_file: bool,
) -> Result<Vec<PathBuf>, Pdf2ImageError> {
    let ext = format.extension();
    let exact = format!("{tag}.{ext}");
    let prefix = format!("{tag}-");
    let suffix = format!(".{ext}");

    let entries = std::fs::read_dir(dir)
        .map_err(|e| Pdf2ImageError::io(format!("Failed to list '{}'", dir.display()), e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Pdf2ImageError::io(format!("Failed to list '{}'", dir.display()), e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let matches = if single_file {
            name == exact
        } else {
            name.starts_with(&prefix) && name.ends_with(&suffix)
        };
        if matches {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Gather the files each worker wrote, in worker order.
fn collect_files(
    dir: &Path,
    outputs: &[WorkerOutput],
    format: ImageFormat,
    single_file: bool,
    paths_only: bool,
) -> Result<Vec<PageImage>, Pdf2ImageError> {
    let mut images = Vec::new();
    for out in outputs {
        let files = list_tagged_files(dir, &out.tag, format, single_file)?;
        debug!("Worker {} wrote {} file(s)", out.index, files.len());
        for path in files {
            if paths_only {
                images.push(PageImage::Path(path));
                continue;
            }
            let img = image::open(&path).map_err(|e| Pdf2ImageError::ImageDecode {
                origin: path.display().to_string(),
                detail: e.to_string(),
            })?;
            images.push(PageImage::Decoded(img));
        }
    }
    Ok(images)
}
