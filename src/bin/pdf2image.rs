//! CLI binary for edgequake-pdf2image.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2image::{
    convert_from_path, pdfinfo_from_path, ConversionConfig, ImageFormat, InfoOptions, JpegOptions,
    OutputFileNaming, PageImage, PageRange, ProgressCallback, RenderProgressCallback, Size,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar tick per finished renderer worker.
/// Workers finish out of order, so every line names its page range.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` reports the worker count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading page count…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn activate_bar(&self, workers: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} workers  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(workers as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
    }
}

impl RenderProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: u32, workers: usize) {
        self.activate_bar(workers);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Rendering {total_pages} pages with {workers} worker(s)…"))
        ));
    }

    fn on_worker_start(&self, _worker: usize, range: PageRange) {
        self.bar.set_message(format!("pages {range}"));
    }

    fn on_worker_complete(&self, worker: usize, range: PageRange, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} Worker {:>2}  pages {:<9}  {}",
            green("✓"),
            worker,
            range.to_string(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, images: usize) {
        self.bar.finish_and_clear();
        eprintln!("{} {} images rendered", green("✔"), bold(&images.to_string()));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Render every page to PNG files, four renderer processes at once
  pdf2image document.pdf -o out/ --format png -t 4

  # Pages 3-5 as JPEG, quality 85, in memory (prints dimensions)
  pdf2image --first-page 3 --last-page 5 --format jpeg --jpeg-quality 85 document.pdf

  # Thumbnail of the cover only
  pdf2image --single-file --size 300 -o thumbs/ --output-file cover document.pdf

  # Fixed height, width follows the aspect ratio
  pdf2image --size none 2400 -o out/ --paths-only document.pdf

  # Transparent TIFF through pdftocairo
  pdf2image --format tiff --transparent -o out/ document.pdf

  # Metadata only
  pdf2image --info-only --json document.pdf

ENVIRONMENT VARIABLES:
  POPPLER_PATH   Directory holding pdftoppm / pdftocairo / pdfinfo
  RUST_LOG       Override the log filter (e.g. edgequake_pdf2image=debug)
"#;

/// Convert PDF pages to images with poppler.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2image",
    version,
    about = "Convert PDF pages to images with poppler",
    long_about = "Convert PDF pages to PPM, PGM, JPEG, PNG or TIFF images by running poppler's \
pdftoppm or pdftocairo, split across several renderer processes.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Write image files into this directory instead of keeping pages in memory.
    #[arg(short, long, env = "PDF2IMAGE_OUTPUT_FOLDER")]
    output_folder: Option<PathBuf>,

    /// Rendering DPI.
    #[arg(long, env = "PDF2IMAGE_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(1..))]
    dpi: u32,

    /// First page to render (1-based).
    #[arg(long)]
    first_page: Option<u32>,

    /// Last page to render (inclusive).
    #[arg(long)]
    last_page: Option<u32>,

    /// Output format: ppm, pgm, jpeg, png, tiff.
    #[arg(long = "format", visible_alias = "fmt", env = "PDF2IMAGE_FORMAT", default_value = "ppm")]
    format: String,

    /// JPEG quality (0–100).
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    jpeg_quality: Option<u8>,

    /// Write progressive JPEGs.
    #[arg(long)]
    jpeg_progressive: bool,

    /// Optimise JPEG Huffman tables.
    #[arg(long)]
    jpeg_optimize: bool,

    /// Number of renderer processes to run at once.
    #[arg(short, long, env = "PDF2IMAGE_THREADS", default_value_t = 1)]
    thread_count: usize,

    /// User password for encrypted documents.
    #[arg(long, env = "PDF2IMAGE_USERPW")]
    userpw: Option<String>,

    /// Owner password for encrypted documents.
    #[arg(long, env = "PDF2IMAGE_OWNERPW")]
    ownerpw: Option<String>,

    /// Render the crop box instead of the media box.
    #[arg(long)]
    use_cropbox: bool,

    /// Fail when the renderer reports a PDF syntax error.
    #[arg(long)]
    strict: bool,

    /// Transparent background (PNG/TIFF).
    #[arg(long)]
    transparent: bool,

    /// Render only the first page into a single file.
    #[arg(long)]
    single_file: bool,

    /// Name output files `<prefix>0001-<page>.<ext>` instead of using a UUID.
    #[arg(long)]
    output_file: Option<String>,

    /// Directory holding the poppler binaries.
    #[arg(long, env = "POPPLER_PATH")]
    poppler_path: Option<PathBuf>,

    /// Render in grayscale.
    #[arg(long)]
    grayscale: bool,

    /// Target size: one value (longest side) or WIDTH HEIGHT, either may be `none`.
    #[arg(long, num_args = 1..=2, value_name = "N|W H")]
    size: Option<Vec<String>>,

    /// Print file paths instead of decoding images (needs --output-folder).
    #[arg(long)]
    paths_only: bool,

    /// Force pdftocairo.
    #[arg(long)]
    use_pdftocairo: bool,

    /// Abort if any poppler process runs longer than this many seconds.
    #[arg(long, env = "PDF2IMAGE_TIMEOUT")]
    timeout: Option<u64>,

    /// Do not render annotations (pdftoppm only).
    #[arg(long)]
    hide_annotations: bool,

    /// Print PDF metadata only, no conversion.
    #[arg(long)]
    info_only: bool,

    /// With --info-only: print dates exactly as stored.
    #[arg(long)]
    rawdates: bool,

    /// Output a JSON summary instead of one line per page.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

/// One line of `--json` output.
#[derive(Serialize)]
struct PageSummary {
    index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<String>,
}

impl PageSummary {
    fn new(index: usize, page: &PageImage) -> Self {
        match page {
            PageImage::Path(p) => Self {
                index,
                path: Some(p.clone()),
                width: None,
                height: None,
                color: None,
            },
            PageImage::Decoded(img) => Self {
                index,
                path: None,
                width: Some(img.width()),
                height: Some(img.height()),
                color: Some(format!("{:?}", img.color())),
            },
        }
    }

    fn line(&self) -> String {
        match (&self.path, self.width, self.height, &self.color) {
            (Some(p), _, _, _) => p.display().to_string(),
            (None, Some(w), Some(h), Some(c)) => format!("{w}x{h} {c}"),
            _ => String::new(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.info_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    // ── Info-only mode ───────────────────────────────────────────────────
    if cli.info_only {
        let info = pdfinfo_from_path(&cli.input, &build_info_options(&cli))
            .await
            .context("Failed to read PDF metadata")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            for (key, value) in info.fields() {
                println!("{:<13} {}", format!("{key}:"), value);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn RenderProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let output = convert_from_path(&cli.input, &config)
        .await
        .context("Conversion failed")?;

    let pages: Vec<PageSummary> = output
        .images
        .iter()
        .enumerate()
        .map(|(i, page)| PageSummary::new(i, page))
        .collect();

    if cli.json {
        let summary = serde_json::json!({
            "stats": output.stats,
            "pages": pages,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise output")?
        );
    } else {
        for page in &pages {
            println!("{}", page.line());
        }
        if !cli.quiet && !show_progress {
            eprintln!(
                "Rendered {} images from {} pages in {}ms",
                output.stats.rendered_pages, output.stats.total_pages, output.stats.total_duration_ms
            );
        }
    }

    Ok(())
}

fn build_info_options(cli: &Cli) -> InfoOptions {
    let mut options = InfoOptions::default()
        .rawdates(cli.rawdates)
        .pages(cli.first_page, cli.last_page);
    if let Some(ref pw) = cli.userpw {
        options = options.userpw(pw);
    }
    if let Some(ref pw) = cli.ownerpw {
        options = options.ownerpw(pw);
    }
    if let Some(ref dir) = cli.poppler_path {
        options = options.poppler_path(dir);
    }
    if let Some(secs) = cli.timeout {
        options = options.timeout(Duration::from_secs(secs));
    }
    options
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let format: ImageFormat = cli.format.parse().context("Invalid --format")?;

    let mut builder = ConversionConfig::builder()
        .dpi(cli.dpi)
        .format(format)
        .thread_count(cli.thread_count)
        .use_cropbox(cli.use_cropbox)
        .strict(cli.strict)
        .transparent(cli.transparent)
        .single_file(cli.single_file)
        .grayscale(cli.grayscale)
        .paths_only(cli.paths_only)
        .use_pdftocairo(cli.use_pdftocairo)
        .hide_annotations(cli.hide_annotations);

    if let Some(ref dir) = cli.output_folder {
        builder = builder.output_folder(dir);
    }
    if let Some(first) = cli.first_page {
        builder = builder.first_page(first);
    }
    if let Some(last) = cli.last_page {
        builder = builder.last_page(last);
    }
    if cli.jpeg_quality.is_some() || cli.jpeg_progressive || cli.jpeg_optimize {
        builder = builder.jpegopt(JpegOptions {
            quality: cli.jpeg_quality,
            progressive: cli.jpeg_progressive.then_some(true),
            optimize: cli.jpeg_optimize.then_some(true),
        });
    }
    if let Some(ref pw) = cli.userpw {
        builder = builder.userpw(pw);
    }
    if let Some(ref pw) = cli.ownerpw {
        builder = builder.ownerpw(pw);
    }
    if let Some(ref prefix) = cli.output_file {
        builder = builder.output_file(OutputFileNaming::counter(prefix));
    }
    if let Some(ref dir) = cli.poppler_path {
        builder = builder.poppler_path(dir);
    }
    if let Some(ref parts) = cli.size {
        let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
        builder = builder.size(Size::parse(&parts).context("Invalid --size")?);
    }
    if let Some(secs) = cli.timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
