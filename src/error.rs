//! Error types for the edgequake-pdf2image library.
//!
//! Two distinct error types reflect two distinct layers:
//!
//! * [`Pdf2ImageError`] — **Fatal** for the whole request. Every public
//!   entry point returns it; nothing is retried automatically and no
//!   partial image list ever accompanies it.
//!
//! * [`DemuxError`] — raised by the pure stream demuxer when a renderer's
//!   stdout does not hold well-formed image records. The orchestrator wraps
//!   it in [`Pdf2ImageError::Demux`] together with the worker that produced
//!   the bytes.
//!
//! [`Pdf2ImageError::kind`] folds the variants into the coarse
//! [`ErrorKind`] taxonomy so callers can match on the class of failure
//! (environment, content, timeout, …) without listing every variant.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2image library.
#[derive(Debug, Error)]
pub enum Pdf2ImageError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Environment errors ────────────────────────────────────────────────
    /// A poppler binary could not be spawned.
    #[error(
        "Unable to run '{binary}': {source}\n\
Is poppler installed and in PATH? Otherwise pass --poppler-path."
    )]
    PopplerNotInstalled {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Content errors ────────────────────────────────────────────────────
    /// pdfinfo ran but did not report a usable page count.
    #[error("Unable to get page count. {detail}")]
    PageCountUnavailable { detail: String },

    /// A renderer worker exited unsuccessfully.
    #[error("Renderer worker {worker} (pages {first}-{last}) failed with {status}: {stderr}")]
    RendererFailed {
        worker: usize,
        first: u32,
        last: u32,
        status: String,
        stderr: String,
    },

    /// The renderer reported malformed PDF content and strict mode is on.
    #[error("PDF syntax error reported by the renderer:\n{stderr}")]
    PdfSyntax { stderr: String },

    // ── Timeout ───────────────────────────────────────────────────────────
    /// A poppler process did not finish within the configured timeout.
    #[error("'{binary}' did not finish within {}s; the request was aborted", .timeout.as_secs_f64())]
    Timeout { binary: String, timeout: Duration },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The selected renderer cannot express an option.
    #[error("Option '{option}' is not supported by {renderer}")]
    UnsupportedOption {
        option: &'static str,
        renderer: &'static str,
    },

    // ── Format errors ─────────────────────────────────────────────────────
    /// A worker's stdout could not be split into image records.
    #[error("Renderer worker {worker} produced malformed output: {source}")]
    Demux {
        worker: usize,
        #[source]
        source: DemuxError,
    },

    /// An image record or file could not be decoded.
    #[error("Failed to decode image '{origin}': {detail}")]
    ImageDecode { origin: String, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Filesystem or pipe failure.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2ImageError {
    /// Class of failure, independent of the exact variant.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Pdf2ImageError::PopplerNotInstalled { .. } => ErrorKind::Environment,
            Pdf2ImageError::FileNotFound { .. }
            | Pdf2ImageError::PermissionDenied { .. }
            | Pdf2ImageError::NotAPdf { .. }
            | Pdf2ImageError::PageCountUnavailable { .. }
            | Pdf2ImageError::RendererFailed { .. } => ErrorKind::Content,
            Pdf2ImageError::PdfSyntax { .. } => ErrorKind::Syntax,
            Pdf2ImageError::Timeout { .. } => ErrorKind::Timeout,
            Pdf2ImageError::InvalidConfig(_) | Pdf2ImageError::UnsupportedOption { .. } => {
                ErrorKind::Configuration
            }
            Pdf2ImageError::Demux { .. } | Pdf2ImageError::ImageDecode { .. } => ErrorKind::Format,
            Pdf2ImageError::Io { .. } => ErrorKind::Io,
            Pdf2ImageError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Pdf2ImageError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Coarse failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A poppler binary cannot be located or executed.
    Environment,
    /// The input is not a usable document.
    Content,
    /// Strict mode caught a renderer syntax error.
    Syntax,
    /// A subprocess exceeded the time budget.
    Timeout,
    /// Unsupported option combination, detected before spawning.
    Configuration,
    /// Renderer output could not be split or decoded.
    Format,
    /// Filesystem or pipe failure.
    Io,
    /// Bug or runtime failure.
    Internal,
}

/// Errors raised while splitting a concatenated image stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DemuxError {
    /// Fewer than three header lines were found at `offset`.
    #[error("missing PNM header at byte {offset}")]
    MissingHeader { offset: usize },

    /// Width, height or maxval did not parse.
    #[error("invalid PNM header at byte {offset}: {line:?}")]
    InvalidHeader { offset: usize, line: String },

    /// A record claims more bytes than the buffer holds.
    #[error("record at byte {offset} needs {needed} bytes but only {available} remain")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Bytes remain after the last PNG record but contain no `IEND`.
    #[error("no IEND chunk after byte {offset}")]
    MissingIend { offset: usize },

    /// The format has no in-memory representation.
    #[error("{format} output cannot be demultiplexed from a stream")]
    Unsupported { format: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display() {
        let e = Pdf2ImageError::Timeout {
            binary: "pdftoppm".into(),
            timeout: Duration::from_secs(5),
        };
        let msg = e.to_string();
        assert!(msg.contains("pdftoppm"), "got: {msg}");
        assert!(msg.contains("5s"), "got: {msg}");
        assert_eq!(e.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn page_count_display() {
        let e = Pdf2ImageError::PageCountUnavailable {
            detail: "Syntax Error: Couldn't find trailer dictionary".into(),
        };
        assert!(e.to_string().starts_with("Unable to get page count."));
        assert_eq!(e.kind(), ErrorKind::Content);
    }

    #[test]
    fn environment_kind() {
        let e = Pdf2ImageError::PopplerNotInstalled {
            binary: PathBuf::from("pdfinfo"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(e.kind(), ErrorKind::Environment);
        assert!(e.to_string().contains("--poppler-path"));
    }

    #[test]
    fn demux_wraps_source() {
        let e = Pdf2ImageError::Demux {
            worker: 2,
            source: DemuxError::MissingIend { offset: 120 },
        };
        assert!(e.to_string().contains("worker 2"));
        assert!(e.to_string().contains("IEND"));
        assert_eq!(e.kind(), ErrorKind::Format);
    }

    #[test]
    fn unsupported_option_is_configuration() {
        let e = Pdf2ImageError::UnsupportedOption {
            option: "hide_annotations",
            renderer: "pdftocairo",
        };
        assert_eq!(e.kind(), ErrorKind::Configuration);
        assert!(e.to_string().contains("pdftocairo"));
    }
}
