//! Input resolution: validate a local PDF or spill in-memory bytes to disk.
//!
//! The poppler tools only read from a path. In-memory documents are written
//! to a [`NamedTempFile`] that lives inside [`ResolvedInput`], so the file
//! is removed when the request finishes, whichever way it finishes.

use crate::error::Pdf2ImageError;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A document the poppler tools can open by path.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Caller-supplied file.
    Local(PathBuf),
    /// Bytes written to a temporary file, deleted on drop.
    Temporary(NamedTempFile),
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Temporary(f) => f.path(),
        }
    }
}

/// Validate a local file: it must exist, be readable and start with `%PDF`.
///
/// Files shorter than four bytes pass; pdfinfo reports those itself.
pub fn resolve_local(path: &Path) -> Result<ResolvedInput, Pdf2ImageError> {
    let path = path.to_path_buf();
    if !path.exists() {
        return Err(Pdf2ImageError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != PDF_MAGIC {
                return Err(Pdf2ImageError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2ImageError::PermissionDenied { path });
        }
        Err(_) => return Err(Pdf2ImageError::FileNotFound { path }),
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Write `bytes` to a managed temporary `.pdf` file.
pub fn from_bytes(bytes: &[u8]) -> Result<ResolvedInput, Pdf2ImageError> {
    if bytes.len() >= 4 && &bytes[..4] != PDF_MAGIC {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(Pdf2ImageError::NotAPdf {
            path: PathBuf::from("<memory>"),
            magic,
        });
    }

    let mut tmp = tempfile::Builder::new()
        .prefix("pdf2image-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| Pdf2ImageError::io("Failed to create temporary PDF", e))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| Pdf2ImageError::io("Failed to write temporary PDF", e))?;

    debug!("Wrote {} bytes to {}", bytes.len(), tmp.path().display());
    Ok(ResolvedInput::Temporary(tmp))
}
