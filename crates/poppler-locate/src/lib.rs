//! # poppler-locate
//!
//! Find the [poppler-utils](https://poppler.freedesktop.org/) command-line
//! tools on disk so callers can spawn them without caring whether poppler
//! was installed system-wide, unpacked next to the application, or pointed
//! to through an environment variable.
//!
//! ## Resolution order
//!
//! For each [`PopplerTool`], [`resolve`] tries, first match wins:
//!
//! 1. An explicit directory supplied by the caller.
//! 2. The directory named by `POPPLER_PATH`.
//! 3. Every directory on `PATH`.
//! 4. The bare executable name, leaving the final lookup to the OS.
//!
//! Steps 2 and 3 go through [`which`], so only files the current user can
//! execute match (and `PATHEXT` is honoured on Windows).
//!
//! Step 4 never fails here: a missing binary surfaces when the process is
//! spawned, which is where the caller can turn it into a meaningful error.
//! Use [`require`] when an early, explicit check is wanted.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use poppler_locate::{require, resolve, PopplerTool};
//!
//! let pdftoppm = resolve(PopplerTool::Pdftoppm, None);
//! let pdfinfo = require(PopplerTool::Pdfinfo, None).expect("poppler missing");
//! println!("{} / {}", pdftoppm.display(), pdfinfo.display());
//! ```
//!
//! ## Platform notes
//!
//! | OS      | Executable        | Library search variable |
//! |---------|-------------------|-------------------------|
//! | Linux   | `pdftoppm`        | `LD_LIBRARY_PATH`       |
//! | macOS   | `pdftoppm`        | `LD_LIBRARY_PATH`       |
//! | Windows | `pdftoppm.exe`    | (none, DLLs sit next to the exe) |

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Environment variable naming a directory that holds the poppler tools.
pub const POPPLER_PATH_ENV: &str = "POPPLER_PATH";

/// Variable extended with the poppler directory so relocated builds find
/// their shared libraries.
pub const LIBRARY_PATH_ENV: &str = "LD_LIBRARY_PATH";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by poppler-locate operations.
#[derive(Error, Debug)]
pub enum LocateError {
    /// The tool was not found in any searched location.
    #[error(
        "'{tool}' was not found (searched: {searched}).\n\
Install poppler-utils or point POPPLER_PATH / --poppler-path at its bin directory."
    )]
    NotFound { tool: PopplerTool, searched: String },

    /// A candidate exists but is not a regular file.
    #[error("'{path}' exists but is not an executable file")]
    NotAFile { path: PathBuf },
}

// ── Tools ────────────────────────────────────────────────────────────────────

/// The poppler binaries this workspace drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PopplerTool {
    /// Raster renderer (PPM/PGM/JPEG/PNG).
    Pdftoppm,
    /// Cairo renderer (PNG/JPEG/TIFF, transparency).
    Pdftocairo,
    /// Document information dump.
    Pdfinfo,
}

impl PopplerTool {
    /// Base command name without any platform suffix.
    pub fn name(self) -> &'static str {
        match self {
            PopplerTool::Pdftoppm => "pdftoppm",
            PopplerTool::Pdftocairo => "pdftocairo",
            PopplerTool::Pdfinfo => "pdfinfo",
        }
    }

    /// Command name as it appears on disk for the current platform.
    pub fn executable_name(self) -> String {
        executable_name(self.name())
    }
}

impl fmt::Display for PopplerTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Append the platform executable suffix (`.exe` on Windows).
pub fn executable_name(command: &str) -> String {
    let suffix = std::env::consts::EXE_SUFFIX;
    if suffix.is_empty() || command.ends_with(suffix) {
        command.to_string()
    } else {
        format!("{command}{suffix}")
    }
}

// ── Resolution ───────────────────────────────────────────────────────────────

/// Resolve `tool` to the path that should be spawned.
///
/// An explicit `poppler_dir` is trusted as-is (the file is not checked), the
/// same way a user-supplied path is passed straight to the OS.
pub fn resolve(tool: PopplerTool, poppler_dir: Option<&Path>) -> PathBuf {
    let exe = tool.executable_name();

    if let Some(dir) = poppler_dir {
        return dir.join(exe);
    }

    locate(tool).unwrap_or_else(|_| PathBuf::from(exe))
}

/// Like [`resolve`], but fails when no existing file was found.
///
/// A file in an explicit `poppler_dir` is accepted as-is; the searched
/// locations only yield executables.
pub fn require(tool: PopplerTool, poppler_dir: Option<&Path>) -> Result<PathBuf, LocateError> {
    if let Some(dir) = poppler_dir {
        let candidate = dir.join(tool.executable_name());
        return check_file(candidate).ok_or_else(|| LocateError::NotFound {
            tool,
            searched: dir.display().to_string(),
        })?;
    }

    locate(tool).map_err(|_| LocateError::NotFound {
        tool,
        searched: format!("${POPPLER_PATH_ENV}, $PATH"),
    })
}

/// Returns `true` when [`require`] would succeed.
pub fn is_installed(tool: PopplerTool, poppler_dir: Option<&Path>) -> bool {
    require(tool, poppler_dir).is_ok()
}

/// Environment entry to set on spawned poppler processes.
///
/// Returns `None` on Windows and when no directory is given. Otherwise the
/// directory is prepended to the current `LD_LIBRARY_PATH`.
pub fn library_path_env(poppler_dir: Option<&Path>) -> Option<(&'static str, OsString)> {
    if cfg!(windows) {
        return None;
    }
    let dir = poppler_dir?;
    let mut value = OsString::from(dir.as_os_str());
    value.push(":");
    if let Some(existing) = std::env::var_os(LIBRARY_PATH_ENV) {
        value.push(existing);
    }
    Some((LIBRARY_PATH_ENV, value))
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn env_dir() -> Option<PathBuf> {
    std::env::var_os(POPPLER_PATH_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// `POPPLER_PATH` first, then `PATH`.
fn locate(tool: PopplerTool) -> which::Result<PathBuf> {
    if let Some(dir) = env_dir() {
        if let Ok(found) = search_in(tool.name(), dir.as_os_str()) {
            return Ok(found);
        }
    }
    which::which(tool.name())
}

/// Executable `name` in a `PATH`-style list of directories.
fn search_in(name: &str, paths: &OsStr) -> which::Result<PathBuf> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    which::which_in(name, Some(paths), cwd)
}

/// `None` when nothing exists at `candidate`, `Some(Err)` for a directory.
fn check_file(candidate: PathBuf) -> Option<Result<PathBuf, LocateError>> {
    if candidate.is_file() {
        Some(Ok(candidate))
    } else if candidate.exists() {
        Some(Err(LocateError::NotAFile { path: candidate }))
    } else {
        None
    }
}
