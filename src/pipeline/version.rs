//! Renderer version probe.
//!
//! Two renderer flags (`-jpegopt`, `-hide-annotations`) are missing from old
//! poppler releases, and passing an unknown flag makes the renderer abort.
//! The version is read once per request from `<renderer> -v`, which prints
//! something like `pdftoppm version 22.02.0` on stderr.

use crate::pipeline::process;
use once_cell::sync::Lazy;
use poppler_locate::PopplerTool;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

static VERSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\.(\d+)").unwrap());

/// Upper bound for the `-v` probe; it never touches a document.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// `major.minor` of the installed poppler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PopplerVersion {
    pub major: u32,
    pub minor: u32,
}

impl PopplerVersion {
    /// Oldest release shipping pdftocairo; assumed when probing fails, so
    /// neither gated flag is passed to a renderer of unknown age.
    pub const FALLBACK: PopplerVersion = PopplerVersion { major: 0, minor: 17 };

    /// `-jpegopt` appeared after 0.57.
    pub fn supports_jpegopt(self) -> bool {
        !(self.major == 0 && self.minor <= 57)
    }

    /// `-hide-annotations` appeared after 0.83.
    pub fn supports_hide_annotations(self) -> bool {
        !(self.major == 0 && self.minor <= 83)
    }
}

impl fmt::Display for PopplerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// First `major.minor` in `text`, or [`PopplerVersion::FALLBACK`].
pub fn parse_version(text: &str) -> PopplerVersion {
    VERSION_RE
        .captures(text)
        .and_then(|caps| {
            let major = caps.get(1)?.as_str().parse().ok()?;
            let minor = caps.get(2)?.as_str().parse().ok()?;
            Some(PopplerVersion { major, minor })
        })
        .unwrap_or(PopplerVersion::FALLBACK)
}

/// Run `<tool> -v` for the renderer about to be spawned and parse its answer.
///
/// Any failure, including a missing binary, yields the fallback version;
/// a missing renderer is reported later by the render step itself.
pub async fn probe(tool: PopplerTool, poppler_path: Option<&Path>) -> PopplerVersion {
    let binary = poppler_locate::resolve(tool, poppler_path);
    let args: Vec<OsString> = vec!["-v".into()];
    let output = match process::run(&binary, &args, poppler_path, Some(PROBE_TIMEOUT)).await {
        Ok(process::Completion::Finished(output)) => output,
        Ok(process::Completion::TimedOut { .. }) => {
            warn!("'{} -v' timed out; assuming poppler {}", binary.display(), PopplerVersion::FALLBACK);
            return PopplerVersion::FALLBACK;
        }
        Err(e) => {
            warn!("Could not probe '{}': {}", binary.display(), e);
            return PopplerVersion::FALLBACK;
        }
    };

    let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stdout));
    let version = parse_version(&text);
    debug!("Detected poppler {}", version);
    version
}
