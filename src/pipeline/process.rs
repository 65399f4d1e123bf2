//! Subprocess plumbing shared by every poppler invocation.
//!
//! A poppler tool can write megabytes to stdout while also printing
//! warnings to stderr. Reading one pipe while the other fills up would
//! deadlock the child, so both pipes are drained concurrently with waiting
//! for exit. Children are spawned with `kill_on_drop`, which means dropping
//! a [`Child`] that is still running (for example because a sibling failed
//! to spawn) terminates it.

use crate::error::Pdf2ImageError;
use std::ffi::OsString;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::debug;

/// How long to keep draining pipes after killing a timed-out child.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Everything a finished process produced.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Outcome of waiting on a child.
#[derive(Debug)]
pub enum Completion {
    /// The process exited on its own.
    Finished(ProcessOutput),
    /// The deadline passed; the process was killed and reaped.
    TimedOut { stdout: Vec<u8>, stderr: Vec<u8> },
}

/// Spawn `binary args…` with piped output.
///
/// A spawn failure means the binary is missing or not executable.
pub fn spawn(binary: &Path, args: &[OsString], poppler_path: Option<&Path>) -> Result<Child, Pdf2ImageError> {
    let mut cmd = Command::new(binary);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some((key, value)) = poppler_locate::library_path_env(poppler_path) {
        cmd.env(key, value);
    }

    debug!("Spawning {} {:?}", binary.display(), args);
    cmd.spawn().map_err(|source| Pdf2ImageError::PopplerNotInstalled {
        binary: binary.to_path_buf(),
        source,
    })
}

/// Wait for `child` to exit while draining both pipes.
///
/// With a `deadline`, a child still running at that instant is killed,
/// reaped, and whatever it wrote is returned as [`Completion::TimedOut`].
pub async fn collect(mut child: Child, deadline: Option<Instant>) -> Result<Completion, Pdf2ImageError> {
    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| Pdf2ImageError::Internal("child stdout was not piped".into()))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| Pdf2ImageError::Internal("child stderr was not piped".into()))?;
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();

    let drained = async {
        tokio::try_join!(
            child.wait(),
            stdout_pipe.read_to_end(&mut stdout),
            stderr_pipe.read_to_end(&mut stderr),
        )
    };
    let finished = match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, drained).await.ok(),
        None => Some(drained.await),
    };

    match finished {
        Some(Ok((status, _, _))) => Ok(Completion::Finished(ProcessOutput {
            status,
            stdout,
            stderr,
        })),
        Some(Err(e)) => Err(Pdf2ImageError::io("Failed to read poppler output", e)),
        None => {
            // Already-exited children make kill() fail; reaping is what matters.
            let _ = child.kill().await;
            let _ = tokio::time::timeout(DRAIN_GRACE, async {
                let _ = tokio::join!(
                    stdout_pipe.read_to_end(&mut stdout),
                    stderr_pipe.read_to_end(&mut stderr),
                );
            })
            .await;
            Ok(Completion::TimedOut { stdout, stderr })
        }
    }
}

/// Spawn and collect in one step, with an optional relative timeout.
pub async fn run(
    binary: &Path,
    args: &[OsString],
    poppler_path: Option<&Path>,
    timeout: Option<Duration>,
) -> Result<Completion, Pdf2ImageError> {
    let deadline = timeout.map(|t| Instant::now() + t);
    let child = spawn(binary, args, poppler_path)?;
    collect(child, deadline).await
}
