//! Pipeline stages for PDF-to-image conversion.
//!
//! Each submodule implements one step. The pure steps (partitioning,
//! argument building, demultiplexing, pdfinfo parsing) never touch a
//! process and are tested directly; the process-driving steps sit on top
//! of [`process`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ info ──▶ partition ──▶ command ──▶ render ──▶ demux / files
//! (path)   (pages)   (ranges)      (argv)     (N procs)   (images)
//! ```
//!
//! 1. [`input`]     — validate a local PDF or spill bytes to a temp file
//! 2. [`info`]      — run `pdfinfo` to learn the page count
//! 3. [`partition`] — split the page span into one contiguous range per worker
//! 4. [`command`]   — pick the renderer and build each worker's argv
//! 5. [`render`]    — spawn, wait on and merge the workers; uses [`naming`]
//!    for output tags and [`version`] for version-gated flags
//! 6. [`demux`]     — split a worker's stdout into image records

pub mod command;
pub mod demux;
pub mod info;
pub mod input;
pub mod naming;
pub mod partition;
pub mod process;
pub mod render;
pub mod version;
