//! Progress-callback trait for worker-level rendering events.
//!
//! Inject an [`Arc<dyn RenderProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the orchestrator spawns and finishes renderer workers.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2image::{ConversionConfig, PageRange, RenderProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     finished: AtomicUsize,
//! }
//!
//! impl RenderProgressCallback for CountingCallback {
//!     fn on_worker_complete(&self, worker: usize, range: PageRange, elapsed_ms: u64) {
//!         self.finished.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("worker {worker} rendered pages {range} in {elapsed_ms}ms");
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { finished: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::partition::PageRange;
use std::sync::Arc;

/// Called by the orchestrator as it drives renderer workers.
///
/// Workers finish in any order, so `on_worker_complete` may be called from
/// concurrently polled futures. All methods default to no-ops.
pub trait RenderProgressCallback: Send + Sync {
    /// Called once the page span and worker count are known.
    fn on_conversion_start(&self, total_pages: u32, workers: usize) {
        let _ = (total_pages, workers);
    }

    /// Called right after a worker process is spawned.
    fn on_worker_start(&self, worker: usize, range: PageRange) {
        let _ = (worker, range);
    }

    /// Called when a worker process exits on its own.
    fn on_worker_complete(&self, worker: usize, range: PageRange, elapsed_ms: u64) {
        let _ = (worker, range, elapsed_ms);
    }

    /// Called after all output has been assembled successfully.
    fn on_conversion_complete(&self, images: usize) {
        let _ = images;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RenderProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn RenderProgressCallback>;
