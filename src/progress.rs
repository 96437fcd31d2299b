//! Progress-callback trait for task lifecycle events.
//!
//! Inject an [`Arc<dyn TaskProgressCallback>`] via
//! [`crate::config::ClientConfigBuilder::progress_callback`] to receive
//! events while a task uploads, processes and downloads.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdftask::{ClientConfig, TaskProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct UploadCounter(AtomicUsize);
//!
//! impl TaskProgressCallback for UploadCounter {
//!     fn on_file_uploaded(&self, _index: usize, _total: usize, _path: &std::path::Path) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ClientConfig::builder()
//!     .progress_callback(Arc::new(UploadCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::task::ProcessResult;
use std::path::Path;
use std::sync::Arc;

/// Called by [`crate::task::Task`] as it moves through its lifecycle.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. With `upload_concurrency > 1`, `on_file_uploaded`
/// may fire in any order.
pub trait TaskProgressCallback: Send + Sync {
    /// Called once before the first file of a batch is uploaded.
    ///
    /// # Arguments
    /// * `total_files` — files that will be uploaded in this batch
    fn on_upload_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called after each file upload succeeds.
    ///
    /// # Arguments
    /// * `index` — 0-based position of the file in the task's file list
    /// * `total` — files in this batch
    /// * `path`  — local path that was uploaded
    fn on_file_uploaded(&self, index: usize, total: usize, path: &Path) {
        let _ = (index, total, path);
    }

    /// Called when the server has processed the task.
    fn on_process_complete(&self, result: &ProcessResult) {
        let _ = result;
    }

    /// Called for every chunk written while downloading.
    ///
    /// # Arguments
    /// * `downloaded` — bytes written so far
    /// * `total`      — `Content-Length` if the server sent one
    fn on_download_progress(&self, downloaded: u64, total: Option<u64>) {
        let _ = (downloaded, total);
    }

    /// Called once the result has been moved to its final path.
    fn on_download_complete(&self, path: &Path) {
        let _ = path;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl TaskProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ClientConfig`].
pub type ProgressCallback = Arc<dyn TaskProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        batch: AtomicUsize,
        uploaded: AtomicUsize,
        downloaded: AtomicU64,
    }

    impl TaskProgressCallback for TrackingCallback {
        fn on_upload_start(&self, total_files: usize) {
            self.batch.store(total_files, Ordering::SeqCst);
        }

        fn on_file_uploaded(&self, _index: usize, _total: usize, _path: &Path) {
            self.uploaded.fetch_add(1, Ordering::SeqCst);
        }

        fn on_download_progress(&self, downloaded: u64, _total: Option<u64>) {
            self.downloaded.store(downloaded, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_upload_start(2);
        cb.on_file_uploaded(0, 2, Path::new("a.pdf"));
        cb.on_download_progress(10, Some(20));
        cb.on_download_complete(Path::new("out.pdf"));
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_upload_start(3);
        tracker.on_file_uploaded(0, 3, Path::new("a.pdf"));
        tracker.on_file_uploaded(1, 3, Path::new("b.pdf"));
        tracker.on_download_progress(4096, None);

        assert_eq!(tracker.batch.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.uploaded.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.downloaded.load(Ordering::SeqCst), 4096);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_upload_start(1);
        cb.on_download_complete(Path::new("x"));
    }
}
