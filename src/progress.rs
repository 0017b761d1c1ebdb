//! Progress-callback trait for per-page triage events.
//!
//! Inject an [`Arc<dyn TriageProgressCallback>`] via
//! [`crate::config::TriageConfigBuilder::progress_callback`] to be told as
//! the document pipeline works through its pages.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pagetriage::{ProcessingMethod, TriageConfig, TriageProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Rasterised(AtomicUsize);
//!
//! impl TriageProgressCallback for Rasterised {
//!     fn on_page_complete(&self, _page_num: usize, _total: usize, method: ProcessingMethod) {
//!         if method != ProcessingMethod::TextOnly {
//!             self.0.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let config = TriageConfig::builder()
//!     .progress_callback(Arc::new(Rasterised(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::error::DetectorFault;
use crate::pipeline::strategy::ProcessingMethod;
use std::sync::Arc;

/// Called by the document pipeline as it triages each page.
///
/// Pages are processed concurrently, so every method may be called from
/// several threads at once. All methods default to no-ops.
pub trait TriageProgressCallback: Send + Sync {
    /// Called once, with the number of selected pages.
    fn on_triage_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// `page_num` is 1-indexed.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called once per detector that panicked or timed out.
    fn on_detector_fault(&self, page_num: usize, fault: &DetectorFault) {
        let _ = (page_num, fault);
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize, method: ProcessingMethod) {
        let _ = (page_num, total_pages, method);
    }

    /// Called once after every selected page has a report.
    fn on_triage_complete(&self, total_pages: usize, rasterised_pages: usize) {
        let _ = (total_pages, rasterised_pages);
    }
}

/// A callback that ignores every event.
pub struct NoopProgressCallback;

impl TriageProgressCallback for NoopProgressCallback {}

/// The type stored in [`crate::config::TriageConfig`].
pub type ProgressCallback = Arc<dyn TriageProgressCallback>;
