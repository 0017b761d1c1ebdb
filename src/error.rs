//! Error types for the edgequake-pagetriage library.
//!
//! Three distinct error types reflect three distinct failure modes:
//!
//! * [`TriageError`]: fatal, the run cannot start or finish at all
//!   (invalid configuration, unreadable snapshot, output not writable).
//!   Returned as `Err(TriageError)` from [`crate::TriageEngine::new`] and the
//!   document-level `triage*` functions.
//!
//! * [`AccessError`]: signal unavailable, one Document Access Library
//!   query failed for one page. The feature cache substitutes an empty signal
//!   and records the failure; the page is still classified.
//!
//! * [`DetectorFault`]: detector fault, a detector panicked or ran past
//!   its timeout. The candidate is treated as absent and the fault is stored
//!   on [`crate::output::PageReport`].
//!
//! Nothing below `TriageError` ever aborts a page. The worst a single page can
//! end up with is the default decision (`text_only`, confidence 0.5).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pagetriage library.
#[derive(Debug, Error)]
pub enum TriageError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// A threshold is out of range or a pattern does not compile.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A config file could not be read.
    #[error("Failed to read config file '{path}': {source}")]
    ConfigReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Input errors ──────────────────────────────────────────────────────
    /// The snapshot file could not be read.
    #[error("Failed to read document snapshot '{path}': {source}")]
    SnapshotReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot (or config) JSON is malformed.
    #[error("Malformed JSON in '{origin}': {detail}")]
    MalformedJson { origin: String, detail: String },

    /// Page selection resolved to no pages of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The page signal a Document Access Library query was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    PageBounds,
    Text,
    TextBlocks,
    ShapePrimitives,
    Tables,
    EmbeddedImages,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Signal::PageBounds => "page bounds",
            Signal::Text => "text",
            Signal::TextBlocks => "text blocks",
            Signal::ShapePrimitives => "shape primitives",
            Signal::Tables => "tables",
            Signal::EmbeddedImages => "embedded images",
        };
        f.write_str(name)
    }
}

/// A failed Document Access Library query.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum AccessError {
    /// The backend cannot produce this signal at all.
    #[error("{signal} not supported by the document backend")]
    Unsupported { signal: Signal },

    /// The page content for this signal could not be interpreted.
    #[error("malformed {signal}: {detail}")]
    Malformed { signal: Signal, detail: String },

    /// The page does not exist.
    #[error("page {page} out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },
}

/// A detector that failed to produce a verdict.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum DetectorFault {
    /// The detector ran past its per-detector budget.
    #[error("{detector} timed out after {millis}ms")]
    TimedOut { detector: String, millis: u64 },

    /// The detector panicked.
    #[error("{detector} panicked: {detail}")]
    Panicked { detector: String, detail: String },
}
