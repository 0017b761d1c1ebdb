//! # edgequake-pagetriage
//!
//! Decide, page by page, how much visual processing a document deserves, and
//! find the regions worth cropping.
//!
//! ## Why this crate?
//!
//! Rasterising every page and sending it to a vision model is slow and
//! expensive, and most pages of most documents are plain prose. This crate
//! reads the cheap layout signals a PDF library already exposes (text
//! blocks, vector shapes, table geometry, embedded-image metadata) and picks
//! one of four methods per page:
//!
//! | Method | When |
//! |--------|------|
//! | `text_only` | nothing visual on the page |
//! | `extract_images` | only embedded pictures: crop them |
//! | `full_page` | tables or figures: rasterise the page |
//! | `hybrid` | both |
//!
//! It also returns the table, picture and shape-cluster regions on each
//! page, merged and captioned, so an exporter can crop them individually.
//!
//! ## Pipeline Overview
//!
//! ```text
//! DocumentAccess
//!  │
//!  ├─ 1. Features  one read of every page signal (failures degrade to empty)
//!  ├─ 2. Detect    five independent detectors, concurrent, per-detector timeout
//!  ├─ 3. Fusion    order-independent verdict with a recorded rule
//!  ├─ 4. Strategy  decision table → method, table path, cost
//!  ├─ 5. Regions   tables, pictures, greedy shape clusters
//!  └─ 6. Merge     overlap merge + caption from the band beneath
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pagetriage::{triage_document, DocumentSnapshot, TriageConfig, TriageEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let doc = Arc::new(DocumentSnapshot::from_path("document.signals.json")?);
//!     let engine = TriageEngine::new(TriageConfig::default())?;
//!     let output = triage_document(doc, &engine).await?;
//!     for page in &output.pages {
//!         println!("page {}: {}", page.page_num, page.decision.method);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pagetriage` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pagetriage = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod geometry;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod stream;
pub mod triage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PageSelection, TriageConfig, TriageConfigBuilder};
pub use document::{
    DocumentAccess, DocumentSnapshot, EmbeddedImage, PageSnapshot, ShapeKind, ShapePrimitive,
    TableGeometry, TextBlock,
};
pub use error::{AccessError, DetectorFault, Signal, TriageError};
pub use geometry::{BBox, PageBounds, Point};
pub use output::{PageReport, TriageOutput, TriageStats};
pub use pipeline::detect::{
    Complexity, DetectionCandidate, Detector, DetectorId, DetectorRegistry, FigureKind,
};
pub use pipeline::features::{build_feature_cache, FeatureCache};
pub use pipeline::fusion::{FusionRule, PageClassification, PageEvidence};
pub use pipeline::regions::{FigureRegion, RegionType};
pub use pipeline::strategy::{ProcessingDecision, ProcessingMethod, TablePath};
pub use progress::{NoopProgressCallback, ProgressCallback, TriageProgressCallback};
pub use prompts::PromptKind;
pub use stream::{triage_stream, PageStream};
pub use triage::{triage_document, triage_document_sync, triage_to_file, TriageEngine};
