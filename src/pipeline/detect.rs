//! Detector Registry: independent, stateless page classifiers.
//!
//! Each detector looks at one kind of evidence in a [`FeatureCache`] and
//! either stays silent or proposes a [`DetectionCandidate`]. Detectors never
//! see each other's output; combining them is the job of
//! [`crate::pipeline::fusion`].
//!
//! ## Registration order
//!
//! [`DetectorId`] fixes the order detectors are registered in. Fusion sorts
//! candidates by it before doing anything else, so equal confidences are
//! always broken the same way no matter which detector finished first.
//!
//! ## Running
//!
//! * [`DetectorRegistry::run_sequential`] runs the quick text-only screen
//!   first and stops there when it fires.
//! * [`DetectorRegistry::run_concurrent`] runs the remaining detectors on
//!   the blocking pool, each under its own `tokio::time::timeout`. A detector
//!   that panics or overruns becomes a [`DetectorFault`] and contributes no
//!   candidate.

use crate::config::TriageConfig;
use crate::error::DetectorFault;
use crate::pipeline::features::FeatureCache;
use crate::pipeline::text::{count_keywords, quick_screen, TextPatterns};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Identity of a registered detector. Declaration order is registration
/// order and the tie-break order used by fusion.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DetectorId {
    TextOnly,
    Flowchart,
    Table,
    EmbeddedImage,
    Diagram,
}

impl DetectorId {
    pub const ALL: [DetectorId; 5] = [
        DetectorId::TextOnly,
        DetectorId::Flowchart,
        DetectorId::Table,
        DetectorId::EmbeddedImage,
        DetectorId::Diagram,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DetectorId::TextOnly => "text_only",
            DetectorId::Flowchart => "flowchart",
            DetectorId::Table => "table",
            DetectorId::EmbeddedImage => "embedded_image",
            DetectorId::Diagram => "diagram",
        }
    }
}

impl fmt::Display for DetectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a candidate (or a whole page) is judged to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FigureKind {
    Table,
    Flowchart,
    Diagram,
    EmbeddedImage,
    TextOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

/// One detector's verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionCandidate {
    pub detector: DetectorId,
    pub kind: FigureKind,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub complexity: Complexity,
    pub reasons: Vec<String>,
    /// Signal name → count, for auditing.
    pub details: BTreeMap<String, usize>,
}

impl DetectionCandidate {
    fn new(detector: DetectorId, kind: FigureKind, confidence: f64, complexity: Complexity) -> Self {
        Self {
            detector,
            kind,
            confidence: clamp_unit(confidence),
            complexity,
            reasons: Vec::new(),
            details: BTreeMap::new(),
        }
    }

    fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }

    fn detail(mut self, key: &str, value: usize) -> Self {
        self.details.insert(key.to_string(), value);
        self
    }
}

/// Clamp into `[0, 1]`; NaN becomes 0.
pub fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// A pure page classifier.
pub trait Detector: Send + Sync {
    fn id(&self) -> DetectorId;

    fn name(&self) -> &'static str {
        self.id().name()
    }

    /// Return a candidate, or `None` when this detector's evidence is absent.
    fn detect(&self, cache: &FeatureCache) -> Option<DetectionCandidate>;
}

// ── Detectors ────────────────────────────────────────────────────────────

/// Quick screen for plain text pages.
pub struct TextOnlyDetector {
    patterns: Arc<TextPatterns>,
    config: Arc<TriageConfig>,
}

impl TextOnlyDetector {
    pub fn new(patterns: Arc<TextPatterns>, config: Arc<TriageConfig>) -> Self {
        Self { patterns, config }
    }
}

impl Detector for TextOnlyDetector {
    fn id(&self) -> DetectorId {
        DetectorId::TextOnly
    }

    fn detect(&self, cache: &FeatureCache) -> Option<DetectionCandidate> {
        let screen = quick_screen(cache, &self.patterns, &self.config);
        if !screen.is_text_only(self.config.quick_text_density_threshold) {
            return None;
        }
        // Pages that only mention figures by reference are slightly less sure.
        let confidence = if screen.mentions.has_figure_number {
            0.9
        } else {
            0.95
        };
        let mut candidate = DetectionCandidate::new(
            DetectorId::TextOnly,
            FigureKind::TextOnly,
            confidence,
            Complexity::Simple,
        )
        .reason(format!(
            "text density {:.2} above {:.2}",
            screen.text_density, self.config.quick_text_density_threshold
        ));
        if screen.mentions.has_reference {
            candidate = candidate.reason("figure numbers only referenced, no caption");
        }
        Some(candidate)
    }
}

pub struct TableDetector {
    min_cells: usize,
}

impl TableDetector {
    pub fn new(config: &TriageConfig) -> Self {
        Self {
            min_cells: config.min_table_cells,
        }
    }
}

impl Detector for TableDetector {
    fn id(&self) -> DetectorId {
        DetectorId::Table
    }

    fn detect(&self, cache: &FeatureCache) -> Option<DetectionCandidate> {
        let tables: Vec<_> = cache.tables_with_cells(self.min_cells).collect();
        if tables.is_empty() {
            return None;
        }
        let max_cells = tables.iter().map(|t| t.cell_count).max().unwrap_or(0);
        let complexity = if tables.len() == 1 {
            Complexity::Simple
        } else {
            Complexity::Medium
        };
        Some(
            DetectionCandidate::new(DetectorId::Table, FigureKind::Table, 0.9, complexity)
                .reason(format!("{} table(s) found", tables.len()))
                .detail("tables", tables.len())
                .detail("max_cells", max_cells),
        )
    }
}

/// Boxes joined by arrows. The arrow count is estimated from line segments
/// (`lines / lines_per_arrow`); arrowheads are not validated geometrically.
pub struct FlowchartDetector {
    min_rects: usize,
    min_arrows: usize,
    lines_per_arrow: usize,
    keywords: Vec<String>,
}

impl FlowchartDetector {
    pub fn new(config: &TriageConfig) -> Self {
        Self {
            min_rects: config.min_flowchart_rects,
            min_arrows: config.min_flowchart_arrows,
            lines_per_arrow: config.lines_per_arrow.max(1),
            keywords: config.flowchart_keywords.clone(),
        }
    }
}

impl Detector for FlowchartDetector {
    fn id(&self) -> DetectorId {
        DetectorId::Flowchart
    }

    fn detect(&self, cache: &FeatureCache) -> Option<DetectionCandidate> {
        let counts = cache.shape_counts();
        let arrows = counts.lines / self.lines_per_arrow;
        if counts.rects < self.min_rects || arrows < self.min_arrows {
            return None;
        }
        let keyword_hits = count_keywords(cache.text(), &self.keywords);
        let confidence = (0.6 + 0.1 * arrows as f64 + 0.05 * keyword_hits as f64).min(1.0);
        let complexity = if arrows > 5 {
            Complexity::Complex
        } else {
            Complexity::Medium
        };
        let mut candidate = DetectionCandidate::new(
            DetectorId::Flowchart,
            FigureKind::Flowchart,
            confidence,
            complexity,
        )
        .reason(format!("{} boxes and ~{} arrows", counts.rects, arrows))
        .detail("rects", counts.rects)
        .detail("lines", counts.lines)
        .detail("arrows", arrows)
        .detail("keyword_matches", keyword_hits);
        if keyword_hits > 0 {
            candidate = candidate.reason(format!("{keyword_hits} flowchart keyword(s) in text"));
        }
        Some(candidate)
    }
}

pub struct EmbeddedImageDetector {
    min_size: u32,
}

impl EmbeddedImageDetector {
    pub fn new(config: &TriageConfig) -> Self {
        Self {
            min_size: config.embedded_image_min_size,
        }
    }
}

impl Detector for EmbeddedImageDetector {
    fn id(&self) -> DetectorId {
        DetectorId::EmbeddedImage
    }

    fn detect(&self, cache: &FeatureCache) -> Option<DetectionCandidate> {
        let count = cache.significant_images(self.min_size).count();
        if count == 0 {
            return None;
        }
        Some(
            DetectionCandidate::new(
                DetectorId::EmbeddedImage,
                FigureKind::EmbeddedImage,
                0.95,
                Complexity::Medium,
            )
            .reason(format!(
                "{count} embedded image(s) larger than {0}x{0}",
                self.min_size
            ))
            .detail("images", count),
        )
    }
}

pub struct DiagramDetector {
    min_shapes: usize,
}

impl DiagramDetector {
    pub fn new(config: &TriageConfig) -> Self {
        Self {
            min_shapes: config.min_diagram_shapes,
        }
    }
}

impl Detector for DiagramDetector {
    fn id(&self) -> DetectorId {
        DetectorId::Diagram
    }

    fn detect(&self, cache: &FeatureCache) -> Option<DetectionCandidate> {
        let counts = cache.shape_counts();
        let total = counts.total();
        if total < self.min_shapes {
            return None;
        }
        let confidence = (0.4 + 0.02 * total as f64).min(0.8);
        let complexity = if total > 20 {
            Complexity::Complex
        } else {
            Complexity::Medium
        };
        Some(
            DetectionCandidate::new(
                DetectorId::Diagram,
                FigureKind::Diagram,
                confidence,
                complexity,
            )
            .reason(format!("{total} vector shapes"))
            .detail("rects", counts.rects)
            .detail("lines", counts.lines)
            .detail("curves", counts.curves),
        )
    }
}

// ── Registry ─────────────────────────────────────────────────────────────

/// Candidates produced by one registry run, plus any faults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectorRun {
    pub candidates: Vec<DetectionCandidate>,
    pub faults: Vec<DetectorFault>,
}

/// The fixed set of detectors, in registration order.
#[derive(Clone)]
pub struct DetectorRegistry {
    detectors: Vec<Arc<dyn Detector>>,
}

impl fmt::Debug for DetectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.detectors.iter().map(|d| d.name()))
            .finish()
    }
}

impl DetectorRegistry {
    /// The five built-in detectors.
    pub fn new(config: Arc<TriageConfig>, patterns: Arc<TextPatterns>) -> Self {
        Self::with_detectors(vec![
            Arc::new(TextOnlyDetector::new(patterns, Arc::clone(&config))),
            Arc::new(FlowchartDetector::new(&config)),
            Arc::new(TableDetector::new(&config)),
            Arc::new(EmbeddedImageDetector::new(&config)),
            Arc::new(DiagramDetector::new(&config)),
        ])
    }

    /// A registry over arbitrary detectors, ordered by [`DetectorId`]
    /// (stable for equal ids).
    pub fn with_detectors(mut detectors: Vec<Arc<dyn Detector>>) -> Self {
        detectors.sort_by_key(|d| d.id());
        Self { detectors }
    }

    pub fn detectors(&self) -> &[Arc<dyn Detector>] {
        &self.detectors
    }

    fn quick(&self) -> impl Iterator<Item = &Arc<dyn Detector>> {
        self.detectors
            .iter()
            .filter(|d| d.id() == DetectorId::TextOnly)
    }

    fn full(&self) -> impl Iterator<Item = &Arc<dyn Detector>> {
        self.detectors
            .iter()
            .filter(|d| d.id() != DetectorId::TextOnly)
    }

    /// Run the quick screen on the calling thread. True when it fired.
    fn run_quick(&self, cache: &FeatureCache, run: &mut DetectorRun) -> bool {
        let before = run.candidates.len();
        for detector in self.quick() {
            run_guarded(detector.as_ref(), cache, run);
        }
        run.candidates.len() > before
    }

    /// Every detector on the calling thread, quick screen first. When the
    /// quick screen fires the rest are skipped.
    pub fn run_sequential(&self, cache: &FeatureCache) -> DetectorRun {
        let mut run = DetectorRun::default();
        if self.run_quick(cache, &mut run) {
            debug!("Page {}: quick text screen fired", cache.page_index() + 1);
            return run;
        }
        for detector in self.full() {
            run_guarded(detector.as_ref(), cache, &mut run);
        }
        run
    }

    /// Every detector with no short-circuit, on the calling thread.
    pub fn run_all(&self, cache: &FeatureCache) -> DetectorRun {
        let mut run = DetectorRun::default();
        for detector in &self.detectors {
            run_guarded(detector.as_ref(), cache, &mut run);
        }
        run
    }

    /// Quick screen inline, then the other detectors concurrently on the
    /// blocking pool, each bounded by `timeout`.
    pub async fn run_concurrent(&self, cache: Arc<FeatureCache>, timeout: Duration) -> DetectorRun {
        let mut run = DetectorRun::default();
        if self.run_quick(&cache, &mut run) {
            debug!("Page {}: quick text screen fired", cache.page_index() + 1);
            return run;
        }

        let tasks = self.full().map(|detector| {
            let detector = Arc::clone(detector);
            let cache = Arc::clone(&cache);
            async move {
                let name = detector.name();
                let handle = tokio::task::spawn_blocking(move || detector.detect(&cache));
                match tokio::time::timeout(timeout, handle).await {
                    Ok(Ok(candidate)) => Ok(candidate),
                    Ok(Err(join_err)) => Err(DetectorFault::Panicked {
                        detector: name.to_string(),
                        detail: join_err.to_string(),
                    }),
                    Err(_) => Err(DetectorFault::TimedOut {
                        detector: name.to_string(),
                        millis: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    }),
                }
            }
        });

        // join_all keeps registration order regardless of completion order.
        for outcome in join_all(tasks).await {
            match outcome {
                Ok(Some(candidate)) => run.candidates.push(candidate),
                Ok(None) => {}
                Err(fault) => {
                    warn!("Page {}: {}", cache.page_index() + 1, fault);
                    run.faults.push(fault);
                }
            }
        }
        run
    }
}

fn run_guarded(detector: &dyn Detector, cache: &FeatureCache, run: &mut DetectorRun) {
    match catch_unwind(AssertUnwindSafe(|| detector.detect(cache))) {
        Ok(Some(candidate)) => run.candidates.push(candidate),
        Ok(None) => {}
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            let fault = DetectorFault::Panicked {
                detector: detector.name().to_string(),
                detail,
            };
            warn!("Page {}: {}", cache.page_index() + 1, fault);
            run.faults.push(fault);
        }
    }
}
