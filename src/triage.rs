//! The triage engine and the eager (full-document) entry points.
//!
//! [`TriageEngine`] exposes each stage as a pure per-page operation, so a
//! caller with its own orchestration can run only what it needs. The
//! document functions wire those stages into a bounded worker pool.
//!
//! ## Why eager vs. streaming?
//!
//! [`triage_document`] waits for every page and returns the reports sorted
//! with document statistics. Use [`crate::stream::triage_stream`] to act on
//! pages as soon as each is ready.

use crate::config::TriageConfig;
use crate::document::DocumentAccess;
use crate::error::TriageError;
use crate::geometry::PageBounds;
use crate::output::{PageReport, TriageOutput, TriageStats};
use crate::pipeline::detect::{DetectorRegistry, DetectorRun};
use crate::pipeline::features::{build_feature_cache, FeatureCache};
use crate::pipeline::fusion::{fuse, gather_evidence, PageClassification, PageEvidence};
use crate::pipeline::merge;
use crate::pipeline::regions::{self, FigureRegion};
use crate::pipeline::strategy::{self, ProcessingDecision};
use crate::pipeline::text::TextPatterns;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Compiled configuration plus the detector registry. Cheap to clone.
#[derive(Debug, Clone)]
pub struct TriageEngine {
    config: Arc<TriageConfig>,
    patterns: Arc<TextPatterns>,
    registry: DetectorRegistry,
}

impl TriageEngine {
    /// Validate `config`, compile its patterns and register the detectors.
    ///
    /// This is the only place a configuration error can surface.
    pub fn new(config: TriageConfig) -> Result<Self, TriageError> {
        config.validate()?;
        let config = Arc::new(config);
        let patterns = Arc::new(TextPatterns::from_config(&config)?);
        let registry = DetectorRegistry::new(Arc::clone(&config), Arc::clone(&patterns));
        Ok(Self {
            config,
            patterns,
            registry,
        })
    }

    /// Replace the built-in detectors, e.g. to add a custom one.
    pub fn with_registry(mut self, registry: DetectorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    pub fn registry(&self) -> &DetectorRegistry {
        &self.registry
    }

    // ── Per-page operations ──────────────────────────────────────────────

    pub fn build_feature_cache(&self, doc: &dyn DocumentAccess, page: usize) -> FeatureCache {
        build_feature_cache(doc, page)
    }

    pub fn evidence(&self, cache: &FeatureCache) -> PageEvidence {
        gather_evidence(cache, &self.patterns, &self.config)
    }

    /// Classify on the calling thread, short-circuiting on the quick screen.
    pub fn classify_page(&self, cache: &FeatureCache) -> PageClassification {
        let run = self.registry.run_sequential(cache);
        fuse(&run.candidates, &self.evidence(cache), &self.config)
    }

    /// Classify with the detectors running concurrently, each bounded by
    /// `detector_timeout_ms`. Faulted detectors are reported alongside.
    pub async fn classify_page_concurrent(
        &self,
        cache: Arc<FeatureCache>,
    ) -> (PageClassification, DetectorRun) {
        let timeout = Duration::from_millis(self.config.detector_timeout_ms);
        let run = self.registry.run_concurrent(Arc::clone(&cache), timeout).await;
        let classification = fuse(&run.candidates, &self.evidence(&cache), &self.config);
        (classification, run)
    }

    /// Decision skeleton; attach regions with
    /// [`ProcessingDecision::with_regions`].
    pub fn select_strategy(&self, classification: &PageClassification) -> ProcessingDecision {
        strategy::select_strategy(classification, &self.config)
    }

    /// Candidate regions, clamped to `bounds`.
    pub fn detect_regions(&self, cache: &FeatureCache, bounds: PageBounds) -> Vec<FigureRegion> {
        regions::detect_regions(cache, bounds, &self.config)
    }

    /// Merge overlapping regions and caption them from the page's text blocks.
    pub fn merge_and_caption(
        &self,
        regions: &[FigureRegion],
        cache: &FeatureCache,
    ) -> Vec<FigureRegion> {
        merge::merge_and_caption(
            regions,
            cache.text_blocks(),
            &self.patterns,
            self.config.caption_band_height,
        )
    }

    /// Every stage for one page, sequentially on the calling thread.
    pub fn triage_page(&self, doc: &dyn DocumentAccess, page: usize) -> PageReport {
        let start = Instant::now();
        let cache = self.build_feature_cache(doc, page);
        let run = self.registry.run_sequential(&cache);
        self.finish_page(&cache, run, start)
    }

    /// Every stage for one page, with concurrent detectors.
    ///
    /// Reading the page and the stages after the detectors run on the
    /// blocking pool. A backend that panics while the page is read yields
    /// the default decision with every signal unavailable.
    pub async fn triage_page_concurrent(
        &self,
        doc: Arc<dyn DocumentAccess>,
        page: usize,
    ) -> PageReport {
        let start = Instant::now();
        let cache = tokio::task::spawn_blocking(move || build_feature_cache(doc.as_ref(), page))
            .await
            .unwrap_or_else(|e| {
                warn!("Page {}: reading page signals panicked: {}", page + 1, e);
                FeatureCache::unreadable(page)
            });
        let cache = Arc::new(cache);

        let timeout = Duration::from_millis(self.config.detector_timeout_ms);
        let run = self.registry.run_concurrent(Arc::clone(&cache), timeout).await;

        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.finish_page(&cache, run, start))
            .await
            .unwrap_or_else(|e| {
                warn!("Page {}: region analysis panicked: {}", page + 1, e);
                self.finish_page(&FeatureCache::unreadable(page), DetectorRun::default(), start)
            })
    }

    fn finish_page(&self, cache: &FeatureCache, run: DetectorRun, start: Instant) -> PageReport {
        let evidence = self.evidence(cache);
        let classification = fuse(&run.candidates, &evidence, &self.config);
        let candidates = self.detect_regions(cache, cache.bounds());
        let regions = self.merge_and_caption(&candidates, cache);
        let decision = self
            .select_strategy(&classification)
            .with_regions(&regions, &self.config);

        debug!(
            "Page {}: {} ({:?}, {:.0}%), {} region(s) [{}]",
            cache.page_index() + 1,
            decision.method,
            classification.primary_type,
            classification.confidence,
            regions.len(),
            classification.rule
        );

        PageReport {
            page_num: cache.page_index() + 1,
            classification,
            decision,
            regions,
            evidence,
            detector_faults: run.faults,
            unavailable_signals: cache.unavailable().to_vec(),
            duration_ms: elapsed_ms(start),
        }
    }

    /// 0-indexed pages selected by the configuration.
    pub(crate) fn selected_pages(&self, doc: &dyn DocumentAccess) -> Result<Vec<usize>, TriageError> {
        let total = doc.page_count();
        let indices = self.config.pages.to_indices(total);
        if indices.is_empty() {
            return Err(TriageError::PageOutOfRange { page: 0, total });
        }
        Ok(indices)
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Triage the selected pages of `doc` on a bounded worker pool.
///
/// # Errors
/// Only when the page selection matches no page. Individual pages never
/// fail; their worst outcome is the default decision.
pub async fn triage_document(
    doc: Arc<dyn DocumentAccess>,
    engine: &TriageEngine,
) -> Result<TriageOutput, TriageError> {
    let total_start = Instant::now();
    let total_pages = doc.page_count();
    let indices = engine.selected_pages(doc.as_ref())?;
    let selected = indices.len();
    let workers = engine.config().worker_count();
    info!(
        "Triaging {} of {} pages with {} workers",
        selected, total_pages, workers
    );

    let callback = engine.config().progress_callback.clone();
    if let Some(ref cb) = callback {
        cb.on_triage_start(selected);
    }

    let mut pages: Vec<PageReport> = stream::iter(indices.into_iter().map(|idx| {
        let callback = callback.clone();
        let doc = Arc::clone(&doc);
        async move {
            let page_num = idx + 1;
            if let Some(ref cb) = callback {
                cb.on_page_start(page_num, selected);
            }
            let report = engine.triage_page_concurrent(doc, idx).await;
            if let Some(ref cb) = callback {
                for fault in &report.detector_faults {
                    cb.on_detector_fault(page_num, fault);
                }
                cb.on_page_complete(page_num, selected, report.decision.method);
            }
            report
        }
    }))
    .buffer_unordered(workers)
    .collect()
    .await;

    pages.sort_by_key(|p| p.page_num);

    let stats = TriageStats::from_reports(&pages, total_pages, elapsed_ms(total_start));
    info!(
        "Triage complete: {} pages, {} need rendering, {} region(s), {}ms",
        stats.triaged_pages,
        stats.rasterised_pages(),
        stats.table_regions + stats.image_regions + stats.figure_regions,
        stats.total_duration_ms
    );

    if let Some(ref cb) = callback {
        cb.on_triage_complete(selected, stats.rasterised_pages());
    }

    Ok(TriageOutput { pages, stats })
}

/// Synchronous wrapper around [`triage_document`].
///
/// Creates a temporary tokio runtime internally.
pub fn triage_document_sync(
    doc: Arc<dyn DocumentAccess>,
    engine: &TriageEngine,
) -> Result<TriageOutput, TriageError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| TriageError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(triage_document(doc, engine))
}

/// Triage `doc` and write the [`TriageOutput`] as pretty JSON.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn triage_to_file(
    doc: Arc<dyn DocumentAccess>,
    engine: &TriageEngine,
    output_path: impl AsRef<Path>,
) -> Result<TriageStats, TriageError> {
    let output = triage_document(doc, engine).await?;
    let path = output_path.as_ref();
    let write_err = |e: std::io::Error| TriageError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| TriageError::Internal(format!("Failed to serialise output: {e}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    Ok(output.stats)
}
