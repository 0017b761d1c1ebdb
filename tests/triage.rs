//! Integration tests: whole pages through the public API.
//!
//! Pages are built in memory with `PageSnapshot`, so nothing here needs a
//! PDF backend.

use edgequake_pagetriage::{
    triage_document, triage_document_sync, triage_stream, triage_to_file, AccessError, BBox,
    DetectionCandidate, Detector, DetectorFault, DetectorId, DetectorRegistry, DocumentAccess,
    DocumentSnapshot, EmbeddedImage, FeatureCache, FigureKind, FusionRule, PageBounds,
    PageSelection, PageSnapshot, ProcessingMethod, RegionType, ShapePrimitive, Signal,
    TableGeometry, TextBlock, TriageConfig, TriageEngine, TriageError, TriageProgressCallback,
};
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Page builders ────────────────────────────────────────────────────────────

fn engine() -> TriageEngine {
    TriageEngine::new(TriageConfig::default()).unwrap()
}

fn block(x0: f64, y0: f64, x1: f64, y1: f64, text: &str) -> TextBlock {
    TextBlock {
        bbox: BBox::new(x0, y0, x1, y1),
        text: text.to_string(),
    }
}

/// Prose that only points at figures elsewhere.
fn reference_page() -> PageSnapshot {
    PageSnapshot::a4().with_lines(
        "The service is split into three tiers.\n\
         See Figure 3 for the deployment layout.\n\
         Each tier scales on its own.",
    )
}

/// Three boxes joined by six line segments, captioned underneath.
fn flowchart_page() -> PageSnapshot {
    let mut shapes = vec![
        ShapePrimitive::rect(100.0, 100.0, 200.0, 160.0),
        ShapePrimitive::rect(110.0, 110.0, 210.0, 170.0),
        ShapePrimitive::rect(120.0, 120.0, 220.0, 180.0),
    ];
    for i in 0..6 {
        let y = 130.0 + i as f64 * 5.0;
        shapes.push(ShapePrimitive::line(150.0, y, 160.0, y));
    }
    PageSnapshot::a4()
        .with_text_blocks(vec![
            block(50.0, 50.0, 545.0, 62.0, "The login sequence is summarised below."),
            block(100.0, 185.0, 300.0, 197.0, "Figure 1: Login flow"),
        ])
        .with_shapes(shapes)
}

fn photo() -> EmbeddedImage {
    EmbeddedImage {
        bbox: Some(BBox::new(100.0, 300.0, 500.0, 600.0)),
        width: 400,
        height: 300,
    }
}

fn photo_page() -> PageSnapshot {
    PageSnapshot::a4().with_images(vec![photo()])
}

fn table_page(cells: usize) -> PageSnapshot {
    PageSnapshot::a4().with_tables(vec![TableGeometry {
        bbox: BBox::new(50.0, 100.0, 545.0, 400.0),
        cell_count: cells,
    }])
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[test]
fn test_reference_only_page_is_text_only() {
    let doc = DocumentSnapshot::new(vec![reference_page()]);
    let report = engine().triage_page(&doc, 0);

    assert_eq!(report.classification.rule, FusionRule::VisualGate);
    assert_eq!(report.classification.primary_type, FigureKind::TextOnly);
    assert!(!report.classification.has_figure);
    assert!(report.evidence.screen.mentions.has_reference);
    assert!(!report.evidence.screen.mentions.has_actual_caption);
    assert_eq!(report.decision.method, ProcessingMethod::TextOnly);
    assert_eq!(report.decision.confidence, 0.95);
    assert!(report.regions.is_empty());
}

#[test]
fn test_japanese_reference_page_is_text_only() {
    let doc = DocumentSnapshot::new(vec![PageSnapshot::a4()
        .with_lines("システムの全体像は図1-1の通りである。\n詳細は図2を参照。")]);
    let report = engine().triage_page(&doc, 0);
    assert_eq!(report.decision.method, ProcessingMethod::TextOnly);
    assert!(report.evidence.screen.mentions.has_figure_number);
    assert!(!report.evidence.screen.mentions.has_actual_caption);
}

#[test]
fn test_captioned_flowchart_needs_full_page() {
    let doc = DocumentSnapshot::new(vec![flowchart_page()]);
    let report = engine().triage_page(&doc, 0);
    let c = &report.classification;

    assert_eq!(c.rule, FusionRule::CaptionWithVisuals);
    assert_eq!(c.primary_type, FigureKind::Flowchart);
    assert!(c.has_flowchart && c.has_figure);
    assert!(!c.has_embedded_image);
    assert!((c.confidence - 80.0).abs() < 1e-9);

    assert_eq!(report.decision.method, ProcessingMethod::FullPage);
    assert!(report.decision.embedded_regions.is_empty());
    assert_eq!(report.decision.table_path, None);
    assert!(!report.decision.high_priority);

    assert_eq!(report.regions.len(), 1);
    let region = &report.regions[0];
    assert_eq!(region.region_type, RegionType::Figure);
    // cluster (100,100)-(220,180) grown by the default 10pt margin
    assert_eq!(region.bbox, BBox::new(90.0, 90.0, 230.0, 190.0));
    assert_eq!(region.caption.as_deref(), Some("Figure 1: Login flow"));
}

#[test]
fn test_japanese_caption_with_photo_is_hybrid() {
    let mut page = flowchart_page().with_text_blocks(vec![
        block(50.0, 50.0, 545.0, 62.0, "ログイン処理の流れを示す。"),
        block(100.0, 185.0, 300.0, 197.0, "図1-1　システム構成"),
    ]);
    page.images = Some(vec![photo()]);
    let doc = DocumentSnapshot::new(vec![page]);
    let report = engine().triage_page(&doc, 0);

    assert!(report.evidence.screen.mentions.has_actual_caption);
    assert_eq!(report.classification.primary_type, FigureKind::Flowchart);
    assert!(report.classification.has_figure);
    assert_eq!(report.decision.method, ProcessingMethod::Hybrid);
    let figure = report
        .regions
        .iter()
        .find(|r| r.region_type == RegionType::Figure)
        .unwrap();
    assert_eq!(figure.caption.as_deref(), Some("図1-1　システム構成"));
}

#[test]
fn test_captioned_photo_without_shapes_is_a_diagram_figure() {
    let page = photo_page().with_text_blocks(vec![block(
        100.0,
        612.0,
        500.0,
        624.0,
        "図1-1　システム構成",
    )]);
    let doc = DocumentSnapshot::new(vec![page]);
    let report = engine().triage_page(&doc, 0);
    let c = &report.classification;

    assert!(report.evidence.screen.mentions.has_actual_caption);
    assert_eq!(c.rule, FusionRule::CaptionWithVisuals);
    assert_eq!(c.primary_type, FigureKind::Diagram);
    assert_eq!(c.confidence, 75.0);
    assert!(c.has_figure && c.has_diagram && c.has_embedded_image);
    assert!(!c.has_table && !c.has_flowchart);

    assert_eq!(report.decision.method, ProcessingMethod::Hybrid);
    assert_eq!(report.decision.embedded_regions.len(), 1);
    assert_eq!(report.regions.len(), 1);
    assert_eq!(
        report.regions[0].caption.as_deref(),
        Some("図1-1　システム構成")
    );
}

#[test]
fn test_single_photo_extracts_one_image_region() {
    let doc = DocumentSnapshot::new(vec![photo_page()]);
    let report = engine().triage_page(&doc, 0);

    assert_eq!(report.classification.primary_type, FigureKind::EmbeddedImage);
    assert!(report.classification.has_embedded_image);
    assert!(!report.classification.has_figure);
    assert_eq!(report.decision.method, ProcessingMethod::ExtractImages);
    assert_eq!(report.decision.confidence, 0.9);

    assert_eq!(report.decision.embedded_regions.len(), 1);
    let region = &report.decision.embedded_regions[0];
    assert_eq!(region.region_type, RegionType::Image);
    assert_eq!(region.bbox, BBox::new(90.0, 290.0, 510.0, 610.0));
    assert_eq!(region.confidence, 0.95);
    assert!((report.decision.estimated_cost - 0.4).abs() < 1e-9);
}

#[test]
fn test_unplaced_photo_still_extracts_but_has_no_region() {
    let image = EmbeddedImage {
        bbox: None,
        ..photo()
    };
    let doc = DocumentSnapshot::new(vec![PageSnapshot::a4().with_images(vec![image])]);
    let report = engine().triage_page(&doc, 0);
    assert_eq!(report.decision.method, ProcessingMethod::ExtractImages);
    assert!(report.decision.embedded_regions.is_empty());
    assert!(report.regions.is_empty());
}

#[test]
fn test_small_table_is_structured() {
    let doc = DocumentSnapshot::new(vec![table_page(5)]);
    let report = engine().triage_page(&doc, 0);

    assert_eq!(report.classification.primary_type, FigureKind::Table);
    assert_eq!(report.classification.total_table_cells, 5);
    assert_eq!(report.decision.method, ProcessingMethod::FullPage);
    assert_eq!(
        report.decision.table_path,
        Some(edgequake_pagetriage::TablePath::Structured)
    );
    assert!(!report.decision.high_priority);
    assert!((report.decision.estimated_cost - 0.3).abs() < 1e-9);
    assert_eq!(report.regions.len(), 1);
    assert_eq!(report.regions[0].region_type, RegionType::Table);
}

#[test]
fn test_large_table_is_rasterised_with_priority() {
    let doc = DocumentSnapshot::new(vec![table_page(35)]);
    let report = engine().triage_page(&doc, 0);

    assert_eq!(report.decision.method, ProcessingMethod::FullPage);
    assert_eq!(
        report.decision.table_path,
        Some(edgequake_pagetriage::TablePath::Rasterize)
    );
    assert!(report.decision.high_priority);
    assert!((report.decision.estimated_cost - 1.0).abs() < 1e-9);
}

#[test]
fn test_two_mid_sized_tables_add_up_to_a_complex_page() {
    let page = PageSnapshot::a4().with_tables(vec![
        TableGeometry {
            bbox: BBox::new(50.0, 100.0, 545.0, 300.0),
            cell_count: 15,
        },
        TableGeometry {
            bbox: BBox::new(50.0, 450.0, 545.0, 650.0),
            cell_count: 15,
        },
    ]);
    let doc = DocumentSnapshot::new(vec![page]);
    let report = engine().triage_page(&doc, 0);

    assert_eq!(report.classification.total_table_cells, 30);
    assert_eq!(report.decision.method, ProcessingMethod::FullPage);
    assert_eq!(
        report.decision.table_path,
        Some(edgequake_pagetriage::TablePath::Rasterize)
    );
    assert!(report.decision.high_priority);
    assert_eq!(report.regions.len(), 2);
}

#[test]
fn test_region_margin_changes_the_emitted_region() {
    let doc = DocumentSnapshot::new(vec![table_page(5)]);
    let region_with = |margin: f64| {
        let config = TriageConfig::builder().region_margin(margin).build().unwrap();
        let report = TriageEngine::new(config).unwrap().triage_page(&doc, 0);
        assert_eq!(report.regions.len(), 1);
        report.regions[0].bbox
    };

    let narrow = region_with(10.0);
    let wide = region_with(40.0);
    assert_ne!(narrow, wide);
    assert_eq!(narrow, BBox::new(40.0, 90.0, 555.0, 410.0));
    assert_eq!(wide, BBox::new(10.0, 60.0, 585.0, 440.0));
    // clamped to the 595pt page width
    assert_eq!(region_with(80.0), BBox::new(0.0, 20.0, 595.0, 480.0));
}

#[test]
fn test_table_and_photo_is_hybrid_and_crops_only_the_photo() {
    let page = table_page(8).with_images(vec![EmbeddedImage {
        bbox: Some(BBox::new(100.0, 450.0, 500.0, 750.0)),
        width: 400,
        height: 300,
    }]);
    let doc = DocumentSnapshot::new(vec![page]);
    let report = engine().triage_page(&doc, 0);

    assert_eq!(report.decision.method, ProcessingMethod::Hybrid);
    assert_eq!(report.regions.len(), 2);
    assert_eq!(report.decision.embedded_regions.len(), 1);
    assert_eq!(
        report.decision.embedded_regions[0].region_type,
        RegionType::Image
    );
    assert!((report.decision.estimated_cost - 0.77).abs() < 1e-9);
}

#[test]
fn test_blank_page_is_insufficient_evidence() {
    let doc = DocumentSnapshot::new(vec![PageSnapshot::a4()]);
    let report = engine().triage_page(&doc, 0);
    assert_eq!(report.classification.rule, FusionRule::NoEvidence);
    assert_eq!(report.classification.confidence, 50.0);
    assert_eq!(report.decision.method, ProcessingMethod::TextOnly);
    assert_eq!(report.decision.confidence, 0.5);
    assert_eq!(report.decision.reason, "insufficient evidence");
}

#[test]
fn test_dense_prose_short_circuits() {
    let doc = DocumentSnapshot::new(vec![PageSnapshot::a4().with_text_blocks(vec![block(
        10.0,
        10.0,
        585.0,
        832.0,
        "Long uninterrupted prose.",
    )])]);
    let report = engine().triage_page(&doc, 0);
    assert_eq!(report.classification.rule, FusionRule::QuickText);
    assert_eq!(report.decision.method, ProcessingMethod::TextOnly);
    assert_eq!(report.decision.confidence, 0.95);
}

// ── Execution modes ──────────────────────────────────────────────────────────

fn mixed_document() -> DocumentSnapshot {
    DocumentSnapshot::new(vec![
        reference_page(),
        flowchart_page(),
        photo_page(),
        table_page(5),
        table_page(35),
        PageSnapshot::a4(),
    ])
}

#[tokio::test]
async fn test_concurrent_matches_sequential() {
    let doc = Arc::new(mixed_document());
    let engine = engine();
    for page in 0..doc.page_count() {
        let seq = engine.triage_page(doc.as_ref(), page);
        let conc = engine.triage_page_concurrent(doc.clone(), page).await;
        assert_eq!(seq.classification, conc.classification, "page {page}");
        assert_eq!(seq.decision, conc.decision, "page {page}");
        assert_eq!(seq.regions, conc.regions, "page {page}");
    }
}

#[test]
fn test_document_reports_are_sorted_with_stats() {
    let output = triage_document_sync(Arc::new(mixed_document()), &engine()).unwrap();
    let nums: Vec<usize> = output.pages.iter().map(|p| p.page_num).collect();
    assert_eq!(nums, vec![1, 2, 3, 4, 5, 6]);

    let s = &output.stats;
    assert_eq!(s.total_pages, 6);
    assert_eq!(s.triaged_pages, 6);
    assert_eq!(s.text_only_pages, 2);
    assert_eq!(s.extract_images_pages, 1);
    assert_eq!(s.full_page_pages, 3);
    assert_eq!(s.hybrid_pages, 0);
    assert_eq!(s.high_priority_pages, 1);
    assert_eq!(s.table_regions, 2);
    assert_eq!(s.image_regions, 1);
    assert_eq!(s.figure_regions, 1);
    assert_eq!(s.captioned_regions, 1);
    assert_eq!(s.rasterised_pages(), 4);
}

#[test]
fn test_page_selection_limits_output() {
    let engine = TriageEngine::new(
        TriageConfig::builder()
            .pages(PageSelection::Range(2, 3))
            .build()
            .unwrap(),
    )
    .unwrap();
    let doc = Arc::new(mixed_document());
    let output = tokio_test::block_on(triage_document(doc, &engine)).unwrap();
    let nums: Vec<usize> = output.pages.iter().map(|p| p.page_num).collect();
    assert_eq!(nums, vec![2, 3]);
    assert_eq!(output.stats.total_pages, 6);
}

#[tokio::test]
async fn test_stream_yields_same_reports() {
    let doc = Arc::new(mixed_document());
    let engine = engine();
    let eager = triage_document(doc.clone(), &engine).await.unwrap();

    let mut streamed: Vec<_> = triage_stream(doc, engine).unwrap().collect().await;
    streamed.sort_by_key(|p| p.page_num);

    assert_eq!(streamed.len(), eager.pages.len());
    for (a, b) in streamed.iter().zip(&eager.pages) {
        assert_eq!(a.decision, b.decision);
        assert_eq!(a.regions, b.regions);
    }
}

// ── Degraded input ───────────────────────────────────────────────────────────

#[test]
fn test_missing_signals_degrade_to_empty() {
    let page = PageSnapshot {
        bounds: Some(PageBounds::new(595.0, 842.0)),
        images: Some(vec![photo()]),
        ..Default::default()
    };
    let doc = DocumentSnapshot::new(vec![page]);
    let report = engine().triage_page(&doc, 0);

    assert_eq!(
        report.unavailable_signals,
        vec![
            Signal::Text,
            Signal::TextBlocks,
            Signal::ShapePrimitives,
            Signal::Tables
        ]
    );
    assert_eq!(report.decision.method, ProcessingMethod::ExtractImages);
    assert_eq!(report.regions.len(), 1);
}

/// A backend whose every query fails.
struct BrokenBackend;

impl DocumentAccess for BrokenBackend {
    fn page_count(&self) -> usize {
        2
    }
    fn page_bounds(&self, _page: usize) -> Result<PageBounds, AccessError> {
        Err(AccessError::Malformed {
            signal: Signal::PageBounds,
            detail: "MediaBox missing".into(),
        })
    }
    fn text(&self, _page: usize) -> Result<String, AccessError> {
        Err(AccessError::Malformed {
            signal: Signal::Text,
            detail: "bad ToUnicode map".into(),
        })
    }
    fn shape_primitives(&self, _page: usize) -> Result<Vec<ShapePrimitive>, AccessError> {
        Err(AccessError::Unsupported {
            signal: Signal::ShapePrimitives,
        })
    }
    fn tables(&self, _page: usize) -> Result<Vec<TableGeometry>, AccessError> {
        Err(AccessError::Unsupported {
            signal: Signal::Tables,
        })
    }
    fn embedded_images(&self, _page: usize) -> Result<Vec<EmbeddedImage>, AccessError> {
        Err(AccessError::Unsupported {
            signal: Signal::EmbeddedImages,
        })
    }
}

#[test]
fn test_failing_backend_gets_default_decisions() {
    let output = triage_document_sync(Arc::new(BrokenBackend), &engine()).unwrap();
    assert_eq!(output.pages.len(), 2);
    for page in &output.pages {
        assert_eq!(page.decision.method, ProcessingMethod::TextOnly);
        assert_eq!(page.decision.reason, "insufficient evidence");
        assert_eq!(page.unavailable_signals.len(), 6);
        assert!(page.regions.is_empty());
    }
    assert_eq!(output.stats.unavailable_signals, 12);
}

/// A backend that panics on every query.
struct PanickingBackend;

impl DocumentAccess for PanickingBackend {
    fn page_count(&self) -> usize {
        1
    }
    fn page_bounds(&self, _page: usize) -> Result<PageBounds, AccessError> {
        panic!("null page dictionary");
    }
    fn text(&self, _page: usize) -> Result<String, AccessError> {
        panic!("null page dictionary");
    }
    fn shape_primitives(&self, _page: usize) -> Result<Vec<ShapePrimitive>, AccessError> {
        panic!("null page dictionary");
    }
    fn tables(&self, _page: usize) -> Result<Vec<TableGeometry>, AccessError> {
        panic!("null page dictionary");
    }
    fn embedded_images(&self, _page: usize) -> Result<Vec<EmbeddedImage>, AccessError> {
        panic!("null page dictionary");
    }
}

#[test]
fn test_panicking_backend_is_contained_on_the_blocking_pool() {
    let output = triage_document_sync(Arc::new(PanickingBackend), &engine()).unwrap();
    assert_eq!(output.pages.len(), 1);
    let page = &output.pages[0];
    assert_eq!(page.decision.method, ProcessingMethod::TextOnly);
    assert_eq!(page.decision.reason, "insufficient evidence");
    assert_eq!(page.unavailable_signals.len(), 6);
    assert!(page.regions.is_empty());
}

struct ExplodingDetector;

impl Detector for ExplodingDetector {
    fn id(&self) -> DetectorId {
        DetectorId::Diagram
    }
    fn detect(&self, _cache: &FeatureCache) -> Option<DetectionCandidate> {
        panic!("corrupt path data");
    }
}

struct AlwaysTable;

impl Detector for AlwaysTable {
    fn id(&self) -> DetectorId {
        DetectorId::Table
    }
    fn detect(&self, _cache: &FeatureCache) -> Option<DetectionCandidate> {
        Some(DetectionCandidate {
            detector: DetectorId::Table,
            kind: FigureKind::Table,
            confidence: 0.9,
            complexity: edgequake_pagetriage::Complexity::Simple,
            reasons: vec!["always".into()],
            details: Default::default(),
        })
    }
}

#[derive(Default)]
struct Counting {
    started: AtomicUsize,
    completed: AtomicUsize,
    faults: AtomicUsize,
    finished: AtomicUsize,
}

impl TriageProgressCallback for Counting {
    fn on_triage_start(&self, _total_pages: usize) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }
    fn on_detector_fault(&self, _page_num: usize, _fault: &DetectorFault) {
        self.faults.fetch_add(1, Ordering::SeqCst);
    }
    fn on_page_complete(&self, _page_num: usize, _total: usize, _method: ProcessingMethod) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
    fn on_triage_complete(&self, total_pages: usize, _rasterised: usize) {
        assert_eq!(total_pages, 3);
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_panicking_detector_is_reported_and_others_survive() {
    let counting = Arc::new(Counting::default());
    let config = TriageConfig::builder()
        .progress_callback(counting.clone())
        .build()
        .unwrap();
    let registry = DetectorRegistry::with_detectors(vec![
        Arc::new(ExplodingDetector),
        Arc::new(AlwaysTable),
    ]);
    let engine = TriageEngine::new(config).unwrap().with_registry(registry);
    let doc = DocumentSnapshot::new(vec![table_page(5), table_page(5), table_page(5)]);

    let output = triage_document(Arc::new(doc), &engine).await.unwrap();
    for page in &output.pages {
        assert_eq!(page.classification.primary_type, FigureKind::Table);
        assert_eq!(page.detector_faults.len(), 1);
        assert!(matches!(
            &page.detector_faults[0],
            DetectorFault::Panicked { detector, .. } if detector == "diagram"
        ));
    }
    assert_eq!(output.stats.detector_faults, 3);
    assert_eq!(counting.started.load(Ordering::SeqCst), 1);
    assert_eq!(counting.completed.load(Ordering::SeqCst), 3);
    assert_eq!(counting.faults.load(Ordering::SeqCst), 3);
    assert_eq!(counting.finished.load(Ordering::SeqCst), 1);
}

// ── Files ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_triage_to_file_writes_json_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plans").join("doc.json");

    let stats = triage_to_file(Arc::new(mixed_document()), &engine(), &path)
        .await
        .unwrap();
    assert_eq!(stats.triaged_pages, 6);

    let raw = std::fs::read_to_string(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["pages"].as_array().unwrap().len(), 6);
    assert_eq!(json["pages"][2]["decision"]["method"], "extract_images");
    assert_eq!(json["stats"]["triaged_pages"], 6);
    assert!(!path.with_extension("json.tmp").exists());
}

#[test]
fn test_snapshot_round_trips_through_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.signals.json");
    let doc = mixed_document();
    std::fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();

    let loaded = DocumentSnapshot::from_path(&path).unwrap();
    assert_eq!(loaded, doc);
}

#[test]
fn test_snapshot_null_signal_is_unavailable() {
    let doc = DocumentSnapshot::from_json_str(
        r#"{ "pages": [ { "bounds": { "width": 595.0, "height": 842.0 },
                          "text": "", "text_blocks": [], "shapes": null,
                          "tables": [], "images": [] } ] }"#,
    )
    .unwrap();
    let report = engine().triage_page(&doc, 0);
    assert_eq!(report.unavailable_signals, vec![Signal::ShapePrimitives]);
}

#[test]
fn test_config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("triage.json");
    std::fs::write(&path, r#"{ "min_table_cells": 10, "max_workers": 2 }"#).unwrap();

    let config = TriageConfig::from_json_file(&path).unwrap();
    assert_eq!(config.min_table_cells, 10);
    assert_eq!(config.max_workers, 2);
    assert_eq!(config.min_figure_area, 5000.0);

    // A 5-cell grid no longer counts as a table.
    let engine = TriageEngine::new(config).unwrap();
    let report = engine.triage_page(&DocumentSnapshot::new(vec![table_page(5)]), 0);
    assert!(!report.classification.has_table);
}

#[test]
fn test_config_file_errors() {
    let dir = tempfile::tempdir().unwrap();

    let bad_value = dir.path().join("bad.json");
    std::fs::write(&bad_value, r#"{ "quick_text_density_threshold": 1.5 }"#).unwrap();
    assert!(matches!(
        TriageConfig::from_json_file(&bad_value),
        Err(TriageError::InvalidConfig(_))
    ));

    let bad_json = dir.path().join("broken.json");
    std::fs::write(&bad_json, "{ not json").unwrap();
    assert!(matches!(
        TriageConfig::from_json_file(&bad_json),
        Err(TriageError::MalformedJson { .. })
    ));

    assert!(matches!(
        TriageConfig::from_json_file(dir.path().join("missing.json")),
        Err(TriageError::ConfigReadFailed { .. })
    ));
}
