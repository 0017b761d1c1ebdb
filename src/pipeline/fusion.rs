//! Fusion: one [`PageClassification`] from a set of candidates.
//!
//! The input is treated as a set. Candidates are first sorted by
//! [`DetectorId`], and every later choice uses only content (confidence,
//! detector identity, page evidence). Running the detectors in any order,
//! or concurrently with any completion order, gives the same result.
//!
//! Rules, first match wins:
//!
//! | Rule | When | Result |
//! |------|------|--------|
//! | `QuickText` | a text-only candidate is present and the quick screen re-validates | text only |
//! | `VisualGate` | no shapes, tables or significant images, but a figure number matched | text only, the number counts as a reference |
//! | `CaptionWithVisuals` | an actual caption plus visual evidence | table, else flowchart, else diagram, else a synthesised diagram |
//! | `HighestConfidence` | any other candidate fired | strictly highest confidence, ties to the earlier detector |
//! | `NoEvidence` | nothing fired | text only, confidence 50, "insufficient evidence" |

use crate::config::TriageConfig;
use crate::pipeline::detect::{clamp_unit, Complexity, DetectionCandidate, DetectorId, FigureKind};
use crate::pipeline::features::{FeatureCache, ShapeCounts};
use crate::pipeline::text::{quick_screen, QuickScreen, TextPatterns};
use serde::Serialize;
use std::fmt;

/// Confidence given to a synthesised diagram verdict when a caption sits
/// next to visual evidence no detector claimed.
const CAPTIONED_VISUAL_CONFIDENCE: f64 = 0.75;

/// Confidence of the visual-element gate verdict.
const VISUAL_GATE_CONFIDENCE: f64 = 0.9;

/// Aggregate confidence when nothing fired, on the 0–100 scale.
pub const NO_EVIDENCE_CONFIDENCE: f64 = 50.0;

pub const INSUFFICIENT_EVIDENCE: &str = "insufficient evidence";

/// Page-level signals fusion needs besides the candidates. Computed from
/// the cache, so it is identical whether or not the detectors
/// short-circuited.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageEvidence {
    pub screen: QuickScreen,
    pub shape_counts: ShapeCounts,
    /// Tables meeting `min_table_cells`.
    pub table_count: usize,
    /// Cells summed over those tables.
    pub total_table_cells: usize,
    /// Images whose dimensions both exceed `embedded_image_min_size`.
    pub significant_image_count: usize,
    pub has_complex_layout: bool,
}

impl PageEvidence {
    /// Any shape, qualifying table or significant image.
    pub fn has_visual_evidence(&self) -> bool {
        self.shape_counts.total() > 0 || self.table_count > 0 || self.significant_image_count > 0
    }
}

pub fn gather_evidence(
    cache: &FeatureCache,
    patterns: &TextPatterns,
    config: &TriageConfig,
) -> PageEvidence {
    let tables: Vec<_> = cache.tables_with_cells(config.min_table_cells).collect();
    PageEvidence {
        screen: quick_screen(cache, patterns, config),
        shape_counts: cache.shape_counts(),
        table_count: tables.len(),
        total_table_cells: tables.iter().map(|t| t.cell_count).sum(),
        significant_image_count: cache
            .significant_images(config.embedded_image_min_size)
            .count(),
        has_complex_layout: is_complex_layout(cache, config),
    }
}

/// More than `complex_layout_min_blocks` text blocks whose left edges or top
/// edges are spread wide apart.
pub fn is_complex_layout(cache: &FeatureCache, config: &TriageConfig) -> bool {
    let blocks = cache.text_blocks();
    if blocks.len() <= config.complex_layout_min_blocks {
        return false;
    }
    let spread = |values: Vec<f64>| {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        max - min
    };
    let x_spread = spread(blocks.iter().map(|b| b.bbox.x0).collect());
    let y_spread = spread(blocks.iter().map(|b| b.bbox.y0).collect());
    x_spread > config.complex_layout_x_spread || y_spread > config.complex_layout_y_spread
}

/// Which fusion rule produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionRule {
    QuickText,
    VisualGate,
    CaptionWithVisuals,
    HighestConfidence,
    NoEvidence,
}

impl fmt::Display for FusionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FusionRule::QuickText => "quick text screen",
            FusionRule::VisualGate => "visual-element gate",
            FusionRule::CaptionWithVisuals => "caption with visuals",
            FusionRule::HighestConfidence => "highest confidence",
            FusionRule::NoEvidence => "no evidence",
        };
        f.write_str(s)
    }
}

/// The page-level verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageClassification {
    pub has_table: bool,
    /// A flowchart or a diagram. Embedded pictures are reported separately.
    pub has_figure: bool,
    pub has_flowchart: bool,
    pub has_embedded_image: bool,
    pub has_diagram: bool,
    pub has_complex_layout: bool,
    pub primary_type: FigureKind,
    /// In `[0, 100]`.
    pub confidence: f64,
    pub complexity: Complexity,
    pub reasons: Vec<String>,
    pub rule: FusionRule,
    /// Cells over every qualifying table. Zero without tables.
    pub total_table_cells: usize,
}

impl PageClassification {
    fn text_only(evidence: &PageEvidence, confidence: f64, rule: FusionRule) -> Self {
        Self {
            has_table: false,
            has_figure: false,
            has_flowchart: false,
            has_embedded_image: false,
            has_diagram: false,
            has_complex_layout: evidence.has_complex_layout,
            primary_type: FigureKind::TextOnly,
            confidence: to_percent(confidence),
            complexity: Complexity::Simple,
            reasons: Vec::new(),
            rule,
            total_table_cells: evidence.total_table_cells,
        }
    }

    /// The default verdict for a page with no usable evidence.
    pub fn insufficient(evidence: &PageEvidence) -> Self {
        let mut c = Self::text_only(evidence, NO_EVIDENCE_CONFIDENCE / 100.0, FusionRule::NoEvidence);
        c.reasons.push(INSUFFICIENT_EVIDENCE.to_string());
        c
    }
}

fn to_percent(unit: f64) -> f64 {
    clamp_unit(unit) * 100.0
}

/// Combine `candidates` into one classification.
pub fn fuse(
    candidates: &[DetectionCandidate],
    evidence: &PageEvidence,
    config: &TriageConfig,
) -> PageClassification {
    let mut sorted: Vec<&DetectionCandidate> = candidates.iter().collect();
    sorted.sort_by_key(|c| c.detector);

    // ── QuickText ────────────────────────────────────────────────────────
    let quick_passes = evidence
        .screen
        .is_text_only(config.quick_text_density_threshold);
    if let Some(text) = sorted.iter().find(|c| c.kind == FigureKind::TextOnly) {
        if quick_passes {
            let mut c = PageClassification::text_only(evidence, text.confidence, FusionRule::QuickText);
            c.reasons = text.reasons.clone();
            return c;
        }
    }
    let visual: Vec<&DetectionCandidate> = sorted
        .into_iter()
        .filter(|c| c.kind != FigureKind::TextOnly)
        .collect();

    // ── VisualGate ───────────────────────────────────────────────────────
    if !evidence.has_visual_evidence() && evidence.screen.mentions.has_figure_number {
        let mut c =
            PageClassification::text_only(evidence, VISUAL_GATE_CONFIDENCE, FusionRule::VisualGate);
        c.reasons
            .push("figure number without visual elements treated as a reference".to_string());
        return c;
    }

    let find = |kind: FigureKind| visual.iter().copied().find(|c| c.kind == kind);
    let has = |kind: FigureKind| visual.iter().any(|c| c.kind == kind);

    let mut classification = PageClassification {
        has_table: has(FigureKind::Table),
        has_figure: has(FigureKind::Flowchart) || has(FigureKind::Diagram),
        has_flowchart: has(FigureKind::Flowchart),
        has_embedded_image: has(FigureKind::EmbeddedImage),
        has_diagram: has(FigureKind::Diagram),
        has_complex_layout: evidence.has_complex_layout,
        primary_type: FigureKind::TextOnly,
        confidence: 0.0,
        complexity: Complexity::Simple,
        reasons: visual.iter().flat_map(|c| c.reasons.iter().cloned()).collect(),
        rule: FusionRule::HighestConfidence,
        total_table_cells: evidence.total_table_cells,
    };

    // ── CaptionWithVisuals ───────────────────────────────────────────────
    if evidence.screen.mentions.has_actual_caption && evidence.has_visual_evidence() {
        classification.rule = FusionRule::CaptionWithVisuals;
        let preferred = find(FigureKind::Table)
            .or_else(|| find(FigureKind::Flowchart))
            .or_else(|| find(FigureKind::Diagram));
        match preferred {
            Some(p) => adopt(&mut classification, p),
            None => {
                classification.primary_type = FigureKind::Diagram;
                classification.confidence = to_percent(CAPTIONED_VISUAL_CONFIDENCE);
                classification.complexity = Complexity::Medium;
                classification.has_diagram = true;
                classification.has_figure = true;
                classification
                    .reasons
                    .push("caption next to unclaimed visual elements".to_string());
            }
        }
        return classification;
    }

    // ── HighestConfidence ────────────────────────────────────────────────
    let mut best: Option<&DetectionCandidate> = None;
    for c in &visual {
        if best.is_none_or(|b| c.confidence > b.confidence) {
            best = Some(c);
        }
    }
    match best {
        Some(b) => {
            adopt(&mut classification, b);
            classification
        }
        None => PageClassification::insufficient(evidence),
    }
}

fn adopt(classification: &mut PageClassification, candidate: &DetectionCandidate) {
    classification.primary_type = candidate.kind;
    classification.confidence = to_percent(candidate.confidence);
    classification.complexity = candidate.complexity;
}
