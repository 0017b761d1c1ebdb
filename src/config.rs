//! Configuration types for page triage.
//!
//! Every threshold the detectors, fusion, strategy selector and region
//! clusterer read lives in [`TriageConfig`], built via its
//! [`TriageConfigBuilder`] or deserialised from JSON. There are no hidden
//! knobs: a stage never probes for an optional setting at its call site.
//!
//! Validation happens once, at startup ([`TriageConfig::validate`], called by
//! both [`TriageConfigBuilder::build`] and [`crate::TriageEngine::new`]).
//! A bad threshold is a systemic misconfiguration and is reported as
//! [`TriageError::InvalidConfig`] before any page is touched.

use crate::error::TriageError;
use crate::progress::ProgressCallback;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Configuration for a triage run.
///
/// # Example
/// ```rust
/// use edgequake_pagetriage::TriageConfig;
///
/// let config = TriageConfig::builder()
///     .quick_text_density_threshold(0.75)
///     .max_workers(4)
///     .min_figure_area(2500.0)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_workers, 4);
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    /// Text-block area over page area above which a page is a quick
    /// text-only candidate. Range: (0, 1]. Default: 0.8.
    pub quick_text_density_threshold: f64,

    /// Pixel count (width × height) above which an embedded image vetoes the
    /// quick text-only gate. Default: 50 000.
    pub quick_image_pixel_threshold: u64,

    /// Tables with fewer cells are ignored by detection. Default: 2.
    ///
    /// A single-cell "table" is a framed box, which the table finder reports
    /// for callouts and page borders.
    pub min_table_cells: usize,

    /// Tables with more cells than this are rasterised at high priority
    /// instead of extracted structurally. Default: 20.
    pub complex_table_cell_threshold: usize,

    /// Minimum rectangle primitives for a flowchart. Default: 3.
    pub min_flowchart_rects: usize,

    /// Minimum estimated arrows for a flowchart. Default: 2.
    pub min_flowchart_arrows: usize,

    /// Line segments assumed to make up one arrow glyph. Default: 3.
    ///
    /// The arrow estimate is `line_count / lines_per_arrow` (integer
    /// division). It is a proxy, not a geometric arrowhead test.
    pub lines_per_arrow: usize,

    /// Minimum rectangles + lines + curves for a diagram. Default: 8.
    pub min_diagram_shapes: usize,

    /// Both pixel dimensions of an embedded image must exceed this for it to
    /// count. Default: 100.
    pub embedded_image_min_size: u32,

    /// Centroid distance under which a shape joins the running cluster.
    /// Default: 50.0 units.
    pub cluster_distance_threshold: f64,

    /// Pages with fewer shape primitives skip clustering. Default: 3.
    pub min_cluster_shapes: usize,

    /// Regions must have a larger area than this to be kept. Default: 5000.0.
    pub min_figure_area: f64,

    /// Margin added around a region when computing its crop box. Default: 10.0.
    pub region_margin: f64,

    /// Height of the strip beneath a region searched for a caption.
    /// Default: 50.0.
    pub caption_band_height: f64,

    /// Per-detector budget when detectors run concurrently. Default: 1000 ms.
    pub detector_timeout_ms: u64,

    /// Upper bound on the page worker pool. The pool size is
    /// `min(available cores, max_workers)`. Default: 8.
    pub max_workers: usize,

    /// A page with more text blocks than this may be a complex layout.
    /// Default: 5.
    pub complex_layout_min_blocks: usize,

    /// Horizontal spread of block left edges marking a complex layout.
    /// Default: 200.0.
    pub complex_layout_x_spread: f64,

    /// Vertical spread of block top edges marking a complex layout.
    /// Default: 300.0.
    pub complex_layout_y_spread: f64,

    /// Relative cost of plain text extraction. Default: 0.1.
    pub text_processing_cost: f64,

    /// Relative cost of structured table extraction or one cropped image.
    /// Default: 0.3.
    pub structured_extraction_cost: f64,

    /// Relative cost of rasterising and analysing a full page. Default: 1.0.
    pub image_processing_cost: f64,

    /// Regexes recognising a figure/table number anywhere in the text.
    pub figure_number_patterns: Vec<String>,

    /// Regexes recognising a line that merely refers to a figure
    /// ("see Figure 3", "図1-1の通り").
    pub reference_patterns: Vec<String>,

    /// Regexes tried in order against the caption band beneath a region.
    /// The whole match becomes the caption.
    pub caption_patterns: Vec<String>,

    /// Any of these in the page text vetoes the quick text-only gate.
    pub force_image_keywords: Vec<String>,

    /// Each one present in the text raises flowchart confidence.
    pub flowchart_keywords: Vec<String>,

    /// Page selection for document-level runs. Default: all pages.
    pub pages: PageSelection,

    /// Optional per-page progress events.
    #[serde(skip)]
    pub progress_callback: Option<ProgressCallback>,
}

fn default_figure_number_patterns() -> Vec<String> {
    [
        r"図\s*\d+[-\.]\d+",
        r"図\s*\d+",
        r"図表\s*\d+[-\.]\d+",
        r"表\s*\d+[-\.]\d+",
        r"(?i)\bfig(?:ure)?\.?\s*\d+(?:[-\.]\d+)?",
        r"(?i)\btable\s+\d+(?:[-\.]\d+)?",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_reference_patterns() -> Vec<String> {
    [
        r"図\s*\d+[-\.]\d+\s*の通り",
        r"図\s*\d+[-\.]\d+\s*を参照",
        r"図\s*\d+[-\.]\d+\s*に示す",
        r"図\s*\d+[-\.]\d+\s*参照",
        r"図\s*\d+\s*の通り",
        r"図\s*\d+\s*を参照",
        r"参考.*図\s*\d+",
        r"前述の図\s*\d+",
        r"次の図\s*\d+",
        r"上記の図\s*\d+",
        r"下記の図\s*\d+",
        r"図\s*\d+[-\.]\d+\s*より",
        r"図\s*\d+[-\.]\d+\s*から",
        r"図\s*\d+[-\.]\d+\s*で示",
        r"については図\s*\d+",
        r"(?i)\bsee\s+(?:the\s+)?(?:fig(?:ure)?\.?|table)\s*\d+",
        r"(?i)\bas\s+shown\s+in\s+(?:fig(?:ure)?\.?|table)\s*\d+",
        r"(?i)\b(?:fig(?:ure)?\.?|table)\s*\d+(?:[-\.]\d+)?\s+(?:above|below)",
        r"(?i)\b(?:refer\s+to|according\s+to)\s+(?:fig(?:ure)?\.?|table)\s*\d+",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_caption_patterns() -> Vec<String> {
    [
        r"図\s*\d+(?:[-\.]\d+)?\s*[：:．\s]\s*\S.*",
        r"図表\s*\d+(?:[-\.]\d+)?\s*[：:．\s]\s*\S.*",
        r"表\s*\d+(?:[-\.]\d+)?\s*[：:．\s]\s*\S.*",
        r"(?i)\bfig(?:ure)?\.?\s*\d+(?:[-\.]\d+)?\s*[:.\-–—]\s*\S.*",
        r"(?i)\btable\s*\d+(?:[-\.]\d+)?\s*[:.\-–—]\s*\S.*",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_force_image_keywords() -> Vec<String> {
    ["フロー図", "ブロック図", "配線図", "回路図"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_flowchart_keywords() -> Vec<String> {
    ["フローチャート", "フロー図", "START", "END", "判定", "分岐"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            quick_text_density_threshold: 0.8,
            quick_image_pixel_threshold: 50_000,
            min_table_cells: 2,
            complex_table_cell_threshold: 20,
            min_flowchart_rects: 3,
            min_flowchart_arrows: 2,
            lines_per_arrow: 3,
            min_diagram_shapes: 8,
            embedded_image_min_size: 100,
            cluster_distance_threshold: 50.0,
            min_cluster_shapes: 3,
            min_figure_area: 5000.0,
            region_margin: 10.0,
            caption_band_height: 50.0,
            detector_timeout_ms: 1000,
            max_workers: 8,
            complex_layout_min_blocks: 5,
            complex_layout_x_spread: 200.0,
            complex_layout_y_spread: 300.0,
            text_processing_cost: 0.1,
            structured_extraction_cost: 0.3,
            image_processing_cost: 1.0,
            figure_number_patterns: default_figure_number_patterns(),
            reference_patterns: default_reference_patterns(),
            caption_patterns: default_caption_patterns(),
            force_image_keywords: default_force_image_keywords(),
            flowchart_keywords: default_flowchart_keywords(),
            pages: PageSelection::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for TriageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriageConfig")
            .field("quick_text_density_threshold", &self.quick_text_density_threshold)
            .field("quick_image_pixel_threshold", &self.quick_image_pixel_threshold)
            .field("min_table_cells", &self.min_table_cells)
            .field("complex_table_cell_threshold", &self.complex_table_cell_threshold)
            .field("min_flowchart_rects", &self.min_flowchart_rects)
            .field("min_flowchart_arrows", &self.min_flowchart_arrows)
            .field("lines_per_arrow", &self.lines_per_arrow)
            .field("min_diagram_shapes", &self.min_diagram_shapes)
            .field("embedded_image_min_size", &self.embedded_image_min_size)
            .field("cluster_distance_threshold", &self.cluster_distance_threshold)
            .field("min_figure_area", &self.min_figure_area)
            .field("region_margin", &self.region_margin)
            .field("caption_band_height", &self.caption_band_height)
            .field("detector_timeout_ms", &self.detector_timeout_ms)
            .field("max_workers", &self.max_workers)
            .field("pages", &self.pages)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn TriageProgressCallback>"),
            )
            .finish()
    }
}

impl TriageConfig {
    /// Create a new builder for `TriageConfig`.
    pub fn builder() -> TriageConfigBuilder {
        TriageConfigBuilder {
            config: Self::default(),
        }
    }

    /// Load a JSON config file. Missing fields take their defaults. The
    /// result is validated.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, TriageError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| TriageError::ConfigReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| TriageError::MalformedJson {
            origin: path.display().to_string(),
            detail: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Page worker pool size: `min(available cores, max_workers)`, at least 1.
    pub fn worker_count(&self) -> usize {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        cores.min(self.max_workers).max(1)
    }

    /// Check every threshold and pattern.
    pub fn validate(&self) -> Result<(), TriageError> {
        let d = self.quick_text_density_threshold;
        if !d.is_finite() || d <= 0.0 || d > 1.0 {
            return Err(invalid(format!(
                "quick_text_density_threshold must be in (0, 1], got {d}"
            )));
        }
        non_negative("min_figure_area", self.min_figure_area)?;
        non_negative("region_margin", self.region_margin)?;
        non_negative("caption_band_height", self.caption_band_height)?;
        non_negative("complex_layout_x_spread", self.complex_layout_x_spread)?;
        non_negative("complex_layout_y_spread", self.complex_layout_y_spread)?;
        non_negative("text_processing_cost", self.text_processing_cost)?;
        non_negative("structured_extraction_cost", self.structured_extraction_cost)?;
        non_negative("image_processing_cost", self.image_processing_cost)?;
        let c = self.cluster_distance_threshold;
        if !c.is_finite() || c <= 0.0 {
            return Err(invalid(format!(
                "cluster_distance_threshold must be > 0, got {c}"
            )));
        }
        if self.lines_per_arrow == 0 {
            return Err(invalid("lines_per_arrow must be ≥ 1".into()));
        }
        if self.max_workers == 0 {
            return Err(invalid("max_workers must be ≥ 1".into()));
        }
        if self.detector_timeout_ms == 0 {
            return Err(invalid("detector_timeout_ms must be ≥ 1".into()));
        }
        for (field, patterns) in [
            ("figure_number_patterns", &self.figure_number_patterns),
            ("reference_patterns", &self.reference_patterns),
            ("caption_patterns", &self.caption_patterns),
        ] {
            for p in patterns {
                Regex::new(p).map_err(|e| invalid(format!("{field}: bad pattern {p:?}: {e}")))?;
            }
        }
        Ok(())
    }
}

fn invalid(msg: String) -> TriageError {
    TriageError::InvalidConfig(msg)
}

fn non_negative(field: &str, value: f64) -> Result<(), TriageError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{field} must be a finite value ≥ 0, got {value}")))
    }
}

/// Builder for [`TriageConfig`].
#[derive(Debug)]
pub struct TriageConfigBuilder {
    config: TriageConfig,
}

impl TriageConfigBuilder {
    pub fn quick_text_density_threshold(mut self, v: f64) -> Self {
        self.config.quick_text_density_threshold = v;
        self
    }

    pub fn quick_image_pixel_threshold(mut self, px: u64) -> Self {
        self.config.quick_image_pixel_threshold = px;
        self
    }

    pub fn min_table_cells(mut self, n: usize) -> Self {
        self.config.min_table_cells = n;
        self
    }

    pub fn complex_table_cell_threshold(mut self, n: usize) -> Self {
        self.config.complex_table_cell_threshold = n;
        self
    }

    pub fn min_flowchart_rects(mut self, n: usize) -> Self {
        self.config.min_flowchart_rects = n;
        self
    }

    pub fn min_flowchart_arrows(mut self, n: usize) -> Self {
        self.config.min_flowchart_arrows = n;
        self
    }

    pub fn lines_per_arrow(mut self, n: usize) -> Self {
        self.config.lines_per_arrow = n;
        self
    }

    pub fn min_diagram_shapes(mut self, n: usize) -> Self {
        self.config.min_diagram_shapes = n;
        self
    }

    pub fn embedded_image_min_size(mut self, px: u32) -> Self {
        self.config.embedded_image_min_size = px;
        self
    }

    pub fn cluster_distance_threshold(mut self, d: f64) -> Self {
        self.config.cluster_distance_threshold = d;
        self
    }

    pub fn min_cluster_shapes(mut self, n: usize) -> Self {
        self.config.min_cluster_shapes = n;
        self
    }

    pub fn min_figure_area(mut self, area: f64) -> Self {
        self.config.min_figure_area = area;
        self
    }

    pub fn region_margin(mut self, margin: f64) -> Self {
        self.config.region_margin = margin;
        self
    }

    pub fn caption_band_height(mut self, h: f64) -> Self {
        self.config.caption_band_height = h;
        self
    }

    pub fn detector_timeout_ms(mut self, ms: u64) -> Self {
        self.config.detector_timeout_ms = ms;
        self
    }

    pub fn max_workers(mut self, n: usize) -> Self {
        self.config.max_workers = n.max(1);
        self
    }

    pub fn figure_number_patterns(mut self, patterns: Vec<String>) -> Self {
        self.config.figure_number_patterns = patterns;
        self
    }

    pub fn reference_patterns(mut self, patterns: Vec<String>) -> Self {
        self.config.reference_patterns = patterns;
        self
    }

    pub fn caption_patterns(mut self, patterns: Vec<String>) -> Self {
        self.config.caption_patterns = patterns;
        self
    }

    pub fn force_image_keywords(mut self, keywords: Vec<String>) -> Self {
        self.config.force_image_keywords = keywords;
        self
    }

    pub fn flowchart_keywords(mut self, keywords: Vec<String>) -> Self {
        self.config.flowchart_keywords = keywords;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TriageConfig, TriageError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the document to triage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// All pages (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}
