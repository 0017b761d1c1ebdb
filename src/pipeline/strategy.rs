//! Processing Strategy Selector.
//!
//! A fixed decision table over two questions: are there embedded pictures,
//! and are there tables or figures?
//!
//! | embedded image | table / figure | method |
//! |---|---|---|
//! | no  | no  | `text_only` |
//! | yes | no  | `extract_images` |
//! | no  | yes | `full_page` |
//! | yes | yes | `hybrid` |
//!
//! Table complexity does not change the method. It picks the table path
//! (structured extraction or rasterisation) and flags the page high
//! priority when a rasterised table is involved.

use crate::config::TriageConfig;
use crate::pipeline::fusion::{FusionRule, PageClassification, INSUFFICIENT_EVIDENCE};
use crate::pipeline::regions::{FigureRegion, RegionType};
use crate::prompts::PromptKind;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMethod {
    TextOnly,
    ExtractImages,
    FullPage,
    Hybrid,
}

impl ProcessingMethod {
    /// Confidence of a decision reached through the table (not the default).
    pub fn confidence(self) -> f64 {
        match self {
            ProcessingMethod::TextOnly => 0.95,
            ProcessingMethod::ExtractImages => 0.9,
            ProcessingMethod::FullPage => 0.85,
            ProcessingMethod::Hybrid => 0.8,
        }
    }

    /// Template for the page image, if the page is sent to a model at all.
    pub fn prompt_kind(self) -> Option<PromptKind> {
        match self {
            ProcessingMethod::TextOnly => None,
            ProcessingMethod::ExtractImages => Some(PromptKind::Image),
            ProcessingMethod::FullPage => Some(PromptKind::FullPage),
            ProcessingMethod::Hybrid => Some(PromptKind::HybridPage),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingMethod::TextOnly => "text_only",
            ProcessingMethod::ExtractImages => "extract_images",
            ProcessingMethod::FullPage => "full_page",
            ProcessingMethod::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for ProcessingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the page's tables should be handled downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TablePath {
    /// Extract cells structurally.
    Structured,
    /// Too many cells to trust extraction; rasterise instead.
    Rasterize,
}

/// One page's processing plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingDecision {
    pub method: ProcessingMethod,
    /// Picture regions to crop, for `extract_images` and `hybrid`.
    pub embedded_regions: Vec<FigureRegion>,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub reason: String,
    /// `None` when the page has no table.
    pub table_path: Option<TablePath>,
    /// Informational: a rasterised complex table on a full-page or hybrid page.
    pub high_priority: bool,
    /// Relative processing cost.
    pub estimated_cost: f64,
}

impl ProcessingDecision {
    pub fn prompt_kind(&self) -> Option<PromptKind> {
        self.method.prompt_kind()
    }

    /// Fill in the regions to crop and re-estimate the cost. Only image
    /// regions are kept, and only when the method extracts images.
    pub fn with_regions(mut self, regions: &[FigureRegion], config: &TriageConfig) -> Self {
        self.embedded_regions = match self.method {
            ProcessingMethod::ExtractImages | ProcessingMethod::Hybrid => regions
                .iter()
                .filter(|r| r.region_type == RegionType::Image)
                .cloned()
                .collect(),
            ProcessingMethod::TextOnly | ProcessingMethod::FullPage => Vec::new(),
        };
        self.estimated_cost = estimate_cost(
            self.method,
            self.table_path,
            self.embedded_regions.len(),
            config,
        );
        self
    }
}

/// Decision skeleton for a classification; regions are attached later with
/// [`ProcessingDecision::with_regions`].
pub fn select_strategy(
    classification: &PageClassification,
    config: &TriageConfig,
) -> ProcessingDecision {
    let images = classification.has_embedded_image;
    let visuals = classification.has_table || classification.has_figure;
    let method = match (images, visuals) {
        (false, false) => ProcessingMethod::TextOnly,
        (true, false) => ProcessingMethod::ExtractImages,
        (false, true) => ProcessingMethod::FullPage,
        (true, true) => ProcessingMethod::Hybrid,
    };

    let table_path = classification.has_table.then(|| {
        if classification.total_table_cells > config.complex_table_cell_threshold {
            TablePath::Rasterize
        } else {
            TablePath::Structured
        }
    });
    let high_priority = matches!(
        method,
        ProcessingMethod::FullPage | ProcessingMethod::Hybrid
    ) && table_path == Some(TablePath::Rasterize);

    let (confidence, reason) = if classification.rule == FusionRule::NoEvidence {
        (0.5, INSUFFICIENT_EVIDENCE.to_string())
    } else {
        (method.confidence(), method_reason(method, classification))
    };

    ProcessingDecision {
        method,
        embedded_regions: Vec::new(),
        confidence,
        reason,
        table_path,
        high_priority,
        estimated_cost: estimate_cost(method, table_path, 0, config),
    }
}

fn method_reason(method: ProcessingMethod, c: &PageClassification) -> String {
    match method {
        ProcessingMethod::TextOnly => "no tables, figures or embedded images".to_string(),
        ProcessingMethod::ExtractImages => "embedded images only".to_string(),
        ProcessingMethod::FullPage => format!("{} needs full-page rendering", describe(c)),
        ProcessingMethod::Hybrid => format!("embedded images alongside {}", describe(c)),
    }
}

fn describe(c: &PageClassification) -> &'static str {
    match (c.has_table, c.has_figure) {
        (true, true) => "tables and figures",
        (true, false) => "a table",
        _ => "a figure",
    }
}

/// Relative cost of processing a page with `method`.
///
/// * text only: text cost
/// * full page: structured cost when the page is a simple table, image cost otherwise
/// * extract images: text cost plus structured cost per cropped picture
/// * hybrid: (text + image) × 0.7
pub fn estimate_cost(
    method: ProcessingMethod,
    table_path: Option<TablePath>,
    image_regions: usize,
    config: &TriageConfig,
) -> f64 {
    match method {
        ProcessingMethod::TextOnly => config.text_processing_cost,
        ProcessingMethod::FullPage => {
            if table_path == Some(TablePath::Structured) {
                config.structured_extraction_cost
            } else {
                config.image_processing_cost
            }
        }
        ProcessingMethod::ExtractImages => {
            config.text_processing_cost
                + config.structured_extraction_cost * image_regions as f64
        }
        ProcessingMethod::Hybrid => {
            (config.text_processing_cost + config.image_processing_cost) * 0.7
        }
    }
}
