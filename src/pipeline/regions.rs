//! Region Detector & Clusterer.
//!
//! Finds rectangles worth cropping out of a page, independently of the page
//! classification: one region per table, one per significant embedded image,
//! and one per cluster of nearby vector shapes.
//!
//! Shape clustering is a single greedy pass over the shapes in discovery
//! order. The running cluster absorbs the next shape when the two centres
//! are closer than `cluster_distance_threshold`; otherwise the cluster is
//! closed and the shape starts a new one. The output depends on discovery
//! order. That is intentional: it is linear and reproducible.

use crate::config::TriageConfig;
use crate::document::ShapePrimitive;
use crate::geometry::{BBox, PageBounds};
use crate::pipeline::features::FeatureCache;
use crate::prompts::PromptKind;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const TABLE_REGION_CONFIDENCE: f64 = 0.9;
pub const IMAGE_REGION_CONFIDENCE: f64 = 0.95;
pub const CLUSTER_REGION_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionType {
    Table,
    Image,
    Figure,
}

/// A rectangular area of a page to rasterise on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureRegion {
    pub bbox: BBox,
    pub region_type: RegionType,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub page_index: usize,
    /// Position among the page's regions, 0-based.
    pub ordinal_index: usize,
    #[serde(default)]
    pub caption: Option<String>,
}

impl FigureRegion {
    pub fn area(&self) -> f64 {
        self.bbox.area()
    }

    /// The bbox grown by `margin` and clamped to `bounds`. With empty
    /// bounds only the margin is applied.
    pub fn crop_box(&self, margin: f64, bounds: PageBounds) -> BBox {
        crop(self.bbox, margin, bounds)
    }

    pub fn prompt_kind(&self) -> PromptKind {
        match self.region_type {
            RegionType::Table => PromptKind::Table,
            RegionType::Image => PromptKind::Image,
            RegionType::Figure => PromptKind::Figure,
        }
    }
}

fn crop(bbox: BBox, margin: f64, bounds: PageBounds) -> BBox {
    let grown = bbox.expand(margin);
    if bounds.is_empty() {
        grown
    } else {
        grown.clamp_to(bounds)
    }
}

/// Candidate regions for one page, in detection order: tables, images,
/// then shape clusters.
///
/// Every returned region is grown by `region_margin`, clamped to `bounds`
/// (unless the bounds are unknown), non-degenerate, and larger than
/// `min_figure_area`.
pub fn detect_regions(
    cache: &FeatureCache,
    bounds: PageBounds,
    config: &TriageConfig,
) -> Vec<FigureRegion> {
    let mut found: Vec<(BBox, RegionType, f64)> = Vec::new();

    for table in cache.tables() {
        found.push((table.bbox, RegionType::Table, TABLE_REGION_CONFIDENCE));
    }

    for image in cache.significant_images(config.embedded_image_min_size) {
        if let Some(bbox) = image.bbox {
            found.push((bbox, RegionType::Image, IMAGE_REGION_CONFIDENCE));
        }
    }

    for bbox in cluster_shapes(cache.shapes(), config) {
        found.push((bbox, RegionType::Figure, CLUSTER_REGION_CONFIDENCE));
    }

    let page_index = cache.page_index();
    let regions: Vec<FigureRegion> = found
        .into_iter()
        .filter_map(|(bbox, region_type, confidence)| {
            let bbox = crop(bbox, config.region_margin, bounds);
            (!bbox.is_degenerate() && bbox.area() > config.min_figure_area).then_some((
                bbox,
                region_type,
                confidence,
            ))
        })
        .enumerate()
        .map(|(ordinal_index, (bbox, region_type, confidence))| FigureRegion {
            bbox,
            region_type,
            confidence,
            page_index,
            ordinal_index,
            caption: None,
        })
        .collect();

    debug!("Page {}: {} candidate region(s)", page_index + 1, regions.len());
    regions
}

/// Greedy single-pass clustering of shapes by centre distance.
///
/// Returns one bbox per closed cluster, before any area filtering. Pages
/// with fewer than `min_cluster_shapes` shapes are not clustered at all.
/// Shapes without coordinates are skipped.
pub fn cluster_shapes(shapes: &[ShapePrimitive], config: &TriageConfig) -> Vec<BBox> {
    if shapes.len() < config.min_cluster_shapes {
        return Vec::new();
    }

    let mut clusters = Vec::new();
    let mut current: Option<BBox> = None;
    for bbox in shapes.iter().filter_map(ShapePrimitive::bbox) {
        current = Some(match current {
            None => bbox,
            Some(cluster) if cluster.center_distance(&bbox) < config.cluster_distance_threshold => {
                cluster.union(&bbox)
            }
            Some(cluster) => {
                clusters.push(cluster);
                bbox
            }
        });
    }
    clusters.extend(current);
    clusters
}
