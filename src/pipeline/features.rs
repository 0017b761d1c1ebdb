//! FeatureCache: the one read of a page's raw layout signals.
//!
//! Every downstream stage (detectors, fusion, region detection, caption
//! binding) reads the same immutable snapshot, so the Document Access Library
//! is queried exactly once per signal per page.
//!
//! ## Why degrade instead of fail?
//!
//! Backends disagree on what they can extract. A scanned page has no vector
//! shapes; some libraries have no table finder at all. A failed query is
//! replaced by an empty signal and remembered in
//! [`FeatureCache::unavailable`], so the page still gets a verdict built on
//! whatever evidence remains.

use crate::document::{
    DocumentAccess, EmbeddedImage, ShapeKind, ShapePrimitive, TableGeometry, TextBlock,
};
use crate::error::{AccessError, Signal};
use crate::geometry::PageBounds;
use serde::Serialize;
use tracing::{debug, warn};

/// Per-kind shape primitive counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShapeCounts {
    pub rects: usize,
    pub lines: usize,
    pub curves: usize,
}

impl ShapeCounts {
    pub fn total(&self) -> usize {
        self.rects + self.lines + self.curves
    }
}

/// Immutable snapshot of one page's raw signals.
#[derive(Debug, Clone)]
pub struct FeatureCache {
    page_index: usize,
    bounds: PageBounds,
    text: String,
    text_blocks: Vec<TextBlock>,
    shapes: Vec<ShapePrimitive>,
    tables: Vec<TableGeometry>,
    images: Vec<EmbeddedImage>,
    counts: ShapeCounts,
    unavailable: Vec<Signal>,
}

impl FeatureCache {
    /// An empty cache with every signal marked unavailable, for a page the
    /// backend could not be read from at all.
    pub fn unreadable(page: usize) -> Self {
        Self {
            page_index: page,
            bounds: PageBounds::default(),
            text: String::new(),
            text_blocks: Vec::new(),
            shapes: Vec::new(),
            tables: Vec::new(),
            images: Vec::new(),
            counts: ShapeCounts::default(),
            unavailable: vec![
                Signal::PageBounds,
                Signal::Text,
                Signal::TextBlocks,
                Signal::ShapePrimitives,
                Signal::Tables,
                Signal::EmbeddedImages,
            ],
        }
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    /// Page size. [`PageBounds::is_empty`] when the query failed.
    pub fn bounds(&self) -> PageBounds {
        self.bounds
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn text_blocks(&self) -> &[TextBlock] {
        &self.text_blocks
    }

    /// Shape primitives in discovery order.
    pub fn shapes(&self) -> &[ShapePrimitive] {
        &self.shapes
    }

    /// Well-formed tables only; degenerate boxes were dropped at build time.
    pub fn tables(&self) -> &[TableGeometry] {
        &self.tables
    }

    pub fn images(&self) -> &[EmbeddedImage] {
        &self.images
    }

    pub fn shape_counts(&self) -> ShapeCounts {
        self.counts
    }

    /// Signals whose query failed and were replaced by an empty value.
    pub fn unavailable(&self) -> &[Signal] {
        &self.unavailable
    }

    /// Images whose pixel dimensions both exceed `min_size`.
    pub fn significant_images(&self, min_size: u32) -> impl Iterator<Item = &EmbeddedImage> {
        self.images
            .iter()
            .filter(move |img| img.width > min_size && img.height > min_size)
    }

    /// Tables with at least `min_cells` cells.
    pub fn tables_with_cells(&self, min_cells: usize) -> impl Iterator<Item = &TableGeometry> {
        self.tables.iter().filter(move |t| t.cell_count >= min_cells)
    }
}

/// Query every signal for `page` once and assemble the cache.
///
/// Never fails: each query that errors contributes an empty value and a
/// `warn!` line.
pub fn build_feature_cache(doc: &dyn DocumentAccess, page: usize) -> FeatureCache {
    let mut unavailable = Vec::new();

    let bounds = or_empty(doc.page_bounds(page), page, Signal::PageBounds, &mut unavailable);
    let text = or_empty(doc.text(page), page, Signal::Text, &mut unavailable);
    let text_blocks = or_empty(doc.text_blocks(page), page, Signal::TextBlocks, &mut unavailable);
    let shapes = or_empty(
        doc.shape_primitives(page),
        page,
        Signal::ShapePrimitives,
        &mut unavailable,
    );
    let raw_tables = or_empty(doc.tables(page), page, Signal::Tables, &mut unavailable);
    let images = or_empty(
        doc.embedded_images(page),
        page,
        Signal::EmbeddedImages,
        &mut unavailable,
    );

    let before = raw_tables.len();
    let tables: Vec<TableGeometry> = raw_tables
        .into_iter()
        .filter(|t| !t.bbox.is_degenerate())
        .collect();
    if tables.len() < before {
        debug!(
            "Page {}: dropped {} degenerate table(s)",
            page + 1,
            before - tables.len()
        );
    }

    let mut counts = ShapeCounts::default();
    for shape in &shapes {
        match shape.kind {
            ShapeKind::Rect => counts.rects += 1,
            ShapeKind::Line => counts.lines += 1,
            ShapeKind::Curve => counts.curves += 1,
        }
    }

    FeatureCache {
        page_index: page,
        bounds,
        text,
        text_blocks,
        shapes,
        tables,
        images,
        counts,
        unavailable,
    }
}

fn or_empty<T: Default>(
    result: Result<T, AccessError>,
    page: usize,
    signal: Signal,
    unavailable: &mut Vec<Signal>,
) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("Page {}: {} unavailable: {}", page + 1, signal, e);
            unavailable.push(signal);
            T::default()
        }
    }
}
