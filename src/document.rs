//! The Document Access Library seam.
//!
//! This crate never parses PDF bytes. Everything it knows about a page comes
//! through [`DocumentAccess`]: text, positioned text blocks, vector-shape
//! primitives, table geometries and embedded-image descriptors. Each query
//! may fail on its own; the feature cache turns a failure into an empty
//! signal (see [`crate::pipeline::features`]).
//!
//! [`DocumentSnapshot`] is a serde-backed implementation holding a JSON dump
//! of those signals. It is what the `pagetriage` binary reads and what the
//! tests build pages from.

use crate::error::{AccessError, Signal, TriageError};
use crate::geometry::{BBox, PageBounds, Point};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Kind of a vector-shape primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Rect,
    Line,
    Curve,
}

/// One drawn path element: a rectangle (corners), a line (endpoints) or a
/// curve (endpoints and control points).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapePrimitive {
    pub kind: ShapeKind,
    pub points: Vec<Point>,
}

impl ShapePrimitive {
    pub fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            kind: ShapeKind::Rect,
            points: vec![Point::new(x0, y0), Point::new(x1, y1)],
        }
    }

    pub fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            kind: ShapeKind::Line,
            points: vec![Point::new(x0, y0), Point::new(x1, y1)],
        }
    }

    pub fn curve(points: Vec<Point>) -> Self {
        Self {
            kind: ShapeKind::Curve,
            points,
        }
    }

    /// Bounding box of the coordinates. Lines may yield zero-width or
    /// zero-height boxes; that is expected and not treated as degenerate here.
    pub fn bbox(&self) -> Option<BBox> {
        BBox::enclosing(&self.points)
    }
}

/// A table found by the backend's table finder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableGeometry {
    pub bbox: BBox,
    pub cell_count: usize,
}

/// An embedded raster image: where it is drawn and its intrinsic pixel size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedImage {
    /// Placement on the page. `None` when the backend could not resolve it.
    #[serde(default)]
    pub bbox: Option<BBox>,
    pub width: u32,
    pub height: u32,
}

impl EmbeddedImage {
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A positioned run of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub bbox: BBox,
    pub text: String,
}

/// Read access to the layout signals of a document's pages.
///
/// Implementations must be cheap to share across the worker pool
/// (`Send + Sync`); every method takes a 0-indexed page number.
pub trait DocumentAccess: Send + Sync {
    fn page_count(&self) -> usize;

    fn page_bounds(&self, page: usize) -> Result<PageBounds, AccessError>;

    fn text(&self, page: usize) -> Result<String, AccessError>;

    /// Positioned text blocks. Backends without layout information may leave
    /// the default, which reports the signal as unsupported.
    fn text_blocks(&self, page: usize) -> Result<Vec<TextBlock>, AccessError> {
        let _ = page;
        Err(AccessError::Unsupported {
            signal: Signal::TextBlocks,
        })
    }

    fn shape_primitives(&self, page: usize) -> Result<Vec<ShapePrimitive>, AccessError>;

    fn tables(&self, page: usize) -> Result<Vec<TableGeometry>, AccessError>;

    fn embedded_images(&self, page: usize) -> Result<Vec<EmbeddedImage>, AccessError>;
}

// ── Snapshot backend ─────────────────────────────────────────────────────

/// The recorded signals of one page. A `null` signal means the backend that
/// produced the dump could not provide it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    #[serde(default)]
    pub bounds: Option<PageBounds>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub text_blocks: Option<Vec<TextBlock>>,
    #[serde(default)]
    pub shapes: Option<Vec<ShapePrimitive>>,
    #[serde(default)]
    pub tables: Option<Vec<TableGeometry>>,
    #[serde(default)]
    pub images: Option<Vec<EmbeddedImage>>,
}

impl PageSnapshot {
    /// An A4 page with every signal present and empty.
    pub fn a4() -> Self {
        Self {
            bounds: Some(PageBounds::new(595.0, 842.0)),
            text: Some(String::new()),
            text_blocks: Some(Vec::new()),
            shapes: Some(Vec::new()),
            tables: Some(Vec::new()),
            images: Some(Vec::new()),
        }
    }

    /// Set the page text and mirror it as one text block per line, stacked
    /// from the top margin with a fixed 14-unit line height.
    pub fn with_lines(mut self, text: &str) -> Self {
        let width = self.bounds.map(|b| b.width).unwrap_or(595.0);
        self.text_blocks = Some(
            text.lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(i, line)| TextBlock {
                    bbox: BBox::new(
                        50.0,
                        50.0 + i as f64 * 14.0,
                        width - 50.0,
                        62.0 + i as f64 * 14.0,
                    ),
                    text: line.to_string(),
                })
                .collect(),
        );
        self.text = Some(text.to_string());
        self
    }

    pub fn with_text_blocks(mut self, blocks: Vec<TextBlock>) -> Self {
        self.text = Some(
            blocks
                .iter()
                .map(|b| b.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        );
        self.text_blocks = Some(blocks);
        self
    }

    pub fn with_shapes(mut self, shapes: Vec<ShapePrimitive>) -> Self {
        self.shapes = Some(shapes);
        self
    }

    pub fn with_tables(mut self, tables: Vec<TableGeometry>) -> Self {
        self.tables = Some(tables);
        self
    }

    pub fn with_images(mut self, images: Vec<EmbeddedImage>) -> Self {
        self.images = Some(images);
        self
    }
}

/// A whole document held in memory as recorded page signals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub pages: Vec<PageSnapshot>,
}

impl DocumentSnapshot {
    pub fn new(pages: Vec<PageSnapshot>) -> Self {
        Self { pages }
    }

    pub fn from_json_str(json: &str) -> Result<Self, TriageError> {
        serde_json::from_str(json).map_err(|e| TriageError::MalformedJson {
            origin: "<string>".to_string(),
            detail: e.to_string(),
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TriageError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| TriageError::SnapshotReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&raw).map_err(|e| TriageError::MalformedJson {
            origin: path.display().to_string(),
            detail: e.to_string(),
        })
    }

    fn page(&self, page: usize) -> Result<&PageSnapshot, AccessError> {
        self.pages.get(page).ok_or(AccessError::PageOutOfRange {
            page,
            total: self.pages.len(),
        })
    }
}

fn recorded<T: Clone>(value: &Option<T>, signal: Signal) -> Result<T, AccessError> {
    value.clone().ok_or(AccessError::Unsupported { signal })
}

impl DocumentAccess for DocumentSnapshot {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_bounds(&self, page: usize) -> Result<PageBounds, AccessError> {
        recorded(&self.page(page)?.bounds, Signal::PageBounds)
    }

    fn text(&self, page: usize) -> Result<String, AccessError> {
        recorded(&self.page(page)?.text, Signal::Text)
    }

    fn text_blocks(&self, page: usize) -> Result<Vec<TextBlock>, AccessError> {
        recorded(&self.page(page)?.text_blocks, Signal::TextBlocks)
    }

    fn shape_primitives(&self, page: usize) -> Result<Vec<ShapePrimitive>, AccessError> {
        recorded(&self.page(page)?.shapes, Signal::ShapePrimitives)
    }

    fn tables(&self, page: usize) -> Result<Vec<TableGeometry>, AccessError> {
        recorded(&self.page(page)?.tables, Signal::Tables)
    }

    fn embedded_images(&self, page: usize) -> Result<Vec<EmbeddedImage>, AccessError> {
        recorded(&self.page(page)?.images, Signal::EmbeddedImages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_signal_is_unsupported() {
        let doc = DocumentSnapshot::new(vec![PageSnapshot {
            tables: None,
            ..PageSnapshot::a4()
        }]);
        assert_eq!(
            doc.tables(0),
            Err(AccessError::Unsupported {
                signal: Signal::Tables
            })
        );
        assert_eq!(doc.shape_primitives(0), Ok(Vec::new()));
    }

    #[test]
    fn missing_page_is_out_of_range() {
        let doc = DocumentSnapshot::new(vec![PageSnapshot::a4()]);
        assert_eq!(
            doc.text(3),
            Err(AccessError::PageOutOfRange { page: 3, total: 1 })
        );
    }

    #[test]
    fn parses_json_with_missing_fields() {
        let json = r#"{
            "pages": [{
                "bounds": { "width": 595.0, "height": 842.0 },
                "text": "hello",
                "shapes": [ { "kind": "rect", "points": [ {"x": 0, "y": 0}, {"x": 10, "y": 10} ] } ],
                "images": [ { "width": 400, "height": 300 } ]
            }]
        }"#;
        let doc = DocumentSnapshot::from_json_str(json).expect("valid snapshot");
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.text(0).as_deref(), Ok("hello"));
        assert_eq!(doc.shape_primitives(0).map(|s| s.len()), Ok(1));
        assert!(doc.tables(0).is_err());
        assert_eq!(doc.embedded_images(0).map(|i| i[0].bbox), Ok(None));
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = DocumentSnapshot::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, TriageError::MalformedJson { .. }));
    }

    #[test]
    fn with_lines_builds_one_block_per_line() {
        let page = PageSnapshot::a4().with_lines("first\n\nthird");
        let blocks = page.text_blocks.expect("blocks set");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].text, "third");
        assert!(blocks[1].bbox.y0 > blocks[0].bbox.y1);
    }

    #[test]
    fn shape_bbox_from_points() {
        let s = ShapePrimitive::line(10.0, 20.0, 0.0, 20.0);
        assert_eq!(s.bbox(), Some(BBox::new(0.0, 20.0, 10.0, 20.0)));
    }
}
