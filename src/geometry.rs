//! Axis-aligned page geometry shared by every pipeline stage.
//!
//! Coordinates are PDF user-space units with a top-left origin, the same
//! convention the Document Access Library reports (`y` grows downwards, so a
//! caption "beneath" a figure has a larger `y`).

use serde::{Deserialize, Serialize};

/// A point in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// An axis-aligned rectangle `(x0, y0)`–`(x1, y1)`.
///
/// A well-formed box has `x0 <= x1` and `y0 <= y1`. Boxes coming from the
/// Document Access Library are not trusted to be well-formed; callers use
/// [`BBox::is_degenerate`] to drop inverted or zero-area boxes before they
/// reach any result list.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Smallest box enclosing every point, or `None` for an empty iterator
    /// or any non-finite coordinate.
    pub fn enclosing<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self::new(first.x, first.y, first.x, first.y);
        for p in iter {
            bbox.x0 = bbox.x0.min(p.x);
            bbox.y0 = bbox.y0.min(p.y);
            bbox.x1 = bbox.x1.max(p.x);
            bbox.y1 = bbox.y1.max(p.y);
        }
        bbox.is_finite().then_some(bbox)
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// `(x1 - x0) * (y1 - y0)`; zero for inverted boxes.
    pub fn area(&self) -> f64 {
        if self.is_inverted() {
            0.0
        } else {
            self.width() * self.height()
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x0.is_finite() && self.y0.is_finite() && self.x1.is_finite() && self.y1.is_finite()
    }

    pub fn is_inverted(&self) -> bool {
        self.x1 < self.x0 || self.y1 < self.y0
    }

    /// Inverted, zero-area, or non-finite.
    pub fn is_degenerate(&self) -> bool {
        !self.is_finite() || self.is_inverted() || self.area() <= 0.0
    }

    pub fn center(&self) -> Point {
        Point::new((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Distance between the two box centres.
    pub fn center_distance(&self, other: &BBox) -> f64 {
        self.center().distance(&other.center())
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }

    /// Closed-interval intersection test: boxes that only share an edge
    /// overlap. Symmetric in its arguments.
    pub fn overlaps(&self, other: &BBox) -> bool {
        !(self.x1 < other.x0 || other.x1 < self.x0 || self.y1 < other.y0 || other.y1 < self.y0)
    }

    /// Grow every side by `margin`.
    pub fn expand(&self, margin: f64) -> BBox {
        BBox::new(
            self.x0 - margin,
            self.y0 - margin,
            self.x1 + margin,
            self.y1 + margin,
        )
    }

    /// Clip to `[0, width] × [0, height]`.
    pub fn clamp_to(&self, bounds: PageBounds) -> BBox {
        BBox::new(
            self.x0.clamp(0.0, bounds.width),
            self.y0.clamp(0.0, bounds.height),
            self.x1.clamp(0.0, bounds.width),
            self.y1.clamp(0.0, bounds.height),
        )
    }

    /// The horizontal strip of `height` units directly beneath this box.
    pub fn band_below(&self, height: f64) -> BBox {
        BBox::new(self.x0, self.y1, self.x1, self.y1 + height)
    }
}

/// Page size in user-space units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PageBounds {
    pub width: f64,
    pub height: f64,
}

impl PageBounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// True when the bounds are unknown (the query failed) or nonsensical.
    pub fn is_empty(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite()) || self.width <= 0.0 || self.height <= 0.0
    }

    pub fn as_bbox(&self) -> BBox {
        BBox::new(0.0, 0.0, self.width, self.height)
    }
}
