//! Geometry utilities
//!
//! Axis-aligned rectangles in image pixel coordinates and the comparisons the
//! dedup, linking and grouping stages are built on.

use serde::{Deserialize, Serialize};

// ============================================================
// Bounding Box
// ============================================================

/// Axis-aligned rectangle in image pixel coordinates
///
/// `min` is the top-left corner and `max` the bottom-right corner, following
/// the hOCR `bbox x0 y0 x1 y1` convention. Width and height are never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl BoundingBox {
    /// Create a new box, swapping corners if given in the wrong order
    pub fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: min_x.max(max_x),
            max_y: min_y.max(max_y),
        }
    }

    /// Create a box from the origin with the given size
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    pub fn width(&self) -> i32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> i32 {
        self.max_y - self.min_y
    }

    /// Area in square pixels
    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    /// Intersection with another box, if the two share any area
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let min_x = self.min_x.max(other.min_x);
        let min_y = self.min_y.max(other.min_y);
        let max_x = self.max_x.min(other.max_x);
        let max_y = self.max_y.min(other.max_y);

        if max_x > min_x && max_y > min_y {
            Some(BoundingBox {
                min_x,
                min_y,
                max_x,
                max_y,
            })
        } else {
            None
        }
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Whether the horizontal spans of the two boxes overlap
    pub fn overlaps_horizontally(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x && other.min_x < self.max_x
    }

    /// Full-width horizontal band around this box's rows, widened by `margin`
    /// pixels above and below and clamped to `bounds`
    ///
    /// Used to request a crop of the header line a month name was found on.
    pub fn horizontal_band(&self, margin: i32, bounds: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: bounds.min_x,
            min_y: (self.min_y - margin).max(bounds.min_y),
            max_x: bounds.max_x,
            max_y: (self.max_y + margin).min(bounds.max_y),
        }
    }
}

// ============================================================
// Comparisons
// ============================================================

/// Signed vertical distance between two boxes
///
/// Disjoint boxes yield the positive pixel gap between them, whichever one is
/// on top. Vertically overlapping boxes yield a negative value: minus the
/// height of the box whose vertical span lies inside the other's, or minus the
/// depth of a partial overlap. Smaller means more clearly on the same row.
pub fn vertical_distance(a: &BoundingBox, b: &BoundingBox) -> i32 {
    if a.min_y >= b.max_y {
        // a entirely below b
        return a.min_y - b.max_y;
    }
    if a.max_y <= b.min_y {
        // a entirely above b
        return b.min_y - a.max_y;
    }

    if a.min_y >= b.min_y {
        if a.max_y <= b.max_y {
            -a.height()
        } else {
            a.min_y - b.max_y
        }
    } else if a.max_y >= b.max_y {
        -b.height()
    } else {
        b.min_y - a.max_y
    }
}

/// Intersection area divided by the area of the smaller box
///
/// Returns 0.0 when the boxes do not intersect or the smaller box is empty.
pub fn overlap_ratio(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let smaller = a.area().min(b.area());
    if smaller <= 0 {
        return 0.0;
    }

    match a.intersection(b) {
        Some(inter) => inter.area() as f64 / smaller as f64,
        None => 0.0,
    }
}

/// Whether the two boxes share more than `threshold` of the smaller box's
/// height on the same row
///
/// Horizontal position is ignored: two fragments of one mis-split word sit in
/// adjacent columns of the same row.
pub fn same_horizontal_band(a: &BoundingBox, b: &BoundingBox, threshold: f64) -> bool {
    let smaller_height = a.height().min(b.height()) as f64;

    if a.min_y >= b.min_y && (b.max_y - a.min_y) as f64 > smaller_height * threshold {
        return true;
    }
    if b.min_y >= a.min_y && (a.max_y - b.min_y) as f64 > smaller_height * threshold {
        return true;
    }

    false
}
