use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

// Supported image formats
pub const IMG_FORMATS: &[&str] = &["bmp", "jpeg", "jpg", "png"];

// Precomputed HashSet of image extensions for fast lookup
pub static IMAGE_EXTENSIONS_SET: OnceLock<HashSet<String>> = OnceLock::new();

/// Get the image extensions set
pub fn get_image_extensions_set() -> &'static HashSet<String> {
    IMAGE_EXTENSIONS_SET.get_or_init(|| IMG_FORMATS.iter().map(|ext| ext.to_lowercase()).collect())
}

/// A point in original-image pixel coordinates (never display coordinates).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An ordered vertex sequence; insertion order defines the drawing contour.
/// Not guaranteed convex or simple. Traced polygons always carry >= 3 points,
/// but the type itself does not enforce that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl From<Vec<Point>> for Polygon {
    fn from(points: Vec<Point>) -> Self {
        Self::new(points)
    }
}

/// Axis-aligned bounding box derived from a polygon's extrema.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

/// One accepted mask on one image: a polygon tagged with a class id.
/// The class id is not validated against the registry here; it can go stale
/// if the class is later renumbered (the registry lookup tolerates that).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub polygon: Polygon,
    pub class_id: u32,
}

impl Annotation {
    pub fn new(polygon: Polygon, class_id: u32) -> Self {
        Self { polygon, class_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extensions_set() {
        let set = get_image_extensions_set();
        assert!(set.contains("jpg"));
        assert!(set.contains("png"));
        assert!(!set.contains("txt"));
    }

    #[test]
    fn test_polygon_accessors() {
        let poly = Polygon::new(vec![Point::new(0.0, 0.0), Point::new(3.0, 4.0)]);
        assert_eq!(poly.len(), 2);
        assert!(!poly.is_empty());
        assert_eq!(poly.points()[1], Point::new(3.0, 4.0));
    }
}
