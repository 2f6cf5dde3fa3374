use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::AnnotateError;
use crate::types::{Annotation, Polygon};

/// In-memory mapping from image path to its ordered annotation sequence.
///
/// Annotations keep append order, which fixes label-file line numbering at
/// export time. Image keys iterate in sorted order so export input ordering
/// is reproducible regardless of the order images were annotated in.
///
/// The store owns its polygons outright; `add` takes the polygon by value and
/// polygons are immutable value types, so no caller-held buffer can alias a
/// stored annotation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationStore {
    annotations: BTreeMap<PathBuf, Vec<Annotation>>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an annotation to `image`, creating its sequence if absent.
    ///
    /// The class id is deliberately not validated against any registry; stale
    /// ids are tolerated at lookup time instead.
    pub fn add(&mut self, image: &Path, polygon: Polygon, class_id: u32) {
        self.annotations
            .entry(image.to_path_buf())
            .or_default()
            .push(Annotation::new(polygon, class_id));
    }

    /// Remove and return the annotation at `index` for `image`.
    pub fn remove(&mut self, image: &Path, index: usize) -> Result<Annotation, AnnotateError> {
        let out_of_range = || AnnotateError::IndexOutOfRange {
            image: image.to_path_buf(),
            index,
        };
        let entries = self.annotations.get_mut(image).ok_or_else(out_of_range)?;
        if index >= entries.len() {
            return Err(out_of_range());
        }
        Ok(entries.remove(index))
    }

    /// Annotations for one image, in append order.
    pub fn annotations_for(&self, image: &Path) -> &[Annotation] {
        self.annotations
            .get(image)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Image keys with at least one annotation, in sorted order.
    pub fn images_with_annotations(&self) -> Vec<PathBuf> {
        self.annotations
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Total number of annotations across all images.
    pub fn annotation_count(&self) -> usize {
        self.annotations.values().map(Vec::len).sum()
    }

    /// True if no image has an annotation.
    pub fn is_empty(&self) -> bool {
        self.annotations.values().all(Vec::is_empty)
    }

    /// Rewrite every annotation referencing `old_id` to `new_id`.
    ///
    /// Used by the session to cascade class renumbering so no annotation is
    /// orphaned.
    pub fn remap_class(&mut self, old_id: u32, new_id: u32) -> usize {
        let mut remapped = 0;
        for entries in self.annotations.values_mut() {
            for annotation in entries.iter_mut() {
                if annotation.class_id == old_id {
                    annotation.class_id = new_id;
                    remapped += 1;
                }
            }
        }
        remapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn triangle() -> Polygon {
        Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(0.0, 4.0),
        ])
    }

    #[test]
    fn test_add_appends_in_order() {
        let mut store = AnnotationStore::new();
        let image = Path::new("a.png");
        store.add(image, triangle(), 0);
        store.add(image, triangle(), 2);
        let entries = store.annotations_for(image);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].class_id, 0);
        assert_eq!(entries[1].class_id, 2);
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut store = AnnotationStore::new();
        let image = Path::new("a.png");
        assert!(matches!(
            store.remove(image, 0),
            Err(AnnotateError::IndexOutOfRange { .. })
        ));
        store.add(image, triangle(), 0);
        assert!(matches!(
            store.remove(image, 1),
            Err(AnnotateError::IndexOutOfRange { .. })
        ));
        assert!(store.remove(image, 0).is_ok());
    }

    #[test]
    fn test_images_with_annotations_skips_emptied_images() {
        let mut store = AnnotationStore::new();
        store.add(Path::new("b.png"), triangle(), 0);
        store.add(Path::new("a.png"), triangle(), 0);
        assert_eq!(
            store.images_with_annotations(),
            vec![PathBuf::from("a.png"), PathBuf::from("b.png")]
        );

        store.remove(Path::new("a.png"), 0).unwrap();
        assert_eq!(
            store.images_with_annotations(),
            vec![PathBuf::from("b.png")]
        );
        assert!(!store.is_empty());
    }

    #[test]
    fn test_remap_class() {
        let mut store = AnnotationStore::new();
        store.add(Path::new("a.png"), triangle(), 1);
        store.add(Path::new("a.png"), triangle(), 0);
        store.add(Path::new("b.png"), triangle(), 1);
        assert_eq!(store.remap_class(1, 4), 2);
        assert_eq!(store.annotations_for(Path::new("a.png"))[0].class_id, 4);
        assert_eq!(store.annotations_for(Path::new("b.png"))[0].class_id, 4);
        assert_eq!(store.annotations_for(Path::new("a.png"))[1].class_id, 0);
    }

    #[test]
    fn test_stored_polygon_is_independent() {
        let mut store = AnnotationStore::new();
        let mut points = vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(0.0, 4.0),
        ];
        store.add(Path::new("a.png"), Polygon::new(points.clone()), 0);
        points[0] = Point::new(99.0, 99.0);
        let stored = &store.annotations_for(Path::new("a.png"))[0];
        assert_eq!(stored.polygon.points()[0], Point::new(0.0, 0.0));
    }
}
