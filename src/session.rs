use image::RgbImage;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::classes::ClassRegistry;
use crate::error::AnnotateError;
use crate::history::HistoryManager;
use crate::polygonize::{polygonize, Mask};
use crate::store::AnnotationStore;
use crate::types::{Point, Polygon};

/// The segmentation collaborator: given an image and a query point in pixel
/// coordinates, produce zero or more candidate masks. Implementations may
/// fail for any reason; the session recovers that locally as "no object
/// found".
pub trait MaskGenerator {
    fn generate(
        &mut self,
        image: &RgbImage,
        point: Point,
    ) -> Result<Vec<Mask>, Box<dyn std::error::Error>>;
}

/// On-disk shape of an explicitly saved session.
#[derive(Serialize, Deserialize)]
struct SessionFile {
    registry: ClassRegistry,
    store: AnnotationStore,
}

/// One annotation session: the store, the class registry, and the undo/redo
/// history over both.
///
/// There is no ambient shared state; every operation goes through an explicit
/// session instance, so multiple independent sessions can coexist in one
/// process. Every successful mutation through this API is followed by a
/// history snapshot, and the initial empty state is snapshotted at
/// construction so history is never empty.
pub struct Session {
    store: AnnotationStore,
    registry: ClassRegistry,
    history: HistoryManager,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let store = AnnotationStore::new();
        let registry = ClassRegistry::new();
        let mut history = HistoryManager::new();
        history.snapshot(&store, &registry);
        Self {
            store,
            registry,
            history,
        }
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// Ask the collaborator for a mask at `point` and trace it into polygons.
    ///
    /// Only the first returned mask is used. A collaborator error, an empty
    /// mask list, or a mask whose contours are all degenerate yield `None` so
    /// the caller can present a neutral "no mask found" outcome. Session
    /// state is never mutated here; the caller decides whether to keep the
    /// result via `add_annotation`.
    pub fn request_mask(
        &self,
        backend: &mut dyn MaskGenerator,
        image: &RgbImage,
        point: Point,
    ) -> Option<Vec<Polygon>> {
        let masks = match backend.generate(image, point) {
            Ok(masks) => masks,
            Err(e) => {
                warn!("Mask generation failed: {}", e);
                return None;
            }
        };
        let mask = masks.first()?;
        let polygons = polygonize(mask);
        if polygons.is_empty() {
            None
        } else {
            Some(polygons)
        }
    }

    pub fn add_class(&mut self, id: u32, name: &str) -> Result<(), AnnotateError> {
        self.registry.add_class(id, name)?;
        self.history.snapshot(&self.store, &self.registry);
        Ok(())
    }

    /// Rename or renumber a class, rewriting every stored annotation that
    /// referenced the old id (cascade policy).
    pub fn edit_class(
        &mut self,
        old_id: u32,
        new_id: u32,
        new_name: &str,
    ) -> Result<(), AnnotateError> {
        self.registry.rename_or_renumber(old_id, new_id, new_name)?;
        if old_id != new_id {
            let remapped = self.store.remap_class(old_id, new_id);
            if remapped > 0 {
                info!(
                    "Remapped {} annotations from class {} to {}",
                    remapped, old_id, new_id
                );
            }
        }
        self.history.snapshot(&self.store, &self.registry);
        Ok(())
    }

    pub fn add_annotation(&mut self, image: &Path, polygon: Polygon, class_id: u32) {
        self.store.add(image, polygon, class_id);
        self.history.snapshot(&self.store, &self.registry);
    }

    pub fn remove_annotation(&mut self, image: &Path, index: usize) -> Result<(), AnnotateError> {
        self.store.remove(image, index)?;
        self.history.snapshot(&self.store, &self.registry);
        Ok(())
    }

    /// Restore the previous state; returns false at the oldest state.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(entry) => {
                self.store = entry.store.clone();
                self.registry = entry.registry.clone();
                true
            }
            None => false,
        }
    }

    /// Restore the next state; returns false at the newest state.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(entry) => {
                self.store = entry.store.clone();
                self.registry = entry.registry.clone();
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Number of images with at least one annotation, for progress display.
    pub fn annotated_image_count(&self) -> usize {
        self.store.images_with_annotations().len()
    }

    /// Explicitly write the annotations and class registry to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), AnnotateError> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(
            writer,
            &SessionFile {
                registry: self.registry.clone(),
                store: self.store.clone(),
            },
        )?;
        info!("Saved session to {}", path.display());
        Ok(())
    }

    /// Replace the current annotations and registry from a saved session file.
    pub fn load(&mut self, path: &Path) -> Result<(), AnnotateError> {
        let file = File::open(path)?;
        let loaded: SessionFile = serde_json::from_reader(file)?;
        self.store = loaded.store;
        self.registry = loaded.registry;
        self.history.snapshot(&self.store, &self.registry);
        info!(
            "Loaded session from {} ({} annotations)",
            path.display(),
            self.store.annotation_count()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poly() -> Polygon {
        Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(0.0, 2.0),
        ])
    }

    struct FixedBackend(Vec<Mask>);

    impl MaskGenerator for FixedBackend {
        fn generate(
            &mut self,
            _image: &RgbImage,
            _point: Point,
        ) -> Result<Vec<Mask>, Box<dyn std::error::Error>> {
            Ok(self.0.clone())
        }
    }

    struct FailingBackend;

    impl MaskGenerator for FailingBackend {
        fn generate(
            &mut self,
            _image: &RgbImage,
            _point: Point,
        ) -> Result<Vec<Mask>, Box<dyn std::error::Error>> {
            Err("model exploded".into())
        }
    }

    #[test]
    fn test_request_mask_uses_first_mask() {
        let session = Session::new();
        let image = RgbImage::new(8, 8);
        let square = Mask::from_fn(8, 8, |x, y| (2..6).contains(&x) && (2..6).contains(&y));
        let mut backend = FixedBackend(vec![square, Mask::new(8, 8)]);
        let polygons = session
            .request_mask(&mut backend, &image, Point::new(3.0, 3.0))
            .unwrap();
        assert_eq!(polygons.len(), 1);
    }

    #[test]
    fn test_request_mask_recovers_failures_as_none() {
        let session = Session::new();
        let image = RgbImage::new(8, 8);

        assert!(session
            .request_mask(&mut FailingBackend, &image, Point::new(1.0, 1.0))
            .is_none());
        assert!(session
            .request_mask(&mut FixedBackend(Vec::new()), &image, Point::new(1.0, 1.0))
            .is_none());
        // A mask with only degenerate contours is "no object found" too.
        let mut dot = Mask::new(8, 8);
        dot.set(4, 4, true);
        assert!(session
            .request_mask(&mut FixedBackend(vec![dot]), &image, Point::new(4.0, 4.0))
            .is_none());
    }

    #[test]
    fn test_mutations_snapshot_and_undo() {
        let mut session = Session::new();
        session.add_class(1, "tree").unwrap();
        session.add_annotation(Path::new("a.png"), poly(), 1);
        assert_eq!(session.annotated_image_count(), 1);

        assert!(session.undo());
        assert_eq!(session.annotated_image_count(), 0);
        assert!(session.registry().contains(1));

        assert!(session.undo());
        assert!(!session.registry().contains(1));

        // At the initial empty state now.
        assert!(!session.undo());

        assert!(session.redo());
        assert!(session.registry().contains(1));
        assert!(session.redo());
        assert_eq!(session.annotated_image_count(), 1);
        assert!(!session.redo());
    }

    #[test]
    fn test_failed_mutation_does_not_snapshot() {
        let mut session = Session::new();
        assert!(session.add_class(0, "dup").is_err());
        assert!(!session.can_undo());
    }

    #[test]
    fn test_edit_class_cascades_annotations() {
        let mut session = Session::new();
        session.add_class(1, "tree").unwrap();
        session.add_annotation(Path::new("a.png"), poly(), 1);
        session.edit_class(1, 3, "bush").unwrap();

        assert_eq!(
            session.store().annotations_for(Path::new("a.png"))[0].class_id,
            3
        );
        assert_eq!(session.registry().lookup(3).name, "bush");

        // Undo restores both the registry and the annotation ids together.
        assert!(session.undo());
        assert_eq!(
            session.store().annotations_for(Path::new("a.png"))[0].class_id,
            1
        );
        assert_eq!(session.registry().lookup(1).name, "tree");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("session.json");

        let mut session = Session::new();
        session.add_class(2, "car").unwrap();
        session.add_annotation(Path::new("a.png"), poly(), 2);
        session.save(&file).unwrap();

        let mut restored = Session::new();
        restored.load(&file).unwrap();
        assert_eq!(restored.store(), session.store());
        assert_eq!(restored.registry().lookup(2).name, "car");
        // Loading is a mutation: it can be undone back to the empty state.
        assert!(restored.undo());
        assert!(restored.store().is_empty());
    }
}
