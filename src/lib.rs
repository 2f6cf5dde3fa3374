//! Click-to-segment annotation engine with YOLO dataset export
//!
//! This library provides the state engine behind an interactive image
//! annotator: click points are turned into masks by a pluggable segmentation
//! backend, masks become polygon annotations tagged with a class, every
//! mutation is undoable, and the accumulated annotations export as a
//! YOLO-format dataset split into train/val/test partitions.

pub mod backend;
pub mod classes;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod polygonize;
pub mod session;
pub mod store;
pub mod types;

// Re-export commonly used types and functions
pub use backend::RegionGrowBackend;
pub use classes::{ClassInfo, ClassRegistry, MAX_CLASSES, PALETTE};
pub use config::Args;
pub use error::AnnotateError;
pub use export::{export_dataset, ExportManifest};
pub use history::{HistoryEntry, HistoryManager};
pub use polygonize::{bounding_box, polygonize, Mask};
pub use session::{MaskGenerator, Session};
pub use store::AnnotationStore;
pub use types::{Annotation, BoundingBox, Point, Polygon};
