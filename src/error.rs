use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the annotation engine.
///
/// Validation errors are raised synchronously by the offending operation and
/// surfaced to the caller unmodified; they are never swallowed inside the
/// registry, store, or polygonizer. Collaborator failures are handled
/// separately (see `Session::request_mask`).
#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("class id {0} is already registered")]
    DuplicateClass(u32),

    #[error("class id {0} does not fit the 10-color palette")]
    CapacityExceeded(u32),

    #[error("class id {0} is not registered")]
    UnknownClass(u32),

    #[error("annotation index {index} is out of range for {}", image.display())]
    IndexOutOfRange { image: PathBuf, index: usize },

    #[error("polygon has no vertices")]
    InvalidPolygon,

    #[error("no annotated images to export")]
    EmptyDataset,

    #[error("failed to read dimensions of {}", path.display())]
    ImageDimensions {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to parse session file")]
    SessionFormat(#[from] serde_json::Error),
}
