use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs::{self, copy, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::classes::ClassRegistry;
use crate::error::AnnotateError;
use crate::store::AnnotationStore;

// Split proportions: 5% test first, then 15/95 of the remainder for val,
// for a net train/val/test of roughly 80/15/5.
const TEST_FRACTION: f64 = 0.05;
const VAL_FRACTION_OF_REMAINDER: f64 = 0.15 / 0.95;

const SPLIT_NAMES: [&str; 3] = ["train", "val", "test"];

/// Which images landed in which split, plus where the manifest was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportManifest {
    pub train: Vec<PathBuf>,
    pub val: Vec<PathBuf>,
    pub test: Vec<PathBuf>,
    pub yaml_path: PathBuf,
}

/// Shuffle the annotated image keys with `seed` and split them into
/// train/val/test. Every input image lands in exactly one split.
pub fn split_images(mut images: Vec<PathBuf>, seed: u64) -> (Vec<PathBuf>, Vec<PathBuf>, Vec<PathBuf>) {
    let mut rng = StdRng::seed_from_u64(seed);
    images.shuffle(&mut rng);

    let test_size = (images.len() as f64 * TEST_FRACTION).ceil() as usize;
    let test: Vec<_> = images.drain(0..test_size).collect();
    let val_size = (images.len() as f64 * VAL_FRACTION_OF_REMAINDER).ceil() as usize;
    let val: Vec<_> = images.drain(0..val_size).collect();

    (images, val, test)
}

/// Materialize the annotation store as a YOLO segmentation dataset.
///
/// Creates `<split>/images` and `<split>/labels` under `destination`, copies
/// every annotated image byte-for-byte, writes one normalized label line per
/// annotation, and finishes with a `data.yaml` manifest at the root. The
/// operation is not transactional: a failure mid-export can leave a partial
/// tree, which is acceptable because destinations are expected to be fresh
/// directories. No in-memory state is mutated.
pub fn export_dataset(
    store: &AnnotationStore,
    registry: &ClassRegistry,
    destination: &Path,
    seed: u64,
) -> Result<ExportManifest, AnnotateError> {
    let images = store.images_with_annotations();
    if images.is_empty() {
        return Err(AnnotateError::EmptyDataset);
    }
    info!(
        "Exporting {} annotated images to {}",
        images.len(),
        destination.display()
    );

    let (train, val, test) = split_images(images, seed);

    for (split_name, split_paths) in SPLIT_NAMES.into_iter().zip([&train, &val, &test]) {
        let images_dir = create_output_directory(&destination.join(split_name).join("images"))?;
        let labels_dir = create_output_directory(&destination.join(split_name).join("labels"))?;

        let pb = create_progress_bar(split_paths.len() as u64, split_name);
        for image_path in split_paths {
            export_image(store, image_path, &images_dir, &labels_dir)?;
            pb.inc(1);
        }
        pb.finish_with_message(format!("{} split complete", split_name));
    }

    let yaml_path = create_data_yaml(destination, registry)?;
    info!("Export complete: {}", yaml_path.display());

    Ok(ExportManifest {
        train,
        val,
        test,
        yaml_path,
    })
}

/// Copy one source image into the split and write its label file.
fn export_image(
    store: &AnnotationStore,
    image_path: &Path,
    images_dir: &Path,
    labels_dir: &Path,
) -> Result<(), AnnotateError> {
    let stem = image_path
        .file_stem()
        .map(|s| sanitize_filename::sanitize(s.to_string_lossy()))
        .unwrap_or_else(|| "image".to_string());
    let extension = image_path.extension().unwrap_or_default();

    let image_output_path = images_dir.join(&stem).with_extension(extension);
    copy(image_path, &image_output_path)?;

    let (width, height) =
        image::image_dimensions(image_path).map_err(|source| AnnotateError::ImageDimensions {
            path: image_path.to_path_buf(),
            source,
        })?;

    let label_output_path = labels_dir.join(&stem).with_extension("txt");
    let mut writer = BufWriter::new(File::create(&label_output_path)?);
    writer.write_all(format_labels(store, image_path, width, height).as_bytes())?;
    Ok(())
}

/// Render one image's annotations as YOLO segmentation label lines:
/// `<class_id> <x1> <y1> ... <xn> <yn>` with coordinates normalized by the
/// image dimensions. Out-of-bounds polygons are a caller error and are not
/// re-clamped here.
pub fn format_labels(store: &AnnotationStore, image_path: &Path, width: u32, height: u32) -> String {
    let annotations = store.annotations_for(image_path);
    let mut label_data = String::with_capacity(annotations.len() * 64);

    for annotation in annotations {
        label_data.push_str(&format!("{}", annotation.class_id));
        for point in annotation.polygon.points() {
            let x_norm = point.x / width as f64;
            let y_norm = point.y / height as f64;
            label_data.push_str(&format!(" {:.6} {:.6}", x_norm, y_norm));
        }
        label_data.push('\n');
    }

    label_data
}

/// Write the `data.yaml` manifest: class names in ascending id order, the
/// class count, and the three split image directories under their canonical
/// keys.
pub fn create_data_yaml(
    destination: &Path,
    registry: &ClassRegistry,
) -> Result<PathBuf, AnnotateError> {
    let yaml_path = destination.join("data.yaml");
    let mut writer = BufWriter::new(File::create(&yaml_path)?);

    let mut yaml_content = String::from("names:\n");
    for id in registry.list_ids() {
        yaml_content.push_str(&format!("- {}\n", registry.lookup(id).name));
    }
    yaml_content.push_str(&format!("nc: {}\n", registry.len()));
    yaml_content.push_str("test: test/images\n");
    yaml_content.push_str("train: train/images\n");
    yaml_content.push_str("val: val/images\n");

    writer.write_all(yaml_content.as_bytes())?;
    Ok(yaml_path)
}

/// Create an output directory (and parents) and return its path. Existing
/// directories are left untouched; destinations are expected to be fresh.
fn create_output_directory(path: &Path) -> std::io::Result<PathBuf> {
    fs::create_dir_all(path)?;
    Ok(path.to_path_buf())
}

/// Create a progress bar with the given length and label
fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar().template(&format!(
        "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
        label
    )) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
