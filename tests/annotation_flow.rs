//! End-to-end flow: click -> mask -> polygon -> store -> export.

use std::fs;

use image::Rgb;

use click2yolo::{
    bounding_box, export_dataset, MaskGenerator, Point, RegionGrowBackend, Session,
};

#[test]
fn test_click_to_export_flow() {
    let dir = tempfile::tempdir().unwrap();

    // A white image with a black 6x4 box at (3, 2).
    let image = image::RgbImage::from_fn(16, 12, |x, y| {
        if (3..9).contains(&x) && (2..6).contains(&y) {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    });
    let image_path = dir.path().join("scene.png");
    image.save(&image_path).unwrap();

    let mut session = Session::new();
    session.add_class(1, "box").unwrap();

    let mut backend = RegionGrowBackend::new(24.0);
    let polygons = session
        .request_mask(&mut backend, &image, Point::new(5.0, 3.0))
        .expect("click inside the box should produce a mask");
    assert_eq!(polygons.len(), 1);

    let bbox = bounding_box(&polygons[0]).unwrap();
    assert_eq!(bbox.x_min, 3.0);
    assert_eq!(bbox.y_min, 2.0);
    assert_eq!(bbox.x_max, 8.0);
    assert_eq!(bbox.y_max, 5.0);

    for polygon in polygons {
        session.add_annotation(&image_path, polygon, 1);
    }
    assert_eq!(session.annotated_image_count(), 1);

    // Clicking the background selects the background region, not the box.
    let background = session
        .request_mask(&mut backend, &image, Point::new(0.0, 0.0))
        .expect("background click still traces a region");
    let bg_bbox = bounding_box(&background[0]).unwrap();
    assert_eq!(bg_bbox.x_max, 15.0);
    assert_eq!(bg_bbox.y_max, 11.0);

    // An undone annotation does not export.
    session.add_annotation(&image_path, background[0].clone(), 0);
    assert!(session.undo());

    let destination = dir.path().join("dataset");
    let manifest = export_dataset(session.store(), session.registry(), &destination, 42).unwrap();
    assert_eq!(
        manifest.train.len() + manifest.val.len() + manifest.test.len(),
        1
    );

    let split = ["train", "val", "test"]
        .into_iter()
        .find(|split| destination.join(split).join("labels").join("scene.txt").exists())
        .unwrap();
    let labels =
        fs::read_to_string(destination.join(split).join("labels").join("scene.txt")).unwrap();
    let lines: Vec<_> = labels.lines().collect();
    assert_eq!(lines.len(), 1, "the undone annotation must not be written");
    assert!(lines[0].starts_with("1 "));

    // Pixel 3 of 16 normalizes to 0.1875.
    assert!(lines[0].contains("0.187500"));
}

#[test]
fn test_clicking_nothing_is_a_neutral_outcome() {
    let image = image::RgbImage::new(8, 8);
    let session = Session::new();
    let mut backend = RegionGrowBackend::default();

    // Out of bounds: the collaborator returns no masks and the engine
    // reports "no object found" instead of erroring.
    assert!(session
        .request_mask(&mut backend, &image, Point::new(100.0, 100.0))
        .is_none());

    // The collaborator itself also behaves.
    assert!(backend
        .generate(&image, Point::new(100.0, 100.0))
        .unwrap()
        .is_empty());
}
