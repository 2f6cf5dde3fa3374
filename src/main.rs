use clap::Parser;
use glob::glob;
use log::{error, info};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use click2yolo::types::IMG_FORMATS;
use click2yolo::{
    bounding_box, export_dataset, Args, Point, Polygon, RegionGrowBackend, Session,
};

/// Pending polygons from the last click, awaiting keep/discard.
struct PendingMask {
    image: PathBuf,
    polygons: Vec<Polygon>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let image_dir = PathBuf::from(&args.image_dir);
    if !image_dir.exists() {
        error!("The specified image_dir does not exist: {}", args.image_dir);
        return Err(format!("no such directory: {}", args.image_dir).into());
    }

    let images = collect_images(&image_dir);
    if images.is_empty() {
        return Err(format!("no images found under {}", image_dir.display()).into());
    }
    info!("Found {} images under {}", images.len(), image_dir.display());

    let mut session = Session::new();
    let mut backend = RegionGrowBackend::new(args.tolerance);
    let mut current: usize = 0;
    let mut current_class: u32 = 0;
    let mut pending: Option<PendingMask> = None;

    println!("{} images loaded. Type 'help' for commands.", images.len());
    print_status(&session, &images, current);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, rest)) = tokens.split_first() else {
            continue;
        };

        match command {
            "help" => print_help(),
            "quit" | "exit" => break,
            "images" => {
                for (i, path) in images.iter().enumerate() {
                    let count = session.store().annotations_for(path).len();
                    println!("{:>4}  {} ({} annotations)", i, path.display(), count);
                }
            }
            "open" => match rest.first().and_then(|s| s.parse::<usize>().ok()) {
                Some(n) if n < images.len() => {
                    current = n;
                    pending = None;
                    print_status(&session, &images, current);
                }
                _ => println!("usage: open <index 0..{}>", images.len() - 1),
            },
            "next" => {
                if current + 1 < images.len() {
                    current += 1;
                    pending = None;
                }
                print_status(&session, &images, current);
            }
            "prev" => {
                if current > 0 {
                    current -= 1;
                    pending = None;
                }
                print_status(&session, &images, current);
            }
            "click" => {
                let coords: Vec<f64> = rest.iter().filter_map(|s| s.parse().ok()).collect();
                if coords.len() != 2 {
                    println!("usage: click <x> <y> (original-image pixel coordinates)");
                    continue;
                }
                match click(&mut backend, &session, &images[current], coords[0], coords[1]) {
                    Some(polygons) => {
                        println!(
                            "Mask found: {} polygon(s). 'keep' to accept as class {}, 'discard' to drop.",
                            polygons.len(),
                            current_class
                        );
                        for poly in &polygons {
                            if let Ok(bbox) = bounding_box(poly) {
                                println!(
                                    "  {} vertices, bbox ({:.1}, {:.1})..({:.1}, {:.1})",
                                    poly.len(),
                                    bbox.x_min,
                                    bbox.y_min,
                                    bbox.x_max,
                                    bbox.y_max
                                );
                            }
                        }
                        pending = Some(PendingMask {
                            image: images[current].clone(),
                            polygons,
                        });
                    }
                    None => println!("No mask found for selected point"),
                }
            }
            "keep" => match pending.take() {
                Some(mask) => {
                    let count = mask.polygons.len();
                    for polygon in mask.polygons {
                        session.add_annotation(&mask.image, polygon, current_class);
                    }
                    println!("Kept {} polygon(s) as class {}", count, current_class);
                }
                None => println!("Nothing pending; 'click' first"),
            },
            "discard" => {
                if pending.take().is_some() {
                    println!("Discarded pending mask");
                } else {
                    println!("Nothing pending");
                }
            }
            "class" => match rest.first().and_then(|s| s.parse::<u32>().ok()) {
                Some(id) => {
                    current_class = id;
                    let info = session.registry().lookup(id);
                    println!("Current class: {} ({})", id, info.name);
                }
                None => println!("usage: class <id>"),
            },
            "classes" => {
                for id in session.registry().list_ids() {
                    let info = session.registry().lookup(id);
                    println!("{:>3}  {}  {}", id, info.color, info.name);
                }
            }
            "addclass" => match parse_class_args(rest) {
                Some((id, name)) => match session.add_class(id, &name) {
                    Ok(()) => println!("Added class {}: {}", id, name),
                    Err(e) => println!("Error: {}", e),
                },
                None => println!("usage: addclass <id> <name>"),
            },
            "editclass" => {
                let ids: Option<(u32, u32)> = match (rest.first(), rest.get(1)) {
                    (Some(a), Some(b)) => a.parse().ok().zip(b.parse().ok()),
                    _ => None,
                };
                match (ids, rest.get(2..)) {
                    (Some((old_id, new_id)), Some(name_parts)) if !name_parts.is_empty() => {
                        let name = name_parts.join(" ");
                        match session.edit_class(old_id, new_id, &name) {
                            Ok(()) => println!("Class {} is now {} ({})", old_id, new_id, name),
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    _ => println!("usage: editclass <old_id> <new_id> <name>"),
                }
            }
            "list" => {
                let annotations = session.store().annotations_for(&images[current]);
                if annotations.is_empty() {
                    println!("No annotations on this image");
                }
                for (i, annotation) in annotations.iter().enumerate() {
                    let info = session.registry().lookup(annotation.class_id);
                    println!(
                        "{:>3}  class {} ({}), {} vertices",
                        i,
                        annotation.class_id,
                        info.name,
                        annotation.polygon.len()
                    );
                }
            }
            "remove" => match rest.first().and_then(|s| s.parse::<usize>().ok()) {
                Some(index) => match session.remove_annotation(&images[current], index) {
                    Ok(()) => println!("Removed annotation {}", index),
                    Err(e) => println!("Error: {}", e),
                },
                None => println!("usage: remove <index>"),
            },
            "undo" => {
                if session.undo() {
                    println!("Undone");
                } else {
                    println!("Nothing to undo");
                }
            }
            "redo" => {
                if session.redo() {
                    println!("Redone");
                } else {
                    println!("Nothing to redo");
                }
            }
            "save" => match rest.first() {
                Some(path) => match session.save(Path::new(path)) {
                    Ok(()) => println!("Saved to {}", path),
                    Err(e) => println!("Error: {}", e),
                },
                None => println!("usage: save <file>"),
            },
            "load" => match rest.first() {
                Some(path) => match session.load(Path::new(path)) {
                    Ok(()) => println!("Loaded {}", path),
                    Err(e) => println!("Error: {}", e),
                },
                None => println!("usage: load <file>"),
            },
            "export" => match rest.first() {
                Some(dir) => {
                    match export_dataset(
                        session.store(),
                        session.registry(),
                        Path::new(dir),
                        args.seed,
                    ) {
                        Ok(manifest) => println!(
                            "Exported {} train / {} val / {} test images to {}",
                            manifest.train.len(),
                            manifest.val.len(),
                            manifest.test.len(),
                            dir
                        ),
                        Err(e) => println!("Export failed: {}", e),
                    }
                }
                None => println!("usage: export <directory>"),
            },
            "status" => print_status(&session, &images, current),
            other => println!("Unknown command '{}'; type 'help'", other),
        }
    }

    Ok(())
}

/// Collect annotatable images under `dir`, sorted for a stable ordering.
fn collect_images(dir: &Path) -> Vec<PathBuf> {
    let mut images = Vec::new();
    for ext in IMG_FORMATS {
        let pattern = format!("{}/**/*.{}", dir.display(), ext);
        if let Ok(entries) = glob(&pattern) {
            images.extend(entries.filter_map(|entry| entry.ok()));
        }
    }
    images.sort();
    images.dedup();
    images
}

/// Run one click through the mask backend against the image on disk.
fn click(
    backend: &mut RegionGrowBackend,
    session: &Session,
    image_path: &Path,
    x: f64,
    y: f64,
) -> Option<Vec<Polygon>> {
    let image = match image::open(image_path) {
        Ok(image) => image.to_rgb8(),
        Err(e) => {
            error!("Failed to open {}: {}", image_path.display(), e);
            return None;
        }
    };
    session.request_mask(backend, &image, Point::new(x, y))
}

fn parse_class_args(rest: &[&str]) -> Option<(u32, String)> {
    let id = rest.first()?.parse::<u32>().ok()?;
    let name_parts = rest.get(1..)?;
    if name_parts.is_empty() {
        return None;
    }
    Some((id, name_parts.join(" ")))
}

fn print_status(session: &Session, images: &[PathBuf], current: usize) {
    println!(
        "Image {}/{}: {} | Annotated: {}/{}",
        current + 1,
        images.len(),
        images[current].display(),
        session.annotated_image_count(),
        images.len()
    );
}

fn print_help() {
    println!(
        "\
Commands:
  images                     list loaded images
  open <n> | next | prev     navigate images
  click <x> <y>              request a mask at a pixel coordinate
  keep | discard             accept or drop the pending mask
  class <id>                 set the class applied by 'keep'
  classes                    list registered classes
  addclass <id> <name>       register a class (palette slot <id>)
  editclass <old> <new> <name>  rename/renumber a class (cascades)
  list                       list annotations on the current image
  remove <index>             delete an annotation on the current image
  undo | redo                step through history
  save <file> | load <file>  persist or restore the session as JSON
  export <dir>               write the YOLO dataset
  status                     show progress
  quit"
    );
}
