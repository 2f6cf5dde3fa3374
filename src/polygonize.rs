use crate::error::AnnotateError;
use crate::types::{BoundingBox, Point, Polygon};

/// A 2D boolean grid, as returned by a segmentation collaborator.
/// Row-major, `data[y * width + x]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: usize,
    height: usize,
    data: Vec<bool>,
}

impl Mask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![false; width * height],
        }
    }

    /// Build a mask from a per-pixel predicate.
    pub fn from_fn<F: FnMut(usize, usize) -> bool>(width: usize, height: usize, mut f: F) -> Self {
        let mut mask = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                mask.data[y * width + x] = f(x, y);
            }
        }
        mask
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.data[y * self.width + x]
    }

    /// Bounds-tolerant lookup used by the tracer; everything outside the grid
    /// is background.
    fn at(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && self.get(x as usize, y as usize)
    }
}

// Moore neighborhood in clockwise order starting west (image coordinates,
// y grows downward).
const NEIGHBORS: [(isize, isize); 8] = [
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
];

fn direction_index(delta: (isize, isize)) -> usize {
    NEIGHBORS
        .iter()
        .position(|&d| d == delta)
        .unwrap_or_default()
}

/// Trace the external contours of the mask's foreground regions.
///
/// Components are discovered in row-major scan order and traced clockwise with
/// Moore boundary following (8-connectivity), then collinear unit-step runs
/// are compressed to their endpoints, matching a simple chain-approximation
/// tracer. Contours with fewer than 3 points after compression cannot form a
/// polygon and are discarded, so an all-background mask yields an empty
/// sequence. Holes are not traced.
pub fn polygonize(mask: &Mask) -> Vec<Polygon> {
    let mut visited = vec![false; mask.width * mask.height];
    let mut polygons = Vec::new();

    for y in 0..mask.height {
        for x in 0..mask.width {
            if !mask.get(x, y) || visited[y * mask.width + x] {
                continue;
            }
            mark_component(mask, x, y, &mut visited);
            // Scan order guarantees (x, y) is the topmost-leftmost pixel of
            // its component, so its west neighbor is background.
            let contour = compress_collinear(trace_boundary(mask, x, y));
            if contour.len() >= 3 {
                let points = contour
                    .into_iter()
                    .map(|(px, py)| Point::new(px as f64, py as f64))
                    .collect();
                polygons.push(Polygon::new(points));
            }
        }
    }

    polygons
}

/// Flood-fill one 8-connected foreground component so it is only traced once.
fn mark_component(mask: &Mask, sx: usize, sy: usize, visited: &mut [bool]) {
    let mut stack = vec![(sx, sy)];
    visited[sy * mask.width + sx] = true;
    while let Some((x, y)) = stack.pop() {
        for &(dx, dy) in &NEIGHBORS {
            let (nx, ny) = (x as isize + dx, y as isize + dy);
            if mask.at(nx, ny) && !visited[ny as usize * mask.width + nx as usize] {
                visited[ny as usize * mask.width + nx as usize] = true;
                stack.push((nx as usize, ny as usize));
            }
        }
    }
}

/// Moore boundary following from the component's topmost-leftmost pixel,
/// terminated by Jacob's criterion (re-entering the start pixel with the same
/// first move).
fn trace_boundary(mask: &Mask, sx: usize, sy: usize) -> Vec<(isize, isize)> {
    let start = (sx as isize, sy as isize);
    let mut contour = vec![start];
    let mut current = start;
    // The west neighbor of the start pixel is background, so begin the
    // clockwise sweep there.
    let mut search_from = 0usize;
    let mut first_move: Option<((isize, isize), usize)> = None;
    let step_cap = 4 * mask.width * mask.height + 8;

    for _ in 0..step_cap {
        let mut next = None;
        for i in 0..8 {
            let dir = (search_from + i) % 8;
            let candidate = (current.0 + NEIGHBORS[dir].0, current.1 + NEIGHBORS[dir].1);
            if mask.at(candidate.0, candidate.1) {
                // The previously examined neighbor is known background and
                // becomes the next backtrack pixel.
                let backtrack_dir = (search_from + i + 7) % 8;
                next = Some((candidate, dir, backtrack_dir));
                break;
            }
        }
        let Some((candidate, dir, backtrack_dir)) = next else {
            // Isolated pixel: no foreground neighbor at all.
            break;
        };

        if current == start {
            match first_move {
                None => first_move = Some((candidate, dir)),
                Some(first) if first == (candidate, dir) => break,
                Some(_) => {}
            }
        }

        let backtrack = (
            current.0 + NEIGHBORS[backtrack_dir].0,
            current.1 + NEIGHBORS[backtrack_dir].1,
        );
        current = candidate;
        search_from = direction_index((backtrack.0 - current.0, backtrack.1 - current.1));
        contour.push(current);
    }

    if contour.len() > 1 && contour.first() == contour.last() {
        contour.pop();
    }
    contour
}

/// Drop interior points of straight horizontal/vertical/diagonal runs,
/// keeping run endpoints. Consecutive traced points are always unit steps, so
/// comparing step directions is sufficient.
fn compress_collinear(points: Vec<(isize, isize)>) -> Vec<(isize, isize)> {
    let n = points.len();
    if n < 3 {
        return points;
    }
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let prev = points[(i + n - 1) % n];
        let cur = points[i];
        let next = points[(i + 1) % n];
        let incoming = (cur.0 - prev.0, cur.1 - prev.1);
        let outgoing = (next.0 - cur.0, next.1 - cur.1);
        if incoming != outgoing {
            out.push(cur);
        }
    }
    out
}

/// Min/max reduction over the polygon's coordinates.
pub fn bounding_box(polygon: &Polygon) -> Result<BoundingBox, AnnotateError> {
    if polygon.is_empty() {
        return Err(AnnotateError::InvalidPolygon);
    }

    let (x_min, y_min, x_max, y_max) = polygon.points().iter().fold(
        (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
        |(x_min, y_min, x_max, y_max), p| {
            (
                x_min.min(p.x),
                y_min.min(p.y),
                x_max.max(p.x),
                y_max.max(p.y),
            )
        },
    );

    Ok(BoundingBox {
        x_min,
        y_min,
        x_max,
        y_max,
    })
}
