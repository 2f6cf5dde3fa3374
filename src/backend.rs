use image::RgbImage;
use log::debug;

use crate::polygonize::Mask;
use crate::session::MaskGenerator;
use crate::types::Point;

/// A model-free mask backend: grows a region outward from the clicked pixel
/// over 4-connected neighbors whose color stays within `tolerance` (Euclidean
/// RGB distance) of the seed color. A stand-in for a promptable segmentation
/// model that makes the tool usable without a checkpoint on disk.
pub struct RegionGrowBackend {
    tolerance: f64,
}

impl RegionGrowBackend {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }
}

impl Default for RegionGrowBackend {
    fn default() -> Self {
        Self::new(24.0)
    }
}

impl MaskGenerator for RegionGrowBackend {
    fn generate(
        &mut self,
        image: &RgbImage,
        point: Point,
    ) -> Result<Vec<Mask>, Box<dyn std::error::Error>> {
        let (width, height) = (image.width() as usize, image.height() as usize);
        if point.x < 0.0 || point.y < 0.0 {
            return Ok(Vec::new());
        }
        let (sx, sy) = (point.x as usize, point.y as usize);
        if sx >= width || sy >= height {
            return Ok(Vec::new());
        }

        let seed = image.get_pixel(sx as u32, sy as u32).0;
        let tolerance_sq = self.tolerance * self.tolerance;
        let within = |pixel: [u8; 3]| {
            let dist_sq: f64 = seed
                .iter()
                .zip(pixel.iter())
                .map(|(&a, &b)| {
                    let d = a as f64 - b as f64;
                    d * d
                })
                .sum();
            dist_sq <= tolerance_sq
        };

        let mut mask = Mask::new(width, height);
        mask.set(sx, sy, true);
        let mut stack = vec![(sx, sy)];
        let mut grown = 1usize;
        while let Some((x, y)) = stack.pop() {
            let neighbors = [
                (x.wrapping_sub(1), y),
                (x + 1, y),
                (x, y.wrapping_sub(1)),
                (x, y + 1),
            ];
            for (nx, ny) in neighbors {
                if nx < width
                    && ny < height
                    && !mask.get(nx, ny)
                    && within(image.get_pixel(nx as u32, ny as u32).0)
                {
                    mask.set(nx, ny, true);
                    stack.push((nx, ny));
                    grown += 1;
                }
            }
        }

        debug!("Region grown from ({}, {}): {} pixels", sx, sy, grown);
        Ok(vec![mask])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn two_tone_image() -> RgbImage {
        // White background with a 4x4 black square at (2, 2).
        RgbImage::from_fn(10, 10, |x, y| {
            if (2..6).contains(&x) && (2..6).contains(&y) {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        })
    }

    #[test]
    fn test_region_grow_selects_clicked_object() {
        let image = two_tone_image();
        let mut backend = RegionGrowBackend::new(24.0);
        let masks = backend.generate(&image, Point::new(3.0, 3.0)).unwrap();
        assert_eq!(masks.len(), 1);

        let mask = &masks[0];
        for y in 0..10 {
            for x in 0..10 {
                let inside = (2..6).contains(&x) && (2..6).contains(&y);
                assert_eq!(mask.get(x, y), inside, "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_click_outside_image_yields_no_masks() {
        let image = two_tone_image();
        let mut backend = RegionGrowBackend::default();
        assert!(backend
            .generate(&image, Point::new(-1.0, 3.0))
            .unwrap()
            .is_empty());
        assert!(backend
            .generate(&image, Point::new(30.0, 3.0))
            .unwrap()
            .is_empty());
    }
}
