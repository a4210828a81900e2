use image::{imageops, GrayImage, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::dilate;
use imageproc::point::Point;

use crate::adapters::vision::overlay::{draw_contours, draw_count, CONTOUR_COLOR};
use crate::application::ports::Detector;
use crate::domain::{
    detection::Algorithm,
    errors::DetectionError,
    frame::{Annotated, Frame},
};

/// Sigma a 7x7 Gaussian kernel gets when none is given: 0.3 * ((7 - 1) / 2 - 1) + 0.8.
pub const BLUR_SIGMA: f32 = 1.4;
pub const CANNY_LOW: f32 = 100.0;
pub const CANNY_HIGH: f32 = 150.0;
/// Zero passes: the dilation is a no-op, kept so edge maps (and counts)
/// stay identical to the dashboard's established behaviour.
pub const CANNY_DILATE_ITERATIONS: usize = 0;

pub type Contour = Vec<Point<i32>>;

/// Grayscale, Gaussian blur, inverse Otsu threshold, simplified external contours.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContourOtsu;

/// Grayscale, Canny (which applies the 7x7 Gaussian blur itself),
/// full-chain external contours.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContourCanny;

impl Detector for ContourOtsu {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Otsu
    }

    fn detect(&self, frame: &Frame) -> Result<Annotated, DetectionError> {
        let blurred = gray_blur(frame.image());
        let mask = inverse_otsu_mask(&blurred);
        let contours: Vec<Contour> = external_contours(&mask)
            .iter()
            .map(|c| approx_simple(c))
            .collect();
        Ok(annotate(frame.image(), &contours))
    }
}

impl Detector for ContourCanny {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Canny
    }

    fn detect(&self, frame: &Frame) -> Result<Annotated, DetectionError> {
        // imageproc's canny blurs with sigma 1.4 before the gradient; a second
        // blur here would weaken edges below the thresholds.
        let gray = imageops::grayscale(frame.image());
        let edges = canny(&gray, CANNY_LOW, CANNY_HIGH);
        let dilated = dilate_passes(&edges, CANNY_DILATE_ITERATIONS);
        let contours = external_contours(&dilated);
        Ok(annotate(frame.image(), &contours))
    }
}

fn annotate(source: &RgbImage, contours: &[Contour]) -> Annotated {
    let mut image = source.clone();
    draw_contours(&mut image, contours, CONTOUR_COLOR);
    draw_count(&mut image, contours.len());
    Annotated { image, count: contours.len() }
}

pub fn gray_blur(image: &RgbImage) -> GrayImage {
    let gray = imageops::grayscale(image);
    gaussian_blur_f32(&gray, BLUR_SIGMA)
}

/// Foreground (255) is everything at or below Otsu's level.
///
/// The legacy fixed cutoff of 80 is never used: Otsu's level always replaces
/// it. A frame with a single intensity has no class split, so it produces an
/// empty mask instead of one frame-sized blob.
pub fn inverse_otsu_mask(blurred: &GrayImage) -> GrayImage {
    let (w, h) = blurred.dimensions();
    let first = blurred.pixels().next().map(|p| p.0[0]);
    if first.map_or(true, |v| blurred.pixels().all(|p| p.0[0] == v)) {
        return GrayImage::new(w, h);
    }

    let level = otsu_level(blurred);
    let mut mask = blurred.clone();
    for p in mask.pixels_mut() {
        p.0[0] = if p.0[0] > level { 0 } else { 255 };
    }
    mask
}

pub fn dilate_passes(edges: &GrayImage, passes: usize) -> GrayImage {
    (0..passes).fold(edges.clone(), |img, _| dilate(&img, Norm::LInf, 1))
}

/// Outer borders of top-level components only, every border pixel kept.
pub fn external_contours(mask: &GrayImage) -> Vec<Contour> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.parent.is_none() && c.border_type == BorderType::Outer)
        .map(|c| c.points)
        .collect()
}

/// Collapses straight runs to their end points, keeping only the pixels
/// where the chain changes direction.
pub fn approx_simple(points: &[Point<i32>]) -> Contour {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let mut out: Contour = (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let cur = points[i];
            let next = points[(i + 1) % n];
            (cur.x - prev.x, cur.y - prev.y) != (next.x - cur.x, next.y - cur.y)
        })
        .map(|i| points[i])
        .collect();
    if out.is_empty() {
        out.push(points[0]);
    }
    out
}
