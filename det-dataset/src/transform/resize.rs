use super::Transform;
use crate::{
    common::*,
    record::{Annotation, Image},
};
use anyhow::{ensure, Result};

/// Aspect-preserving resize.
///
/// The short side is scaled to `min_size` unless the long side would exceed
/// `max_size`, in which case the long side is scaled to `max_size`.
#[derive(Debug, Clone, PartialEq)]
pub struct Resize {
    min_size: usize,
    max_size: usize,
}

impl Resize {
    pub fn new(min_size: usize, max_size: usize) -> Result<Self> {
        ensure!(min_size > 0, "min_size must be positive");
        ensure!(
            max_size >= min_size,
            "max_size must not be less than min_size"
        );
        Ok(Self { min_size, max_size })
    }

    /// Compute the `(width, height)` after resizing.
    pub fn target_size(&self, width: usize, height: usize) -> (usize, usize) {
        let short = width.min(height) as f64;
        let long = width.max(height) as f64;
        let scale = (self.min_size as f64 / short).min(self.max_size as f64 / long);
        let new_w = ((width as f64 * scale).round() as usize).max(1);
        let new_h = ((height as f64 * scale).round() as usize).max(1);
        (new_w, new_h)
    }
}

impl Transform for Resize {
    fn apply(&self, image: Image, mut annotation: Annotation) -> Result<(Image, Annotation)> {
        let (_, h, w) = image.dim();
        ensure!(h > 0 && w > 0, "cannot resize an empty image");

        let (new_w, new_h) = self.target_size(w, h);
        let scale_x = new_w as f32 / w as f32;
        let scale_y = new_h as f32 / h as f32;

        let image = resize_bilinear(&image, new_h, new_w);
        scale_boxes(&mut annotation.bboxes, scale_x, scale_y);
        scale_boxes(&mut annotation.bboxes_ignore, scale_x, scale_y);
        annotation.img_size = (new_w, new_h);

        Ok((image, annotation))
    }
}

fn scale_boxes(bboxes: &mut Array2<f32>, scale_x: f32, scale_y: f32) {
    bboxes.outer_iter_mut().for_each(|mut row| {
        row[0] *= scale_x;
        row[1] *= scale_y;
        row[2] *= scale_x;
        row[3] *= scale_y;
    });
}

/// Bilinear interpolation with half-pixel centers.
pub(crate) fn resize_bilinear(image: &Image, new_h: usize, new_w: usize) -> Image {
    let (channels, h, w) = image.dim();
    let ys: Vec<_> = (0..new_h)
        .map(|y| source_coord(y, h as f32 / new_h as f32, h))
        .collect();
    let xs: Vec<_> = (0..new_w)
        .map(|x| source_coord(x, w as f32 / new_w as f32, w))
        .collect();

    Array3::from_shape_fn((channels, new_h, new_w), |(c, y, x)| {
        let (y0, y1, fy) = ys[y];
        let (x0, x1, fx) = xs[x];
        let top = image[[c, y0, x0]] * (1.0 - fx) + image[[c, y0, x1]] * fx;
        let bottom = image[[c, y1, x0]] * (1.0 - fx) + image[[c, y1, x1]] * fx;
        top * (1.0 - fy) + bottom * fy
    })
}

fn source_coord(dst: usize, scale: f32, len: usize) -> (usize, usize, f32) {
    let src = ((dst as f32 + 0.5) * scale - 0.5).max(0.0);
    let lo = (src.floor() as usize).min(len - 1);
    let hi = (lo + 1).min(len - 1);
    let frac = if hi == lo { 0.0 } else { src - lo as f32 };
    (lo, hi, frac)
}
