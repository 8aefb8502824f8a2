use super::Transform;
use crate::{
    common::*,
    record::{Annotation, Image},
};
use anyhow::{ensure, Result};

/// Horizontal flip applied with probability `prob`.
///
/// Only the valid region given by `img_size` is mirrored, so padding stays
/// at the right edge. The coin is drawn from the thread-local generator and
/// is not affected by the loader seed.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomFlip {
    prob: f64,
}

impl RandomFlip {
    pub fn new(prob: f64) -> Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&prob),
            "flip probability must be in range [0, 1], but get {}",
            prob
        );
        Ok(Self { prob })
    }
}

impl Transform for RandomFlip {
    fn apply(&self, mut image: Image, mut annotation: Annotation) -> Result<(Image, Annotation)> {
        if !rand::thread_rng().gen_bool(self.prob) {
            return Ok((image, annotation));
        }

        let (_, h, w) = image.dim();
        let (valid_w, valid_h) = annotation.img_size;
        ensure!(
            valid_w <= w && valid_h <= h,
            "img_size {:?} exceeds the image shape ({}, {})",
            annotation.img_size,
            w,
            h
        );

        let flipped = image.slice(s![.., .., ..valid_w;-1]).to_owned();
        image.slice_mut(s![.., .., ..valid_w]).assign(&flipped);
        flip_boxes(&mut annotation.bboxes, valid_w as f32);
        flip_boxes(&mut annotation.bboxes_ignore, valid_w as f32);

        Ok((image, annotation))
    }
}

fn flip_boxes(bboxes: &mut Array2<f32>, width: f32) {
    bboxes.outer_iter_mut().for_each(|mut row| {
        let x1 = row[0];
        let x2 = row[2];
        row[0] = width - x2;
        row[2] = width - x1;
    });
}
