//! Padded batch assembly for images of different sizes.

use crate::{
    common::*,
    error::{DatasetError, Result},
    record::{Annotation, Sample},
};

/// A zero-padded stack of images with their annotations.
///
/// `images` has shape `(n, 3, max_height, max_width)`. Annotations are not
/// padded, so the valid extent of each image is given by its own `img_size`.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub images: Array4<f32>,
    pub annotations: Vec<Annotation>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

/// Stack samples into a batch, placing each image at the top-left corner.
///
/// The padded extent is the maximum over the actual image shapes, not over
/// the `img_size` fields.
pub fn collate_batch(samples: Vec<Sample>) -> Result<Batch> {
    if samples.is_empty() {
        return Err(DatasetError::EmptyBatch);
    }

    let mut max_height = 0;
    let mut max_width = 0;

    for (index, sample) in samples.iter().enumerate() {
        let (channels, height, width) = sample.image.dim();
        if channels != 3 {
            return Err(DatasetError::InvalidImage {
                reason: format!(
                    "sample {} has {} channels, but 3 channels are expected",
                    index, channels
                ),
            });
        }

        if img_size_exceeds_image(&sample.annotation, height, width) {
            warn!(
                "img_size {:?} of '{}' exceeds its image shape ({}, {})",
                sample.annotation.img_size,
                sample.annotation.img_file.display(),
                width,
                height
            );
        }

        max_height = max_height.max(height);
        max_width = max_width.max(width);
    }

    let mut images = Array4::zeros((samples.len(), 3, max_height, max_width));
    let annotations: Vec<_> = samples
        .into_iter()
        .zip(images.outer_iter_mut())
        .map(|(sample, mut slot)| {
            let (image, annotation) = sample.into_parts();
            let (_, height, width) = image.dim();
            slot.slice_mut(s![.., ..height, ..width]).assign(&image);
            annotation
        })
        .collect();

    Ok(Batch {
        images,
        annotations,
    })
}

/// Whether the valid extent recorded in `img_size` lies outside the image
/// array. A smaller extent is expected after padding.
fn img_size_exceeds_image(annotation: &Annotation, height: usize, width: usize) -> bool {
    let (ann_w, ann_h) = annotation.img_size;
    ann_w > width || ann_h > height
}
