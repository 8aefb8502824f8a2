use super::Transform;
use crate::{
    common::*,
    record::{Annotation, Image},
};
use anyhow::{ensure, Result};

/// Per-channel `(x - mean) / std`, optionally swapping RGB to BGR first.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalize {
    mean: [f32; 3],
    std: [f32; 3],
    to_bgr: bool,
}

impl Normalize {
    pub fn new(mean: [f32; 3], std: [f32; 3], to_bgr: bool) -> Result<Self> {
        ensure!(
            std.iter().all(|&value| value != 0.0),
            "std must be non-zero, but get {:?}",
            std
        );
        Ok(Self { mean, std, to_bgr })
    }
}

impl Transform for Normalize {
    fn apply(&self, image: Image, annotation: Annotation) -> Result<(Image, Annotation)> {
        let (channels, _, _) = image.dim();
        ensure!(
            channels == 3,
            "channel size must be 3, but get {}",
            channels
        );

        let mut image = if self.to_bgr {
            image.slice(s![..;-1, .., ..]).to_owned()
        } else {
            image
        };

        image
            .outer_iter_mut()
            .zip(self.mean.iter().zip(&self.std))
            .for_each(|(mut channel, (&mean, &std))| {
                channel.mapv_inplace(|value| (value - mean) / std);
            });

        Ok((image, annotation))
    }
}
