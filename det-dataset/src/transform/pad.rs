use super::Transform;
use crate::{
    common::*,
    record::{Annotation, Image},
};
use anyhow::{ensure, Result};

/// Zero-pads the bottom and right so both sides are multiples of
/// `size_divisor`. The annotation is left untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Pad {
    size_divisor: usize,
}

impl Pad {
    pub fn new(size_divisor: usize) -> Result<Self> {
        ensure!(size_divisor > 0, "size_divisor must be positive");
        Ok(Self { size_divisor })
    }
}

impl Transform for Pad {
    fn apply(&self, image: Image, annotation: Annotation) -> Result<(Image, Annotation)> {
        let (channels, h, w) = image.dim();
        let pad_h = round_up(h, self.size_divisor);
        let pad_w = round_up(w, self.size_divisor);

        if (pad_h, pad_w) == (h, w) {
            return Ok((image, annotation));
        }

        let mut padded = Array3::zeros((channels, pad_h, pad_w));
        padded.slice_mut(s![.., ..h, ..w]).assign(&image);

        Ok((padded, annotation))
    }
}

fn round_up(value: usize, divisor: usize) -> usize {
    (value + divisor - 1) / divisor * divisor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::tests::annotation;

    #[test]
    fn pad_to_divisor() {
        let pad = Pad::new(4).unwrap();
        let image = Array3::from_elem((3, 5, 8), 1.0);
        let (image, ann) = pad.apply(image, annotation(8, 5)).unwrap();

        assert_eq!(image.dim(), (3, 8, 8));
        assert_eq!(image[[2, 4, 7]], 1.0);
        assert_eq!(image[[2, 5, 0]], 0.0);
        assert_eq!(ann.img_size, (8, 5));
    }
}
