//! Manifest records and the per-sample annotation produced from them.

use crate::common::*;
use serde::Serializer;

/// The decoded image in channel-first `(3, height, width)` layout.
pub type Image = Array3<f32>;

/// A box given as `[x1, y1, x2, y2]` in manifest pixel units.
pub type RawBox = [f64; 4];

/// One manifest entry describing a single image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub filename: PathBuf,
    pub width: usize,
    pub height: usize,
    #[serde(rename = "ann", alias = "annotation")]
    pub annotation: RawAnnotation,
}

/// The ground truth of a manifest entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawAnnotation {
    pub bboxes: Vec<RawBox>,
    pub labels: Vec<Label>,
    #[serde(default)]
    pub bboxes_ignore: Vec<RawBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels_ignore: Option<Vec<Label>>,
}

impl AnnotationRecord {
    pub fn num_bboxes(&self) -> usize {
        self.annotation.bboxes.len()
    }

    /// The declared `(width, height)`.
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Check the length invariants between boxes and labels.
    pub fn validate(&self) -> Result<(), String> {
        let RawAnnotation {
            bboxes,
            labels,
            bboxes_ignore,
            labels_ignore,
        } = &self.annotation;

        if bboxes.len() != labels.len() {
            return Err(format!(
                "'{}' has {} bboxes but {} labels",
                self.filename.display(),
                bboxes.len(),
                labels.len()
            ));
        }

        if let Some(labels_ignore) = labels_ignore {
            if bboxes_ignore.len() != labels_ignore.len() {
                return Err(format!(
                    "'{}' has {} ignored bboxes but {} ignored labels",
                    self.filename.display(),
                    bboxes_ignore.len(),
                    labels_ignore.len()
                ));
            }
        }

        Ok(())
    }
}

/// A class id. The manifest may store it as an integer or an integral float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "Number")]
pub struct Label(pub i32);

impl Serialize for Label {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i32(self.0)
    }
}

impl From<i32> for Label {
    fn from(class: i32) -> Self {
        Self(class)
    }
}

impl TryFrom<Number> for Label {
    type Error = String;

    fn try_from(number: Number) -> Result<Self, Self::Error> {
        match number {
            Number::Int(value) => i32::try_from(value)
                .map(Label)
                .map_err(|_| format!("label {} is out of range", value)),
            Number::Float(value) => {
                if value.fract() != 0.0 || value < i32::MIN as f64 || value > i32::MAX as f64 {
                    return Err(format!("label {} is not a valid class id", value));
                }
                Ok(Label(value as i32))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

/// The annotation attached to a sample.
///
/// Sizes are `(width, height)` pairs. `ori_img_size` keeps the decoded size
/// while `img_size` follows resizing transforms.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub bboxes: Array2<f32>,
    pub labels: Array1<i32>,
    pub bboxes_ignore: Array2<f32>,
    pub labels_ignore: Option<Array1<i32>>,
    pub classes: Option<Arc<IndexSet<String>>>,
    pub ori_img_size: (usize, usize),
    pub img_size: (usize, usize),
    pub img_file: PathBuf,
}

impl Annotation {
    pub fn num_bboxes(&self) -> usize {
        self.bboxes.nrows()
    }
}

/// An image with its annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub image: Image,
    pub annotation: Annotation,
}

impl Sample {
    pub fn new(image: Image, annotation: Annotation) -> Self {
        Self { image, annotation }
    }

    /// The `(height, width)` of the image array.
    pub fn image_hw(&self) -> (usize, usize) {
        let (_, h, w) = self.image.dim();
        (h, w)
    }

    pub fn into_parts(self) -> (Image, Annotation) {
        (self.image, self.annotation)
    }
}

/// Convert a list of boxes to an `(n, 4)` array.
pub(crate) fn boxes_to_array(boxes: &[RawBox]) -> Array2<f32> {
    let mut array = Array2::zeros((boxes.len(), 4));
    array
        .outer_iter_mut()
        .zip(boxes)
        .for_each(|(mut row, bbox)| {
            row.iter_mut()
                .zip(bbox)
                .for_each(|(dst, &src)| *dst = src as f32);
        });
    array
}

pub(crate) fn labels_to_array(labels: &[Label]) -> Array1<i32> {
    labels.iter().map(|label| label.0).collect()
}
