//! Sample transform pipeline.

mod flip;
mod normalize;
mod pad;
mod resize;

pub use flip::*;
pub use normalize::*;
pub use pad::*;
pub use resize::*;

use crate::{
    common::*,
    record::{Annotation, Image},
};

/// A stage in the transform pipeline.
///
/// A stage may replace the image and edit the annotation freely. Stages that
/// change the image extent are expected to update `img_size`.
pub trait Transform
where
    Self: Debug + Send + Sync,
{
    fn apply(&self, image: Image, annotation: Annotation) -> anyhow::Result<(Image, Annotation)>;
}

/// Runs a list of stages in order. An empty pipeline is the identity.
#[derive(Debug, Default)]
pub struct Compose {
    stages: Vec<Box<dyn Transform>>,
}

impl Compose {
    pub fn new(stages: Vec<Box<dyn Transform>>) -> Self {
        Self { stages }
    }

    pub fn from_configs(configs: &[TransformConfig]) -> anyhow::Result<Self> {
        let stages: Vec<_> = configs
            .iter()
            .map(TransformConfig::build)
            .collect::<anyhow::Result<_>>()?;
        Ok(Self { stages })
    }

    pub fn push(&mut self, stage: impl Transform + 'static) {
        self.stages.push(Box::new(stage));
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Transform for Compose {
    fn apply(&self, image: Image, annotation: Annotation) -> anyhow::Result<(Image, Annotation)> {
        self.stages
            .iter()
            .try_fold((image, annotation), |(image, annotation), stage| {
                stage.apply(image, annotation)
            })
    }
}

/// Transform stage options, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransformConfig {
    Resize {
        min_size: usize,
        max_size: usize,
    },
    RandomFlip {
        #[serde(default = "default_flip_prob")]
        prob: f64,
    },
    Normalize {
        mean: [f32; 3],
        std: [f32; 3],
        #[serde(default)]
        to_bgr: bool,
    },
    Pad {
        size_divisor: usize,
    },
}

impl TransformConfig {
    pub fn build(&self) -> anyhow::Result<Box<dyn Transform>> {
        let stage: Box<dyn Transform> = match *self {
            Self::Resize { min_size, max_size } => Box::new(Resize::new(min_size, max_size)?),
            Self::RandomFlip { prob } => Box::new(RandomFlip::new(prob)?),
            Self::Normalize { mean, std, to_bgr } => Box::new(Normalize::new(mean, std, to_bgr)?),
            Self::Pad { size_divisor } => Box::new(Pad::new(size_divisor)?),
        };
        Ok(stage)
    }
}

fn default_flip_prob() -> f64 {
    0.5
}
