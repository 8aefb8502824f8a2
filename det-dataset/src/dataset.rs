//! Dataset traits and the manifest-backed dataset.

use crate::{
    collate::{collate_batch, Batch},
    common::*,
    config::{DatasetConfig, LoaderConfig},
    error::{DatasetError, Result},
    manifest::AnnotationStore,
    reader::SampleReader,
    record::{AnnotationRecord, Sample},
    transform::{Compose, Transform},
};
use indexmap::IndexMap;

/// The generic dataset trait.
pub trait GenericDataset
where
    Self: Debug + Send + Sync,
{
    /// The number of color channels of the dataset.
    fn input_channels(&self) -> usize;

    /// The list of class names of the dataset, if known.
    fn classes(&self) -> Option<&Arc<IndexSet<String>>>;
}

/// The detection dataset that can be random accessed.
///
/// Implementations must be safe to call from several loader workers at once.
pub trait DetectionDataset
where
    Self: GenericDataset,
{
    /// Get number of samples in the dataset.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read and transform the sample at `index`.
    fn get_item(&self, index: usize) -> Result<Sample>;

    /// The batching options the dataset was configured with.
    fn loader_config(&self) -> LoaderConfig;

    /// Assemble transformed samples into a padded batch.
    fn collate_batch(&self, samples: Vec<Sample>) -> Result<Batch> {
        collate_batch(samples)
    }

    /// Compute metrics of detection results against the ground truth.
    fn evaluate(
        &self,
        results: &[DetectionResult],
        work_dir: &Path,
        epoch: usize,
    ) -> Result<EvalReport>;
}

/// Detections predicted for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub img_file: PathBuf,
    /// Boxes in `[x1, y1, x2, y2]` format, shape `(n, 4)`.
    pub bboxes: Array2<f32>,
    pub scores: Array1<f32>,
    pub labels: Array1<i32>,
}

/// Named metric values produced by an evaluation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EvalReport {
    pub metrics: IndexMap<String, f64>,
}

/// The dataset described by an annotation manifest and an image directory.
#[derive(Debug)]
pub struct CustomDataset {
    annotations_file: PathBuf,
    store: AnnotationStore,
    reader: SampleReader,
    transforms: Compose,
    loader_config: LoaderConfig,
}

impl CustomDataset {
    /// Build the dataset with the transforms named in the configuration.
    pub fn new(config: &DatasetConfig) -> Result<Self> {
        let transforms = Compose::from_configs(&config.transforms)
            .map_err(|err| DatasetError::config(format!("{:#}", err)))?;
        Self::with_transforms(config, transforms)
    }

    /// Build the dataset with a user-supplied transform pipeline. The
    /// `transforms` field of the configuration is ignored.
    pub fn with_transforms(config: &DatasetConfig, transforms: Compose) -> Result<Self> {
        let loader_config = config.loader_config();
        if loader_config.batch_size == 0 {
            return Err(DatasetError::config("batch_size must be positive"));
        }

        let classes = config.load_classes()?.map(Arc::new);
        let reader = SampleReader::new(&config.images_dir, classes)?;

        let annotations_file = &config.annotations_file;
        let store = AnnotationStore::load(annotations_file)?;
        let store = if config.filter_empty_gt {
            store.filter_empty()
        } else {
            store
        };

        info!(
            "loaded dataset '{}' with {} images",
            annotations_file.display(),
            store.len()
        );

        Ok(Self {
            annotations_file: annotations_file.clone(),
            store,
            reader,
            transforms,
            loader_config,
        })
    }

    pub fn annotations_file(&self) -> &Path {
        &self.annotations_file
    }

    pub fn images_dir(&self) -> &Path {
        self.reader.images_dir()
    }

    pub fn records(&self) -> &[AnnotationRecord] {
        self.store.records()
    }

    pub fn reader(&self) -> &SampleReader {
        &self.reader
    }

    pub fn transforms(&self) -> &Compose {
        &self.transforms
    }
}

impl GenericDataset for CustomDataset {
    fn input_channels(&self) -> usize {
        3
    }

    fn classes(&self) -> Option<&Arc<IndexSet<String>>> {
        self.reader.classes()
    }
}

impl DetectionDataset for CustomDataset {
    fn len(&self) -> usize {
        self.store.len()
    }

    fn get_item(&self, index: usize) -> Result<Sample> {
        let record = self.store.get(index).ok_or(DatasetError::Index {
            index,
            len: self.store.len(),
        })?;

        let (image, annotation) = self.reader.read(record)?.into_parts();
        let (image, annotation) = self
            .transforms
            .apply(image, annotation)
            .map_err(DatasetError::Transform)?;

        Ok(Sample::new(image, annotation))
    }

    fn loader_config(&self) -> LoaderConfig {
        self.loader_config
    }

    /// The manifest carries no evaluation protocol. Dataset types built on
    /// top of it provide their own.
    fn evaluate(
        &self,
        _results: &[DetectionResult],
        _work_dir: &Path,
        _epoch: usize,
    ) -> Result<EvalReport> {
        Err(DatasetError::NotImplemented("evaluate"))
    }
}
