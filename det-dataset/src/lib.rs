//! Object detection dataset loading: manifests, lazily decoded samples,
//! transform pipelines and padded batch collation.

mod common;
pub mod collate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod reader;
pub mod record;
pub mod registry;
pub mod transform;

pub use collate::{collate_batch, Batch};
pub use config::{DatasetConfig, LoaderConfig};
pub use dataset::{CustomDataset, DetectionDataset, DetectionResult, EvalReport, GenericDataset};
pub use error::{DatasetError, Result};
pub use loader::DataLoader;
pub use manifest::{load_classes_file, AnnotationStore};
pub use reader::SampleReader;
pub use record::{Annotation, AnnotationRecord, Image, Label, RawAnnotation, Sample};
pub use registry::{DatasetBuilder, DatasetRegistry};
pub use transform::{Compose, Transform, TransformConfig};
