//! Dataset configuration format.

use crate::{
    common::*,
    error::{DatasetError, Result},
    manifest::load_classes_file,
    transform::TransformConfig,
};

/// The dataset configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// The registered dataset type to build.
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    pub images_dir: PathBuf,
    pub annotations_file: PathBuf,
    #[serde(default)]
    pub transforms: Vec<TransformConfig>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub num_workers: usize,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub drop_last: bool,
    /// Drop the images without any ground truth box.
    #[serde(default = "default_filter_empty_gt")]
    pub filter_empty_gt: bool,
    /// Class names, indexed by label.
    #[serde(default)]
    pub classes: Option<Vec<String>>,
    /// A text file listing class names, one per line.
    #[serde(default)]
    pub classes_file: Option<PathBuf>,
}

impl DatasetConfig {
    pub fn new(images_dir: impl Into<PathBuf>, annotations_file: impl Into<PathBuf>) -> Self {
        Self {
            kind: default_kind(),
            images_dir: images_dir.into(),
            annotations_file: annotations_file.into(),
            transforms: vec![],
            batch_size: default_batch_size(),
            num_workers: 0,
            shuffle: false,
            drop_last: false,
            filter_empty_gt: default_filter_empty_gt(),
            classes: None,
            classes_file: None,
        }
    }

    /// Load a JSON5 configuration file.
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            DatasetError::config(format!("failed to read '{}': {}", path.display(), err))
        })?;
        let config: Self = json5::from_str(&text).map_err(|err| {
            DatasetError::config(format!("failed to parse '{}': {}", path.display(), err))
        })?;
        Ok(config)
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            batch_size: self.batch_size,
            num_workers: self.num_workers,
            shuffle: self.shuffle,
            drop_last: self.drop_last,
        }
    }

    /// Resolve the class list from `classes` or `classes_file`.
    pub fn load_classes(&self) -> Result<Option<IndexSet<String>>> {
        match (&self.classes, &self.classes_file) {
            (Some(_), Some(_)) => Err(DatasetError::config(
                "classes and classes_file cannot be specified together",
            )),
            (Some(classes), None) => {
                let set: IndexSet<_> = classes.iter().cloned().collect();
                if set.len() != classes.len() {
                    return Err(DatasetError::config("duplicated class names in classes"));
                }
                Ok(Some(set))
            }
            (None, Some(path)) => load_classes_file(path).map(Some),
            (None, None) => Ok(None),
        }
    }
}

/// Options consumed by the batch loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoaderConfig {
    pub batch_size: usize,
    pub num_workers: usize,
    pub shuffle: bool,
    pub drop_last: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            num_workers: 0,
            shuffle: false,
            drop_last: false,
        }
    }
}

fn default_kind() -> String {
    "CustomDataset".into()
}

fn default_batch_size() -> usize {
    1
}

fn default_filter_empty_gt() -> bool {
    true
}
