//! Lookup table from dataset type names to constructors.

use crate::{
    common::*,
    config::DatasetConfig,
    dataset::{CustomDataset, DetectionDataset},
    error::{DatasetError, Result},
};

/// Builds a dataset from its configuration.
pub type DatasetBuilder = fn(&DatasetConfig) -> Result<Arc<dyn DetectionDataset>>;

static GLOBAL_REGISTRY: Lazy<DatasetRegistry> = Lazy::new(DatasetRegistry::default);

#[derive(Clone)]
pub struct DatasetRegistry {
    builders: HashMap<String, DatasetBuilder>,
}

impl Debug for DatasetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

impl DatasetRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// The process-wide registry holding the built-in dataset types.
    pub fn global() -> &'static Self {
        &GLOBAL_REGISTRY
    }

    pub fn register(&mut self, name: impl Into<String>, builder: DatasetBuilder) -> Result<()> {
        let name = name.into();
        if self.builders.contains_key(&name) {
            return Err(DatasetError::DuplicateDataset(name));
        }
        self.builders.insert(name, builder);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.builders.keys().map(String::as_str).sorted()
    }

    /// Build the dataset named by `config.kind`.
    pub fn build(&self, config: &DatasetConfig) -> Result<Arc<dyn DetectionDataset>> {
        let builder = self
            .builders
            .get(&config.kind)
            .ok_or_else(|| DatasetError::UnknownDataset(config.kind.clone()))?;
        builder(config)
    }
}

impl Default for DatasetRegistry {
    fn default() -> Self {
        let mut builders: HashMap<String, DatasetBuilder> = HashMap::new();
        builders.insert("CustomDataset".into(), build_custom_dataset);
        Self { builders }
    }
}

fn build_custom_dataset(config: &DatasetConfig) -> Result<Arc<dyn DetectionDataset>> {
    Ok(Arc::new(CustomDataset::new(config)?))
}
