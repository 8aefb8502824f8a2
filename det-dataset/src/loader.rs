//! Batch iteration over a detection dataset.

use crate::{
    collate::Batch,
    common::*,
    config::LoaderConfig,
    dataset::DetectionDataset,
    error::{DatasetError, Result},
};
use futures::stream::{self, Stream, StreamExt as _};

/// Splits a dataset into batches and loads them, optionally on worker
/// threads.
#[derive(Debug, Clone)]
pub struct DataLoader {
    dataset: Arc<dyn DetectionDataset>,
    config: LoaderConfig,
    seed: Option<u64>,
}

impl DataLoader {
    /// Build a loader with the options the dataset was configured with.
    pub fn new(dataset: Arc<dyn DetectionDataset>) -> Result<Self> {
        let config = dataset.loader_config();
        check_config(&config)?;
        Ok(Self {
            dataset,
            config,
            seed: None,
        })
    }

    pub fn with_config(self, config: LoaderConfig) -> Result<Self> {
        check_config(&config)?;
        Ok(Self { config, ..self })
    }

    /// Fix the shuffling seed. Each epoch derives its own order from it.
    ///
    /// Only the sample order is seeded. Random transform stages such as
    /// `RandomFlip` draw from the thread-local generator of the worker.
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..self
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn dataset(&self) -> &Arc<dyn DetectionDataset> {
        &self.dataset
    }

    pub fn num_batches(&self) -> usize {
        let LoaderConfig {
            batch_size,
            drop_last,
            ..
        } = self.config;
        let len = self.dataset.len();

        if drop_last {
            len / batch_size
        } else {
            (len + batch_size - 1) / batch_size
        }
    }

    /// The sample indices of each batch in the given epoch.
    pub fn batch_indices(&self, epoch: usize) -> Vec<Vec<usize>> {
        let LoaderConfig {
            batch_size,
            shuffle,
            drop_last,
            ..
        } = self.config;
        let mut indices: Vec<_> = (0..self.dataset.len()).collect();

        if shuffle {
            let mut rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(epoch as u64)),
                None => StdRng::from_entropy(),
            };
            indices.shuffle(&mut rng);
        }

        indices
            .chunks(batch_size)
            .filter(|chunk| !drop_last || chunk.len() == batch_size)
            .map(<[usize]>::to_vec)
            .collect()
    }

    /// Load the batches of an epoch on the calling thread.
    pub fn iter(&self, epoch: usize) -> impl Iterator<Item = Result<Batch>> + '_ {
        self.batch_indices(epoch)
            .into_iter()
            .map(move |indices| load_batch(&*self.dataset, &indices))
    }

    /// Load the batches of an epoch on the blocking thread pool.
    ///
    /// Up to `num_workers` batches (at least one) are loaded concurrently, and
    /// batches are yielded in order. The stream must be polled within a tokio
    /// runtime.
    pub fn stream(&self, epoch: usize) -> impl Stream<Item = Result<Batch>> + Send + 'static {
        let dataset = self.dataset.clone();
        let num_workers = self.config.num_workers.max(1);

        stream::iter(self.batch_indices(epoch))
            .map(move |indices| {
                let dataset = dataset.clone();

                async move {
                    let batch = tokio::task::spawn_blocking(move || load_batch(&*dataset, &indices))
                        .await
                        .map_err(|err| DatasetError::Worker(err.to_string()))??;
                    Ok::<_, DatasetError>(batch)
                }
            })
            .buffered(num_workers)
    }
}

fn check_config(config: &LoaderConfig) -> Result<()> {
    if config.batch_size == 0 {
        return Err(DatasetError::config("batch_size must be positive"));
    }
    Ok(())
}

fn load_batch(dataset: &dyn DetectionDataset, indices: &[usize]) -> Result<Batch> {
    let samples: Vec<_> = indices
        .iter()
        .map(|&index| dataset.get_item(index))
        .collect::<Result<_>>()?;
    dataset.collate_batch(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dataset::{DetectionResult, EvalReport, GenericDataset},
        record::Sample,
        transform::tests::annotation,
    };
    use futures::TryStreamExt as _;

    /// Sample `i` is an `(i + 1) x (i + 1)` image filled with `i`.
    #[derive(Debug)]
    struct SyntheticDataset {
        len: usize,
        config: LoaderConfig,
    }

    impl GenericDataset for SyntheticDataset {
        fn input_channels(&self) -> usize {
            3
        }

        fn classes(&self) -> Option<&Arc<IndexSet<String>>> {
            None
        }
    }

    impl DetectionDataset for SyntheticDataset {
        fn len(&self) -> usize {
            self.len
        }

        fn get_item(&self, index: usize) -> Result<Sample> {
            if index >= self.len {
                return Err(DatasetError::Index {
                    index,
                    len: self.len,
                });
            }
            let side = index + 1;
            Ok(Sample::new(
                Array3::from_elem((3, side, side), index as f32),
                annotation(side, side),
            ))
        }

        fn loader_config(&self) -> LoaderConfig {
            self.config
        }

        fn evaluate(&self, _: &[DetectionResult], _: &Path, _: usize) -> Result<EvalReport> {
            Err(DatasetError::NotImplemented("evaluate"))
        }
    }

    fn loader(len: usize, batch_size: usize, shuffle: bool, drop_last: bool) -> DataLoader {
        let config = LoaderConfig {
            batch_size,
            num_workers: 2,
            shuffle,
            drop_last,
        };
        DataLoader::new(Arc::new(SyntheticDataset { len, config })).unwrap()
    }

    #[test]
    fn batches_in_order() {
        let loader = loader(5, 2, false, false);
        assert_eq!(loader.num_batches(), 3);
        assert_eq!(
            loader.batch_indices(0),
            vec![vec![0, 1], vec![2, 3], vec![4]]
        );
    }

    #[test]
    fn drop_last_batch() {
        let loader = loader(5, 2, false, true);
        assert_eq!(loader.num_batches(), 2);
        assert_eq!(loader.batch_indices(0), vec![vec![0, 1], vec![2, 3]]);
    }

    #[test]
    fn shuffle_covers_every_index() {
        let loader = loader(10, 3, true, false).with_seed(7);
        let indices: Vec<_> = loader.batch_indices(0).into_iter().flatten().collect();
        assert_eq!(
            indices.iter().copied().sorted().collect::<Vec<_>>(),
            (0..10).collect::<Vec<_>>()
        );

        assert_eq!(loader.batch_indices(3), loader.batch_indices(3));
    }

    #[test]
    fn iter_collates_batches() {
        let loader = loader(3, 2, false, false);
        let batches: Vec<_> = loader.iter(0).collect::<Result<_>>().unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].images.dim(), (2, 3, 2, 2));
        assert_eq!(batches[1].images.dim(), (1, 3, 3, 3));
        assert_eq!(batches[0].images[[1, 0, 1, 1]], 1.0);
    }

    #[test]
    fn zero_batch_size_rejected() {
        let loader = loader(3, 2, false, false);
        let config = LoaderConfig {
            batch_size: 0,
            ..*loader.config()
        };
        assert!(loader.with_config(config).is_err());
    }

    #[test]
    fn zero_batch_size_from_dataset_rejected() {
        let config = LoaderConfig {
            batch_size: 0,
            num_workers: 0,
            shuffle: false,
            drop_last: false,
        };
        let result = DataLoader::new(Arc::new(SyntheticDataset { len: 4, config }));
        assert!(matches!(result, Err(DatasetError::Config { .. })));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stream_matches_iter() {
        let loader = loader(7, 2, false, false);
        let streamed: Vec<_> = loader.stream(0).try_collect().await.unwrap();
        let iterated: Vec<_> = loader.iter(0).collect::<Result<_>>().unwrap();
        assert_eq!(streamed, iterated);
    }
}
