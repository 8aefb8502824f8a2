use anyhow::{bail, Context, Result};
use clap::Parser;
use det_dataset::{
    CustomDataset, DataLoader, DatasetConfig, DatasetRegistry, DetectionDataset, GenericDataset,
};
use futures::TryStreamExt as _;
use itertools::Itertools as _;
use log::{info, warn};
use prettytable::{cell, row, Table};
use std::{
    env,
    path::{Path, PathBuf},
    time::Instant,
};

#[derive(Debug, Clone, Parser)]
/// Inspect and exercise detection datasets
enum Opts {
    /// Print the records of a dataset
    Info {
        /// configuration file
        config_file: PathBuf,
    },
    /// Verify that image sizes agree with the manifest
    Check {
        /// configuration file
        config_file: PathBuf,
        /// decode every image instead of reading image headers
        #[clap(long)]
        decode: bool,
    },
    /// Load batches and print their shapes
    Batches {
        /// configuration file
        config_file: PathBuf,
        /// number of epochs to run
        #[clap(long, default_value = "1")]
        epochs: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();

    match Opts::parse() {
        Opts::Info { config_file } => {
            info_cmd(&config_file)?;
        }
        Opts::Check {
            config_file,
            decode,
        } => {
            check_cmd(&config_file, decode)?;
        }
        Opts::Batches {
            config_file,
            epochs,
        } => {
            batches_cmd(&config_file, epochs).await?;
        }
    }

    Ok(())
}

fn load_config(config_file: &Path) -> Result<DatasetConfig> {
    DatasetConfig::open(config_file)
        .with_context(|| format!("failed to load config file '{}'", config_file.display()))
}

fn info_cmd(config_file: &Path) -> Result<()> {
    let config = load_config(config_file)?;
    let dataset = CustomDataset::new(&config)?;

    let mut table = Table::new();
    table.add_row(row!["index", "filename", "width", "height", "bboxes", "ignored"]);

    dataset
        .records()
        .iter()
        .enumerate()
        .for_each(|(index, record)| {
            table.add_row(row![
                index,
                record.filename.display(),
                record.width,
                record.height,
                record.num_bboxes(),
                record.annotation.bboxes_ignore.len(),
            ]);
        });

    table.printstd();

    let num_bboxes: usize = dataset
        .records()
        .iter()
        .map(|record| record.num_bboxes())
        .sum();
    println!("images: {}", dataset.len());
    println!("bboxes: {}", num_bboxes);
    match dataset.classes() {
        Some(classes) => println!("classes: {}", classes.iter().join(", ")),
        None => println!("classes: (unspecified)"),
    }

    Ok(())
}

fn check_cmd(config_file: &Path, decode: bool) -> Result<()> {
    let config = load_config(config_file)?;
    let dataset = CustomDataset::new(&config)?;
    let reader = dataset.reader();

    let mut table = Table::new();
    table.add_row(row!["index", "filename", "error"]);
    let mut num_failures = 0;

    for (index, record) in dataset.records().iter().enumerate() {
        let result = if decode {
            reader.read(record).map(|_| ())
        } else {
            reader.probe(record)
        };

        if let Err(err) = result {
            warn!("{}", err);
            table.add_row(row![index, record.filename.display(), err]);
            num_failures += 1;
        }
    }

    if num_failures > 0 {
        table.printstd();
        bail!(
            "{} out of {} images failed the check",
            num_failures,
            dataset.len()
        );
    }

    info!("all {} images passed the check", dataset.len());
    Ok(())
}

async fn batches_cmd(config_file: &Path, epochs: usize) -> Result<()> {
    let config = load_config(config_file)?;
    let dataset = DatasetRegistry::global().build(&config)?;
    let loader = DataLoader::new(dataset)?;
    info!(
        "{} batches per epoch with {:?}",
        loader.num_batches(),
        loader.config()
    );

    for epoch in 0..epochs {
        let since = Instant::now();
        let mut stream = Box::pin(loader.stream(epoch));
        let mut step = 0;

        while let Some(batch) = stream
            .try_next()
            .await
            .with_context(|| format!("failed to load batch {} of epoch {}", step, epoch))?
        {
            let files: Vec<_> = batch
                .annotations
                .iter()
                .map(|ann| ann.img_file.display().to_string())
                .collect();
            println!(
                "epoch {}\tstep {}\tshape {:?}\t{}",
                epoch,
                step,
                batch.images.shape(),
                files.join(",")
            );
            step += 1;
        }

        info!(
            "epoch {} finished with {} batches in {:?}",
            epoch,
            step,
            since.elapsed()
        );
    }

    Ok(())
}
