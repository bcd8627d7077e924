//! Deterministic train/val/test partitioning of raster collections.

use crate::raster::load_raster;
use crate::types::{check_fraction, DatasetResult, PairedDatasetConfig, Partition};
use crate::validation::{count_samples, sample_path, verify_sources};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::Path;
use std::time::Instant;

const DEFAULT_LOG_EVERY: usize = 1000;

/// A 3-way partition of sample indices. Disjoint; union is `0..count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub val: Vec<usize>,
    pub test: Vec<usize>,
}

/// Carve a holdout fraction off a collection.
///
/// The shuffle depends only on `(seed, items.len())`, so equal-length
/// collections split with the same seed and fraction land index-for-index
/// in the same subsets. The fraction is rounded to one decimal before use
/// and the holdout size is `ceil(len * fraction)`.
pub fn split_collection<T>(items: Vec<T>, holdout: f32, seed: u64) -> (Vec<T>, Vec<T>) {
    let n = items.len();
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let held = holdout_count(n, holdout);
    let cut = n - held;
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut kept = Vec::with_capacity(cut);
    let mut carved = Vec::with_capacity(held);
    for (pos, idx) in order.into_iter().enumerate() {
        let item = slots[idx].take().expect("each index is visited once");
        if pos < cut {
            kept.push(item);
        } else {
            carved.push(item);
        }
    }
    (kept, carved)
}

/// Two-stage split: carve the test fraction from the full collection, then
/// the validation fraction from the non-test remainder.
pub fn two_stage_split(
    count: usize,
    test_size: f32,
    val_size: f32,
    seed: u64,
) -> DatasetResult<SplitIndices> {
    check_fraction("test_size", test_size)?;
    check_fraction("val_size", val_size)?;
    let all: Vec<usize> = (0..count).collect();
    let (rest, test) = split_collection(all, test_size, seed);
    let (train, val) = split_collection(rest, val_size, seed);
    Ok(SplitIndices { train, val, test })
}

/// Eagerly load every raster from every source and return the requested
/// partition's arrays: one collection per input channel, plus the targets.
///
/// The target collection and each channel collection are split
/// independently, with identical seed and fractions; determinism of the
/// underlying shuffle keeps index membership aligned across them.
pub fn load_partition(
    cfg: &PairedDatasetConfig,
) -> DatasetResult<(Vec<Vec<Array2<f32>>>, Vec<Array2<f32>>)> {
    cfg.validate()?;
    let count = count_samples(&cfg.target_source, &cfg.extension)?;
    verify_sources(cfg, count)?;

    let targets = load_collection(&cfg.target_source, count, cfg)?;
    let mut channels = Vec::with_capacity(cfg.input_sources.len());
    for dir in &cfg.input_sources {
        channels.push(load_collection(dir, count, cfg)?);
    }

    let target_out = partition_of(targets, cfg);
    let mut channels_out = Vec::with_capacity(channels.len());
    for bands in channels {
        channels_out.push(partition_of(bands, cfg));
    }
    Ok((channels_out, target_out))
}

fn partition_of<T>(items: Vec<T>, cfg: &PairedDatasetConfig) -> Vec<T> {
    let (rest, test) = split_collection(items, cfg.test_size, cfg.seed);
    let (train, val) = split_collection(rest, cfg.val_size, cfg.seed);
    match cfg.partition {
        Partition::Train => train,
        Partition::Val => val,
        Partition::Test => test,
    }
}

fn holdout_count(n: usize, fraction: f32) -> usize {
    let rounded = (fraction as f64 * 10.0).round() / 10.0;
    ((n as f64 * rounded).ceil() as usize).min(n)
}

fn load_collection(
    dir: &Path,
    count: usize,
    cfg: &PairedDatasetConfig,
) -> DatasetResult<Vec<Array2<f32>>> {
    let log_every = log_every();
    let started = Instant::now();
    let mut bands = Vec::with_capacity(count);
    for index in 1..=count {
        let path = sample_path(dir, index, &cfg.extension);
        bands.push(load_raster(&path, cfg.format)?);
        if let Some(every) = log_every {
            if index % every == 0 {
                let rate = index as f32 / started.elapsed().as_secs_f32().max(0.001);
                eprintln!(
                    "[dataset] loaded {index}/{count} rasters from {} rate={rate:.1} img/s",
                    dir.display()
                );
            }
        }
    }
    Ok(bands)
}

fn log_every() -> Option<usize> {
    match std::env::var("RASTER_DATASET_LOG_EVERY") {
        Ok(val) => {
            if val.eq_ignore_ascii_case("off") || val.trim() == "0" {
                None
            } else {
                val.parse::<usize>().ok().filter(|v| *v > 0)
            }
        }
        Err(_) => Some(DEFAULT_LOG_EVERY),
    }
}
