//! Raster pair datasets for supervised image-to-image training.
//!
//! This crate provides utilities for:
//! - Decoding single-band rasters from photographic and geospatial files
//! - Deterministic train/val/test partitioning per source collection
//! - Synchronized multi-channel augmentation (resize, crop, mirror,
//!   normalize)
//! - Fixed-size zero-padded tensor assembly per sample

pub mod aug;
pub mod dataset;
pub mod raster;
pub mod splits;
pub mod types;
pub mod validation;

pub use aug::{normalize, AugmentConfig, AugmentConfigBuilder, Augmentor};
pub use dataset::{PairedRasterDataset, RasterPair};
pub use raster::load_raster;
pub use splits::{load_partition, split_collection, two_stage_split, SplitIndices};
pub use types::*;
pub use validation::{count_samples, summarize_sources, SourceSummary};
