//! Core types, error definitions, and configuration for raster_dataset.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, RasterDatasetError>;

#[derive(Debug, Error)]
pub enum RasterDatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image decode error at {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("tiff decode error at {path}: {source}")]
    Tiff {
        path: PathBuf,
        #[source]
        source: tiff::TiffError,
    },
    #[error("raster {path} holds {found} samples for {pixels} pixels")]
    BandLayout {
        path: PathBuf,
        found: usize,
        pixels: usize,
    },
    #[error("config parse error at {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown partition `{0}` (expected train, val, or test)")]
    UnknownPartition(String),
    #[error("unknown normalization range `{0}` (expected zero-to-one or negative-one-to-one)")]
    UnknownNormRange(String),
    #[error("unknown raster format `{0}` (expected image or geotiff)")]
    UnknownRasterFormat(String),
    #[error("{name} must lie in (0, 1), got {value}")]
    InvalidFraction { name: &'static str, value: f32 },
    #[error("no input sources configured")]
    NoInputSources,
    #[error("target source {dir} contains no rasters")]
    EmptyTargetSource { dir: PathBuf },
    #[error("sample {index}.{ext} missing from {dir}")]
    MissingSample {
        dir: PathBuf,
        index: usize,
        ext: String,
    },
    #[error("{dir} holds {found} rasters, expected {expected}")]
    SourceCountMismatch {
        dir: PathBuf,
        expected: usize,
        found: usize,
    },
    #[error("sample index {index} out of range for partition of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("raster {rows}x{cols} exceeds padding dimensions {pad_rows}x{pad_cols}")]
    PadExceeded {
        rows: usize,
        cols: usize,
        pad_rows: usize,
        pad_cols: usize,
    },
    #[error("channel {channel} raster is {rows}x{cols}, target is {target_rows}x{target_cols}")]
    ShapeMismatch {
        channel: usize,
        rows: usize,
        cols: usize,
        target_rows: usize,
        target_cols: usize,
    },
}

/// Which disjoint subset of the sample collection a dataset materializes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    #[default]
    Train,
    Val,
    Test,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Train => "train",
            Partition::Val => "val",
            Partition::Test => "test",
        }
    }
}

impl FromStr for Partition {
    type Err = RasterDatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Partition::Train),
            "val" => Ok(Partition::Val),
            "test" => Ok(Partition::Test),
            other => Err(RasterDatasetError::UnknownPartition(other.to_string())),
        }
    }
}

/// Intensity range pixel values are rescaled into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormRange {
    /// Divide by 255.
    #[default]
    #[serde(rename = "zero-to-one")]
    ZeroToOne,
    /// Divide by 127.5, subtract 1.
    #[serde(rename = "negative-one-to-one")]
    NegOneToOne,
}

impl FromStr for NormRange {
    type Err = RasterDatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zero-to-one" => Ok(NormRange::ZeroToOne),
            "negative-one-to-one" => Ok(NormRange::NegOneToOne),
            other => Err(RasterDatasetError::UnknownNormRange(other.to_string())),
        }
    }
}

/// Source encoding of the raster files in a directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    /// Standard image codec (png/jpg/...), collapsed to a single gray band.
    Image,
    /// Geospatial raster; first band only.
    #[default]
    GeoTiff,
}

impl FromStr for RasterFormat {
    type Err = RasterDatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(RasterFormat::Image),
            "geotiff" => Ok(RasterFormat::GeoTiff),
            other => Err(RasterDatasetError::UnknownRasterFormat(other.to_string())),
        }
    }
}

/// Configuration for a paired raster dataset.
///
/// Every source directory must contain files named `1.<ext>` through
/// `N.<ext>` with no gaps; N is inferred from the target directory.
#[derive(Debug, Clone, Deserialize)]
pub struct PairedDatasetConfig {
    /// Ordered input directories, one per channel.
    pub input_sources: Vec<PathBuf>,
    /// Directory holding the target rasters.
    pub target_source: PathBuf,
    #[serde(default)]
    pub partition: Partition,
    /// Fraction carved off for the test partition, rounded to one decimal.
    #[serde(default = "default_test_size")]
    pub test_size: f32,
    /// Fraction of the non-test remainder carved off for validation.
    #[serde(default = "default_val_size")]
    pub val_size: f32,
    #[serde(default)]
    pub seed: u64,
    /// Upscale-before-crop percentage; 100 disables the spatial jitter.
    #[serde(default = "default_upscale")]
    pub upscale_percent: u32,
    /// Fixed (height, width) every returned tensor is zero-padded up to.
    #[serde(default = "default_padding")]
    pub padding: (usize, usize),
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default)]
    pub format: RasterFormat,
}

fn default_test_size() -> f32 {
    0.2
}

fn default_val_size() -> f32 {
    0.1
}

fn default_upscale() -> u32 {
    100
}

fn default_padding() -> (usize, usize) {
    (1200, 1200)
}

fn default_extension() -> String {
    "tiff".to_string()
}

impl PairedDatasetConfig {
    pub fn from_json_file(path: &Path) -> DatasetResult<Self> {
        let raw = fs::read(path).map_err(|e| RasterDatasetError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_slice(&raw).map_err(|e| RasterDatasetError::Config {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub(crate) fn validate(&self) -> DatasetResult<()> {
        if self.input_sources.is_empty() {
            return Err(RasterDatasetError::NoInputSources);
        }
        check_fraction("test_size", self.test_size)?;
        check_fraction("val_size", self.val_size)?;
        Ok(())
    }
}

pub(crate) fn check_fraction(name: &'static str, value: f32) -> DatasetResult<()> {
    if value <= 0.0 || value >= 1.0 {
        return Err(RasterDatasetError::InvalidFraction { name, value });
    }
    Ok(())
}
