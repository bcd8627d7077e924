//! Directory-layout checks for the `1.<ext>..N.<ext>` naming contract.

use crate::types::{DatasetResult, PairedDatasetConfig, RasterDatasetError};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Per-directory report of how well a source satisfies the naming contract.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub dir: PathBuf,
    /// Sample count inferred from the target directory.
    pub expected: usize,
    /// Files with the configured extension actually present.
    pub present: usize,
    /// Indices in `1..=expected` with no file.
    pub missing: Vec<usize>,
}

pub(crate) fn sample_path(dir: &Path, index: usize, ext: &str) -> PathBuf {
    dir.join(format!("{index}.{ext}"))
}

/// Count the rasters in a directory: files whose extension matches.
pub fn count_samples(dir: &Path, ext: &str) -> DatasetResult<usize> {
    let entries = fs::read_dir(dir).map_err(|e| RasterDatasetError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;
    let mut count = 0;
    for entry in entries {
        let entry = entry.map_err(|e| RasterDatasetError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        if entry.path().extension().and_then(|s| s.to_str()) == Some(ext) {
            count += 1;
        }
    }
    Ok(count)
}

/// Summarize the target directory and every channel directory against the
/// naming contract, without loading any pixels.
pub fn summarize_sources(cfg: &PairedDatasetConfig) -> DatasetResult<Vec<SourceSummary>> {
    let expected = count_samples(&cfg.target_source, &cfg.extension)?;
    let mut summaries = Vec::with_capacity(cfg.input_sources.len() + 1);
    summaries.push(summarize_dir(&cfg.target_source, expected, &cfg.extension)?);
    for dir in &cfg.input_sources {
        summaries.push(summarize_dir(dir, expected, &cfg.extension)?);
    }
    Ok(summaries)
}

fn summarize_dir(dir: &Path, expected: usize, ext: &str) -> DatasetResult<SourceSummary> {
    let present = count_samples(dir, ext)?;
    let missing: Vec<usize> = (1..=expected)
        .filter(|i| !sample_path(dir, *i, ext).exists())
        .collect();
    Ok(SourceSummary {
        dir: dir.to_path_buf(),
        expected,
        present,
        missing,
    })
}

/// Fail construction early when any source deviates from the contract:
/// a gap in the `1..N` numbering or a file count that disagrees with the
/// target directory.
pub(crate) fn verify_sources(cfg: &PairedDatasetConfig, count: usize) -> DatasetResult<()> {
    if count == 0 {
        return Err(RasterDatasetError::EmptyTargetSource {
            dir: cfg.target_source.clone(),
        });
    }
    let mut dirs: Vec<&PathBuf> = vec![&cfg.target_source];
    dirs.extend(cfg.input_sources.iter());
    for dir in dirs {
        let found = count_samples(dir, &cfg.extension)?;
        if found != count {
            return Err(RasterDatasetError::SourceCountMismatch {
                dir: dir.clone(),
                expected: count,
                found,
            });
        }
        for index in 1..=count {
            if !sample_path(dir, index, &cfg.extension).exists() {
                return Err(RasterDatasetError::MissingSample {
                    dir: dir.clone(),
                    index,
                    ext: cfg.extension.clone(),
                });
            }
        }
    }
    Ok(())
}
