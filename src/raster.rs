//! Decoding rasters from disk into two-dimensional band arrays.

use crate::types::{DatasetResult, RasterDatasetError, RasterFormat};
use ndarray::Array2;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};

/// Read a single-band raster as a (rows, cols) array of intensities.
pub fn load_raster(path: &Path, format: RasterFormat) -> DatasetResult<Array2<f32>> {
    match format {
        RasterFormat::Image => load_image(path),
        RasterFormat::GeoTiff => load_geotiff(path),
    }
}

fn load_image(path: &Path) -> DatasetResult<Array2<f32>> {
    let img = image::open(path).map_err(|e| RasterDatasetError::Decode {
        path: path.to_path_buf(),
        source: e,
    })?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    let mut band = Array2::<f32>::zeros((height as usize, width as usize));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        // Luma weights in BGR channel order; red/blue are swapped relative
        // to the decoded RGB layout, matching the conversion the paired
        // rasters were produced with.
        let gray = 0.114 * r as f32 + 0.587 * g as f32 + 0.299 * b as f32;
        band[[y as usize, x as usize]] = gray.round();
    }
    Ok(band)
}

fn load_geotiff(path: &Path) -> DatasetResult<Array2<f32>> {
    let file = File::open(path).map_err(|e| RasterDatasetError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let tiff_err = |e: tiff::TiffError| RasterDatasetError::Tiff {
        path: path.to_path_buf(),
        source: e,
    };
    let mut decoder = Decoder::new(BufReader::new(file))
        .map_err(tiff_err)?
        .with_limits(Limits::unlimited());
    let (width, height) = decoder.dimensions().map_err(tiff_err)?;
    let data: Vec<f32> = match decoder.read_image().map_err(tiff_err)? {
        DecodingResult::U8(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U16(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I16(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
    };

    let (width, height) = (width as usize, height as usize);
    let pixels = width * height;
    if pixels == 0 || data.len() % pixels != 0 {
        return Err(RasterDatasetError::BandLayout {
            path: path.to_path_buf(),
            found: data.len(),
            pixels,
        });
    }

    // Interleaved multi-band data keeps only band zero.
    let bands = data.len() / pixels;
    let mut out = Array2::<f32>::zeros((height, width));
    for y in 0..height {
        for x in 0..width {
            out[[y, x]] = data[(y * width + x) * bands];
        }
    }
    Ok(out)
}
