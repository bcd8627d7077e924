//! Indexable, zero-padded tensor pairs over pre-split raster collections.

use crate::aug::{AugmentConfig, Augmentor};
use crate::splits::load_partition;
use crate::types::{
    DatasetResult, NormRange, PairedDatasetConfig, Partition, RasterDatasetError,
};
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// One sample's gathered rasters: the input channel stack and its target.
#[derive(Debug, Clone)]
pub struct RasterPair {
    pub inputs: Vec<Array2<f32>>,
    pub target: Array2<f32>,
}

/// The addressable dataset: splits and loads everything once at
/// construction, then assembles one fixed-size tensor pair per `get` call.
///
/// Training samples pass through the [`Augmentor`]; val/test samples are
/// converted raw. Every returned pair is zero-padded to the configured
/// padding dimensions, inputs as `[channels, pad_h, pad_w]` and the target
/// as `[1, pad_h, pad_w]`.
pub struct PairedRasterDataset<B: Backend> {
    samples: Vec<RasterPair>,
    partition: Partition,
    augmentor: Augmentor,
    padding: (usize, usize),
    rng: StdRng,
    device: B::Device,
}

impl<B: Backend> PairedRasterDataset<B> {
    pub fn new(config: PairedDatasetConfig, device: &B::Device) -> DatasetResult<Self> {
        let (channels, targets) = load_partition(&config)?;
        let augmentor = Augmentor::new(AugmentConfig {
            input_channels: config.input_sources.len(),
            upscale_percent: config.upscale_percent,
            normalize: false,
            norm_range: NormRange::ZeroToOne,
        });

        // Transpose the per-channel collections into per-sample pairs.
        let mut samples: Vec<RasterPair> = targets
            .into_iter()
            .map(|target| RasterPair {
                inputs: Vec::with_capacity(channels.len()),
                target,
            })
            .collect();
        for bands in channels {
            for (sample, band) in samples.iter_mut().zip(bands) {
                sample.inputs.push(band);
            }
        }

        Ok(Self {
            samples,
            partition: config.partition,
            augmentor,
            padding: config.padding,
            rng: StdRng::seed_from_u64(config.seed),
            device: device.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    /// Assemble the index-th tensor pair, drawing augmentation randomness
    /// from the dataset's own seeded generator.
    pub fn get(&mut self, index: usize) -> DatasetResult<(Tensor<B, 3>, Tensor<B, 3>)> {
        Self::item(
            &self.samples,
            self.partition,
            &self.augmentor,
            self.padding,
            &self.device,
            index,
            &mut self.rng,
        )
    }

    /// Same as [`get`](Self::get) with caller-supplied randomness; useful
    /// for deterministic replay and for concurrent readers holding
    /// per-thread generators.
    pub fn get_with_rng(
        &self,
        index: usize,
        rng: &mut dyn RngCore,
    ) -> DatasetResult<(Tensor<B, 3>, Tensor<B, 3>)> {
        Self::item(
            &self.samples,
            self.partition,
            &self.augmentor,
            self.padding,
            &self.device,
            index,
            rng,
        )
    }

    fn item(
        samples: &[RasterPair],
        partition: Partition,
        augmentor: &Augmentor,
        padding: (usize, usize),
        device: &B::Device,
        index: usize,
        rng: &mut dyn RngCore,
    ) -> DatasetResult<(Tensor<B, 3>, Tensor<B, 3>)> {
        let pair = samples
            .get(index)
            .ok_or(RasterDatasetError::IndexOutOfRange {
                index,
                len: samples.len(),
            })?;
        // Width from the column count, height from the row count.
        let (rows, cols) = pair.target.dim();
        if partition == Partition::Train {
            let (inputs, target) = augmentor.augment(&pair.inputs, &pair.target, (cols, rows), rng);
            assemble::<B>(&inputs, &target, padding, device)
        } else {
            assemble::<B>(&pair.inputs, &pair.target, padding, device)
        }
    }
}

/// Copy a channel stack and target into zero-filled volumes of the padding
/// shape, data at the top-left origin, and lift them into tensors.
pub(crate) fn assemble<B: Backend>(
    inputs: &[Array2<f32>],
    target: &Array2<f32>,
    padding: (usize, usize),
    device: &B::Device,
) -> DatasetResult<(Tensor<B, 3>, Tensor<B, 3>)> {
    let (pad_rows, pad_cols) = padding;
    let (t_rows, t_cols) = target.dim();
    if t_rows > pad_rows || t_cols > pad_cols {
        return Err(RasterDatasetError::PadExceeded {
            rows: t_rows,
            cols: t_cols,
            pad_rows,
            pad_cols,
        });
    }

    let channels = inputs.len();
    let mut input_buf = vec![0.0f32; channels * pad_rows * pad_cols];
    for (c, band) in inputs.iter().enumerate() {
        let (rows, cols) = band.dim();
        if (rows, cols) != (t_rows, t_cols) {
            return Err(RasterDatasetError::ShapeMismatch {
                channel: c,
                rows,
                cols,
                target_rows: t_rows,
                target_cols: t_cols,
            });
        }
        copy_band(band, &mut input_buf[c * pad_rows * pad_cols..], pad_cols);
    }
    let mut target_buf = vec![0.0f32; pad_rows * pad_cols];
    copy_band(target, &mut target_buf, pad_cols);

    let inputs_tensor = Tensor::<B, 3>::from_data(
        TensorData::new(input_buf, [channels, pad_rows, pad_cols]),
        device,
    );
    let target_tensor = Tensor::<B, 3>::from_data(
        TensorData::new(target_buf, [1, pad_rows, pad_cols]),
        device,
    );
    Ok((inputs_tensor, target_tensor))
}

fn copy_band(band: &Array2<f32>, buf: &mut [f32], pad_cols: usize) {
    let (rows, cols) = band.dim();
    if let Some(flat) = band.as_slice() {
        for y in 0..rows {
            buf[y * pad_cols..y * pad_cols + cols].copy_from_slice(&flat[y * cols..(y + 1) * cols]);
        }
    } else {
        // Mirrored arrays carry reversed strides; fall back to indexing.
        for ((y, x), v) in band.indexed_iter() {
            buf[y * pad_cols + x] = *v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    type B = burn_ndarray::NdArray<f32>;

    #[test]
    fn assemble_pads_to_the_configured_shape_with_zeros_outside() {
        let inputs = vec![
            Array2::from_elem((3, 4), 5.0),
            Array2::from_elem((3, 4), 7.0),
        ];
        let target = Array2::from_elem((3, 4), 9.0);
        let device = Default::default();
        let (inp, tgt) = assemble::<B>(&inputs, &target, (6, 5), &device).unwrap();
        assert_eq!(inp.dims(), [2, 6, 5]);
        assert_eq!(tgt.dims(), [1, 6, 5]);

        let inp = inp.into_data().to_vec::<f32>().unwrap();
        for c in 0..2 {
            let expected = if c == 0 { 5.0 } else { 7.0 };
            for y in 0..6 {
                for x in 0..5 {
                    let v = inp[c * 30 + y * 5 + x];
                    if y < 3 && x < 4 {
                        assert_eq!(v, expected);
                    } else {
                        assert_eq!(v, 0.0);
                    }
                }
            }
        }
        let tgt = tgt.into_data().to_vec::<f32>().unwrap();
        assert_eq!(tgt[0], 9.0);
        assert_eq!(tgt[4], 0.0);
        assert_eq!(tgt[5 * 5 + 1], 0.0);
    }

    #[test]
    fn assemble_rejects_rasters_larger_than_the_padding() {
        let inputs = vec![Array2::from_elem((8, 4), 1.0)];
        let target = Array2::from_elem((8, 4), 1.0);
        let device = Default::default();
        assert!(matches!(
            assemble::<B>(&inputs, &target, (6, 5), &device),
            Err(RasterDatasetError::PadExceeded { rows: 8, .. })
        ));
    }

    #[test]
    fn assemble_rejects_channel_target_shape_drift() {
        let inputs = vec![Array2::from_elem((3, 3), 1.0)];
        let target = Array2::from_elem((3, 4), 1.0);
        let device = Default::default();
        assert!(matches!(
            assemble::<B>(&inputs, &target, (6, 5), &device),
            Err(RasterDatasetError::ShapeMismatch { channel: 0, .. })
        ));
    }

    #[test]
    fn mirrored_bands_copy_correctly() {
        let mut band = Array2::from_shape_fn((2, 3), |(y, x)| (y * 3 + x) as f32);
        band.invert_axis(ndarray::Axis(1));
        let mut buf = vec![0.0f32; 4 * 2];
        copy_band(&band, &mut buf, 4);
        assert_eq!(&buf[0..4], &[2.0, 1.0, 0.0, 0.0]);
        assert_eq!(&buf[4..8], &[5.0, 4.0, 3.0, 0.0]);
    }
}
