//! Synchronized geometric augmentation for raster channel stacks.

use crate::types::NormRange;
use ndarray::{s, Array2, Axis};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// Rescale pixel intensities into a fixed numeric range.
pub fn normalize(band: &Array2<f32>, range: NormRange) -> Array2<f32> {
    match range {
        NormRange::ZeroToOne => band.mapv(|v| v / 255.0),
        NormRange::NegOneToOne => band.mapv(|v| v / 127.5 - 1.0),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AugmentConfig {
    /// Number of leading layers in the stack that are input channels.
    pub input_channels: usize,
    /// Upscale-before-crop percentage; 100 disables the spatial jitter.
    pub upscale_percent: u32,
    /// Rescale intensities after the geometric transforms.
    pub normalize: bool,
    pub norm_range: NormRange,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            input_channels: 3,
            upscale_percent: 100,
            normalize: false,
            norm_range: NormRange::ZeroToOne,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AugmentConfigBuilder {
    inner: AugmentConfig,
}

impl AugmentConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn input_channels(mut self, channels: usize) -> Self {
        self.inner.input_channels = channels;
        self
    }
    pub fn upscale_percent(mut self, percent: u32) -> Self {
        self.inner.upscale_percent = percent;
        self
    }
    pub fn normalize(mut self, enabled: bool, range: NormRange) -> Self {
        self.inner.normalize = enabled;
        self.inner.norm_range = range;
        self
    }
    pub fn build(self) -> AugmentConfig {
        self.inner
    }
}

/// Applies upscaling, synchronized random crop, and synchronized random
/// mirroring across an input-channel stack and its paired target.
#[derive(Debug, Clone)]
pub struct Augmentor {
    cfg: AugmentConfig,
}

impl Augmentor {
    pub fn new(cfg: AugmentConfig) -> Self {
        Self { cfg }
    }

    pub fn describe(&self) -> String {
        format!(
            "channels={} upscale={}% normalize={} range={:?}",
            self.cfg.input_channels, self.cfg.upscale_percent, self.cfg.normalize, self.cfg.norm_range
        )
    }

    /// Augment one sample. `dim` is the output (width, height); every raster
    /// is resized to the upscaled dimension first, so the crop brings the
    /// stack back to `dim` with identical offsets in every layer.
    pub fn augment(
        &self,
        inputs: &[Array2<f32>],
        target: &Array2<f32>,
        dim: (usize, usize),
        rng: &mut dyn RngCore,
    ) -> (Vec<Array2<f32>>, Array2<f32>) {
        let (width, height) = dim;
        // Sub-100 percentages would shrink below the crop size; treat them
        // as no upscale.
        let factor = ((self.cfg.upscale_percent as f64 / 10.0).round() / 10.0).max(1.0);
        let up_w = (width as f64 * factor) as usize;
        let up_h = (height as f64 * factor) as usize;

        let mut layers: Vec<Array2<f32>> = inputs
            .iter()
            .map(|band| resize_nearest(band, up_w, up_h))
            .collect();
        layers.push(resize_nearest(target, up_w, up_h));

        // One offset pair for the whole stack.
        let x = crop_offset(up_h.saturating_sub(height), rng);
        let y = crop_offset(up_w.saturating_sub(width), rng);
        let mut cropped: Vec<Array2<f32>> = layers
            .iter()
            .map(|band| band.slice(s![x..x + height, y..y + width]).to_owned())
            .collect();

        let mut target_out = cropped.pop().expect("stack always holds the target layer");
        let mut inputs_out: Vec<Array2<f32>> = cropped
            .into_iter()
            .take(self.cfg.input_channels)
            .collect();

        // One mirror decision for the whole sample, never per-channel.
        if rng.random_range(0.0..1.0) > 0.5 {
            target_out.invert_axis(Axis(1));
            for band in inputs_out.iter_mut() {
                band.invert_axis(Axis(1));
            }
        }
        self.finish(inputs_out, target_out)
    }

    fn finish(
        &self,
        inputs: Vec<Array2<f32>>,
        target: Array2<f32>,
    ) -> (Vec<Array2<f32>>, Array2<f32>) {
        if !self.cfg.normalize {
            return (inputs, target);
        }
        let range = self.cfg.norm_range;
        let inputs = inputs.iter().map(|band| normalize(band, range)).collect();
        (inputs, normalize(&target, range))
    }
}

/// Nearest-neighbor resize; preserves discrete label-like values, which
/// matters because inputs may be categorical or ordinal rasters.
pub(crate) fn resize_nearest(band: &Array2<f32>, width: usize, height: usize) -> Array2<f32> {
    let (rows, cols) = band.dim();
    let mut out = Array2::zeros((height, width));
    for y in 0..height {
        let sy = ((y * rows) / height).min(rows - 1);
        for x in 0..width {
            let sx = ((x * cols) / width).min(cols - 1);
            out[[y, x]] = band[[sy, sx]];
        }
    }
    out
}

fn crop_offset(slack: usize, rng: &mut dyn RngCore) -> usize {
    // random_range panics on an empty range; zero slack pins the origin.
    if slack == 0 {
        return 0;
    }
    rng.random_range(0.0..slack as f64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn tagged_layer(rows: usize, cols: usize, layer: usize) -> Array2<f32> {
        // Encode layer id and coordinates so transforms can be traced.
        Array2::from_shape_fn((rows, cols), |(y, x)| {
            (layer * 1_000_000 + y * 1_000 + x) as f32
        })
    }

    #[test]
    fn normalize_round_trips_byte_range() {
        let band = Array2::from_shape_fn((16, 16), |(y, x)| ((y * 16 + x) % 256) as f32);
        let unit = normalize(&band, NormRange::ZeroToOne);
        assert!(unit.iter().all(|v| (0.0..=1.0).contains(v)));
        let restored = unit.mapv(|v| v * 255.0);
        for (a, b) in band.iter().zip(restored.iter()) {
            assert!((a - b).abs() < 1e-4);
        }

        let signed = normalize(&band, NormRange::NegOneToOne);
        assert!(signed.iter().all(|v| (-1.0..=1.0).contains(v)));
        assert_eq!(signed[[0, 0]], -1.0);
    }

    #[test]
    fn resize_nearest_preserves_discrete_values() {
        let band = Array2::from_shape_fn((10, 10), |(y, x)| ((y + x) % 3) as f32);
        let up = resize_nearest(&band, 17, 13);
        assert_eq!(up.dim(), (13, 17));
        assert!(up.iter().all(|v| [0.0, 1.0, 2.0].contains(v)));
        // Identity when dimensions are unchanged.
        assert_eq!(resize_nearest(&band, 10, 10), band);
    }

    #[test]
    fn augment_output_matches_original_dim_for_any_upscale() {
        let augmentor = Augmentor::new(
            AugmentConfigBuilder::new()
                .input_channels(2)
                .upscale_percent(100)
                .build(),
        );
        let inputs = vec![tagged_layer(20, 30, 1), tagged_layer(20, 30, 2)];
        let target = tagged_layer(20, 30, 0);
        for percent in [100, 110, 137, 200] {
            let augmentor = Augmentor::new(AugmentConfig {
                upscale_percent: percent,
                ..augmentor.cfg.clone()
            });
            let mut rng = StdRng::seed_from_u64(3);
            let (a_inputs, a_target) = augmentor.augment(&inputs, &target, (30, 20), &mut rng);
            assert_eq!(a_target.dim(), (20, 30), "upscale {percent}");
            for band in &a_inputs {
                assert_eq!(band.dim(), (20, 30), "upscale {percent}");
            }
        }
    }

    #[test]
    fn augment_is_deterministic_under_a_fixed_seed() {
        let augmentor = Augmentor::new(
            AugmentConfigBuilder::new()
                .input_channels(2)
                .upscale_percent(150)
                .build(),
        );
        let inputs = vec![tagged_layer(24, 24, 1), tagged_layer(24, 24, 2)];
        let target = tagged_layer(24, 24, 0);

        let mut rng_a = StdRng::seed_from_u64(99);
        let mut rng_b = StdRng::seed_from_u64(99);
        let (inputs_a, target_a) = augmentor.augment(&inputs, &target, (24, 24), &mut rng_a);
        let (inputs_b, target_b) = augmentor.augment(&inputs, &target, (24, 24), &mut rng_b);
        assert_eq!(target_a, target_b);
        assert_eq!(inputs_a, inputs_b);
    }

    #[test]
    fn crop_and_mirror_are_synchronized_across_layers() {
        let augmentor = Augmentor::new(
            AugmentConfigBuilder::new()
                .input_channels(2)
                .upscale_percent(160)
                .build(),
        );
        let inputs = vec![tagged_layer(25, 40, 1), tagged_layer(25, 40, 2)];
        let target = tagged_layer(25, 40, 0);
        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            let (a_inputs, a_target) = augmentor.augment(&inputs, &target, (40, 25), &mut rng);
            for (y, x) in [(0usize, 0usize), (7, 11), (24, 39)] {
                let t = a_target[[y, x]] as usize;
                let (ty, tx) = ((t / 1_000) % 1_000, t % 1_000);
                for (c, band) in a_inputs.iter().enumerate() {
                    let v = band[[y, x]] as usize;
                    assert_eq!(v / 1_000_000, c + 1, "layer id survives");
                    assert_eq!(
                        ((v / 1_000) % 1_000, v % 1_000),
                        (ty, tx),
                        "seed {seed}: channel {c} disagrees with target at ({y}, {x})"
                    );
                }
            }
        }
    }

    #[test]
    fn degenerate_upscale_pins_crop_origin() {
        assert_eq!(crop_offset(0, &mut StdRng::seed_from_u64(0)), 0);

        // With no crop slack the only variation left is the mirror, so the
        // output is the original stack or its exact left-right flip.
        let augmentor = Augmentor::new(AugmentConfigBuilder::new().input_channels(1).build());
        let inputs = vec![tagged_layer(8, 12, 1)];
        let target = tagged_layer(8, 12, 0);
        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            let (_, a_target) = augmentor.augment(&inputs, &target, (12, 8), &mut rng);
            let mut flipped = target.clone();
            flipped.invert_axis(Axis(1));
            assert!(a_target == target || a_target == flipped, "seed {seed}");
        }
    }

    #[test]
    fn normalization_applies_to_inputs_and_target_alike() {
        let augmentor = Augmentor::new(
            AugmentConfigBuilder::new()
                .input_channels(1)
                .normalize(true, NormRange::ZeroToOne)
                .build(),
        );
        let inputs = vec![Array2::from_elem((6, 6), 255.0)];
        let target = Array2::from_elem((6, 6), 51.0);
        let mut rng = StdRng::seed_from_u64(1);
        let (a_inputs, a_target) = augmentor.augment(&inputs, &target, (6, 6), &mut rng);
        assert!(a_inputs[0].iter().all(|v| *v == 1.0));
        assert!(a_target.iter().all(|v| (*v - 0.2).abs() < 1e-6));
    }
}
