use crate::error::{DtrError, Result};
use log::debug;
use ndarray::{Array2, Array4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seed for the first default sign projection.
const PROJECTION_SEED_1: u64 = 128;
/// Seed for the second default sign projection.
const PROJECTION_SEED_2: u64 = 1997;

/// Compact bilinear pooling of a spatial feature tensor.
///
/// Approximates the bilinear (outer-product) interaction of a per-pixel
/// feature vector with itself using two independent random {-1, +1}
/// projections and an elementwise product, then averages over all spatial
/// positions. The result is a `[batch, output_dim]` descriptor at a fraction
/// of the cost of the full CxC outer product.
///
/// The projection pair is generated once at construction and held immutably
/// for the engine's lifetime. Descriptors are only comparable when computed
/// with the same pair.
pub struct CompactBilinearPooling {
    input_dim: usize,
    output_dim: usize,
    projection_1: Array2<f32>,
    projection_2: Array2<f32>,
}

impl CompactBilinearPooling {
    /// Build an engine with the default, reproducible projection pair.
    ///
    /// Both matrices are drawn from deterministic generators with distinct
    /// fixed seeds, so the default behaviour is identical run-to-run.
    pub fn new(input_dim: usize, output_dim: usize) -> Result<Self> {
        if input_dim == 0 || output_dim == 0 {
            return Err(DtrError::InvalidInput(format!(
                "pooling dimensions must be positive, got input_dim={input_dim}, output_dim={output_dim}"
            )));
        }
        let projection_1 = random_sign_matrix(PROJECTION_SEED_1, input_dim, output_dim);
        let projection_2 = random_sign_matrix(PROJECTION_SEED_2, input_dim, output_dim);
        debug!("Generated default {input_dim}x{output_dim} sign projection pair");
        Ok(Self {
            input_dim,
            output_dim,
            projection_1,
            projection_2,
        })
    }

    /// Build an engine from a pre-supplied projection pair.
    ///
    /// Each matrix must be `[input_dim, output_dim]` with entries in {-1, +1}.
    pub fn with_projections(projection_1: Array2<f32>, projection_2: Array2<f32>) -> Result<Self> {
        if projection_1.dim() != projection_2.dim() {
            return Err(DtrError::InvalidInput(format!(
                "projection shapes differ: {:?} vs {:?}",
                projection_1.dim(),
                projection_2.dim()
            )));
        }
        let (input_dim, output_dim) = projection_1.dim();
        if input_dim == 0 || output_dim == 0 {
            return Err(DtrError::InvalidInput(
                "projection matrices must be non-empty".to_string(),
            ));
        }
        for matrix in [&projection_1, &projection_2] {
            if matrix.iter().any(|&v| v != 1.0 && v != -1.0) {
                return Err(DtrError::InvalidInput(
                    "projection entries must be -1 or +1".to_string(),
                ));
            }
        }
        Ok(Self {
            input_dim,
            output_dim,
            projection_1,
            projection_2,
        })
    }

    /// Channel count the engine expects on its input tensor.
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Length of the pooled descriptor.
    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    /// Pool a `[batch, channels, height, width]` feature tensor into a
    /// `[batch, output_dim]` descriptor matrix.
    ///
    /// No normalisation is applied; that is the caller's responsibility.
    pub fn forward(&self, features: &Array4<f32>) -> Result<Array2<f32>> {
        let (batch, channels, height, width) = features.dim();
        if channels != self.input_dim {
            return Err(DtrError::DimensionMismatch {
                expected: self.input_dim,
                actual: channels,
            });
        }

        // Flatten spatial positions, keeping each pixel's channel vector intact.
        let positions = height * width;
        if positions == 0 {
            return Err(DtrError::InvalidInput(
                "feature tensor has no spatial positions".to_string(),
            ));
        }
        let flat = Array2::from_shape_fn((batch * positions, channels), |(row, channel)| {
            let b = row / positions;
            let pixel = row % positions;
            features[[b, channel, pixel / width, pixel % width]]
        });

        let sketch_1 = flat.dot(&self.projection_1);
        let sketch_2 = flat.dot(&self.projection_2);
        let pooled_per_pixel = sketch_1 * sketch_2;

        // Plain mean over all H*W positions per batch element.
        let mut pooled = Array2::<f32>::zeros((batch, self.output_dim));
        for (row_idx, pixel_row) in pooled_per_pixel.rows().into_iter().enumerate() {
            let mut out_row = pooled.row_mut(row_idx / positions);
            out_row += &pixel_row;
        }
        pooled /= positions as f32;
        Ok(pooled)
    }
}

/// Deterministic [rows, cols] matrix with entries drawn uniformly from {-1, +1}.
fn random_sign_matrix(seed: u64, rows: usize, cols: usize) -> Array2<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let signs: Vec<f32> = (0..rows * cols)
        .map(|_| rng.gen_range(0..2u8) as f32 * 2.0 - 1.0)
        .collect();
    Array2::from_shape_vec((rows, cols), signs).expect("sign vector length matches shape")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn ramp_features(batch: usize, channels: usize, height: usize, width: usize) -> Array4<f32> {
        Array4::from_shape_fn((batch, channels, height, width), |(b, c, y, x)| {
            (b * 31 + c * 7 + y * 3 + x) as f32 * 0.01 - 0.5
        })
    }

    #[test]
    fn pooling_is_deterministic() {
        let engine = CompactBilinearPooling::new(8, 16).unwrap();
        let features = ramp_features(2, 8, 5, 4);
        let first = engine.forward(&features).unwrap();
        let second = engine.forward(&features).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn default_projections_are_stable_and_distinct() {
        let a = random_sign_matrix(PROJECTION_SEED_1, 32, 64);
        let b = random_sign_matrix(PROJECTION_SEED_1, 32, 64);
        let c = random_sign_matrix(PROJECTION_SEED_2, 32, 64);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.iter().all(|&v| v == 1.0 || v == -1.0));
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(CompactBilinearPooling::new(0, 16).is_err());
        assert!(CompactBilinearPooling::new(16, 0).is_err());
    }

    #[test]
    fn channel_mismatch_is_reported() {
        let engine = CompactBilinearPooling::new(8, 16).unwrap();
        let features = ramp_features(1, 4, 3, 3);
        assert!(matches!(
            engine.forward(&features),
            Err(DtrError::DimensionMismatch {
                expected: 8,
                actual: 4
            })
        ));
    }

    #[test]
    fn supplied_projections_give_exact_values() {
        // With p1 = [1, -1]^T and p2 = [1, 1]^T each pixel contributes
        // (x0 - x1) * (x0 + x1) = x0^2 - x1^2.
        let p1 = array![[1.0f32], [-1.0]];
        let p2 = array![[1.0f32], [1.0]];
        let engine = CompactBilinearPooling::with_projections(p1, p2).unwrap();

        let mut features = Array4::zeros((1, 2, 1, 2));
        features[[0, 0, 0, 0]] = 3.0;
        features[[0, 1, 0, 0]] = 1.0;
        features[[0, 0, 0, 1]] = 2.0;
        features[[0, 1, 0, 1]] = 2.0;

        let pooled = engine.forward(&features).unwrap();
        // Pixel one: 9 - 1 = 8, pixel two: 4 - 4 = 0, mean 4.
        assert_eq!(pooled.dim(), (1, 1));
        assert!((pooled[[0, 0]] - 4.0).abs() < 1e-6);
    }

    #[test]
    fn invalid_supplied_projections_are_rejected() {
        let signs = array![[1.0f32], [-1.0]];
        let wrong_shape = array![[1.0f32, -1.0]];
        assert!(CompactBilinearPooling::with_projections(signs.clone(), wrong_shape).is_err());

        let not_signs = array![[0.5f32], [-1.0]];
        assert!(CompactBilinearPooling::with_projections(signs, not_signs).is_err());
    }

    #[test]
    fn spatial_mean_ignores_position_order() {
        let engine = CompactBilinearPooling::new(4, 8).unwrap();
        let features = ramp_features(1, 4, 2, 3);
        // Same pixels laid out transposed: a plain mean cannot tell them apart.
        let transposed = Array4::from_shape_fn((1, 4, 3, 2), |(b, c, y, x)| features[[b, c, x, y]]);
        let a = engine.forward(&features).unwrap();
        let b = engine.forward(&transposed).unwrap();
        for (lhs, rhs) in a.iter().zip(b.iter()) {
            assert!((lhs - rhs).abs() < 1e-5);
        }
    }
}
