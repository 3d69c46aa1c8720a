use crate::backbone::FeatureExtractor;
use crate::descriptor::aggregate::l2_normalized;
use crate::descriptor::pooling::CompactBilinearPooling;
use crate::error::{DtrError, Result};
use crate::image::{rescale, resize_square, rotate_ccw, to_input_tensor, ImageSource};
use image::RgbImage;
use log::debug;
use ndarray::{Array1, Array2};

/// Ratio applied on both axes to derive the secondary multi-scale image.
const QUARTER_SCALE_RATIO: f32 = 0.25;

/// Rotation strategy for a descriptor computation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Rotation {
    /// No rotation.
    #[default]
    None,
    /// Rotate the image in place by a single angle; the descriptor stays raw.
    Single(i32),
    /// Compute one descriptor per angle, average them, and renormalise.
    ///
    /// This path yields a unit-norm descriptor for any angle count, a
    /// one-element list included. The single-angle variant above does not.
    Average(Vec<i32>),
}

/// Per-call settings for descriptor computation.
#[derive(Debug, Clone, Default)]
pub struct DescriptorOptions {
    pub rotation: Rotation,
    /// Resize to an explicit square size. Takes precedence over `scale`.
    pub size: Option<u32>,
    /// Rescale proportionally by a ratio. Ignored when `size` is set.
    pub scale: Option<f32>,
    /// Concatenate the descriptor of a quarter-scale copy, doubling the
    /// descriptor length.
    pub multi_scale: bool,
}

/// Turns images into texture descriptors.
///
/// Owns the feature extractor and the pooling engine; the projection pair
/// inside the pooling engine is the only persistent state, so descriptors
/// from one pipeline instance are mutually comparable.
pub struct DescriptorPipeline<E: FeatureExtractor> {
    extractor: E,
    pooling: CompactBilinearPooling,
}

impl<E: FeatureExtractor> DescriptorPipeline<E> {
    /// Build a pipeline with the default projection pair, sized to the
    /// extractor's channel count.
    pub fn new(extractor: E, output_dim: usize) -> Result<Self> {
        let pooling = CompactBilinearPooling::new(extractor.channels(), output_dim)?;
        Ok(Self { extractor, pooling })
    }

    /// Build a pipeline around an existing pooling engine.
    pub fn with_pooling(extractor: E, pooling: CompactBilinearPooling) -> Result<Self> {
        if extractor.channels() != pooling.input_dim() {
            return Err(DtrError::DimensionMismatch {
                expected: pooling.input_dim(),
                actual: extractor.channels(),
            });
        }
        Ok(Self { extractor, pooling })
    }

    /// Length of a single-scale descriptor.
    pub fn output_dim(&self) -> usize {
        self.pooling.output_dim()
    }

    /// Compute the texture descriptor for one image.
    ///
    /// The returned vector has length `output_dim` (doubled under
    /// `multi_scale`). Only the angle-average path returns a unit-norm
    /// vector; all other paths leave the descriptor unnormalised.
    pub fn compute_descriptor(
        &mut self,
        source: &ImageSource,
        opts: &DescriptorOptions,
    ) -> Result<Array1<f32>> {
        let mut base = source.to_rgb()?;

        if let Some(size) = opts.size {
            if size == 0 {
                return Err(DtrError::InvalidInput(
                    "resize size must be positive".to_string(),
                ));
            }
            base = resize_square(&base, size);
        } else if let Some(scale) = opts.scale {
            base = rescale(&base, scale)?;
        }

        let secondary = if opts.multi_scale {
            Some(rescale(&base, QUARTER_SCALE_RATIO)?)
        } else {
            None
        };

        match &opts.rotation {
            Rotation::Average(angles) => {
                if angles.is_empty() {
                    return Err(DtrError::InvalidInput(
                        "rotation angle list must not be empty".to_string(),
                    ));
                }
                // One decoded base image, one extractor/pooling pass per angle.
                let mut rows: Vec<Array1<f32>> = Vec::with_capacity(angles.len());
                for &angle in angles {
                    rows.push(self.variant_descriptor(&base, secondary.as_ref(), Some(angle))?);
                }
                let mut mean = Array1::<f32>::zeros(rows[0].len());
                for row in &rows {
                    mean += row;
                }
                mean /= angles.len() as f32;
                debug!("Averaged {} rotated descriptor variants", angles.len());
                l2_normalized(mean)
            }
            Rotation::Single(angle) => {
                self.variant_descriptor(&base, secondary.as_ref(), Some(*angle))
            }
            Rotation::None => self.variant_descriptor(&base, secondary.as_ref(), None),
        }
    }

    /// Compute descriptors for an ordered batch of images, stacked row-wise
    /// in input order.
    pub fn compute_descriptors(
        &mut self,
        sources: &[ImageSource],
        opts: &DescriptorOptions,
    ) -> Result<Array2<f32>> {
        if sources.is_empty() {
            return Err(DtrError::InvalidInput(
                "no images to compute descriptors for".to_string(),
            ));
        }
        let mut rows = Vec::with_capacity(sources.len());
        for source in sources {
            rows.push(self.compute_descriptor(source, opts)?);
        }
        let width = rows[0].len();
        let mut stacked = Array2::<f32>::zeros((rows.len(), width));
        for (index, row) in rows.iter().enumerate() {
            stacked.row_mut(index).assign(row);
        }
        Ok(stacked)
    }

    /// Descriptor for one prepared variant: optional in-place rotation,
    /// standardisation, extraction, pooling, and the multi-scale tail.
    fn variant_descriptor(
        &mut self,
        base: &RgbImage,
        secondary: Option<&RgbImage>,
        angle: Option<i32>,
    ) -> Result<Array1<f32>> {
        let prepared = match angle {
            Some(degrees) => rotate_ccw(base, degrees),
            None => base.clone(),
        };
        let mut descriptor = self.raw_descriptor(&prepared)?;

        if let Some(second) = secondary {
            let prepared_second = match angle {
                Some(degrees) => rotate_ccw(second, degrees),
                None => second.clone(),
            };
            let tail = self.raw_descriptor(&prepared_second)?;
            descriptor = Array1::from_iter(descriptor.iter().chain(tail.iter()).copied());
        }
        Ok(descriptor)
    }

    fn raw_descriptor(&mut self, img: &RgbImage) -> Result<Array1<f32>> {
        let input = to_input_tensor(img);
        let features = self.extractor.extract(&input)?;
        let pooled = self.pooling.forward(&features)?;
        Ok(pooled.row(0).to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use ndarray::Array4;

    /// Global-average extractor: one output pixel, channels cycled from the
    /// three input planes.
    struct MeanExtractor {
        channels: usize,
    }

    impl FeatureExtractor for MeanExtractor {
        fn channels(&self) -> usize {
            self.channels
        }

        fn extract(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
            let (batch, in_channels, height, width) = input.dim();
            let count = (height * width) as f32;
            Ok(Array4::from_shape_fn(
                (batch, self.channels, 1, 1),
                |(b, c, _, _)| {
                    let plane = c % in_channels;
                    let sum: f32 = (0..height)
                        .flat_map(|y| (0..width).map(move |x| (y, x)))
                        .map(|(y, x)| input[[b, plane, y, x]])
                        .sum();
                    sum / count * (1.0 + c as f32 * 0.1)
                },
            ))
        }
    }

    fn pipeline() -> DescriptorPipeline<MeanExtractor> {
        DescriptorPipeline::new(MeanExtractor { channels: 6 }, 12).unwrap()
    }

    fn test_source() -> ImageSource {
        RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 128])).into()
    }

    #[test]
    fn default_rotation_is_none() {
        assert_eq!(DescriptorOptions::default().rotation, Rotation::None);
    }

    #[test]
    fn empty_angle_list_is_invalid() {
        let mut pipeline = pipeline();
        let opts = DescriptorOptions {
            rotation: Rotation::Average(vec![]),
            ..Default::default()
        };
        assert!(matches!(
            pipeline.compute_descriptor(&test_source(), &opts),
            Err(DtrError::InvalidInput(_))
        ));
    }

    #[test]
    fn zero_resize_is_invalid() {
        let mut pipeline = pipeline();
        let opts = DescriptorOptions {
            size: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            pipeline.compute_descriptor(&test_source(), &opts),
            Err(DtrError::InvalidInput(_))
        ));
    }

    #[test]
    fn empty_batch_is_invalid() {
        let mut pipeline = pipeline();
        assert!(matches!(
            pipeline.compute_descriptors(&[], &DescriptorOptions::default()),
            Err(DtrError::InvalidInput(_))
        ));
    }

    #[test]
    fn mismatched_pooling_is_rejected() {
        let pooling = CompactBilinearPooling::new(5, 12).unwrap();
        assert!(matches!(
            DescriptorPipeline::with_pooling(MeanExtractor { channels: 6 }, pooling),
            Err(DtrError::DimensionMismatch { .. })
        ));
    }
}
