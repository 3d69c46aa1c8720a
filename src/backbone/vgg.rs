use crate::backbone::{ExtractionDepth, FeatureExtractor};
use crate::error::{DtrError, Result};
use log::debug;
use ndarray::Array4;
use ort::session::Session;
use std::path::Path;

/// Backbone families the adapter knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackboneArch {
    Vgg16,
}

impl std::str::FromStr for BackboneArch {
    type Err = DtrError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "vgg" | "vgg16" => Ok(BackboneArch::Vgg16),
            other => Err(DtrError::UnsupportedConfiguration(format!(
                "unknown backbone architecture '{other}', only the VGG16 family is supported"
            ))),
        }
    }
}

/// ONNX-backed VGG16 feature extractor.
///
/// Wraps an ONNX export of the VGG16 convolutional stack truncated at the
/// chosen readout depth. The session is the only state; it is loaded once and
/// driven synchronously per call.
pub struct OnnxBackbone {
    session: Session,
    depth: ExtractionDepth,
    input_name: String,
    output_name: String,
}

impl OnnxBackbone {
    /// Load a backbone from an ONNX export on disk.
    pub fn load(arch: BackboneArch, model_path: &Path, depth: ExtractionDepth) -> Result<Self> {
        match arch {
            BackboneArch::Vgg16 => {}
        }

        // Physical cores rather than hyperthreads, clamped to a sane range.
        let num_threads = std::thread::available_parallelism()
            .map(|p| p.get() / 2)
            .unwrap_or(4)
            .clamp(1, 8);

        let session = Session::builder()?
            .with_intra_threads(num_threads)
            .map_err(ort::Error::from)?
            .commit_from_file(model_path)?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .ok_or_else(|| {
                DtrError::UnsupportedConfiguration("backbone model declares no inputs".to_string())
            })?;
        let output_name = session
            .outputs()
            .first()
            .map(|o| o.name().to_string())
            .ok_or_else(|| {
                DtrError::UnsupportedConfiguration("backbone model declares no outputs".to_string())
            })?;

        debug!(
            "Loaded VGG16 backbone from {} (depth {depth}, {num_threads} threads, input '{input_name}', output '{output_name}')",
            model_path.display()
        );

        Ok(Self {
            session,
            depth,
            input_name,
            output_name,
        })
    }

    /// The configured readout depth.
    pub fn depth(&self) -> ExtractionDepth {
        self.depth
    }
}

impl FeatureExtractor for OnnxBackbone {
    fn channels(&self) -> usize {
        self.depth.channels()
    }

    fn extract(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let shape = input.shape().to_vec();
        let (data, _offset) = input.clone().into_raw_vec_and_offset();
        let input_value = ort::value::Value::from_array((shape.as_slice(), data))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_value])?;
        let (out_shape, out_data) = outputs[self.output_name.as_str()].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = out_shape.iter().map(|&d| d as usize).collect();
        if dims.len() != 4 {
            return Err(DtrError::UnsupportedConfiguration(format!(
                "backbone produced a rank-{} tensor, expected [batch, channels, height, width]",
                dims.len()
            )));
        }
        let expected = self.depth.channels();
        if dims[1] != expected {
            return Err(DtrError::DimensionMismatch {
                expected,
                actual: dims[1],
            });
        }

        let features =
            Array4::from_shape_vec((dims[0], dims[1], dims[2], dims[3]), out_data.to_vec())
                .map_err(|e| {
                    DtrError::InvalidInput(format!("backbone returned a malformed tensor: {e}"))
                })?;
        debug!(
            "Extracted {}x{}x{}x{} feature tensor at depth {}",
            dims[0], dims[1], dims[2], dims[3], self.depth
        );
        Ok(features)
    }
}
