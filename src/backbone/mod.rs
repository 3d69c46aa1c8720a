pub mod vgg;

use crate::error::Result;
use ndarray::Array4;

pub use vgg::{BackboneArch, OnnxBackbone};

/// Readout depth within the backbone.
///
/// Each depth has a fixed channel count; the pooling engine's `input_dim`
/// must match it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionDepth {
    /// Shallow block: third convolutional stage, 256 channels.
    Block3Conv3,
    /// Deep block: fourth convolutional stage, 512 channels.
    Block4Conv3,
}

impl ExtractionDepth {
    /// Channel count of the feature tensor read out at this depth.
    pub fn channels(&self) -> usize {
        match self {
            ExtractionDepth::Block3Conv3 => 256,
            ExtractionDepth::Block4Conv3 => 512,
        }
    }
}

impl std::fmt::Display for ExtractionDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionDepth::Block3Conv3 => write!(f, "block3_conv3"),
            ExtractionDepth::Block4Conv3 => write!(f, "block4_conv3"),
        }
    }
}

impl std::str::FromStr for ExtractionDepth {
    type Err = crate::error::DtrError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "block3_conv3" => Ok(ExtractionDepth::Block3Conv3),
            "block4_conv3" => Ok(ExtractionDepth::Block4Conv3),
            other => Err(crate::error::DtrError::UnsupportedConfiguration(format!(
                "unknown extraction depth '{other}', expected block3_conv3 or block4_conv3"
            ))),
        }
    }
}

/// The pretrained feature extractor, seen from the descriptor core.
///
/// Implementations map a standardised `[1, 3, H, W]` image tensor to the
/// spatial feature tensor `[1, C, H', W']` read out at a fixed depth. The
/// backbone's architecture and weights are opaque to everything else in this
/// crate.
pub trait FeatureExtractor {
    /// Channel count C of the extracted feature tensor.
    fn channels(&self) -> usize;

    /// Map an input image tensor to the intermediate feature tensor.
    fn extract(&mut self, input: &Array4<f32>) -> Result<Array4<f32>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_parses_original_layer_names() {
        assert_eq!(
            "block3_conv3".parse::<ExtractionDepth>().unwrap(),
            ExtractionDepth::Block3Conv3
        );
        assert_eq!(
            "block4_conv3".parse::<ExtractionDepth>().unwrap(),
            ExtractionDepth::Block4Conv3
        );
    }

    #[test]
    fn unknown_depth_is_rejected() {
        let err = "block5_conv3".parse::<ExtractionDepth>().unwrap_err();
        assert!(matches!(
            err,
            crate::error::DtrError::UnsupportedConfiguration(_)
        ));
    }

    #[test]
    fn depth_channel_counts_are_fixed() {
        assert_eq!(ExtractionDepth::Block3Conv3.channels(), 256);
        assert_eq!(ExtractionDepth::Block4Conv3.channels(), 512);
    }

    #[test]
    fn depth_display_round_trips() {
        for depth in [ExtractionDepth::Block3Conv3, ExtractionDepth::Block4Conv3] {
            assert_eq!(depth.to_string().parse::<ExtractionDepth>().unwrap(), depth);
        }
    }
}
