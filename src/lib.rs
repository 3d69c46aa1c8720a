//! Deep Texture Representation Library
//!
//! Computes fixed-length, rotation- and scale-robust texture descriptors for
//! images from the intermediate feature maps of a pretrained convolutional
//! backbone, and aggregates them into per-group statistics.
//!
//! ## Pipeline
//!
//! 1. **Feature extraction** (`backbone`): a pretrained VGG16 stack, driven
//!    through ONNX Runtime behind the [`FeatureExtractor`] trait, maps a
//!    standardised image tensor to a spatial feature tensor at a chosen
//!    readout depth.
//! 2. **Compact bilinear pooling** (`descriptor::pooling`): two fixed random
//!    sign projections and an elementwise product collapse the feature
//!    tensor into a fixed-length descriptor that approximates second-order
//!    feature interactions at a fraction of the cost of the full outer
//!    product.
//! 3. **Invariance strategies** (`descriptor::pipeline`): multi-angle
//!    rotation averaging with renormalisation and multi-scale concatenation,
//!    configured per call.
//! 4. **Aggregation** (`descriptor::aggregate`): cosine similarity,
//!    per-group mean descriptors, and medoid selection with representative
//!    attribute rows.
//!
//! Descriptors are only comparable when produced by the same pipeline
//! instance: the projection pair generated at construction is the engine's
//! sole persistent state.

pub mod backbone;
pub mod descriptor;
pub mod error;
pub mod image;

pub use backbone::{BackboneArch, ExtractionDepth, FeatureExtractor, OnnxBackbone};
pub use descriptor::{
    aggregate_by_group, cosine_similarity, CompactBilinearPooling, DescriptorOptions,
    DescriptorPipeline, GroupSummary, NormalizationScope, Rotation,
};
pub use error::{DtrError, Result};
pub use image::ImageSource;

/// Default descriptor dimensionality.
pub const DEFAULT_DESCRIPTOR_DIM: usize = 1024;
