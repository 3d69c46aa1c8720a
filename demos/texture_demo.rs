//! Example computing deep texture descriptors for a set of images and
//! printing their pairwise cosine similarities.
//!
//! Expects a VGG16 feature-stack ONNX export truncated at block3_conv3:
//!
//! ```text
//! texture_demo <vgg16_block3.onnx> <image> <image> [image...]
//! ```

use deeptexture::{
    cosine_similarity, BackboneArch, DescriptorOptions, DescriptorPipeline, ExtractionDepth,
    ImageSource, OnnxBackbone, Rotation, DEFAULT_DESCRIPTOR_DIM,
};
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        eprintln!("usage: texture_demo <vgg16_block3.onnx> <image> <image> [image...]");
        return Ok(());
    }
    let model_path = &args[0];
    let sources: Vec<ImageSource> = args[1..]
        .iter()
        .map(|path| ImageSource::from(path.as_str()))
        .collect();

    let backbone = OnnxBackbone::load(
        BackboneArch::Vgg16,
        Path::new(model_path),
        ExtractionDepth::Block3Conv3,
    )?;
    let mut pipeline = DescriptorPipeline::new(backbone, DEFAULT_DESCRIPTOR_DIM)?;

    // Square resize plus four-angle averaging for a rotation-robust descriptor.
    let opts = DescriptorOptions {
        rotation: Rotation::Average(vec![0, 90, 180, 270]),
        size: Some(224),
        ..Default::default()
    };
    let descriptors = pipeline.compute_descriptors(&sources, &opts)?;

    for i in 0..descriptors.nrows() {
        for j in (i + 1)..descriptors.nrows() {
            let similarity = cosine_similarity(descriptors.row(i), descriptors.row(j))?;
            println!("{} vs {}: {similarity:.4}", args[1 + i], args[1 + j]);
        }
    }

    Ok(())
}
