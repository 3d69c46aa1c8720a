use thiserror::Error;

#[derive(Error, Debug)]
pub enum DtrError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("ONNX runtime error: {0}")]
    OnnxError(#[from] ort::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Feature tensor has {actual} channels but the projection pair was built for {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("Degenerate input: {0}")]
    DegenerateInput(String),
}

pub type Result<T> = std::result::Result<T, DtrError>;
