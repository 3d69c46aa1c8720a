pub mod loader;

pub use loader::{
    rescale, resize_square, rotate_ccw, to_input_tensor, ImageSource, IMAGENET_MEAN, IMAGENET_STD,
};
