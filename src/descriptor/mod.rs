pub mod aggregate;
pub mod pipeline;
pub mod pooling;

pub use aggregate::{aggregate_by_group, cosine_similarity, GroupSummary, NormalizationScope};
pub use pipeline::{DescriptorOptions, DescriptorPipeline, Rotation};
pub use pooling::CompactBilinearPooling;
