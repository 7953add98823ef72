// Library exports for testing and reuse

pub mod cli;
pub mod error;
pub mod io;
pub mod manifest;
pub mod mask;
pub mod model;
pub mod pipeline;
pub mod tiling;

// Re-export commonly used types
pub use error::{Result, SegmentationError};
pub use model::SegmentationModel;
pub use pipeline::{segment, segment_mask, SegmentationConfig};
pub use tiling::{
    compute_padding, plan_tiling, reconstruct, reconstruct_batch, split, unpad, GridShape, Overlap,
    PaddingRecord, TileLayout, TileShape, Tiling,
};
