use thiserror::Error;

#[derive(Error, Debug)]
pub enum SegmentationError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Array shape error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),

    #[error("Manifest error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid tile shape: {0}x{1} (both dimensions must be positive)")]
    InvalidTileShape(usize, usize),

    #[error("Degenerate tiling: overlap {overlap} leaves no inner stride for tile dimension {tile}")]
    DegenerateTiling { tile: usize, overlap: usize },

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Invalid padding: {before}+{after} on axis {axis} of length {len}")]
    PaddingRange {
        axis: usize,
        before: usize,
        after: usize,
        len: usize,
    },

    #[error("Input raster has invalid dimensions: {0}x{1}")]
    InvalidDimensions(usize, usize),

    #[error("Input raster has {found} bands, need at least {required}")]
    InvalidBandCount { found: usize, required: usize },

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Model inference failed: {0}")]
    Model(String),
}

impl SegmentationError {
    pub(crate) fn shape_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SegmentationError>;
