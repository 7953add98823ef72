use crate::error::Result;
use ndarray::{Array4, ArrayView4};

/// A segmentation model over fixed-size tiles; the seam between the tiling
/// pipeline and whatever runs inference.
///
/// `predict` receives a (tiles, height, width, channels) batch and must return a
/// (tiles, height, width, classes) batch of per-pixel class scores with the same
/// tile count and spatial shape.
pub trait SegmentationModel {
    fn predict(&self, batch: ArrayView4<'_, f32>) -> Result<Array4<f32>>;
}

impl<F> SegmentationModel for F
where
    F: Fn(ArrayView4<'_, f32>) -> Result<Array4<f32>>,
{
    fn predict(&self, batch: ArrayView4<'_, f32>) -> Result<Array4<f32>> {
        self(batch)
    }
}
