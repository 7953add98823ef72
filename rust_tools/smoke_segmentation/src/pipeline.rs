use crate::error::{Result, SegmentationError};
use crate::mask::argmax_mask;
use crate::model::SegmentationModel;
use crate::tiling::{reconstruct_batch, split, unpad, Overlap, TileShape};
use log::{debug, info};
use ndarray::{concatenate, stack, Array2, Array3, Array4, ArrayView3, ArrayView4, Axis};

/// Tiling and batching parameters for a segmentation run.
#[derive(Debug, Clone)]
pub struct SegmentationConfig {
    /// Spatial input shape of the model.
    pub tile: TileShape,

    /// Overlap border in pixels on each side of a tile.
    pub overlap: usize,

    /// Tiles handed to the model per call.
    pub batch_size: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            tile: TileShape {
                height: 512,
                width: 512,
            },
            overlap: 0,
            batch_size: 32,
        }
    }
}

impl SegmentationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tile.height == 0 || self.tile.width == 0 {
            return Err(SegmentationError::InvalidTileShape(
                self.tile.height,
                self.tile.width,
            ));
        }
        if self.batch_size == 0 {
            return Err(SegmentationError::InvalidParameter {
                name: "batch_size".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Run the model over tiles in batches.
///
/// Returns a (tiles, height, width, classes) array in the input tile order.
pub fn predict_tiles<M>(
    tiles: &[Array3<f32>],
    model: &M,
    tile: TileShape,
    batch_size: usize,
) -> Result<Array4<f32>>
where
    M: SegmentationModel + ?Sized,
{
    let mut outputs: Vec<Array4<f32>> = Vec::with_capacity(tiles.len().div_ceil(batch_size.max(1)));

    for (batch_idx, chunk) in tiles.chunks(batch_size.max(1)).enumerate() {
        let views: Vec<ArrayView3<'_, f32>> = chunk.iter().map(|t| t.view()).collect();
        let batch = stack(Axis(0), &views)?;
        debug!("Predicting batch {} ({} tiles)", batch_idx, chunk.len());

        let scores = model.predict(batch.view())?;
        let (count, height, width, classes) = scores.dim();
        if count != chunk.len() || height != tile.height || width != tile.width {
            return Err(SegmentationError::shape_mismatch(
                format!("{} tiles of {}x{}", chunk.len(), tile.height, tile.width),
                format!("{} tiles of {}x{}x{}", count, height, width, classes),
            ));
        }
        if let Some(first) = outputs.first() {
            if first.dim().3 != classes {
                return Err(SegmentationError::shape_mismatch(
                    format!("{} classes", first.dim().3),
                    format!("{} classes in batch {}", classes, batch_idx),
                ));
            }
        }

        outputs.push(scores);
    }

    if outputs.is_empty() {
        return Err(SegmentationError::shape_mismatch("at least one tile", "0 tiles"));
    }

    let views: Vec<ArrayView4<'_, f32>> = outputs.iter().map(|b| b.view()).collect();
    Ok(concatenate(Axis(0), &views)?)
}

/// Per-pixel class scores for an image of any size, at the image's own shape.
pub fn segment<M>(
    image: ArrayView3<'_, f32>,
    model: &M,
    config: &SegmentationConfig,
) -> Result<Array3<f32>>
where
    M: SegmentationModel + ?Sized,
{
    config.validate()?;

    let tiling = split(&image, config.tile, Overlap::uniform(config.overlap))?;
    info!(
        "Split {}x{} image into {} tiles ({}x{} grid)",
        tiling.layout.image_height,
        tiling.layout.image_width,
        tiling.tiles.len(),
        tiling.grid().rows,
        tiling.grid().cols
    );

    let outputs = predict_tiles(&tiling.tiles, model, config.tile, config.batch_size)?;

    let full = reconstruct_batch(&outputs, tiling.grid(), config.tile, tiling.overlap())?;
    let scores = unpad(&full, &tiling.padding())?;
    info!("Reconstructed scores: {:?}", scores.dim());

    Ok(scores)
}

/// Class-index mask for an image of any size.
pub fn segment_mask<M>(
    image: ArrayView3<'_, f32>,
    model: &M,
    config: &SegmentationConfig,
) -> Result<Array2<u8>>
where
    M: SegmentationModel + ?Sized,
{
    let scores = segment(image, model, config)?;
    argmax_mask(scores.view())
}
