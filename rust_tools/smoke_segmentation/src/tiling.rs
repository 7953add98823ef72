use crate::error::{Result, SegmentationError};
use log::debug;
use ndarray::{s, Array, Array3, ArrayBase, ArrayView3, Data, Dimension, Ix3, Ix4, Slice};
use serde::{Deserialize, Serialize};

/// Spatial shape the model accepts for a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileShape {
    pub height: usize,
    pub width: usize,
}

impl TileShape {
    pub fn new(height: usize, width: usize) -> Result<Self> {
        if height == 0 || width == 0 {
            return Err(SegmentationError::InvalidTileShape(height, width));
        }
        Ok(Self { height, width })
    }

    pub fn square(size: usize) -> Result<Self> {
        Self::new(size, size)
    }
}

/// Border pixels shared between neighbouring tiles, per spatial axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlap {
    pub vertical: usize,
    pub horizontal: usize,
}

impl Overlap {
    pub fn uniform(pixels: usize) -> Self {
        Self {
            vertical: pixels,
            horizontal: pixels,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridShape {
    pub rows: usize,
    pub cols: usize,
}

impl GridShape {
    pub fn tile_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Row-major linear index of the tile at (row, col).
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    pub fn position(&self, index: usize) -> (usize, usize) {
        (index / self.cols, index % self.cols)
    }
}

/// Zero padding applied per axis as (before, after) pixel counts.
///
/// Axes are (height, width, channels); any further axis is never padded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaddingRecord {
    pub height: (usize, usize),
    pub width: (usize, usize),
    pub channels: (usize, usize),
}

impl PaddingRecord {
    /// Padding on the trailing edge of both spatial axes only.
    pub fn trailing(height: usize, width: usize) -> Self {
        Self {
            height: (0, height),
            width: (0, width),
            channels: (0, 0),
        }
    }

    pub fn axis(&self, axis: usize) -> (usize, usize) {
        match axis {
            0 => self.height,
            1 => self.width,
            2 => self.channels,
            _ => (0, 0),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Everything reconstruction needs to know about a split, computed once
/// up front and carried unchanged to the stitching side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileLayout {
    // Source image extent
    pub image_height: usize,
    pub image_width: usize,

    // Full window handed to the model, including overlap borders
    pub tile: TileShape,

    // Window stride (tile minus both overlap borders)
    pub inner: TileShape,

    // Overlap after edge-case adjustment
    pub overlap: Overlap,

    pub padding: PaddingRecord,
    pub grid: GridShape,
}

impl TileLayout {
    pub fn padded_height(&self) -> usize {
        self.image_height + self.padding.height.0 + self.padding.height.1
    }

    pub fn padded_width(&self) -> usize {
        self.image_width + self.padding.width.0 + self.padding.width.1
    }

    /// Top-left pixel of a tile inside the padded image.
    pub fn tile_origin(&self, index: usize) -> (usize, usize) {
        let (row, col) = self.grid.position(index);
        (row * self.inner.height, col * self.inner.width)
    }

    pub fn iter_tiles<'a, A>(&'a self, padded: ArrayView3<'a, A>) -> Result<TileIter<'a, A>> {
        TileIter::new(self, padded)
    }
}

struct AxisPlan {
    overlap: usize,
    inner: usize,
    pad_after: usize,
    count: usize,
}

/// True when two overlap borders leave no inner region, i.e. `2 * overlap >= tile`.
fn is_degenerate(tile: usize, overlap: usize) -> bool {
    overlap >= tile.div_ceil(2)
}

fn plan_axis(axis: usize, len: usize, tile: usize, overlap: usize) -> Result<AxisPlan> {
    // A tile covering the whole axis has no neighbours to overlap with.
    if tile >= len {
        return Ok(AxisPlan {
            overlap: 0,
            inner: tile,
            pad_after: tile - len,
            count: 1,
        });
    }

    if is_degenerate(tile, overlap) {
        return Err(SegmentationError::DegenerateTiling { tile, overlap });
    }

    let inner = tile - 2 * overlap;
    let target = inner * len.div_ceil(inner) + 2 * overlap;
    let pad_after = target
        .checked_sub(len)
        .ok_or(SegmentationError::PaddingRange {
            axis,
            before: 0,
            after: 0,
            len,
        })?;
    let count = ((target - 2 * overlap) / inner).max(1);

    Ok(AxisPlan {
        overlap,
        inner,
        pad_after,
        count,
    })
}

/// Work out padding, stride, adjusted overlap and grid shape for an image.
pub fn plan_tiling(
    image_height: usize,
    image_width: usize,
    tile: TileShape,
    overlap: Overlap,
) -> Result<TileLayout> {
    if tile.height == 0 || tile.width == 0 {
        return Err(SegmentationError::InvalidTileShape(tile.height, tile.width));
    }
    if image_height == 0 || image_width == 0 {
        return Err(SegmentationError::InvalidDimensions(image_width, image_height));
    }

    let rows = plan_axis(0, image_height, tile.height, overlap.vertical)?;
    let cols = plan_axis(1, image_width, tile.width, overlap.horizontal)?;

    let layout = TileLayout {
        image_height,
        image_width,
        tile,
        inner: TileShape {
            height: rows.inner,
            width: cols.inner,
        },
        overlap: Overlap {
            vertical: rows.overlap,
            horizontal: cols.overlap,
        },
        padding: PaddingRecord::trailing(rows.pad_after, cols.pad_after),
        grid: GridShape {
            rows: rows.count,
            cols: cols.count,
        },
    };

    debug!(
        "TileLayout: {}x{} image, tile={}x{}, inner={}x{}, overlap=({}, {}), padding=(+{}, +{}) → {}x{} tiles ({} total)",
        image_height, image_width,
        tile.height, tile.width,
        layout.inner.height, layout.inner.width,
        layout.overlap.vertical, layout.overlap.horizontal,
        rows.pad_after, cols.pad_after,
        layout.grid.rows, layout.grid.cols, layout.grid.tile_count()
    );

    Ok(layout)
}

pub fn compute_padding(
    image_shape: (usize, usize),
    tile: TileShape,
    overlap: Overlap,
) -> Result<PaddingRecord> {
    plan_tiling(image_shape.0, image_shape.1, tile, overlap).map(|layout| layout.padding)
}

/// Zero-pad an image according to a padding record.
pub fn pad<A, S>(image: &ArrayBase<S, Ix3>, padding: &PaddingRecord) -> Array3<A>
where
    A: Clone + Default,
    S: Data<Elem = A>,
{
    let (height, width, channels) = image.dim();
    let (top, bottom) = padding.height;
    let (left, right) = padding.width;
    let (front, back) = padding.channels;

    let mut padded = Array3::from_elem(
        (top + height + bottom, left + width + right, front + channels + back),
        A::default(),
    );
    padded
        .slice_mut(s![top..top + height, left..left + width, front..front + channels])
        .assign(image);
    padded
}

/// Tiles of a split image in row-major order, plus the layout that produced them.
#[derive(Debug, Clone)]
pub struct Tiling<A> {
    pub tiles: Vec<Array3<A>>,
    pub layout: TileLayout,
}

impl<A> Tiling<A> {
    pub fn grid(&self) -> GridShape {
        self.layout.grid
    }

    pub fn padding(&self) -> PaddingRecord {
        self.layout.padding
    }

    pub fn overlap(&self) -> Overlap {
        self.layout.overlap
    }
}

/// Pad an image and cut it into uniform, overlapping tiles.
pub fn split<A, S>(image: &ArrayBase<S, Ix3>, tile: TileShape, overlap: Overlap) -> Result<Tiling<A>>
where
    A: Clone + Default,
    S: Data<Elem = A>,
{
    let (height, width, _) = image.dim();
    let layout = plan_tiling(height, width, tile, overlap)?;
    let padded = pad(image, &layout.padding);

    let tiles: Vec<Array3<A>> = layout
        .iter_tiles(padded.view())?
        .map(|(_, view)| view.to_owned())
        .collect();

    Ok(Tiling { tiles, layout })
}

/// Lazily yields tile windows of a padded image in row-major order.
pub struct TileIter<'a, A> {
    layout: &'a TileLayout,
    padded: ArrayView3<'a, A>,
    current_idx: usize,
}

impl<'a, A> TileIter<'a, A> {
    fn new(layout: &'a TileLayout, padded: ArrayView3<'a, A>) -> Result<Self> {
        let (height, width, _) = padded.dim();
        if height != layout.padded_height() || width != layout.padded_width() {
            return Err(SegmentationError::shape_mismatch(
                format!("padded image {}x{}", layout.padded_height(), layout.padded_width()),
                format!("{}x{}", height, width),
            ));
        }
        Ok(Self {
            layout,
            padded,
            current_idx: 0,
        })
    }
}

impl<'a, A> Iterator for TileIter<'a, A> {
    type Item = (usize, ArrayView3<'a, A>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_idx >= self.layout.grid.tile_count() {
            return None;
        }

        let idx = self.current_idx;
        let (y, x) = self.layout.tile_origin(idx);
        let tile = self.layout.tile;
        let view = self
            .padded
            .slice_move(s![y..y + tile.height, x..x + tile.width, ..]);

        self.current_idx += 1;
        Some((idx, view))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.layout.grid.tile_count() - self.current_idx;
        (remaining, Some(remaining))
    }
}

impl<A> ExactSizeIterator for TileIter<'_, A> {}

/// Rows (or columns) a tile contributes at grid position `i` of `n`.
fn trim_range(i: usize, n: usize, tile: usize, overlap: usize) -> (usize, usize) {
    let start = if i == 0 { 0 } else { overlap };
    let stop = if i + 1 < n { tile - overlap } else { tile };
    (start, stop)
}

/// Stitch per-tile outputs back into a padded-image-shaped array.
pub fn reconstruct<A, S>(
    tiles: &[ArrayBase<S, Ix3>],
    grid: GridShape,
    tile: TileShape,
    overlap: Overlap,
) -> Result<Array3<A>>
where
    A: Clone + Default,
    S: Data<Elem = A>,
{
    if tile.height == 0 || tile.width == 0 {
        return Err(SegmentationError::InvalidTileShape(tile.height, tile.width));
    }
    if is_degenerate(tile.height, overlap.vertical) {
        return Err(SegmentationError::DegenerateTiling {
            tile: tile.height,
            overlap: overlap.vertical,
        });
    }
    if is_degenerate(tile.width, overlap.horizontal) {
        return Err(SegmentationError::DegenerateTiling {
            tile: tile.width,
            overlap: overlap.horizontal,
        });
    }
    if tiles.is_empty() || tiles.len() != grid.tile_count() {
        return Err(SegmentationError::shape_mismatch(
            format!("{} tiles for a {}x{} grid", grid.tile_count(), grid.rows, grid.cols),
            format!("{} tiles", tiles.len()),
        ));
    }

    let channels = tiles[0].dim().2;
    for (idx, t) in tiles.iter().enumerate() {
        if t.dim() != (tile.height, tile.width, channels) {
            return Err(SegmentationError::shape_mismatch(
                format!("tile {} of shape {:?}", idx, (tile.height, tile.width, channels)),
                format!("{:?}", t.dim()),
            ));
        }
    }

    if grid.rows == 1 && grid.cols == 1 {
        return Ok(tiles[0].to_owned());
    }

    let row_ranges: Vec<(usize, usize)> = (0..grid.rows)
        .map(|i| trim_range(i, grid.rows, tile.height, overlap.vertical))
        .collect();
    let col_ranges: Vec<(usize, usize)> = (0..grid.cols)
        .map(|j| trim_range(j, grid.cols, tile.width, overlap.horizontal))
        .collect();

    let height: usize = row_ranges.iter().map(|(start, stop)| stop - start).sum();
    let width: usize = col_ranges.iter().map(|(start, stop)| stop - start).sum();
    let mut full = Array3::from_elem((height, width, channels), A::default());

    let mut y = 0;
    for (i, &(v_start, v_stop)) in row_ranges.iter().enumerate() {
        let mut x = 0;
        for (j, &(h_start, h_stop)) in col_ranges.iter().enumerate() {
            let inner = tiles[grid.index(i, j)].slice(s![v_start..v_stop, h_start..h_stop, ..]);
            full.slice_mut(s![y..y + (v_stop - v_start), x..x + (h_stop - h_start), ..])
                .assign(&inner);
            x += h_stop - h_start;
        }
        y += v_stop - v_start;
    }

    Ok(full)
}

/// [`reconstruct`] over a (tiles, height, width, classes) batch.
pub fn reconstruct_batch<A, S>(
    batch: &ArrayBase<S, Ix4>,
    grid: GridShape,
    tile: TileShape,
    overlap: Overlap,
) -> Result<Array3<A>>
where
    A: Clone + Default,
    S: Data<Elem = A>,
{
    let tiles: Vec<ArrayView3<'_, A>> = batch.outer_iter().collect();
    reconstruct(&tiles, grid, tile, overlap)
}

/// Strip padding from any array whose leading axes are (height, width, channels).
pub fn unpad<A, S, D>(array: &ArrayBase<S, D>, padding: &PaddingRecord) -> Result<Array<A, D>>
where
    A: Clone,
    S: Data<Elem = A>,
    D: Dimension,
{
    for (axis, &len) in array.shape().iter().enumerate() {
        let (before, after) = padding.axis(axis);
        if before + after > len {
            return Err(SegmentationError::PaddingRange {
                axis,
                before,
                after,
                len,
            });
        }
    }

    let trimmed = array.slice_each_axis(|ax| {
        let (before, after) = padding.axis(ax.axis.index());
        Slice::from(before..ax.len - after)
    });

    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{stack, Array2, Axis};

    const TEST_SHAPES: [(usize, usize); 6] =
        [(64, 64), (120, 64), (64, 120), (256, 256), (50, 50), (300, 350)];

    fn test_image(height: usize, width: usize) -> Array3<f32> {
        // Strictly positive so zero padding can never be mistaken for content
        Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
            (y * 1000 + x * 10 + c) as f32 + 1.0
        })
    }

    fn tile64() -> TileShape {
        TileShape::square(64).unwrap()
    }

    fn round_trip(image: &Array3<f32>, overlap: usize) -> Array3<f32> {
        let tiling = split(image, tile64(), Overlap::uniform(overlap)).unwrap();
        let full = reconstruct(&tiling.tiles, tiling.grid(), tile64(), tiling.overlap()).unwrap();
        unpad(&full, &tiling.padding()).unwrap()
    }

    #[test]
    fn test_grid_and_padding() {
        let cases = [
            ((64, 64), (1, 1), PaddingRecord::trailing(0, 0)),
            ((120, 64), (2, 1), PaddingRecord::trailing(8, 0)),
            ((64, 120), (1, 2), PaddingRecord::trailing(0, 8)),
            ((256, 256), (4, 4), PaddingRecord::trailing(0, 0)),
            ((50, 50), (1, 1), PaddingRecord::trailing(14, 14)),
            ((300, 350), (5, 6), PaddingRecord::trailing(20, 34)),
        ];

        for ((h, w), (rows, cols), padding) in cases {
            let tiling = split(&test_image(h, w), tile64(), Overlap::default()).unwrap();
            assert_eq!(tiling.grid(), GridShape { rows, cols }, "grid for {}x{}", h, w);
            assert_eq!(tiling.padding(), padding, "padding for {}x{}", h, w);
            assert_eq!(tiling.tiles.len(), rows * cols);
        }
    }

    #[test]
    fn test_compute_padding_matches_split() {
        let padding = compute_padding((300, 350), tile64(), Overlap::default()).unwrap();
        assert_eq!(padding.height, (0, 20));
        assert_eq!(padding.width, (0, 34));
        assert_eq!(padding.channels, (0, 0));
    }

    #[test]
    fn test_padding_with_overlap() {
        // inner stride 40: ceil(120 / 40) * 40 + 24 = 144
        let layout = plan_tiling(120, 64, tile64(), Overlap::uniform(12)).unwrap();
        assert_eq!(layout.inner, TileShape { height: 40, width: 64 });
        assert_eq!(layout.padding, PaddingRecord::trailing(24, 0));
        assert_eq!(layout.grid, GridShape { rows: 3, cols: 1 });
        assert_eq!(layout.padded_height(), 144);
    }

    #[test]
    fn test_overlap_forced_zero_when_tile_covers_axis() {
        let layout = plan_tiling(120, 64, tile64(), Overlap::uniform(12)).unwrap();
        assert_eq!(layout.overlap, Overlap { vertical: 12, horizontal: 0 });

        let layout = plan_tiling(50, 50, tile64(), Overlap::uniform(20)).unwrap();
        assert_eq!(layout.overlap, Overlap::default());
        assert_eq!(layout.grid, GridShape { rows: 1, cols: 1 });
    }

    #[test]
    fn test_round_trip_identity() {
        for (h, w) in TEST_SHAPES {
            let image = test_image(h, w);
            for overlap in [0, 12, 16, 20] {
                let restored = round_trip(&image, overlap);
                assert_eq!(restored, image, "{}x{} overlap {}", h, w, overlap);
            }
        }
    }

    #[test]
    fn test_round_trip_non_square_tiles() {
        let image = test_image(97, 203);
        let tile = TileShape::new(32, 48).unwrap();
        let overlap = Overlap { vertical: 5, horizontal: 11 };

        let tiling = split(&image, tile, overlap).unwrap();
        let full = reconstruct(&tiling.tiles, tiling.grid(), tile, tiling.overlap()).unwrap();
        assert_eq!(full.dim().0, tiling.layout.padded_height());
        assert_eq!(full.dim().1, tiling.layout.padded_width());
        assert_eq!(unpad(&full, &tiling.padding()).unwrap(), image);
    }

    #[test]
    fn test_uniform_tile_shape() {
        for (h, w) in TEST_SHAPES {
            for overlap in [0, 12, 20] {
                let tiling = split(&test_image(h, w), tile64(), Overlap::uniform(overlap)).unwrap();
                for t in &tiling.tiles {
                    assert_eq!(t.dim(), (64, 64, 3));
                }
            }
        }
    }

    #[test]
    fn test_single_tile_identity() {
        let image = test_image(64, 64);
        let tiling = split(&image, tile64(), Overlap::uniform(12)).unwrap();

        assert_eq!(tiling.grid(), GridShape { rows: 1, cols: 1 });
        assert!(tiling.padding().is_zero());
        assert_eq!(tiling.overlap(), Overlap::default());
        assert_eq!(tiling.tiles[0], image);

        let full = reconstruct(&tiling.tiles, tiling.grid(), tile64(), tiling.overlap()).unwrap();
        assert_eq!(full, image);
    }

    #[test]
    fn test_zero_overlap_is_plain_concatenation() {
        let tile = TileShape::square(2).unwrap();
        let tiles: Vec<Array3<u8>> = (0..4u8)
            .map(|v| Array3::from_elem((2, 2, 1), v))
            .collect();
        let grid = GridShape { rows: 2, cols: 2 };

        let full = reconstruct(&tiles, grid, tile, Overlap::default()).unwrap();
        let expected = Array2::from_shape_vec(
            (4, 4),
            vec![0, 0, 1, 1, 0, 0, 1, 1, 2, 2, 3, 3, 2, 2, 3, 3],
        )
        .unwrap();
        assert_eq!(full.index_axis(Axis(2), 0), expected);
    }

    #[test]
    fn test_reconstruct_trims_overlap_asymmetrically() {
        // 3 rows of 6-pixel tiles with overlap 1: contributions are 5, 4, 5
        let tile = TileShape::new(6, 2).unwrap();
        let tiles: Vec<Array3<u8>> = (0..3u8)
            .map(|v| Array3::from_elem((6, 2, 1), v))
            .collect();
        let grid = GridShape { rows: 3, cols: 1 };
        let overlap = Overlap { vertical: 1, horizontal: 0 };

        let full = reconstruct(&tiles, grid, tile, overlap).unwrap();
        assert_eq!(full.dim(), (14, 2, 1));
        let column: Vec<u8> = full.slice(s![.., 0, 0]).to_vec();
        assert_eq!(column, vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 2]);
    }

    #[test]
    fn test_reconstruct_batch() {
        let image = test_image(120, 64);
        let tiling = split(&image, tile64(), Overlap::uniform(16)).unwrap();
        let views: Vec<_> = tiling.tiles.iter().map(|t| t.view()).collect();
        let batch = stack(Axis(0), &views).unwrap();

        let full = reconstruct_batch(&batch, tiling.grid(), tile64(), tiling.overlap()).unwrap();
        assert_eq!(unpad(&full, &tiling.padding()).unwrap(), image);
    }

    #[test]
    fn test_reconstruct_wrong_tile_count() {
        let tiles = vec![Array3::<f32>::zeros((64, 64, 3)); 3];
        let grid = GridShape { rows: 2, cols: 2 };
        let result = reconstruct(&tiles, grid, tile64(), Overlap::default());
        assert!(matches!(result, Err(SegmentationError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_reconstruct_non_uniform_tiles() {
        let mut tiles = vec![Array3::<f32>::zeros((64, 64, 3)); 4];
        tiles[2] = Array3::zeros((64, 60, 3));
        let grid = GridShape { rows: 2, cols: 2 };
        let result = reconstruct(&tiles, grid, tile64(), Overlap::default());
        assert!(matches!(result, Err(SegmentationError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_degenerate_overlap_rejected() {
        let image = test_image(120, 120);
        let result = split(&image, tile64(), Overlap::uniform(32));
        assert!(matches!(
            result,
            Err(SegmentationError::DegenerateTiling { tile: 64, overlap: 32 })
        ));

        let tiles = vec![Array3::<f32>::zeros((64, 64, 3)); 4];
        let grid = GridShape { rows: 2, cols: 2 };
        let result = reconstruct(&tiles, grid, tile64(), Overlap::uniform(40));
        assert!(matches!(result, Err(SegmentationError::DegenerateTiling { .. })));
    }

    #[test]
    fn test_huge_overlap_is_degenerate() {
        let huge = usize::MAX / 2 + 1;
        let result = plan_tiling(100, 100, tile64(), Overlap::uniform(huge));
        assert!(matches!(
            result,
            Err(SegmentationError::DegenerateTiling { tile: 64, .. })
        ));

        let tiles = vec![Array3::<f32>::zeros((64, 64, 3)); 4];
        let grid = GridShape { rows: 2, cols: 2 };
        for overlap in [huge, usize::MAX] {
            let result = reconstruct(&tiles, grid, tile64(), Overlap::uniform(overlap));
            assert!(matches!(result, Err(SegmentationError::DegenerateTiling { .. })));
        }
    }

    #[test]
    fn test_degenerate_boundary_on_odd_tile() {
        let tile = TileShape::new(9, 9).unwrap();
        assert!(plan_tiling(40, 40, tile, Overlap::uniform(4)).is_ok());
        assert!(matches!(
            plan_tiling(40, 40, tile, Overlap::uniform(5)),
            Err(SegmentationError::DegenerateTiling { tile: 9, overlap: 5 })
        ));
    }

    #[test]
    fn test_invalid_tile_shape() {
        assert!(matches!(
            TileShape::new(0, 64),
            Err(SegmentationError::InvalidTileShape(0, 64))
        ));

        let tile = TileShape { height: 64, width: 0 };
        assert!(matches!(
            plan_tiling(100, 100, tile, Overlap::default()),
            Err(SegmentationError::InvalidTileShape(64, 0))
        ));
    }

    #[test]
    fn test_unpad_shape_law() {
        let pads = [
            PaddingRecord::default(),
            PaddingRecord { height: (0, 1), width: (0, 10), channels: (0, 1) },
            PaddingRecord { height: (1, 1), width: (1, 10), channels: (0, 1) },
            PaddingRecord { height: (1, 0), width: (10, 0), channels: (1, 0) },
        ];

        for (h, w) in TEST_SHAPES {
            let image = test_image(h, w);
            for padding in &pads {
                let unpadded = unpad(&image, padding).unwrap();
                for axis in 0..3 {
                    let (before, after) = padding.axis(axis);
                    assert_eq!(unpadded.shape()[axis], image.shape()[axis] - before - after);
                }
            }
        }
    }

    #[test]
    fn test_unpad_keeps_leading_content() {
        let image = test_image(10, 12);
        let padding = PaddingRecord { height: (2, 3), width: (1, 0), channels: (0, 0) };
        let unpadded = unpad(&image, &padding).unwrap();
        assert_eq!(unpadded, image.slice(s![2..7, 1.., ..]));
    }

    #[test]
    fn test_unpad_two_dimensional_mask() {
        let mask = Array2::<u8>::ones((70, 80));
        let unpadded = unpad(&mask, &PaddingRecord::trailing(6, 16)).unwrap();
        assert_eq!(unpadded.dim(), (64, 64));
    }

    #[test]
    fn test_unpad_rejects_oversized_padding() {
        let image = test_image(10, 10);
        let result = unpad(&image, &PaddingRecord::trailing(0, 11));
        assert!(matches!(
            result,
            Err(SegmentationError::PaddingRange { axis: 1, before: 0, after: 11, len: 10 })
        ));

        let padding = PaddingRecord { height: (6, 5), width: (0, 0), channels: (0, 0) };
        assert!(unpad(&image, &padding).is_err());
    }

    #[test]
    fn test_tile_iterator_order() {
        let layout = plan_tiling(300, 350, tile64(), Overlap::default()).unwrap();
        let padded = pad(&test_image(300, 350), &layout.padding);
        let tiles: Vec<_> = layout.iter_tiles(padded.view()).unwrap().collect();

        assert_eq!(tiles.len(), 30);
        assert_eq!(tiles[0].0, 0);
        assert_eq!(tiles[29].0, 29);
        // Tile (1, 2) starts at pixel (64, 128)
        assert_eq!(layout.tile_origin(layout.grid.index(1, 2)), (64, 128));
        assert_eq!(tiles[8].1[[0, 0, 0]], padded[[64, 128, 0]]);
    }

    #[test]
    fn test_tile_iterator_rejects_unpadded_image() {
        let layout = plan_tiling(300, 350, tile64(), Overlap::default()).unwrap();
        let image = test_image(300, 350);
        assert!(layout.iter_tiles(image.view()).is_err());
    }
}
