use crate::error::{Result, SegmentationError};
use crate::io::{self, RasterMetadata};
use crate::tiling::{pad, plan_tiling, reconstruct, unpad, Overlap, TileLayout, TileShape};
use log::{debug, info};
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "tiles_manifest.json";

/// A single tile file and its grid position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileEntry {
    pub index: usize,
    pub row: usize,
    pub col: usize,
    pub file: String,
}

/// On-disk tile set description: everything needed to stitch per-tile
/// model outputs back together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileManifest {
    pub source: String,
    pub layout: TileLayout,
    pub metadata: RasterMetadata,
    pub tiles: Vec<TileEntry>,
}

impl TileManifest {
    pub fn tile_file_name(row: usize, col: usize) -> String {
        format!("tile_r{:03}_c{:03}.tif", row, col)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        debug!("Saved manifest: {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let manifest: Self = serde_json::from_reader(reader)?;

        let expected = manifest.layout.grid.tile_count();
        if manifest.tiles.len() != expected {
            return Err(SegmentationError::shape_mismatch(
                format!("{} tile entries", expected),
                format!("{}", manifest.tiles.len()),
            ));
        }
        Ok(manifest)
    }
}

/// Split an RGB raster into tile GeoTIFFs under `output_dir` and write the manifest
pub fn split_to_directory(
    input: &Path,
    output_dir: &Path,
    tile: TileShape,
    overlap: Overlap,
) -> Result<TileManifest> {
    let (image, metadata) = io::read_rgb_image(input)?;
    let layout = plan_tiling(metadata.height, metadata.width, tile, overlap)?;
    let padded = pad(&image, &layout.padding);

    fs::create_dir_all(output_dir)?;
    info!(
        "Writing {} tiles ({}x{} grid) to {}",
        layout.grid.tile_count(),
        layout.grid.rows,
        layout.grid.cols,
        output_dir.display()
    );

    let mut tiles = Vec::with_capacity(layout.grid.tile_count());
    for (index, view) in layout.iter_tiles(padded.view())? {
        let (row, col) = layout.grid.position(index);
        let (y, x) = layout.tile_origin(index);
        let file = TileManifest::tile_file_name(row, col);

        let tile_meta = metadata.window(y, x, tile.height, tile.width);
        io::write_f32_bands(&output_dir.join(&file), view, &tile_meta)?;
        tiles.push(TileEntry { index, row, col, file });
    }

    let manifest = TileManifest {
        source: input.display().to_string(),
        layout,
        metadata,
        tiles,
    };
    manifest.save(&output_dir.join(MANIFEST_FILE))?;

    Ok(manifest)
}

/// Reassemble per-tile score rasters named as in the manifest.
///
/// Tiles are looked up in `scores_dir`, or next to the manifest when it is `None`.
/// Returns scores at the source raster's shape plus its metadata.
pub fn stitch_from_manifest(
    manifest_path: &Path,
    scores_dir: Option<&Path>,
) -> Result<(Array3<f32>, RasterMetadata)> {
    let manifest = TileManifest::load(manifest_path)?;
    let dir: PathBuf = match scores_dir {
        Some(d) => d.to_path_buf(),
        None => manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };

    let mut entries = manifest.tiles.clone();
    entries.sort_by_key(|e| e.index);

    let mut outputs = Vec::with_capacity(entries.len());
    for (expected, entry) in entries.iter().enumerate() {
        if entry.index != expected {
            return Err(SegmentationError::shape_mismatch(
                format!("tile index {}", expected),
                format!("{}", entry.index),
            ));
        }
        let (scores, _) = io::read_bands(&dir.join(&entry.file))?;
        outputs.push(scores);
    }
    info!("Read {} tile predictions from {}", outputs.len(), dir.display());

    let layout = &manifest.layout;
    let full = reconstruct(&outputs, layout.grid, layout.tile, layout.overlap)?;
    let scores = unpad(&full, &layout.padding)?;

    Ok((scores, manifest.metadata))
}
