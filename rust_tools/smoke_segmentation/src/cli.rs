use crate::error::Result;
use crate::tiling::{Overlap, TileShape};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "smoke-tiles")]
#[command(about = "Tile GeoTIFFs for smoke/cloud segmentation and stitch predictions back")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the tiling layout of a raster as JSON
    Plan {
        /// Input GeoTIFF path (RGB)
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        tiling: TilingArgs,
    },

    /// Split a raster into model-sized tiles plus a manifest
    Split {
        /// Input GeoTIFF path (RGB)
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Directory for tile GeoTIFFs and the manifest
        #[arg(short, long, value_name = "DIR")]
        output_dir: PathBuf,

        #[command(flatten)]
        tiling: TilingArgs,
    },

    /// Stitch per-tile class scores back into full-size outputs
    Stitch {
        /// Manifest written by `split`
        #[arg(short, long, value_name = "FILE")]
        manifest: PathBuf,

        /// Directory holding per-tile score rasters (default: next to the manifest)
        #[arg(long, value_name = "DIR")]
        scores_dir: Option<PathBuf>,

        /// Output GeoTIFF path
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// What to write
        #[arg(short, long, value_enum, default_value_t = OutputKind::Mask)]
        kind: OutputKind,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct TilingArgs {
    /// Model input size in pixels (square tiles)
    #[arg(short, long, default_value_t = 512, value_name = "PIXELS")]
    pub tile_size: usize,

    /// Overlap border in pixels on each side of a tile
    #[arg(long, default_value_t = 0, value_name = "PIXELS")]
    pub overlap: usize,
}

impl TilingArgs {
    pub fn tile_shape(&self) -> Result<TileShape> {
        TileShape::square(self.tile_size)
    }

    pub fn overlap(&self) -> Overlap {
        Overlap::uniform(self.overlap)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Single band of display values (0 clear, 127 smoke, 255 cloud)
    Mask,
    /// Class indices, smoke and cloud as three bands
    Multiband,
    /// Separate `_smoke` and `_cloud` masks
    Layers,
    /// One interval-coded probability band per class
    Probability,
}
