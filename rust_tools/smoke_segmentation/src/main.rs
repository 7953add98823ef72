use clap::Parser;
use env_logger::Env;
use log::info;
use ndarray::Array3;
use std::path::Path;

use smoke_segmentation::cli::{Args, Command, OutputKind};
use smoke_segmentation::error::Result;
use smoke_segmentation::io::{self, RasterMetadata};
use smoke_segmentation::{manifest, mask, tiling};

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    info!("=== Smoke Segmentation Tiler ===");

    match args.command {
        Command::Plan { input, tiling: tile_args } => {
            let metadata = io::read_metadata(&input)?;
            let layout = tiling::plan_tiling(
                metadata.height,
                metadata.width,
                tile_args.tile_shape()?,
                tile_args.overlap(),
            )?;
            println!("{}", serde_json::to_string_pretty(&layout)?);
        }
        Command::Split {
            input,
            output_dir,
            tiling: tile_args,
        } => {
            let manifest = manifest::split_to_directory(
                &input,
                &output_dir,
                tile_args.tile_shape()?,
                tile_args.overlap(),
            )?;
            info!(
                "Wrote {} tiles and {}",
                manifest.tiles.len(),
                output_dir.join(manifest::MANIFEST_FILE).display()
            );
        }
        Command::Stitch {
            manifest: manifest_path,
            scores_dir,
            output,
            kind,
        } => {
            let (scores, metadata) = manifest::stitch_from_manifest(&manifest_path, scores_dir.as_deref())?;
            write_output(&output, &scores, &metadata, kind)?;
        }
    }

    info!("=== Done! ===");
    Ok(())
}

fn write_output(path: &Path, scores: &Array3<f32>, metadata: &RasterMetadata, kind: OutputKind) -> Result<()> {
    match kind {
        OutputKind::Probability => io::write_probability_raster(path, scores.view(), metadata),
        OutputKind::Mask => io::write_class_mask(path, &mask::argmax_mask(scores.view())?, metadata),
        OutputKind::Multiband => io::write_multiband_mask(path, &mask::argmax_mask(scores.view())?, metadata),
        OutputKind::Layers => {
            let written = io::write_class_layers(path, &mask::argmax_mask(scores.view())?, metadata)?;
            for p in written {
                info!("Wrote {}", p.display());
            }
            Ok(())
        }
    }
}
