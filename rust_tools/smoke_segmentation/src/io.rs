use crate::error::{Result, SegmentationError};
use crate::mask::{self, SmokeClass};
use gdal::raster::{Buffer, GdalType};
use gdal::{Dataset, DriverManager, Metadata};
use log::{debug, info, warn};
use ndarray::{stack, Array2, Array3, ArrayView2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Georeferencing carried from an input raster onto every output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RasterMetadata {
    pub width: usize,
    pub height: usize,
    pub geotransform: Option<[f64; 6]>,
    pub projection: String,
    pub tags: Vec<(String, String)>,
}

impl RasterMetadata {
    /// Metadata for a sub-window whose top-left pixel is (row, col).
    ///
    /// The window may extend past the source extent (padded tiles); the
    /// geotransform is extrapolated the same way.
    pub fn window(&self, row: usize, col: usize, height: usize, width: usize) -> Self {
        let geotransform = self.geotransform.map(|gt| {
            let (x, y) = (col as f64, row as f64);
            [
                gt[0] + x * gt[1] + y * gt[2],
                gt[1],
                gt[2],
                gt[3] + x * gt[4] + y * gt[5],
                gt[4],
                gt[5],
            ]
        });

        Self {
            width,
            height,
            geotransform,
            projection: self.projection.clone(),
            tags: Vec::new(),
        }
    }
}

/// Extract metadata from a dataset without reading pixel data
pub fn extract_metadata_from_dataset(dataset: &Dataset) -> Result<RasterMetadata> {
    let (width, height) = dataset.raster_size();
    if width == 0 || height == 0 {
        return Err(SegmentationError::InvalidDimensions(width, height));
    }

    let geotransform = match dataset.geo_transform() {
        Ok(gt) => Some(gt),
        Err(e) => {
            warn!("No geotransform on input, passing it through as absent: {}", e);
            None
        }
    };

    let tags = dataset
        .metadata_domain("")
        .unwrap_or_default()
        .into_iter()
        .filter_map(|entry| {
            entry
                .split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
        })
        .collect();

    Ok(RasterMetadata {
        width,
        height,
        geotransform,
        projection: dataset.projection(),
        tags,
    })
}

/// Open a raster and read only its metadata
pub fn read_metadata(path: &Path) -> Result<RasterMetadata> {
    let dataset = Dataset::open(path)?;
    extract_metadata_from_dataset(&dataset)
}

fn read_band_stack(dataset: &Dataset, band_count: usize, width: usize, height: usize) -> Result<Array3<f32>> {
    let mut bands: Vec<Array2<f32>> = Vec::with_capacity(band_count);
    for band_index in 1..=band_count {
        let rasterband = dataset.rasterband(band_index)?;
        let buffer = rasterband.read_as::<f32>((0, 0), (width, height), (width, height), None)?;
        let data_vec: Vec<f32> = buffer.into_iter().collect();
        bands.push(Array2::from_shape_vec((height, width), data_vec)?);
        debug!("Read band {} ({}x{})", band_index, width, height);
    }

    let views: Vec<ArrayView2<'_, f32>> = bands.iter().map(|b| b.view()).collect();
    Ok(stack(Axis(2), &views)?)
}

/// Read every band of a raster into a (height, width, bands) array
pub fn read_bands(path: &Path) -> Result<(Array3<f32>, RasterMetadata)> {
    debug!("Opening raster: {}", path.display());
    let dataset = Dataset::open(path)?;
    let metadata = extract_metadata_from_dataset(&dataset)?;

    let band_count = dataset.raster_count() as usize;
    if band_count == 0 {
        return Err(SegmentationError::InvalidBandCount {
            found: 0,
            required: 1,
        });
    }

    let data = read_band_stack(&dataset, band_count, metadata.width, metadata.height)?;
    Ok((data, metadata))
}

/// Read bands 1-3 of a raster as an RGB image
pub fn read_rgb_image(path: &Path) -> Result<(Array3<f32>, RasterMetadata)> {
    info!("Opening input raster: {}", path.display());
    let dataset = Dataset::open(path)?;
    let metadata = extract_metadata_from_dataset(&dataset)?;

    let band_count = dataset.raster_count() as usize;
    if band_count < 3 {
        return Err(SegmentationError::InvalidBandCount {
            found: band_count,
            required: 3,
        });
    }

    debug!("Raster dimensions: {}x{}", metadata.width, metadata.height);
    let data = read_band_stack(&dataset, 3, metadata.width, metadata.height)?;
    Ok((data, metadata))
}

fn create_output_dataset<T: GdalType>(
    path: &Path,
    metadata: &RasterMetadata,
    width: usize,
    height: usize,
    num_bands: usize,
) -> Result<Dataset> {
    debug!("Creating output dataset: {} ({} bands)", path.display(), num_bands);

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut dataset = driver.create_with_band_type::<T, _>(path, width, height, num_bands)?;

    if let Some(gt) = &metadata.geotransform {
        dataset.set_geo_transform(gt)?;
    }
    if !metadata.projection.is_empty() {
        dataset.set_projection(&metadata.projection)?;
    }

    Ok(dataset)
}

/// Legend first, then the source tags so they win on key collisions
fn write_tags(dataset: &mut Dataset, legend: &[(String, String)], tags: &[(String, String)]) -> Result<()> {
    for (key, value) in legend.iter().chain(tags) {
        dataset.set_metadata_item(key, value, "")?;
    }
    Ok(())
}

fn write_band<T: GdalType + Copy>(
    dataset: &mut Dataset,
    band_index: usize,
    data: ArrayView2<'_, T>,
    nodata: Option<f64>,
) -> Result<()> {
    let (height, width) = data.dim();
    let mut raster_band = dataset.rasterband(band_index)?;

    // iter() walks in logical row-major order, which is what GDAL expects
    let mut buffer = Buffer::new((width, height), data.iter().copied().collect());
    raster_band.write((0, 0), (width, height), &mut buffer)?;

    if let Some(nd) = nodata {
        raster_band.set_no_data_value(Some(nd))?;
    }

    Ok(())
}

fn check_extent(metadata: &RasterMetadata, height: usize, width: usize) -> Result<()> {
    if metadata.height != height || metadata.width != width {
        return Err(SegmentationError::shape_mismatch(
            format!("{}x{} raster", metadata.height, metadata.width),
            format!("{}x{} array", height, width),
        ));
    }
    Ok(())
}

/// Write a (height, width, bands) array as a float32 GeoTIFF
pub fn write_f32_bands(path: &Path, data: ArrayView3<'_, f32>, metadata: &RasterMetadata) -> Result<()> {
    let (height, width, bands) = data.dim();
    check_extent(metadata, height, width)?;

    let mut dataset = create_output_dataset::<f32>(path, metadata, width, height, bands)?;
    for (i, band) in data.axis_iter(Axis(2)).enumerate() {
        write_band(&mut dataset, i + 1, band, None)?;
    }
    write_tags(&mut dataset, &[], &metadata.tags)?;

    debug!("Wrote {} bands to {}", bands, path.display());
    Ok(())
}

/// Single-band mask of display values with a legend in the metadata
pub fn write_class_mask(path: &Path, mask: &Array2<u8>, metadata: &RasterMetadata) -> Result<()> {
    let (height, width) = mask.dim();
    check_extent(metadata, height, width)?;
    info!("Writing segmentation mask: {}", path.display());

    let display = mask::to_display_values(mask);
    let mut dataset = create_output_dataset::<u8>(path, metadata, width, height, 1)?;
    write_band(&mut dataset, 1, display.view(), Some(0.0))?;
    write_tags(&mut dataset, &mask::display_legend(), &metadata.tags)?;

    Ok(())
}

/// Three bands: class indices, smoke pixels, cloud pixels
pub fn write_multiband_mask(path: &Path, mask: &Array2<u8>, metadata: &RasterMetadata) -> Result<()> {
    let (height, width) = mask.dim();
    check_extent(metadata, height, width)?;
    info!("Writing multi-band segmentation: {}", path.display());

    let mut dataset = create_output_dataset::<u8>(path, metadata, width, height, 3)?;
    write_band(&mut dataset, 1, mask.view(), None)?;

    let smoke = mask::class_layer(mask, SmokeClass::Smoke);
    write_band(&mut dataset, 2, smoke.view(), Some(0.0))?;

    let cloud = mask::class_layer(mask, SmokeClass::Cloud);
    write_band(&mut dataset, 3, cloud.view(), Some(0.0))?;

    write_tags(&mut dataset, &mask::index_legend(), &metadata.tags)?;
    Ok(())
}

/// `<stem>_<suffix>.<ext>` next to the given path
fn suffixed_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}_{}", stem, suffix),
    };
    path.with_file_name(file_name)
}

/// Separate `_smoke` and `_cloud` single-band masks; returns the written paths
pub fn write_class_layers(path: &Path, mask: &Array2<u8>, metadata: &RasterMetadata) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(2);
    for (class, suffix) in [(SmokeClass::Smoke, "smoke"), (SmokeClass::Cloud, "cloud")] {
        let layer_path = suffixed_path(path, suffix);
        write_class_mask(&layer_path, &mask::class_layer(mask, class), metadata)?;
        written.push(layer_path);
    }
    Ok(written)
}

/// One interval-coded band per class probability
pub fn write_probability_raster(path: &Path, scores: ArrayView3<'_, f32>, metadata: &RasterMetadata) -> Result<()> {
    let (height, width, classes) = scores.dim();
    check_extent(metadata, height, width)?;
    info!("Writing probability raster: {} ({} classes)", path.display(), classes);

    let bands = mask::probability_bands(scores);
    let mut dataset = create_output_dataset::<u8>(path, metadata, width, height, bands.len())?;
    for (i, band) in bands.iter().enumerate() {
        write_band(&mut dataset, i + 1, band.view(), None)?;
    }
    write_tags(&mut dataset, &mask::band_legend(), &[])?;

    Ok(())
}
