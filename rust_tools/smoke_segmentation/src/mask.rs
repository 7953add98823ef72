use crate::error::{Result, SegmentationError};
use log::debug;
use ndarray::{Array2, ArrayView3, Axis};
use rayon::prelude::*;

/// Segmentation classes in the order the model emits their scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmokeClass {
    Clear = 0,
    Smoke = 1,
    Cloud = 2,
}

impl SmokeClass {
    pub const ALL: [SmokeClass; 3] = [SmokeClass::Clear, SmokeClass::Smoke, SmokeClass::Cloud];

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Clear => "no smoke no clouds",
            Self::Smoke => "smoke",
            Self::Cloud => "cloud",
        }
    }

    /// Byte written to single-band display masks.
    pub fn display_value(self) -> u8 {
        match self {
            Self::Clear => 0,
            Self::Smoke => 127,
            Self::Cloud => 255,
        }
    }
}

/// Legend tags for masks that store class indices.
pub fn index_legend() -> Vec<(String, String)> {
    SmokeClass::ALL
        .iter()
        .map(|c| (c.index().to_string(), c.label().to_string()))
        .collect()
}

/// Legend tags for masks that store display values.
pub fn display_legend() -> Vec<(String, String)> {
    SmokeClass::ALL
        .iter()
        .map(|c| (c.display_value().to_string(), c.label().to_string()))
        .collect()
}

/// Legend tags for probability rasters (bands are 1-based).
pub fn band_legend() -> Vec<(String, String)> {
    SmokeClass::ALL
        .iter()
        .map(|c| ((c.index() + 1).to_string(), c.label().to_string()))
        .collect()
}

/// Per-pixel class index with the highest score; ties go to the lowest index.
pub fn argmax_mask(scores: ArrayView3<'_, f32>) -> Result<Array2<u8>> {
    let (height, width, classes) = scores.dim();
    if classes == 0 || classes > u8::MAX as usize + 1 {
        return Err(SegmentationError::shape_mismatch(
            "1..=256 class scores per pixel",
            format!("{}", classes),
        ));
    }

    debug!("Computing argmax over {} classes for {}x{} pixels", classes, height, width);

    // Process rows in parallel
    let rows: Vec<Vec<u8>> = (0..height)
        .into_par_iter()
        .map(|y| {
            (0..width)
                .map(|x| {
                    let mut best = 0;
                    for k in 1..classes {
                        if scores[[y, x, k]] > scores[[y, x, best]] {
                            best = k;
                        }
                    }
                    best as u8
                })
                .collect()
        })
        .collect();

    let flat: Vec<u8> = rows.into_iter().flatten().collect();
    Ok(Array2::from_shape_vec((height, width), flat)?)
}

/// Map class indices to their display bytes. Unknown indices become 0.
pub fn to_display_values(mask: &Array2<u8>) -> Array2<u8> {
    mask.mapv(|v| SmokeClass::from_index(v).map_or(0, SmokeClass::display_value))
}

/// Keep only the pixels of one class, zero elsewhere.
pub fn class_layer(mask: &Array2<u8>, class: SmokeClass) -> Array2<u8> {
    let target = class.index();
    mask.mapv(|v| if v == target { v } else { 0 })
}

/// Bucket a probability into a 1..=5 interval code. NaN lands in the lowest bucket.
pub fn probability_interval(prob: f32) -> u8 {
    let p = (prob * 1000.0).round() / 1000.0;
    if p.is_nan() || p < 0.25 {
        1
    } else if p < 0.5 {
        2
    } else if p < 0.75 {
        3
    } else if p < 1.0 {
        4
    } else {
        5
    }
}

/// One interval-coded band per class score.
pub fn probability_bands(scores: ArrayView3<'_, f32>) -> Vec<Array2<u8>> {
    let classes = scores.dim().2;
    (0..classes)
        .into_par_iter()
        .map(|k| scores.index_axis(Axis(2), k).mapv(probability_interval))
        .collect()
}
