//! Moving-average self-join for time-series smoothing.
//!
//! Unlike the despeckle filter's asymmetric before/after window, the join
//! uses a fixed symmetric day radius, and the matched images are collected
//! per image before being collapsed to a band-wise mean.

use crate::raster::{ImageCollection, RasterImage};
use crate::types::{BandRole, Sample, StackError, StackResult};
use ndarray::Array2;

const SECONDS_PER_DAY: i64 = 86_400;

/// Self-joins a collection by a maximum acquisition-time difference and
/// attaches the band-wise average of each image's matches.
pub struct MovingAverageJoiner {
    max_difference_days: i64,
}

impl MovingAverageJoiner {
    /// `dt_days` is the symmetric match radius in whole days; an image
    /// always matches itself at difference zero.
    pub fn new(dt_days: i64) -> StackResult<Self> {
        if dt_days < 0 {
            return Err(StackError::InvalidWindow(format!(
                "moving average window must be non-negative, got {} days",
                dt_days
            )));
        }
        Ok(Self {
            max_difference_days: dt_days,
        })
    }

    /// Produce one output image per input image, carrying the original
    /// bands plus a `<band>_mean` windowed average per band.
    pub fn apply(&self, images: &ImageCollection) -> StackResult<ImageCollection> {
        let schema = images.band_schema()?;
        let dims = images.grid_dims()?;
        log::info!(
            "Moving-average join over {} images, +/- {} days",
            images.len(),
            self.max_difference_days
        );

        images.map(|image| self.average_matches(image, images, &schema, dims))
    }

    fn matches<'a>(&self, image: &RasterImage, stack: &'a ImageCollection) -> Vec<&'a RasterImage> {
        let t = image.timestamp();
        // membership depends only on the time difference, never on
        // collection order; the boundary is inclusive
        stack
            .images()
            .iter()
            .filter(|other| {
                let delta = (other.timestamp() - t).num_seconds().abs();
                delta <= self.max_difference_days * SECONDS_PER_DAY
            })
            .collect()
    }

    fn average_matches(
        &self,
        image: &RasterImage,
        stack: &ImageCollection,
        schema: &[String],
        dims: (usize, usize),
    ) -> StackResult<RasterImage> {
        let matched = self.matches(image, stack);
        log::debug!(
            "image '{}': {} matches within {} days",
            image.metadata().index,
            matched.len(),
            self.max_difference_days
        );

        let (rows, cols) = dims;
        let mut out = image.clone();
        for band in schema {
            let grids: Vec<&Array2<Sample>> = matched
                .iter()
                .map(|m| m.band(band))
                .collect::<StackResult<_>>()?;

            let mut avg = Array2::from_elem(dims, Sample::NAN);
            for r in 0..rows {
                for c in 0..cols {
                    let mut sum = 0.0;
                    let mut count = 0usize;
                    for grid in &grids {
                        let v = grid[[r, c]];
                        if v.is_finite() {
                            sum += v;
                            count += 1;
                        }
                    }
                    if count > 0 {
                        avg[[r, c]] = sum / count as Sample;
                    }
                }
            }
            out = out.with_band(BandRole::Mean.band_name(band), avg)?;
        }
        Ok(out)
    }
}
