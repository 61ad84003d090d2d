//! Multi-temporal despeckle filter.
//!
//! For every image in a stack the filter computes a spatial mean per band
//! and the per-pixel ratio of the image to that mean, then reconstructs each
//! image as its own spatial mean scaled by the average ratio over a temporal
//! neighborhood. The spatial mean supplies the low-frequency estimate; the
//! temporally averaged ratio supplies an edge-preserving correction that a
//! single-date outlier cannot dominate.
//!
//! Filtering runs on linear power values. Averaging ratios in log space is
//! not equivalent, so decibel-domain input is rejected outright.

use crate::core::focal::{focal_mean, Kernel};
use crate::raster::{ImageCollection, RasterImage};
use crate::types::{
    BandRole, Domain, RadiusUnits, Sample, StackError, StackResult, TimeWindow,
};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Multi-temporal despeckle parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DespeckleParams {
    /// Moving window side length (must be odd, e.g. 3 means 3x3)
    pub radius: usize,
    /// Whether `radius` is expressed in pixels or meters
    pub units: RadiusUnits,
    /// Temporal neighborhood contributing ratio corrections
    pub window: TimeWindow,
}

impl Default for DespeckleParams {
    fn default() -> Self {
        Self {
            radius: 3,
            units: RadiusUnits::Pixels,
            window: TimeWindow::default(),
        }
    }
}

/// Multi-temporal despeckle processor
pub struct MultitemporalDespeckle {
    params: DespeckleParams,
}

impl MultitemporalDespeckle {
    pub fn new(params: DespeckleParams) -> StackResult<Self> {
        if params.radius == 0 || params.radius % 2 == 0 {
            return Err(StackError::InvalidRadius(format!(
                "window side must be an odd positive size, got {}",
                params.radius
            )));
        }
        Ok(Self { params })
    }

    /// Create a processor with the default 3x3 pixel window and the
    /// archive-wide temporal window.
    pub fn standard() -> Self {
        Self {
            params: DespeckleParams::default(),
        }
    }

    /// Despeckle a stack of power-domain images.
    ///
    /// Every image must carry the same band schema and grid shape; the
    /// output collection has the same cardinality, band schema, metadata and
    /// domain as the input. Pixels whose temporal window holds no valid
    /// ratio come out missing.
    pub fn apply(&self, images: &ImageCollection) -> StackResult<ImageCollection> {
        let schema = images.band_schema()?;
        images.grid_dims()?;
        for image in images.images() {
            image.expect_domain(Domain::Power)?;
        }
        log::info!(
            "Despeckling {} images over bands {:?} ({} {:?} window)",
            images.len(),
            schema,
            self.params.radius,
            self.params.units
        );

        // Per-image spatial mean and speckle ratio companion bands
        let with_ratios = images.map(|image| self.add_spatial_stats(image, &schema))?;

        // Temporal reconstruction against the ratio stack
        with_ratios.map(|image| self.reconstruct(image, &with_ratios, &schema))
    }

    /// Resolve the kernel half-width in pixels for one image.
    fn kernel_for(&self, image: &RasterImage) -> StackResult<Kernel> {
        let half = match self.params.units {
            RadiusUnits::Pixels => self.params.radius / 2,
            RadiusUnits::Meters => {
                let spacing = image.metadata().pixel_spacing;
                if spacing <= 0.0 {
                    return Err(StackError::Processing(format!(
                        "image '{}' has pixel spacing {} m, cannot resolve a {} m window",
                        image.metadata().index,
                        spacing,
                        self.params.radius
                    )));
                }
                ((self.params.radius as f64 / 2.0) / spacing).round() as usize
            }
        };
        Ok(Kernel::square(half))
    }

    fn add_spatial_stats(
        &self,
        image: &RasterImage,
        schema: &[String],
    ) -> StackResult<RasterImage> {
        let kernel = self.kernel_for(image)?;
        let mut out = image.clone();
        for band in schema {
            let data = image.band(band)?;
            let mean = focal_mean(data, &kernel);
            let ratio = data / &mean;
            out = out.with_band(BandRole::Mean.band_name(band), mean)?;
            out = out.with_band(BandRole::Ratio.band_name(band), ratio)?;
        }
        Ok(out)
    }

    /// Rebuild one image from its spatial mean and the ratios of its
    /// temporal neighbors in `[t + before, t + after)`.
    fn reconstruct(
        &self,
        image: &RasterImage,
        stack: &ImageCollection,
        schema: &[String],
    ) -> StackResult<RasterImage> {
        let (from, to) = self.params.window.bounds(image.timestamp());
        let neighbors = stack.filter_date(from, to);
        log::debug!(
            "image '{}': {} temporal neighbors in [{}, {})",
            image.metadata().index,
            neighbors.len(),
            from,
            to
        );
        let (rows, cols) = image.dims().ok_or_else(|| {
            StackError::Processing(format!(
                "image '{}' carries no bands",
                image.metadata().index
            ))
        })?;

        let mut out = RasterImage::new(image.metadata().clone(), Domain::Power);
        for band in schema {
            let mean = image.band(&BandRole::Mean.band_name(band))?;
            let ratio_name = BandRole::Ratio.band_name(band);
            let ratios: Vec<&Array2<Sample>> = neighbors
                .images()
                .iter()
                .map(|n| n.band(&ratio_name))
                .collect::<StackResult<_>>()?;

            let mut result = Array2::from_elem((rows, cols), Sample::NAN);
            for r in 0..rows {
                for c in 0..cols {
                    let mut sum = 0.0;
                    let mut count = 0usize;
                    for grid in &ratios {
                        let v = grid[[r, c]];
                        if v.is_finite() {
                            sum += v;
                            count += 1;
                        }
                    }
                    // an empty temporal window leaves the pixel missing
                    if count > 0 {
                        result[[r, c]] = mean[[r, c]] * sum / count as Sample;
                    }
                }
            }
            out = out.with_band(band.clone(), result)?;
        }
        Ok(out)
    }
}
